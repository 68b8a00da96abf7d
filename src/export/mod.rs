//! Journal export: one row per documented day.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::db::Database;
use crate::stats::day_bucket;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
        }
    }
}

/// One documented day in the export.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ExportedDay {
    pub day: String,
    pub photos: usize,
    pub note: String,
}

/// Export the journal to a file. Returns the number of day rows written.
pub fn export_journal(db: &Database, output_path: &Path, format: ExportFormat) -> Result<usize> {
    let days = collect_days(db)?;
    let count = days.len();

    match format {
        ExportFormat::Json => export_json(&days, output_path)?,
        ExportFormat::Csv => export_csv(&days, output_path)?,
    }

    tracing::info!(rows = count, path = %output_path.display(), "Journal exported");
    Ok(count)
}

/// Day rows, newest first. A day appears when it has at least one photo or
/// a note.
fn collect_days(db: &Database) -> Result<Vec<ExportedDay>> {
    let mut per_day: BTreeMap<NaiveDate, (usize, String)> = BTreeMap::new();

    for photo in db.all_photos()? {
        per_day.entry(day_bucket(photo.captured_at)).or_default().0 += 1;
    }
    for note in db.all_notes()? {
        per_day.entry(note.day).or_default().1 = note.text;
    }

    Ok(per_day
        .into_iter()
        .rev()
        .map(|(day, (photos, note))| ExportedDay {
            day: day.format("%Y-%m-%d").to_string(),
            photos,
            note,
        })
        .collect())
}

fn export_json(days: &[ExportedDay], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(days)?;
    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

fn export_csv(days: &[ExportedDay], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["day", "photos", "note"])?;
    for day in days {
        wtr.write_record([&day.day, &day.photos.to_string(), &day.note])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone, Utc};

    fn test_db(dir: &Path) -> Database {
        let db = Database::open(&dir.join("journal.db")).unwrap();
        db.initialize().unwrap();
        db
    }

    fn local_ts(y: i32, m: u32, d: u32, hour: u32) -> chrono::DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, hour, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_collect_days_groups_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(dir.path());

        db.add_photo(vec![1], "image/jpeg", Some(local_ts(2024, 1, 1, 8)))
            .unwrap();
        db.add_photo(vec![2], "image/jpeg", Some(local_ts(2024, 1, 1, 20)))
            .unwrap();
        db.add_photo(vec![3], "image/jpeg", Some(local_ts(2024, 1, 3, 9)))
            .unwrap();
        db.upsert_note(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "rest day")
            .unwrap();

        let days = collect_days(&db).unwrap();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].day, "2024-01-03");
        assert_eq!(
            days[1],
            ExportedDay {
                day: "2024-01-02".to_string(),
                photos: 0,
                note: "rest day".to_string(),
            }
        );
        assert_eq!(days[2].photos, 2);
    }

    #[test]
    fn test_csv_export_writes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(dir.path());
        db.add_photo(vec![1], "image/jpeg", Some(local_ts(2024, 1, 1, 8)))
            .unwrap();

        let out = dir.path().join("journal.csv");
        let count = export_journal(&db, &out, ExportFormat::Csv).unwrap();
        assert_eq!(count, 1);

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("day,photos,note"));
        assert!(text.contains("2024-01-01,1,"));
    }

    #[test]
    fn test_json_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(dir.path());
        db.upsert_note(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "note")
            .unwrap();

        let out = dir.path().join("journal.json");
        export_journal(&db, &out, ExportFormat::Json).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(parsed[0]["note"], "note");
    }
}
