//! SQLite backend for the journal store.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use uuid::Uuid;

use super::notes::{day_to_key, key_to_day, NoteEntry};
use super::photos::{chronological, PhotoEntry};
use super::schema::{MIGRATION_STEPS, SCHEMA, SCHEMA_VERSION};

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

impl SqliteDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Bring the schema up to date.
    ///
    /// Runs the version-gated migration steps first, then replays the full
    /// `IF NOT EXISTS` schema: the version number alone is not treated as
    /// authoritative, so a collection missing for any reason is recreated.
    pub fn initialize(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (step, sql) in MIGRATION_STEPS.iter().enumerate() {
            if (step as i64) >= version {
                self.conn.execute_batch(sql)?;
            }
        }

        self.conn.execute_batch(SCHEMA)?;

        if version != SCHEMA_VERSION {
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tracing::info!(from = version, to = SCHEMA_VERSION, "Schema upgraded");
        }

        Ok(())
    }

    // ========================================================================
    // Photo operations
    // ========================================================================

    /// Insert a new photo. `captured_at` defaults to now when not supplied
    /// (imports pass the user-chosen instant).
    pub fn add_photo(
        &self,
        image: Vec<u8>,
        mime: &str,
        captured_at: Option<DateTime<Utc>>,
    ) -> Result<PhotoEntry> {
        let entry = PhotoEntry {
            id: Uuid::new_v4().to_string(),
            captured_at: captured_at.unwrap_or_else(Utc::now),
            mime: mime.to_string(),
            image,
        };

        self.conn.execute(
            "INSERT INTO photos (id, captured_at, mime, image) VALUES (?, ?, ?, ?)",
            rusqlite::params![
                entry.id,
                ts_to_str(entry.captured_at),
                entry.mime,
                entry.image,
            ],
        )?;

        Ok(entry)
    }

    /// All photos, newest first. The order is derived from the canonical
    /// chronological comparator, not from a second SQL-side sort.
    pub fn all_photos(&self) -> Result<Vec<PhotoEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, captured_at, mime, image FROM photos")?;
        let rows = stmt.query_map([], |row| {
            let ts: String = row.get(1)?;
            Ok(PhotoEntry {
                id: row.get(0)?,
                captured_at: str_to_ts(&ts)?,
                mime: row.get(2)?,
                image: row.get(3)?,
            })
        })?;

        let mut photos = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        photos.sort_by(|a, b| chronological(b, a));
        Ok(photos)
    }

    pub fn get_photo(&self, id: &str) -> Result<Option<PhotoEntry>> {
        let result = self.conn.query_row(
            "SELECT id, captured_at, mime, image FROM photos WHERE id = ?",
            [id],
            |row| {
                let ts: String = row.get(1)?;
                Ok(PhotoEntry {
                    id: row.get(0)?,
                    captured_at: str_to_ts(&ts)?,
                    mime: row.get(2)?,
                    image: row.get(3)?,
                })
            },
        );
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent: deleting an unknown id is not an error.
    pub fn delete_photo(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM photos WHERE id = ?", [id])?;
        Ok(())
    }

    pub fn photo_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?)
    }

    // ========================================================================
    // Note operations
    // ========================================================================

    /// Overwrite the note for `day`, stamping `updated_at` to now.
    pub fn upsert_note(&self, day: NaiveDate, text: &str) -> Result<NoteEntry> {
        let entry = NoteEntry {
            day,
            text: text.to_string(),
            updated_at: Utc::now(),
        };

        self.conn.execute(
            r#"
            INSERT INTO notes (day, text, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(day) DO UPDATE SET text = excluded.text, updated_at = excluded.updated_at
            "#,
            rusqlite::params![day_to_key(day), entry.text, ts_to_str(entry.updated_at)],
        )?;

        Ok(entry)
    }

    pub fn get_note(&self, day: NaiveDate) -> Result<Option<NoteEntry>> {
        let result = self.conn.query_row(
            "SELECT day, text, updated_at FROM notes WHERE day = ?",
            [day_to_key(day)],
            |row| {
                let day_key: String = row.get(0)?;
                let ts: String = row.get(2)?;
                Ok((day_key, row.get::<_, String>(1)?, ts))
            },
        );
        match result {
            Ok((day_key, text, ts)) => {
                let day = key_to_day(&day_key)
                    .ok_or_else(|| anyhow::anyhow!("invalid day key in notes: {day_key}"))?;
                Ok(Some(NoteEntry {
                    day,
                    text,
                    updated_at: DateTime::parse_from_rfc3339(&ts)?.with_timezone(&Utc),
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent: deleting a day without a note is not an error.
    pub fn delete_note(&self, day: NaiveDate) -> Result<()> {
        self.conn
            .execute("DELETE FROM notes WHERE day = ?", [day_to_key(day)])?;
        Ok(())
    }

    /// All notes, newest day first.
    pub fn all_notes(&self) -> Result<Vec<NoteEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT day, text, updated_at FROM notes ORDER BY day DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut notes = Vec::new();
        for row in rows {
            let (day_key, text, ts) = row?;
            let day = key_to_day(&day_key)
                .ok_or_else(|| anyhow::anyhow!("invalid day key in notes: {day_key}"))?;
            notes.push(NoteEntry {
                day,
                text,
                updated_at: DateTime::parse_from_rfc3339(&ts)?.with_timezone(&Utc),
            });
        }
        Ok(notes)
    }
}

fn ts_to_str(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn str_to_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn db() -> SqliteDb {
        let db = SqliteDb::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_add_and_get_photo() {
        let db = db();
        let entry = db
            .add_photo(vec![1, 2, 3], "image/jpeg", None)
            .unwrap();

        let fetched = db.get_photo(&entry.id).unwrap().unwrap();
        assert_eq!(fetched.id, entry.id);
        assert_eq!(fetched.image, vec![1, 2, 3]);
        assert_eq!(fetched.mime, "image/jpeg");
    }

    #[test]
    fn test_all_photos_newest_first() {
        let db = db();
        let old = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        db.add_photo(vec![0], "image/jpeg", Some(old)).unwrap();
        let newest = db.add_photo(vec![1], "image/jpeg", Some(new)).unwrap();

        let all = db.all_photos().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, newest.id);
    }

    #[test]
    fn test_delete_photo_is_idempotent() {
        let db = db();
        let entry = db.add_photo(vec![0], "image/jpeg", None).unwrap();
        db.delete_photo(&entry.id).unwrap();
        db.delete_photo(&entry.id).unwrap();
        db.delete_photo("no-such-id").unwrap();
        assert_eq!(db.photo_count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_note_overwrites() {
        let db = db();
        let day = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        db.upsert_note(day, "first").unwrap();
        db.upsert_note(day, "second").unwrap();

        assert_eq!(db.get_note(day).unwrap().unwrap().text, "second");
        assert_eq!(db.all_notes().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_note_is_idempotent() {
        let db = db();
        let day = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        db.delete_note(day).unwrap();
        db.upsert_note(day, "text").unwrap();
        db.delete_note(day).unwrap();
        db.delete_note(day).unwrap();
        assert!(db.get_note(day).unwrap().is_none());
    }

    #[test]
    fn test_all_notes_newest_day_first() {
        let db = db();
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        db.upsert_note(d1, "older").unwrap();
        db.upsert_note(d2, "newer").unwrap();

        let notes = db.all_notes().unwrap();
        assert_eq!(notes[0].day, d2);
        assert_eq!(notes[1].day, d1);
    }

    #[test]
    fn test_missing_collection_is_recreated() {
        let db = db();
        // Simulate a partially applied upgrade: version says current, but a
        // collection is gone.
        db.conn.execute("DROP TABLE notes", []).unwrap();
        db.initialize().unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        db.upsert_note(day, "still works").unwrap();
        assert!(db.get_note(day).unwrap().is_some());
    }

    #[test]
    fn test_migration_from_empty_sets_version() {
        let db = db();
        let version: i64 = db
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");
        let db = SqliteDb::open(&path).unwrap();
        db.initialize().unwrap();
        db.add_photo(vec![9], "image/png", None).unwrap();
        drop(db);

        let db = SqliteDb::open(&path).unwrap();
        db.initialize().unwrap();
        assert_eq!(db.photo_count().unwrap(), 1);
    }
}
