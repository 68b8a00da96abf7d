//! Photo import ("upload") support.
//!
//! Imports read an existing image file into the journal with a user-editable
//! capture timestamp. The suggested default comes from the file's EXIF
//! capture time when present, falling back to the file's modification time.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::db::{Database, PhotoEntry};

const IMPORT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif"];

/// MIME type for an import, from the file extension. Unknown extensions are
/// stored as a generic type; the bytes are opaque either way.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => "application/octet-stream",
    }
}

fn is_importable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .map(|e| IMPORT_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Image files directly inside `dir`, newest modification first.
pub fn list_image_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<(PathBuf, std::time::SystemTime)> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_importable(e.path()))
        .filter_map(|e| {
            let mtime = e.metadata().ok()?.modified().ok()?;
            Some((e.path().to_path_buf(), mtime))
        })
        .collect();

    files.sort_by(|a, b| b.1.cmp(&a.1));
    files.into_iter().map(|(p, _)| p).collect()
}

/// EXIF capture time of an image file, interpreted in the local timezone.
fn exif_captured_at(path: &Path) -> Option<DateTime<Utc>> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let field = exif
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .or_else(|| exif.get_field(exif::Tag::DateTime, exif::In::PRIMARY))?;

    let text = field.display_value().to_string();
    let naive = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Suggested capture instant for an import: EXIF time, else file mtime,
/// else now. The user can still override before saving.
pub fn default_captured_at(path: &Path) -> DateTime<Utc> {
    if let Some(ts) = exif_captured_at(path) {
        return ts;
    }
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

/// Read the file and persist it as a photo entry.
pub fn import_photo(
    db: &Database,
    path: &Path,
    captured_at: Option<DateTime<Utc>>,
) -> Result<PhotoEntry> {
    let bytes =
        std::fs::read(path).map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    if bytes.is_empty() {
        return Err(anyhow!("{} is empty", path.display()));
    }

    let captured_at = captured_at.unwrap_or_else(|| default_captured_at(path));
    let entry = db.add_photo(bytes, mime_for_path(path), Some(captured_at))?;
    tracing::info!(id = %entry.id, path = %path.display(), "Imported photo");
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_list_image_files_filters_non_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("c.png"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let files = list_image_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| is_importable(p)));
    }

    #[test]
    fn test_import_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("journal.db")).unwrap();
        db.initialize().unwrap();

        let img_path = dir.path().join("photo.png");
        image::RgbImage::new(4, 4).save(&img_path).unwrap();

        let override_ts = Utc::now() - chrono::Duration::days(3);
        let entry = import_photo(&db, &img_path, Some(override_ts)).unwrap();
        assert_eq!(entry.mime, "image/png");
        assert_eq!(entry.captured_at, override_ts);

        let stored = db.get_photo(&entry.id).unwrap().unwrap();
        assert!(!stored.image.is_empty());
    }

    #[test]
    fn test_default_captured_at_uses_mtime_without_exif() {
        let dir = tempfile::tempdir().unwrap();
        let img_path = dir.path().join("photo.png");
        image::RgbImage::new(2, 2).save(&img_path).unwrap();

        let ts = default_captured_at(&img_path);
        let age = Utc::now().signed_duration_since(ts);
        assert!(age.num_seconds().abs() < 60);
    }
}
