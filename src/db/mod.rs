mod schema;
pub mod notes;
pub mod photos;
pub mod sqlite;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;

pub use notes::NoteEntry;
pub use photos::{chronological, PhotoEntry, Timeline};
pub use schema::SCHEMA_VERSION;

/// Typed facade over the on-device journal database.
///
/// Writes are independent single-record operations; there is no multi-record
/// transaction anywhere in the journal model.
pub struct Database {
    inner: sqlite::SqliteDb,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sqlite::SqliteDb::open(path)?;
        Ok(Self { inner: db })
    }

    /// Create missing collections and record the schema version.
    pub fn initialize(&self) -> Result<()> {
        self.inner.initialize()
    }

    // ========================================================================
    // Photo operations
    // ========================================================================

    pub fn add_photo(
        &self,
        image: Vec<u8>,
        mime: &str,
        captured_at: Option<DateTime<Utc>>,
    ) -> Result<PhotoEntry> {
        self.inner.add_photo(image, mime, captured_at)
    }

    /// All photos, newest first.
    pub fn all_photos(&self) -> Result<Vec<PhotoEntry>> {
        self.inner.all_photos()
    }

    /// All photos as a [`Timeline`] (both orders derivable).
    pub fn timeline(&self) -> Result<Timeline> {
        Ok(Timeline::new(self.inner.all_photos()?))
    }

    pub fn get_photo(&self, id: &str) -> Result<Option<PhotoEntry>> {
        self.inner.get_photo(id)
    }

    pub fn delete_photo(&self, id: &str) -> Result<()> {
        self.inner.delete_photo(id)
    }

    #[allow(dead_code)]
    pub fn photo_count(&self) -> Result<i64> {
        self.inner.photo_count()
    }

    // ========================================================================
    // Note operations
    // ========================================================================

    pub fn upsert_note(&self, day: NaiveDate, text: &str) -> Result<NoteEntry> {
        self.inner.upsert_note(day, text)
    }

    pub fn get_note(&self, day: NaiveDate) -> Result<Option<NoteEntry>> {
        self.inner.get_note(day)
    }

    pub fn delete_note(&self, day: NaiveDate) -> Result<()> {
        self.inner.delete_note(day)
    }

    pub fn all_notes(&self) -> Result<Vec<NoteEntry>> {
        self.inner.all_notes()
    }
}
