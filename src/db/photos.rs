//! Photo entry type and the canonical chronological ordering.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// A stored photo: image bytes plus the instant it was taken.
///
/// Entries are immutable after creation; the only lifecycle operation is
/// deletion by id.
#[derive(Debug, Clone)]
pub struct PhotoEntry {
    /// Opaque unique id, generated at creation.
    pub id: String,
    /// Capture instant (UTC). For imports this may be a user-chosen
    /// override rather than the wall clock at insert time.
    pub captured_at: DateTime<Utc>,
    /// MIME type of `image`. Captures are always `image/jpeg`; imports
    /// carry whatever type the source file had.
    pub mime: String,
    /// Encoded image bytes, stored opaque and never re-parsed.
    pub image: Vec<u8>,
}

/// The one canonical comparator: capture instant ascending, id as a
/// deterministic tie-break for photos sharing an instant.
///
/// Both display orders are derived from this single function (see
/// [`Timeline`]); there is deliberately no second, independently maintained
/// sort anywhere in the codebase.
pub fn chronological(a: &PhotoEntry, b: &PhotoEntry) -> Ordering {
    a.captured_at
        .cmp(&b.captured_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// A photo collection sorted once by the canonical comparator, exposing both
/// directions over the same data.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    // Held oldest-first; descending views iterate in reverse.
    photos: Vec<PhotoEntry>,
}

impl Timeline {
    pub fn new(mut photos: Vec<PhotoEntry>) -> Self {
        photos.sort_by(chronological);
        Self { photos }
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Oldest to newest, the timelapse order.
    pub fn ascending(&self) -> &[PhotoEntry] {
        &self.photos
    }

    /// Newest to oldest, the gallery/calendar order.
    pub fn descending(&self) -> impl DoubleEndedIterator<Item = &PhotoEntry> {
        self.photos.iter().rev()
    }

    /// The oldest entry ("start" in the comparison view).
    pub fn first(&self) -> Option<&PhotoEntry> {
        self.photos.first()
    }

    /// The newest entry ("today" in the comparison view).
    pub fn latest(&self) -> Option<&PhotoEntry> {
        self.photos.last()
    }

    pub fn get(&self, id: &str) -> Option<&PhotoEntry> {
        self.photos.iter().find(|p| p.id == id)
    }

    /// Position of a photo in ascending order.
    #[allow(dead_code)]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.photos.iter().position(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, secs: i64) -> PhotoEntry {
        PhotoEntry {
            id: id.to_string(),
            captured_at: Utc.timestamp_opt(secs, 0).unwrap(),
            mime: "image/jpeg".to_string(),
            image: Vec::new(),
        }
    }

    #[test]
    fn test_descending_is_reverse_of_ascending() {
        let tl = Timeline::new(vec![entry("b", 20), entry("a", 10), entry("c", 30)]);
        let asc: Vec<&str> = tl.ascending().iter().map(|p| p.id.as_str()).collect();
        let mut desc: Vec<&str> = tl.descending().map(|p| p.id.as_str()).collect();
        desc.reverse();
        assert_eq!(asc, desc);
        assert_eq!(asc, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tie_break_by_id() {
        let tl = Timeline::new(vec![entry("z", 10), entry("a", 10)]);
        let asc: Vec<&str> = tl.ascending().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(asc, vec!["a", "z"]);
    }

    #[test]
    fn test_first_and_latest() {
        let tl = Timeline::new(vec![entry("mid", 20), entry("old", 10), entry("new", 30)]);
        assert_eq!(tl.first().unwrap().id, "old");
        assert_eq!(tl.latest().unwrap().id, "new");
        assert_eq!(tl.position("mid"), Some(1));
    }
}
