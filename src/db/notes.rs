//! Daily note type.

use chrono::{DateTime, NaiveDate, Utc};

/// A free-text note attached to one local calendar day.
///
/// The day acts as the primary key: upserting for the same day overwrites,
/// so at most one note per day ever exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub day: NaiveDate,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

/// Storage encoding of a day key.
pub fn day_to_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Inverse of [`day_to_key`].
pub fn key_to_day(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_key_round_trip() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let key = day_to_key(day);
        assert_eq!(key, "2024-01-04");
        assert_eq!(key_to_day(&key), Some(day));
    }

    #[test]
    fn test_key_to_day_rejects_garbage() {
        assert_eq!(key_to_day("not-a-day"), None);
        assert_eq!(key_to_day("2024-13-40"), None);
    }
}
