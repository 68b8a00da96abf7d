//! Timelapse range selection.
//!
//! A range is an inclusive, contiguous slice of the chronologically
//! ascending photo sequence, chosen either by calendar-day bounds or by two
//! explicit photo identities. Reversed bounds are normalized by swapping, so
//! operand order can never produce an empty result on its own.

pub mod player;

pub use player::Player;

use chrono::{Duration, NaiveDate};

use crate::db::PhotoEntry;
use crate::stats::day_bucket;

/// Quick range presets. A preset stays "active" until the user manually
/// edits any bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    /// The last N calendar days ending on the last photo's day.
    LastDays(u32),
    /// Full chronological bounds.
    All,
}

/// The two mutually exclusive selection modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeBounds {
    /// Inclusive local-day bounds.
    Date { from: NaiveDate, to: NaiveDate },
    /// Inclusive bounds between two photos, resolved to their positions in
    /// ascending order.
    Photos { start: String, end: String },
}

#[derive(Debug, Clone, Default)]
pub struct RangeSelector {
    bounds: Option<RangeBounds>,
    active_preset: Option<RangePreset>,
}

impl RangeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> Option<&RangeBounds> {
        self.bounds.as_ref()
    }

    pub fn active_preset(&self) -> Option<RangePreset> {
        self.active_preset
    }

    /// Manual date-mode bounds. Clears any active preset.
    pub fn set_date_bounds(&mut self, from: NaiveDate, to: NaiveDate) {
        self.bounds = Some(RangeBounds::Date { from, to });
        self.active_preset = None;
    }

    /// Manual photo-mode bounds. Clears any active preset.
    pub fn set_photo_bounds(&mut self, start: String, end: String) {
        self.bounds = Some(RangeBounds::Photos { start, end });
        self.active_preset = None;
    }

    /// "Last N days": N calendar days ending on the chronologically-last
    /// photo's day. Always switches to date mode. No-op on an empty
    /// collection.
    pub fn apply_last_days(&mut self, n: u32, ascending: &[PhotoEntry]) {
        let Some(last) = ascending.last() else {
            return;
        };
        let n = n.max(1);
        let to = day_bucket(last.captured_at);
        let from = to - Duration::days(n as i64 - 1);
        self.bounds = Some(RangeBounds::Date { from, to });
        self.active_preset = Some(RangePreset::LastDays(n));
    }

    /// "All": the full chronological bounds.
    pub fn apply_all(&mut self, ascending: &[PhotoEntry]) {
        let (Some(first), Some(last)) = (ascending.first(), ascending.last()) else {
            self.bounds = None;
            self.active_preset = Some(RangePreset::All);
            return;
        };
        self.bounds = Some(RangeBounds::Date {
            from: day_bucket(first.captured_at),
            to: day_bucket(last.captured_at),
        });
        self.active_preset = Some(RangePreset::All);
    }

    /// Resolve the current bounds against the ascending photo sequence.
    ///
    /// With no bounds set, the full sequence is the range. Photo-mode bounds
    /// naming an id that no longer exists (e.g. deleted since selection)
    /// also fall back to the full sequence.
    pub fn select<'a>(&self, ascending: &'a [PhotoEntry]) -> &'a [PhotoEntry] {
        let Some(bounds) = &self.bounds else {
            return ascending;
        };

        match bounds {
            RangeBounds::Date { from, to } => {
                let (from, to) = if from > to { (*to, *from) } else { (*from, *to) };
                let start = ascending
                    .iter()
                    .position(|p| day_bucket(p.captured_at) >= from)
                    .unwrap_or(ascending.len());
                let end = ascending
                    .iter()
                    .rposition(|p| day_bucket(p.captured_at) <= to)
                    .map(|i| i + 1)
                    .unwrap_or(start);
                &ascending[start..end.max(start)]
            }
            RangeBounds::Photos { start, end } => {
                let a = ascending.iter().position(|p| p.id == *start);
                let b = ascending.iter().position(|p| p.id == *end);
                match (a, b) {
                    (Some(a), Some(b)) => {
                        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                        &ascending[lo..=hi]
                    }
                    _ => ascending,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone, Utc};

    fn photo(id: &str, y: i32, m: u32, d: u32) -> PhotoEntry {
        PhotoEntry {
            id: id.to_string(),
            captured_at: Local
                .with_ymd_and_hms(y, m, d, 12, 0, 0)
                .unwrap()
                .with_timezone(&Utc),
            mime: "image/jpeg".to_string(),
            image: Vec::new(),
        }
    }

    fn sample() -> Vec<PhotoEntry> {
        vec![
            photo("a", 2024, 1, 1),
            photo("b", 2024, 1, 2),
            photo("c", 2024, 1, 4),
            photo("d", 2024, 1, 7),
        ]
    }

    fn ids(range: &[PhotoEntry]) -> Vec<&str> {
        range.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_no_bounds_selects_everything() {
        let photos = sample();
        let sel = RangeSelector::new();
        assert_eq!(sel.select(&photos).len(), 4);
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let photos = sample();
        let mut sel = RangeSelector::new();
        sel.set_date_bounds(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        );
        assert_eq!(ids(sel.select(&photos)), vec!["b", "c"]);
    }

    #[test]
    fn test_reversed_date_bounds_select_same_range() {
        let photos = sample();
        let from = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();

        let mut forward = RangeSelector::new();
        forward.set_date_bounds(from, to);
        let mut reversed = RangeSelector::new();
        reversed.set_date_bounds(to, from);

        assert_eq!(ids(forward.select(&photos)), ids(reversed.select(&photos)));
    }

    #[test]
    fn test_reversed_photo_bounds_select_same_range() {
        let photos = sample();
        let mut forward = RangeSelector::new();
        forward.set_photo_bounds("a".into(), "d".into());
        let mut reversed = RangeSelector::new();
        reversed.set_photo_bounds("d".into(), "a".into());

        assert_eq!(ids(forward.select(&photos)), ids(reversed.select(&photos)));
        assert_eq!(forward.select(&photos).len(), 4);
    }

    #[test]
    fn test_photo_bounds_subrange() {
        let photos = sample();
        let mut sel = RangeSelector::new();
        sel.set_photo_bounds("b".into(), "c".into());
        assert_eq!(ids(sel.select(&photos)), vec!["b", "c"]);
    }

    #[test]
    fn test_unknown_photo_bound_falls_back_to_all() {
        let photos = sample();
        let mut sel = RangeSelector::new();
        sel.set_photo_bounds("b".into(), "deleted".into());
        assert_eq!(sel.select(&photos).len(), 4);
    }

    #[test]
    fn test_empty_date_range_is_empty_not_error() {
        let photos = sample();
        let mut sel = RangeSelector::new();
        sel.set_date_bounds(
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
        );
        assert!(sel.select(&photos).is_empty());
    }

    #[test]
    fn test_last_days_spans_exactly_n_days_ending_on_last_photo() {
        let photos = sample();
        let mut sel = RangeSelector::new();
        sel.apply_last_days(7, &photos);

        match sel.bounds().unwrap() {
            RangeBounds::Date { from, to } => {
                assert_eq!(*to, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
                assert_eq!((*to - *from).num_days(), 6); // 7 calendar days inclusive
            }
            other => panic!("expected date bounds, got {other:?}"),
        }
        assert_eq!(sel.active_preset(), Some(RangePreset::LastDays(7)));
        // Jan 1 is outside the 7-day window; days without photos inside the
        // window are fine.
        assert_eq!(ids(sel.select(&photos)), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_manual_edit_clears_active_preset() {
        let photos = sample();
        let mut sel = RangeSelector::new();
        sel.apply_all(&photos);
        assert_eq!(sel.active_preset(), Some(RangePreset::All));

        sel.set_date_bounds(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        assert_eq!(sel.active_preset(), None);
    }

    #[test]
    fn test_apply_presets_on_empty_collection() {
        let mut sel = RangeSelector::new();
        sel.apply_last_days(7, &[]);
        assert!(sel.bounds().is_none());
        sel.apply_all(&[]);
        assert!(sel.select(&[]).is_empty());
    }
}
