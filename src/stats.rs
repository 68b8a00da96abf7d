//! Day bucketing and streak statistics.
//!
//! A photo counts toward the calendar day it falls on in the viewer's LOCAL
//! timezone. Day keys are produced by local field extraction, never by
//! slicing a UTC timestamp string: around midnight those two disagree, and
//! only the local projection matches the day a human would name.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use std::collections::HashSet;

use crate::db::PhotoEntry;

/// Streak and coverage numbers derived from the photo collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Count of distinct documented days.
    pub total_days: usize,
    /// Consecutive documented days ending today. A missing photo today
    /// makes this 0 no matter how long the prior run was.
    pub streak: u32,
}

/// The local calendar day a capture instant falls on.
pub fn day_bucket(ts: DateTime<Utc>) -> NaiveDate {
    day_bucket_in(ts, &Local)
}

/// Day bucket in an explicit timezone (the testable core of [`day_bucket`]).
pub fn day_bucket_in<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Recompute stats from the full photo collection.
///
/// Pure and cheap; callers re-run it on every load and whenever the
/// collection changes rather than caching increments.
pub fn compute_stats(photos: &[PhotoEntry]) -> Stats {
    let days: HashSet<NaiveDate> = photos.iter().map(|p| day_bucket(p.captured_at)).collect();
    stats_for_days(&days, Local::now().date_naive())
}

/// Whether any photo falls on the given local day.
pub fn has_photo_on(photos: &[PhotoEntry], day: NaiveDate) -> bool {
    photos.iter().any(|p| day_bucket(p.captured_at) == day)
}

fn stats_for_days(days: &HashSet<NaiveDate>, today: NaiveDate) -> Stats {
    let total_days = days.len();

    let mut streak = 0u32;
    while days.contains(&(today - Duration::days(streak as i64))) {
        streak += 1;
    }

    Stats { total_days, streak }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days(list: &[NaiveDate]) -> HashSet<NaiveDate> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_day_bucket_uses_local_fields_not_utc_slice() {
        // 00:30 on Jan 4 in UTC+1 is still Jan 3 in UTC. The bucket must be
        // the local day.
        let tz = FixedOffset::east_opt(3600).unwrap();
        let ts = tz
            .with_ymd_and_hms(2024, 1, 4, 0, 30, 0)
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(ts.date_naive(), day(2024, 1, 3)); // the UTC slice
        assert_eq!(day_bucket_in(ts, &tz), day(2024, 1, 4)); // the local day
    }

    #[test]
    fn test_day_bucket_is_deterministic() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 6, 15, 3, 0, 0).unwrap();
        assert_eq!(day_bucket_in(ts, &tz), day_bucket_in(ts, &tz));
    }

    #[test]
    fn test_empty_collection() {
        let stats = stats_for_days(&HashSet::new(), day(2024, 1, 4));
        assert_eq!(stats, Stats { total_days: 0, streak: 0 });
    }

    #[test]
    fn test_gap_before_today_breaks_streak() {
        // Photos on Jan 1, Jan 2, Jan 4; today is Jan 4. Jan 3 is missing,
        // so only today counts.
        let set = days(&[day(2024, 1, 1), day(2024, 1, 2), day(2024, 1, 4)]);
        let stats = stats_for_days(&set, day(2024, 1, 4));
        assert_eq!(stats.total_days, 3);
        assert_eq!(stats.streak, 1);
    }

    #[test]
    fn test_three_consecutive_days_ending_today() {
        let set = days(&[day(2024, 1, 2), day(2024, 1, 3), day(2024, 1, 4)]);
        let stats = stats_for_days(&set, day(2024, 1, 4));
        assert_eq!(stats.streak, 3);
    }

    #[test]
    fn test_no_photo_today_means_zero_streak() {
        // Yesterday and the day before are documented, today is not.
        let set = days(&[day(2024, 1, 2), day(2024, 1, 3)]);
        let stats = stats_for_days(&set, day(2024, 1, 4));
        assert_eq!(stats.streak, 0);
        assert_eq!(stats.total_days, 2);
    }

    #[test]
    fn test_total_days_ignores_photos_per_day() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let mut set = HashSet::new();
        for hour in [8, 12, 20] {
            let ts = Utc.with_ymd_and_hms(2024, 1, 4, hour, 0, 0).unwrap();
            set.insert(day_bucket_in(ts, &tz));
        }
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_streak_crosses_month_boundary() {
        let set = days(&[day(2024, 1, 31), day(2024, 2, 1)]);
        let stats = stats_for_days(&set, day(2024, 2, 1));
        assert_eq!(stats.streak, 2);
    }
}
