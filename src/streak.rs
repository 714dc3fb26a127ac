//! Streak computation over mood-log timestamps.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

/// Number of consecutive calendar days, ending today or yesterday, on which
/// at least one mood entry exists.
///
/// Day boundaries use the ambient local timezone; a user who logged
/// yesterday but not yet today keeps their streak alive until the next
/// midnight passes. Input order does not matter and same-day entries
/// count once.
pub fn calculate_streak(timestamps: &[DateTime<Utc>]) -> u32 {
    let today = Local::now().date_naive();
    let days = timestamps
        .iter()
        .map(|ts| ts.with_timezone(&Local).date_naive());
    streak_ending_at(days, today)
}

/// Core walk with an explicit `today`, so the clock can be pinned in tests.
pub fn streak_ending_at(days: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> u32 {
    let distinct: BTreeSet<NaiveDate> = days.into_iter().collect();

    let yesterday = today - Duration::days(1);
    let mut cursor = match distinct.iter().next_back() {
        // Missed both today and yesterday: the streak is broken.
        Some(&most_recent) if most_recent == today || most_recent == yesterday => most_recent,
        _ => return 0,
    };

    let mut streak = 0;
    for &day in distinct.iter().rev() {
        if day != cursor {
            break;
        }
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn empty_input_has_no_streak() {
        assert_eq!(calculate_streak(&[]), 0);
        assert_eq!(streak_ending_at([], d(2024, 3, 1)), 0);
    }

    #[test]
    fn three_consecutive_days_ending_today() {
        let days = [d(2024, 3, 1), d(2024, 2, 29), d(2024, 2, 28)];
        assert_eq!(streak_ending_at(days, d(2024, 3, 1)), 3);
    }

    #[test]
    fn stale_entries_break_the_streak() {
        // Most recent entry is two days before "today".
        let days = [d(2024, 3, 1), d(2024, 2, 29), d(2024, 2, 28)];
        assert_eq!(streak_ending_at(days, d(2024, 3, 3)), 0);
    }

    #[test]
    fn yesterday_only_keeps_the_streak_alive() {
        assert_eq!(streak_ending_at([d(2024, 3, 1)], d(2024, 3, 2)), 1);
    }

    #[test]
    fn run_ending_yesterday_counts_from_yesterday() {
        let days = [d(2024, 2, 29), d(2024, 2, 28), d(2024, 2, 27)];
        assert_eq!(streak_ending_at(days, d(2024, 3, 1)), 3);
    }

    #[test]
    fn same_day_entries_count_once() {
        let days = [d(2024, 1, 10), d(2024, 1, 10)];
        assert_eq!(streak_ending_at(days, d(2024, 1, 10)), 1);
    }

    #[test]
    fn gap_stops_the_walk_at_the_gap() {
        // Today, yesterday, then a hole where two-days-ago should be.
        let days = [d(2024, 3, 5), d(2024, 3, 4), d(2024, 3, 2)];
        assert_eq!(streak_ending_at(days, d(2024, 3, 5)), 2);
    }

    #[test]
    fn input_order_does_not_matter() {
        let days = [d(2024, 2, 28), d(2024, 3, 1), d(2024, 2, 29)];
        assert_eq!(streak_ending_at(days, d(2024, 3, 1)), 3);
    }

    #[test]
    fn repeated_calls_agree() {
        let days = vec![d(2024, 3, 1), d(2024, 2, 29)];
        let first = streak_ending_at(days.clone(), d(2024, 3, 1));
        let second = streak_ending_at(days, d(2024, 3, 1));
        assert_eq!(first, second);
    }

    #[test]
    fn timestamps_collapse_to_local_days() {
        // Two entries on the same local day, hours apart.
        let morning = Local.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        let evening = Local.with_ymd_and_hms(2024, 1, 10, 20, 0, 0).unwrap();
        let days = [morning, evening]
            .iter()
            .map(|ts| ts.date_naive())
            .collect::<Vec<_>>();
        assert_eq!(streak_ending_at(days, d(2024, 1, 10)), 1);
    }
}
