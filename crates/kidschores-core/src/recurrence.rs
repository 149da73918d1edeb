//! Next-due-date computation.
//!
//! Always derived from the stored due date, never from "now", so applying
//! the same advance twice is a no-op once the stored date is in the future.
//! Calendar arithmetic happens in the configured local offset.

use chrono::{DateTime, Datelike, Duration, Months, Utc};

use crate::clock::Calendar;
use crate::model::{Frequency, IntervalUnit, Recurrence};

/// One occurrence after `from`, before weekday alignment.
pub fn step(from: DateTime<Utc>, frequency: Frequency, cal: &Calendar) -> Option<DateTime<Utc>> {
    match frequency {
        Frequency::None => None,
        Frequency::Daily => Some(from + Duration::days(1)),
        Frequency::Weekly => Some(from + Duration::weeks(1)),
        Frequency::Biweekly => Some(from + Duration::weeks(2)),
        Frequency::Monthly => add_months(from, 1, cal),
        Frequency::Custom { interval, unit } => {
            let n = interval.max(1);
            match unit {
                IntervalUnit::Days => Some(from + Duration::days(i64::from(n))),
                IntervalUnit::Weeks => Some(from + Duration::weeks(i64::from(n))),
                IntervalUnit::Months => add_months(from, n, cal),
            }
        }
    }
}

/// Same local day `months` later, clamped to the length of the target month.
pub fn add_months(from: DateTime<Utc>, months: u32, cal: &Calendar) -> Option<DateTime<Utc>> {
    let local = from.with_timezone(&cal.offset()).naive_local();
    let shifted = local.checked_add_months(Months::new(months))?;
    Some(shifted.and_local_timezone(cal.offset()).single()?.with_timezone(&Utc))
}

/// Move forward a day at a time until the local weekday is allowed.
pub fn align_weekday(at: DateTime<Utc>, rec: &Recurrence, cal: &Calendar) -> DateTime<Utc> {
    let mut next = at;
    for _ in 0..7 {
        let weekday = next.with_timezone(&cal.offset()).weekday();
        if rec.allows(weekday) {
            break;
        }
        next += Duration::days(1);
    }
    next
}

/// First occurrence strictly after `now`, starting from the stored due date.
///
/// Advances at least once, so skipping a future occurrence still moves it.
/// Returns `None` for non-recurring chores.
pub fn next_due(
    stored: DateTime<Utc>,
    rec: &Recurrence,
    now: DateTime<Utc>,
    cal: &Calendar,
) -> Option<DateTime<Utc>> {
    let mut next = align_weekday(step(stored, rec.frequency, cal)?, rec, cal);
    while next <= now {
        next = align_weekday(step(next, rec.frequency, cal)?, rec, cal);
    }
    Some(next)
}

/// Whether the scheduler should advance this due date at `now`.
pub fn needs_advance(stored: Option<DateTime<Utc>>, rec: &Recurrence, now: DateTime<Utc>) -> bool {
    rec.frequency.is_recurring() && stored.is_some_and(|due| due <= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn daily_advances_one_day_past_now() {
        let cal = Calendar::utc();
        let rec = Recurrence::new(Frequency::Daily);
        let next = next_due(
            t("2026-03-01T18:00:00Z"),
            &rec,
            t("2026-03-01T19:00:00Z"),
            &cal,
        );
        assert_eq!(next, Some(t("2026-03-02T18:00:00Z")));
    }

    #[test]
    fn stale_due_date_catches_up() {
        let cal = Calendar::utc();
        let rec = Recurrence::new(Frequency::Daily);
        let next = next_due(
            t("2026-03-01T18:00:00Z"),
            &rec,
            t("2026-03-05T20:00:00Z"),
            &cal,
        );
        assert_eq!(next, Some(t("2026-03-06T18:00:00Z")));
    }

    #[test]
    fn monthly_clamps_to_month_length() {
        let cal = Calendar::utc();
        assert_eq!(
            add_months(t("2026-01-31T09:00:00Z"), 1, &cal),
            Some(t("2026-02-28T09:00:00Z"))
        );
        assert_eq!(
            add_months(t("2028-01-31T09:00:00Z"), 1, &cal),
            Some(t("2028-02-29T09:00:00Z"))
        );
    }

    #[test]
    fn weekday_filter_moves_to_next_allowed_day() {
        let cal = Calendar::utc();
        let mut rec = Recurrence::new(Frequency::Daily);
        rec.applicable_days = vec![Weekday::Mon, Weekday::Thu];
        // 2026-03-02 is a Monday.
        let next = next_due(
            t("2026-03-02T08:00:00Z"),
            &rec,
            t("2026-03-02T09:00:00Z"),
            &cal,
        );
        assert_eq!(next, Some(t("2026-03-05T08:00:00Z")));
    }

    #[test]
    fn weekly_keeps_allowed_weekday() {
        let cal = Calendar::utc();
        let mut rec = Recurrence::new(Frequency::Weekly);
        rec.applicable_days = vec![Weekday::Mon, Weekday::Thu];
        let next = next_due(
            t("2026-03-02T08:00:00Z"),
            &rec,
            t("2026-03-02T09:00:00Z"),
            &cal,
        );
        assert_eq!(next, Some(t("2026-03-09T08:00:00Z")));
    }

    #[test]
    fn skip_moves_future_occurrence() {
        let cal = Calendar::utc();
        let rec = Recurrence::new(Frequency::Biweekly);
        let next = next_due(
            t("2026-03-10T08:00:00Z"),
            &rec,
            t("2026-03-01T00:00:00Z"),
            &cal,
        );
        assert_eq!(next, Some(t("2026-03-24T08:00:00Z")));
    }

    #[test]
    fn custom_months_interval() {
        let cal = Calendar::utc();
        let rec = Recurrence::new(Frequency::Custom {
            interval: 3,
            unit: IntervalUnit::Months,
        });
        let next = next_due(
            t("2026-01-15T08:00:00Z"),
            &rec,
            t("2026-01-16T00:00:00Z"),
            &cal,
        );
        assert_eq!(next, Some(t("2026-04-15T08:00:00Z")));
    }

    #[test]
    fn non_recurring_has_no_next() {
        let cal = Calendar::utc();
        let rec = Recurrence::default();
        assert!(next_due(t("2026-01-15T08:00:00Z"), &rec, t("2026-02-01T00:00:00Z"), &cal).is_none());
        assert!(!needs_advance(Some(t("2026-01-15T08:00:00Z")), &rec, t("2026-02-01T00:00:00Z")));
    }

    fn frequency() -> impl Strategy<Value = Frequency> {
        prop_oneof![
            Just(Frequency::Daily),
            Just(Frequency::Weekly),
            Just(Frequency::Biweekly),
            Just(Frequency::Monthly),
            (1u32..10).prop_map(|interval| Frequency::Custom {
                interval,
                unit: IntervalUnit::Days
            }),
            (1u32..4).prop_map(|interval| Frequency::Custom {
                interval,
                unit: IntervalUnit::Months
            }),
        ]
    }

    fn weekdays() -> impl Strategy<Value = Vec<Weekday>> {
        proptest::collection::vec(0u8..7, 0..4).prop_map(|days| {
            days.into_iter()
                .filter_map(|d| Weekday::try_from(d).ok())
                .collect()
        })
    }

    proptest! {
        #[test]
        fn advance_is_deterministic_and_settles(
            freq in frequency(),
            days in weekdays(),
            stored_offset in 0i64..(400 * 24 * 60),
            now_offset in 0i64..(400 * 24 * 60),
        ) {
            let cal = Calendar::utc();
            let base = t("2026-01-01T07:30:00Z");
            let stored = base + Duration::minutes(stored_offset);
            let now = base + Duration::minutes(now_offset);
            let rec = Recurrence { frequency: freq, applicable_days: days };

            let first = next_due(stored, &rec, now, &cal).unwrap();
            let again = next_due(stored, &rec, now, &cal).unwrap();
            prop_assert_eq!(first, again);
            prop_assert!(first > now);
            prop_assert!(first > stored);
            // Once advanced, the scheduler leaves it alone.
            prop_assert!(!needs_advance(Some(first), &rec, now));
            prop_assert!(rec.allows(first.weekday()));
        }
    }
}
