//! Time sources and local-calendar helpers.
//!
//! The engine never reads the wall clock directly: the coordinator owns a
//! [`Clock`] and passes `now` down, so scheduler behavior is reproducible
//! in tests with [`FixedClock`].

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    inner: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(at)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Local calendar in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Offset from config minutes, or the system's current local offset.
    pub fn from_offset_minutes(minutes: Option<i32>) -> Self {
        let offset = minutes
            .and_then(|m| FixedOffset::east_opt(m * 60))
            .unwrap_or_else(|| *chrono::Local::now().offset());
        Self { offset }
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn day_key(&self, date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    pub fn week_key(&self, date: NaiveDate) -> String {
        let iso = date.iso_week();
        format!("{}-W{:02}", iso.year(), iso.week())
    }

    pub fn month_key(&self, date: NaiveDate) -> String {
        date.format("%Y-%m").to_string()
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_clones_share_time() {
        let t0 = "2026-05-01T08:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let clock = FixedClock::new(t0);
        let other = clock.clone();
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(other.now(), t0 + chrono::Duration::hours(2));
    }

    #[test]
    fn local_date_follows_offset() {
        let at = "2026-05-01T23:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let utc = Calendar::utc();
        let tokyo = Calendar::from_offset_minutes(Some(9 * 60));
        assert_eq!(utc.date(at).day(), 1);
        assert_eq!(tokyo.date(at).day(), 2);
    }

    #[test]
    fn period_keys() {
        let cal = Calendar::utc();
        let d = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(cal.day_key(d), "2026-01-01");
        assert_eq!(cal.week_key(d), "2026-W01");
        assert_eq!(cal.month_key(d), "2026-01");
    }
}
