use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::clock::Calendar;
use crate::storage::Config;

/// Per-operation inputs shared by the engines.
#[derive(Debug, Clone)]
pub struct Context {
    pub now: DateTime<Utc>,
    pub calendar: Calendar,
    /// Kid/parent ID, or "scheduler"/"system".
    pub actor: String,
    pub ledger_max_entries: usize,
    pub precheck_balance: bool,
    pub overdue_notify_interval: Duration,
}

impl Context {
    pub fn new(now: DateTime<Utc>, calendar: Calendar, actor: impl Into<String>) -> Self {
        Self {
            now,
            calendar,
            actor: actor.into(),
            ledger_max_entries: 1000,
            precheck_balance: true,
            overdue_notify_interval: Duration::hours(24),
        }
    }

    pub fn from_config(
        config: &Config,
        now: DateTime<Utc>,
        calendar: Calendar,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            now,
            calendar,
            actor: actor.into(),
            ledger_max_entries: config.ledger.max_entries,
            precheck_balance: config.rewards.precheck_balance,
            overdue_notify_interval: Duration::hours(i64::from(
                config.schedule.overdue_notify_interval_hours,
            )),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.calendar.date(self.now)
    }
}
