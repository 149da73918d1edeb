//! Badges, achievements and challenges.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::new_id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicCriteria {
    Points,
    ChoreCount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BadgePeriod {
    Weekly,
    Monthly,
    Window { start: NaiveDate, end: NaiveDate },
}

/// Trigger type and criteria.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeKind {
    /// Lifetime earnings reach `threshold`. Awarded once.
    Cumulative { threshold: f64 },
    /// Chores approved today reach `threshold`. Once per day.
    Daily { threshold: u32 },
    Periodic {
        period: BadgePeriod,
        criteria: PeriodicCriteria,
        threshold: f64,
    },
    Achievement { achievement_id: String },
    Challenge { challenge_id: String },
    /// A calendar date, every year when `recurring`.
    Special { date: NaiveDate, recurring: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: BadgeKind,
    /// Bonus points granted on award, scaled by `multiplier`.
    #[serde(default)]
    pub award_points: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Reward granted free of charge on award.
    #[serde(default)]
    pub reward_id: Option<String>,
    /// Empty means every kid.
    #[serde(default)]
    pub assigned_kids: Vec<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Badge {
    pub fn new(name: impl Into<String>, kind: BadgeKind) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            kind,
            award_points: 0.0,
            multiplier: 1.0,
            reward_id: None,
            assigned_kids: Vec::new(),
        }
    }

    pub fn applies_to(&self, kid_id: &str) -> bool {
        self.assigned_kids.is_empty() || self.assigned_kids.iter().any(|k| k == kid_id)
    }

    pub fn bonus_points(&self) -> f64 {
        self.award_points * self.multiplier
    }
}

/// Award record kept on the kid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BadgeAward {
    pub badge_id: String,
    pub badge_name: String,
    pub last_awarded: DateTime<Utc>,
    /// Qualifying period of the last award ("once", "2026-10-19", "2026-W42", ...).
    pub period_key: String,
    pub times_awarded: u32,
    pub multiplier: f64,
    /// Criteria value observed at the last award.
    pub progress: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementKind {
    /// Consecutive days with an approval (of `chore_id`, or of any chore).
    Streak { chore_id: Option<String>, days: u32 },
    /// Approvals since the achievement was created.
    Total { chore_id: Option<String>, count: u32 },
    /// Approvals within a single day.
    DailyMinimum { count: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: AchievementKind,
    #[serde(default)]
    pub reward_points: f64,
    #[serde(default)]
    pub assigned_kids: Vec<String>,
}

impl Achievement {
    pub fn new(name: impl Into<String>, kind: AchievementKind) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            kind,
            reward_points: 0.0,
            assigned_kids: Vec::new(),
        }
    }

    pub fn applies_to(&self, kid_id: &str) -> bool {
        self.assigned_kids.is_empty() || self.assigned_kids.iter().any(|k| k == kid_id)
    }

    pub fn target(&self) -> u32 {
        match &self.kind {
            AchievementKind::Streak { days, .. } => *days,
            AchievementKind::Total { count, .. } | AchievementKind::DailyMinimum { count } => *count,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AchievementProgress {
    #[serde(default)]
    pub current: u32,
    /// Approval count captured when the achievement was created.
    #[serde(default)]
    pub baseline: u32,
    #[serde(default)]
    pub awarded: bool,
    #[serde(default)]
    pub awarded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChallengeKind {
    TotalWithinWindow { chore_id: Option<String>, count: u32 },
    /// At least `count` approvals on every day of the window.
    DailyMinimum { count: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: ChallengeKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub reward_points: f64,
    #[serde(default)]
    pub assigned_kids: Vec<String>,
}

impl Challenge {
    pub fn new(
        name: impl Into<String>,
        kind: ChallengeKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            kind,
            start,
            end,
            reward_points: 0.0,
            assigned_kids: Vec::new(),
        }
    }

    pub fn applies_to(&self, kid_id: &str) -> bool {
        self.assigned_kids.is_empty() || self.assigned_kids.iter().any(|k| k == kid_id)
    }

    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChallengeProgress {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub daily_counts: BTreeMap<NaiveDate, u32>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_kind_is_tagged_by_type() {
        let badge = Badge::new("Starter", BadgeKind::Cumulative { threshold: 50.0 });
        let json = serde_json::to_value(&badge).unwrap();
        assert_eq!(json["kind"]["type"], "cumulative");
        assert_eq!(json["kind"]["threshold"], 50.0);
    }

    #[test]
    fn badge_bonus_scales_with_multiplier() {
        let mut badge = Badge::new("Star", BadgeKind::Daily { threshold: 3 });
        badge.award_points = 5.0;
        badge.multiplier = 1.5;
        assert_eq!(badge.bonus_points(), 7.5);
    }

    #[test]
    fn challenge_window_is_inclusive() {
        let start = "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let end = "2026-01-07T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let ch = Challenge::new("Week", ChallengeKind::DailyMinimum { count: 1 }, start, end);
        assert!(ch.is_active(start));
        assert!(ch.is_active(end));
        assert!(!ch.is_active(end + chrono::Duration::seconds(1)));
    }
}
