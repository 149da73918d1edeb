//! Kids, parents and per-kid statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::chore::{ChoreInstance, ChoreState};
use super::gamification::{AchievementProgress, BadgeAward, ChallengeProgress};
use super::new_id;
use super::reward::PendingReward;

/// Consecutive-day counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
    pub last_date: Option<NaiveDate>,
}

impl Streak {
    /// Record activity on `date`.
    ///
    /// The day after `last_date` extends the streak, the same day leaves it
    /// unchanged, anything else restarts at 1.
    pub fn record(&mut self, date: NaiveDate) {
        match self.last_date {
            Some(last) if last == date => return,
            Some(last) if last.succ_opt() == Some(date) => self.current += 1,
            _ => self.current = 1,
        }
        self.last_date = Some(date);
        self.longest = self.longest.max(self.current);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KidStats {
    #[serde(default)]
    pub completed_today: u32,
    #[serde(default)]
    pub completed_week: u32,
    #[serde(default)]
    pub completed_month: u32,
    #[serde(default)]
    pub completed_total: u32,
    #[serde(default)]
    pub points_today: f64,
    #[serde(default)]
    pub points_week: f64,
    #[serde(default)]
    pub points_month: f64,
    /// Positive, non-reward deltas only.
    #[serde(default)]
    pub cumulative_earned: f64,
    #[serde(default)]
    pub max_points_ever: f64,
    #[serde(default)]
    pub chore_approvals: BTreeMap<String, u32>,
    #[serde(default)]
    pub chore_streaks: BTreeMap<String, Streak>,
    #[serde(default)]
    pub overall_streak: Streak,
}

impl KidStats {
    pub fn reset_daily(&mut self) {
        self.completed_today = 0;
        self.points_today = 0.0;
    }

    pub fn reset_weekly(&mut self) {
        self.completed_week = 0;
        self.points_week = 0.0;
    }

    pub fn reset_monthly(&mut self) {
        self.completed_month = 0;
        self.points_month = 0.0;
    }
}

/// Reward bookkeeping for one kid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RewardTally {
    #[serde(default)]
    pub pending: Vec<PendingReward>,
    #[serde(default)]
    pub claims: BTreeMap<String, u32>,
    #[serde(default)]
    pub approvals: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kid {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub linked_user: Option<String>,
    #[serde(default)]
    pub points: f64,
    #[serde(default = "default_true")]
    pub enable_notifications: bool,
    /// Chore ID -> instance state.
    #[serde(default)]
    pub chores: BTreeMap<String, ChoreInstance>,
    #[serde(default)]
    pub badges: Vec<BadgeAward>,
    #[serde(default)]
    pub stats: KidStats,
    #[serde(default)]
    pub rewards: RewardTally,
    #[serde(default)]
    pub penalty_applies: BTreeMap<String, u32>,
    #[serde(default)]
    pub bonus_applies: BTreeMap<String, u32>,
    #[serde(default)]
    pub achievements: BTreeMap<String, AchievementProgress>,
    #[serde(default)]
    pub challenges: BTreeMap<String, ChallengeProgress>,
}

fn default_true() -> bool {
    true
}

impl Kid {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            linked_user: None,
            points: 0.0,
            enable_notifications: true,
            chores: BTreeMap::new(),
            badges: Vec::new(),
            stats: KidStats::default(),
            rewards: RewardTally::default(),
            penalty_applies: BTreeMap::new(),
            bonus_applies: BTreeMap::new(),
            achievements: BTreeMap::new(),
            challenges: BTreeMap::new(),
        }
    }

    /// Current state for a chore; missing entries are pending.
    pub fn chore_state(&self, chore_id: &str) -> ChoreState {
        self.chores
            .get(chore_id)
            .map(|i| i.state)
            .unwrap_or_default()
    }

    pub fn instance_mut(&mut self, chore_id: &str) -> &mut ChoreInstance {
        self.chores.entry(chore_id.to_string()).or_default()
    }

    pub fn badge_award(&self, badge_id: &str) -> Option<&BadgeAward> {
        self.badges.iter().find(|b| b.badge_id == badge_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub linked_user: Option<String>,
    /// Empty means the parent may act for every kid.
    #[serde(default)]
    pub associated_kids: Vec<String>,
}

impl Parent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            linked_user: None,
            associated_kids: Vec::new(),
        }
    }

    pub fn may_act_for(&self, kid_id: &str) -> bool {
        self.associated_kids.is_empty() || self.associated_kids.iter().any(|k| k == kid_id)
    }
}
