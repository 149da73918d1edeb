use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ChoreState, PointSource};

/// Every state change in the system produces an Event.
/// The notification dispatcher and the presentation layer consume them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ChoreClaimed {
        kid_id: String,
        chore_id: String,
        actor: String,
        at: DateTime<Utc>,
    },
    ChoreApproved {
        kid_id: String,
        chore_id: String,
        actor: String,
        points: f64,
        at: DateTime<Utc>,
    },
    ChoreDisapproved {
        kid_id: String,
        chore_id: String,
        actor: String,
        /// Points debited when an approval was reversed.
        reverted_points: Option<f64>,
        at: DateTime<Utc>,
    },
    /// Another kid claimed a shared_first chore first.
    ChoreCompletedByOther {
        kid_id: String,
        chore_id: String,
        claimed_by: String,
        at: DateTime<Utc>,
    },
    ChoreOverdue {
        kid_id: String,
        chore_id: String,
        due_date: DateTime<Utc>,
        /// False when the overdue reminder was already sent recently.
        notify: bool,
        at: DateTime<Utc>,
    },
    ChoreReset {
        kid_id: String,
        chore_id: String,
        previous: ChoreState,
        at: DateTime<Utc>,
    },
    ChoreRescheduled {
        chore_id: String,
        previous_due: Option<DateTime<Utc>>,
        next_due: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    RewardRedeemed {
        kid_id: String,
        reward_id: String,
        request_id: String,
        actor: String,
        at: DateTime<Utc>,
    },
    RewardApproved {
        kid_id: String,
        reward_id: String,
        actor: String,
        cost: f64,
        at: DateTime<Utc>,
    },
    RewardDisapproved {
        kid_id: String,
        reward_id: String,
        actor: String,
        at: DateTime<Utc>,
    },
    PointsChanged {
        kid_id: String,
        delta: f64,
        balance: f64,
        source: PointSource,
        at: DateTime<Utc>,
    },
    BadgeEarned {
        kid_id: String,
        badge_id: String,
        period_key: String,
        at: DateTime<Utc>,
    },
    AchievementEarned {
        kid_id: String,
        achievement_id: String,
        at: DateTime<Utc>,
    },
    ChallengeCompleted {
        kid_id: String,
        challenge_id: String,
        at: DateTime<Utc>,
    },
    PenaltyApplied {
        kid_id: String,
        penalty_id: String,
        actor: String,
        at: DateTime<Utc>,
    },
    BonusApplied {
        kid_id: String,
        bonus_id: String,
        actor: String,
        at: DateTime<Utc>,
    },
    /// Local-day rollover reset the period counters.
    PeriodRollover {
        date: chrono::NaiveDate,
        weekly: bool,
        monthly: bool,
        at: DateTime<Utc>,
    },
    DataReset {
        at: DateTime<Utc>,
    },
    /// In-memory state is ahead of what is on disk.
    PersistenceDegraded {
        attempts: u32,
        error: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Kid the event is about, if any.
    pub fn kid_id(&self) -> Option<&str> {
        match self {
            Event::ChoreClaimed { kid_id, .. }
            | Event::ChoreApproved { kid_id, .. }
            | Event::ChoreDisapproved { kid_id, .. }
            | Event::ChoreCompletedByOther { kid_id, .. }
            | Event::ChoreOverdue { kid_id, .. }
            | Event::ChoreReset { kid_id, .. }
            | Event::RewardRedeemed { kid_id, .. }
            | Event::RewardApproved { kid_id, .. }
            | Event::RewardDisapproved { kid_id, .. }
            | Event::PointsChanged { kid_id, .. }
            | Event::BadgeEarned { kid_id, .. }
            | Event::AchievementEarned { kid_id, .. }
            | Event::ChallengeCompleted { kid_id, .. }
            | Event::PenaltyApplied { kid_id, .. }
            | Event::BonusApplied { kid_id, .. } => Some(kid_id),
            Event::ChoreRescheduled { .. }
            | Event::PeriodRollover { .. }
            | Event::DataReset { .. }
            | Event::PersistenceDegraded { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let ev = Event::ChoreClaimed {
            kid_id: "k".into(),
            chore_id: "c".into(),
            actor: "k".into(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "ChoreClaimed");
        assert_eq!(ev.kid_id(), Some("k"));
    }
}
