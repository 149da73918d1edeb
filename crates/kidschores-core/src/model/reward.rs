use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: f64,
    /// Without approval a redemption is settled immediately.
    #[serde(default = "default_true")]
    pub requires_approval: bool,
}

fn default_true() -> bool {
    true
}

impl Reward {
    pub fn new(name: impl Into<String>, cost: f64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            cost,
            requires_approval: true,
        }
    }
}

/// A redemption waiting for a parent decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingReward {
    /// Reference carried by notification actions.
    pub request_id: String,
    pub reward_id: String,
    pub requested_at: DateTime<Utc>,
}

impl PendingReward {
    pub fn new(reward_id: impl Into<String>, requested_at: DateTime<Utc>) -> Self {
        Self {
            request_id: new_id(),
            reward_id: reward_id.into(),
            requested_at,
        }
    }
}
