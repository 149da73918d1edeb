use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What caused a point mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PointSource {
    Chore(String),
    Reward(String),
    Bonus(String),
    Penalty(String),
    Badge(String),
    Achievement(String),
    Challenge(String),
    Adjustment,
}

impl PointSource {
    /// Reward spending is excluded from earning statistics.
    pub fn is_spending(&self) -> bool {
        matches!(self, PointSource::Reward(_))
    }
}

/// Audit record for one point mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub kid_id: String,
    /// Kid or parent ID, or "scheduler"/"system".
    pub actor: String,
    pub source: PointSource,
    pub delta: f64,
    pub balance_after: f64,
    pub at: DateTime<Utc>,
}
