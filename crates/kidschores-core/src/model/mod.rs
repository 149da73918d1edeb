//! Entity model.
//!
//! Every entity is keyed by a generated internal ID. Names are mutable
//! labels, resolved to IDs by the entity store at the boundary.

mod adjustment;
mod chore;
mod gamification;
mod kid;
mod ledger;
mod reward;

pub use adjustment::{Bonus, Penalty};
pub use chore::{
    ApprovalResetPolicy, Chore, ChoreInstance, ChoreNotifications, ChoreState, CompletionMode,
    Frequency, IntervalUnit, OverdueHandling, Recurrence,
};
pub use gamification::{
    Achievement, AchievementKind, AchievementProgress, Badge, BadgeAward, BadgeKind, BadgePeriod,
    Challenge, ChallengeKind, ChallengeProgress, PeriodicCriteria,
};
pub use kid::{Kid, KidStats, Parent, RewardTally, Streak};
pub use ledger::{LedgerEntry, PointSource};
pub use reward::{PendingReward, Reward};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
