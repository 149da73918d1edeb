//! Chore definitions and per-kid chore instance state.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::new_id;

/// Per-kid (and derived global) chore state.
///
/// Per-kid transitions:
///
/// ```text
///   pending ──claim──> claimed ──approve──> approved
///      │  ^               │                    │
///      │  └──disapprove───┘                    │
///      │  ^                                    │
///      │  └──────────disapprove (reversal)─────┘
///      ├──scheduler──> overdue ──claim──> claimed
///      └──shared_first side-effect──> completed_by_other
/// ```
///
/// `claimed_in_part`, `approved_in_part` and `independent` only appear as
/// global (cross-kid) states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChoreState {
    Pending,
    Claimed,
    Approved,
    Overdue,
    CompletedByOther,
    ClaimedInPart,
    ApprovedInPart,
    /// Independent chore whose kids are in different states.
    Independent,
}

impl ChoreState {
    /// Check if a per-kid transition is valid.
    pub fn can_transition_to(&self, to: &ChoreState) -> bool {
        self.valid_transitions().contains(to)
    }

    /// Like [`can_transition_to`](Self::can_transition_to), but applies the
    /// chore's reset policy: `approved → claimed` needs a `*_multiple` policy.
    pub fn can_transition_under(&self, to: &ChoreState, policy: ApprovalResetPolicy) -> bool {
        match (self, to) {
            (ChoreState::Approved, ChoreState::Claimed) => policy.allows_multiple(),
            _ => self.can_transition_to(to),
        }
    }

    /// Whether a parent can send this state back to pending. Overdue and
    /// completed_by_other only return to pending through resets.
    pub fn can_be_disapproved(&self) -> bool {
        !matches!(self, ChoreState::Overdue | ChoreState::CompletedByOther)
            && self.can_transition_to(&ChoreState::Pending)
    }

    /// Get valid next per-kid states for this state.
    pub fn valid_transitions(&self) -> &[ChoreState] {
        match self {
            ChoreState::Pending => &[
                ChoreState::Claimed,
                ChoreState::Overdue,
                ChoreState::CompletedByOther,
            ],
            ChoreState::Overdue => &[
                ChoreState::Claimed,
                ChoreState::Pending,
                ChoreState::CompletedByOther,
            ],
            ChoreState::Claimed | ChoreState::ClaimedInPart => {
                &[ChoreState::Approved, ChoreState::Pending]
            }
            ChoreState::Approved => &[ChoreState::Pending, ChoreState::Claimed],
            ChoreState::CompletedByOther => &[ChoreState::Pending],
            ChoreState::ApprovedInPart | ChoreState::Independent => &[],
        }
    }

    /// Claimed or approved.
    pub fn has_acted(&self) -> bool {
        matches!(self, ChoreState::Claimed | ChoreState::Approved)
    }
}

impl Default for ChoreState {
    fn default() -> Self {
        ChoreState::Pending
    }
}

impl fmt::Display for ChoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChoreState::Pending => "pending",
            ChoreState::Claimed => "claimed",
            ChoreState::Approved => "approved",
            ChoreState::Overdue => "overdue",
            ChoreState::CompletedByOther => "completed_by_other",
            ChoreState::ClaimedInPart => "claimed_in_part",
            ChoreState::ApprovedInPart => "approved_in_part",
            ChoreState::Independent => "independent",
        };
        f.write_str(s)
    }
}

/// How completion is shared between the assigned kids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Every kid has a fully separate instance.
    Independent,
    /// The first claim blocks every other kid.
    SharedFirst,
    /// Every kid must complete individually.
    SharedAll,
}

impl Default for CompletionMode {
    fn default() -> Self {
        CompletionMode::Independent
    }
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompletionMode::Independent => "independent",
            CompletionMode::SharedFirst => "shared_first",
            CompletionMode::SharedAll => "shared_all",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
}

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frequency {
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Custom { interval: u32, unit: IntervalUnit },
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::None
    }
}

impl Frequency {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Frequency::None)
    }
}

/// Frequency plus the weekdays an occurrence may fall on.
///
/// An empty `applicable_days` list allows every weekday.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recurrence {
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub applicable_days: Vec<Weekday>,
}

impl Recurrence {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            applicable_days: Vec::new(),
        }
    }

    pub fn allows(&self, day: Weekday) -> bool {
        self.applicable_days.is_empty() || self.applicable_days.contains(&day)
    }
}

/// How many approval cycles a chore allows before its next reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalResetPolicy {
    AtMidnightOnce,
    AtMidnightMultiple,
    AtDueDateOnce,
    AtDueDateMultiple,
}

impl ApprovalResetPolicy {
    pub fn allows_multiple(&self) -> bool {
        matches!(
            self,
            ApprovalResetPolicy::AtMidnightMultiple | ApprovalResetPolicy::AtDueDateMultiple
        )
    }

    pub fn resets_at_midnight(&self) -> bool {
        matches!(
            self,
            ApprovalResetPolicy::AtMidnightOnce | ApprovalResetPolicy::AtMidnightMultiple
        )
    }
}

impl Default for ApprovalResetPolicy {
    fn default() -> Self {
        ApprovalResetPolicy::AtMidnightOnce
    }
}

/// What happens once the due date passes before a claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverdueHandling {
    MarkOverdue,
    NeverOverdue,
    /// Advance to the next occurrence instead of going overdue.
    AutoReset,
}

impl Default for OverdueHandling {
    fn default() -> Self {
        OverdueHandling::MarkOverdue
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoreNotifications {
    #[serde(default = "default_true")]
    pub on_claim: bool,
    #[serde(default = "default_true")]
    pub on_approval: bool,
    #[serde(default = "default_true")]
    pub on_disapproval: bool,
    #[serde(default = "default_true")]
    pub on_overdue: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ChoreNotifications {
    fn default() -> Self {
        Self {
            on_claim: true,
            on_approval: true,
            on_disapproval: true,
            on_overdue: true,
        }
    }
}

/// Chore definition.
///
/// `id` is the only valid cross-reference key; `name` is a mutable label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chore {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub default_points: f64,
    #[serde(default)]
    pub assigned_kids: Vec<String>,
    #[serde(default)]
    pub completion_mode: CompletionMode,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default)]
    pub approval_reset: ApprovalResetPolicy,
    #[serde(default)]
    pub overdue_handling: OverdueHandling,
    #[serde(default)]
    pub notifications: ChoreNotifications,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub last_claimed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_completed: Option<DateTime<Utc>>,
    /// Derived cross-kid state, recomputed after every transition.
    #[serde(default)]
    pub global_state: ChoreState,
}

impl Chore {
    pub fn new(name: impl Into<String>, default_points: f64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            default_points,
            assigned_kids: Vec::new(),
            completion_mode: CompletionMode::default(),
            recurrence: Recurrence::default(),
            due_date: None,
            auto_approve: false,
            approval_reset: ApprovalResetPolicy::default(),
            overdue_handling: OverdueHandling::default(),
            notifications: ChoreNotifications::default(),
            labels: Vec::new(),
            last_claimed: None,
            last_completed: None,
            global_state: ChoreState::Pending,
        }
    }

    pub fn is_assigned(&self, kid_id: &str) -> bool {
        self.assigned_kids.iter().any(|k| k == kid_id)
    }

    pub fn is_due_by(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| due <= now)
    }
}

/// One kid's instance of a chore.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChoreInstance {
    #[serde(default)]
    pub state: ChoreState,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    /// Points credited by the approval currently in effect.
    #[serde(default)]
    pub points_awarded: Option<f64>,
    #[serde(default)]
    pub overdue_notified_at: Option<DateTime<Utc>>,
}

impl ChoreInstance {
    /// Back to pending, clearing claim/approval flags.
    pub fn reset(&mut self) {
        self.state = ChoreState::Pending;
        self.claimed_at = None;
        self.approved_at = None;
        self.points_awarded = None;
        self.overdue_notified_at = None;
    }
}
