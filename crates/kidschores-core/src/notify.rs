//! Notification payloads built from engine events.
//!
//! Delivery is an external concern behind [`Notifier`]. Actions carry the
//! acting parent plus the kid and chore/reward reference; how a transport
//! encodes them is up to the transport.

use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::store::EntityStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Kid(String),
    Parent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ApproveChore,
    DisapproveChore,
    ApproveReward,
    DisapproveReward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub kind: ActionKind,
    /// Parent expected to perform the action.
    pub actor: String,
    pub kid_id: String,
    /// Chore or reward ID.
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
}

pub trait Notifier: Send {
    fn send(&self, notification: &Notification);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, n: &Notification) {
        tracing::info!(
            recipient = ?n.recipient,
            title = %n.title,
            actions = n.actions.len(),
            "{}",
            n.message
        );
    }
}

/// Convert events into notifications, honouring chore and kid flags.
pub fn build(store: &EntityStore, events: &[Event]) -> Vec<Notification> {
    let mut out = Vec::new();
    for event in events {
        match event {
            Event::ChoreClaimed {
                kid_id, chore_id, ..
            } => {
                let Some(chore) = store.chores.get(chore_id) else {
                    continue;
                };
                if !chore.notifications.on_claim || chore.auto_approve {
                    continue;
                }
                let message = format!(
                    "{} claimed '{}' for {} points",
                    store.kid_name(kid_id),
                    chore.name,
                    chore.default_points
                );
                to_parents(store, kid_id, "Chore claimed", &message, &mut out, |parent| {
                    vec![
                        action(ActionKind::ApproveChore, parent, kid_id, chore_id, None),
                        action(ActionKind::DisapproveChore, parent, kid_id, chore_id, None),
                    ]
                });
            }
            Event::ChoreApproved {
                kid_id,
                chore_id,
                points,
                ..
            } => {
                if chore_flag(store, chore_id, |n| n.on_approval) {
                    let message = format!(
                        "'{}' was approved. You earned {} points!",
                        store.chore_name(chore_id),
                        points
                    );
                    to_kid(store, kid_id, "Chore approved", message, &mut out);
                }
            }
            Event::ChoreDisapproved {
                kid_id, chore_id, ..
            } => {
                if chore_flag(store, chore_id, |n| n.on_disapproval) {
                    let message = format!("'{}' was disapproved.", store.chore_name(chore_id));
                    to_kid(store, kid_id, "Chore disapproved", message, &mut out);
                }
            }
            Event::ChoreOverdue {
                kid_id,
                chore_id,
                notify: true,
                ..
            } => {
                if chore_flag(store, chore_id, |n| n.on_overdue) {
                    let name = store.chore_name(chore_id);
                    to_kid(
                        store,
                        kid_id,
                        "Chore overdue",
                        format!("'{name}' is overdue."),
                        &mut out,
                    );
                    let message = format!("{}'s chore '{name}' is overdue.", store.kid_name(kid_id));
                    to_parents(store, kid_id, "Chore overdue", &message, &mut out, |_| Vec::new());
                }
            }
            Event::RewardRedeemed {
                kid_id,
                reward_id,
                request_id,
                ..
            } => {
                let still_pending = store
                    .kids
                    .get(kid_id)
                    .is_some_and(|k| k.rewards.pending.iter().any(|p| &p.request_id == request_id));
                if !still_pending {
                    continue;
                }
                let message = format!(
                    "{} wants to redeem '{}'",
                    store.kid_name(kid_id),
                    store.reward_name(reward_id)
                );
                to_parents(store, kid_id, "Reward requested", &message, &mut out, |parent| {
                    let req = Some(request_id.clone());
                    vec![
                        action(ActionKind::ApproveReward, parent, kid_id, reward_id, req.clone()),
                        action(ActionKind::DisapproveReward, parent, kid_id, reward_id, req),
                    ]
                });
            }
            Event::RewardApproved {
                kid_id, reward_id, ..
            } => {
                let message = format!("'{}' was approved. Enjoy!", store.reward_name(reward_id));
                to_kid(store, kid_id, "Reward approved", message, &mut out);
            }
            Event::RewardDisapproved {
                kid_id, reward_id, ..
            } => {
                let message = format!("'{}' was disapproved.", store.reward_name(reward_id));
                to_kid(store, kid_id, "Reward disapproved", message, &mut out);
            }
            Event::BadgeEarned {
                kid_id, badge_id, ..
            } => {
                let name = store
                    .badges
                    .get(badge_id)
                    .map(|b| b.name.as_str())
                    .unwrap_or(badge_id.as_str());
                celebrate(store, kid_id, "Badge earned", name, &mut out);
            }
            Event::AchievementEarned {
                kid_id,
                achievement_id,
                ..
            } => {
                let name = store
                    .achievements
                    .get(achievement_id)
                    .map(|a| a.name.as_str())
                    .unwrap_or(achievement_id.as_str());
                celebrate(store, kid_id, "Achievement earned", name, &mut out);
            }
            Event::ChallengeCompleted {
                kid_id,
                challenge_id,
                ..
            } => {
                let name = store
                    .challenges
                    .get(challenge_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or(challenge_id.as_str());
                celebrate(store, kid_id, "Challenge completed", name, &mut out);
            }
            Event::PenaltyApplied {
                kid_id, penalty_id, ..
            } => {
                if let Some(p) = store.penalties.get(penalty_id) {
                    let message = format!("Penalty '{}' applied: -{} points.", p.name, p.points);
                    to_kid(store, kid_id, "Penalty applied", message, &mut out);
                }
            }
            Event::BonusApplied {
                kid_id, bonus_id, ..
            } => {
                if let Some(b) = store.bonuses.get(bonus_id) {
                    let message = format!("Bonus '{}' applied: +{} points.", b.name, b.points);
                    to_kid(store, kid_id, "Bonus applied", message, &mut out);
                }
            }
            _ => {}
        }
    }
    out
}

fn chore_flag(
    store: &EntityStore,
    chore_id: &str,
    flag: impl Fn(&crate::model::ChoreNotifications) -> bool,
) -> bool {
    store
        .chores
        .get(chore_id)
        .is_some_and(|c| flag(&c.notifications))
}

fn action(
    kind: ActionKind,
    actor: &str,
    kid_id: &str,
    target_id: &str,
    request_id: Option<String>,
) -> NotificationAction {
    NotificationAction {
        kind,
        actor: actor.to_string(),
        kid_id: kid_id.to_string(),
        target_id: target_id.to_string(),
        request_id,
    }
}

fn to_kid(store: &EntityStore, kid_id: &str, title: &str, message: String, out: &mut Vec<Notification>) {
    if store.kids.get(kid_id).is_some_and(|k| k.enable_notifications) {
        out.push(Notification {
            recipient: Recipient::Kid(kid_id.to_string()),
            title: title.to_string(),
            message,
            actions: Vec::new(),
        });
    }
}

fn to_parents(
    store: &EntityStore,
    kid_id: &str,
    title: &str,
    message: &str,
    out: &mut Vec<Notification>,
    actions: impl Fn(&str) -> Vec<NotificationAction>,
) {
    for parent in store.parents_of(kid_id) {
        out.push(Notification {
            recipient: Recipient::Parent(parent.id.clone()),
            title: title.to_string(),
            message: message.to_string(),
            actions: actions(&parent.id),
        });
    }
}

fn celebrate(store: &EntityStore, kid_id: &str, title: &str, name: &str, out: &mut Vec<Notification>) {
    to_kid(store, kid_id, title, format!("You earned '{name}'!"), out);
    let message = format!("{} earned '{name}'.", store.kid_name(kid_id));
    to_parents(store, kid_id, title, &message, out, |_| Vec::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chore, Kid, Parent};
    use chrono::Utc;

    fn setup() -> (EntityStore, String, String, String) {
        let mut store = EntityStore::new();
        let kid = store.add_kid(Kid::new("Alice")).unwrap();
        let mut parent = Parent::new("Mom");
        parent.associated_kids.push(kid.clone());
        let parent = store.add_parent(parent).unwrap();
        let mut chore = Chore::new("Dishes", 5.0);
        chore.assigned_kids.push(kid.clone());
        let chore = store.add_chore(chore).unwrap();
        (store, kid, parent, chore)
    }

    fn claimed(kid: &str, chore: &str) -> Event {
        Event::ChoreClaimed {
            kid_id: kid.into(),
            chore_id: chore.into(),
            actor: kid.into(),
            at: Utc::now(),
        }
    }

    #[test]
    fn claim_notifies_parent_with_actions() {
        let (store, kid, parent, chore) = setup();
        let out = build(&store, &[claimed(&kid, &chore)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].recipient, Recipient::Parent(parent.clone()));
        assert_eq!(out[0].actions.len(), 2);
        let approve = &out[0].actions[0];
        assert_eq!(approve.kind, ActionKind::ApproveChore);
        assert_eq!(approve.actor, parent);
        assert_eq!(approve.kid_id, kid);
        assert_eq!(approve.target_id, chore);
    }

    #[test]
    fn claim_flag_off_suppresses_notification() {
        let (mut store, kid, _, chore) = setup();
        store.chore_mut(&chore).unwrap().notifications.on_claim = false;
        assert!(build(&store, &[claimed(&kid, &chore)]).is_empty());
    }

    #[test]
    fn muted_kid_gets_nothing() {
        let (mut store, kid, _, chore) = setup();
        store.kid_mut(&kid).unwrap().enable_notifications = false;
        let ev = Event::ChoreApproved {
            kid_id: kid.clone(),
            chore_id: chore,
            actor: "p".into(),
            points: 5.0,
            at: Utc::now(),
        };
        assert!(build(&store, &[ev]).is_empty());
    }

    #[test]
    fn throttled_overdue_is_silent() {
        let (store, kid, _, chore) = setup();
        let ev = Event::ChoreOverdue {
            kid_id: kid,
            chore_id: chore,
            due_date: Utc::now(),
            notify: false,
            at: Utc::now(),
        };
        assert!(build(&store, &[ev]).is_empty());
    }
}
