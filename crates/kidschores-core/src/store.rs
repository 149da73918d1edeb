//! In-memory entity store.
//!
//! Owns every entity collection, keyed by internal ID. Name resolution
//! happens here so the engines only ever see IDs. The store is the root of
//! the persisted document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::model::{
    Achievement, AchievementKind, AchievementProgress, Badge, Bonus, Challenge, Chore, Kid,
    LedgerEntry, Parent, Penalty, Reward,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Kid,
    Parent,
    Chore,
    Reward,
    Badge,
    Achievement,
    Challenge,
    Penalty,
    Bonus,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Kid => "kid",
            EntityKind::Parent => "parent",
            EntityKind::Chore => "chore",
            EntityKind::Reward => "reward",
            EntityKind::Badge => "badge",
            EntityKind::Achievement => "achievement",
            EntityKind::Challenge => "challenge",
            EntityKind::Penalty => "penalty",
            EntityKind::Bonus => "bonus",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Entities addressable by name.
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
}

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
                fn name(&self) -> &str {
                    &self.name
                }
                fn set_name(&mut self, name: String) {
                    self.name = name;
                }
            }
        )*
    };
}

impl_named!(Kid, Parent, Chore, Reward, Badge, Achievement, Challenge, Penalty, Bonus);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreMeta {
    /// Local date of the last period rollover.
    #[serde(default)]
    pub last_rollover: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    #[serde(default)]
    pub kids: BTreeMap<String, Kid>,
    #[serde(default)]
    pub parents: BTreeMap<String, Parent>,
    #[serde(default)]
    pub chores: BTreeMap<String, Chore>,
    #[serde(default)]
    pub rewards: BTreeMap<String, Reward>,
    #[serde(default)]
    pub badges: BTreeMap<String, Badge>,
    #[serde(default)]
    pub achievements: BTreeMap<String, Achievement>,
    #[serde(default)]
    pub challenges: BTreeMap<String, Challenge>,
    #[serde(default)]
    pub penalties: BTreeMap<String, Penalty>,
    #[serde(default)]
    pub bonuses: BTreeMap<String, Bonus>,
    #[serde(default)]
    pub ledger: Vec<LedgerEntry>,
    #[serde(default)]
    pub meta: StoreMeta,
}

/// Name first, then internal ID (notification actions carry IDs).
fn resolve_in<T: Named>(map: &BTreeMap<String, T>, kind: EntityKind, name: &str) -> Result<String> {
    map.values()
        .find(|e| e.name() == name)
        .or_else(|| map.get(name))
        .map(|e| e.id().to_string())
        .ok_or_else(|| CoreError::lookup(kind.label(), name))
}

fn check_name<T: Named>(
    map: &BTreeMap<String, T>,
    kind: EntityKind,
    name: &str,
    except_id: Option<&str>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CoreError::validation("name", format!("{kind} name is empty")));
    }
    let taken = map
        .values()
        .any(|e| e.name() == name && Some(e.id()) != except_id);
    if taken {
        return Err(CoreError::validation(
            "name",
            format!("{kind} '{name}' already exists"),
        ));
    }
    Ok(())
}

fn insert_named<T: Named>(map: &mut BTreeMap<String, T>, kind: EntityKind, entity: T) -> Result<String> {
    check_name(map, kind, entity.name(), None)?;
    let id = entity.id().to_string();
    map.insert(id.clone(), entity);
    Ok(id)
}

fn rename_in<T: Named>(
    map: &mut BTreeMap<String, T>,
    kind: EntityKind,
    name: &str,
    new_name: &str,
) -> Result<String> {
    let id = resolve_in(map, kind, name)?;
    check_name(map, kind, new_name, Some(&id))?;
    if let Some(e) = map.get_mut(&id) {
        e.set_name(new_name.to_string());
    }
    Ok(id)
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Resolution ──────────────────────────────────────────────────

    pub fn resolve(&self, kind: EntityKind, name: &str) -> Result<String> {
        match kind {
            EntityKind::Kid => resolve_in(&self.kids, kind, name),
            EntityKind::Parent => resolve_in(&self.parents, kind, name),
            EntityKind::Chore => resolve_in(&self.chores, kind, name),
            EntityKind::Reward => resolve_in(&self.rewards, kind, name),
            EntityKind::Badge => resolve_in(&self.badges, kind, name),
            EntityKind::Achievement => resolve_in(&self.achievements, kind, name),
            EntityKind::Challenge => resolve_in(&self.challenges, kind, name),
            EntityKind::Penalty => resolve_in(&self.penalties, kind, name),
            EntityKind::Bonus => resolve_in(&self.bonuses, kind, name),
        }
    }

    pub fn kid(&self, id: &str) -> Result<&Kid> {
        self.kids.get(id).ok_or_else(|| CoreError::lookup("kid", id))
    }

    pub fn kid_mut(&mut self, id: &str) -> Result<&mut Kid> {
        self.kids
            .get_mut(id)
            .ok_or_else(|| CoreError::lookup("kid", id))
    }

    pub fn chore(&self, id: &str) -> Result<&Chore> {
        self.chores.get(id).ok_or_else(|| CoreError::lookup("chore", id))
    }

    pub fn chore_mut(&mut self, id: &str) -> Result<&mut Chore> {
        self.chores
            .get_mut(id)
            .ok_or_else(|| CoreError::lookup("chore", id))
    }

    pub fn reward(&self, id: &str) -> Result<&Reward> {
        self.rewards.get(id).ok_or_else(|| CoreError::lookup("reward", id))
    }

    pub fn parent(&self, id: &str) -> Result<&Parent> {
        self.parents.get(id).ok_or_else(|| CoreError::lookup("parent", id))
    }

    /// Display name for an ID, falling back to the ID itself.
    pub fn kid_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.kids.get(id).map(|k| k.name.as_str()).unwrap_or(id)
    }

    pub fn chore_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.chores.get(id).map(|c| c.name.as_str()).unwrap_or(id)
    }

    pub fn reward_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.rewards.get(id).map(|r| r.name.as_str()).unwrap_or(id)
    }

    /// Parents allowed to act for `kid_id`.
    pub fn parents_of(&self, kid_id: &str) -> Vec<&Parent> {
        self.parents.values().filter(|p| p.may_act_for(kid_id)).collect()
    }

    // ── Creation ────────────────────────────────────────────────────

    pub fn add_kid(&mut self, kid: Kid) -> Result<String> {
        insert_named(&mut self.kids, EntityKind::Kid, kid)
    }

    pub fn add_parent(&mut self, parent: Parent) -> Result<String> {
        self.check_kid_ids(&parent.associated_kids)?;
        insert_named(&mut self.parents, EntityKind::Parent, parent)
    }

    pub fn add_chore(&mut self, chore: Chore) -> Result<String> {
        self.check_kid_ids(&chore.assigned_kids)?;
        if chore.default_points < 0.0 || !chore.default_points.is_finite() {
            return Err(CoreError::validation(
                "default_points",
                "chore points must be a non-negative number",
            ));
        }
        let chore_id = chore.id.clone();
        let assigned = chore.assigned_kids.clone();
        let id = insert_named(&mut self.chores, EntityKind::Chore, chore)?;
        for kid_id in &assigned {
            if let Some(kid) = self.kids.get_mut(kid_id) {
                kid.instance_mut(&chore_id);
            }
        }
        Ok(id)
    }

    pub fn add_reward(&mut self, reward: Reward) -> Result<String> {
        if reward.cost < 0.0 || !reward.cost.is_finite() {
            return Err(CoreError::validation("cost", "reward cost must be a non-negative number"));
        }
        insert_named(&mut self.rewards, EntityKind::Reward, reward)
    }

    pub fn add_badge(&mut self, badge: Badge) -> Result<String> {
        self.check_kid_ids(&badge.assigned_kids)?;
        if let Some(reward_id) = &badge.reward_id {
            self.reward(reward_id)?;
        }
        insert_named(&mut self.badges, EntityKind::Badge, badge)
    }

    /// Captures each kid's current approval count as the baseline for
    /// `total` achievements.
    pub fn add_achievement(&mut self, achievement: Achievement) -> Result<String> {
        self.check_kid_ids(&achievement.assigned_kids)?;
        check_name(&self.achievements, EntityKind::Achievement, &achievement.name, None)?;
        if let AchievementKind::Total { chore_id, .. } = &achievement.kind {
            for kid in self.kids.values_mut().filter(|k| achievement.applies_to(&k.id)) {
                let baseline = match chore_id {
                    Some(c) => kid.stats.chore_approvals.get(c).copied().unwrap_or(0),
                    None => kid.stats.completed_total,
                };
                kid.achievements.insert(
                    achievement.id.clone(),
                    AchievementProgress {
                        baseline,
                        ..AchievementProgress::default()
                    },
                );
            }
        }
        insert_named(&mut self.achievements, EntityKind::Achievement, achievement)
    }

    pub fn add_challenge(&mut self, challenge: Challenge) -> Result<String> {
        self.check_kid_ids(&challenge.assigned_kids)?;
        if challenge.end < challenge.start {
            return Err(CoreError::validation("end", "challenge ends before it starts"));
        }
        insert_named(&mut self.challenges, EntityKind::Challenge, challenge)
    }

    pub fn add_penalty(&mut self, penalty: Penalty) -> Result<String> {
        insert_named(&mut self.penalties, EntityKind::Penalty, penalty)
    }

    pub fn add_bonus(&mut self, bonus: Bonus) -> Result<String> {
        insert_named(&mut self.bonuses, EntityKind::Bonus, bonus)
    }

    fn check_kid_ids(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            self.kid(id)?;
        }
        Ok(())
    }

    // ── Rename / removal ────────────────────────────────────────────

    /// Changes the display name only; references are by ID.
    pub fn rename(&mut self, kind: EntityKind, name: &str, new_name: &str) -> Result<String> {
        match kind {
            EntityKind::Kid => rename_in(&mut self.kids, kind, name, new_name),
            EntityKind::Parent => rename_in(&mut self.parents, kind, name, new_name),
            EntityKind::Chore => rename_in(&mut self.chores, kind, name, new_name),
            EntityKind::Reward => rename_in(&mut self.rewards, kind, name, new_name),
            EntityKind::Badge => rename_in(&mut self.badges, kind, name, new_name),
            EntityKind::Achievement => rename_in(&mut self.achievements, kind, name, new_name),
            EntityKind::Challenge => rename_in(&mut self.challenges, kind, name, new_name),
            EntityKind::Penalty => rename_in(&mut self.penalties, kind, name, new_name),
            EntityKind::Bonus => rename_in(&mut self.bonuses, kind, name, new_name),
        }
    }

    /// Removes an entity and every reference to it. Returns the removed ID.
    pub fn remove(&mut self, kind: EntityKind, name: &str) -> Result<String> {
        let id = self.resolve(kind, name)?;
        match kind {
            EntityKind::Kid => {
                self.kids.remove(&id);
                for chore in self.chores.values_mut() {
                    chore.assigned_kids.retain(|k| k != &id);
                }
                for parent in self.parents.values_mut() {
                    parent.associated_kids.retain(|k| k != &id);
                }
                for badge in self.badges.values_mut() {
                    badge.assigned_kids.retain(|k| k != &id);
                }
                for achievement in self.achievements.values_mut() {
                    achievement.assigned_kids.retain(|k| k != &id);
                }
                for challenge in self.challenges.values_mut() {
                    challenge.assigned_kids.retain(|k| k != &id);
                }
            }
            EntityKind::Parent => {
                self.parents.remove(&id);
            }
            EntityKind::Chore => {
                self.chores.remove(&id);
                for kid in self.kids.values_mut() {
                    kid.chores.remove(&id);
                    kid.stats.chore_approvals.remove(&id);
                    kid.stats.chore_streaks.remove(&id);
                }
            }
            EntityKind::Reward => {
                self.rewards.remove(&id);
                for kid in self.kids.values_mut() {
                    kid.rewards.pending.retain(|p| p.reward_id != id);
                    kid.rewards.claims.remove(&id);
                    kid.rewards.approvals.remove(&id);
                }
                for badge in self.badges.values_mut() {
                    if badge.reward_id.as_deref() == Some(id.as_str()) {
                        badge.reward_id = None;
                    }
                }
            }
            EntityKind::Badge => {
                self.badges.remove(&id);
                for kid in self.kids.values_mut() {
                    kid.badges.retain(|b| b.badge_id != id);
                }
            }
            EntityKind::Achievement => {
                self.achievements.remove(&id);
                for kid in self.kids.values_mut() {
                    kid.achievements.remove(&id);
                }
            }
            EntityKind::Challenge => {
                self.challenges.remove(&id);
                for kid in self.kids.values_mut() {
                    kid.challenges.remove(&id);
                }
            }
            EntityKind::Penalty => {
                self.penalties.remove(&id);
                for kid in self.kids.values_mut() {
                    kid.penalty_applies.remove(&id);
                }
            }
            EntityKind::Bonus => {
                self.bonuses.remove(&id);
                for kid in self.kids.values_mut() {
                    kid.bonus_applies.remove(&id);
                }
            }
        }
        Ok(id)
    }
}
