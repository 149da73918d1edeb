//! The coordinator facade.
//!
//! Owns the entity store and everything around it: name resolution,
//! parent authorization, persistence with bounded retries, notification
//! dispatch and the scheduler tick. Every mutating operation runs to
//! completion on `&mut self` and then saves once (or defers the save while
//! inside [`Coordinator::batch`]).
//!
//! ## Usage
//!
//! ```ignore
//! let mut coordinator = Coordinator::open_default()?;
//! coordinator.claim_chore("Alice", "Dishes")?;
//! let report = coordinator.approve_chore("Mom", "Alice", "Dishes", None)?;
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::badges;
use crate::clock::{Calendar, Clock, SystemClock};
use crate::context::Context;
use crate::error::{CoreError, Result, StorageError};
use crate::events::Event;
use crate::lifecycle::{global_state, Lifecycle};
use crate::model::{
    Achievement, Badge, Bonus, Challenge, Chore, ChoreState, CompletionMode, Frequency, Kid,
    Parent, Penalty, PointSource, Reward,
};
use crate::notify::{self, LogNotifier, Notification, Notifier};
use crate::points;
use crate::rewards;
use crate::scheduler;
use crate::storage::{self, migrations, Config, JsonFileStore, StorageBackend};
use crate::store::{EntityKind, EntityStore};

const SYSTEM_ACTOR: &str = "system";
const SCHEDULER_ACTOR: &str = "scheduler";

/// Outcome of the save that followed an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistStatus {
    Saved,
    /// Inside a batch; the save happens when the batch ends.
    Deferred,
    /// Every attempt failed. The in-memory state is kept and is ahead of
    /// the stored document.
    Degraded { attempts: u32, error: String },
}

/// What an operation did.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub events: Vec<Event>,
    pub notifications: Vec<Notification>,
    pub persisted: PersistStatus,
}

impl Report {
    pub fn is_degraded(&self) -> bool {
        matches!(self.persisted, PersistStatus::Degraded { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KidSummary {
    pub id: String,
    pub name: String,
    pub points: f64,
    /// Chore name to this kid's state.
    pub chores: BTreeMap<String, ChoreState>,
    pub pending_rewards: Vec<String>,
    pub badges: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoreSummary {
    pub id: String,
    pub name: String,
    pub completion_mode: CompletionMode,
    pub global_state: ChoreState,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_kids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub kids: Vec<KidSummary>,
    pub chores: Vec<ChoreSummary>,
}

pub struct Coordinator {
    store: EntityStore,
    backend: Box<dyn StorageBackend>,
    clock: Box<dyn Clock>,
    notifier: Box<dyn Notifier>,
    config: Config,
    calendar: Calendar,
    batch_depth: usize,
    dirty: bool,
    last_persist: PersistStatus,
}

impl Coordinator {
    /// Load (and migrate) the stored document, or start empty.
    ///
    /// # Errors
    /// Returns an error if the document cannot be read, was written by a
    /// newer schema, or does not match the entity layout.
    pub fn open(
        backend: Box<dyn StorageBackend>,
        clock: Box<dyn Clock>,
        config: Config,
    ) -> Result<Self> {
        let key = config.persistence.storage_key.clone();
        let (store, migrated) = match backend.load(&key)? {
            Some(mut doc) => {
                let migrated = migrations::migrate(&mut doc)?;
                if let Some(obj) = doc.as_object_mut() {
                    obj.remove("schema_version");
                }
                let mut store: EntityStore = serde_json::from_value(doc)
                    .map_err(|source| StorageError::Malformed {
                        key: key.clone(),
                        source,
                    })?;
                global_state::refresh_all(&mut store);
                (store, migrated)
            }
            None => (EntityStore::new(), false),
        };

        tracing::debug!(
            key = %key,
            kids = store.kids.len(),
            chores = store.chores.len(),
            migrated,
            "coordinator opened"
        );
        let calendar = config.calendar();
        let mut coordinator = Self {
            store,
            backend,
            clock,
            notifier: Box::new(LogNotifier),
            config,
            calendar,
            batch_depth: 0,
            dirty: migrated,
            last_persist: PersistStatus::Saved,
        };
        if migrated {
            tracing::info!(version = migrations::CURRENT_SCHEMA_VERSION, "stored document migrated");
            coordinator.persist();
        }
        Ok(coordinator)
    }

    /// Open the file-backed store in the data directory with the on-disk
    /// configuration and the system clock.
    ///
    /// # Errors
    /// Returns an error if the data directory, config or document cannot be
    /// loaded.
    pub fn open_default() -> Result<Self> {
        let config = Config::load()?;
        let backend = JsonFileStore::new(storage::data_dir()?);
        Self::open(Box::new(backend), Box::new(SystemClock), config)
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// True while the in-memory state is ahead of the stored document.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_persist(&self) -> &PersistStatus {
        &self.last_persist
    }

    pub fn resolve(&self, kind: EntityKind, name: &str) -> Result<String> {
        self.store.resolve(kind, name)
    }

    pub fn kid(&self, name: &str) -> Result<&Kid> {
        let id = self.store.resolve(EntityKind::Kid, name)?;
        self.store.kid(&id)
    }

    pub fn chore(&self, name: &str) -> Result<&Chore> {
        let id = self.store.resolve(EntityKind::Chore, name)?;
        self.store.chore(&id)
    }

    pub fn status(&self) -> Status {
        let store = &self.store;
        let kids = store
            .kids
            .values()
            .map(|kid| KidSummary {
                id: kid.id.clone(),
                name: kid.name.clone(),
                points: kid.points,
                chores: kid
                    .chores
                    .iter()
                    .map(|(id, inst)| (store.chore_name(id).to_string(), inst.state))
                    .collect(),
                pending_rewards: kid
                    .rewards
                    .pending
                    .iter()
                    .map(|p| store.reward_name(&p.reward_id).to_string())
                    .collect(),
                badges: kid.badges.iter().map(|b| b.badge_name.clone()).collect(),
            })
            .collect();
        let chores = store
            .chores
            .values()
            .map(|chore| ChoreSummary {
                id: chore.id.clone(),
                name: chore.name.clone(),
                completion_mode: chore.completion_mode,
                global_state: chore.global_state,
                due_date: chore.due_date,
                assigned_kids: chore
                    .assigned_kids
                    .iter()
                    .map(|k| store.kid_name(k).to_string())
                    .collect(),
            })
            .collect();
        Status { kids, chores }
    }

    /// Ledger entries for one kid, oldest first.
    pub fn history(&self, kid_name: &str) -> Result<Vec<crate::model::LedgerEntry>> {
        let kid_id = self.store.resolve(EntityKind::Kid, kid_name)?;
        Ok(points::history(&self.store, &kid_id).cloned().collect())
    }

    // ── Chores ──────────────────────────────────────────────────────

    pub fn claim_chore(&mut self, kid_name: &str, chore_name: &str) -> Result<Report> {
        let kid_id = self.store.resolve(EntityKind::Kid, kid_name)?;
        let chore_id = self.store.resolve(EntityKind::Chore, chore_name)?;
        self.execute(&kid_id, |store, ctx| {
            Lifecycle::new(store, ctx).claim(&kid_id, &chore_id)
        })
    }

    pub fn approve_chore(
        &mut self,
        parent_name: &str,
        kid_name: &str,
        chore_name: &str,
        points_awarded: Option<f64>,
    ) -> Result<Report> {
        let (parent_id, kid_id) = self.authorize(parent_name, kid_name)?;
        let chore_id = self.store.resolve(EntityKind::Chore, chore_name)?;
        self.execute(&parent_id, |store, ctx| {
            Lifecycle::new(store, ctx).approve(&kid_id, &chore_id, points_awarded)
        })
    }

    pub fn disapprove_chore(
        &mut self,
        parent_name: &str,
        kid_name: &str,
        chore_name: &str,
    ) -> Result<Report> {
        let (parent_id, kid_id) = self.authorize(parent_name, kid_name)?;
        let chore_id = self.store.resolve(EntityKind::Chore, chore_name)?;
        self.execute(&parent_id, |store, ctx| {
            Lifecycle::new(store, ctx).disapprove(&kid_id, &chore_id)
        })
    }

    pub fn reset_all_chores(&mut self) -> Result<Report> {
        self.execute(SYSTEM_ACTOR, |store, ctx| {
            let ids: Vec<String> = store.chores.keys().cloned().collect();
            let mut engine = Lifecycle::new(store, ctx);
            let mut events = Vec::new();
            for id in ids {
                events.extend(engine.reset(&id, None)?);
            }
            Ok(events)
        })
    }

    /// Reset overdue chores back to pending, optionally filtered by chore
    /// and/or kid. Without a kid filter, recurring chores whose due date has
    /// passed also move on to their next occurrence.
    pub fn reset_overdue_chores(
        &mut self,
        chore_name: Option<&str>,
        kid_name: Option<&str>,
    ) -> Result<Report> {
        let chore_filter = chore_name
            .map(|n| self.store.resolve(EntityKind::Chore, n))
            .transpose()?;
        let kid_filter = kid_name
            .map(|n| self.store.resolve(EntityKind::Kid, n))
            .transpose()?;
        if let (Some(chore_id), Some(kid_id)) = (&chore_filter, &kid_filter) {
            let chore = self.store.chore(chore_id)?;
            if !chore.is_assigned(kid_id) {
                return Err(CoreError::NotAssigned {
                    kid: self.store.kid_name(kid_id).to_string(),
                    chore: chore.name.clone(),
                });
            }
        }

        self.execute(SYSTEM_ACTOR, |store, ctx| {
            let targets: Vec<(String, Vec<String>)> = store
                .chores
                .values()
                .filter(|c| chore_filter.as_ref().map_or(true, |id| &c.id == id))
                .map(|c| {
                    let overdue = c
                        .assigned_kids
                        .iter()
                        .filter(|k| kid_filter.as_ref().map_or(true, |id| *k == id))
                        .filter(|k| {
                            store
                                .kids
                                .get(*k)
                                .is_some_and(|kid| kid.chore_state(&c.id) == ChoreState::Overdue)
                        })
                        .cloned()
                        .collect();
                    (c.id.clone(), overdue)
                })
                .filter(|(_, overdue): &(String, Vec<String>)| !overdue.is_empty())
                .collect();

            let mut engine = Lifecycle::new(store, ctx);
            let mut events = Vec::new();
            for (chore_id, kids) in targets {
                if kid_filter.is_none() {
                    events.extend(engine.advance_due(&chore_id)?);
                }
                for kid_id in &kids {
                    events.extend(engine.reset(&chore_id, Some(kid_id))?);
                }
            }
            Ok(events)
        })
    }

    /// Set or clear a chore's due date and reset it to pending.
    ///
    /// Past timestamps are rejected. Clearing the due date of a chore whose
    /// recurrence needs an anchor (anything but none/daily/weekly) also
    /// clears its frequency.
    pub fn set_chore_due_date(
        &mut self,
        chore_name: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Report> {
        let chore_id = self.store.resolve(EntityKind::Chore, chore_name)?;
        let now = self.clock.now();
        if let Some(due) = due_date {
            if due < now {
                return Err(CoreError::validation(
                    "due_date",
                    format!("{due} is in the past"),
                ));
            }
        }

        self.execute(SYSTEM_ACTOR, |store, ctx| {
            let chore = store.chore_mut(&chore_id)?;
            let previous = chore.due_date;
            chore.due_date = due_date;
            if due_date.is_none()
                && !matches!(
                    chore.recurrence.frequency,
                    Frequency::None | Frequency::Daily | Frequency::Weekly
                )
            {
                chore.recurrence.frequency = Frequency::None;
            }
            tracing::info!(chore = %chore_id, ?previous, next = ?due_date, "due date set");
            let mut events = vec![Event::ChoreRescheduled {
                chore_id: chore_id.clone(),
                previous_due: previous,
                next_due: due_date,
                at: ctx.now,
            }];
            events.extend(Lifecycle::new(store, ctx).reset(&chore_id, None)?);
            Ok(events)
        })
    }

    pub fn skip_chore_due_date(&mut self, chore_name: &str) -> Result<Report> {
        let chore_id = self.store.resolve(EntityKind::Chore, chore_name)?;
        self.execute(SYSTEM_ACTOR, |store, ctx| {
            Lifecycle::new(store, ctx).skip(&chore_id, None)
        })
    }

    // ── Rewards ─────────────────────────────────────────────────────

    pub fn redeem_reward(
        &mut self,
        parent_name: &str,
        kid_name: &str,
        reward_name: &str,
    ) -> Result<Report> {
        let (parent_id, kid_id) = self.authorize(parent_name, kid_name)?;
        let reward_id = self.store.resolve(EntityKind::Reward, reward_name)?;
        self.execute(&parent_id, |store, ctx| {
            rewards::redeem(store, ctx, &kid_id, &reward_id)
        })
    }

    pub fn approve_reward(
        &mut self,
        parent_name: &str,
        kid_name: &str,
        reward_name: &str,
    ) -> Result<Report> {
        let (parent_id, kid_id) = self.authorize(parent_name, kid_name)?;
        let reward_id = self.store.resolve(EntityKind::Reward, reward_name)?;
        self.execute(&parent_id, |store, ctx| {
            rewards::approve(store, ctx, &kid_id, &reward_id)
        })
    }

    pub fn disapprove_reward(
        &mut self,
        parent_name: &str,
        kid_name: &str,
        reward_name: &str,
    ) -> Result<Report> {
        let (parent_id, kid_id) = self.authorize(parent_name, kid_name)?;
        let reward_id = self.store.resolve(EntityKind::Reward, reward_name)?;
        self.execute(&parent_id, |store, ctx| {
            rewards::disapprove(store, ctx, &kid_id, &reward_id)
        })
    }

    // ── Points ──────────────────────────────────────────────────────

    pub fn apply_penalty(
        &mut self,
        parent_name: &str,
        kid_name: &str,
        penalty_name: &str,
    ) -> Result<Report> {
        let (parent_id, kid_id) = self.authorize(parent_name, kid_name)?;
        let penalty_id = self.store.resolve(EntityKind::Penalty, penalty_name)?;
        self.execute(&parent_id, |store, ctx| {
            let delta = store
                .penalties
                .get(&penalty_id)
                .map(Penalty::delta)
                .ok_or_else(|| CoreError::lookup("penalty", penalty_id.as_str()))?;
            *store
                .kid_mut(&kid_id)?
                .penalty_applies
                .entry(penalty_id.clone())
                .or_default() += 1;

            tracing::info!(kid = %kid_id, penalty = %penalty_id, delta, "penalty applied");
            let mut events = vec![Event::PenaltyApplied {
                kid_id: kid_id.clone(),
                penalty_id: penalty_id.clone(),
                actor: ctx.actor.clone(),
                at: ctx.now,
            }];
            events.push(points::apply_delta(
                store,
                ctx,
                &kid_id,
                delta,
                PointSource::Penalty(penalty_id.clone()),
            )?);
            events.extend(badges::evaluate(store, ctx, &kid_id)?);
            Ok(events)
        })
    }

    pub fn apply_bonus(
        &mut self,
        parent_name: &str,
        kid_name: &str,
        bonus_name: &str,
    ) -> Result<Report> {
        let (parent_id, kid_id) = self.authorize(parent_name, kid_name)?;
        let bonus_id = self.store.resolve(EntityKind::Bonus, bonus_name)?;
        self.execute(&parent_id, |store, ctx| {
            let delta = store
                .bonuses
                .get(&bonus_id)
                .map(Bonus::delta)
                .ok_or_else(|| CoreError::lookup("bonus", bonus_id.as_str()))?;
            *store
                .kid_mut(&kid_id)?
                .bonus_applies
                .entry(bonus_id.clone())
                .or_default() += 1;

            tracing::info!(kid = %kid_id, bonus = %bonus_id, delta, "bonus applied");
            let mut events = vec![Event::BonusApplied {
                kid_id: kid_id.clone(),
                bonus_id: bonus_id.clone(),
                actor: ctx.actor.clone(),
                at: ctx.now,
            }];
            events.push(points::apply_delta(
                store,
                ctx,
                &kid_id,
                delta,
                PointSource::Bonus(bonus_id.clone()),
            )?);
            events.extend(badges::evaluate(store, ctx, &kid_id)?);
            Ok(events)
        })
    }

    /// Manual signed adjustment of a kid's balance.
    pub fn adjust_points(&mut self, parent_name: &str, kid_name: &str, delta: f64) -> Result<Report> {
        if !delta.is_finite() || delta == 0.0 {
            return Err(CoreError::validation(
                "delta",
                "must be a non-zero finite number",
            ));
        }
        let (parent_id, kid_id) = self.authorize(parent_name, kid_name)?;
        self.execute(&parent_id, |store, ctx| {
            let mut events = vec![points::apply_delta(
                store,
                ctx,
                &kid_id,
                delta,
                PointSource::Adjustment,
            )?];
            events.extend(badges::evaluate(store, ctx, &kid_id)?);
            Ok(events)
        })
    }

    // ── Maintenance ─────────────────────────────────────────────────

    pub fn reset_penalties(&mut self, penalty_name: Option<&str>, kid_name: Option<&str>) -> Result<Report> {
        let penalty_id = penalty_name
            .map(|n| self.store.resolve(EntityKind::Penalty, n))
            .transpose()?;
        let kid_id = kid_name
            .map(|n| self.store.resolve(EntityKind::Kid, n))
            .transpose()?;
        self.execute(SYSTEM_ACTOR, |store, _| {
            for kid in matching_kids(store, kid_id.as_deref()) {
                match &penalty_id {
                    Some(id) => {
                        kid.penalty_applies.remove(id);
                    }
                    None => kid.penalty_applies.clear(),
                }
            }
            Ok(Vec::new())
        })
    }

    pub fn reset_bonuses(&mut self, bonus_name: Option<&str>, kid_name: Option<&str>) -> Result<Report> {
        let bonus_id = bonus_name
            .map(|n| self.store.resolve(EntityKind::Bonus, n))
            .transpose()?;
        let kid_id = kid_name
            .map(|n| self.store.resolve(EntityKind::Kid, n))
            .transpose()?;
        self.execute(SYSTEM_ACTOR, |store, _| {
            for kid in matching_kids(store, kid_id.as_deref()) {
                match &bonus_id {
                    Some(id) => {
                        kid.bonus_applies.remove(id);
                    }
                    None => kid.bonus_applies.clear(),
                }
            }
            Ok(Vec::new())
        })
    }

    pub fn reset_rewards(&mut self, reward_name: Option<&str>, kid_name: Option<&str>) -> Result<Report> {
        let reward_id = reward_name
            .map(|n| self.store.resolve(EntityKind::Reward, n))
            .transpose()?;
        let kid_id = kid_name
            .map(|n| self.store.resolve(EntityKind::Kid, n))
            .transpose()?;
        self.execute(SYSTEM_ACTOR, |store, _| {
            rewards::reset_counters(store, reward_id.as_deref(), kid_id.as_deref());
            Ok(Vec::new())
        })
    }

    /// Wipe every entity and the ledger.
    pub fn reset_all_data(&mut self) -> Result<Report> {
        tracing::warn!(
            kids = self.store.kids.len(),
            chores = self.store.chores.len(),
            "resetting all data"
        );
        self.execute(SYSTEM_ACTOR, |store, ctx| {
            *store = EntityStore::new();
            Ok(vec![Event::DataReset { at: ctx.now }])
        })
    }

    // ── Entity management ───────────────────────────────────────────

    pub fn add_kid(&mut self, kid: Kid) -> Result<String> {
        self.mutate(|store| store.add_kid(kid))
    }

    pub fn add_parent(&mut self, parent: Parent) -> Result<String> {
        self.mutate(|store| store.add_parent(parent))
    }

    pub fn add_chore(&mut self, chore: Chore) -> Result<String> {
        self.mutate(|store| {
            let id = store.add_chore(chore)?;
            global_state::refresh(store, &id);
            Ok(id)
        })
    }

    pub fn add_reward(&mut self, reward: Reward) -> Result<String> {
        self.mutate(|store| store.add_reward(reward))
    }

    pub fn add_badge(&mut self, badge: Badge) -> Result<String> {
        self.mutate(|store| store.add_badge(badge))
    }

    pub fn add_achievement(&mut self, achievement: Achievement) -> Result<String> {
        self.mutate(|store| store.add_achievement(achievement))
    }

    pub fn add_challenge(&mut self, challenge: Challenge) -> Result<String> {
        self.mutate(|store| store.add_challenge(challenge))
    }

    pub fn add_penalty(&mut self, penalty: Penalty) -> Result<String> {
        self.mutate(|store| store.add_penalty(penalty))
    }

    pub fn add_bonus(&mut self, bonus: Bonus) -> Result<String> {
        self.mutate(|store| store.add_bonus(bonus))
    }

    pub fn rename(&mut self, kind: EntityKind, name: &str, new_name: &str) -> Result<String> {
        self.mutate(|store| store.rename(kind, name, new_name))
    }

    pub fn remove(&mut self, kind: EntityKind, name: &str) -> Result<String> {
        self.mutate(|store| {
            let id = store.remove(kind, name)?;
            global_state::refresh_all(store);
            Ok(id)
        })
    }

    // ── Scheduler and persistence ───────────────────────────────────

    /// Run one scheduler pass at the clock's current time.
    ///
    /// # Errors
    /// A failing tick is logged; the caller retries on the next tick.
    pub fn tick(&mut self) -> Result<Report> {
        let result = self.execute(SCHEDULER_ACTOR, scheduler::run_tick);
        if let Err(e) = &result {
            // Phases already applied stay applied; they are idempotent.
            self.dirty = true;
            tracing::warn!(error = %e, "scheduler tick failed");
        }
        result
    }

    /// Run several operations with a single save at the end.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<(T, PersistStatus)> {
        self.batch_depth += 1;
        let out = f(self);
        self.batch_depth -= 1;
        let status = if self.batch_depth > 0 {
            PersistStatus::Deferred
        } else if self.dirty {
            self.persist()
        } else {
            PersistStatus::Saved
        };
        out.map(|value| (value, status))
    }

    /// Save now if anything is pending.
    ///
    /// # Errors
    /// Returns the last storage error once every attempt has failed.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        match self.save_with_retries() {
            Ok(()) => Ok(()),
            Err((_, e)) => Err(CoreError::Persistence(e)),
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn context(&self, actor: &str) -> Context {
        Context::from_config(&self.config, self.clock.now(), self.calendar, actor)
    }

    fn authorize(&self, parent_name: &str, kid_name: &str) -> Result<(String, String)> {
        let parent_id = self.store.resolve(EntityKind::Parent, parent_name)?;
        let kid_id = self.store.resolve(EntityKind::Kid, kid_name)?;
        let parent = self.store.parent(&parent_id)?;
        if !parent.may_act_for(&kid_id) {
            return Err(CoreError::NotAuthorized {
                parent: parent.name.clone(),
                kid: self.store.kid_name(&kid_id).to_string(),
            });
        }
        Ok((parent_id, kid_id))
    }

    fn execute<F>(&mut self, actor: &str, op: F) -> Result<Report>
    where
        F: FnOnce(&mut EntityStore, &Context) -> Result<Vec<Event>>,
    {
        let ctx = self.context(actor);
        let mut events = op(&mut self.store, &ctx)?;
        self.dirty = true;
        let notifications = self.dispatch(&events);
        let persisted = self.persist();
        if let PersistStatus::Degraded { attempts, error } = &persisted {
            events.push(Event::PersistenceDegraded {
                attempts: *attempts,
                error: error.clone(),
                at: ctx.now,
            });
        }
        Ok(Report {
            events,
            notifications,
            persisted,
        })
    }

    fn mutate<T>(&mut self, op: impl FnOnce(&mut EntityStore) -> Result<T>) -> Result<T> {
        let out = op(&mut self.store)?;
        self.dirty = true;
        self.persist();
        Ok(out)
    }

    fn dispatch(&self, events: &[Event]) -> Vec<Notification> {
        if !self.config.notifications.enabled {
            return Vec::new();
        }
        let notifications = notify::build(&self.store, events);
        for n in &notifications {
            self.notifier.send(n);
        }
        notifications
    }

    fn persist(&mut self) -> PersistStatus {
        if self.batch_depth > 0 {
            return PersistStatus::Deferred;
        }
        let status = match self.save_with_retries() {
            Ok(()) => PersistStatus::Saved,
            Err((attempts, e)) => {
                tracing::warn!(attempts, error = %e, "save failed; in-memory state is ahead of storage");
                PersistStatus::Degraded {
                    attempts,
                    error: e.to_string(),
                }
            }
        };
        self.last_persist = status.clone();
        status
    }

    /// One initial attempt plus `max_save_retries` retries.
    fn save_with_retries(&mut self) -> std::result::Result<(), (u32, StorageError)> {
        let key = self.config.persistence.storage_key.clone();
        let doc = self.document().map_err(|source| {
            (
                0,
                StorageError::Malformed {
                    key: key.clone(),
                    source,
                },
            )
        })?;

        let attempts = self.config.persistence.max_save_retries + 1;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.backend.save(&key, &doc) {
                Ok(()) => {
                    self.dirty = false;
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "save attempt failed");
                    last_error = Some(e);
                }
            }
        }
        let error = last_error.unwrap_or_else(|| StorageError::Injected("no save attempted".into()));
        Err((attempts, error))
    }

    fn document(&self) -> std::result::Result<serde_json::Value, serde_json::Error> {
        let mut doc = serde_json::to_value(&self.store)?;
        if let Some(obj) = doc.as_object_mut() {
            obj.insert(
                "schema_version".into(),
                migrations::CURRENT_SCHEMA_VERSION.into(),
            );
        }
        Ok(doc)
    }
}

fn matching_kids<'a>(store: &'a mut EntityStore, kid_id: Option<&'a str>) -> impl Iterator<Item = &'a mut Kid> {
    store
        .kids
        .values_mut()
        .filter(move |k| kid_id.map_or(true, |id| k.id == id))
}
