//! Chore lifecycle engine.
//!
//! Enforces the per-(kid, chore) state machine and keeps the derived global
//! state current. Every command validates first and mutates second, so an
//! `Err` leaves the store untouched. Commands return the events they
//! produced; nothing is dispatched from here.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = Lifecycle::new(&mut store, &ctx);
//! let events = engine.claim(&kid_id, &chore_id)?;
//! ```

pub mod global_state;

use crate::badges;
use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::model::{Chore, ChoreState, CompletionMode, PointSource};
use crate::points;
use crate::recurrence;
use crate::store::EntityStore;

pub struct Lifecycle<'a> {
    store: &'a mut EntityStore,
    ctx: &'a Context,
}

impl<'a> Lifecycle<'a> {
    pub fn new(store: &'a mut EntityStore, ctx: &'a Context) -> Self {
        Self { store, ctx }
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Claim a chore for a kid.
    ///
    /// Valid from `pending`/`overdue`, and from `approved` when the chore's
    /// approval-reset policy allows multiple approvals per cycle.
    pub fn claim(&mut self, kid_id: &str, chore_id: &str) -> Result<Vec<Event>> {
        let chore = self.assigned_chore(kid_id, chore_id)?;
        let state = self.store.kid(kid_id)?.chore_state(chore_id);
        let mode = chore.completion_mode;
        let auto_approve = chore.auto_approve;

        if state == ChoreState::CompletedByOther {
            return Err(self.already_claimed(chore));
        }
        if !state.can_transition_under(&ChoreState::Claimed, chore.approval_reset) {
            return Err(self.invalid(kid_id, chore, state, "claim"));
        }
        if auto_approve {
            check_points(chore.default_points)?;
        }
        if mode == CompletionMode::SharedFirst {
            let taken = chore.assigned_kids.iter().any(|k| {
                k != kid_id
                    && self
                        .store
                        .kids
                        .get(k)
                        .is_some_and(|kid| kid.chore_state(chore_id).has_acted())
            });
            if taken {
                return Err(self.already_claimed(chore));
            }
        }
        let others: Vec<String> = chore
            .assigned_kids
            .iter()
            .filter(|k| k.as_str() != kid_id)
            .cloned()
            .collect();

        let now = self.ctx.now;
        let inst = self.store.kid_mut(kid_id)?.instance_mut(chore_id);
        inst.state = ChoreState::Claimed;
        inst.claimed_at = Some(now);
        inst.approved_at = None;
        inst.points_awarded = None;
        self.store.chore_mut(chore_id)?.last_claimed = Some(now);

        tracing::debug!(kid = %kid_id, chore = %chore_id, from = %state, "chore claimed");
        let mut events = vec![Event::ChoreClaimed {
            kid_id: kid_id.to_string(),
            chore_id: chore_id.to_string(),
            actor: self.ctx.actor.clone(),
            at: now,
        }];

        if mode == CompletionMode::SharedFirst {
            for other in others {
                let Some(kid) = self.store.kids.get_mut(&other) else {
                    continue;
                };
                let inst = kid.instance_mut(chore_id);
                if matches!(inst.state, ChoreState::Pending | ChoreState::Overdue) {
                    inst.state = ChoreState::CompletedByOther;
                    events.push(Event::ChoreCompletedByOther {
                        kid_id: other,
                        chore_id: chore_id.to_string(),
                        claimed_by: kid_id.to_string(),
                        at: now,
                    });
                }
            }
        }
        global_state::refresh(self.store, chore_id);

        if auto_approve {
            events.extend(self.approve(kid_id, chore_id, None)?);
        }
        Ok(events)
    }

    /// Approve a claimed chore and credit points (override or default).
    pub fn approve(
        &mut self,
        kid_id: &str,
        chore_id: &str,
        points_override: Option<f64>,
    ) -> Result<Vec<Event>> {
        let chore = self.assigned_chore(kid_id, chore_id)?;
        let state = self.store.kid(kid_id)?.chore_state(chore_id);
        if !state.can_transition_to(&ChoreState::Approved) {
            return Err(self.invalid(kid_id, chore, state, "approve"));
        }
        let points = points_override.unwrap_or(chore.default_points);
        check_points(points)?;

        let now = self.ctx.now;
        let today = self.ctx.today();
        let kid = self.store.kid_mut(kid_id)?;
        let inst = kid.instance_mut(chore_id);
        inst.state = ChoreState::Approved;
        inst.approved_at = Some(now);
        inst.points_awarded = Some(points);

        let stats = &mut kid.stats;
        stats.completed_today += 1;
        stats.completed_week += 1;
        stats.completed_month += 1;
        stats.completed_total += 1;
        *stats.chore_approvals.entry(chore_id.to_string()).or_default() += 1;
        stats
            .chore_streaks
            .entry(chore_id.to_string())
            .or_default()
            .record(today);
        stats.overall_streak.record(today);
        self.store.chore_mut(chore_id)?.last_completed = Some(now);

        tracing::info!(kid = %kid_id, chore = %chore_id, points, "chore approved");
        let mut events = vec![Event::ChoreApproved {
            kid_id: kid_id.to_string(),
            chore_id: chore_id.to_string(),
            actor: self.ctx.actor.clone(),
            points,
            at: now,
        }];
        events.push(points::apply_delta(
            self.store,
            self.ctx,
            kid_id,
            points,
            PointSource::Chore(chore_id.to_string()),
        )?);
        global_state::refresh(self.store, chore_id);
        events.extend(badges::record_approval(self.store, self.ctx, kid_id, chore_id)?);
        events.extend(badges::evaluate(self.store, self.ctx, kid_id)?);
        Ok(events)
    }

    /// Send a claim back to pending, reversing an approval if there was one.
    ///
    /// For `shared_first` chores every assigned kid returns to pending.
    pub fn disapprove(&mut self, kid_id: &str, chore_id: &str) -> Result<Vec<Event>> {
        let chore = self.assigned_chore(kid_id, chore_id)?;
        let kid = self.store.kid(kid_id)?;
        let state = kid.chore_state(chore_id);
        if !state.can_be_disapproved() {
            return Err(self.invalid(kid_id, chore, state, "disapprove"));
        }
        let reverted = match state {
            ChoreState::Approved => kid.chores.get(chore_id).and_then(|i| i.points_awarded),
            _ => None,
        };
        let targets: Vec<String> = match chore.completion_mode {
            CompletionMode::SharedFirst => chore.assigned_kids.clone(),
            _ => vec![kid_id.to_string()],
        };

        let now = self.ctx.now;
        let mut events = vec![Event::ChoreDisapproved {
            kid_id: kid_id.to_string(),
            chore_id: chore_id.to_string(),
            actor: self.ctx.actor.clone(),
            reverted_points: reverted,
            at: now,
        }];
        for target in &targets {
            if target != kid_id {
                events.extend(self.reset_kid(target, chore_id));
            }
        }
        if let Some(inst) = self.store.kid_mut(kid_id)?.chores.get_mut(chore_id) {
            inst.reset();
        }

        if state == ChoreState::Approved {
            let stats = &mut self.store.kid_mut(kid_id)?.stats;
            stats.completed_today = stats.completed_today.saturating_sub(1);
            stats.completed_week = stats.completed_week.saturating_sub(1);
            stats.completed_month = stats.completed_month.saturating_sub(1);
            stats.completed_total = stats.completed_total.saturating_sub(1);
            if let Some(n) = stats.chore_approvals.get_mut(chore_id) {
                *n = n.saturating_sub(1);
            }
        }
        if let Some(points) = reverted.filter(|p| *p != 0.0) {
            events.push(points::apply_delta(
                self.store,
                self.ctx,
                kid_id,
                -points,
                PointSource::Chore(chore_id.to_string()),
            )?);
            let stats = &mut self.store.kid_mut(kid_id)?.stats;
            stats.cumulative_earned = (stats.cumulative_earned - points).max(0.0);
        }
        global_state::refresh(self.store, chore_id);

        tracing::info!(kid = %kid_id, chore = %chore_id, from = %state, "chore disapproved");
        Ok(events)
    }

    /// Advance the due date to the next occurrence and reset to pending,
    /// without granting points.
    pub fn skip(&mut self, chore_id: &str, kid_id: Option<&str>) -> Result<Vec<Event>> {
        let chore = self.store.chore(chore_id)?;
        if !chore.recurrence.frequency.is_recurring() {
            return Err(CoreError::validation(
                "frequency",
                format!("chore '{}' does not recur", chore.name),
            ));
        }
        if chore.due_date.is_none() {
            return Err(CoreError::validation(
                "due_date",
                format!("chore '{}' has no due date", chore.name),
            ));
        }
        if let Some(kid_id) = kid_id {
            self.assigned_chore(kid_id, chore_id)?;
        }
        let mut events = self.advance_due(chore_id)?;
        events.extend(self.reset(chore_id, kid_id)?);
        Ok(events)
    }

    /// Force one or every assigned kid back to pending. The due date is left
    /// alone and awarded points are kept.
    pub fn reset(&mut self, chore_id: &str, kid_id: Option<&str>) -> Result<Vec<Event>> {
        let chore = self.store.chore(chore_id)?;
        let targets: Vec<String> = match kid_id {
            Some(k) => {
                self.assigned_chore(k, chore_id)?;
                vec![k.to_string()]
            }
            None => chore.assigned_kids.clone(),
        };
        let mut events = Vec::new();
        for target in &targets {
            events.extend(self.reset_kid(target, chore_id));
        }
        global_state::refresh(self.store, chore_id);
        Ok(events)
    }

    /// Move the stored due date to the first occurrence after now.
    pub fn advance_due(&mut self, chore_id: &str) -> Result<Vec<Event>> {
        let cal = self.ctx.calendar;
        let now = self.ctx.now;
        let chore = self.store.chore_mut(chore_id)?;
        let Some(previous) = chore.due_date else {
            return Ok(Vec::new());
        };
        let Some(next) = recurrence::next_due(previous, &chore.recurrence, now, &cal) else {
            return Ok(Vec::new());
        };
        chore.due_date = Some(next);
        tracing::debug!(chore = %chore_id, %previous, %next, "chore rescheduled");
        Ok(vec![Event::ChoreRescheduled {
            chore_id: chore_id.to_string(),
            previous_due: Some(previous),
            next_due: Some(next),
            at: now,
        }])
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn reset_kid(&mut self, kid_id: &str, chore_id: &str) -> Option<Event> {
        let kid = self.store.kids.get_mut(kid_id)?;
        let inst = kid.instance_mut(chore_id);
        let previous = inst.state;
        inst.reset();
        (previous != ChoreState::Pending).then(|| Event::ChoreReset {
            kid_id: kid_id.to_string(),
            chore_id: chore_id.to_string(),
            previous,
            at: self.ctx.now,
        })
    }

    fn assigned_chore(&self, kid_id: &str, chore_id: &str) -> Result<&Chore> {
        let kid = self.store.kid(kid_id)?;
        let chore = self.store.chore(chore_id)?;
        if !chore.is_assigned(kid_id) {
            return Err(CoreError::NotAssigned {
                kid: kid.name.clone(),
                chore: chore.name.clone(),
            });
        }
        Ok(chore)
    }

    fn invalid(&self, kid_id: &str, chore: &Chore, state: ChoreState, action: &'static str) -> CoreError {
        CoreError::invalid_state(
            format!("chore '{}' for {}", chore.name, self.store.kid_name(kid_id)),
            state,
            action,
        )
    }

    fn already_claimed(&self, chore: &Chore) -> CoreError {
        let claimed_by = chore
            .assigned_kids
            .iter()
            .filter_map(|k| self.store.kids.get(k))
            .find(|k| k.chore_state(&chore.id).has_acted())
            .map(|k| k.name.clone())
            .unwrap_or_else(|| "another kid".to_string());
        CoreError::AlreadyClaimed {
            chore: chore.name.clone(),
            claimed_by,
        }
    }
}

fn check_points(points: f64) -> Result<()> {
    if points < 0.0 || !points.is_finite() {
        return Err(CoreError::validation(
            "points_awarded",
            format!("must be a non-negative number, got {points}"),
        ));
    }
    Ok(())
}
