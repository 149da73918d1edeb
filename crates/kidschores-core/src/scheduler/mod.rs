//! Periodic chore maintenance.
//!
//! A tick runs three phases against the entity store:
//! - local-day rollover: period counters and `at_midnight_*` approval resets
//! - due-date resets for `at_due_date_*` chores whose occurrence has elapsed
//! - overdue detection according to each chore's overdue-handling policy
//!
//! Every phase derives next due dates from the stored due date, so running a
//! tick twice at the same instant changes nothing the second time.

pub mod runner;

use chrono::Duration;

use crate::context::Context;
use crate::error::Result;
use crate::events::Event;
use crate::lifecycle::{global_state, Lifecycle};
use crate::model::{ChoreState, OverdueHandling};
use crate::recurrence;
use crate::store::EntityStore;

/// Run all scheduler phases once.
pub fn run_tick(store: &mut EntityStore, ctx: &Context) -> Result<Vec<Event>> {
    let mut events = rollover(store, ctx)?;
    events.extend(due_date_resets(store, ctx)?);
    events.extend(check_overdue(store, ctx)?);
    global_state::refresh_all(store);
    if !events.is_empty() {
        tracing::debug!(count = events.len(), "scheduler tick produced events");
    }
    Ok(events)
}

// ── Rollover ────────────────────────────────────────────────────────

/// Handle a change of local date since the last rollover.
///
/// The first tick on a fresh store only records today's date.
pub fn rollover(store: &mut EntityStore, ctx: &Context) -> Result<Vec<Event>> {
    let today = ctx.today();
    let last = match store.meta.last_rollover {
        None => {
            store.meta.last_rollover = Some(today);
            return Ok(Vec::new());
        }
        Some(last) if last >= today => return Ok(Vec::new()),
        Some(last) => last,
    };

    let cal = &ctx.calendar;
    let weekly = cal.week_key(last) != cal.week_key(today);
    let monthly = cal.month_key(last) != cal.month_key(today);
    for kid in store.kids.values_mut() {
        kid.stats.reset_daily();
        if weekly {
            kid.stats.reset_weekly();
        }
        if monthly {
            kid.stats.reset_monthly();
        }
    }

    let mut events = Vec::new();
    let midnight_chores: Vec<String> = store
        .chores
        .values()
        .filter(|c| c.approval_reset.resets_at_midnight())
        .map(|c| c.id.clone())
        .collect();
    for chore_id in midnight_chores {
        events.extend(midnight_reset(store, ctx, &chore_id)?);
    }

    store.meta.last_rollover = Some(today);
    tracing::info!(%today, weekly, monthly, "period rollover");
    events.push(Event::PeriodRollover {
        date: today,
        weekly,
        monthly,
        at: ctx.now,
    });
    Ok(events)
}

fn midnight_reset(store: &mut EntityStore, ctx: &Context, chore_id: &str) -> Result<Vec<Event>> {
    let chore = store.chore(chore_id)?;
    let recurring = chore.recurrence.frequency.is_recurring();
    let elapsed = recurrence::needs_advance(chore.due_date, &chore.recurrence, ctx.now);
    let one_off = !recurring && chore.due_date.is_some();
    let done = kids_in(store, chore_id, is_done);

    let mut engine = Lifecycle::new(store, ctx);
    if elapsed {
        // Awarded points stay; every kid starts the next occurrence fresh.
        let mut events = engine.advance_due(chore_id)?;
        events.extend(engine.reset(chore_id, None)?);
        return Ok(events);
    }
    if one_off {
        return Ok(Vec::new());
    }
    let mut events = Vec::new();
    for kid_id in &done {
        events.extend(engine.reset(chore_id, Some(kid_id))?);
    }
    Ok(events)
}

// ── Due-date resets ─────────────────────────────────────────────────

/// Advance and reset `at_due_date_*` chores whose occurrence has elapsed.
///
/// The roll happens as soon as any kid is done with the occurrence. When
/// nobody is, waiting kids stay overdue until the local day of the due date
/// is over, then the chore rolls anyway.
pub fn due_date_resets(store: &mut EntityStore, ctx: &Context) -> Result<Vec<Event>> {
    let today = ctx.today();
    let ready: Vec<String> = store
        .chores
        .values()
        .filter(|c| !c.approval_reset.resets_at_midnight())
        .filter(|c| recurrence::needs_advance(c.due_date, &c.recurrence, ctx.now))
        .filter(|c| {
            let day_over = c.due_date.is_some_and(|due| ctx.calendar.date(due) < today);
            day_over || !kids_in(store, &c.id, is_done).is_empty()
        })
        .map(|c| c.id.clone())
        .collect();

    let mut events = Vec::new();
    let mut engine = Lifecycle::new(store, ctx);
    for chore_id in ready {
        events.extend(engine.advance_due(&chore_id)?);
        events.extend(engine.reset(&chore_id, None)?);
    }
    Ok(events)
}

// ── Overdue ─────────────────────────────────────────────────────────

/// Apply each chore's overdue-handling policy.
pub fn check_overdue(store: &mut EntityStore, ctx: &Context) -> Result<Vec<Event>> {
    let chore_ids: Vec<String> = store.chores.keys().cloned().collect();
    let mut events = Vec::new();
    for chore_id in chore_ids {
        let chore = store.chore(&chore_id)?;
        let past_due = chore.due_date.filter(|due| *due <= ctx.now);
        let recurring = chore.recurrence.frequency.is_recurring();

        match (chore.overdue_handling, past_due) {
            (OverdueHandling::NeverOverdue, _) | (_, None) => {
                events.extend(clear_overdue(store, ctx, &chore_id));
            }
            (OverdueHandling::AutoReset, Some(_)) if recurring => {
                let waiting = kids_in(store, &chore_id, |s| {
                    matches!(s, ChoreState::Pending | ChoreState::Overdue)
                });
                if waiting.is_empty() {
                    continue;
                }
                let mut engine = Lifecycle::new(store, ctx);
                events.extend(engine.advance_due(&chore_id)?);
                for kid_id in &waiting {
                    events.extend(engine.reset(&chore_id, Some(kid_id))?);
                }
            }
            (_, Some(due)) => {
                events.extend(mark_overdue(store, ctx, &chore_id, due));
            }
        }
    }
    Ok(events)
}

fn mark_overdue(
    store: &mut EntityStore,
    ctx: &Context,
    chore_id: &str,
    due: chrono::DateTime<chrono::Utc>,
) -> Vec<Event> {
    let interval = ctx.overdue_notify_interval;
    let assigned = store
        .chores
        .get(chore_id)
        .map(|c| c.assigned_kids.clone())
        .unwrap_or_default();

    let mut events = Vec::new();
    for kid_id in assigned {
        let Some(kid) = store.kids.get_mut(&kid_id) else {
            continue;
        };
        let inst = kid.instance_mut(chore_id);
        let notify_due = inst
            .overdue_notified_at
            .map_or(true, |last| ctx.now - last >= interval.max(Duration::zero()));

        let transitioned = match inst.state {
            ChoreState::Pending => {
                inst.state = ChoreState::Overdue;
                true
            }
            ChoreState::Overdue if notify_due => false,
            _ => continue,
        };
        if notify_due {
            inst.overdue_notified_at = Some(ctx.now);
        }
        if transitioned {
            tracing::info!(kid = %kid_id, chore = %chore_id, %due, "chore overdue");
        }
        events.push(Event::ChoreOverdue {
            kid_id,
            chore_id: chore_id.to_string(),
            due_date: due,
            notify: notify_due,
            at: ctx.now,
        });
    }
    events
}

/// Move overdue kids back to pending. The notification timestamp is kept so
/// a chore flapping around its due date does not re-notify early.
fn clear_overdue(store: &mut EntityStore, ctx: &Context, chore_id: &str) -> Vec<Event> {
    let mut events = Vec::new();
    for kid in store.kids.values_mut() {
        let Some(inst) = kid.chores.get_mut(chore_id) else {
            continue;
        };
        if inst.state == ChoreState::Overdue {
            inst.state = ChoreState::Pending;
            events.push(Event::ChoreReset {
                kid_id: kid.id.clone(),
                chore_id: chore_id.to_string(),
                previous: ChoreState::Overdue,
                at: ctx.now,
            });
        }
    }
    events
}

fn is_done(state: ChoreState) -> bool {
    matches!(state, ChoreState::Approved | ChoreState::CompletedByOther)
}

/// Assigned kids of `chore_id` whose state satisfies `pred`.
fn kids_in(store: &EntityStore, chore_id: &str, pred: impl Fn(ChoreState) -> bool) -> Vec<String> {
    let Some(chore) = store.chores.get(chore_id) else {
        return Vec::new();
    };
    chore
        .assigned_kids
        .iter()
        .filter(|k| {
            store
                .kids
                .get(*k)
                .is_some_and(|kid| pred(kid.chore_state(chore_id)))
        })
        .cloned()
        .collect()
}
