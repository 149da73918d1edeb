//! Point ledger mutations.
//!
//! Every balance change goes through [`apply_delta`], which keeps the
//! period statistics and the audit ledger in step with the balance.

use crate::context::Context;
use crate::error::Result;
use crate::events::Event;
use crate::model::{LedgerEntry, PointSource};
use crate::store::EntityStore;

/// Apply a signed delta to a kid's balance and record it.
///
/// Reward spending does not count against the period earning counters;
/// only positive, non-reward deltas add to `cumulative_earned`.
pub fn apply_delta(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    delta: f64,
    source: PointSource,
) -> Result<Event> {
    let kid = store.kid_mut(kid_id)?;
    kid.points += delta;

    let stats = &mut kid.stats;
    if !source.is_spending() {
        stats.points_today += delta;
        stats.points_week += delta;
        stats.points_month += delta;
        if delta > 0.0 {
            stats.cumulative_earned += delta;
        }
    }
    stats.max_points_ever = stats.max_points_ever.max(kid.points);
    let balance = kid.points;

    tracing::debug!(kid = %kid_id, delta, balance, source = ?source, "points changed");

    store.ledger.push(LedgerEntry {
        kid_id: kid_id.to_string(),
        actor: ctx.actor.clone(),
        source: source.clone(),
        delta,
        balance_after: balance,
        at: ctx.now,
    });
    trim_ledger(store, ctx.ledger_max_entries);

    Ok(Event::PointsChanged {
        kid_id: kid_id.to_string(),
        delta,
        balance,
        source,
        at: ctx.now,
    })
}

/// Drop the oldest entries beyond `max`.
pub fn trim_ledger(store: &mut EntityStore, max: usize) {
    let len = store.ledger.len();
    if len > max {
        store.ledger.drain(..len - max);
    }
}

/// Ledger entries for one kid, newest last.
pub fn history<'a>(store: &'a EntityStore, kid_id: &'a str) -> impl Iterator<Item = &'a LedgerEntry> {
    store.ledger.iter().filter(move |e| e.kid_id == kid_id)
}
