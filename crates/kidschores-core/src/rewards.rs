//! Reward redemption.
//!
//! Points are debited when a parent approves the redemption, not when the
//! kid redeems. A pending redemption therefore never changes the balance,
//! and disapproving one never needs a refund. Rewards that do not require
//! approval are settled (and debited) immediately.

use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::model::{PendingReward, PointSource};
use crate::points;
use crate::store::EntityStore;

pub fn redeem(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    reward_id: &str,
) -> Result<Vec<Event>> {
    let reward = store.reward(reward_id)?.clone();
    let kid = store.kid(kid_id)?;
    let must_cover = ctx.precheck_balance || !reward.requires_approval;
    if must_cover && kid.points < reward.cost {
        return Err(CoreError::InsufficientPoints {
            needed: reward.cost,
            available: kid.points,
        });
    }

    let kid = store.kid_mut(kid_id)?;
    *kid.rewards.claims.entry(reward_id.to_string()).or_default() += 1;
    let pending = PendingReward::new(reward_id, ctx.now);
    let request_id = pending.request_id.clone();

    tracing::info!(kid = %kid_id, reward = %reward_id, request = %request_id, "reward redeemed");
    let mut events = vec![Event::RewardRedeemed {
        kid_id: kid_id.to_string(),
        reward_id: reward_id.to_string(),
        request_id,
        actor: ctx.actor.clone(),
        at: ctx.now,
    }];

    if reward.requires_approval {
        kid.rewards.pending.push(pending);
    } else {
        events.extend(settle(store, ctx, kid_id, reward_id, reward.cost)?);
    }
    Ok(events)
}

/// Approve the oldest pending redemption of `reward_id` and debit its cost.
pub fn approve(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    reward_id: &str,
) -> Result<Vec<Event>> {
    let cost = store.reward(reward_id)?.cost;
    let kid = store.kid(kid_id)?;
    let Some(index) = kid.rewards.pending.iter().position(|p| p.reward_id == reward_id) else {
        return Err(not_pending(store, kid_id, reward_id, "approve"));
    };
    if kid.points < cost {
        return Err(CoreError::InsufficientPoints {
            needed: cost,
            available: kid.points,
        });
    }
    store.kid_mut(kid_id)?.rewards.pending.remove(index);
    settle(store, ctx, kid_id, reward_id, cost)
}

/// Drop the oldest pending redemption without touching the balance.
pub fn disapprove(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    reward_id: &str,
) -> Result<Vec<Event>> {
    store.reward(reward_id)?;
    let kid = store.kid(kid_id)?;
    let Some(index) = kid.rewards.pending.iter().position(|p| p.reward_id == reward_id) else {
        return Err(not_pending(store, kid_id, reward_id, "disapprove"));
    };
    store.kid_mut(kid_id)?.rewards.pending.remove(index);

    tracing::info!(kid = %kid_id, reward = %reward_id, "reward disapproved");
    Ok(vec![Event::RewardDisapproved {
        kid_id: kid_id.to_string(),
        reward_id: reward_id.to_string(),
        actor: ctx.actor.clone(),
        at: ctx.now,
    }])
}

/// Clear claim/approval counters and pending requests.
/// `None` filters match every reward / kid.
pub fn reset_counters(store: &mut EntityStore, reward_id: Option<&str>, kid_id: Option<&str>) {
    for kid in store
        .kids
        .values_mut()
        .filter(|k| kid_id.map_or(true, |id| k.id == id))
    {
        match reward_id {
            Some(r) => {
                kid.rewards.claims.remove(r);
                kid.rewards.approvals.remove(r);
                kid.rewards.pending.retain(|p| p.reward_id != r);
            }
            None => {
                kid.rewards = Default::default();
            }
        }
    }
}

fn settle(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    reward_id: &str,
    cost: f64,
) -> Result<Vec<Event>> {
    *store
        .kid_mut(kid_id)?
        .rewards
        .approvals
        .entry(reward_id.to_string())
        .or_default() += 1;

    tracing::info!(kid = %kid_id, reward = %reward_id, cost, "reward approved");
    let mut events = vec![Event::RewardApproved {
        kid_id: kid_id.to_string(),
        reward_id: reward_id.to_string(),
        actor: ctx.actor.clone(),
        cost,
        at: ctx.now,
    }];
    events.push(points::apply_delta(
        store,
        ctx,
        kid_id,
        -cost,
        PointSource::Reward(reward_id.to_string()),
    )?);
    Ok(events)
}

fn not_pending(store: &EntityStore, kid_id: &str, reward_id: &str, action: &'static str) -> CoreError {
    CoreError::InvalidState {
        entity: format!(
            "reward '{}' for {}",
            store.reward_name(reward_id),
            store.kid_name(kid_id)
        ),
        state: "not pending".to_string(),
        action,
    }
}
