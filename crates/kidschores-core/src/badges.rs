//! Badge, achievement and challenge evaluation.
//!
//! Evaluation is a pure function of the kid's statistics plus the award
//! records already on the kid, so re-running it after an unchanged event
//! never awards twice. Repeatable badges are guarded by a period key
//! (day, ISO week, month, window) instead of an explicit reset: a new
//! period produces a new key and the badge becomes available again.

use chrono::{Datelike, NaiveDate};

use crate::context::Context;
use crate::error::Result;
use crate::events::Event;
use crate::model::{
    AchievementKind, Badge, BadgeAward, BadgeKind, BadgePeriod, ChallengeKind, Kid,
    PeriodicCriteria, PointSource,
};
use crate::points;
use crate::store::EntityStore;

/// Badge award points can unlock further badges; stop after this many passes.
const MAX_PASSES: usize = 8;

const ONCE: &str = "once";

/// Update challenge progress for an approval of `chore_id`.
pub fn record_approval(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    chore_id: &str,
) -> Result<Vec<Event>> {
    let today = ctx.today();
    let active: Vec<(String, ChallengeKind, NaiveDate, NaiveDate)> = store
        .challenges
        .values()
        .filter(|c| c.applies_to(kid_id) && c.is_active(ctx.now))
        .map(|c| {
            (
                c.id.clone(),
                c.kind.clone(),
                ctx.calendar.date(c.start),
                ctx.calendar.date(c.end),
            )
        })
        .collect();

    let mut completed = Vec::new();
    let kid = store.kid_mut(kid_id)?;
    for (id, kind, start, end) in active {
        let progress = kid.challenges.entry(id.clone()).or_default();
        if progress.completed {
            continue;
        }
        let done = match &kind {
            ChallengeKind::TotalWithinWindow {
                chore_id: filter,
                count,
            } => {
                if filter.as_deref().is_some_and(|c| c != chore_id) {
                    continue;
                }
                progress.count += 1;
                *progress.daily_counts.entry(today).or_default() += 1;
                progress.count >= *count
            }
            ChallengeKind::DailyMinimum { count } => {
                progress.count += 1;
                *progress.daily_counts.entry(today).or_default() += 1;
                start
                    .iter_days()
                    .take_while(|d| *d <= end)
                    .all(|d| progress.daily_counts.get(&d).copied().unwrap_or(0) >= *count)
            }
        };
        if done {
            progress.completed = true;
            progress.completed_at = Some(ctx.now);
            completed.push(id);
        }
    }

    let mut events = Vec::new();
    for id in completed {
        tracing::info!(kid = %kid_id, challenge = %id, "challenge completed");
        events.push(Event::ChallengeCompleted {
            kid_id: kid_id.to_string(),
            challenge_id: id.clone(),
            at: ctx.now,
        });
        let reward = store.challenges.get(&id).map(|c| c.reward_points).unwrap_or(0.0);
        if reward > 0.0 {
            events.push(points::apply_delta(
                store,
                ctx,
                kid_id,
                reward,
                PointSource::Challenge(id),
            )?);
        }
    }
    Ok(events)
}

/// Award every achievement and badge the kid currently qualifies for.
pub fn evaluate(store: &mut EntityStore, ctx: &Context, kid_id: &str) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for _ in 0..MAX_PASSES {
        let before = events.len();
        evaluate_achievements(store, ctx, kid_id, &mut events)?;
        evaluate_badges(store, ctx, kid_id, &mut events)?;
        if events.len() == before {
            return Ok(events);
        }
    }
    tracing::warn!(kid = %kid_id, "badge evaluation did not settle");
    Ok(events)
}

fn evaluate_achievements(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    events: &mut Vec<Event>,
) -> Result<()> {
    let candidates: Vec<(String, AchievementKind, u32, f64)> = store
        .achievements
        .values()
        .filter(|a| a.applies_to(kid_id))
        .map(|a| (a.id.clone(), a.kind.clone(), a.target(), a.reward_points))
        .collect();

    for (id, kind, target, reward) in candidates {
        let kid = store.kid_mut(kid_id)?;
        let stats = &kid.stats;
        let value = match &kind {
            AchievementKind::Streak { chore_id, .. } => match chore_id {
                Some(c) => stats.chore_streaks.get(c).map(|s| s.current).unwrap_or(0),
                None => stats.overall_streak.current,
            },
            AchievementKind::Total { chore_id, .. } => match chore_id {
                Some(c) => stats.chore_approvals.get(c).copied().unwrap_or(0),
                None => stats.completed_total,
            },
            AchievementKind::DailyMinimum { .. } => stats.completed_today,
        };
        let progress = kid.achievements.entry(id.clone()).or_default();
        if progress.awarded {
            continue;
        }
        progress.current = match kind {
            AchievementKind::Total { .. } => value.saturating_sub(progress.baseline),
            _ => value,
        };
        if progress.current < target {
            continue;
        }
        progress.awarded = true;
        progress.awarded_at = Some(ctx.now);

        tracing::info!(kid = %kid_id, achievement = %id, "achievement earned");
        events.push(Event::AchievementEarned {
            kid_id: kid_id.to_string(),
            achievement_id: id.clone(),
            at: ctx.now,
        });
        if reward > 0.0 {
            events.push(points::apply_delta(
                store,
                ctx,
                kid_id,
                reward,
                PointSource::Achievement(id),
            )?);
        }
    }
    Ok(())
}

fn evaluate_badges(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    events: &mut Vec<Event>,
) -> Result<()> {
    let badges: Vec<Badge> = store
        .badges
        .values()
        .filter(|b| b.applies_to(kid_id))
        .cloned()
        .collect();

    for badge in badges {
        let kid = store.kid(kid_id)?;
        let Some((period_key, progress)) = qualifies(&badge, kid, store, ctx) else {
            continue;
        };
        let already = kid
            .badge_award(&badge.id)
            .is_some_and(|a| a.period_key == period_key || a.period_key == ONCE);
        if already {
            continue;
        }
        award(store, ctx, kid_id, &badge, period_key, progress, events)?;
    }
    Ok(())
}

/// Period key and observed value when the kid meets the badge criteria.
fn qualifies(badge: &Badge, kid: &Kid, store: &EntityStore, ctx: &Context) -> Option<(String, f64)> {
    let cal = &ctx.calendar;
    let today = ctx.today();
    let stats = &kid.stats;
    match &badge.kind {
        BadgeKind::Cumulative { threshold } => {
            (stats.cumulative_earned >= *threshold).then(|| (ONCE.to_string(), stats.cumulative_earned))
        }
        BadgeKind::Daily { threshold } => (stats.completed_today >= *threshold)
            .then(|| (cal.day_key(today), f64::from(stats.completed_today))),
        BadgeKind::Periodic {
            period,
            criteria,
            threshold,
        } => {
            let (key, value) = match period {
                BadgePeriod::Weekly => (
                    cal.week_key(today),
                    match criteria {
                        PeriodicCriteria::Points => stats.points_week,
                        PeriodicCriteria::ChoreCount => f64::from(stats.completed_week),
                    },
                ),
                BadgePeriod::Monthly => (
                    cal.month_key(today),
                    match criteria {
                        PeriodicCriteria::Points => stats.points_month,
                        PeriodicCriteria::ChoreCount => f64::from(stats.completed_month),
                    },
                ),
                BadgePeriod::Window { start, end } => {
                    if today < *start || today > *end {
                        return None;
                    }
                    (
                        format!("window:{}", cal.day_key(*start)),
                        window_value(store, ctx, &kid.id, *start, *end, *criteria),
                    )
                }
            };
            (value >= *threshold).then_some((key, value))
        }
        BadgeKind::Achievement { achievement_id } => kid
            .achievements
            .get(achievement_id)
            .is_some_and(|p| p.awarded)
            .then(|| (ONCE.to_string(), 1.0)),
        BadgeKind::Challenge { challenge_id } => kid
            .challenges
            .get(challenge_id)
            .is_some_and(|p| p.completed)
            .then(|| (ONCE.to_string(), 1.0)),
        BadgeKind::Special { date, recurring } => {
            let hit = if *recurring {
                date.month() == today.month() && date.day() == today.day()
            } else {
                *date == today
            };
            let key = if *recurring {
                cal.day_key(today)
            } else {
                ONCE.to_string()
            };
            hit.then_some((key, 1.0))
        }
    }
}

/// Earnings (or net chore approvals) inside a custom window, from the ledger.
fn window_value(
    store: &EntityStore,
    ctx: &Context,
    kid_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    criteria: PeriodicCriteria,
) -> f64 {
    points::history(store, kid_id)
        .filter(|e| {
            let d = ctx.calendar.date(e.at);
            start <= d && d <= end && !e.source.is_spending()
        })
        .map(|e| match criteria {
            PeriodicCriteria::Points => e.delta,
            PeriodicCriteria::ChoreCount => match e.source {
                PointSource::Chore(_) => e.delta.signum(),
                _ => 0.0,
            },
        })
        .sum()
}

fn award(
    store: &mut EntityStore,
    ctx: &Context,
    kid_id: &str,
    badge: &Badge,
    period_key: String,
    progress: f64,
    events: &mut Vec<Event>,
) -> Result<()> {
    let kid = store.kid_mut(kid_id)?;
    match kid.badges.iter_mut().find(|a| a.badge_id == badge.id) {
        Some(existing) => {
            existing.badge_name = badge.name.clone();
            existing.last_awarded = ctx.now;
            existing.period_key = period_key.clone();
            existing.times_awarded += 1;
            existing.multiplier = badge.multiplier;
            existing.progress = progress;
        }
        None => kid.badges.push(BadgeAward {
            badge_id: badge.id.clone(),
            badge_name: badge.name.clone(),
            last_awarded: ctx.now,
            period_key: period_key.clone(),
            times_awarded: 1,
            multiplier: badge.multiplier,
            progress,
        }),
    }
    if let Some(reward_id) = &badge.reward_id {
        *kid.rewards.approvals.entry(reward_id.clone()).or_default() += 1;
    }

    tracing::info!(kid = %kid_id, badge = %badge.id, period = %period_key, "badge earned");
    events.push(Event::BadgeEarned {
        kid_id: kid_id.to_string(),
        badge_id: badge.id.clone(),
        period_key,
        at: ctx.now,
    });

    let bonus = badge.bonus_points();
    if bonus > 0.0 {
        events.push(points::apply_delta(
            store,
            ctx,
            kid_id,
            bonus,
            PointSource::Badge(badge.id.clone()),
        )?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Calendar;
    use crate::model::{Achievement, Challenge};

    fn setup() -> (EntityStore, Context, String) {
        let mut store = EntityStore::new();
        let kid = store.add_kid(Kid::new("Alice")).unwrap();
        let ctx = Context::new(
            "2026-04-01T10:00:00Z".parse().unwrap(),
            Calendar::utc(),
            "system",
        );
        (store, ctx, kid)
    }

    fn badge_events(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Event::BadgeEarned { .. }))
            .count()
    }

    #[test]
    fn cumulative_badge_is_awarded_once() {
        let (mut store, ctx, kid) = setup();
        store
            .add_badge(Badge::new("Fifty", BadgeKind::Cumulative { threshold: 50.0 }))
            .unwrap();
        store.kid_mut(&kid).unwrap().stats.cumulative_earned = 60.0;

        let first = evaluate(&mut store, &ctx, &kid).unwrap();
        let second = evaluate(&mut store, &ctx, &kid).unwrap();
        assert_eq!(badge_events(&first), 1);
        assert!(second.is_empty());
        assert_eq!(store.kid(&kid).unwrap().badges.len(), 1);
    }

    #[test]
    fn daily_badge_repeats_on_a_new_day_only() {
        let (mut store, mut ctx, kid) = setup();
        store
            .add_badge(Badge::new("Busy", BadgeKind::Daily { threshold: 2 }))
            .unwrap();
        store.kid_mut(&kid).unwrap().stats.completed_today = 2;

        assert_eq!(badge_events(&evaluate(&mut store, &ctx, &kid).unwrap()), 1);
        assert_eq!(badge_events(&evaluate(&mut store, &ctx, &kid).unwrap()), 0);

        ctx.now += chrono::Duration::days(1);
        assert_eq!(badge_events(&evaluate(&mut store, &ctx, &kid).unwrap()), 1);
        assert_eq!(store.kid(&kid).unwrap().badges[0].times_awarded, 2);
    }

    #[test]
    fn badge_bonus_can_unlock_cumulative_badge() {
        let (mut store, ctx, kid) = setup();
        let mut special = Badge::new(
            "April Fools",
            BadgeKind::Special {
                date: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
                recurring: true,
            },
        );
        special.award_points = 10.0;
        special.multiplier = 2.0;
        store.add_badge(special).unwrap();
        store
            .add_badge(Badge::new("Twenty", BadgeKind::Cumulative { threshold: 20.0 }))
            .unwrap();

        let events = evaluate(&mut store, &ctx, &kid).unwrap();
        assert_eq!(badge_events(&events), 2);
        assert_eq!(store.kid(&kid).unwrap().points, 20.0);
    }

    #[test]
    fn unassigned_kid_is_not_evaluated() {
        let (mut store, ctx, kid) = setup();
        let other = store.add_kid(Kid::new("Bob")).unwrap();
        let mut badge = Badge::new("Fifty", BadgeKind::Cumulative { threshold: 1.0 });
        badge.assigned_kids = vec![other];
        store.add_badge(badge).unwrap();
        store.kid_mut(&kid).unwrap().stats.cumulative_earned = 60.0;
        assert!(evaluate(&mut store, &ctx, &kid).unwrap().is_empty());
    }

    #[test]
    fn total_achievement_counts_from_baseline_and_links_badge() {
        let (mut store, ctx, kid) = setup();
        store.kid_mut(&kid).unwrap().stats.completed_total = 4;
        let mut ach = Achievement::new(
            "Three more",
            AchievementKind::Total {
                chore_id: None,
                count: 3,
            },
        );
        ach.reward_points = 5.0;
        let ach_id = store.add_achievement(ach).unwrap();
        store
            .add_badge(Badge::new(
                "Achiever",
                BadgeKind::Achievement {
                    achievement_id: ach_id.clone(),
                },
            ))
            .unwrap();

        store.kid_mut(&kid).unwrap().stats.completed_total = 6;
        assert!(evaluate(&mut store, &ctx, &kid).unwrap().is_empty());
        assert_eq!(store.kid(&kid).unwrap().achievements[&ach_id].current, 2);

        store.kid_mut(&kid).unwrap().stats.completed_total = 7;
        let events = evaluate(&mut store, &ctx, &kid).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::AchievementEarned { .. })));
        assert_eq!(badge_events(&events), 1);
        assert_eq!(store.kid(&kid).unwrap().points, 5.0);
    }

    #[test]
    fn challenge_total_within_window() {
        let (mut store, ctx, kid) = setup();
        let mut ch = Challenge::new(
            "Spring",
            ChallengeKind::TotalWithinWindow {
                chore_id: Some("dishes".into()),
                count: 2,
            },
            "2026-03-25T00:00:00Z".parse().unwrap(),
            "2026-04-10T00:00:00Z".parse().unwrap(),
        );
        ch.reward_points = 3.0;
        let ch_id = store.add_challenge(ch).unwrap();

        assert!(record_approval(&mut store, &ctx, &kid, "laundry").unwrap().is_empty());
        assert!(record_approval(&mut store, &ctx, &kid, "dishes").unwrap().is_empty());
        let events = record_approval(&mut store, &ctx, &kid, "dishes").unwrap();
        assert!(matches!(events[0], Event::ChallengeCompleted { .. }));
        assert_eq!(store.kid(&kid).unwrap().points, 3.0);
        assert!(store.kid(&kid).unwrap().challenges[&ch_id].completed);

        // Completed challenges stay completed.
        assert!(record_approval(&mut store, &ctx, &kid, "dishes").unwrap().is_empty());
    }

    #[test]
    fn challenge_outside_window_is_ignored() {
        let (mut store, ctx, kid) = setup();
        store
            .add_challenge(Challenge::new(
                "Later",
                ChallengeKind::TotalWithinWindow {
                    chore_id: None,
                    count: 1,
                },
                "2026-05-01T00:00:00Z".parse().unwrap(),
                "2026-05-10T00:00:00Z".parse().unwrap(),
            ))
            .unwrap();
        assert!(record_approval(&mut store, &ctx, &kid, "any").unwrap().is_empty());
        assert!(store.kid(&kid).unwrap().challenges.is_empty());
    }

    #[test]
    fn daily_minimum_challenge_needs_every_day() {
        let (mut store, mut ctx, kid) = setup();
        store
            .add_challenge(Challenge::new(
                "Two days",
                ChallengeKind::DailyMinimum { count: 1 },
                "2026-04-01T00:00:00Z".parse().unwrap(),
                "2026-04-02T23:59:59Z".parse().unwrap(),
            ))
            .unwrap();
        assert!(record_approval(&mut store, &ctx, &kid, "c").unwrap().is_empty());
        ctx.now += chrono::Duration::days(1);
        let events = record_approval(&mut store, &ctx, &kid, "c").unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn weekly_points_badge_uses_week_key() {
        let (mut store, ctx, kid) = setup();
        store
            .add_badge(Badge::new(
                "Weekly",
                BadgeKind::Periodic {
                    period: BadgePeriod::Weekly,
                    criteria: PeriodicCriteria::Points,
                    threshold: 10.0,
                },
            ))
            .unwrap();
        store.kid_mut(&kid).unwrap().stats.points_week = 12.0;
        evaluate(&mut store, &ctx, &kid).unwrap();
        assert_eq!(store.kid(&kid).unwrap().badges[0].period_key, "2026-W14");
    }
}
