//! Rewards, badges, achievements and challenges driven through the
//! coordinator.

use chrono::Duration;
use kidschores_core::model::{
    Achievement, AchievementKind, Badge, BadgeKind, Challenge, ChallengeKind, Chore, Kid, Parent,
    PointSource, Reward,
};
use kidschores_core::{Config, Coordinator, CoreError, Event, FixedClock, MemoryStore, Recipient};

fn setup() -> (Coordinator, FixedClock) {
    let clock = FixedClock::new("2026-04-01T10:00:00Z".parse().unwrap());
    let mut config = Config::default();
    config.schedule.utc_offset_minutes = Some(0);
    let mut c = Coordinator::open(Box::new(MemoryStore::new()), Box::new(clock.clone()), config)
        .unwrap();
    let alice = c.add_kid(Kid::new("Alice")).unwrap();
    let mut mom = Parent::new("Mom");
    mom.associated_kids.push(alice.clone());
    c.add_parent(mom).unwrap();
    let mut chore = Chore::new("Dishes", 5.0);
    chore.assigned_kids.push(alice);
    c.add_chore(chore).unwrap();
    (c, clock)
}

fn complete(c: &mut Coordinator) {
    c.claim_chore("Alice", "Dishes").unwrap();
    c.approve_chore("Mom", "Alice", "Dishes", None).unwrap();
}

fn reopen(c: &mut Coordinator) {
    c.reset_all_chores().unwrap();
}

#[test]
fn reward_is_debited_on_approval_only() {
    let (mut c, _) = setup();
    c.add_reward(Reward::new("Ice cream", 4.0)).unwrap();
    complete(&mut c);

    let report = c.redeem_reward("Mom", "Alice", "Ice cream").unwrap();
    assert_eq!(c.kid("Alice").unwrap().points, 5.0);
    let request = report
        .notifications
        .iter()
        .find(|n| matches!(n.recipient, Recipient::Parent(_)))
        .unwrap();
    assert_eq!(request.actions.len(), 2);
    assert!(request.actions[0].request_id.is_some());

    c.approve_reward("Mom", "Alice", "Ice cream").unwrap();
    assert_eq!(c.kid("Alice").unwrap().points, 1.0);

    let err = c.approve_reward("Mom", "Alice", "Ice cream").unwrap_err();
    assert!(matches!(err, CoreError::InvalidState { .. }));
}

#[test]
fn redeem_without_enough_points_fails() {
    let (mut c, _) = setup();
    c.add_reward(Reward::new("Bike", 100.0)).unwrap();
    let err = c.redeem_reward("Mom", "Alice", "Bike").unwrap_err();
    assert!(matches!(err, CoreError::InsufficientPoints { .. }));
    assert!(c.kid("Alice").unwrap().rewards.pending.is_empty());
}

#[test]
fn disapproved_reward_costs_nothing() {
    let (mut c, _) = setup();
    c.add_reward(Reward::new("Ice cream", 4.0)).unwrap();
    complete(&mut c);
    c.redeem_reward("Mom", "Alice", "Ice cream").unwrap();
    c.disapprove_reward("Mom", "Alice", "Ice cream").unwrap();
    let alice = c.kid("Alice").unwrap();
    assert_eq!(alice.points, 5.0);
    assert!(alice.rewards.pending.is_empty());
}

#[test]
fn cumulative_badge_is_awarded_once_with_scaled_bonus() {
    let (mut c, _) = setup();
    let mut badge = Badge::new("Bronze", BadgeKind::Cumulative { threshold: 10.0 });
    badge.award_points = 2.0;
    badge.multiplier = 1.5;
    c.add_badge(badge).unwrap();

    complete(&mut c);
    assert!(c.kid("Alice").unwrap().badges.is_empty());

    reopen(&mut c);
    let report = c.approve_chore("Mom", "Alice", "Dishes", None);
    assert!(report.is_err());
    c.claim_chore("Alice", "Dishes").unwrap();
    let report = c.approve_chore("Mom", "Alice", "Dishes", None).unwrap();
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, Event::BadgeEarned { .. })));
    let alice = c.kid("Alice").unwrap();
    assert_eq!(alice.badges.len(), 1);
    assert_eq!(alice.points, 13.0);

    reopen(&mut c);
    complete(&mut c);
    let alice = c.kid("Alice").unwrap();
    assert_eq!(alice.badges[0].times_awarded, 1);
    assert_eq!(alice.points, 18.0);
}

#[test]
fn disapproved_approvals_do_not_count_toward_cumulative_badges() {
    let (mut c, _) = setup();
    c.add_badge(Badge::new("Twenty", BadgeKind::Cumulative { threshold: 20.0 }))
        .unwrap();

    for _ in 0..3 {
        complete(&mut c);
        c.disapprove_chore("Mom", "Alice", "Dishes").unwrap();
    }
    complete(&mut c);

    let alice = c.kid("Alice").unwrap();
    assert!(alice.badges.is_empty());
    assert_eq!(alice.points, 5.0);
    assert_eq!(alice.stats.cumulative_earned, 5.0);
    assert_eq!(alice.stats.completed_total, 1);
}

#[test]
fn daily_badge_repeats_on_a_new_day() {
    let (mut c, clock) = setup();
    c.add_badge(Badge::new("Busy day", BadgeKind::Daily { threshold: 1 }))
        .unwrap();
    complete(&mut c);
    assert_eq!(c.kid("Alice").unwrap().badges[0].times_awarded, 1);

    clock.advance(Duration::days(1));
    c.tick().unwrap();
    reopen(&mut c);
    complete(&mut c);
    assert_eq!(c.kid("Alice").unwrap().badges[0].times_awarded, 2);
}

#[test]
fn achievement_counts_from_creation_and_grants_points() {
    let (mut c, _) = setup();
    complete(&mut c);
    let mut total = Achievement::new(
        "Two more",
        AchievementKind::Total {
            chore_id: None,
            count: 2,
        },
    );
    total.reward_points = 10.0;
    c.add_achievement(total).unwrap();

    reopen(&mut c);
    complete(&mut c);
    assert_eq!(c.kid("Alice").unwrap().points, 10.0);

    reopen(&mut c);
    let report = {
        c.claim_chore("Alice", "Dishes").unwrap();
        c.approve_chore("Mom", "Alice", "Dishes", None).unwrap()
    };
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, Event::AchievementEarned { .. })));
    assert_eq!(c.kid("Alice").unwrap().points, 25.0);
}

#[test]
fn challenge_completes_inside_its_window() {
    let (mut c, clock) = setup();
    let now = clock_now(&clock);
    let mut challenge = Challenge::new(
        "Dish week",
        ChallengeKind::TotalWithinWindow {
            chore_id: None,
            count: 2,
        },
        now - Duration::hours(1),
        now + Duration::days(7),
    );
    challenge.reward_points = 3.0;
    c.add_challenge(challenge).unwrap();

    complete(&mut c);
    reopen(&mut c);
    complete(&mut c);
    let alice = c.kid("Alice").unwrap();
    assert!(alice.challenges.values().any(|p| p.completed));
    assert_eq!(alice.points, 13.0);
    let history = c.history("Alice").unwrap();
    assert!(history
        .iter()
        .any(|e| matches!(e.source, PointSource::Challenge(_))));
}

#[test]
fn manual_adjustment_is_logged() {
    let (mut c, _) = setup();
    c.adjust_points("Mom", "Alice", -3.0).unwrap();
    let history = c.history("Alice").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].source, PointSource::Adjustment);
    assert_eq!(history[0].balance_after, -3.0);
    assert!(matches!(
        c.adjust_points("Mom", "Alice", f64::NAN),
        Err(CoreError::Validation { .. })
    ));
}

fn clock_now(clock: &FixedClock) -> chrono::DateTime<chrono::Utc> {
    use kidschores_core::Clock;
    clock.now()
}
