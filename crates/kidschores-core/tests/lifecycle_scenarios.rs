//! End-to-end chore scenarios through the coordinator facade.
//!
//! Every test runs against an in-memory backend and a fixed clock, so
//! scheduler behavior is deterministic.

use chrono::{DateTime, Duration, Utc};
use kidschores_core::model::{
    ApprovalResetPolicy, Chore, ChoreState, CompletionMode, Frequency, Kid, Parent, Recurrence,
};
use kidschores_core::{Config, Coordinator, CoreError, Event, FixedClock, MemoryStore};

// ============================================================================
// Test Helpers
// ============================================================================

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

struct Household {
    coordinator: Coordinator,
    clock: FixedClock,
    chore_id: String,
}

fn household(kids: &[&str], mode: CompletionMode, configure: impl FnOnce(&mut Chore)) -> Household {
    let clock = FixedClock::new(at("2026-04-01T10:00:00Z"));
    let mut config = Config::default();
    config.schedule.utc_offset_minutes = Some(0);
    let mut coordinator = Coordinator::open(
        Box::new(MemoryStore::new()),
        Box::new(clock.clone()),
        config,
    )
    .unwrap();

    let ids: Vec<String> = kids
        .iter()
        .map(|name| coordinator.add_kid(Kid::new(*name)).unwrap())
        .collect();
    coordinator.add_parent(Parent::new("Mom")).unwrap();

    let mut chore = Chore::new("Dishes", 5.0);
    chore.assigned_kids = ids;
    chore.completion_mode = mode;
    configure(&mut chore);
    let chore_id = coordinator.add_chore(chore).unwrap();

    Household {
        coordinator,
        clock,
        chore_id,
    }
}

impl Household {
    fn state(&self, kid: &str) -> ChoreState {
        self.coordinator.kid(kid).unwrap().chore_state(&self.chore_id)
    }

    fn points(&self, kid: &str) -> f64 {
        self.coordinator.kid(kid).unwrap().points
    }

    fn global(&self) -> ChoreState {
        self.coordinator.chore("Dishes").unwrap().global_state
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn single_kid_daily_chore_counts_one_approval() {
    let mut h = household(&["Alice"], CompletionMode::Independent, |c| {
        c.recurrence = Recurrence::new(Frequency::Daily);
        c.approval_reset = ApprovalResetPolicy::AtMidnightMultiple;
    });
    let c = &mut h.coordinator;

    c.claim_chore("Alice", "Dishes").unwrap();
    c.approve_chore("Mom", "Alice", "Dishes", None).unwrap();
    assert_eq!(h.points("Alice"), 5.0);

    let c = &mut h.coordinator;
    c.claim_chore("Alice", "Dishes").unwrap();
    c.disapprove_chore("Mom", "Alice", "Dishes").unwrap();
    assert_eq!(h.points("Alice"), 5.0);
    assert_eq!(h.state("Alice"), ChoreState::Pending);
}

#[test]
fn shared_first_claim_blocks_the_other_kid() {
    let mut h = household(&["Alice", "Bob"], CompletionMode::SharedFirst, |_| {});
    h.coordinator.claim_chore("Alice", "Dishes").unwrap();
    assert_eq!(h.state("Bob"), ChoreState::CompletedByOther);

    let err = h.coordinator.claim_chore("Bob", "Dishes").unwrap_err();
    assert!(matches!(err, CoreError::AlreadyClaimed { ref claimed_by, .. } if claimed_by == "Alice"));

    h.coordinator
        .approve_chore("Mom", "Alice", "Dishes", None)
        .unwrap();
    assert_eq!(h.points("Alice"), 5.0);
    assert_eq!(h.points("Bob"), 0.0);
    assert_eq!(h.global(), ChoreState::Approved);
}

#[test]
fn shared_first_disapprove_frees_everyone() {
    let mut h = household(&["Alice", "Bob", "Cara"], CompletionMode::SharedFirst, |_| {});
    h.coordinator.claim_chore("Bob", "Dishes").unwrap();
    assert_eq!(h.state("Alice"), ChoreState::CompletedByOther);
    assert_eq!(h.state("Cara"), ChoreState::CompletedByOther);

    h.coordinator
        .disapprove_chore("Mom", "Bob", "Dishes")
        .unwrap();
    for kid in ["Alice", "Bob", "Cara"] {
        assert_eq!(h.state(kid), ChoreState::Pending);
    }
}

#[test]
fn shared_all_tracks_partial_approval() {
    let mut h = household(&["Alice", "Bob", "Cara"], CompletionMode::SharedAll, |_| {});
    for kid in ["Alice", "Bob"] {
        h.coordinator.claim_chore(kid, "Dishes").unwrap();
        h.coordinator.approve_chore("Mom", kid, "Dishes", None).unwrap();
    }
    assert_eq!(h.state("Cara"), ChoreState::Pending);
    assert_eq!(h.global(), ChoreState::ApprovedInPart);

    h.coordinator.claim_chore("Cara", "Dishes").unwrap();
    assert_eq!(h.global(), ChoreState::ApprovedInPart);
    h.coordinator
        .approve_chore("Mom", "Cara", "Dishes", None)
        .unwrap();
    assert_eq!(h.global(), ChoreState::Approved);
}

#[test]
fn overdue_after_tick_and_still_claimable() {
    let mut h = household(&["Alice"], CompletionMode::Independent, |c| {
        c.recurrence = Recurrence::new(Frequency::Daily);
        c.due_date = Some(at("2026-03-31T18:00:00Z"));
    });
    let report = h.coordinator.tick().unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Overdue);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, Event::ChoreOverdue { .. })));
    assert!(!report.notifications.is_empty());

    h.coordinator.claim_chore("Alice", "Dishes").unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Claimed);
}

#[test]
fn approval_with_override_and_reversal() {
    let mut h = household(&["Alice"], CompletionMode::Independent, |_| {});
    h.coordinator.claim_chore("Alice", "Dishes").unwrap();
    h.coordinator
        .approve_chore("Mom", "Alice", "Dishes", Some(9.0))
        .unwrap();
    assert_eq!(h.points("Alice"), 9.0);

    h.coordinator
        .disapprove_chore("Mom", "Alice", "Dishes")
        .unwrap();
    assert_eq!(h.points("Alice"), 0.0);
    assert_eq!(h.state("Alice"), ChoreState::Pending);
}

#[test]
fn auto_approve_pays_on_claim() {
    let mut h = household(&["Alice"], CompletionMode::Independent, |c| c.auto_approve = true);
    let report = h.coordinator.claim_chore("Alice", "Dishes").unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Approved);
    assert_eq!(h.points("Alice"), 5.0);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, Event::ChoreApproved { .. })));
}

#[test]
fn skip_moves_to_next_occurrence() {
    let mut h = household(&["Alice"], CompletionMode::Independent, |c| {
        c.recurrence = Recurrence::new(Frequency::Weekly);
        c.due_date = Some(at("2026-04-01T18:00:00Z"));
    });
    h.coordinator.skip_chore_due_date("Dishes").unwrap();
    assert_eq!(
        h.coordinator.chore("Dishes").unwrap().due_date,
        Some(at("2026-04-08T18:00:00Z"))
    );
    assert_eq!(h.points("Alice"), 0.0);
}

#[test]
fn reset_overdue_reschedules_and_clears() {
    let mut h = household(&["Alice", "Bob"], CompletionMode::Independent, |c| {
        c.recurrence = Recurrence::new(Frequency::Daily);
        c.due_date = Some(at("2026-03-31T18:00:00Z"));
    });
    h.coordinator.tick().unwrap();
    assert_eq!(h.state("Bob"), ChoreState::Overdue);

    h.coordinator.reset_overdue_chores(Some("Dishes"), None).unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Pending);
    assert_eq!(h.state("Bob"), ChoreState::Pending);
    assert_eq!(
        h.coordinator.chore("Dishes").unwrap().due_date,
        Some(at("2026-04-01T18:00:00Z"))
    );
}

#[test]
fn reset_overdue_for_one_kid_leaves_the_rest() {
    let mut h = household(&["Alice", "Bob"], CompletionMode::Independent, |c| {
        c.recurrence = Recurrence::new(Frequency::Daily);
        c.due_date = Some(at("2026-03-31T18:00:00Z"));
    });
    h.coordinator.tick().unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Overdue);
    assert_eq!(h.state("Bob"), ChoreState::Overdue);

    h.coordinator
        .reset_overdue_chores(Some("Dishes"), Some("Alice"))
        .unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Pending);
    assert_eq!(h.state("Bob"), ChoreState::Overdue);
    assert_eq!(
        h.coordinator.chore("Dishes").unwrap().due_date,
        Some(at("2026-03-31T18:00:00Z"))
    );
}

#[test]
fn midnight_reopens_a_daily_chore_one_kid_skipped() {
    let mut h = household(&["Alice", "Bob"], CompletionMode::Independent, |c| {
        c.recurrence = Recurrence::new(Frequency::Daily);
        c.due_date = Some(at("2026-04-01T18:00:00Z"));
    });
    h.coordinator.tick().unwrap();
    h.coordinator.claim_chore("Alice", "Dishes").unwrap();
    h.coordinator
        .approve_chore("Mom", "Alice", "Dishes", None)
        .unwrap();

    h.clock.advance(Duration::hours(14) + Duration::minutes(5));
    h.coordinator.tick().unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Pending);
    assert_eq!(h.state("Bob"), ChoreState::Pending);
    assert_eq!(h.points("Alice"), 5.0);
    let due = h.coordinator.chore("Dishes").unwrap().due_date;
    assert_eq!(due, Some(at("2026-04-02T18:00:00Z")));

    // Two more quiet days keep rolling the occurrence forward.
    for _ in 0..2 {
        h.clock.advance(Duration::days(1));
        h.coordinator.tick().unwrap();
    }
    assert_eq!(
        h.coordinator.chore("Dishes").unwrap().due_date,
        Some(at("2026-04-04T18:00:00Z"))
    );
    h.coordinator.claim_chore("Alice", "Dishes").unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Claimed);
}

#[test]
fn shared_all_crosses_midnight_with_mixed_progress() {
    let mut h = household(&["Alice", "Bob", "Cara"], CompletionMode::SharedAll, |c| {
        c.recurrence = Recurrence::new(Frequency::Daily);
        c.due_date = Some(at("2026-04-01T18:00:00Z"));
    });
    h.coordinator.tick().unwrap();
    h.coordinator.claim_chore("Alice", "Dishes").unwrap();
    h.coordinator
        .approve_chore("Mom", "Alice", "Dishes", None)
        .unwrap();
    h.coordinator.claim_chore("Bob", "Dishes").unwrap();
    assert_eq!(h.global(), ChoreState::ApprovedInPart);

    h.clock.advance(Duration::hours(14) + Duration::minutes(5));
    h.coordinator.tick().unwrap();
    for kid in ["Alice", "Bob", "Cara"] {
        assert_eq!(h.state(kid), ChoreState::Pending);
    }
    assert_eq!(h.global(), ChoreState::Pending);
    assert_eq!(h.points("Alice"), 5.0);
    assert_eq!(h.points("Bob"), 0.0);
    assert_eq!(
        h.coordinator.chore("Dishes").unwrap().due_date,
        Some(at("2026-04-02T18:00:00Z"))
    );
}

#[test]
fn midnight_rollover_reopens_a_daily_chore() {
    let mut h = household(&["Alice"], CompletionMode::Independent, |c| {
        c.recurrence = Recurrence::new(Frequency::Daily);
        c.due_date = Some(at("2026-04-01T18:00:00Z"));
    });
    h.coordinator.tick().unwrap();
    h.coordinator.claim_chore("Alice", "Dishes").unwrap();
    h.coordinator
        .approve_chore("Mom", "Alice", "Dishes", None)
        .unwrap();

    h.clock.advance(Duration::hours(15));
    h.coordinator.tick().unwrap();
    assert_eq!(h.state("Alice"), ChoreState::Pending);
    assert_eq!(h.points("Alice"), 5.0);
    assert_eq!(
        h.coordinator.chore("Dishes").unwrap().due_date,
        Some(at("2026-04-02T18:00:00Z"))
    );
}

#[test]
fn renaming_keeps_references() {
    let mut h = household(&["Alice"], CompletionMode::Independent, |_| {});
    h.coordinator
        .rename(kidschores_core::EntityKind::Kid, "Alice", "Ally")
        .unwrap();
    h.coordinator.claim_chore("Ally", "Dishes").unwrap();
    assert_eq!(h.state("Ally"), ChoreState::Claimed);
    assert!(matches!(
        h.coordinator.claim_chore("Alice", "Dishes"),
        Err(CoreError::Lookup { .. })
    ));
}
