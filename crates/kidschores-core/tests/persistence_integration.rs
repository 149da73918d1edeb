//! Persistence through the coordinator: file round trips, schema migration
//! on load, and degraded saves.

use kidschores_core::model::{Chore, ChoreState, CompletionMode, Kid, Parent};
use kidschores_core::{
    Config, Coordinator, CoreError, Event, FixedClock, JsonFileStore, MemoryStore, PersistStatus,
    StorageBackend, StorageError,
};
use serde_json::json;

fn config() -> Config {
    let mut config = Config::default();
    config.schedule.utc_offset_minutes = Some(0);
    config
}

fn clock() -> FixedClock {
    FixedClock::new("2026-04-01T10:00:00Z".parse().unwrap())
}

fn seed(c: &mut Coordinator) {
    let alice = c.add_kid(Kid::new("Alice")).unwrap();
    c.add_parent(Parent::new("Mom")).unwrap();
    let mut chore = Chore::new("Dishes", 5.0);
    chore.assigned_kids.push(alice);
    c.add_chore(chore).unwrap();
}

#[test]
fn file_backend_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let backend = JsonFileStore::new(dir.path());
        let mut c = Coordinator::open(Box::new(backend), Box::new(clock()), config()).unwrap();
        seed(&mut c);
        c.claim_chore("Alice", "Dishes").unwrap();
        c.approve_chore("Mom", "Alice", "Dishes", None).unwrap();
    }
    assert!(dir.path().join("kidschores_data.json").exists());

    let backend = JsonFileStore::new(dir.path());
    let c = Coordinator::open(Box::new(backend), Box::new(clock()), config()).unwrap();
    let alice = c.kid("Alice").unwrap();
    assert_eq!(alice.points, 5.0);
    assert_eq!(
        alice.chore_state(&c.chore("Dishes").unwrap().id),
        ChoreState::Approved
    );
    assert_eq!(c.history("Alice").unwrap().len(), 1);
}

#[test]
fn v1_document_is_migrated_on_open() {
    let backend = MemoryStore::new();
    backend.put(
        "kidschores_data",
        json!({
            "kids": {
                "k1": {"id": "k1", "name": "Alice", "points": 12.0},
                "k2": {"id": "k2", "name": "Bob"}
            },
            "chores": {
                "c1": {
                    "id": "c1",
                    "name": "Dishes",
                    "default_points": 5.0,
                    "assigned_kids": ["k1", "k2"],
                    "shared_chore": true
                }
            }
        }),
    );

    let c = Coordinator::open(Box::new(backend.clone()), Box::new(clock()), config()).unwrap();
    assert_eq!(
        c.chore("Dishes").unwrap().completion_mode,
        CompletionMode::SharedAll
    );
    assert_eq!(c.kid("Alice").unwrap().points, 12.0);

    let stored = backend.get("kidschores_data").unwrap();
    assert_eq!(stored["schema_version"], json!(2));
    assert_eq!(stored["chores"]["c1"]["completion_mode"], json!("shared_all"));
}

#[test]
fn newer_schema_refuses_to_open() {
    let backend = MemoryStore::new();
    backend.put("kidschores_data", json!({"schema_version": 3}));
    let err = Coordinator::open(Box::new(backend), Box::new(clock()), config())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        CoreError::Persistence(StorageError::UnsupportedVersion { found: 3, .. })
    ));
}

#[test]
fn degraded_save_keeps_the_action_and_flush_recovers() {
    let backend = MemoryStore::new();
    let mut c = Coordinator::open(Box::new(backend.clone()), Box::new(clock()), config()).unwrap();
    seed(&mut c);

    backend.fail_next_saves(10);
    let report = c.claim_chore("Alice", "Dishes").unwrap();
    assert!(matches!(report.persisted, PersistStatus::Degraded { attempts: 4, .. }));
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, Event::PersistenceDegraded { .. })));

    // Six injected failures remain; a flush makes four attempts.
    assert!(matches!(c.flush(), Err(CoreError::Persistence(_))));
    c.flush().unwrap();
    assert!(!c.is_dirty());

    let stored = backend.load("kidschores_data").unwrap().unwrap();
    let chore_id = c.chore("Dishes").unwrap().id.clone();
    let kid_id = c.kid("Alice").unwrap().id.clone();
    assert_eq!(
        stored["kids"][kid_id.as_str()]["chores"][chore_id.as_str()]["state"],
        json!("claimed")
    );
}

#[test]
fn retries_follow_configuration() {
    let backend = MemoryStore::new();
    let mut cfg = config();
    cfg.persistence.max_save_retries = 0;
    let mut c = Coordinator::open(Box::new(backend.clone()), Box::new(clock()), cfg).unwrap();
    seed(&mut c);
    backend.fail_next_saves(1);
    let report = c.claim_chore("Alice", "Dishes").unwrap();
    assert!(matches!(report.persisted, PersistStatus::Degraded { attempts: 1, .. }));
}
