//! # KidsChores Core Library
//!
//! This library provides the core logic for KidsChores, a household chore
//! and reward coordinator. Every operation is available through the
//! [`Coordinator`] facade; the CLI binary is a thin layer over it.
//!
//! ## Architecture
//!
//! - **Lifecycle Engine**: per-(kid, chore) state machine with shared
//!   completion modes and a derived global state
//! - **Scheduler**: recurrence, overdue detection and midnight/due-date
//!   resets, driven by a caller-invoked `tick()` or the tokio runner
//! - **Points & Gamification**: audited point ledger, badges, achievements,
//!   challenges and reward redemption
//! - **Storage**: JSON document persistence with schema migrations and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Coordinator`]: name-resolving, authorizing, persisting facade
//! - [`EntityStore`]: the owned aggregate of every entity
//! - [`Lifecycle`]: chore state transitions
//! - [`Config`]: configuration management
//! - [`StorageBackend`]: trait for document persistence

pub mod badges;
pub mod clock;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod points;
pub mod recurrence;
pub mod rewards;
pub mod scheduler;
pub mod storage;
pub mod store;

pub use clock::{Calendar, Clock, FixedClock, SystemClock};
pub use context::Context;
pub use coordinator::{ChoreSummary, Coordinator, KidSummary, PersistStatus, Report, Status};
pub use error::{ConfigError, CoreError, StorageError};
pub use events::Event;
pub use lifecycle::Lifecycle;
pub use notify::{LogNotifier, Notification, Notifier, Recipient};
pub use scheduler::runner::SchedulerHandle;
pub use storage::{Config, JsonFileStore, MemoryStore, StorageBackend};
pub use store::{EntityKind, EntityStore};
