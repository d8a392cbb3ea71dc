//! # workout-timer-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `TimerRepository` port defined in `workout-timer-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Create, migrate and validate the schema when the store is opened
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `workout-timer-app` (for port traits) and `workout-timer-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod schema;
pub mod timer_repo;

pub use error::StorageError;
pub use pool::{Config, Database, OpenOutcome};
pub use timer_repo::SqliteTimerRepository;
