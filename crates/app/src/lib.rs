//! # workout-timer-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `TimerRepository`: CRUD for timer presets
//!   - `ChangePublisher`: table-keyed change notification
//! - Define **driving/inbound ports** as use-case structs:
//!   - `TimerService`: insert, update, delete, list, live list, get
//! - Provide **in-process infrastructure** (invalidation tracker) that doesn't need IO
//! - Orchestrate domain objects without knowing *how* persistence works
//!
//! ## Dependency rule
//! Depends on `workout-timer-domain` only (plus `tokio` for channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod invalidation_tracker;
pub mod ports;
pub mod services;
