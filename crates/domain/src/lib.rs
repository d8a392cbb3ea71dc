//! # workout-timer-domain
//!
//! Pure domain model for the workout-timer preset store.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Timer presets** (`TimerConfig`) with their defaults and invariants
//! - Define **Table changes** (what observers are told after a commit)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod change;
pub mod timer;
