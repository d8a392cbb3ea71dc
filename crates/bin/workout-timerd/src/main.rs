//! # workout-timerd: workout-timer daemon
//!
//! Composition root that wires the storage adapter into the application
//! services and follows the saved timer presets.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialize logging
//! - Open the `SQLite` store, creating, migrating and validating its schema
//! - Construct the repository (adapter) and the invalidation tracker
//! - Construct the timer service, injecting both via port traits
//! - Log every live snapshot of the presets until interrupted (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;
use workout_timer_adapter_storage_sqlite_sqlx::{OpenOutcome, SqliteTimerRepository};
use workout_timer_app::invalidation_tracker::InvalidationTracker;
use workout_timer_app::services::timer_service::TimerService;
use workout_timer_domain::timer::TimerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = config.storage().build().await?;
    if let OpenOutcome::Recreated { from } = db.outcome() {
        tracing::warn!(from, "schema had no migration path, stored presets were discarded");
    }

    // Services
    let repo = SqliteTimerRepository::new(db.pool().clone());
    let tracker = Arc::new(InvalidationTracker::new(64));
    let service = TimerService::new(repo, tracker);

    let mut snapshots = service.watch_timers();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
            next = snapshots.next() => match next {
                Some(Ok(timers)) => log_snapshot(&timers),
                Some(Err(err)) => {
                    tracing::error!(error = %err, "timer presets could not be read");
                    break;
                }
                None => break,
            },
        }
    }

    drop(snapshots);
    db.close().await;
    Ok(())
}

fn log_snapshot(timers: &[TimerConfig]) {
    tracing::info!(count = timers.len(), "saved timer presets");
    for timer in timers {
        tracing::debug!(
            id = ?timer.id,
            name = %timer.name,
            mode = %timer.timer_mode,
            session_seconds = timer.session_seconds(),
            "preset"
        );
    }
}
