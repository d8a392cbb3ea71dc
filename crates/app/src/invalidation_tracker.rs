//! In-process invalidation tracker: one tokio broadcast topic per table.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use workout_timer_domain::change::TableChange;
use workout_timer_domain::error::TimerError;

use crate::ports::ChangePublisher;

/// Observer registry keyed by table name.
///
/// Writers publish a [`TableChange`] after their transaction commits;
/// subscribers of that table receive it. Publishing succeeds even when a
/// table has no subscribers (the change is simply dropped), and a topic
/// whose last subscriber went away is released on the next publish.
pub struct InvalidationTracker {
    capacity: usize,
    topics: Mutex<HashMap<&'static str, broadcast::Sender<TableChange>>>,
}

impl InvalidationTracker {
    /// Create a tracker whose per-table channels buffer `capacity` changes.
    ///
    /// # Panics
    ///
    /// Panics on the first subscription if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Number of tables that currently have a live topic.
    #[must_use]
    pub fn observed_tables(&self) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn notify(&self, change: TableChange) {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = topics.get(change.table) else {
            return;
        };
        // send fails only when every receiver is gone.
        if sender.send(change).is_err() {
            tracing::debug!(table = change.table, "dropping topic without subscribers");
            topics.remove(change.table);
        }
    }
}

impl ChangePublisher for InvalidationTracker {
    fn publish(&self, change: TableChange) -> impl Future<Output = Result<(), TimerError>> + Send {
        tracing::debug!(table = change.table, kind = ?change.kind, "table changed");
        self.notify(change);
        async { Ok(()) }
    }

    fn subscribe(&self, table: &'static str) -> broadcast::Receiver<TableChange> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(table)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}
