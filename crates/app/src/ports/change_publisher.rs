//! Change notification port: publish/subscribe keyed by table name.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use workout_timer_domain::change::TableChange;
use workout_timer_domain::error::TimerError;

/// Tells observers of a table that a committed write touched it.
pub trait ChangePublisher {
    /// Publish a change to every current subscriber of `change.table`.
    fn publish(&self, change: TableChange) -> impl Future<Output = Result<(), TimerError>> + Send;

    /// Subscribe to changes published for `table` from now on.
    fn subscribe(&self, table: &'static str) -> broadcast::Receiver<TableChange>;
}

impl<T: ChangePublisher + Send + Sync> ChangePublisher for Arc<T> {
    fn publish(&self, change: TableChange) -> impl Future<Output = Result<(), TimerError>> + Send {
        (**self).publish(change)
    }

    fn subscribe(&self, table: &'static str) -> broadcast::Receiver<TableChange> {
        (**self).subscribe(table)
    }
}
