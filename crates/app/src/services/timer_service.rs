//! Timer service: use-cases for managing saved timer presets.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use workout_timer_domain::change::{ChangeKind, TableChange};
use workout_timer_domain::error::TimerError;
use workout_timer_domain::id::TimerId;
use workout_timer_domain::timer::TimerConfig;

use crate::ports::{ChangePublisher, TimerRepository};

/// Live sequence of ordered preset snapshots, see [`TimerService::watch_timers`].
pub type TimerSnapshots = ReceiverStream<Result<Vec<TimerConfig>, TimerError>>;

/// Application service for timer-preset persistence and change notification.
pub struct TimerService<R, P> {
    repo: Arc<R>,
    publisher: P,
}

impl<R, P> TimerService<R, P>
where
    R: TimerRepository + Send + Sync + 'static,
    P: ChangePublisher,
{
    /// Create a new service backed by the given repository and publisher.
    pub fn new(repo: R, publisher: P) -> Self {
        Self {
            repo: Arc::new(repo),
            publisher,
        }
    }

    /// Insert a preset after validating domain invariants.
    ///
    /// An existing row with the same id is replaced entirely.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, timer), fields(timer_name = %timer.name))]
    pub async fn insert_timer(&self, timer: TimerConfig) -> Result<TimerId, TimerError> {
        timer.validate()?;
        let id = self.repo.insert(timer).await?;
        self.notify(ChangeKind::Inserted).await?;
        Ok(id)
    }

    /// Replace every column of an existing preset.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Validation`] if invariants fail,
    /// [`TimerError::NotFound`] if no row has the preset's id, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self, timer), fields(timer_id = ?timer.id))]
    pub async fn update_timer(&self, timer: TimerConfig) -> Result<TimerConfig, TimerError> {
        timer.validate()?;
        let updated = self.repo.update(timer).await?;
        self.notify(ChangeKind::Updated).await?;
        Ok(updated)
    }

    /// Insert the preset if it has no id yet, update it otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Self::insert_timer`] and [`Self::update_timer`].
    pub async fn save_timer(&self, timer: TimerConfig) -> Result<TimerId, TimerError> {
        match timer.id {
            Some(id) => self.update_timer(timer).await.map(|_| id),
            None => self.insert_timer(timer).await,
        }
    }

    /// Delete the row keyed by `timer.id`. A missing row is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self, timer), fields(timer_id = ?timer.id))]
    pub async fn delete_timer(&self, timer: &TimerConfig) -> Result<(), TimerError> {
        if self.repo.delete(timer).await? {
            self.notify(ChangeKind::Deleted).await?;
        }
        Ok(())
    }

    /// Delete a preset by id. A missing row is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_timer_by_id(&self, id: TimerId) -> Result<(), TimerError> {
        if self.repo.delete_by_id(id).await? {
            self.notify(ChangeKind::Deleted).await?;
        }
        Ok(())
    }

    /// Remove every preset, returning how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn clear_timers(&self) -> Result<u64, TimerError> {
        let removed = self.repo.clear().await?;
        if removed > 0 {
            self.notify(ChangeKind::Cleared).await?;
        }
        Ok(removed)
    }

    /// One-shot snapshot of all presets, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_timers(&self) -> Result<Vec<TimerConfig>, TimerError> {
        self.repo.get_all().await
    }

    /// Look up a preset by id. An unknown id yields `Ok(None)`.
    ///
    /// `cancel` is checked before the read starts, raced against it, and
    /// checked again once it completes.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Cancelled`] if `cancel` fires first, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_timer(
        &self,
        id: TimerId,
        cancel: &CancellationToken,
    ) -> Result<Option<TimerConfig>, TimerError> {
        if cancel.is_cancelled() {
            return Err(TimerError::Cancelled);
        }
        let found = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TimerError::Cancelled),
            found = self.repo.get_by_id(id) => found?,
        };
        if cancel.is_cancelled() {
            return Err(TimerError::Cancelled);
        }
        Ok(found)
    }

    /// Live view of all presets, newest first.
    ///
    /// Yields the current snapshot right away, then a freshly queried one
    /// after every change published for the `timers` table, until the stream
    /// is dropped. Identical consecutive snapshots are not deduplicated. A
    /// failed query is yielded as an error and ends the stream; call again
    /// to restart.
    ///
    /// Queries run on a background task, so this must be called from within
    /// a tokio runtime.
    pub fn watch_timers(&self) -> TimerSnapshots {
        // Subscribe before the first query so no commit can slip in between.
        let mut changes = self.publisher.subscribe(TimerConfig::TABLE);
        let repo = Arc::clone(&self.repo);
        let (tx, rx) = mpsc::channel(1);

        let watcher = async move {
            loop {
                let snapshot = repo.get_all().await;
                let failed = snapshot.is_err();
                if tx.send(snapshot).await.is_err() || failed {
                    break;
                }
                tokio::select! {
                    () = tx.closed() => break,
                    received = changes.recv() => match received {
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "timer watcher lagged, re-querying once");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("timer watcher stopped");
        };
        tokio::spawn(watcher.instrument(tracing::debug_span!("watch_timers")));

        ReceiverStream::new(rx)
    }

    async fn notify(&self, kind: ChangeKind) -> Result<(), TimerError> {
        self.publisher
            .publish(TableChange::new(TimerConfig::TABLE, kind))
            .await
    }
}
