//! Storage port: repository trait for timer-preset persistence.

use std::future::Future;
use std::sync::Arc;

use workout_timer_domain::error::TimerError;
use workout_timer_domain::id::TimerId;
use workout_timer_domain::timer::TimerConfig;

/// Row-access layer for [`TimerConfig`] presets.
///
/// Every write runs in its own all-or-nothing transaction; a failed write
/// leaves no partial state behind.
pub trait TimerRepository {
    /// Insert a preset, replacing any existing row with the same id.
    ///
    /// An unassigned id asks the store to allocate one. Returns the id the
    /// row was stored under.
    fn insert(&self, timer: TimerConfig)
    -> impl Future<Output = Result<TimerId, TimerError>> + Send;

    /// Replace every column of the row matching `timer.id`.
    ///
    /// Fails with [`TimerError::NotFound`] when no row matches. `created_at`
    /// is overwritten too, so callers must carry the stored value over.
    fn update(
        &self,
        timer: TimerConfig,
    ) -> impl Future<Output = Result<TimerConfig, TimerError>> + Send;

    /// Delete the row whose key is `timer.id`.
    ///
    /// Returns whether a row was removed; a missing row is not an error.
    fn delete(&self, timer: &TimerConfig) -> impl Future<Output = Result<bool, TimerError>> + Send;

    /// Delete the row with the given key, same semantics as [`Self::delete`].
    fn delete_by_id(&self, id: TimerId) -> impl Future<Output = Result<bool, TimerError>> + Send;

    /// All presets, newest `created_at` first.
    fn get_all(&self) -> impl Future<Output = Result<Vec<TimerConfig>, TimerError>> + Send;

    /// Look up a preset by key.
    fn get_by_id(
        &self,
        id: TimerId,
    ) -> impl Future<Output = Result<Option<TimerConfig>, TimerError>> + Send;

    /// Remove every preset, returning how many rows were deleted.
    fn clear(&self) -> impl Future<Output = Result<u64, TimerError>> + Send;
}

impl<T: TimerRepository + Send + Sync> TimerRepository for Arc<T> {
    fn insert(
        &self,
        timer: TimerConfig,
    ) -> impl Future<Output = Result<TimerId, TimerError>> + Send {
        (**self).insert(timer)
    }

    fn update(
        &self,
        timer: TimerConfig,
    ) -> impl Future<Output = Result<TimerConfig, TimerError>> + Send {
        (**self).update(timer)
    }

    fn delete(&self, timer: &TimerConfig) -> impl Future<Output = Result<bool, TimerError>> + Send {
        (**self).delete(timer)
    }

    fn delete_by_id(&self, id: TimerId) -> impl Future<Output = Result<bool, TimerError>> + Send {
        (**self).delete_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<TimerConfig>, TimerError>> + Send {
        (**self).get_all()
    }

    fn get_by_id(
        &self,
        id: TimerId,
    ) -> impl Future<Output = Result<Option<TimerConfig>, TimerError>> + Send {
        (**self).get_by_id(id)
    }

    fn clear(&self) -> impl Future<Output = Result<u64, TimerError>> + Send {
        (**self).clear()
    }
}
