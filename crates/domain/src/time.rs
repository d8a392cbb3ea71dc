//! Time and timestamp helpers.
//!
//! Timestamps are persisted as epoch milliseconds, so [`now`] truncates to
//! millisecond precision to keep stored and in-memory values equal.

use chrono::{DateTime, SubsecRound, Utc};

/// UTC timestamp used for `created_at`.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time, truncated to milliseconds.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

/// Convert a timestamp to epoch milliseconds.
#[must_use]
pub fn to_epoch_millis(ts: Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Convert epoch milliseconds back to a timestamp.
///
/// Returns `None` when `millis` is outside the representable range.
#[must_use]
pub fn from_epoch_millis(millis: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_millis(millis)
}
