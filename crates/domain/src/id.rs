//! Typed row identifiers.
//!
//! Timer presets are keyed by a store-assigned integer. A preset that has not
//! been persisted yet carries no id at all (`Option<TimerId>::None`).

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Surrogate primary key of a [`TimerConfig`](crate::timer::TimerConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(i64);

impl TimerId {
    /// Wrap a raw row id.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Access the raw row id.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<TimerId> for i64 {
    fn from(id: TimerId) -> Self {
        id.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TimerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}
