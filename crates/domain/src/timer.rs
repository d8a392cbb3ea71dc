//! Timer preset: a saved interval-timer configuration.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TimerError, UnknownVariantError, ValidationError};
use crate::id::TimerId;
use crate::time::{Timestamp, now};

/// Countdown behaviour of a preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerMode {
    /// Every-minute-on-the-minute: one round per minute for `total_minutes`.
    #[default]
    Weightlift,
    /// Hangboard repetitions of `hold_seconds` on, `rest_seconds` off.
    Climbing,
}

impl TimerMode {
    /// Stored tag of this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weightlift => "WEIGHTLIFT",
            Self::Climbing => "CLIMBING",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WEIGHTLIFT" => Ok(Self::Weightlift),
            "CLIMBING" => Ok(Self::Climbing),
            other => Err(UnknownVariantError {
                kind: "timer mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Sound cue played before each round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioType {
    #[default]
    Beep,
    Voice,
}

impl AudioType {
    /// Stored tag of this cue.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beep => "BEEP",
            Self::Voice => "VOICE",
        }
    }
}

impl fmt::Display for AudioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioType {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BEEP" => Ok(Self::Beep),
            "VOICE" => Ok(Self::Voice),
            other => Err(UnknownVariantError {
                kind: "audio type",
                value: other.to_string(),
            }),
        }
    }
}

const TOTAL_MINUTES: RangeInclusive<u32> = 2..=120;
const COUNTDOWN_SECONDS: RangeInclusive<u32> = 1..=10;
const INITIAL_COUNTDOWN_SECONDS: RangeInclusive<u32> = 0..=30;
const HOLD_SECONDS: RangeInclusive<u32> = 1..=60;
const REST_SECONDS: RangeInclusive<u32> = 1..=60;
const TOTAL_REPETITIONS: RangeInclusive<u32> = 1..=100;

/// One saved interval-timer preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Store-assigned key, `None` until the preset is inserted.
    pub id: Option<TimerId>,
    pub name: String,
    pub timer_mode: TimerMode,
    /// Overall session length in weightlift mode.
    pub total_minutes: u32,
    pub audio_enabled: bool,
    pub audio_type: AudioType,
    /// Warning countdown played before each round.
    pub countdown_seconds: u32,
    /// "Get ready" countdown before the session starts, 0 to skip.
    pub initial_countdown_seconds: u32,
    pub hold_seconds: u32,
    pub rest_seconds: u32,
    pub total_repetitions: u32,
    /// Creation time, the sort key for listings. Never changes after insert.
    pub created_at: Timestamp,
}

impl TimerConfig {
    /// Name of the table presets live in, used as the change-notification key.
    pub const TABLE: &'static str = "timers";

    /// Create a builder for constructing a [`TimerConfig`].
    #[must_use]
    pub fn builder() -> TimerConfigBuilder {
        TimerConfigBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Validation`] for a blank name or the first
    /// numeric field outside its accepted range.
    pub fn validate(&self) -> Result<(), TimerError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName.into());
        }
        check_range("totalMinutes", self.total_minutes, TOTAL_MINUTES)?;
        check_range("countdownSeconds", self.countdown_seconds, COUNTDOWN_SECONDS)?;
        check_range(
            "initialCountdownSeconds",
            self.initial_countdown_seconds,
            INITIAL_COUNTDOWN_SECONDS,
        )?;
        check_range("holdSeconds", self.hold_seconds, HOLD_SECONDS)?;
        check_range("restSeconds", self.rest_seconds, REST_SECONDS)?;
        check_range("totalRepetitions", self.total_repetitions, TOTAL_REPETITIONS)?;
        Ok(())
    }

    /// Length of the working part of a session, excluding the initial countdown.
    #[must_use]
    ///
    /// Stored rows are not re-validated, so the result saturates instead of
    /// overflowing.
    pub fn session_seconds(&self) -> u64 {
        match self.timer_mode {
            TimerMode::Weightlift => u64::from(self.total_minutes) * 60,
            TimerMode::Climbing => (u64::from(self.hold_seconds) + u64::from(self.rest_seconds))
                .saturating_mul(u64::from(self.total_repetitions)),
        }
    }
}

fn check_range(
    field: &'static str,
    value: u32,
    range: RangeInclusive<u32>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Step-by-step builder for [`TimerConfig`].
///
/// Unset fields take the editor defaults: weightlift mode, 10 minutes,
/// beep audio enabled, 3 s countdown, no initial countdown, 6 reps of
/// 7 s hold / 3 s rest. `created_at` defaults to the build time.
#[derive(Debug, Default)]
pub struct TimerConfigBuilder {
    id: Option<TimerId>,
    name: Option<String>,
    timer_mode: Option<TimerMode>,
    total_minutes: Option<u32>,
    audio_enabled: Option<bool>,
    audio_type: Option<AudioType>,
    countdown_seconds: Option<u32>,
    initial_countdown_seconds: Option<u32>,
    hold_seconds: Option<u32>,
    rest_seconds: Option<u32>,
    total_repetitions: Option<u32>,
    created_at: Option<Timestamp>,
}

impl TimerConfigBuilder {
    #[must_use]
    pub fn id(mut self, id: TimerId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn timer_mode(mut self, timer_mode: TimerMode) -> Self {
        self.timer_mode = Some(timer_mode);
        self
    }

    #[must_use]
    pub fn total_minutes(mut self, total_minutes: u32) -> Self {
        self.total_minutes = Some(total_minutes);
        self
    }

    #[must_use]
    pub fn audio_enabled(mut self, audio_enabled: bool) -> Self {
        self.audio_enabled = Some(audio_enabled);
        self
    }

    #[must_use]
    pub fn audio_type(mut self, audio_type: AudioType) -> Self {
        self.audio_type = Some(audio_type);
        self
    }

    #[must_use]
    pub fn countdown_seconds(mut self, seconds: u32) -> Self {
        self.countdown_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn initial_countdown_seconds(mut self, seconds: u32) -> Self {
        self.initial_countdown_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn hold_seconds(mut self, seconds: u32) -> Self {
        self.hold_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn rest_seconds(mut self, seconds: u32) -> Self {
        self.rest_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn total_repetitions(mut self, repetitions: u32) -> Self {
        self.total_repetitions = Some(repetitions);
        self
    }

    #[must_use]
    pub fn created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Consume the builder, validate, and return a [`TimerConfig`].
    ///
    /// The name is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Validation`] if the name is missing or blank, or
    /// a numeric field is out of range.
    pub fn build(self) -> Result<TimerConfig, TimerError> {
        let timer = TimerConfig {
            id: self.id,
            name: self.name.unwrap_or_default().trim().to_string(),
            timer_mode: self.timer_mode.unwrap_or_default(),
            total_minutes: self.total_minutes.unwrap_or(10),
            audio_enabled: self.audio_enabled.unwrap_or(true),
            audio_type: self.audio_type.unwrap_or_default(),
            countdown_seconds: self.countdown_seconds.unwrap_or(3),
            initial_countdown_seconds: self.initial_countdown_seconds.unwrap_or(0),
            hold_seconds: self.hold_seconds.unwrap_or(7),
            rest_seconds: self.rest_seconds.unwrap_or(3),
            total_repetitions: self.total_repetitions.unwrap_or(6),
            created_at: self.created_at.unwrap_or_else(now),
        };
        timer.validate()?;
        Ok(timer)
    }
}
