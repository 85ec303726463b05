use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of the break cycle.
///
/// `Idle` is both the initial state and the "not running" state that
/// `start()` leaves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Work,
    PreBreak,
    Break,
}

impl TimerState {
    pub fn is_running(self) -> bool {
        self != TimerState::Idle
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Work => "work",
            TimerState::PreBreak => "pre_break",
            TimerState::Break => "break",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is holding the current pause.
///
/// Only the holder may lift the pause. `User` is the exception: explicit
/// user intent may resume any pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseSource {
    User,
    SmartPause,
    WorkHours,
    Idle,
    System,
}

impl PauseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PauseSource::User => "user",
            PauseSource::SmartPause => "smart_pause",
            PauseSource::WorkHours => "work_hours",
            PauseSource::Idle => "idle",
            PauseSource::System => "system",
        }
    }

    /// Whether a resume requested by `self` may lift a pause held by `holder`.
    pub fn may_resume(self, holder: PauseSource) -> bool {
        self == PauseSource::User || self == holder
    }
}

impl fmt::Display for PauseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything captured at pause time and restored verbatim on resume.
///
/// Holding the pause as one optional value keeps "paused", "pause source"
/// and "paused state" from ever disagreeing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSnapshot {
    pub state: TimerState,
    pub remaining_secs: u64,
    pub source: PauseSource,
    /// Human-readable reason reported by the signal that paused.
    #[serde(default)]
    pub reason: Option<String>,
}
