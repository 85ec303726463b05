//! Inputs from the external monitors.
//!
//! Detection itself happens elsewhere; each monitor reduces to one of these
//! plain values, which the [`PauseArbiter`](crate::arbiter::PauseArbiter)
//! turns into pause / resume requests.

use serde::{Deserialize, Serialize};

/// Inactivity detector output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleSignal {
    pub is_idle: bool,
    /// How long the user has been (or was) inactive.
    #[serde(default)]
    pub idle_secs: u64,
}

impl IdleSignal {
    pub fn idle(idle_secs: u64) -> Self {
        Self {
            is_idle: true,
            idle_secs,
        }
    }

    pub fn returned(idle_secs: u64) -> Self {
        Self {
            is_idle: false,
            idle_secs,
        }
    }
}

/// Aggregated meeting / fullscreen / screen-recording signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SmartPauseSignal {
    pub should_pause: bool,
    #[serde(default)]
    pub active_signal_description: Option<String>,
}

impl SmartPauseSignal {
    pub fn active(description: impl Into<String>) -> Self {
        Self {
            should_pause: true,
            active_signal_description: Some(description.into()),
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }
}

/// One evaluation of the work-hours schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkHoursSignal {
    pub should_pause: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerEvent {
    Sleep,
    Wake,
}

/// A schedule the machine polls on every heartbeat.
pub trait PauseSchedule: Send + Sync {
    fn should_pause(&self) -> bool;

    fn reason(&self) -> Option<String> {
        None
    }

    fn signal(&self) -> WorkHoursSignal {
        let should_pause = self.should_pause();
        WorkHoursSignal {
            should_pause,
            reason: if should_pause { self.reason() } else { None },
        }
    }
}
