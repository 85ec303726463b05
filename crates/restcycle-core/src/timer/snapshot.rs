use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::configuration::Configuration;
use super::state::{PauseSnapshot, PauseSource, TimerState};

/// Serializable picture of the machine, handed to the persistence bridge
/// after every transition and broadcast with `Event::StateChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub state: TimerState,
    pub remaining_secs: u64,
    #[serde(default)]
    pub pause: Option<PauseSnapshot>,
    pub break_count: u32,
    pub break_elapsed_secs: u64,
    pub work_elapsed_secs: u64,
    /// Duration of the break in progress (0 outside a break).
    #[serde(default)]
    pub break_duration_secs: u64,
    pub overtime_nudge_shown: bool,
    /// The break completed and the machine is waiting to enter work.
    #[serde(default)]
    pub settling: bool,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    pub configuration: Configuration,
}

impl CycleSnapshot {
    pub fn is_paused(&self) -> bool {
        self.pause.is_some()
    }

    pub fn pause_source(&self) -> Option<PauseSource> {
        self.pause.as_ref().map(|p| p.source)
    }

    pub fn is_long_break(&self) -> bool {
        self.state == TimerState::Break && self.configuration.is_long_break(self.break_count)
    }
}
