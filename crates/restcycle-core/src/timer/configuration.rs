//! Resolved cycle configuration.
//!
//! A [`Configuration`] is the immutable snapshot the state machine runs
//! against. Swapping it while a cycle is running stops the cycle.

use serde::{Deserialize, Serialize};

use super::skip::SkipDifficulty;

/// Preset the configuration was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CycleMode {
    /// 20 minutes of work, 20 second look-away break.
    #[default]
    TwentyTwentyTwenty,
    /// 25 / 5 with a 15 minute long break every fourth break.
    Pomodoro,
    /// Explicit durations.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub mode: CycleMode,
    pub work_interval_secs: u64,
    /// `0` disables the pre-break warning.
    pub pre_break_secs: u64,
    pub break_duration_secs: u64,
    #[serde(default)]
    pub adaptive_mode: bool,
    #[serde(default)]
    pub long_break_enabled: bool,
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default)]
    pub long_break_duration_secs: u64,
    #[serde(default)]
    pub lock_screen_on_break: bool,
    #[serde(default)]
    pub skip_difficulty: SkipDifficulty,
    #[serde(default = "default_true")]
    pub overtime_enabled: bool,
    /// Keep counting work time towards overtime while paused in work.
    #[serde(default)]
    pub overtime_while_paused: bool,
}

fn default_long_break_interval() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Configuration {
    /// Preset values for `mode`. `Custom` falls back to the 20-20-20 numbers.
    pub fn preset(mode: CycleMode) -> Self {
        let base = Self {
            mode,
            work_interval_secs: 20 * 60,
            pre_break_secs: 10,
            break_duration_secs: 20,
            adaptive_mode: false,
            long_break_enabled: false,
            long_break_interval: default_long_break_interval(),
            long_break_duration_secs: 5 * 60,
            lock_screen_on_break: false,
            skip_difficulty: SkipDifficulty::default(),
            overtime_enabled: true,
            overtime_while_paused: false,
        };
        match mode {
            CycleMode::TwentyTwentyTwenty | CycleMode::Custom => base,
            CycleMode::Pomodoro => Self {
                work_interval_secs: 25 * 60,
                pre_break_secs: 30,
                break_duration_secs: 5 * 60,
                long_break_enabled: true,
                long_break_duration_secs: 15 * 60,
                ..base
            },
        }
    }

    /// Shorthand for custom durations with everything else at defaults.
    pub fn with_durations(work_secs: u64, pre_break_secs: u64, break_secs: u64) -> Self {
        Self {
            work_interval_secs: work_secs,
            pre_break_secs,
            break_duration_secs: break_secs,
            ..Self::preset(CycleMode::Custom)
        }
    }

    pub fn pre_break_enabled(&self) -> bool {
        self.pre_break_secs > 0
    }

    /// Whether the `break_count`-th break is a long one.
    pub fn is_long_break(&self, break_count: u32) -> bool {
        self.long_break_enabled
            && self.long_break_interval > 0
            && break_count > 0
            && break_count % self.long_break_interval == 0
    }

    pub fn break_duration_for(&self, break_count: u32) -> u64 {
        if self.is_long_break(break_count) {
            self.long_break_duration_secs
        } else {
            self.break_duration_secs
        }
    }

    /// Work seconds after which the overtime nudge fires (1.5x the interval).
    pub fn overtime_threshold_secs(&self) -> u64 {
        self.work_interval_secs.saturating_mul(3) / 2
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::preset(CycleMode::default())
    }
}
