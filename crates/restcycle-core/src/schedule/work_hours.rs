//! Work-hours window.
//!
//! Outside the configured hours (or on a day that is not a work day) the
//! cycle pauses with `PauseSource::WorkHours`.

use chrono::{Datelike, Local, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::signals::PauseSchedule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkHours {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_start_hour")]
    pub start_hour: u8,
    #[serde(default = "default_end_hour")]
    pub end_hour: u8,
    #[serde(default = "default_days")]
    pub days: Vec<Weekday>,
}

fn default_start_hour() -> u8 {
    9
}
fn default_end_hour() -> u8 {
    18
}
fn default_days() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

impl Default for WorkHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            days: default_days(),
        }
    }
}

impl WorkHours {
    /// Whether `hour` falls inside the window. `start_hour > end_hour` wraps
    /// over midnight; equal bounds cover the whole day.
    pub fn contains_hour(&self, hour: u32) -> bool {
        let (start, end) = (self.start_hour as u32, self.end_hour as u32);
        if start == end {
            true
        } else if start < end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        }
    }

    pub fn should_pause_at(&self, now: NaiveDateTime) -> bool {
        if !self.enabled {
            return false;
        }
        !self.days.contains(&now.weekday()) || !self.contains_hour(now.hour())
    }

    fn window_label(&self) -> String {
        format!("{:02}:00-{:02}:00", self.start_hour, self.end_hour)
    }
}

impl PauseSchedule for WorkHours {
    fn should_pause(&self) -> bool {
        self.should_pause_at(Local::now().naive_local())
    }

    fn reason(&self) -> Option<String> {
        Some(format!("outside work hours ({})", self.window_label()))
    }
}
