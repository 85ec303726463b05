use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::timer::{CycleSnapshot, PauseSource};

const EVENT_CAPACITY: usize = 256;

/// Every state change of the break cycle produces an Event.
/// UIs and monitors subscribe to them instead of observing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Started {
        at: DateTime<Utc>,
    },
    Stopped {
        at: DateTime<Utc>,
    },
    Paused {
        source: PauseSource,
        reason: Option<String>,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        source: PauseSource,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    WorkStarted {
        seconds: u64,
        at: DateTime<Utc>,
    },
    PreBreakStarted {
        seconds: u64,
        at: DateTime<Utc>,
    },
    BreakStarted {
        duration_secs: u64,
        long_break: bool,
        break_count: u32,
        at: DateTime<Utc>,
    },
    /// Break ran to zero. The next work session follows after the settle window.
    BreakCompleted {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Break (or the upcoming break, from pre-break) was skipped.
    BreakSkipped {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    Postponed {
        seconds: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    OvertimeNudge {
        elapsed_minutes: u64,
        at: DateTime<Utc>,
    },
    ConfigurationChanged {
        at: DateTime<Utc>,
    },
    /// Runtime state was rebuilt from a persisted snapshot.
    Recovered {
        at: DateTime<Utc>,
    },
    /// Emitted after every transition.
    StateChanged {
        snapshot: Box<CycleSnapshot>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Started { .. } => "started",
            Event::Stopped { .. } => "stopped",
            Event::Paused { .. } => "paused",
            Event::Resumed { .. } => "resumed",
            Event::WorkStarted { .. } => "work_started",
            Event::PreBreakStarted { .. } => "pre_break_started",
            Event::BreakStarted { .. } => "break_started",
            Event::BreakCompleted { .. } => "break_completed",
            Event::BreakSkipped { .. } => "break_skipped",
            Event::Postponed { .. } => "postponed",
            Event::OvertimeNudge { .. } => "overtime_nudge",
            Event::ConfigurationChanged { .. } => "configuration_changed",
            Event::Recovered { .. } => "recovered",
            Event::StateChanged { .. } => "state_changed",
        }
    }
}

/// Fan-out of cycle events to any number of subscribers.
///
/// Sending never blocks. Subscribers that fall behind by more than the
/// channel capacity see `RecvError::Lagged` and skip ahead.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // Err only means nobody is subscribed right now.
        if self.tx.send(event).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
