//! # Restcycle Core Library
//!
//! This library provides the core logic for the restcycle break reminder.
//! All behavior lives here; the `restcycle` CLI is a thin layer over the same
//! library.
//!
//! ## Architecture
//!
//! - **Break cycle**: a heartbeat-driven state machine (`idle → work →
//!   pre-break → break → work …`) that requires the caller to invoke `tick()`
//!   once per second
//! - **Arbitration**: idle, smart-pause, work-hours and power monitors feed
//!   signals through a single arbiter that tags every pause with its owner
//! - **Effects**: overlay, notifications, sound, screen lock and adherence
//!   recording sit behind traits and never block a transition
//! - **Storage**: TOML configuration and a JSON snapshot for crash recovery
//!
//! ## Key Components
//!
//! - [`BreakCycle`]: the state machine
//! - [`PauseArbiter`]: pause ownership decisions
//! - [`CycleDriver`]: owns the machine on a tokio task
//! - [`Config`]: application configuration management

pub mod arbiter;
pub mod driver;
pub mod effects;
pub mod error;
pub mod events;
pub mod schedule;
pub mod signals;
pub mod storage;
pub mod timer;

pub use arbiter::{ArbiterPolicy, PauseArbiter, Verdict};
pub use driver::{dispatch, Command, CycleDriver, DriverClosed, DriverHandle};
pub use effects::{BreakRecord, Collaborators, EffectResult};
pub use error::{ConfigError, CoreError, EffectError, Rejection};
pub use events::{Event, EventBus};
pub use schedule::WorkHours;
pub use signals::{IdleSignal, PauseSchedule, PowerEvent, SmartPauseSignal, WorkHoursSignal};
pub use storage::{Config, JsonSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use timer::{
    BreakCycle, Configuration, CycleMode, CycleSnapshot, PauseSource, SkipDifficulty, TimerState,
};
