mod configuration;
mod machine;
mod overtime;
mod skip;
mod snapshot;
mod state;
mod ticker;

pub use configuration::{Configuration, CycleMode};
pub use machine::{BreakCycle, CycleResult};
pub use overtime::OvertimeMonitor;
pub use skip::{SkipDifficulty, BALANCED_SKIP_AFTER_SECS};
pub use snapshot::CycleSnapshot;
pub use state::{PauseSnapshot, PauseSource, TimerState};
pub use ticker::{FollowUp, TickHandle, SETTLE_DELAY};
