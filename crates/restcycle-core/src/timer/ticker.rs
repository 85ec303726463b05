use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long the overlay gets to animate out between a completed break and
/// the next work session.
pub const SETTLE_DELAY: Duration = Duration::from_millis(600);

/// Identifies one armed countdown.
///
/// Every operation that re-arms or disarms the countdown invalidates the
/// previous handle, so a heartbeat scheduled before a pause/skip/stop can be
/// recognised as stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub(crate) struct Ticker {
    generation: u64,
}

impl Ticker {
    /// Invalidate the current handle and hand out a fresh one.
    pub(crate) fn rearm(&mut self) -> TickHandle {
        self.generation = self.generation.wrapping_add(1);
        TickHandle(self.generation)
    }

    pub(crate) fn handle(&self) -> TickHandle {
        TickHandle(self.generation)
    }

    pub(crate) fn accepts(&self, handle: TickHandle) -> bool {
        handle.0 == self.generation
    }
}

/// Work the machine has scheduled for itself outside the heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Enter work once the break overlay has finished closing.
    Settle { delay: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearm_invalidates_previous_handle() {
        let mut ticker = Ticker::default();
        let first = ticker.rearm();
        assert!(ticker.accepts(first));
        let second = ticker.rearm();
        assert!(!ticker.accepts(first));
        assert!(ticker.accepts(second));
        assert_eq!(ticker.handle(), second);
    }
}
