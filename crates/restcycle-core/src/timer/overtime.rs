//! One-shot overtime nudge.
//!
//! Fires once per work session when accumulated work time reaches the
//! configured threshold. The latch is cleared whenever a fresh work session
//! or a break begins.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OvertimeMonitor {
    nudged: bool,
}

impl OvertimeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the elapsed whole minutes the first time `work_elapsed_secs`
    /// reaches `threshold_secs`, and `None` otherwise.
    pub fn observe(&mut self, work_elapsed_secs: u64, threshold_secs: u64) -> Option<u64> {
        if self.nudged || threshold_secs == 0 || work_elapsed_secs < threshold_secs {
            return None;
        }
        self.nudged = true;
        Some(work_elapsed_secs / 60)
    }

    pub fn nudged(&self) -> bool {
        self.nudged
    }

    pub fn reset(&mut self) {
        self.nudged = false;
    }

    pub(crate) fn restore(nudged: bool) -> Self {
        Self { nudged }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_threshold() {
        let mut monitor = OvertimeMonitor::new();
        assert_eq!(monitor.observe(29, 30), None);
        assert_eq!(monitor.observe(30, 30), Some(0));
        assert_eq!(monitor.observe(31, 30), None);
        assert!(monitor.nudged());
    }

    #[test]
    fn reports_whole_minutes() {
        let mut monitor = OvertimeMonitor::new();
        assert_eq!(monitor.observe(45 * 60, 30 * 60), Some(45));
    }

    #[test]
    fn reset_rearms_latch() {
        let mut monitor = OvertimeMonitor::new();
        monitor.observe(30, 30);
        monitor.reset();
        assert_eq!(monitor.observe(30, 30), Some(0));
    }

    #[test]
    fn zero_threshold_never_fires() {
        let mut monitor = OvertimeMonitor::new();
        assert_eq!(monitor.observe(100, 0), None);
    }
}
