//! Pause arbitration.
//!
//! Every monitor feeds its signal through the [`PauseArbiter`], which decides
//! whether the break cycle should pause or resume and tags the request with
//! the right [`PauseSource`]. The machine itself refuses a resume from
//! anyone but the holder, so the arbiter only has to decide *when* to ask.
//!
//! ## Sources
//!
//! - **Idle**: pauses work once inactivity reaches the policy threshold,
//!   resumes on return only if it holds the pause. An absence as long as the
//!   upcoming break counts as that break and starts a fresh session.
//! - **Smart pause**: pauses work during meetings/fullscreen, resumes only a
//!   pause it holds over work.
//! - **Work hours**: pauses work outside configured hours.
//! - **System**: pauses on sleep, resumes on wake only if it holds the pause.
//! - **User**: always permitted.
//!
//! When two signals race, the first `pause` wins and the second is rejected
//! as already paused.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Rejection;
use crate::signals::{IdleSignal, PowerEvent, SmartPauseSignal, WorkHoursSignal};
use crate::timer::{BreakCycle, CycleResult, PauseSource, TimerState};

/// Inactivity needed before the idle monitor may pause.
pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 5 * 60;

/// Which monitors are allowed to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterPolicy {
    pub idle_enabled: bool,
    /// Idle signals reporting less inactivity than this are ignored.
    pub idle_threshold_secs: u64,
    pub smart_pause_enabled: bool,
    pub work_hours_enabled: bool,
    pub system_enabled: bool,
}

impl Default for ArbiterPolicy {
    fn default() -> Self {
        Self {
            idle_enabled: true,
            idle_threshold_secs: DEFAULT_IDLE_THRESHOLD_SECS,
            smart_pause_enabled: true,
            work_hours_enabled: true,
            system_enabled: true,
        }
    }
}

/// What the arbiter did with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Paused(PauseSource),
    Resumed(PauseSource),
    /// Absence counted as a completed break; a fresh work session started.
    BreakCredited,
    /// Nothing to do for this signal in the current state.
    Ignored,
    /// The machine refused the request.
    Rejected(Rejection),
}

impl Verdict {
    fn from_pause(result: CycleResult, source: PauseSource) -> Self {
        match result {
            Ok(()) => Verdict::Paused(source),
            Err(rejection) => Verdict::Rejected(rejection),
        }
    }

    fn from_resume(result: CycleResult, source: PauseSource) -> Self {
        match result {
            Ok(()) => Verdict::Resumed(source),
            Err(rejection) => Verdict::Rejected(rejection),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PauseArbiter {
    policy: ArbiterPolicy,
}

impl PauseArbiter {
    pub fn new(policy: ArbiterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ArbiterPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ArbiterPolicy) {
        self.policy = policy;
    }

    pub fn on_idle(&self, cycle: &mut BreakCycle, signal: IdleSignal) -> Verdict {
        if !self.policy.idle_enabled {
            return Verdict::Ignored;
        }
        if signal.is_idle {
            // Being away during a break is the point of the break.
            if !matches!(cycle.state(), TimerState::Work | TimerState::PreBreak)
                || cycle.is_paused()
            {
                return Verdict::Ignored;
            }
            if signal.idle_secs < self.policy.idle_threshold_secs {
                debug!(idle_secs = signal.idle_secs, "below idle threshold");
                return Verdict::Ignored;
            }
            let reason = Some(format!("inactive for {}s", signal.idle_secs));
            return Verdict::from_pause(cycle.pause(PauseSource::Idle, reason), PauseSource::Idle);
        }

        if cycle.pause_source() != Some(PauseSource::Idle) {
            return Verdict::Ignored;
        }
        let upcoming = cycle
            .configuration()
            .break_duration_for(cycle.break_count() + 1);
        if signal.idle_secs >= upcoming {
            debug!(idle_secs = signal.idle_secs, "absence covered a full break");
            return match cycle.credit_absence(PauseSource::Idle, signal.idle_secs) {
                Ok(()) => Verdict::BreakCredited,
                Err(rejection) => Verdict::Rejected(rejection),
            };
        }
        Verdict::from_resume(cycle.resume(PauseSource::Idle), PauseSource::Idle)
    }

    pub fn on_smart_pause(&self, cycle: &mut BreakCycle, signal: &SmartPauseSignal) -> Verdict {
        if !self.policy.smart_pause_enabled {
            return Verdict::Ignored;
        }
        if signal.should_pause {
            if cycle.state() != TimerState::Work || cycle.is_paused() {
                return Verdict::Ignored;
            }
            return Verdict::from_pause(
                cycle.pause(
                    PauseSource::SmartPause,
                    signal.active_signal_description.clone(),
                ),
                PauseSource::SmartPause,
            );
        }

        let ours = cycle.pause_source() == Some(PauseSource::SmartPause)
            && cycle.paused_state() == Some(TimerState::Work);
        if !ours {
            return Verdict::Ignored;
        }
        Verdict::from_resume(
            cycle.resume(PauseSource::SmartPause),
            PauseSource::SmartPause,
        )
    }

    /// Independent work-hours poll, on top of the per-heartbeat check the
    /// machine already performs.
    pub fn on_work_hours(&self, cycle: &mut BreakCycle, signal: &WorkHoursSignal) -> Verdict {
        if !self.policy.work_hours_enabled {
            return Verdict::Ignored;
        }
        if signal.should_pause {
            if cycle.state() != TimerState::Work || cycle.is_paused() {
                return Verdict::Ignored;
            }
            return Verdict::from_pause(
                cycle.pause(PauseSource::WorkHours, signal.reason.clone()),
                PauseSource::WorkHours,
            );
        }
        if cycle.pause_source() != Some(PauseSource::WorkHours) {
            return Verdict::Ignored;
        }
        Verdict::from_resume(cycle.resume(PauseSource::WorkHours), PauseSource::WorkHours)
    }

    pub fn on_power(&self, cycle: &mut BreakCycle, event: PowerEvent) -> Verdict {
        if !self.policy.system_enabled {
            return Verdict::Ignored;
        }
        match event {
            PowerEvent::Sleep => {
                if !cycle.state().is_running() || cycle.is_paused() {
                    return Verdict::Ignored;
                }
                Verdict::from_pause(
                    cycle.pause(PauseSource::System, Some("system sleep".into())),
                    PauseSource::System,
                )
            }
            PowerEvent::Wake => {
                // Never override somebody else's pause on wake.
                if cycle.pause_source() != Some(PauseSource::System) {
                    return Verdict::Ignored;
                }
                Verdict::from_resume(cycle.resume(PauseSource::System), PauseSource::System)
            }
        }
    }

    pub fn user_pause(&self, cycle: &mut BreakCycle) -> Verdict {
        Verdict::from_pause(cycle.pause(PauseSource::User, None), PauseSource::User)
    }

    pub fn user_resume(&self, cycle: &mut BreakCycle) -> Verdict {
        Verdict::from_resume(cycle.resume(PauseSource::User), PauseSource::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{Collaborators, RecordingEffects};
    use crate::timer::Configuration;

    fn running() -> BreakCycle {
        let mut cycle = BreakCycle::new(Configuration::with_durations(60, 5, 20));
        cycle.start().unwrap();
        cycle
    }

    #[test]
    fn idle_pauses_and_resumes_own_pause() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::idle(300)),
            Verdict::Paused(PauseSource::Idle)
        );
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::returned(10)),
            Verdict::Resumed(PauseSource::Idle)
        );
        assert!(!cycle.is_paused());
    }

    #[test]
    fn idle_return_after_full_break_counts_as_break() {
        let arbiter = PauseArbiter::default();
        let recorder = RecordingEffects::new();
        let mut cycle = BreakCycle::with_effects(
            Configuration::with_durations(60, 5, 20),
            Collaborators::recording(&recorder),
        );
        cycle.start().unwrap();
        cycle.tick();
        arbiter.on_idle(&mut cycle, IdleSignal::idle(300));
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::returned(20)),
            Verdict::BreakCredited
        );
        assert_eq!(cycle.state(), TimerState::Work);
        assert_eq!(cycle.remaining_secs(), 60);
        assert!(!cycle.is_paused());
        assert_eq!(cycle.break_count(), 1);
        let records = recorder.break_records();
        assert_eq!(records.len(), 1);
        assert!(records[0].completed);
        assert_eq!(records[0].duration_secs, 20);
    }

    #[test]
    fn idle_below_threshold_is_ignored() {
        let arbiter = PauseArbiter::new(ArbiterPolicy {
            idle_threshold_secs: 120,
            ..ArbiterPolicy::default()
        });
        let mut cycle = running();
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::idle(119)),
            Verdict::Ignored
        );
        assert!(!cycle.is_paused());
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::idle(120)),
            Verdict::Paused(PauseSource::Idle)
        );
    }

    #[test]
    fn default_idle_threshold_ignores_short_inactivity() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::idle(DEFAULT_IDLE_THRESHOLD_SECS - 1)),
            Verdict::Ignored
        );
    }

    #[test]
    fn idle_return_does_not_lift_user_pause() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        arbiter.user_pause(&mut cycle);
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::returned(5)),
            Verdict::Ignored
        );
        assert_eq!(cycle.pause_source(), Some(PauseSource::User));
    }

    #[test]
    fn idle_during_break_is_ignored() {
        let arbiter = PauseArbiter::default();
        let mut cycle = BreakCycle::new(Configuration::with_durations(1, 0, 20));
        cycle.start().unwrap();
        cycle.tick();
        assert_eq!(cycle.state(), TimerState::Break);
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::idle(300)),
            Verdict::Ignored
        );
    }

    #[test]
    fn smart_pause_only_pauses_work() {
        let arbiter = PauseArbiter::default();
        let mut cycle = BreakCycle::new(Configuration::with_durations(1, 5, 20));
        cycle.start().unwrap();
        cycle.tick();
        assert_eq!(cycle.state(), TimerState::PreBreak);
        assert_eq!(
            arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::active("Zoom")),
            Verdict::Ignored
        );
    }

    #[test]
    fn smart_pause_clear_never_resumes_user_pause() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        arbiter.user_pause(&mut cycle);
        assert_eq!(
            arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::cleared()),
            Verdict::Ignored
        );
        assert!(cycle.is_paused());
    }

    #[test]
    fn smart_pause_records_description() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::active("Meeting: standup"));
        assert_eq!(
            cycle.pause_snapshot().unwrap().reason.as_deref(),
            Some("Meeting: standup")
        );
        assert_eq!(
            arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::cleared()),
            Verdict::Resumed(PauseSource::SmartPause)
        );
    }

    #[test]
    fn wake_does_not_override_meeting_pause() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::active("Zoom"));
        assert_eq!(
            arbiter.on_power(&mut cycle, PowerEvent::Sleep),
            Verdict::Ignored
        );
        assert_eq!(
            arbiter.on_power(&mut cycle, PowerEvent::Wake),
            Verdict::Ignored
        );
        assert_eq!(cycle.pause_source(), Some(PauseSource::SmartPause));
    }

    #[test]
    fn sleep_and_wake_round_trip() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        assert_eq!(
            arbiter.on_power(&mut cycle, PowerEvent::Sleep),
            Verdict::Paused(PauseSource::System)
        );
        assert_eq!(
            arbiter.on_power(&mut cycle, PowerEvent::Wake),
            Verdict::Resumed(PauseSource::System)
        );
    }

    #[test]
    fn sleep_when_idle_is_ignored() {
        let arbiter = PauseArbiter::default();
        let mut cycle = BreakCycle::new(Configuration::default());
        assert_eq!(
            arbiter.on_power(&mut cycle, PowerEvent::Sleep),
            Verdict::Ignored
        );
    }

    #[test]
    fn user_resume_overrides_any_source() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        arbiter.on_power(&mut cycle, PowerEvent::Sleep);
        assert_eq!(
            arbiter.user_resume(&mut cycle),
            Verdict::Resumed(PauseSource::User)
        );
    }

    #[test]
    fn work_hours_poll_resumes_only_own_pause() {
        let arbiter = PauseArbiter::default();
        let mut cycle = running();
        let outside = WorkHoursSignal {
            should_pause: true,
            reason: Some("after hours".into()),
        };
        assert_eq!(
            arbiter.on_work_hours(&mut cycle, &outside),
            Verdict::Paused(PauseSource::WorkHours)
        );
        assert_eq!(
            arbiter.on_work_hours(&mut cycle, &WorkHoursSignal::default()),
            Verdict::Resumed(PauseSource::WorkHours)
        );

        arbiter.user_pause(&mut cycle);
        assert_eq!(
            arbiter.on_work_hours(&mut cycle, &WorkHoursSignal::default()),
            Verdict::Ignored
        );
    }

    #[test]
    fn disabled_monitor_is_ignored() {
        let arbiter = PauseArbiter::new(ArbiterPolicy {
            idle_enabled: false,
            ..ArbiterPolicy::default()
        });
        let mut cycle = running();
        assert_eq!(
            arbiter.on_idle(&mut cycle, IdleSignal::idle(600)),
            Verdict::Ignored
        );
        assert!(!cycle.is_paused());
    }
}
