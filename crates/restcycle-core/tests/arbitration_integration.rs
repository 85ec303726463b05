//! Integration tests for pause arbitration.
//!
//! Several monitors and the user compete for one pause. Whoever paused first
//! owns it; only the owner or the user may lift it.

use std::sync::Arc;

use restcycle_core::effects::RecordingEffects;
use restcycle_core::{
    ArbiterPolicy, BreakCycle, Collaborators, Configuration, IdleSignal, PauseArbiter,
    PauseSource, PowerEvent, Rejection, SmartPauseSignal, TimerState, Verdict, WorkHours,
    WorkHoursSignal,
};

fn running(work: u64) -> BreakCycle {
    let mut cycle = BreakCycle::new(Configuration::with_durations(work, 5, 20));
    cycle.start().unwrap();
    cycle
}

#[test]
fn test_first_pause_wins() {
    let arbiter = PauseArbiter::default();
    let mut cycle = running(60);

    assert_eq!(
        arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::active("meeting")),
        Verdict::Paused(PauseSource::SmartPause)
    );
    // Idle and sleep arrive while the meeting pause is held.
    assert_eq!(
        arbiter.on_idle(&mut cycle, IdleSignal::idle(300)),
        Verdict::Ignored
    );
    assert_eq!(
        arbiter.on_power(&mut cycle, PowerEvent::Sleep),
        Verdict::Ignored
    );
    assert_eq!(cycle.pause_source(), Some(PauseSource::SmartPause));
}

#[test]
fn test_only_owner_or_user_resumes() {
    let mut cycle = running(60);
    cycle
        .pause(PauseSource::Idle, Some("inactive".into()))
        .unwrap();

    for foreign in [
        PauseSource::SmartPause,
        PauseSource::WorkHours,
        PauseSource::System,
    ] {
        assert_eq!(
            cycle.resume(foreign),
            Err(Rejection::NotOwner {
                holder: PauseSource::Idle,
                requester: foreign,
            })
        );
        assert!(cycle.is_paused());
    }

    cycle.resume(PauseSource::User).unwrap();
    assert!(!cycle.is_paused());
    assert_eq!(cycle.pause_source(), None);
}

#[test]
fn test_wake_does_not_lift_meeting_pause() {
    let arbiter = PauseArbiter::default();
    let mut cycle = running(60);
    arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::active("fullscreen"));

    assert_eq!(
        arbiter.on_power(&mut cycle, PowerEvent::Wake),
        Verdict::Ignored
    );
    assert_eq!(
        arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::cleared()),
        Verdict::Resumed(PauseSource::SmartPause)
    );
}

#[test]
fn test_sleep_wake_round_trip_preserves_countdown() {
    let arbiter = PauseArbiter::default();
    let mut cycle = running(60);
    for _ in 0..12 {
        cycle.tick();
    }

    assert_eq!(
        arbiter.on_power(&mut cycle, PowerEvent::Sleep),
        Verdict::Paused(PauseSource::System)
    );
    for _ in 0..600 {
        cycle.tick();
    }
    assert_eq!(
        arbiter.on_power(&mut cycle, PowerEvent::Wake),
        Verdict::Resumed(PauseSource::System)
    );
    assert_eq!(cycle.state(), TimerState::Work);
    assert_eq!(cycle.remaining_secs(), 48);
}

#[test]
fn test_user_overrides_any_monitor() {
    let arbiter = PauseArbiter::default();
    let mut cycle = running(60);
    arbiter.on_work_hours(
        &mut cycle,
        &WorkHoursSignal {
            should_pause: true,
            reason: Some("outside work hours".into()),
        },
    );
    assert_eq!(cycle.pause_source(), Some(PauseSource::WorkHours));

    assert_eq!(
        arbiter.user_resume(&mut cycle),
        Verdict::Resumed(PauseSource::User)
    );
    assert!(!cycle.is_paused());
}

#[test]
fn test_user_pause_survives_monitor_clears() {
    let arbiter = PauseArbiter::default();
    let mut cycle = running(60);
    arbiter.user_pause(&mut cycle);

    arbiter.on_idle(&mut cycle, IdleSignal::returned(10));
    arbiter.on_smart_pause(&mut cycle, &SmartPauseSignal::cleared());
    arbiter.on_work_hours(&mut cycle, &WorkHoursSignal::default());
    arbiter.on_power(&mut cycle, PowerEvent::Wake);

    assert_eq!(cycle.pause_source(), Some(PauseSource::User));
}

#[test]
fn test_disabled_monitor_is_ignored() {
    let arbiter = PauseArbiter::new(ArbiterPolicy {
        idle_enabled: false,
        ..ArbiterPolicy::default()
    });
    let mut cycle = running(60);
    assert_eq!(
        arbiter.on_idle(&mut cycle, IdleSignal::idle(900)),
        Verdict::Ignored
    );
    assert!(!cycle.is_paused());
}

#[test]
fn test_long_absence_restarts_session() {
    let arbiter = PauseArbiter::default();
    let recorder = RecordingEffects::new();
    let mut cycle = BreakCycle::with_effects(
        Configuration::with_durations(60, 5, 20),
        Collaborators::recording(&recorder),
    );
    cycle.start().unwrap();
    // One natural round: 60 work, 5 pre-break, 20 break.
    for _ in 0..85 {
        cycle.tick();
        cycle.finish_settle();
    }
    assert_eq!(cycle.state(), TimerState::Work);
    assert_eq!(cycle.break_count(), 1);
    for _ in 0..40 {
        cycle.tick();
    }
    assert_eq!(
        arbiter.on_idle(&mut cycle, IdleSignal::idle(300)),
        Verdict::Paused(PauseSource::Idle)
    );

    assert_eq!(
        arbiter.on_idle(&mut cycle, IdleSignal::returned(25)),
        Verdict::BreakCredited
    );
    assert_eq!(cycle.state(), TimerState::Work);
    assert_eq!(cycle.remaining_secs(), 60);
    assert_eq!(cycle.work_elapsed_secs(), 0);
    assert!(!cycle.is_paused());

    // The absence counts as the second break, not a restart of the cadence.
    assert_eq!(cycle.break_count(), 2);
    let records = recorder.break_records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.completed));
    assert_eq!(records[1].duration_secs, 25);
    assert_eq!(records[1].break_count, 2);
}

#[test]
fn test_short_inactivity_does_not_pause() {
    let arbiter = PauseArbiter::new(ArbiterPolicy {
        idle_threshold_secs: 180,
        ..ArbiterPolicy::default()
    });
    let mut cycle = running(60);
    assert_eq!(
        arbiter.on_idle(&mut cycle, IdleSignal::idle(60)),
        Verdict::Ignored
    );
    cycle.tick();
    assert_eq!(cycle.remaining_secs(), 59);
    assert!(!cycle.is_paused());
}

#[test]
fn test_work_hours_schedule_on_the_machine() {
    // Equal start and end hours cover the whole day, so only the weekday
    // list decides. An empty list pauses every day.
    let hours = WorkHours {
        enabled: true,
        start_hour: 0,
        end_hour: 0,
        days: Vec::new(),
    };
    let mut cycle = running(60);
    cycle.set_schedule(Arc::new(hours));
    cycle.tick();

    assert_eq!(cycle.pause_source(), Some(PauseSource::WorkHours));
    assert_eq!(
        cycle.pause_snapshot().and_then(|p| p.reason.clone()).as_deref(),
        Some("outside work hours (00:00-00:00)")
    );
    assert_eq!(cycle.remaining_secs(), 60);
}
