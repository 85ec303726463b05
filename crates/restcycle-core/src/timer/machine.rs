//! Break cycle state machine.
//!
//! The machine is heartbeat-driven and owns no threads: the caller invokes
//! [`BreakCycle::tick`] once per second and fires the settle follow-up when
//! [`BreakCycle::follow_up`] asks for it. All mutation happens through the
//! methods below on a single owner.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Work -> (PreBreak) -> Break -> [settle] -> Work -> ...
//! ```
//!
//! `skip_to_next` from `Break` or `PreBreak` goes straight back to `Work`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::configuration::Configuration;
use super::overtime::OvertimeMonitor;
use super::snapshot::CycleSnapshot;
use super::state::{PauseSnapshot, PauseSource, TimerState};
use super::ticker::{FollowUp, TickHandle, Ticker, SETTLE_DELAY};
use crate::effects::{BreakRecord, Collaborators, EffectResult};
use crate::error::Rejection;
use crate::events::{Event, EventBus};
use crate::signals::PauseSchedule;

pub type CycleResult = std::result::Result<(), Rejection>;

pub struct BreakCycle {
    config: Configuration,
    state: TimerState,
    remaining_secs: u64,
    pause: Option<PauseSnapshot>,
    break_count: u32,
    break_elapsed_secs: u64,
    work_elapsed_secs: u64,
    /// Scheduled length of the break in progress.
    break_duration_secs: u64,
    overtime: OvertimeMonitor,
    settling: bool,
    session_id: Option<Uuid>,
    ticker: Ticker,
    schedule: Option<Arc<dyn PauseSchedule>>,
    effects: Collaborators,
    events: EventBus,
}

impl BreakCycle {
    /// Machine in `Idle` with no-op collaborators.
    pub fn new(config: Configuration) -> Self {
        Self::with_effects(config, Collaborators::detached())
    }

    pub fn with_effects(config: Configuration, effects: Collaborators) -> Self {
        Self {
            config,
            state: TimerState::Idle,
            remaining_secs: 0,
            pause: None,
            break_count: 0,
            break_elapsed_secs: 0,
            work_elapsed_secs: 0,
            break_duration_secs: 0,
            overtime: OvertimeMonitor::new(),
            settling: false,
            session_id: None,
            ticker: Ticker::default(),
            schedule: None,
            effects,
            events: EventBus::new(),
        }
    }

    /// Install the schedule consulted at the top of every heartbeat.
    pub fn set_schedule(&mut self, schedule: Arc<dyn PauseSchedule>) {
        self.schedule = Some(schedule);
    }

    pub fn clear_schedule(&mut self) {
        self.schedule = None;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_some()
    }

    pub fn pause_source(&self) -> Option<PauseSource> {
        self.pause.as_ref().map(|p| p.source)
    }

    pub fn paused_state(&self) -> Option<TimerState> {
        self.pause.as_ref().map(|p| p.state)
    }

    pub fn pause_snapshot(&self) -> Option<&PauseSnapshot> {
        self.pause.as_ref()
    }

    pub fn break_count(&self) -> u32 {
        self.break_count
    }

    pub fn break_elapsed_secs(&self) -> u64 {
        self.break_elapsed_secs
    }

    pub fn work_elapsed_secs(&self) -> u64 {
        self.work_elapsed_secs
    }

    pub fn overtime_nudge_shown(&self) -> bool {
        self.overtime.nudged()
    }

    pub fn is_long_break(&self) -> bool {
        self.state == TimerState::Break && self.config.is_long_break(self.break_count)
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn schedule(&self) -> Option<&Arc<dyn PauseSchedule>> {
        self.schedule.as_ref()
    }

    /// Handle of the currently armed countdown.
    pub fn tick_handle(&self) -> TickHandle {
        self.ticker.handle()
    }

    pub fn follow_up(&self) -> Option<FollowUp> {
        self.settling.then_some(FollowUp::Settle {
            delay: SETTLE_DELAY,
        })
    }

    pub fn is_settling(&self) -> bool {
        self.settling
    }

    /// Skip-difficulty gate for the UI. Outside a break skipping is always
    /// allowed.
    pub fn can_skip(&self) -> bool {
        match self.state {
            TimerState::Break if !self.settling => self
                .config
                .skip_difficulty
                .can_skip(self.break_elapsed_secs),
            _ => true,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// A handle on the event bus that outlives borrows of the machine.
    pub fn event_bus(&self) -> EventBus {
        self.events.clone()
    }

    pub fn snapshot(&self) -> CycleSnapshot {
        CycleSnapshot {
            state: self.state,
            remaining_secs: self.remaining_secs,
            pause: self.pause.clone(),
            break_count: self.break_count,
            break_elapsed_secs: self.break_elapsed_secs,
            work_elapsed_secs: self.work_elapsed_secs,
            break_duration_secs: self.break_duration_secs,
            overtime_nudge_shown: self.overtime.nudged(),
            settling: self.settling,
            session_id: self.session_id,
            configuration: self.config.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> CycleResult {
        if self.state != TimerState::Idle {
            return self.reject(Rejection::NotIdle(self.state));
        }
        info!("starting break cycle");
        self.pause = None;
        self.emit(Event::Started { at: Utc::now() });
        self.begin_work(self.config.work_interval_secs, true);
        self.committed();
        Ok(())
    }

    /// Always succeeds. Cancels the countdown and any pending settle, clears
    /// every runtime field and discards the persisted snapshot.
    pub fn stop(&mut self) {
        let was = self.state;
        if matches!(was, TimerState::PreBreak | TimerState::Break) && !self.settling {
            self.effect("hide overlay", self.effects.renderer.hide_overlay());
        }
        self.ticker.rearm();
        self.state = TimerState::Idle;
        self.remaining_secs = 0;
        self.pause = None;
        self.break_count = 0;
        self.break_elapsed_secs = 0;
        self.work_elapsed_secs = 0;
        self.break_duration_secs = 0;
        self.overtime.reset();
        self.settling = false;
        self.session_id = None;
        if let Err(e) = self.effects.store.clear() {
            warn!("failed to clear cycle snapshot: {}", e);
        }
        info!(from = %was, "break cycle stopped");
        self.emit(Event::Stopped { at: Utc::now() });
        self.emit_state_changed();
    }

    /// Freeze the countdown on behalf of `source`.
    pub fn pause(&mut self, source: PauseSource, reason: Option<String>) -> CycleResult {
        if self.state == TimerState::Idle {
            return self.reject(Rejection::NotRunning);
        }
        if let Some(held) = &self.pause {
            return self.reject(Rejection::AlreadyPaused(held.source));
        }
        if self.settling {
            // The break already resolved; pause the work session it leads to.
            self.finish_settle();
        }
        self.ticker.rearm();
        self.pause = Some(PauseSnapshot {
            state: self.state,
            remaining_secs: self.remaining_secs,
            source,
            reason: reason.clone(),
        });
        info!(%source, state = %self.state, remaining = self.remaining_secs, "paused");
        self.emit(Event::Paused {
            source,
            reason,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        });
        self.committed();
        Ok(())
    }

    /// Lift the pause. Only the holder may resume, except `User`, who may
    /// resume anything.
    pub fn resume(&mut self, requester: PauseSource) -> CycleResult {
        let holder = match &self.pause {
            Some(held) => held.source,
            None => return self.reject(Rejection::NotPaused),
        };
        if !requester.may_resume(holder) {
            return self.reject(Rejection::NotOwner { holder, requester });
        }
        if let Some(snapshot) = self.pause.take() {
            self.state = snapshot.state;
            self.remaining_secs = snapshot.remaining_secs;
        }
        self.ticker.rearm();
        info!(%requester, %holder, remaining = self.remaining_secs, "resumed");
        self.emit(Event::Resumed {
            source: requester,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        });
        self.committed();
        Ok(())
    }

    /// `start()` when idle, user-resume when paused, user-pause otherwise.
    pub fn toggle(&mut self) -> CycleResult {
        if self.state == TimerState::Idle {
            self.start()
        } else if self.is_paused() {
            self.resume(PauseSource::User)
        } else {
            self.pause(PauseSource::User, None)
        }
    }

    /// Restart from a fresh work session.
    pub fn reset(&mut self) -> CycleResult {
        self.stop();
        self.start()
    }

    /// User fast-forward. Clears any pause first.
    pub fn skip_to_next(&mut self) -> CycleResult {
        if self.state == TimerState::Idle {
            return self.start();
        }
        if let Some(held) = self.pause.take() {
            debug!(holder = %held.source, "skip clears pause");
        }
        match self.state {
            TimerState::Idle => {}
            TimerState::Work => self.work_finished(),
            TimerState::PreBreak => {
                info!("skipping upcoming break from pre-break");
                self.effect("hide overlay", self.effects.renderer.hide_overlay());
                self.record_break(false, 0, self.break_count + 1);
                self.emit(Event::BreakSkipped {
                    elapsed_secs: 0,
                    at: Utc::now(),
                });
                self.begin_work(self.config.work_interval_secs, false);
            }
            TimerState::Break if self.settling => {
                // Already recorded as completed.
                self.finish_settle();
            }
            TimerState::Break => {
                let elapsed = self.break_elapsed_secs;
                info!(elapsed, "break skipped");
                self.record_break(false, elapsed, self.break_count);
                self.effect("hide overlay", self.effects.renderer.hide_overlay());
                self.emit(Event::BreakSkipped {
                    elapsed_secs: elapsed,
                    at: Utc::now(),
                });
                self.leave_break();
            }
        }
        self.committed();
        Ok(())
    }

    /// Push the break back by `minutes`.
    ///
    /// From `PreBreak` this returns to `Work` with exactly `minutes * 60`
    /// seconds; from `Work` it extends the countdown without resetting
    /// progress.
    pub fn postpone(&mut self, minutes: u64) -> CycleResult {
        if !matches!(self.state, TimerState::Work | TimerState::PreBreak) {
            return self.reject(Rejection::PostponeUnavailable { state: self.state });
        }
        if self.is_paused() {
            return self.reject(Rejection::PausedPostpone);
        }
        if minutes == 0 {
            return self.reject(Rejection::EmptyPostpone);
        }
        let seconds = minutes.saturating_mul(60);
        if self.state == TimerState::PreBreak {
            self.effect("hide overlay", self.effects.renderer.hide_overlay());
            self.state = TimerState::Work;
            self.remaining_secs = seconds;
        } else {
            self.remaining_secs = self.remaining_secs.saturating_add(seconds);
        }
        self.ticker.rearm();
        info!(minutes, remaining = self.remaining_secs, "break postponed");
        self.emit(Event::Postponed {
            seconds,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        });
        self.committed();
        Ok(())
    }

    /// Count a long absence as a completed break and start a fresh work
    /// session.
    ///
    /// Consumes the pause held by `requester` (subject to the usual owner
    /// check). `break_count` advances as for a natural break so the
    /// long-break cadence carries on.
    pub fn credit_absence(&mut self, requester: PauseSource, away_secs: u64) -> CycleResult {
        let holder = match &self.pause {
            Some(held) => held.source,
            None => return self.reject(Rejection::NotPaused),
        };
        if !requester.may_resume(holder) {
            return self.reject(Rejection::NotOwner { holder, requester });
        }
        let paused_state = self.pause.take().map_or(self.state, |held| held.state);
        self.state = paused_state;
        if paused_state != TimerState::Break {
            self.break_count += 1;
        }
        if matches!(paused_state, TimerState::PreBreak | TimerState::Break) {
            self.effect("hide overlay", self.effects.renderer.hide_overlay());
        }
        info!(away_secs, break_count = self.break_count, "absence counted as a break");
        self.record_break(true, away_secs, self.break_count);
        self.emit(Event::BreakCompleted {
            duration_secs: away_secs,
            at: Utc::now(),
        });
        self.leave_break();
        self.committed();
        Ok(())
    }

    /// Swap the configuration. A running cycle is stopped rather than
    /// altered mid-countdown. Returns whether anything changed.
    pub fn apply_configuration(&mut self, config: Configuration) -> bool {
        if config == self.config {
            return false;
        }
        self.config = config;
        if self.state != TimerState::Idle {
            info!("configuration changed while running, stopping cycle");
            self.stop();
        }
        self.emit(Event::ConfigurationChanged { at: Utc::now() });
        true
    }

    /// Rebuild runtime state from a persisted snapshot.
    ///
    /// Only applies to an idle machine and only when the snapshot was taken
    /// under the current configuration; otherwise the snapshot is discarded.
    pub fn recover(&mut self, snapshot: CycleSnapshot) -> bool {
        if self.state != TimerState::Idle {
            warn!("refusing to recover over a running cycle");
            return false;
        }
        if snapshot.configuration != self.config || snapshot.state == TimerState::Idle {
            debug!("discarding stale cycle snapshot");
            if let Err(e) = self.effects.store.clear() {
                warn!("failed to clear cycle snapshot: {}", e);
            }
            return false;
        }
        self.state = snapshot.state;
        self.remaining_secs = snapshot.remaining_secs;
        self.pause = snapshot.pause;
        self.break_count = snapshot.break_count;
        self.break_elapsed_secs = snapshot.break_elapsed_secs;
        self.work_elapsed_secs = snapshot.work_elapsed_secs;
        self.break_duration_secs = snapshot.break_duration_secs;
        self.overtime = OvertimeMonitor::restore(snapshot.overtime_nudge_shown);
        self.session_id = snapshot.session_id;
        self.settling = false;
        self.ticker.rearm();
        info!(state = %self.state, remaining = self.remaining_secs, "recovered break cycle");
        self.emit(Event::Recovered { at: Utc::now() });

        if snapshot.settling {
            self.leave_break();
        } else if !self.is_paused() {
            match self.state {
                TimerState::PreBreak => {
                    let result = self.effects.renderer.show_pre_break(self.remaining_secs);
                    self.effect("show pre-break", result);
                }
                TimerState::Break => {
                    let result = self.effects.renderer.show_break(self.remaining_secs);
                    self.effect("show break", result);
                }
                TimerState::Idle | TimerState::Work => {}
            }
        }
        self.committed();
        true
    }

    // ── Heartbeat ────────────────────────────────────────────────────

    /// One-second heartbeat against the current handle.
    pub fn tick(&mut self) {
        let handle = self.ticker.handle();
        self.tick_with(handle);
    }

    /// One-second heartbeat. Heartbeats carrying a stale handle are dropped.
    pub fn tick_with(&mut self, handle: TickHandle) {
        if !self.ticker.accepts(handle) {
            debug!(generation = handle.generation(), "dropping stale tick");
            return;
        }
        if self.state == TimerState::Idle {
            return;
        }
        if self.settling {
            self.finish_settle();
            return;
        }
        if let Some(held) = &self.pause {
            let (source, paused_state) = (held.source, held.state);
            self.paused_tick(source, paused_state);
            return;
        }

        if self.state == TimerState::Work {
            if let Some(signal) = self.schedule.as_ref().map(|s| s.signal()) {
                if signal.should_pause {
                    let _ = self.pause(PauseSource::WorkHours, signal.reason);
                    return;
                }
            }
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        match self.state {
            TimerState::Work => {
                self.work_elapsed_secs += 1;
                self.check_overtime();
            }
            TimerState::Break => self.break_elapsed_secs += 1,
            TimerState::PreBreak | TimerState::Idle => {}
        }

        if self.remaining_secs == 0 {
            self.countdown_finished();
        }
    }

    /// Complete the settle window and enter work. Returns whether a settle
    /// was pending.
    pub fn finish_settle(&mut self) -> bool {
        if !self.settling {
            return false;
        }
        self.settling = false;
        self.leave_break();
        self.committed();
        true
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn paused_tick(&mut self, source: PauseSource, paused_state: TimerState) {
        if source == PauseSource::WorkHours {
            let cleared = self.schedule.as_ref().is_some_and(|s| !s.should_pause());
            if cleared {
                info!("work-hours pause cleared");
                let _ = self.resume(PauseSource::WorkHours);
                return;
            }
        }
        if self.config.overtime_while_paused && paused_state == TimerState::Work {
            self.work_elapsed_secs += 1;
            self.check_overtime();
        }
    }

    fn countdown_finished(&mut self) {
        match self.state {
            TimerState::Work => self.work_finished(),
            TimerState::PreBreak => self.enter_break(),
            TimerState::Break => self.break_completed(),
            TimerState::Idle => {}
        }
        self.committed();
    }

    fn work_finished(&mut self) {
        if self.config.pre_break_enabled() {
            self.enter_pre_break();
        } else {
            self.enter_break();
        }
    }

    fn begin_work(&mut self, seconds: u64, fresh_session: bool) {
        self.state = TimerState::Work;
        self.remaining_secs = seconds;
        self.break_duration_secs = 0;
        if fresh_session {
            self.work_elapsed_secs = 0;
            self.overtime.reset();
            self.session_id = Some(Uuid::new_v4());
        }
        self.ticker.rearm();
        debug!(seconds, fresh_session, "work started");
        self.emit(Event::WorkStarted {
            seconds,
            at: Utc::now(),
        });
    }

    /// Break is over (skipped or settled): notify and start a full session.
    fn leave_break(&mut self) {
        self.effect("break end notification", self.effects.notifier.send_break_end());
        self.break_elapsed_secs = 0;
        self.begin_work(self.config.work_interval_secs, true);
    }

    fn enter_pre_break(&mut self) {
        let seconds = self.config.pre_break_secs;
        self.state = TimerState::PreBreak;
        self.remaining_secs = seconds;
        self.ticker.rearm();
        info!(seconds, "pre-break warning");
        self.effect("show pre-break", self.effects.renderer.show_pre_break(seconds));
        self.effect("pre-break notification", self.effects.notifier.send_pre_break(seconds));
        self.emit(Event::PreBreakStarted {
            seconds,
            at: Utc::now(),
        });
    }

    fn enter_break(&mut self) {
        self.break_count += 1;
        self.break_elapsed_secs = 0;
        self.work_elapsed_secs = 0;
        self.overtime.reset();

        let long_break = self.config.is_long_break(self.break_count);
        let duration = self.config.break_duration_for(self.break_count);
        self.state = TimerState::Break;
        self.remaining_secs = duration;
        self.break_duration_secs = duration;
        self.ticker.rearm();
        info!(duration, long_break, break_count = self.break_count, "break started");

        self.effect("break start sound", self.effects.sound.play_break_start());
        self.effect("show break", self.effects.renderer.show_break(duration));
        self.effect(
            "break start notification",
            self.effects.notifier.send_break_start(duration, long_break),
        );
        if self.config.lock_screen_on_break {
            self.effect("screen lock", self.effects.screen_lock.lock_screen());
        }
        self.emit(Event::BreakStarted {
            duration_secs: duration,
            long_break,
            break_count: self.break_count,
            at: Utc::now(),
        });
    }

    /// Natural completion: record, sound, hide, then settle before work.
    fn break_completed(&mut self) {
        let elapsed = self.break_elapsed_secs;
        info!(elapsed, "break completed");
        self.record_break(true, elapsed, self.break_count);
        self.effect("break end sound", self.effects.sound.play_break_end());
        self.effect("hide overlay", self.effects.renderer.hide_overlay());
        self.settling = true;
        self.ticker.rearm();
        self.emit(Event::BreakCompleted {
            duration_secs: self.break_duration_secs,
            at: Utc::now(),
        });
    }

    fn record_break(&self, completed: bool, duration_secs: u64, break_count: u32) {
        let record = BreakRecord {
            completed,
            duration_secs,
            break_count,
            long_break: self.config.is_long_break(break_count),
            session_id: self.session_id,
            at: Utc::now(),
        };
        self.effect("adherence record", self.effects.adherence.record_break(record));
    }

    fn check_overtime(&mut self) {
        if !self.config.overtime_enabled {
            return;
        }
        let threshold = self.config.overtime_threshold_secs();
        if let Some(minutes) = self.overtime.observe(self.work_elapsed_secs, threshold) {
            info!(elapsed_minutes = minutes, "overtime nudge");
            self.effect("overtime nudge", self.effects.renderer.show_overtime_nudge(minutes));
            self.effect("overtime notification", self.effects.notifier.send_overtime(minutes));
            self.emit(Event::OvertimeNudge {
                elapsed_minutes: minutes,
                at: Utc::now(),
            });
        }
    }

    /// Persist and announce the state after a transition.
    fn committed(&self) {
        if let Err(e) = self.effects.store.save(&self.snapshot()) {
            warn!("failed to persist cycle snapshot: {}", e);
        }
        self.emit_state_changed();
    }

    fn emit_state_changed(&self) {
        self.emit(Event::StateChanged {
            snapshot: Box::new(self.snapshot()),
            at: Utc::now(),
        });
    }

    fn emit(&self, event: Event) {
        self.events.emit(event);
    }

    fn effect(&self, what: &str, result: EffectResult) {
        if let Err(e) = result {
            warn!("{} failed: {}", what, e);
        }
    }

    fn reject(&self, rejection: Rejection) -> CycleResult {
        warn!(state = %self.state, "ignored: {}", rejection);
        Err(rejection)
    }
}

impl std::fmt::Debug for BreakCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakCycle")
            .field("state", &self.state)
            .field("remaining_secs", &self.remaining_secs)
            .field("pause", &self.pause)
            .field("break_count", &self.break_count)
            .field("settling", &self.settling)
            .finish_non_exhaustive()
    }
}
