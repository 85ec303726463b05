//! Async driver that owns the break cycle on a single task.
//!
//! The driver is the only place that mutates the [`BreakCycle`]. Everything
//! else talks to it through a [`DriverHandle`]: commands go in over an
//! `mpsc` channel, events come out over the machine's broadcast bus.
//!
//! One `select!` loop multiplexes:
//! - the 1 s heartbeat, reset whenever the machine re-arms its countdown
//! - the settle follow-up after a completed break
//! - a 30 s work-hours poll
//! - incoming commands

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::arbiter::{ArbiterPolicy, PauseArbiter, Verdict};
use crate::events::{Event, EventBus};
use crate::signals::{IdleSignal, PowerEvent, SmartPauseSignal, WorkHoursSignal};
use crate::timer::{BreakCycle, Configuration, CycleSnapshot, FollowUp, TickHandle};

pub const HEARTBEAT: Duration = Duration::from_secs(1);
pub const WORK_HOURS_POLL: Duration = Duration::from_secs(30);
const COMMAND_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum Command {
    Start,
    Stop,
    /// User pause.
    Pause,
    /// User resume, which lifts any pause.
    Resume,
    Toggle,
    Reset,
    /// Skip ahead. With `enforce_difficulty` a skip the difficulty gate
    /// forbids is dropped.
    Skip {
        enforce_difficulty: bool,
    },
    Postpone {
        minutes: u64,
    },
    Idle(IdleSignal),
    SmartPause(SmartPauseSignal),
    WorkHours(WorkHoursSignal),
    Power(PowerEvent),
    Configure(Configuration),
    Policy(ArbiterPolicy),
    Snapshot(oneshot::Sender<CycleSnapshot>),
    Shutdown,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cycle driver has shut down")]
pub struct DriverClosed;

/// Cloneable front end for a running [`CycleDriver`].
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<Command>,
    events: EventBus,
}

impl DriverHandle {
    pub async fn send(&self, command: Command) -> Result<(), DriverClosed> {
        self.tx.send(command).await.map_err(|_| DriverClosed)
    }

    pub async fn snapshot(&self) -> Result<CycleSnapshot, DriverClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| DriverClosed)
    }

    pub async fn shutdown(&self) -> Result<(), DriverClosed> {
        self.send(Command::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

pub struct CycleDriver {
    cycle: BreakCycle,
    arbiter: PauseArbiter,
    commands: mpsc::Receiver<Command>,
}

impl CycleDriver {
    pub fn new(cycle: BreakCycle, arbiter: PauseArbiter) -> (Self, DriverHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let handle = DriverHandle {
            tx,
            events: cycle.event_bus(),
        };
        (
            Self {
                cycle,
                arbiter,
                commands,
            },
            handle,
        )
    }

    /// Run until `Shutdown` or until every handle is dropped, then hand the
    /// machine back.
    pub async fn run(mut self) -> BreakCycle {
        let mut heartbeat = interval_at(Instant::now() + HEARTBEAT, HEARTBEAT);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut work_hours = interval_at(Instant::now() + WORK_HOURS_POLL, WORK_HOURS_POLL);
        work_hours.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let settle = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(settle);
        let mut settle_pending = false;
        let mut armed: TickHandle = self.cycle.tick_handle();

        info!("cycle driver running");
        loop {
            let current = self.cycle.tick_handle();
            if current != armed {
                // The countdown was re-armed; restart the second from now.
                armed = current;
                heartbeat.reset();
            }
            match self.cycle.follow_up() {
                Some(FollowUp::Settle { delay }) if !settle_pending => {
                    settle.as_mut().reset(Instant::now() + delay);
                    settle_pending = true;
                }
                Some(_) => {}
                None => settle_pending = false,
            }
            let running = self.cycle.state().is_running();

            tokio::select! {
                _ = heartbeat.tick(), if running => {
                    self.cycle.tick_with(armed);
                }
                () = &mut settle, if settle_pending => {
                    settle_pending = false;
                    self.cycle.finish_settle();
                }
                _ = work_hours.tick() => self.poll_work_hours(),
                command = self.commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle(command),
                },
            }
        }
        info!("cycle driver stopped");
        self.cycle
    }

    fn poll_work_hours(&mut self) {
        if let Some(signal) = self.cycle.schedule().map(|s| s.signal()) {
            let verdict = self.arbiter.on_work_hours(&mut self.cycle, &signal);
            log_verdict("work hours", verdict);
        }
    }

    fn handle(&mut self, command: Command) {
        debug!(?command, "command");
        dispatch(&mut self.cycle, &mut self.arbiter, command);
    }
}

/// Apply one command to the machine. `Shutdown` is a no-op here; the driver
/// loop handles it.
pub fn dispatch(cycle: &mut BreakCycle, arbiter: &mut PauseArbiter, command: Command) {
    match command {
        Command::Start => {
            let _ = cycle.start();
        }
        Command::Stop => cycle.stop(),
        Command::Pause => log_verdict("user", arbiter.user_pause(cycle)),
        Command::Resume => log_verdict("user", arbiter.user_resume(cycle)),
        Command::Toggle => {
            let _ = cycle.toggle();
        }
        Command::Reset => {
            let _ = cycle.reset();
        }
        Command::Skip { enforce_difficulty } => {
            if enforce_difficulty && !cycle.can_skip() {
                warn!(
                    elapsed = cycle.break_elapsed_secs(),
                    difficulty = ?cycle.configuration().skip_difficulty,
                    "skip not allowed yet"
                );
            } else {
                let _ = cycle.skip_to_next();
            }
        }
        Command::Postpone { minutes } => {
            let _ = cycle.postpone(minutes);
        }
        Command::Idle(signal) => log_verdict("idle", arbiter.on_idle(cycle, signal)),
        Command::SmartPause(signal) => {
            log_verdict("smart pause", arbiter.on_smart_pause(cycle, &signal))
        }
        Command::WorkHours(signal) => {
            log_verdict("work hours", arbiter.on_work_hours(cycle, &signal))
        }
        Command::Power(event) => log_verdict("power", arbiter.on_power(cycle, event)),
        Command::Configure(config) => {
            cycle.apply_configuration(config);
        }
        Command::Policy(policy) => arbiter.set_policy(policy),
        Command::Snapshot(reply) => {
            // The requester may have given up waiting.
            let _ = reply.send(cycle.snapshot());
        }
        Command::Shutdown => {}
    }
}

fn log_verdict(monitor: &str, verdict: Verdict) {
    match verdict {
        Verdict::Ignored => {}
        other => debug!(monitor, verdict = ?other, "arbiter verdict"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{PauseSource, SkipDifficulty, TimerState};
    use tokio::time::sleep;

    fn spawn(config: Configuration) -> (DriverHandle, tokio::task::JoinHandle<BreakCycle>) {
        let (driver, handle) = CycleDriver::new(BreakCycle::new(config), PauseArbiter::default());
        (handle, tokio::spawn(driver.run()))
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_drives_countdown() {
        let (handle, task) = spawn(Configuration::with_durations(3, 2, 2));
        handle.send(Command::Start).await.unwrap();

        sleep(Duration::from_millis(1500)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, TimerState::Work);
        assert_eq!(snap.remaining_secs, 2);

        sleep(Duration::from_secs(2)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, TimerState::PreBreak);
        assert_eq!(snap.remaining_secs, 2);

        handle.shutdown().await.unwrap();
        let cycle = task.await.unwrap();
        assert_eq!(cycle.state(), TimerState::PreBreak);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_follow_up_enters_work() {
        let (handle, _task) = spawn(Configuration::with_durations(1, 0, 1));
        handle.send(Command::Start).await.unwrap();

        sleep(Duration::from_millis(2300)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, TimerState::Break);
        assert!(snap.settling);
        assert_eq!(snap.remaining_secs, 0);

        sleep(Duration::from_millis(500)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, TimerState::Work);
        assert!(!snap.settling);
        assert_eq!(snap.remaining_secs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_cycle_does_not_count_down() {
        let (handle, _task) = spawn(Configuration::with_durations(60, 5, 20));
        handle.send(Command::Start).await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        handle.send(Command::Pause).await.unwrap();

        sleep(Duration::from_secs(5)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.pause_source(), Some(PauseSource::User));
        assert_eq!(snap.remaining_secs, 59);

        handle.send(Command::Resume).await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.is_paused());
        assert_eq!(snap.remaining_secs, 58);
    }

    #[tokio::test(start_paused = true)]
    async fn monitors_cannot_lift_user_pause() {
        let (handle, _task) = spawn(Configuration::with_durations(60, 5, 20));
        handle.send(Command::Start).await.unwrap();
        handle.send(Command::Pause).await.unwrap();
        handle.send(Command::Power(PowerEvent::Wake)).await.unwrap();
        handle
            .send(Command::SmartPause(SmartPauseSignal::cleared()))
            .await
            .unwrap();

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.pause_source(), Some(PauseSource::User));
    }

    #[tokio::test(start_paused = true)]
    async fn enforced_skip_respects_difficulty() {
        let config = Configuration {
            skip_difficulty: SkipDifficulty::Hardcore,
            ..Configuration::with_durations(1, 0, 30)
        };
        let (handle, _task) = spawn(config);
        handle.send(Command::Start).await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.snapshot().await.unwrap().state, TimerState::Break);

        handle
            .send(Command::Skip {
                enforce_difficulty: true,
            })
            .await
            .unwrap();
        assert_eq!(handle.snapshot().await.unwrap().state, TimerState::Break);

        handle
            .send(Command::Skip {
                enforce_difficulty: false,
            })
            .await
            .unwrap();
        assert_eq!(handle.snapshot().await.unwrap().state, TimerState::Work);
    }

    #[tokio::test(start_paused = true)]
    async fn events_reach_handle_subscribers() {
        let (handle, _task) = spawn(Configuration::with_durations(60, 5, 20));
        let mut events = handle.subscribe();
        handle.send(Command::Start).await.unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(first.name(), "started");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_driver() {
        let (handle, task) = spawn(Configuration::default());
        handle.send(Command::Start).await.unwrap();
        drop(handle);
        let cycle = task.await.unwrap();
        assert_eq!(cycle.state(), TimerState::Work);
    }
}
