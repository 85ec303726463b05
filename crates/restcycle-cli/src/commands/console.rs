//! Terminal collaborators for `restcycle run`.
//!
//! The machine calls these synchronously from the driver task, so each call
//! only queues a [`Notice`]. A separate dispatcher task does the printing and
//! the adherence log writes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use restcycle_core::effects::{AdherenceRecorder, Notifier, Renderer, ScreenLocker, SoundPlayer};
use restcycle_core::{BreakRecord, Collaborators, EffectError, EffectResult, SnapshotStore};
use tokio::sync::mpsc;
use tracing::warn;

use super::status::clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Overlay(String),
    HideOverlay,
    Notification(String),
    Bell,
    Adherence(BreakRecord),
}

#[derive(Debug, Clone)]
pub struct ConsoleEffects {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ConsoleEffects {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Route every collaborator through this console. A terminal cannot lock
    /// the screen, so that call reports itself unavailable.
    pub fn collaborators(self, store: Arc<dyn SnapshotStore>) -> Collaborators {
        let console = Arc::new(self);
        Collaborators {
            renderer: console.clone(),
            notifier: console.clone(),
            sound: console.clone(),
            screen_lock: console.clone(),
            adherence: console,
            store,
        }
    }

    fn send(&self, notice: Notice) -> EffectResult {
        self.tx
            .send(notice)
            .map_err(|_| EffectError::Failed("console dispatcher has stopped".into()))
    }
}

impl Renderer for ConsoleEffects {
    fn show_pre_break(&self, seconds: u64) -> EffectResult {
        self.send(Notice::Overlay(format!("break in {}", clock(seconds))))
    }
    fn show_break(&self, duration_secs: u64) -> EffectResult {
        self.send(Notice::Overlay(format!(
            "break time, look away for {}",
            clock(duration_secs)
        )))
    }
    fn show_overtime_nudge(&self, elapsed_minutes: u64) -> EffectResult {
        self.send(Notice::Overlay(format!(
            "you have been working for {elapsed_minutes} min without a break"
        )))
    }
    fn hide_overlay(&self) -> EffectResult {
        self.send(Notice::HideOverlay)
    }
}

impl Notifier for ConsoleEffects {
    fn send_pre_break(&self, seconds: u64) -> EffectResult {
        self.send(Notice::Notification(format!("break starting in {seconds}s")))
    }
    fn send_break_start(&self, duration_secs: u64, long_break: bool) -> EffectResult {
        let kind = if long_break { "long break" } else { "break" };
        self.send(Notice::Notification(format!(
            "{kind} started ({})",
            clock(duration_secs)
        )))
    }
    fn send_break_end(&self) -> EffectResult {
        self.send(Notice::Notification("back to work".into()))
    }
    fn send_overtime(&self, elapsed_minutes: u64) -> EffectResult {
        self.send(Notice::Notification(format!(
            "overtime: {elapsed_minutes} min since your last break"
        )))
    }
}

impl SoundPlayer for ConsoleEffects {
    fn play_break_start(&self) -> EffectResult {
        self.send(Notice::Bell)
    }
    fn play_break_end(&self) -> EffectResult {
        self.send(Notice::Bell)
    }
}

impl ScreenLocker for ConsoleEffects {
    fn lock_screen(&self) -> EffectResult {
        Err(EffectError::Unavailable("screen lock"))
    }
}

impl AdherenceRecorder for ConsoleEffects {
    fn record_break(&self, record: BreakRecord) -> EffectResult {
        self.send(Notice::Adherence(record))
    }
}

/// One line per notice on stdout. `None` for notices with no visible text.
pub fn render(notice: &Notice) -> Option<String> {
    match notice {
        Notice::Overlay(text) => Some(format!("[overlay] {text}")),
        Notice::HideOverlay => None,
        Notice::Notification(text) => Some(format!("[notify] {text}")),
        Notice::Bell => Some("\x07".to_string()),
        Notice::Adherence(record) => Some(format!(
            "[adherence] break #{} {} after {}",
            record.break_count,
            if record.completed { "completed" } else { "skipped" },
            clock(record.duration_secs)
        )),
    }
}

/// Drain notices until every sender is gone. Adherence records are appended
/// to `adherence_log` as JSON lines.
pub async fn dispatch(mut rx: mpsc::UnboundedReceiver<Notice>, adherence_log: PathBuf) {
    while let Some(notice) = rx.recv().await {
        if let Some(line) = render(&notice) {
            println!("{line}");
        }
        if let Notice::Adherence(record) = &notice {
            if let Err(e) = append_record(&adherence_log, record) {
                warn!(path = %adherence_log.display(), "failed to write adherence record: {}", e);
            }
        }
    }
}

fn append_record(path: &Path, record: &BreakRecord) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use restcycle_core::{BreakCycle, Configuration, MemorySnapshotStore};

    #[test]
    fn calls_only_queue_notices() {
        let (console, mut rx) = ConsoleEffects::new();
        console.show_pre_break(10).unwrap();
        console.send_break_start(300, true).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::Overlay("break in 00:10".into())
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::Notification("long break started (05:00)".into())
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn screen_lock_is_unavailable() {
        let (console, _rx) = ConsoleEffects::new();
        assert!(matches!(
            console.lock_screen(),
            Err(EffectError::Unavailable(_))
        ));
    }

    #[test]
    fn closed_dispatcher_fails_softly() {
        let (console, rx) = ConsoleEffects::new();
        drop(rx);
        assert!(console.hide_overlay().is_err());
    }

    #[test]
    fn machine_drives_console() {
        let (console, mut rx) = ConsoleEffects::new();
        let effects = console.collaborators(Arc::new(MemorySnapshotStore::new()));
        let mut cycle = BreakCycle::with_effects(Configuration::with_durations(1, 0, 1), effects);
        cycle.start().unwrap();
        cycle.tick();

        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        assert!(notices.contains(&Notice::Bell));
        assert!(notices.contains(&Notice::Overlay("break time, look away for 00:01".into())));
    }

    #[test]
    fn adherence_lines_render() {
        let record = BreakRecord {
            completed: false,
            duration_secs: 7,
            break_count: 3,
            long_break: false,
            session_id: None,
            at: chrono::Utc::now(),
        };
        assert_eq!(
            render(&Notice::Adherence(record)).as_deref(),
            Some("[adherence] break #3 skipped after 00:07")
        );
        assert_eq!(render(&Notice::HideOverlay), None);
    }
}
