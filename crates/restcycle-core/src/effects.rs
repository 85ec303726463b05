//! Side-effect collaborators invoked at transition boundaries.
//!
//! All calls are fire-and-forget: implementations must return promptly
//! (queue the work elsewhere if it is slow) and a returned error is only
//! logged. The machine's own consistency never depends on them.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EffectError;
use crate::storage::{MemorySnapshotStore, SnapshotStore};

pub type EffectResult = std::result::Result<(), EffectError>;

/// Overlay / HUD rendering.
pub trait Renderer: Send + Sync {
    fn show_pre_break(&self, seconds: u64) -> EffectResult;
    fn show_break(&self, duration_secs: u64) -> EffectResult;
    fn show_overtime_nudge(&self, elapsed_minutes: u64) -> EffectResult;
    fn hide_overlay(&self) -> EffectResult;
}

/// System notification delivery.
pub trait Notifier: Send + Sync {
    fn send_pre_break(&self, seconds: u64) -> EffectResult;
    fn send_break_start(&self, duration_secs: u64, long_break: bool) -> EffectResult;
    fn send_break_end(&self) -> EffectResult;
    fn send_overtime(&self, elapsed_minutes: u64) -> EffectResult;
}

pub trait SoundPlayer: Send + Sync {
    fn play_break_start(&self) -> EffectResult;
    fn play_break_end(&self) -> EffectResult;
}

pub trait ScreenLocker: Send + Sync {
    fn lock_screen(&self) -> EffectResult;
}

/// One resolved break, skipped or completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakRecord {
    pub completed: bool,
    /// Seconds the break actually ran.
    pub duration_secs: u64,
    pub break_count: u32,
    pub long_break: bool,
    pub session_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

/// Receives exactly one record per break resolution.
pub trait AdherenceRecorder: Send + Sync {
    fn record_break(&self, record: BreakRecord) -> EffectResult;
}

/// Does nothing, successfully.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Renderer for Noop {
    fn show_pre_break(&self, _seconds: u64) -> EffectResult {
        Ok(())
    }
    fn show_break(&self, _duration_secs: u64) -> EffectResult {
        Ok(())
    }
    fn show_overtime_nudge(&self, _elapsed_minutes: u64) -> EffectResult {
        Ok(())
    }
    fn hide_overlay(&self) -> EffectResult {
        Ok(())
    }
}

impl Notifier for Noop {
    fn send_pre_break(&self, _seconds: u64) -> EffectResult {
        Ok(())
    }
    fn send_break_start(&self, _duration_secs: u64, _long_break: bool) -> EffectResult {
        Ok(())
    }
    fn send_break_end(&self) -> EffectResult {
        Ok(())
    }
    fn send_overtime(&self, _elapsed_minutes: u64) -> EffectResult {
        Ok(())
    }
}

impl SoundPlayer for Noop {
    fn play_break_start(&self) -> EffectResult {
        Ok(())
    }
    fn play_break_end(&self) -> EffectResult {
        Ok(())
    }
}

impl ScreenLocker for Noop {
    fn lock_screen(&self) -> EffectResult {
        Ok(())
    }
}

impl AdherenceRecorder for Noop {
    fn record_break(&self, _record: BreakRecord) -> EffectResult {
        Ok(())
    }
}

/// The full set of collaborators a `BreakCycle` talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn Renderer>,
    pub notifier: Arc<dyn Notifier>,
    pub sound: Arc<dyn SoundPlayer>,
    pub screen_lock: Arc<dyn ScreenLocker>,
    pub adherence: Arc<dyn AdherenceRecorder>,
    pub store: Arc<dyn SnapshotStore>,
}

impl Collaborators {
    /// No-op collaborators and an in-memory snapshot store.
    pub fn detached() -> Self {
        Self {
            renderer: Arc::new(Noop),
            notifier: Arc::new(Noop),
            sound: Arc::new(Noop),
            screen_lock: Arc::new(Noop),
            adherence: Arc::new(Noop),
            store: Arc::new(MemorySnapshotStore::new()),
        }
    }

    /// Route every collaborator call into one recorder.
    pub fn recording(recorder: &Arc<RecordingEffects>) -> Self {
        Self {
            renderer: recorder.clone(),
            notifier: recorder.clone(),
            sound: recorder.clone(),
            screen_lock: recorder.clone(),
            adherence: recorder.clone(),
            store: Arc::new(MemorySnapshotStore::new()),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::detached()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// A collaborator call as seen by [`RecordingEffects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectCall {
    ShowPreBreak(u64),
    ShowBreak(u64),
    ShowOvertimeNudge(u64),
    HideOverlay,
    NotifyPreBreak(u64),
    NotifyBreakStart { duration_secs: u64, long_break: bool },
    NotifyBreakEnd,
    NotifyOvertime(u64),
    PlayBreakStart,
    PlayBreakEnd,
    LockScreen,
    RecordBreak { completed: bool, duration_secs: u64 },
}

/// Keeps every collaborator call in order, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingEffects {
    calls: Mutex<Vec<EffectCall>>,
    records: Mutex<Vec<BreakRecord>>,
}

impl RecordingEffects {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<EffectCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn break_records(&self) -> Vec<BreakRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn count(&self, call: &EffectCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    fn push(&self, call: EffectCall) -> EffectResult {
        self.calls
            .lock()
            .map_err(|e| EffectError::Failed(format!("recorder poisoned: {e}")))?
            .push(call);
        Ok(())
    }
}

impl Renderer for RecordingEffects {
    fn show_pre_break(&self, seconds: u64) -> EffectResult {
        self.push(EffectCall::ShowPreBreak(seconds))
    }
    fn show_break(&self, duration_secs: u64) -> EffectResult {
        self.push(EffectCall::ShowBreak(duration_secs))
    }
    fn show_overtime_nudge(&self, elapsed_minutes: u64) -> EffectResult {
        self.push(EffectCall::ShowOvertimeNudge(elapsed_minutes))
    }
    fn hide_overlay(&self) -> EffectResult {
        self.push(EffectCall::HideOverlay)
    }
}

impl Notifier for RecordingEffects {
    fn send_pre_break(&self, seconds: u64) -> EffectResult {
        self.push(EffectCall::NotifyPreBreak(seconds))
    }
    fn send_break_start(&self, duration_secs: u64, long_break: bool) -> EffectResult {
        self.push(EffectCall::NotifyBreakStart {
            duration_secs,
            long_break,
        })
    }
    fn send_break_end(&self) -> EffectResult {
        self.push(EffectCall::NotifyBreakEnd)
    }
    fn send_overtime(&self, elapsed_minutes: u64) -> EffectResult {
        self.push(EffectCall::NotifyOvertime(elapsed_minutes))
    }
}

impl SoundPlayer for RecordingEffects {
    fn play_break_start(&self) -> EffectResult {
        self.push(EffectCall::PlayBreakStart)
    }
    fn play_break_end(&self) -> EffectResult {
        self.push(EffectCall::PlayBreakEnd)
    }
}

impl ScreenLocker for RecordingEffects {
    fn lock_screen(&self) -> EffectResult {
        self.push(EffectCall::LockScreen)
    }
}

impl AdherenceRecorder for RecordingEffects {
    fn record_break(&self, record: BreakRecord) -> EffectResult {
        self.push(EffectCall::RecordBreak {
            completed: record.completed,
            duration_secs: record.duration_secs,
        })?;
        self.records
            .lock()
            .map_err(|e| EffectError::Failed(format!("recorder poisoned: {e}")))?
            .push(record);
        Ok(())
    }
}
