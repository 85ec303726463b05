//! Persistence bridge for crash recovery.
//!
//! The machine writes a snapshot after every transition and clears it on
//! `stop()`. The stored snapshot is a best-effort recovery aid, never the
//! source of truth.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::effects::EffectResult;
use crate::error::EffectError;
use crate::timer::CycleSnapshot;

pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> std::result::Result<Option<CycleSnapshot>, EffectError>;
    fn save(&self, snapshot: &CycleSnapshot) -> EffectResult;
    fn clear(&self) -> EffectResult;
}

/// Snapshot kept as pretty JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub const FILE_NAME: &'static str = "cycle.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data dir>/cycle.json`.
    pub fn open_default() -> crate::error::Result<Self> {
        Ok(Self::new(super::data_dir()?.join(Self::FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> std::result::Result<Option<CycleSnapshot>, EffectError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, snapshot: &CycleSnapshot) -> EffectResult {
        let content = serde_json::to_string_pretty(snapshot)?;
        // Write-then-rename so a crash never leaves half a file behind.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> EffectResult {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<CycleSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<CycleSnapshot> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> std::result::Result<Option<CycleSnapshot>, EffectError> {
        Ok(self.current())
    }

    fn save(&self, snapshot: &CycleSnapshot) -> EffectResult {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| EffectError::Failed(format!("snapshot slot poisoned: {e}")))?;
        *slot = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> EffectResult {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| EffectError::Failed(format!("snapshot slot poisoned: {e}")))?;
        *slot = None;
        Ok(())
    }
}
