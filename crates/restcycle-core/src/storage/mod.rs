mod config;
mod snapshot;

pub use config::{
    Config, CycleConfig, IdleConfig, OvertimeConfig, PowerConfig, SkipConfig, SmartPauseConfig,
};
pub use snapshot::{JsonSnapshotStore, MemorySnapshotStore, SnapshotStore};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the data directory, creating it if needed.
///
/// `RESTCYCLE_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/restcycle[-dev]/`; set RESTCYCLE_ENV=dev for the development
/// directory.
///
/// # Errors
/// Returns an error if no home directory can be determined or the directory
/// cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("RESTCYCLE_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(".config");
            let env = std::env::var("RESTCYCLE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("restcycle-dev")
            } else {
                base_dir.join("restcycle")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
