//! Core error types for restcycle-core.
//!
//! Two families live here. [`Rejection`] is the advisory refusal returned by
//! break-cycle operations: the machine is left untouched and the caller may
//! ignore it. [`CoreError`] covers configuration and storage failures that
//! do need to reach the caller.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::{PauseSource, TimerState};

/// Why a break-cycle operation was refused.
///
/// A rejection never changes state. Every rejection is also logged at warn
/// level by the machine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `start()` while a cycle is already running.
    #[error("cycle already running (state: {0})")]
    NotIdle(TimerState),

    /// Operation requires a running cycle.
    #[error("cycle is not running")]
    NotRunning,

    /// `pause()` on a machine that is already paused.
    #[error("already paused by {0}")]
    AlreadyPaused(PauseSource),

    /// `resume()` on a machine that is not paused.
    #[error("cycle is not paused")]
    NotPaused,

    /// Resume requested by someone other than the pause holder.
    #[error("pause is held by {holder}, refusing resume from {requester}")]
    NotOwner {
        holder: PauseSource,
        requester: PauseSource,
    },

    /// `postpone()` outside of work / pre-break.
    #[error("cannot postpone during {state}")]
    PostponeUnavailable { state: TimerState },

    /// `postpone()` while paused.
    #[error("cannot postpone while paused")]
    PausedPostpone,

    /// `postpone(0)`, which would leave a finished countdown in place.
    #[error("postpone needs at least one minute")]
    EmptyPostpone,
}

/// A side-effect collaborator failed.
///
/// Collaborator failures are logged and swallowed; they never roll back a
/// transition.
#[derive(Error, Debug)]
pub enum EffectError {
    /// The collaborator is not available on this system.
    #[error("{0} is unavailable")]
    Unavailable(&'static str),

    /// The collaborator reported a failure.
    #[error("{0}")]
    Failed(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors while writing a snapshot
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Core error type for restcycle-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse errors
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home directory could not be determined
    #[error("Cannot determine the configuration directory")]
    NoConfigDir,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
