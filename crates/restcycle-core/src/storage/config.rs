//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The cycle preset and its durations
//! - Skip difficulty and overtime tracking
//! - Which pause monitors may act (idle, smart pause, work hours, power)
//!
//! Configuration is stored at `~/.config/restcycle/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::arbiter::{ArbiterPolicy, DEFAULT_IDLE_THRESHOLD_SECS};
use crate::error::{ConfigError, CoreError, Result};
use crate::schedule::WorkHours;
use crate::timer::{Configuration, CycleMode, SkipDifficulty};

/// Cycle preset and durations.
///
/// The explicit durations are only read when `mode = "custom"`; the other
/// modes use their preset numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default)]
    pub mode: CycleMode,
    #[serde(default = "default_work_interval")]
    pub work_interval_seconds: u64,
    #[serde(default = "default_pre_break")]
    pub pre_break_seconds: u64,
    #[serde(default = "default_break_duration")]
    pub break_duration_seconds: u64,
    #[serde(default)]
    pub adaptive_mode: bool,
    #[serde(default)]
    pub long_break_enabled: bool,
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default = "default_long_break_duration")]
    pub long_break_duration_seconds: u64,
    #[serde(default)]
    pub lock_screen_on_break: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipConfig {
    #[serde(default)]
    pub difficulty: SkipDifficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub track_while_paused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Inactivity before the idle monitor reports the user away.
    #[serde(default = "default_idle_threshold")]
    pub threshold_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartPauseConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerConfig {
    #[serde(default = "default_true")]
    pub pause_on_sleep: bool,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub skip: SkipConfig,
    #[serde(default)]
    pub overtime: OvertimeConfig,
    #[serde(default)]
    pub idle: IdleConfig,
    #[serde(default)]
    pub work_hours: WorkHours,
    #[serde(default)]
    pub smart_pause: SmartPauseConfig,
    #[serde(default)]
    pub power: PowerConfig,
}

fn default_work_interval() -> u64 {
    20 * 60
}
fn default_pre_break() -> u64 {
    10
}
fn default_break_duration() -> u64 {
    20
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_long_break_duration() -> u64 {
    5 * 60
}
fn default_idle_threshold() -> u64 {
    DEFAULT_IDLE_THRESHOLD_SECS
}
fn default_true() -> bool {
    true
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            mode: CycleMode::default(),
            work_interval_seconds: default_work_interval(),
            pre_break_seconds: default_pre_break(),
            break_duration_seconds: default_break_duration(),
            adaptive_mode: false,
            long_break_enabled: false,
            long_break_interval: default_long_break_interval(),
            long_break_duration_seconds: default_long_break_duration(),
            lock_screen_on_break: false,
        }
    }
}

impl Default for OvertimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            track_while_paused: false,
        }
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_seconds: default_idle_threshold(),
        }
    }
}

impl Default for SmartPauseConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            pause_on_sleep: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycle: CycleConfig::default(),
            skip: SkipConfig::default(),
            overtime: OvertimeConfig::default(),
            idle: IdleConfig::default(),
            work_hours: WorkHours::default(),
            smart_pause: SmartPauseConfig::default(),
            power: PowerConfig::default(),
        }
    }
}

impl Config {
    pub const FILE_NAME: &'static str = "config.toml";

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<()> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').filter(|p| !p.is_empty()).peekable();
        if parts.peek().is_none() {
            return Err(unknown().into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(format!("expected a boolean: {e}")))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown().into())
    }

    /// Default location: `<data dir>/config.toml`.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join(Self::FILE_NAME))
    }

    /// Load from the default location, writing defaults if the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key, in memory. The caller decides when to save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field. On error `self` is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf key with its current value, in dotted form.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| -> CoreError {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            }
            .into()
        };
        if self.cycle.mode == CycleMode::Custom {
            if self.cycle.work_interval_seconds == 0 {
                return Err(invalid("cycle.work_interval_seconds", "must be positive"));
            }
            if self.cycle.break_duration_seconds == 0 {
                return Err(invalid("cycle.break_duration_seconds", "must be positive"));
            }
            if self.cycle.long_break_enabled && self.cycle.long_break_interval == 0 {
                return Err(invalid("cycle.long_break_interval", "must be positive"));
            }
        }
        if self.work_hours.start_hour > 23 {
            return Err(invalid("work_hours.start_hour", "must be 0-23"));
        }
        if self.work_hours.end_hour > 23 {
            return Err(invalid("work_hours.end_hour", "must be 0-23"));
        }
        Ok(())
    }

    /// The resolved configuration the break cycle runs against.
    pub fn cycle_configuration(&self) -> Configuration {
        let cycle = &self.cycle;
        let mut cfg = match cycle.mode {
            CycleMode::Custom => Configuration {
                long_break_enabled: cycle.long_break_enabled,
                long_break_interval: cycle.long_break_interval,
                long_break_duration_secs: cycle.long_break_duration_seconds,
                ..Configuration::with_durations(
                    cycle.work_interval_seconds,
                    cycle.pre_break_seconds,
                    cycle.break_duration_seconds,
                )
            },
            preset => Configuration::preset(preset),
        };
        cfg.adaptive_mode = cycle.adaptive_mode;
        cfg.lock_screen_on_break = cycle.lock_screen_on_break;
        cfg.skip_difficulty = self.skip.difficulty;
        cfg.overtime_enabled = self.overtime.enabled;
        cfg.overtime_while_paused = self.overtime.track_while_paused;
        cfg
    }

    pub fn arbiter_policy(&self) -> ArbiterPolicy {
        ArbiterPolicy {
            idle_enabled: self.idle.enabled,
            idle_threshold_secs: self.idle.threshold_seconds,
            smart_pause_enabled: self.smart_pause.enabled,
            work_hours_enabled: self.work_hours.enabled,
            system_enabled: self.power.pause_on_sleep,
        }
    }

    pub fn work_hours(&self) -> &WorkHours {
        &self.work_hours
    }
}
