//! TOML-based application configuration.
//!
//! Stores:
//! - Timer durations and tick period
//! - Flame sampling window and on/off pattern
//! - Backend API location for control values and session time
//!
//! Configuration is stored at `~/.config/flamekeeper/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::flame::{FlamePattern, WindowSize};

/// Countdown timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Length of one session in seconds (repeating timer).
    #[serde(default = "default_session_duration_secs")]
    pub session_duration_secs: u64,
    /// Length of a level in minutes (one-shot timer).
    #[serde(default = "default_level_duration_min")]
    pub level_duration_min: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Flame sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlameConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_phase_duration")]
    pub on_duration: f64,
    #[serde(default = "default_phase_duration")]
    pub off_duration: f64,
}

/// Game backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_values_path")]
    pub values_path: String,
    #[serde(default = "default_time_path")]
    pub time_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/flamekeeper/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub flame: FlameConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_session_duration_secs() -> u64 {
    60
}
fn default_level_duration_min() -> u64 {
    10
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_window_size() -> usize {
    5
}
fn default_phase_duration() -> f64 {
    5.0
}
fn default_base_url() -> String {
    "http://localhost:5000/".into()
}
fn default_values_path() -> String {
    "api/values".into()
}
fn default_time_path() -> String {
    "api/time".into()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            session_duration_secs: default_session_duration_secs(),
            level_duration_min: default_level_duration_min(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for FlameConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            on_duration: default_phase_duration(),
            off_duration: default_phase_duration(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            values_path: default_values_path(),
            time_path: default_time_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TimerConfig {
    pub fn tick(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_ms.max(1))
    }
}

impl FlameConfig {
    pub fn window(&self) -> Result<WindowSize> {
        Ok(WindowSize::new(self.window_size)?)
    }

    pub fn pattern(&self) -> FlamePattern {
        FlamePattern::new(self.on_duration, self.off_duration)
    }
}

impl Config {
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

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists yet.
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
                let cfg: Config = toml::from_str(&content).map_err(|e| {
                    ConfigError::ParseFailed(format!("{}: {e}", path.display()))
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
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

    /// Set a config value by key in memory. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("falling back to default config: {e}");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.session_duration_secs, 60);
        assert_eq!(parsed.flame.window_size, 5);
        assert_eq!(parsed.api.values_path, "api/values");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[flame]\nwindow_size = 3\n").unwrap();
        assert_eq!(parsed.flame.window_size, 3);
        assert_eq!(parsed.flame.on_duration, 5.0);
        assert_eq!(parsed.timer.tick_ms, 1000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.tick_ms").as_deref(), Some("1000"));
        assert_eq!(cfg.get("api.time_path").as_deref(), Some("api/time"));
        assert!(cfg.get("timer.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_numbers_and_strings() {
        let mut cfg = Config::default();
        cfg.set("flame.window_size", "8").unwrap();
        cfg.set("flame.on_duration", "2.5").unwrap();
        cfg.set("api.base_url", "https://game.example/").unwrap();
        assert_eq!(cfg.flame.window_size, 8);
        assert_eq!(cfg.flame.on_duration, 2.5);
        assert_eq!(cfg.api.base_url, "https://game.example/");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_number() {
        let mut cfg = Config::default();
        assert!(cfg.set("flame.nonexistent", "1").is_err());
        assert!(cfg.set("timer.tick_ms", "soon").is_err());
        // A float cannot land in an integer field.
        assert!(cfg.set("flame.window_size", "2.5").is_err());
    }

    #[test]
    fn zero_window_size_is_rejected_on_use() {
        let mut cfg = Config::default();
        cfg.flame.window_size = 0;
        assert!(cfg.flame.window().is_err());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.timer.level_duration_min, 10);
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("timer.level_duration_min", "3").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().timer.level_duration_min, 3);
    }

    #[test]
    fn load_from_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timer = 12").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
