//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Working-hour window used for free-slot computation
//! - Minimum free-slot length and how long old slots are kept
//! - Where calendar events come from and how freeslot tags its own events
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::calendar::DEFAULT_OWN_EVENT_MARKER;
use crate::error::{ConfigError, Result};
use crate::slots::{WorkingWindowConfig, DEFAULT_MIN_DURATION_MINUTES};

/// Free-slot computation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsConfig {
    #[serde(default = "default_min_duration")]
    pub min_duration_minutes: i64,
    /// Slots dated more than this many days ago are removed by cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// JSON events file. Defaults to `<data dir>/events.json`.
    #[serde(default)]
    pub events_path: Option<String>,
    /// Tag written into events freeslot creates; such events are never
    /// treated as busy.
    #[serde(default = "default_marker")]
    pub own_event_marker: String,
    #[serde(default = "default_focus_title")]
    pub focus_title: String,
    /// Whether focus blocks are written as busy (others then see you as
    /// unavailable) or free.
    #[serde(default)]
    pub focus_blocks_busy: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub working_window: WorkingWindowConfig,
    #[serde(default)]
    pub slots: SlotsConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

fn default_min_duration() -> i64 {
    DEFAULT_MIN_DURATION_MINUTES
}
fn default_retention_days() -> u32 {
    7
}
fn default_marker() -> String {
    DEFAULT_OWN_EVENT_MARKER.into()
}
fn default_focus_title() -> String {
    "Focus time".into()
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: default_min_duration(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            events_path: None,
            own_event_marker: default_marker(),
            focus_title: default_focus_title(),
            focus_blocks_busy: false,
        }
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
            message: "unknown config key".to_string(),
        };
        let unparsable = |expected: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{value}' as {expected}"),
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|_| unparsable("bool"))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<i64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| unparsable("integer"))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|_| unparsable("JSON"))?
                    }
                    serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
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

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds invalid values, or if the default cannot be written.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
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

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
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

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default config");
                Self::default()
            }
        }
    }

    pub fn load_or_default_from(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = %path.display(), "falling back to default config");
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.working_window.validate()?;
        if self.slots.min_duration_minutes < 1 {
            return Err(ConfigError::InvalidValue {
                key: "slots.min_duration_minutes".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.slots.retention_days < 1 {
            return Err(ConfigError::InvalidValue {
                key: "slots.retention_days".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
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

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// or the result fails validation. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Events file, falling back to `<data dir>/events.json`.
    pub fn events_path(&self) -> Result<PathBuf> {
        match &self.calendar.events_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(data_dir()?.join("events.json")),
        }
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
        assert_eq!(parsed.working_window, WorkingWindowConfig::default());
        assert_eq!(parsed.slots.min_duration_minutes, 60);
        assert!(parsed.calendar.events_path.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[working_window]\nstart_hour = 9\nend_hour = 17\n").unwrap();
        assert_eq!(parsed.working_window, WorkingWindowConfig::new(9, 0, 17, 0));
        assert_eq!(parsed.slots.retention_days, 7);
        assert_eq!(parsed.calendar.own_event_marker, "#freeslot");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("working_window.start_hour").as_deref(), Some("6"));
        assert_eq!(cfg.get("calendar.focus_title").as_deref(), Some("Focus time"));
        assert_eq!(cfg.get("calendar.events_path").as_deref(), Some("null"));
        assert!(cfg.get("working_window.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "slots.min_duration_minutes", "45").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "slots.min_duration_minutes").unwrap(),
            &serde_json::Value::Number(45.into())
        );
    }

    #[test]
    fn set_json_value_by_path_updates_null_string() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "calendar.events_path", "/tmp/events.json").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "calendar.events_path").unwrap(),
            &serde_json::Value::String("/tmp/events.json".to_string())
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        assert!(Config::set_json_value_by_path(&mut json, "slots.nonexistent", "1").is_err());
        assert!(Config::set_json_value_by_path(&mut json, "", "1").is_err());
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_type() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "calendar.focus_blocks_busy", "maybe");
        assert!(result.is_err());
    }

    #[test]
    fn set_validates_and_leaves_config_untouched_on_error() {
        let mut cfg = Config::default();
        cfg.set("working_window.start_hour", "9").unwrap();
        assert_eq!(cfg.working_window.start_hour, 9);

        assert!(cfg.set("working_window.start_hour", "25").is_err());
        assert!(cfg.set("slots.min_duration_minutes", "0").is_err());
        assert_eq!(cfg.working_window.start_hour, 9);
        assert_eq!(cfg.slots.min_duration_minutes, 60);
    }

    #[test]
    fn load_from_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.slots.min_duration_minutes, 60);
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[working_window]\nend_hour = 30\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn load_or_default_falls_back_on_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "working_window = [not toml").unwrap();
        let cfg = Config::load_or_default_from(&path);
        assert_eq!(cfg.working_window, WorkingWindowConfig::default());
        assert_eq!(cfg.slots.min_duration_minutes, 60);
        // The broken file is left for the user to fix.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "working_window = [not toml");

        std::fs::write(&path, "[slots]\nmin_duration_minutes = 0\n").unwrap();
        assert_eq!(Config::load_or_default_from(&path).slots.min_duration_minutes, 60);

        std::fs::write(&path, "[slots]\nmin_duration_minutes = 30\n").unwrap();
        assert_eq!(Config::load_or_default_from(&path).slots.min_duration_minutes, 30);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("calendar.events_path", "/data/events.json").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.calendar.events_path.as_deref(), Some("/data/events.json"));
        assert_eq!(loaded.events_path().unwrap(), PathBuf::from("/data/events.json"));
    }
}
