//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session length
//! - Master volume, meditation track and track sources
//! - Alarm and vibration preferences
//! - Playback retry tuning
//!
//! Configuration is stored at `~/.config/somnus/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::audio::{SourceRef, TrackId};
use crate::error::ConfigError;
use crate::sequencer::SequencerConfig;
use crate::session::SessionSettings;

/// Countdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_duration_min")]
    pub duration_min: u32,
}

/// Track and volume configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_master_volume")]
    pub master_volume: f64,
    #[serde(default = "default_true")]
    pub meditation_enabled: bool,
    #[serde(default = "default_primary_source")]
    pub primary_source: String,
    #[serde(default = "default_loop_source")]
    pub loop_source: String,
    #[serde(default = "default_alarm_source")]
    pub alarm_source: String,
    #[serde(default = "default_primary_weight")]
    pub primary_weight: f64,
    #[serde(default = "default_loop_weight")]
    pub loop_weight: f64,
}

/// End-of-session alarm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub vibrate: bool,
    #[serde(default = "default_alarm_volume")]
    pub volume: f64,
    /// Volume of the fallback element used when the alarm has not buffered.
    #[serde(default = "default_high_volume")]
    pub shadow_volume: f64,
    /// Device media volume applied when a session ends.
    #[serde(default = "default_high_volume")]
    pub restore_media_volume: f64,
}

/// Track start retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/somnus/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

// Default functions
fn default_duration_min() -> u32 {
    60
}
fn default_master_volume() -> f64 {
    0.5
}
fn default_true() -> bool {
    true
}
fn default_primary_source() -> String {
    SourceRef::default_for(TrackId::Primary).0
}
fn default_loop_source() -> String {
    SourceRef::default_for(TrackId::Loop).0
}
fn default_alarm_source() -> String {
    SourceRef::default_for(TrackId::Alarm).0
}
fn default_primary_weight() -> f64 {
    0.6
}
fn default_loop_weight() -> f64 {
    0.3
}
fn default_alarm_volume() -> f64 {
    0.5
}
fn default_high_volume() -> f64 {
    0.8
}
fn default_retry_delays_ms() -> Vec<u64> {
    vec![300, 500, 1000]
}
fn default_max_attempts() -> u8 {
    3
}
fn default_grace_delay_ms() -> u64 {
    500
}
fn default_load_timeout_ms() -> u64 {
    10_000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            duration_min: default_duration_min(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: default_master_volume(),
            meditation_enabled: true,
            primary_source: default_primary_source(),
            loop_source: default_loop_source(),
            alarm_source: default_alarm_source(),
            primary_weight: default_primary_weight(),
            loop_weight: default_loop_weight(),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            vibrate: true,
            volume: default_alarm_volume(),
            shadow_volume: default_high_volume(),
            restore_media_volume: default_high_volume(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            retry_delays_ms: default_retry_delays_ms(),
            max_attempts: default_max_attempts(),
            grace_delay_ms: default_grace_delay_ms(),
            load_timeout_ms: default_load_timeout_ms(),
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
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

        Err(unknown())
    }

    fn path() -> crate::error::Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> crate::error::Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save()?;
            return Ok(cfg);
        }
        Ok(Self::load_from(&path)?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> crate::error::Result<()> {
        Ok(self.save_to(&Self::path()?)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Update a value by dot-separated key without saving.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// or is out of range, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        self.apply(key, value)?;
        self.save()?;
        Ok(())
    }

    /// Range checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| -> Result<(), ConfigError> {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if self.timer.duration_min == 0 {
            return invalid("timer.duration_min", "must be at least 1 minute");
        }
        let unit_ranged = [
            ("audio.master_volume", self.audio.master_volume),
            ("audio.primary_weight", self.audio.primary_weight),
            ("audio.loop_weight", self.audio.loop_weight),
            ("alarm.volume", self.alarm.volume),
            ("alarm.shadow_volume", self.alarm.shadow_volume),
            ("alarm.restore_media_volume", self.alarm.restore_media_volume),
        ];
        for (key, value) in unit_ranged {
            if !(0.0..=1.0).contains(&value) {
                return invalid(key, "must be between 0.0 and 1.0");
            }
        }
        if self.playback.max_attempts == 0 {
            return invalid("playback.max_attempts", "must be at least 1");
        }
        if self.playback.retry_delays_ms.is_empty() {
            return invalid("playback.retry_delays_ms", "must list at least one delay");
        }
        Ok(())
    }

    /// Initial session settings.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            duration_min: self.timer.duration_min,
            master_volume: self.audio.master_volume as f32,
            meditation_enabled: self.audio.meditation_enabled,
            alarm_enabled: self.alarm.enabled,
            vibrate: self.alarm.vibrate,
        }
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            primary_weight: self.audio.primary_weight as f32,
            loop_weight: self.audio.loop_weight as f32,
            alarm_volume: self.alarm.volume as f32,
            shadow_alarm_volume: self.alarm.shadow_volume as f32,
            restore_media_volume: self.alarm.restore_media_volume as f32,
            grace_delay: Duration::from_millis(self.playback.grace_delay_ms),
            retry_delays: self
                .playback
                .retry_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            max_attempts: self.playback.max_attempts,
            load_timeout: Duration::from_millis(self.playback.load_timeout_ms),
        }
    }

    pub fn sources(&self) -> Vec<(TrackId, SourceRef)> {
        vec![
            (TrackId::Primary, SourceRef::new(&self.audio.primary_source)),
            (TrackId::Loop, SourceRef::new(&self.audio.loop_source)),
            (TrackId::Alarm, SourceRef::new(&self.audio.alarm_source)),
        ]
    }
}
