//! TOML-based configuration.
//!
//! Holds the scheduler cadence, persistence retry policy, reward and
//! ledger settings, and the defaults used when creating entities without
//! explicit values.
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::clock::Calendar;
use crate::error::ConfigError;

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_overdue_check_interval")]
    pub overdue_check_interval_minutes: u32,
    /// Local offset for midnight and weekday logic. System offset when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    #[serde(default = "default_overdue_notify_interval")]
    pub overdue_notify_interval_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default = "default_max_save_retries")]
    pub max_save_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Refuse redemptions the balance cannot cover.
    #[serde(default = "default_true")]
    pub precheck_balance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_max_entries")]
    pub max_entries: usize,
}

/// Values used when an entity is created without them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_chore_points")]
    pub chore_points: f64,
    #[serde(default = "default_reward_cost")]
    pub reward_cost: f64,
    #[serde(default = "default_one")]
    pub penalty_points: f64,
    #[serde(default = "default_one")]
    pub bonus_points: f64,
    #[serde(default = "default_badge_award_points")]
    pub badge_award_points: f64,
    #[serde(default = "default_badge_daily_threshold")]
    pub badge_daily_threshold: u32,
    #[serde(default = "default_badge_threshold_value")]
    pub badge_threshold_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Coordinator configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_overdue_check_interval() -> u32 {
    5
}
fn default_overdue_notify_interval() -> u32 {
    24
}
fn default_storage_key() -> String {
    "kidschores_data".into()
}
fn default_max_save_retries() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_ledger_max_entries() -> usize {
    1000
}
fn default_chore_points() -> f64 {
    5.0
}
fn default_reward_cost() -> f64 {
    10.0
}
fn default_one() -> f64 {
    1.0
}
fn default_badge_award_points() -> f64 {
    5.0
}
fn default_badge_daily_threshold() -> u32 {
    5
}
fn default_badge_threshold_value() -> f64 {
    50.0
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            overdue_check_interval_minutes: default_overdue_check_interval(),
            utc_offset_minutes: None,
            overdue_notify_interval_hours: default_overdue_notify_interval(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            max_save_retries: default_max_save_retries(),
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            precheck_balance: true,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_entries: default_ledger_max_entries(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            chore_points: default_chore_points(),
            reward_cost: default_reward_cost(),
            penalty_points: 1.0,
            bonus_points: 1.0,
            badge_award_points: default_badge_award_points(),
            badge_daily_threshold: default_badge_daily_threshold(),
            badge_threshold_value: default_badge_threshold_value(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(root: &mut Value, key: &str, value: &str) -> Result<(), ConfigError> {
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
                Value::Bool(_) => Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                Value::Number(_) => parse_number(value).ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                // Optional numbers serialize as null while unset.
                Value::Null => match value {
                    "" | "none" | "null" => Value::Null,
                    _ => parse_number(value).ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                },
                Value::Object(_) | Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                Value::String(_) => Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed,
    /// or if the default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
        let cfg: Config = toml::from_str(&content).map_err(|e| failed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit.
    /// On error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error naming the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if self.schedule.overdue_check_interval_minutes == 0 {
            return invalid("schedule.overdue_check_interval_minutes", "must be at least 1");
        }
        if let Some(offset) = self.schedule.utc_offset_minutes {
            if offset.abs() >= 24 * 60 {
                return invalid("schedule.utc_offset_minutes", "must be within +/- 1439");
            }
        }
        if self.persistence.storage_key.trim().is_empty() {
            return invalid("persistence.storage_key", "must not be empty");
        }
        if self.ledger.max_entries == 0 {
            return invalid("ledger.max_entries", "must be at least 1");
        }
        Ok(())
    }

    pub fn calendar(&self) -> Calendar {
        Calendar::from_offset_minutes(self.schedule.utc_offset_minutes)
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

fn parse_number(value: &str) -> Option<Value> {
    if let Ok(n) = value.parse::<i64>() {
        Some(Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
    }
}
