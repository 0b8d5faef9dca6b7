use std::sync::Arc;

use crate::models::{TimerConfig, TimerMode};
use crate::storage::{KeyValueStore, StorageError};

pub const SETTINGS_KEY: &str = "plan_focus_settings";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be a positive whole number of minutes, got {value:?}")]
    InvalidValue { field: TimerMode, value: String },
}

/// Edit boundary for a single duration field.
pub fn parse_minutes(field: TimerMode, input: &str) -> Result<u32, ConfigError> {
    match input.trim().parse::<u32>() {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(ConfigError::InvalidValue {
            field,
            value: input.to_string(),
        }),
    }
}

pub struct SettingsStore<S> {
    store: Arc<S>,
}

impl<S> Clone for SettingsStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> TimerConfig {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return TimerConfig::default(),
            Err(error) => {
                log::error!("failed to read settings error={error}");
                return TimerConfig::default();
            }
        };
        match serde_json::from_str::<TimerConfig>(&raw) {
            Ok(config) if config.is_valid() => config,
            Ok(config) => {
                log::warn!("stored timer config has a zero duration, using defaults config={config:?}");
                TimerConfig::default()
            }
            Err(error) => {
                log::warn!("corrupt settings error={error}");
                TimerConfig::default()
            }
        }
    }

    /// Persists verbatim; callers validate through [`parse_minutes`] or [`SettingsDraft`].
    pub fn try_save(&self, config: &TimerConfig) -> Result<(), StorageError> {
        let json = serde_json::to_string(config)?;
        self.store.set(SETTINGS_KEY, &json)
    }

    pub fn save(&self, config: &TimerConfig) -> bool {
        match self.try_save(config) {
            Ok(()) => {
                log::info!("timer config saved config={config:?}");
                true
            }
            Err(error) => {
                log::error!("failed to save timer config error={error}");
                false
            }
        }
    }
}

/// Settings form state: rejected edits keep the previous value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDraft {
    config: TimerConfig,
}

impl SettingsDraft {
    pub fn new(current: TimerConfig) -> Self {
        Self { config: current }
    }

    pub fn edit(&mut self, field: TimerMode, input: &str) -> Result<u32, ConfigError> {
        let minutes = parse_minutes(field, input)?;
        self.config.set_minutes(field, minutes);
        Ok(minutes)
    }

    pub fn reset_to_defaults(&mut self) {
        self.config = TimerConfig::default();
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }
}
