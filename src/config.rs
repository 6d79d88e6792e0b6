//! Engine tunables. Every field has a default, so an empty JSON object (or
//! no config at all) gives the stock game.

use serde::Deserialize;
use tracing::warn;

use crate::economy::save::Storage;

/// Storage key the host reads config overrides from.
pub const CONFIG_KEY: &str = "message_idle_config";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock interval between unconditional saves.
    pub autosave_interval_ms: f64,
    /// Sliding window used for the manual messages/sec figure.
    pub manual_window_ms: f64,
    /// Longest gap a single frame may catch up on.
    pub max_catch_up_ms: f64,
    /// Storage key for the economy snapshot.
    pub save_key: String,
    /// Storage key for player settings.
    pub settings_key: String,
    /// RNG seed for a brand new economy. `None` keeps the built-in seed.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_interval_ms: 30_000.0,
            manual_window_ms: 2_000.0,
            max_catch_up_ms: 8.0 * 60.0 * 60.0 * 1000.0,
            save_key: "message_idle_save".into(),
            settings_key: "message_idle_settings".into(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Overrides stored under `key`, or the stock config when there are
    /// none. Unreadable overrides are logged and ignored.
    pub fn from_storage<S: Storage + ?Sized>(storage: &S, key: &str) -> Self {
        match storage.read(key) {
            Ok(Some(json)) => Self::from_json(&json).unwrap_or_else(|e| {
                warn!(error = %e, "config overrides unreadable; using defaults");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "config overrides unavailable; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::save::MemoryStorage;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_override() {
        let config =
            EngineConfig::from_json(r#"{"autosave_interval_ms": 5000, "seed": 7}"#).unwrap();
        assert!((config.autosave_interval_ms - 5000.0).abs() < 1e-9);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.save_key, "message_idle_save");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json("{autosave").is_err());
    }

    #[test]
    fn storage_overrides() {
        let mut storage = MemoryStorage::new();
        assert_eq!(EngineConfig::from_storage(&storage, CONFIG_KEY), EngineConfig::default());

        storage.write(CONFIG_KEY, r#"{"save_key": "slot_2"}"#).unwrap();
        let config = EngineConfig::from_storage(&storage, CONFIG_KEY);
        assert_eq!(config.save_key, "slot_2");
        assert!((config.autosave_interval_ms - 30_000.0).abs() < 1e-9);

        storage.write(CONFIG_KEY, "not json").unwrap();
        assert_eq!(EngineConfig::from_storage(&storage, CONFIG_KEY), EngineConfig::default());
    }
}
