//! Economy save/load.
//!
//! ## Versioning
//!
//! - `SAVE_VERSION`: current snapshot format. Bump it when fields are added.
//! - `MIN_COMPATIBLE_VERSION`: oldest format that can still be read. Only
//!   bump it for breaking changes (a field changing meaning or disappearing).
//!
//! Every save struct is `#[serde(default)]`, so a snapshot from any version
//! at or above `MIN_COMPATIBLE_VERSION` is merged field-by-field over a
//! fresh state: whatever is missing keeps its default, unknown fields are
//! ignored.
//!
//! ## v2 changes
//! - Generator efficiency is stored as `efficiency_level`. v1 stored the
//!   compounded multiplier as `efficiency`; it is converted on load.
//! - Added `fractional_messages` and `research`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::formulas;
use super::state::{
    EconomyState, GeneratorId, GlobalUpgrade, NumberMode, ResearchBranch, Settings,
};

/// Snapshot format version. Bump on every field addition.
pub const SAVE_VERSION: u32 = 2;

/// Oldest snapshot version that can be migrated.
pub const MIN_COMPATIBLE_VERSION: u32 = 1;

/// Failures reading or writing persisted data. Denied in-game actions are
/// never reported through this type.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid save file")]
    InvalidSaveFile,
    #[error("save version {saved} is older than the oldest supported version {min}")]
    IncompatibleVersion { saved: u32, min: u32 },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Key-value persistence backend.
pub trait Storage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError>;
    fn remove(&mut self, key: &str) -> Result<(), SaveError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        (**self).remove(key)
    }
}

/// In-memory storage for tests and native runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Browser localStorage. Only available in the WASM build.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    inner: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn open() -> Option<Self> {
        let inner = web_sys::window()?.local_storage().ok()??;
        Some(Self { inner })
    }
}

#[cfg(target_arch = "wasm32")]
impl Storage for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        self.inner
            .get_item(key)
            .map_err(|e| SaveError::Storage(format!("{e:?}")))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SaveError> {
        self.inner
            .set_item(key, value)
            .map_err(|e| SaveError::Storage(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        self.inner
            .remove_item(key)
            .map_err(|e| SaveError::Storage(format!("{e:?}")))
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct SaveData {
    pub(crate) version: u32,
    pub(crate) game: EconomySave,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
pub(crate) struct EconomySave {
    messages: u64,
    fractional_messages: f64,
    lifetime_messages: u64,

    /// Keys of unlocked generators.
    unlocked: Vec<String>,
    generators: Vec<GeneratorSave>,

    upgrades: UpgradesSave,
    research: ResearchSave,

    playtime_ms: f64,
    total_manual_events: u64,
    best_production: f64,
    #[serde(default = "default_seed")]
    rng_seed: u64,
}

fn default_seed() -> u64 {
    42
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct GeneratorSave {
    id: String,
    units: u32,
    efficiency_level: u32,
    /// v1 only: compounded efficiency multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    efficiency: Option<f64>,
    speed_level: u32,
    cascade_efficiency_level: u32,
    auto_buy: bool,
    auto_buy_purchased: bool,
    auto_buy_delay_level: u32,
    prestige_level: u32,
    display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct UpgradesSave {
    auto_boost: u32,
    message_multiplier: u32,
    cost_efficiency: u32,
    manual_power: u32,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct ResearchSave {
    global_boost: bool,
    manual: u32,
    bot: u32,
    cascade: u32,
}

/// Extract the persisted part of the state.
pub(crate) fn extract_save(state: &EconomyState) -> SaveData {
    SaveData {
        version: SAVE_VERSION,
        game: EconomySave {
            messages: state.messages.whole,
            fractional_messages: state.messages.fractional,
            lifetime_messages: state.messages.lifetime,
            unlocked: state
                .generators
                .iter()
                .filter(|g| g.unlocked)
                .map(|g| g.id.key().to_string())
                .collect(),
            generators: state
                .generators
                .iter()
                .map(|g| GeneratorSave {
                    id: g.id.key().to_string(),
                    units: g.units,
                    efficiency_level: g.efficiency_level,
                    efficiency: None,
                    speed_level: g.speed_level,
                    cascade_efficiency_level: g.cascade_efficiency_level,
                    auto_buy: g.auto_buy,
                    auto_buy_purchased: g.auto_buy_purchased,
                    auto_buy_delay_level: g.auto_buy_delay_level,
                    prestige_level: g.prestige_level,
                    display_name: g.display_name.clone(),
                })
                .collect(),
            upgrades: UpgradesSave {
                auto_boost: state.upgrades.auto_boost,
                message_multiplier: state.upgrades.message_multiplier,
                cost_efficiency: state.upgrades.cost_efficiency,
                manual_power: state.upgrades.manual_power,
            },
            research: ResearchSave {
                global_boost: state.research.global_boost,
                manual: state.research.manual,
                bot: state.research.bot,
                cascade: state.research.cascade,
            },
            playtime_ms: state.playtime_ms,
            total_manual_events: state.total_manual_events,
            best_production: state.best_production,
            rng_seed: state.rng_seed,
        },
    }
}

/// Merge a snapshot over `state`. Entries for unknown generators are
/// skipped; out-of-range values are clamped back inside their invariants.
/// A prestige level no game could reach rejects the whole snapshot.
pub(crate) fn apply_save(state: &mut EconomyState, save: &EconomySave) -> Result<(), SaveError> {
    if let Some(entry) = save
        .generators
        .iter()
        .find(|g| g.prestige_level > formulas::MAX_PRESTIGE_LEVEL)
    {
        warn!(key = %entry.id, prestige = entry.prestige_level, "prestige level out of range");
        return Err(SaveError::InvalidSaveFile);
    }

    state.messages.whole = save.messages;
    state.messages.fractional = if (0.0..1.0).contains(&save.fractional_messages) {
        save.fractional_messages
    } else {
        warn!(value = save.fractional_messages, "fractional messages out of range; reset");
        0.0
    };
    state.messages.lifetime = save.lifetime_messages.max(save.messages);

    for key in &save.unlocked {
        match GeneratorId::from_key(key) {
            Some(id) => state.generator_mut(id).unlocked = true,
            None => warn!(%key, "unknown generator in save; ignored"),
        }
    }

    for entry in &save.generators {
        let Some(id) = GeneratorId::from_key(&entry.id) else {
            warn!(key = %entry.id, "unknown generator in save; ignored");
            continue;
        };
        let gen = state.generator_mut(id);
        gen.units = entry.units;
        gen.efficiency_level = match entry.efficiency {
            Some(multiplier) if entry.efficiency_level == 0 => {
                formulas::level_from_multiplier(multiplier, formulas::EFFICIENCY_FACTOR)
            }
            _ => entry.efficiency_level,
        };
        gen.speed_level = entry.speed_level;
        gen.cascade_efficiency_level = entry.cascade_efficiency_level;
        gen.auto_buy_purchased = entry.auto_buy_purchased;
        gen.auto_buy = entry.auto_buy && entry.auto_buy_purchased;
        gen.auto_buy_delay_level = entry.auto_buy_delay_level;
        gen.prestige_level = entry.prestige_level;
        gen.display_name = entry.display_name.clone();
    }

    for &kind in GlobalUpgrade::all() {
        let level = match kind {
            GlobalUpgrade::AutoBoost => save.upgrades.auto_boost,
            GlobalUpgrade::MessageMultiplier => save.upgrades.message_multiplier,
            GlobalUpgrade::CostEfficiency => save.upgrades.cost_efficiency,
            GlobalUpgrade::ManualPower => save.upgrades.manual_power,
        };
        *state.upgrades.level_mut(kind) = level;
    }

    state.research.global_boost = save.research.global_boost;
    state.research.manual = save.research.manual;
    state.research.bot = save.research.bot;
    state.research.cascade = save.research.cascade;

    state.playtime_ms = save.playtime_ms.max(0.0);
    state.total_manual_events = save.total_manual_events;
    state.best_production = save.best_production.max(0.0);
    state.rng_seed = save.rng_seed;

    clamp_to_caps(state);
    Ok(())
}

/// Pull any level above its cap back down. A snapshot should never hold
/// one; if it does the cap wins.
fn clamp_to_caps(state: &mut EconomyState) {
    for gen in &mut state.generators {
        let id = gen.id;
        for &upgrade in id.upgrades() {
            let cap = formulas::max_level(id, upgrade, gen.prestige_level);
            let level = gen.level_mut(upgrade);
            if *level > cap {
                warn!(generator = id.key(), upgrade = upgrade.name(), level = *level, cap, "level above cap");
                *level = cap;
            }
        }
        let unit_cap = formulas::max_units(id, gen.prestige_level).max(id.free_units());
        if gen.units > unit_cap {
            warn!(generator = id.key(), units = gen.units, cap = unit_cap, "units above cap");
            gen.units = unit_cap;
        }
    }
    for &kind in GlobalUpgrade::all() {
        let level = state.upgrades.level_mut(kind);
        if *level > kind.max_level() {
            warn!(upgrade = kind.name(), level = *level, "global level above cap");
            *level = kind.max_level();
        }
    }
    for &branch in ResearchBranch::all() {
        let level = state.research.level_mut(branch);
        if *level > formulas::RESEARCH_MAX_LEVEL {
            warn!(branch = branch.name(), level = *level, "research level above cap");
            *level = formulas::RESEARCH_MAX_LEVEL;
        }
    }
}

/// Serialize the state into snapshot JSON.
pub fn encode_snapshot(state: &EconomyState) -> Result<String, SaveError> {
    Ok(serde_json::to_string(&extract_save(state))?)
}

/// Parse snapshot JSON and merge it over a fresh state.
pub fn decode_snapshot(json: &str) -> Result<EconomyState, SaveError> {
    let save_data: SaveData = serde_json::from_str(json)?;
    if save_data.version < MIN_COMPATIBLE_VERSION {
        return Err(SaveError::IncompatibleVersion {
            saved: save_data.version,
            min: MIN_COMPATIBLE_VERSION,
        });
    }
    if save_data.version < SAVE_VERSION {
        info!(
            saved = save_data.version,
            current = SAVE_VERSION,
            "migrating old save"
        );
    }
    let mut state = EconomyState::new();
    apply_save(&mut state, &save_data.game)?;
    Ok(state)
}

/// Write the state under `key`.
pub fn save_game<S: Storage + ?Sized>(
    storage: &mut S,
    key: &str,
    state: &EconomyState,
) -> Result<(), SaveError> {
    let json = encode_snapshot(state)?;
    storage.write(key, &json)
}

/// Read the state stored under `key`. `Ok(None)` when nothing is saved; a
/// corrupt or incompatible snapshot is an error and is left in place.
pub fn load_game<S: Storage + ?Sized>(
    storage: &S,
    key: &str,
) -> Result<Option<EconomyState>, SaveError> {
    match storage.read(key)? {
        Some(json) => decode_snapshot(&json).map(Some),
        None => Ok(None),
    }
}

/// Remove the stored snapshot.
pub fn delete_save<S: Storage + ?Sized>(storage: &mut S, key: &str) -> Result<(), SaveError> {
    storage.remove(key)
}

// ── Settings ────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct SettingsSave {
    number_mode: u8,
    primary_color: String,
    accent_color: String,
}

impl Default for SettingsSave {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            number_mode: settings.number_mode.index(),
            primary_color: settings.primary_color,
            accent_color: settings.accent_color,
        }
    }
}

pub fn save_settings<S: Storage + ?Sized>(
    storage: &mut S,
    key: &str,
    settings: &Settings,
) -> Result<(), SaveError> {
    let save = SettingsSave {
        number_mode: settings.number_mode.index(),
        primary_color: settings.primary_color.clone(),
        accent_color: settings.accent_color.clone(),
    };
    storage.write(key, &serde_json::to_string(&save)?)
}

/// Load settings, falling back to defaults when none are stored.
pub fn load_settings<S: Storage + ?Sized>(storage: &S, key: &str) -> Result<Settings, SaveError> {
    let Some(json) = storage.read(key)? else {
        return Ok(Settings::default());
    };
    let save: SettingsSave = serde_json::from_str(&json)?;
    Ok(Settings {
        number_mode: NumberMode::from_index(save.number_mode),
        primary_color: save.primary_color,
        accent_color: save.accent_color,
    })
}
