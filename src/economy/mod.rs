//! Message economy: generators, upgrades, research and prestige.
//!
//! `Economy` is the single owner of the state. The host feeds it frame
//! timestamps and player actions; it runs the fixed-rate tick, persists
//! after every successful transaction and on a wall-clock autosave timer.

pub mod actions;
pub mod codec;
pub mod format;
pub mod formulas;
pub mod logic;
pub mod rate;
pub mod save;
pub mod state;
pub mod tick;
pub mod view;

use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::time::GameTime;

use actions::Action;
use rate::ManualRate;
use save::{SaveError, Storage};
use state::{EconomyState, GeneratorId, GlobalUpgrade, Messages, NumberMode, Settings};
use tick::{AutoBuyClock, TickReport};
use view::{GeneratorView, GlobalUpgradeView, ResearchView};

pub struct Economy<S: Storage> {
    state: EconomyState,
    settings: Settings,
    config: EngineConfig,
    storage: S,
    clock: GameTime,
    auto_buy: AutoBuyClock,
    manual: ManualRate,
    /// Wall-clock ms since the last autosave.
    since_save_ms: f64,
}

impl<S: Storage> Economy<S> {
    /// Start a brand new economy without reading storage.
    pub fn new(storage: S, config: EngineConfig) -> Self {
        let state = match config.seed {
            Some(seed) => EconomyState::with_seed(seed),
            None => EconomyState::new(),
        };
        Self::assemble(storage, config, state, Settings::default())
    }

    /// Restore the economy and settings from storage. Missing data starts
    /// fresh; unreadable data is an error.
    pub fn load(storage: S, config: EngineConfig) -> Result<Self, SaveError> {
        let state = save::load_game(&storage, &config.save_key)?;
        let settings = save::load_settings(&storage, &config.settings_key)?;
        let mut economy = Self::new(storage, config);
        if let Some(state) = state {
            economy.state = state;
            info!("economy restored");
        }
        economy.settings = settings;
        Ok(economy)
    }

    /// Like `load`, but never fails. An unreadable snapshot is moved to
    /// `<save_key>.corrupt` before a fresh economy takes its place.
    pub fn load_or_default(mut storage: S, config: EngineConfig) -> Self {
        let state = match save::load_game(&storage, &config.save_key) {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "saved economy unreadable; starting fresh");
                back_up_corrupt(&mut storage, &config.save_key);
                None
            }
        };
        let settings = save::load_settings(&storage, &config.settings_key).unwrap_or_else(|e| {
            warn!(error = %e, "settings unreadable; using defaults");
            Settings::default()
        });
        let mut economy = Self::new(storage, config);
        if let Some(state) = state {
            economy.state = state;
        }
        economy.settings = settings;
        economy
    }

    fn assemble(storage: S, config: EngineConfig, state: EconomyState, settings: Settings) -> Self {
        Self {
            clock: GameTime::new(formulas::TICKS_PER_SEC, config.max_catch_up_ms),
            manual: ManualRate::new(config.manual_window_ms),
            auto_buy: AutoBuyClock::new(),
            since_save_ms: 0.0,
            state,
            settings,
            config,
            storage,
        }
    }

    // ── Frame loop ──────────────────────────────────────────────

    /// Advance to wall-clock time `now_ms`: playtime, whole ticks of
    /// production and auto-buy, and the periodic autosave. Automatic
    /// purchases save right away like any other transaction.
    pub fn frame(&mut self, now_ms: f64) -> TickReport {
        let step = self.clock.update(now_ms);
        tick::advance_playtime(&mut self.state, step.elapsed_ms);
        let report = tick::tick(&mut self.state, &mut self.auto_buy, step.ticks);

        self.since_save_ms += step.elapsed_ms;
        if !report.auto_bought.is_empty() || self.since_save_ms >= self.config.autosave_interval_ms
        {
            self.since_save_ms = 0.0;
            self.persist();
        }
        report
    }

    // ── Transactions ────────────────────────────────────────────

    /// Run a player action. Saves when it succeeds.
    pub fn apply(&mut self, action: Action) -> bool {
        if action == Action::Generate {
            let now = self.clock.last_timestamp().unwrap_or(0.0);
            self.generate_manually(now);
            return true;
        }
        let ok = actions::dispatch(&mut self.state, action);
        if ok {
            self.persist();
        }
        ok
    }

    /// One manual message at `now_ms`. Returns the amount credited.
    pub fn generate_manually(&mut self, now_ms: f64) -> f64 {
        let gain = logic::generate_manually(&mut self.state);
        self.manual.record(now_ms);
        self.persist();
        gain
    }

    /// Wipe the economy. Settings survive.
    pub fn reset(&mut self) {
        logic::reset(&mut self.state);
        self.auto_buy = AutoBuyClock::new();
        self.manual.clear();
        self.since_save_ms = 0.0;
        self.persist();
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Save the economy now.
    pub fn save(&mut self) -> Result<(), SaveError> {
        save::save_game(&mut self.storage, &self.config.save_key, &self.state)
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "save failed");
        }
    }

    pub fn export(&self) -> Result<String, SaveError> {
        codec::export_save(&self.state)
    }

    /// Replace the economy with an exported one. On error nothing changes.
    pub fn import(&mut self, text: &str) -> Result<(), SaveError> {
        self.state = codec::import_save(text)?;
        self.auto_buy = AutoBuyClock::new();
        self.manual.clear();
        info!("save imported");
        self.save()
    }

    // ── Settings ────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_number_mode(&mut self, mode: NumberMode) {
        self.settings.number_mode = mode;
        self.persist_settings();
    }

    pub fn cycle_number_mode(&mut self) -> NumberMode {
        self.set_number_mode(self.settings.number_mode.next());
        self.settings.number_mode
    }

    pub fn set_colors(&mut self, primary: &str, accent: &str) {
        self.settings.primary_color = primary.to_string();
        self.settings.accent_color = accent.to_string();
        self.persist_settings();
    }

    fn persist_settings(&mut self) {
        if let Err(e) = save::save_settings(&mut self.storage, &self.config.settings_key, &self.settings)
        {
            warn!(error = %e, "settings save failed");
        }
    }

    /// Render a number using the player's display mode.
    pub fn format(&self, value: f64) -> String {
        format::format_number(value, self.settings.number_mode)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn state(&self) -> &EconomyState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn messages(&self) -> &Messages {
        &self.state.messages
    }

    /// Income from generators (messages/sec).
    pub fn total_production(&self) -> f64 {
        formulas::total_production(&self.state)
    }

    /// Average manual income over the recent window (messages/sec).
    pub fn manual_rate(&mut self, now_ms: f64) -> f64 {
        self.manual.rate(&self.state, now_ms)
    }

    pub fn generator_view(&self, id: GeneratorId) -> GeneratorView {
        view::generator_view(&self.state, &self.auto_buy, id)
    }

    pub fn global_upgrade_view(&self, kind: GlobalUpgrade) -> GlobalUpgradeView {
        view::global_upgrade_view(&self.state, kind)
    }

    pub fn research_view(&self) -> ResearchView {
        view::research_view(&self.state)
    }
}

fn back_up_corrupt<S: Storage>(storage: &mut S, key: &str) {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        _ => return,
    };
    let backup_key = format!("{key}.corrupt");
    if let Err(e) = storage.write(&backup_key, &raw) {
        // Keep the only copy where it is.
        warn!(error = %e, "could not back up corrupt save");
        return;
    }
    if let Err(e) = save::delete_save(storage, key) {
        warn!(error = %e, "could not clear corrupt save");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::save::MemoryStorage;

    fn economy() -> Economy<MemoryStorage> {
        Economy::new(MemoryStorage::new(), EngineConfig::default())
    }

    #[test]
    fn frame_runs_whole_ticks() {
        let mut eco = economy();
        eco.state.messages.whole = 1_000;
        assert!(eco.apply(Action::Unlock(GeneratorId::Bot)));
        eco.frame(0.0);
        eco.frame(1_500.0); // 15 ticks at 1 msg/s
        assert_eq!(eco.messages().whole, 1);
        assert!((eco.state().playtime_ms - 1_500.0).abs() < 1e-9);
    }

    #[test]
    fn successful_transaction_saves() {
        let mut eco = economy();
        eco.state.messages.whole = 1_000;
        assert!(eco.apply(Action::Unlock(GeneratorId::Bot)));
        let saved = save::load_game(eco.storage(), &eco.config().save_key)
            .unwrap()
            .unwrap();
        assert!(saved.is_unlocked(GeneratorId::Bot));
    }

    #[test]
    fn denied_transaction_does_not_save() {
        let mut eco = economy();
        eco.state.messages.whole = 500;
        assert!(!eco.apply(Action::Unlock(GeneratorId::Bot)));
        assert!(save::load_game(eco.storage(), &eco.config().save_key)
            .unwrap()
            .is_none());
    }

    #[test]
    fn autosave_after_interval() {
        let mut eco = economy();
        eco.frame(0.0);
        eco.frame(29_000.0);
        assert!(eco.storage().read(&eco.config().save_key).unwrap().is_none());
        eco.frame(30_500.0);
        assert!(eco.storage().read(&eco.config().save_key).unwrap().is_some());
    }

    #[test]
    fn automatic_purchase_saves_immediately() {
        let mut eco = economy();
        eco.state.messages.whole = 100_000;
        let bot = eco.state.generator_mut(GeneratorId::Bot);
        bot.unlocked = true;
        bot.units = 1;
        bot.auto_buy_purchased = true;
        bot.auto_buy = true;

        eco.frame(0.0);
        let report = eco.frame(5_000.0);
        assert_eq!(report.auto_bought, vec![GeneratorId::Bot]);
        let saved = save::load_game(eco.storage(), &eco.config().save_key)
            .unwrap()
            .unwrap();
        assert_eq!(saved.generator(GeneratorId::Bot).units, 2);
    }

    #[test]
    fn manual_generation_feeds_rate() {
        let mut eco = economy();
        eco.generate_manually(100.0);
        eco.generate_manually(200.0);
        assert_eq!(eco.messages().whole, 2);
        assert!((eco.manual_rate(300.0) - 1.0).abs() < 1e-9);
        assert!(eco.manual_rate(5_000.0).abs() < 1e-12);
    }

    #[test]
    fn load_restores_saved_economy() {
        let mut eco = economy();
        eco.state.messages.whole = 1_000;
        eco.apply(Action::Unlock(GeneratorId::Bot));
        eco.set_number_mode(NumberMode::Abbreviated);
        let storage = eco.storage().clone();

        let restored = Economy::load(storage, EngineConfig::default()).unwrap();
        assert_eq!(restored.state(), eco.state());
        assert_eq!(restored.settings().number_mode, NumberMode::Abbreviated);
    }

    #[test]
    fn load_reports_corruption() {
        let mut storage = MemoryStorage::new();
        storage.write("message_idle_save", "garbage").unwrap();
        assert!(Economy::load(storage, EngineConfig::default()).is_err());
    }

    #[test]
    fn load_or_default_moves_corrupt_snapshot_aside() {
        let mut storage = MemoryStorage::new();
        storage.write("message_idle_save", "garbage").unwrap();
        let eco = Economy::load_or_default(storage, EngineConfig::default());
        assert_eq!(eco.state(), &EconomyState::new());
        assert_eq!(
            eco.storage().read("message_idle_save.corrupt").unwrap().as_deref(),
            Some("garbage")
        );
        assert!(eco.storage().read("message_idle_save").unwrap().is_none());

        // The next strict load starts fresh instead of failing again.
        let storage = eco.storage().clone();
        assert!(Economy::load(storage, EngineConfig::default()).is_ok());
    }

    #[test]
    fn reset_keeps_settings() {
        let mut eco = economy();
        eco.set_colors("#000000", "#ffffff");
        eco.state.messages.whole = 1_000;
        eco.apply(Action::Unlock(GeneratorId::Bot));
        eco.reset();
        assert!(!eco.state().is_unlocked(GeneratorId::Bot));
        assert_eq!(eco.settings().primary_color, "#000000");
    }

    #[test]
    fn import_replaces_state_and_bad_import_changes_nothing() {
        let mut source = economy();
        source.state.messages.whole = 77_777;
        let text = source.export().unwrap();

        let mut eco = economy();
        eco.state.messages.whole = 5;
        assert!(eco.import("nonsense").is_err());
        assert_eq!(eco.messages().whole, 5);
        eco.import(&text).unwrap();
        assert_eq!(eco.messages().whole, 77_777);
    }

    #[test]
    fn configured_seed_is_used() {
        let config = EngineConfig {
            seed: Some(1234),
            ..EngineConfig::default()
        };
        let eco = Economy::new(MemoryStorage::new(), config);
        assert_eq!(eco.state().rng_seed, 1234);
    }

    #[test]
    fn format_follows_number_mode() {
        let mut eco = economy();
        assert_eq!(eco.format(1_500.0), "1,500");
        assert_eq!(eco.cycle_number_mode(), NumberMode::Abbreviated);
        assert_eq!(eco.format(1_500.0), "1.50K");
    }
}
