/// Economy state definitions.
///
/// Everything in here is plain data plus the small amount of bookkeeping
/// that keeps its invariants (currency promotion, level accessors). Costs
/// and rates live in `formulas`, mutations in `logic`.
use tracing::{error, warn};

/// Generator tiers, in unlock order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneratorId {
    /// Primary producer: message bots.
    Bot,
    /// Dependent producer: cascades amplify a fraction of the bots' base output.
    Cascade,
    /// Non-producing tier that opens the research layer.
    Research,
}

impl GeneratorId {
    /// All generators in display order.
    pub fn all() -> &'static [GeneratorId] {
        &[GeneratorId::Bot, GeneratorId::Cascade, GeneratorId::Research]
    }

    /// Position in `EconomyState::generators`.
    pub fn index(self) -> usize {
        match self {
            GeneratorId::Bot => 0,
            GeneratorId::Cascade => 1,
            GeneratorId::Research => 2,
        }
    }

    /// Stable key used in snapshots.
    pub fn key(self) -> &'static str {
        match self {
            GeneratorId::Bot => "bot",
            GeneratorId::Cascade => "cascade",
            GeneratorId::Research => "research",
        }
    }

    pub fn from_key(key: &str) -> Option<GeneratorId> {
        GeneratorId::all().iter().copied().find(|id| id.key() == key)
    }

    /// Label of the tier itself.
    pub fn label(self) -> &'static str {
        match self {
            GeneratorId::Bot => "Message Bots",
            GeneratorId::Cascade => "Cascades",
            GeneratorId::Research => "Research Lab",
        }
    }

    /// Plural name of one unit.
    pub fn unit_name(self) -> &'static str {
        match self {
            GeneratorId::Bot => "bots",
            GeneratorId::Cascade => "cascades",
            GeneratorId::Research => "labs",
        }
    }

    /// Messages paid once to unlock this tier. Never cost-reduced.
    pub fn unlock_cost(self) -> u64 {
        match self {
            GeneratorId::Bot => 1_000,
            GeneratorId::Cascade => 50_000,
            GeneratorId::Research => 1_000_000,
        }
    }

    /// Tier that must be unlocked first.
    pub fn prerequisite(self) -> Option<GeneratorId> {
        match self {
            GeneratorId::Bot => None,
            GeneratorId::Cascade => Some(GeneratorId::Bot),
            GeneratorId::Research => Some(GeneratorId::Cascade),
        }
    }

    /// Units granted for free on unlock. They are not counted by the unit
    /// cost exponent and they are what a prestige resets the count to.
    pub fn free_units(self) -> u32 {
        match self {
            GeneratorId::Bot => 1,
            GeneratorId::Cascade | GeneratorId::Research => 0,
        }
    }

    /// Whether this tier has purchasable units and production.
    pub fn produces(self) -> bool {
        !matches!(self, GeneratorId::Research)
    }

    /// Per-generator upgrades that exist for this tier. Prestige requires
    /// every one of them at its cap.
    pub fn upgrades(self) -> &'static [GeneratorUpgrade] {
        match self {
            GeneratorId::Bot => &[
                GeneratorUpgrade::Efficiency,
                GeneratorUpgrade::Speed,
                GeneratorUpgrade::AutoBuyDelay,
            ],
            GeneratorId::Cascade => &[
                GeneratorUpgrade::Efficiency,
                GeneratorUpgrade::CascadeEfficiency,
                GeneratorUpgrade::AutoBuyDelay,
            ],
            GeneratorId::Research => &[],
        }
    }

    /// Candidate display names, drawn once per save.
    pub fn name_pool(self) -> &'static [&'static str] {
        match self {
            GeneratorId::Bot => &[
                "Chatterbox",
                "Pingu",
                "Echo",
                "Relay",
                "Whisper",
                "Beacon",
            ],
            GeneratorId::Cascade => &[
                "Avalanche",
                "Waterfall",
                "Ripple",
                "Torrent",
                "Echo",
                "Chain Mail",
            ],
            GeneratorId::Research => &["Archive", "Library", "Observatory", "Beacon", "Lab 7"],
        }
    }
}

/// Upgrades owned by a single generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneratorUpgrade {
    /// Compounding efficiency multiplier on the generator's own output.
    Efficiency,
    /// Bot only: compounding per-unit speed.
    Speed,
    /// Cascade only: raises the share of bot output each cascade amplifies.
    CascadeEfficiency,
    /// Shortens the auto-buy cooldown.
    AutoBuyDelay,
}

impl GeneratorUpgrade {
    pub fn name(self) -> &'static str {
        match self {
            GeneratorUpgrade::Efficiency => "Efficiency",
            GeneratorUpgrade::Speed => "Speed",
            GeneratorUpgrade::CascadeEfficiency => "Cascade Efficiency",
            GeneratorUpgrade::AutoBuyDelay => "Auto-buy Delay",
        }
    }
}

/// Account-wide upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlobalUpgrade {
    AutoBoost,
    MessageMultiplier,
    CostEfficiency,
    ManualPower,
}

impl GlobalUpgrade {
    pub fn all() -> &'static [GlobalUpgrade] {
        &[
            GlobalUpgrade::AutoBoost,
            GlobalUpgrade::MessageMultiplier,
            GlobalUpgrade::CostEfficiency,
            GlobalUpgrade::ManualPower,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            GlobalUpgrade::AutoBoost => "Auto Boost",
            GlobalUpgrade::MessageMultiplier => "Message Multiplier",
            GlobalUpgrade::CostEfficiency => "Cost Efficiency",
            GlobalUpgrade::ManualPower => "Manual Power",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            GlobalUpgrade::AutoBoost => "All generator output x1.10 per level",
            GlobalUpgrade::MessageMultiplier => "All income x1.15 per level",
            GlobalUpgrade::CostEfficiency => "Purchase costs -5% per level (max -50%)",
            GlobalUpgrade::ManualPower => "+1 message per typed message",
        }
    }

    /// Fixed level cap. Global upgrades are not affected by prestige.
    pub fn max_level(self) -> u32 {
        match self {
            GlobalUpgrade::AutoBoost => 25,
            GlobalUpgrade::MessageMultiplier => 20,
            GlobalUpgrade::CostEfficiency => 10,
            GlobalUpgrade::ManualPower => 50,
        }
    }
}

/// Research branches, each a compounding production bonus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResearchBranch {
    Manual,
    Bot,
    Cascade,
}

impl ResearchBranch {
    pub fn all() -> &'static [ResearchBranch] {
        &[ResearchBranch::Manual, ResearchBranch::Bot, ResearchBranch::Cascade]
    }

    pub fn name(self) -> &'static str {
        match self {
            ResearchBranch::Manual => "Manual Research",
            ResearchBranch::Bot => "Bot Research",
            ResearchBranch::Cascade => "Cascade Research",
        }
    }

    /// The producing generator this branch boosts, if any.
    pub fn for_generator(id: GeneratorId) -> Option<ResearchBranch> {
        match id {
            GeneratorId::Bot => Some(ResearchBranch::Bot),
            GeneratorId::Cascade => Some(ResearchBranch::Cascade),
            GeneratorId::Research => None,
        }
    }
}

/// Spendable currency: exact whole units plus a sub-unit accumulator.
///
/// Production is continuous, so it is credited into `fractional`; whenever
/// the accumulator reaches a whole unit the integer part moves into `whole`
/// and `lifetime`. Cost comparisons therefore never see drift in the
/// integral part.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Messages {
    /// Whole units available to spend.
    pub whole: u64,
    /// Accumulator, always in `[0, 1)`.
    pub fractional: f64,
    /// Whole units ever promoted (lifetime earnings).
    pub lifetime: u64,
}

impl Messages {
    /// Spendable total (`whole + fractional`).
    pub fn total(&self) -> f64 {
        self.whole as f64 + self.fractional
    }

    pub fn can_afford(&self, cost: f64) -> bool {
        self.total() >= cost
    }

    /// Add `amount` through the accumulator, promoting whole units.
    pub fn credit(&mut self, amount: f64) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        self.fractional += amount;
        self.promote();
    }

    /// Deduct `cost`, fractional part first.
    ///
    /// Callers check affordability beforehand; running `whole` below zero
    /// is an invariant violation and is clamped.
    pub fn spend(&mut self, cost: f64) {
        if !cost.is_finite() || cost <= 0.0 {
            return;
        }
        if self.fractional >= cost {
            self.fractional -= cost;
            return;
        }
        let shortfall = cost - self.fractional;
        let debit = shortfall.ceil();
        // Sub-unit remainder of the debit stays in the accumulator so the
        // total drops by exactly `cost` while `whole` stays integral.
        self.fractional = (debit - shortfall).clamp(0.0, 1.0 - f64::EPSILON);
        let debit = debit as u64;
        match self.whole.checked_sub(debit) {
            Some(rest) => self.whole = rest,
            None => {
                error!(
                    whole = self.whole,
                    debit, "message balance would go negative; clamping to zero"
                );
                self.whole = 0;
                self.fractional = 0.0;
            }
        }
    }

    fn promote(&mut self) {
        if self.fractional >= 1.0 {
            let promoted = self.fractional.floor();
            self.fractional -= promoted;
            let promoted = promoted as u64;
            self.whole = self.whole.saturating_add(promoted);
            self.lifetime = self.lifetime.saturating_add(promoted);
        }
        if !(0.0..1.0).contains(&self.fractional) {
            warn!(fractional = self.fractional, "accumulator out of range; clamping");
            self.fractional = self.fractional.clamp(0.0, 1.0 - f64::EPSILON);
        }
    }
}

/// A single generator's owned state.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorState {
    pub id: GeneratorId,
    /// Monotonic: never reset once true.
    pub unlocked: bool,
    /// Bots or cascades owned.
    pub units: u32,
    /// Canonical efficiency level; the multiplier is derived from it.
    pub efficiency_level: u32,
    pub speed_level: u32,
    pub cascade_efficiency_level: u32,
    /// Auto-buy switched on.
    pub auto_buy: bool,
    /// One-time unlock of the auto-buy feature.
    pub auto_buy_purchased: bool,
    pub auto_buy_delay_level: u32,
    pub prestige_level: u32,
    /// Assigned once on first preview or unlock.
    pub display_name: Option<String>,
}

impl GeneratorState {
    pub fn new(id: GeneratorId) -> Self {
        Self {
            id,
            unlocked: false,
            units: 0,
            efficiency_level: 0,
            speed_level: 0,
            cascade_efficiency_level: 0,
            auto_buy: false,
            auto_buy_purchased: false,
            auto_buy_delay_level: 0,
            prestige_level: 0,
            display_name: None,
        }
    }

    pub fn level(&self, upgrade: GeneratorUpgrade) -> u32 {
        match upgrade {
            GeneratorUpgrade::Efficiency => self.efficiency_level,
            GeneratorUpgrade::Speed => self.speed_level,
            GeneratorUpgrade::CascadeEfficiency => self.cascade_efficiency_level,
            GeneratorUpgrade::AutoBuyDelay => self.auto_buy_delay_level,
        }
    }

    pub fn level_mut(&mut self, upgrade: GeneratorUpgrade) -> &mut u32 {
        match upgrade {
            GeneratorUpgrade::Efficiency => &mut self.efficiency_level,
            GeneratorUpgrade::Speed => &mut self.speed_level,
            GeneratorUpgrade::CascadeEfficiency => &mut self.cascade_efficiency_level,
            GeneratorUpgrade::AutoBuyDelay => &mut self.auto_buy_delay_level,
        }
    }

    /// Name shown to the player, falling back to the tier label.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.id.label())
    }
}

/// Levels of the four account-wide upgrades.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalUpgrades {
    pub auto_boost: u32,
    pub message_multiplier: u32,
    pub cost_efficiency: u32,
    pub manual_power: u32,
}

impl GlobalUpgrades {
    pub fn level(&self, kind: GlobalUpgrade) -> u32 {
        match kind {
            GlobalUpgrade::AutoBoost => self.auto_boost,
            GlobalUpgrade::MessageMultiplier => self.message_multiplier,
            GlobalUpgrade::CostEfficiency => self.cost_efficiency,
            GlobalUpgrade::ManualPower => self.manual_power,
        }
    }

    pub fn level_mut(&mut self, kind: GlobalUpgrade) -> &mut u32 {
        match kind {
            GlobalUpgrade::AutoBoost => &mut self.auto_boost,
            GlobalUpgrade::MessageMultiplier => &mut self.message_multiplier,
            GlobalUpgrade::CostEfficiency => &mut self.cost_efficiency,
            GlobalUpgrade::ManualPower => &mut self.manual_power,
        }
    }
}

/// Research layer: a one-time gate plus three capped branches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Research {
    pub global_boost: bool,
    pub manual: u32,
    pub bot: u32,
    pub cascade: u32,
}

impl Research {
    pub fn level(&self, branch: ResearchBranch) -> u32 {
        match branch {
            ResearchBranch::Manual => self.manual,
            ResearchBranch::Bot => self.bot,
            ResearchBranch::Cascade => self.cascade,
        }
    }

    pub fn level_mut(&mut self, branch: ResearchBranch) -> &mut u32 {
        match branch {
            ResearchBranch::Manual => &mut self.manual,
            ResearchBranch::Bot => &mut self.bot,
            ResearchBranch::Cascade => &mut self.cascade,
        }
    }
}

/// How numbers are rendered by the presentation layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NumberMode {
    /// Comma-grouped digits.
    #[default]
    Standard,
    /// 1.23K / 4.56M / ...
    Abbreviated,
    /// 1.23e6
    Scientific,
}

impl NumberMode {
    pub fn index(self) -> u8 {
        match self {
            NumberMode::Standard => 0,
            NumberMode::Abbreviated => 1,
            NumberMode::Scientific => 2,
        }
    }

    pub fn from_index(idx: u8) -> NumberMode {
        match idx {
            1 => NumberMode::Abbreviated,
            2 => NumberMode::Scientific,
            _ => NumberMode::Standard,
        }
    }

    /// Next mode in the settings cycle.
    pub fn next(self) -> NumberMode {
        NumberMode::from_index((self.index() + 1) % 3)
    }
}

/// Player settings. Persisted separately and untouched by reset.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub number_mode: NumberMode,
    pub primary_color: String,
    pub accent_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            number_mode: NumberMode::Standard,
            primary_color: "#5865f2".into(),
            accent_color: "#57f287".into(),
        }
    }
}

/// Full economy state. Owned by `Economy`; every formula and transaction
/// takes it explicitly.
#[derive(Clone, Debug, PartialEq)]
pub struct EconomyState {
    pub messages: Messages,
    /// One entry per generator, in `GeneratorId::all()` order.
    pub generators: Vec<GeneratorState>,
    pub upgrades: GlobalUpgrades,
    pub research: Research,
    /// Wall-clock time played, in milliseconds.
    pub playtime_ms: f64,
    /// Manual messages typed.
    pub total_manual_events: u64,
    /// Highest production rate seen (messages/sec).
    pub best_production: f64,
    /// LCG state for display-name draws.
    pub rng_seed: u64,
}

impl Default for EconomyState {
    fn default() -> Self {
        Self::new()
    }
}

impl EconomyState {
    pub fn new() -> Self {
        Self {
            messages: Messages::default(),
            generators: GeneratorId::all()
                .iter()
                .map(|&id| GeneratorState::new(id))
                .collect(),
            upgrades: GlobalUpgrades::default(),
            research: Research::default(),
            playtime_ms: 0.0,
            total_manual_events: 0,
            best_production: 0.0,
            rng_seed: 42,
        }
    }

    /// Start a new economy with a given RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng_seed: seed,
            ..Self::new()
        }
    }

    pub fn generator(&self, id: GeneratorId) -> &GeneratorState {
        &self.generators[id.index()]
    }

    pub fn generator_mut(&mut self, id: GeneratorId) -> &mut GeneratorState {
        &mut self.generators[id.index()]
    }

    pub fn is_unlocked(&self, id: GeneratorId) -> bool {
        self.generator(id).unlocked
    }

    /// Advance the LCG and return the next pseudo-random value.
    pub fn next_random(&mut self) -> u32 {
        self.rng_seed = self
            .rng_seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng_seed >> 33) as u32
    }
}
