//! Production, cost and cap formulas.
//!
//! Every function here is pure: same state in, same number out. Levels are
//! the source of truth; multipliers are always derived from them.
//!
//! Costs go through one rule: compute the raw value, apply the cost
//! reduction multiplier where it applies, then floor. Affordability is
//! compared against that floored value and the same value is deducted.

use super::state::{
    EconomyState, GeneratorId, GeneratorUpgrade, GlobalUpgrade, ResearchBranch,
};

/// Ticks per second of the economy loop.
pub const TICKS_PER_SEC: u32 = 10;

/// Messages per second produced by one bot before any multiplier.
pub const BOT_BASE_RATE: f64 = 1.0;
/// Per-level compounding factor of the bot speed upgrade.
pub const SPEED_FACTOR: f64 = 1.10;
/// Per-level compounding factor of generator efficiency.
pub const EFFICIENCY_FACTOR: f64 = 1.25;
/// Share of the bots' base output one cascade amplifies at level 0.
pub const CASCADE_BASE_SHARE: f64 = 0.25;
/// Per-level compounding factor of cascade efficiency.
pub const CASCADE_EFFICIENCY_FACTOR: f64 = 1.10;

pub const AUTO_BOOST_FACTOR: f64 = 1.10;
pub const MESSAGE_MULTIPLIER_FACTOR: f64 = 1.15;
pub const COST_REDUCTION_PER_LEVEL: f64 = 0.05;
pub const MAX_COST_REDUCTION: f64 = 0.5;

/// Extra levels every cap gains per prestige.
pub const PRESTIGE_CAP_STEP: u32 = 10;
/// Highest prestige level a generator can hold. Prestige prices grow 100x
/// per level, so the message balance runs out long before this.
pub const MAX_PRESTIGE_LEVEL: u32 = 1_000;

pub const RESEARCH_MAX_LEVEL: u32 = 5;
pub const MESSAGES_PER_RESEARCH_POINT: u64 = 10_000;
/// Research points the one-time global boost costs.
pub const RESEARCH_BOOST_POINTS: u64 = 10;
/// Global message multiplier granted by the research boost.
pub const RESEARCH_BOOST_MULTIPLIER: f64 = 1.5;

/// Shortest auto-buy cooldown regardless of delay level.
pub const MIN_AUTO_BUY_DELAY_MS: f64 = 100.0;
const AUTO_BUY_DELAY_FACTOR: f64 = 0.85;

// ── Multipliers ─────────────────────────────────────────────────

pub fn efficiency_multiplier(level: u32) -> f64 {
    EFFICIENCY_FACTOR.powi(level as i32)
}

pub fn speed_multiplier(level: u32) -> f64 {
    SPEED_FACTOR.powi(level as i32)
}

/// Fraction of the bots' base output each cascade amplifies.
pub fn cascade_share(level: u32) -> f64 {
    CASCADE_BASE_SHARE * CASCADE_EFFICIENCY_FACTOR.powi(level as i32)
}

/// Multiplier on every generator's output from the Auto Boost upgrade.
pub fn global_auto_boost_multiplier(state: &EconomyState) -> f64 {
    AUTO_BOOST_FACTOR.powi(state.upgrades.auto_boost as i32)
}

/// Multiplier on all income (generators and manual).
pub fn global_message_multiplier(state: &EconomyState) -> f64 {
    let base = MESSAGE_MULTIPLIER_FACTOR.powi(state.upgrades.message_multiplier as i32);
    if state.research.global_boost {
        base * RESEARCH_BOOST_MULTIPLIER
    } else {
        base
    }
}

/// Per-branch research bonus, 1.0 at level 0.
pub fn research_multiplier(state: &EconomyState, branch: ResearchBranch) -> f64 {
    let factor: f64 = match branch {
        ResearchBranch::Manual => 1.5,
        ResearchBranch::Bot | ResearchBranch::Cascade => 1.25,
    };
    factor.powi(state.research.level(branch) as i32)
}

/// Multiplier 1 - min(5% x level, 50%), applied to every purchase except
/// unlocks and research.
pub fn cost_reduction_multiplier(state: &EconomyState) -> f64 {
    let reduction = (COST_REDUCTION_PER_LEVEL * state.upgrades.cost_efficiency as f64)
        .min(MAX_COST_REDUCTION);
    1.0 - reduction
}

/// Messages credited per manual message before the global multiplier.
/// Manual Power adds one message per level.
pub fn manual_multiplier(state: &EconomyState) -> f64 {
    (1.0 + state.upgrades.manual_power as f64)
        * research_multiplier(state, ResearchBranch::Manual)
}

/// Messages credited by one manual event.
pub fn manual_gain(state: &EconomyState) -> f64 {
    manual_multiplier(state) * global_message_multiplier(state)
}

/// Recover an integer level from a compounded multiplier `factor^level`.
///
/// Only used to migrate snapshots that stored the multiplier instead of the
/// level. Floating-point drift can put `factor^n` a hair below `n`, so a
/// small epsilon is added before flooring; without it a value built by
/// repeated multiplication can come back one level short.
pub fn level_from_multiplier(value: f64, factor: f64) -> u32 {
    if !value.is_finite() || value <= 1.0 || factor <= 1.0 {
        return 0;
    }
    let level = (value.ln() / factor.ln() + 1e-9).floor();
    if level <= 0.0 {
        0
    } else {
        level as u32
    }
}

// ── Production ──────────────────────────────────────────────────

/// Output of a generator without Auto Boost or research (messages/sec).
///
/// Cascades derive from this figure for the bots, so the bots' own boosts
/// are never applied twice.
pub fn base_generator_production(state: &EconomyState, id: GeneratorId) -> f64 {
    let gen = state.generator(id);
    if !gen.unlocked {
        return 0.0;
    }
    let efficiency = efficiency_multiplier(gen.efficiency_level);
    match id {
        GeneratorId::Bot => {
            gen.units as f64 * BOT_BASE_RATE * speed_multiplier(gen.speed_level) * efficiency
        }
        GeneratorId::Cascade => {
            let upstream = base_generator_production(state, GeneratorId::Bot);
            gen.units as f64 * cascade_share(gen.cascade_efficiency_level) * efficiency * upstream
        }
        GeneratorId::Research => 0.0,
    }
}

/// Output of a generator with Auto Boost and its research branch applied.
pub fn generator_production(state: &EconomyState, id: GeneratorId) -> f64 {
    let base = base_generator_production(state, id);
    if base <= 0.0 {
        return 0.0;
    }
    let research = ResearchBranch::for_generator(id)
        .map(|b| research_multiplier(state, b))
        .unwrap_or(1.0);
    base * global_auto_boost_multiplier(state) * research
}

/// Total income rate (messages/sec) including the global multiplier.
pub fn total_production(state: &EconomyState) -> f64 {
    let sum: f64 = GeneratorId::all()
        .iter()
        .map(|&id| generator_production(state, id))
        .sum();
    sum * global_message_multiplier(state)
}

/// Messages credited by one tick of production.
pub fn production_per_tick(state: &EconomyState) -> f64 {
    total_production(state) / TICKS_PER_SEC as f64
}

// ── Caps ────────────────────────────────────────────────────────

fn base_max_level(id: GeneratorId, upgrade: GeneratorUpgrade) -> u32 {
    match (id, upgrade) {
        (GeneratorId::Bot, GeneratorUpgrade::Efficiency) => 20,
        (GeneratorId::Bot, GeneratorUpgrade::Speed) => 20,
        (GeneratorId::Bot, GeneratorUpgrade::AutoBuyDelay) => 10,
        (GeneratorId::Cascade, GeneratorUpgrade::Efficiency) => 20,
        (GeneratorId::Cascade, GeneratorUpgrade::CascadeEfficiency) => 20,
        (GeneratorId::Cascade, GeneratorUpgrade::AutoBuyDelay) => 10,
        _ => 0,
    }
}

/// Whether `upgrade` exists for generator `id`.
pub fn has_upgrade(id: GeneratorId, upgrade: GeneratorUpgrade) -> bool {
    id.upgrades().contains(&upgrade)
}

/// Level cap of a generator upgrade: base cap + 10 per prestige.
/// Zero for upgrades the generator does not have.
pub fn max_level(id: GeneratorId, upgrade: GeneratorUpgrade, prestige_level: u32) -> u32 {
    if !has_upgrade(id, upgrade) {
        return 0;
    }
    base_max_level(id, upgrade).saturating_add(PRESTIGE_CAP_STEP.saturating_mul(prestige_level))
}

/// Unit cap: base cap + 10 per prestige.
pub fn max_units(id: GeneratorId, prestige_level: u32) -> u32 {
    let base: u32 = match id {
        GeneratorId::Bot => 100,
        GeneratorId::Cascade => 50,
        GeneratorId::Research => return 0,
    };
    base.saturating_add(PRESTIGE_CAP_STEP.saturating_mul(prestige_level))
}

/// Whether every upgrade of the generator sits at its cap.
pub fn all_upgrades_maxed(state: &EconomyState, id: GeneratorId) -> bool {
    let gen = state.generator(id);
    !id.upgrades().is_empty()
        && id
            .upgrades()
            .iter()
            .all(|&u| gen.level(u) >= max_level(id, u, gen.prestige_level))
}

// ── Costs ───────────────────────────────────────────────────────

/// Apply cost reduction and floor.
pub fn reduced_cost(state: &EconomyState, raw: f64) -> f64 {
    (raw * cost_reduction_multiplier(state)).floor()
}

fn unit_base_cost(id: GeneratorId) -> (f64, f64) {
    match id {
        GeneratorId::Bot => (50.0, 1.15),
        GeneratorId::Cascade => (2_500.0, 1.20),
        GeneratorId::Research => (0.0, 1.0),
    }
}

/// Unreduced price of the next unit when `units` are owned.
///
/// Free starter units do not count toward the exponent. A bot count below
/// the free allowance (bots spent on cascades) gives a negative exponent, so
/// the price still strictly increases with the count.
pub fn raw_unit_cost(id: GeneratorId, units: u32) -> f64 {
    let (base, growth) = unit_base_cost(id);
    let exponent = units as i64 - id.free_units() as i64;
    base * growth.powi(exponent as i32)
}

/// Price of the next unit for the current state.
pub fn next_unit_cost(state: &EconomyState, id: GeneratorId) -> f64 {
    reduced_cost(state, raw_unit_cost(id, state.generator(id).units))
}

fn upgrade_base_cost(id: GeneratorId, upgrade: GeneratorUpgrade) -> (f64, f64) {
    match (id, upgrade) {
        (GeneratorId::Bot, GeneratorUpgrade::Efficiency) => (500.0, 1.8),
        (GeneratorId::Bot, GeneratorUpgrade::Speed) => (750.0, 1.9),
        (GeneratorId::Bot, GeneratorUpgrade::AutoBuyDelay) => (2_000.0, 2.5),
        (GeneratorId::Cascade, GeneratorUpgrade::Efficiency) => (5_000.0, 1.8),
        (GeneratorId::Cascade, GeneratorUpgrade::CascadeEfficiency) => (7_500.0, 2.0),
        (GeneratorId::Cascade, GeneratorUpgrade::AutoBuyDelay) => (20_000.0, 2.5),
        _ => (0.0, 1.0),
    }
}

/// Unreduced price of raising a generator upgrade from `level`.
pub fn raw_upgrade_cost(id: GeneratorId, upgrade: GeneratorUpgrade, level: u32) -> f64 {
    let (base, growth) = upgrade_base_cost(id, upgrade);
    base * growth.powi(level as i32)
}

pub fn upgrade_cost(state: &EconomyState, id: GeneratorId, upgrade: GeneratorUpgrade) -> f64 {
    let level = state.generator(id).level(upgrade);
    reduced_cost(state, raw_upgrade_cost(id, upgrade, level))
}

fn global_base_cost(kind: GlobalUpgrade) -> (f64, f64) {
    match kind {
        GlobalUpgrade::AutoBoost => (5_000.0, 2.0),
        GlobalUpgrade::MessageMultiplier => (10_000.0, 2.2),
        GlobalUpgrade::CostEfficiency => (25_000.0, 3.0),
        GlobalUpgrade::ManualPower => (100.0, 1.5),
    }
}

pub fn raw_global_upgrade_cost(kind: GlobalUpgrade, level: u32) -> f64 {
    let (base, growth) = global_base_cost(kind);
    base * growth.powi(level as i32)
}

pub fn global_upgrade_cost(state: &EconomyState, kind: GlobalUpgrade) -> f64 {
    reduced_cost(
        state,
        raw_global_upgrade_cost(kind, state.upgrades.level(kind)),
    )
}

/// Unlock price. Never reduced.
pub fn unlock_cost(id: GeneratorId) -> f64 {
    id.unlock_cost() as f64
}

pub fn raw_auto_buy_cost(id: GeneratorId) -> f64 {
    match id {
        GeneratorId::Bot => 10_000.0,
        GeneratorId::Cascade => 250_000.0,
        GeneratorId::Research => 0.0,
    }
}

/// One-time price of the auto-buy feature.
pub fn auto_buy_cost(state: &EconomyState, id: GeneratorId) -> f64 {
    reduced_cost(state, raw_auto_buy_cost(id))
}

/// Unreduced prestige price: 100 x unlock at level 0, then
/// unlock x 100^(level + 1).
pub fn raw_prestige_cost(id: GeneratorId, prestige_level: u32) -> f64 {
    let unlock = unlock_cost(id);
    if prestige_level == 0 {
        100.0 * unlock
    } else {
        let exponent = i32::try_from(prestige_level).map_or(i32::MAX, |l| l.saturating_add(1));
        unlock * 100f64.powi(exponent)
    }
}

pub fn prestige_cost(state: &EconomyState, id: GeneratorId) -> f64 {
    reduced_cost(
        state,
        raw_prestige_cost(id, state.generator(id).prestige_level),
    )
}

/// Cooldown between automatic purchases, in milliseconds.
pub fn auto_buy_delay_ms(id: GeneratorId, level: u32) -> f64 {
    let base = match id {
        GeneratorId::Bot => 5_000.0,
        GeneratorId::Cascade => 10_000.0,
        GeneratorId::Research => return f64::INFINITY,
    };
    (base * AUTO_BUY_DELAY_FACTOR.powi(level as i32)).max(MIN_AUTO_BUY_DELAY_MS)
}

// ── Research ────────────────────────────────────────────────────

/// Research points: current spendable messages / 10 000, floored.
pub fn research_points(state: &EconomyState) -> u64 {
    state.messages.whole / MESSAGES_PER_RESEARCH_POINT
}

/// Research points needed to raise a branch from `level`.
pub fn research_upgrade_cost(level: u32) -> u64 {
    5 * 2u64.pow(level)
}

/// Message price of the research global boost.
pub fn research_boost_cost() -> f64 {
    (RESEARCH_BOOST_POINTS * MESSAGES_PER_RESEARCH_POINT) as f64
}

/// Message price of the next level of a research branch.
pub fn research_branch_cost(state: &EconomyState, branch: ResearchBranch) -> f64 {
    let points = research_upgrade_cost(state.research.level(branch));
    (points * MESSAGES_PER_RESEARCH_POINT) as f64
}

/// Whether a price is covered by the spendable total.
pub fn can_afford(state: &EconomyState, cost: f64) -> bool {
    state.messages.can_afford(cost)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_producer() -> impl Strategy<Value = GeneratorId> {
        prop_oneof![Just(GeneratorId::Bot), Just(GeneratorId::Cascade)]
    }

    fn arb_upgrade() -> impl Strategy<Value = GlobalUpgrade> {
        prop_oneof![
            Just(GlobalUpgrade::AutoBoost),
            Just(GlobalUpgrade::MessageMultiplier),
            Just(GlobalUpgrade::CostEfficiency),
            Just(GlobalUpgrade::ManualPower),
        ]
    }

    proptest! {
        #[test]
        fn prop_unit_cost_strictly_increases(id in arb_producer(), units in 0u32..150) {
            let a = raw_unit_cost(id, units);
            let b = raw_unit_cost(id, units + 1);
            prop_assert!(b > a, "{} -> {}", a, b);
        }

        #[test]
        fn prop_reduced_unit_cost_non_decreasing(
            id in arb_producer(),
            units in 0u32..150,
            cost_eff in 0u32..=10,
        ) {
            let mut state = EconomyState::new();
            state.upgrades.cost_efficiency = cost_eff;
            let a = reduced_cost(&state, raw_unit_cost(id, units));
            let b = reduced_cost(&state, raw_unit_cost(id, units + 1));
            prop_assert!(b >= a);
        }

        #[test]
        fn prop_cost_reduction_in_range(level in 0u32..1000) {
            let mut state = EconomyState::new();
            state.upgrades.cost_efficiency = level;
            let m = cost_reduction_multiplier(&state);
            prop_assert!((0.5..=1.0).contains(&m));
        }

        #[test]
        fn prop_global_cost_strictly_increases(kind in arb_upgrade(), level in 0u32..40) {
            prop_assert!(raw_global_upgrade_cost(kind, level + 1) > raw_global_upgrade_cost(kind, level));
        }

        #[test]
        fn prop_production_nonnegative(
            bots in 0u32..200,
            cascades in 0u32..60,
            eff in 0u32..30,
            boost in 0u32..25,
        ) {
            let mut state = EconomyState::new();
            state.generator_mut(GeneratorId::Bot).unlocked = true;
            state.generator_mut(GeneratorId::Cascade).unlocked = true;
            state.generator_mut(GeneratorId::Bot).units = bots;
            state.generator_mut(GeneratorId::Cascade).units = cascades;
            state.generator_mut(GeneratorId::Cascade).efficiency_level = eff;
            state.upgrades.auto_boost = boost;
            prop_assert!(total_production(&state) >= 0.0);
        }

        #[test]
        fn prop_max_level_step_is_ten(prestige in 0u32..50) {
            for &id in &[GeneratorId::Bot, GeneratorId::Cascade] {
                for &u in id.upgrades() {
                    prop_assert_eq!(
                        max_level(id, u, prestige + 1),
                        max_level(id, u, prestige) + PRESTIGE_CAP_STEP
                    );
                }
            }
        }
    }
}
