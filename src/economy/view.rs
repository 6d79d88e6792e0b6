//! Read-only snapshots for the presentation layer.
//!
//! Each view is recomputed from the state on demand, so a renderer never
//! has to be told that something changed.

use super::formulas;
use super::state::{
    EconomyState, GeneratorId, GeneratorUpgrade, GlobalUpgrade, ResearchBranch,
};
use super::tick::AutoBuyClock;

#[derive(Clone, Debug, PartialEq)]
pub struct UpgradeView {
    pub upgrade: GeneratorUpgrade,
    pub level: u32,
    pub max_level: u32,
    /// `None` once the cap is reached.
    pub cost: Option<f64>,
    pub affordable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorView {
    pub id: GeneratorId,
    pub name: String,
    pub unlocked: bool,
    pub unlock_cost: f64,
    pub can_unlock: bool,
    pub units: u32,
    pub max_units: u32,
    /// Contribution to total income (messages/sec), global multiplier
    /// included, so the views of all generators sum to the total.
    pub production: f64,
    pub next_unit_cost: Option<f64>,
    pub can_buy_unit: bool,
    pub upgrades: Vec<UpgradeView>,
    pub auto_buy: bool,
    pub auto_buy_purchased: bool,
    /// `None` when already purchased or not applicable.
    pub auto_buy_cost: Option<f64>,
    pub can_buy_auto_buy: bool,
    /// Time until the next automatic purchase may fire.
    pub auto_buy_remaining_ms: Option<f64>,
    pub prestige_level: u32,
    pub prestige_cost: Option<f64>,
    pub can_prestige: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlobalUpgradeView {
    pub kind: GlobalUpgrade,
    pub level: u32,
    pub max_level: u32,
    pub cost: Option<f64>,
    pub affordable: bool,
    /// Current effect: a multiplier, or the fraction off for cost efficiency.
    pub effect: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BranchView {
    pub branch: ResearchBranch,
    pub level: u32,
    pub max_level: u32,
    /// Price in research points, `None` at the cap.
    pub cost_points: Option<u64>,
    /// Same price in messages.
    pub cost: Option<f64>,
    pub affordable: bool,
    pub multiplier: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResearchView {
    pub unlocked: bool,
    pub points: u64,
    pub global_boost: bool,
    pub boost_cost: f64,
    pub can_buy_boost: bool,
    pub branches: Vec<BranchView>,
}

pub fn generator_view(state: &EconomyState, clock: &AutoBuyClock, id: GeneratorId) -> GeneratorView {
    let gen = state.generator(id);
    let prerequisite_met = id.prerequisite().map_or(true, |p| state.is_unlocked(p));
    let unlock_cost = formulas::unlock_cost(id);
    let max_units = formulas::max_units(id, gen.prestige_level);

    let next_unit_cost = (id.produces() && gen.units < max_units)
        .then(|| formulas::next_unit_cost(state, id));
    let has_upstream =
        id != GeneratorId::Cascade || state.generator(GeneratorId::Bot).units > 0;
    let can_buy_unit = gen.unlocked
        && has_upstream
        && next_unit_cost.is_some_and(|cost| formulas::can_afford(state, cost));

    let upgrades = id
        .upgrades()
        .iter()
        .map(|&upgrade| {
            let level = gen.level(upgrade);
            let max_level = formulas::max_level(id, upgrade, gen.prestige_level);
            let cost = (level < max_level).then(|| formulas::upgrade_cost(state, id, upgrade));
            UpgradeView {
                upgrade,
                level,
                max_level,
                cost,
                affordable: gen.unlocked && cost.is_some_and(|c| formulas::can_afford(state, c)),
            }
        })
        .collect();

    let auto_buy_cost = (id.produces() && !gen.auto_buy_purchased)
        .then(|| formulas::auto_buy_cost(state, id));
    let auto_buy_remaining_ms = (gen.auto_buy_purchased && gen.auto_buy)
        .then(|| clock.remaining_ms(state, id));

    GeneratorView {
        id,
        name: gen.name().to_string(),
        unlocked: gen.unlocked,
        unlock_cost,
        can_unlock: !gen.unlocked && prerequisite_met && formulas::can_afford(state, unlock_cost),
        units: gen.units,
        max_units,
        production: formulas::generator_production(state, id)
            * formulas::global_message_multiplier(state),
        next_unit_cost,
        can_buy_unit,
        upgrades,
        auto_buy: gen.auto_buy,
        auto_buy_purchased: gen.auto_buy_purchased,
        auto_buy_cost,
        can_buy_auto_buy: gen.unlocked
            && auto_buy_cost.is_some_and(|c| formulas::can_afford(state, c)),
        auto_buy_remaining_ms,
        prestige_level: gen.prestige_level,
        prestige_cost: id.produces().then(|| formulas::prestige_cost(state, id)),
        can_prestige: super::logic::can_prestige(state, id),
    }
}

pub fn global_upgrade_view(state: &EconomyState, kind: GlobalUpgrade) -> GlobalUpgradeView {
    let level = state.upgrades.level(kind);
    let max_level = kind.max_level();
    let cost = (level < max_level).then(|| formulas::global_upgrade_cost(state, kind));
    let effect = match kind {
        GlobalUpgrade::AutoBoost => formulas::global_auto_boost_multiplier(state),
        GlobalUpgrade::MessageMultiplier => formulas::global_message_multiplier(state),
        GlobalUpgrade::CostEfficiency => 1.0 - formulas::cost_reduction_multiplier(state),
        GlobalUpgrade::ManualPower => formulas::manual_multiplier(state),
    };
    GlobalUpgradeView {
        kind,
        level,
        max_level,
        cost,
        affordable: cost.is_some_and(|c| formulas::can_afford(state, c)),
        effect,
    }
}

pub fn research_view(state: &EconomyState) -> ResearchView {
    let unlocked = state.is_unlocked(GeneratorId::Research);
    let points = formulas::research_points(state);
    let global_boost = state.research.global_boost;

    let branches = ResearchBranch::all()
        .iter()
        .map(|&branch| {
            let level = state.research.level(branch);
            let at_cap = level >= formulas::RESEARCH_MAX_LEVEL;
            let cost_points = (!at_cap).then(|| formulas::research_upgrade_cost(level));
            BranchView {
                branch,
                level,
                max_level: formulas::RESEARCH_MAX_LEVEL,
                cost_points,
                cost: (!at_cap).then(|| formulas::research_branch_cost(state, branch)),
                affordable: global_boost && cost_points.is_some_and(|p| points >= p),
                multiplier: formulas::research_multiplier(state, branch),
            }
        })
        .collect();

    ResearchView {
        unlocked,
        points,
        global_boost,
        boost_cost: formulas::research_boost_cost(),
        can_buy_boost: unlocked && !global_boost && points >= formulas::RESEARCH_BOOST_POINTS,
        branches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::logic;

    #[test]
    fn locked_bot_view() {
        let mut state = EconomyState::new();
        state.messages.whole = 999;
        let view = generator_view(&state, &AutoBuyClock::new(), GeneratorId::Bot);
        assert!(!view.unlocked);
        assert!(!view.can_unlock);
        assert!((view.unlock_cost - 1_000.0).abs() < 1e-9);
        assert!(!view.can_buy_unit);
        assert!(view.production.abs() < 1e-12);
    }

    #[test]
    fn cascade_view_needs_bot_tier_to_unlock() {
        let mut state = EconomyState::new();
        state.messages.whole = 1_000_000;
        let view = generator_view(&state, &AutoBuyClock::new(), GeneratorId::Cascade);
        assert!(!view.can_unlock);
        state.generator_mut(GeneratorId::Bot).unlocked = true;
        let view = generator_view(&state, &AutoBuyClock::new(), GeneratorId::Cascade);
        assert!(view.can_unlock);
    }

    #[test]
    fn view_affordability_matches_transaction() {
        let mut state = EconomyState::new();
        state.messages.whole = 1_050;
        assert!(logic::unlock_generator(&mut state, GeneratorId::Bot));
        let view = generator_view(&state, &AutoBuyClock::new(), GeneratorId::Bot);
        assert_eq!(view.next_unit_cost, Some(50.0));
        assert!(view.can_buy_unit);
        assert!(logic::buy_unit(&mut state, GeneratorId::Bot));
        let view = generator_view(&state, &AutoBuyClock::new(), GeneratorId::Bot);
        assert!(!view.can_buy_unit);
        assert_eq!(view.units, 2);
    }

    #[test]
    fn production_views_sum_to_total() {
        let mut state = EconomyState::new();
        state.upgrades.message_multiplier = 3;
        let bot = state.generator_mut(GeneratorId::Bot);
        bot.unlocked = true;
        bot.units = 12;
        let cascade = state.generator_mut(GeneratorId::Cascade);
        cascade.unlocked = true;
        cascade.units = 4;
        let clock = AutoBuyClock::new();
        let sum: f64 = GeneratorId::all()
            .iter()
            .map(|&id| generator_view(&state, &clock, id).production)
            .sum();
        assert!((sum - formulas::total_production(&state)).abs() < 1e-9);
    }

    #[test]
    fn maxed_upgrade_has_no_cost() {
        let mut state = EconomyState::new();
        state.generator_mut(GeneratorId::Bot).unlocked = true;
        state.generator_mut(GeneratorId::Bot).speed_level = 20;
        let view = generator_view(&state, &AutoBuyClock::new(), GeneratorId::Bot);
        let speed = view
            .upgrades
            .iter()
            .find(|u| u.upgrade == GeneratorUpgrade::Speed)
            .unwrap();
        assert_eq!(speed.cost, None);
        assert!(!speed.affordable);
    }

    #[test]
    fn research_generator_has_no_units_or_prestige() {
        let state = EconomyState::new();
        let view = generator_view(&state, &AutoBuyClock::new(), GeneratorId::Research);
        assert_eq!(view.next_unit_cost, None);
        assert_eq!(view.prestige_cost, None);
        assert_eq!(view.auto_buy_cost, None);
    }

    #[test]
    fn global_view_at_cap() {
        let mut state = EconomyState::new();
        state.upgrades.cost_efficiency = 10;
        let view = global_upgrade_view(&state, GlobalUpgrade::CostEfficiency);
        assert_eq!(view.cost, None);
        assert!((view.effect - 0.5).abs() < 1e-9);
    }

    #[test]
    fn research_view_gates() {
        let mut state = EconomyState::new();
        state.messages.whole = 100_000;
        let view = research_view(&state);
        assert_eq!(view.points, 10);
        assert!(!view.can_buy_boost);

        state.generator_mut(GeneratorId::Research).unlocked = true;
        let view = research_view(&state);
        assert!(view.can_buy_boost);
        assert!(view.branches.iter().all(|b| !b.affordable));

        state.research.global_boost = true;
        let view = research_view(&state);
        assert!(!view.can_buy_boost);
        assert!(view.branches.iter().all(|b| b.affordable));
        assert_eq!(view.branches[0].cost_points, Some(5));
    }
}
