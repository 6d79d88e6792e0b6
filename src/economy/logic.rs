//! Economy transactions: pure functions over `EconomyState`.
//!
//! Every transaction has the same shape: check preconditions, price it via
//! `formulas`, and only then deduct and mutate. A denied action returns
//! `false` and leaves the state untouched.

use tracing::{debug, info};

use super::formulas;
use super::state::{
    EconomyState, GeneratorId, GeneratorUpgrade, GlobalUpgrade, ResearchBranch,
};

/// Deduct a price the caller has already checked against the balance.
fn pay(state: &mut EconomyState, cost: f64) {
    state.messages.spend(cost);
}

fn afford_or_deny(state: &EconomyState, cost: f64, what: &str) -> bool {
    if formulas::can_afford(state, cost) {
        true
    } else {
        debug!(what, cost, balance = state.messages.total(), "cannot afford");
        false
    }
}

/// Manual message: credit the manual gain immediately. Returns the amount.
pub fn generate_manually(state: &mut EconomyState) -> f64 {
    let gain = formulas::manual_gain(state);
    state.messages.credit(gain);
    state.total_manual_events += 1;
    gain
}

/// Give a generator its persistent display name, avoiding names already
/// taken by another generator. No-op once a name exists.
pub fn assign_display_name(state: &mut EconomyState, id: GeneratorId) -> bool {
    if state.generator(id).display_name.is_some() {
        return false;
    }
    let free: Vec<&'static str> = id
        .name_pool()
        .iter()
        .copied()
        .filter(|candidate| {
            !state
                .generators
                .iter()
                .any(|g| g.display_name.as_deref() == Some(*candidate))
        })
        .collect();
    let name = if free.is_empty() {
        format!("{} #{}", id.label(), state.next_random() % 1000)
    } else {
        let idx = state.next_random() as usize % free.len();
        free[idx].to_string()
    };
    debug!(generator = id.key(), %name, "display name assigned");
    state.generator_mut(id).display_name = Some(name);
    true
}

/// Unlock a generator tier. The bot tier comes with one free bot.
pub fn unlock_generator(state: &mut EconomyState, id: GeneratorId) -> bool {
    if state.is_unlocked(id) {
        return false;
    }
    if let Some(prev) = id.prerequisite() {
        if !state.is_unlocked(prev) {
            debug!(generator = id.key(), "prerequisite tier still locked");
            return false;
        }
    }
    let cost = formulas::unlock_cost(id);
    if !afford_or_deny(state, cost, "unlock") {
        return false;
    }

    pay(state, cost);
    let gen = state.generator_mut(id);
    gen.unlocked = true;
    gen.units = id.free_units();
    assign_display_name(state, id);
    info!(generator = id.key(), cost, "generator unlocked");
    true
}

/// Buy one unit. A cascade additionally consumes one bot.
pub fn buy_unit(state: &mut EconomyState, id: GeneratorId) -> bool {
    if !id.produces() || !state.is_unlocked(id) {
        return false;
    }
    let gen = state.generator(id);
    if gen.units >= formulas::max_units(id, gen.prestige_level) {
        debug!(generator = id.key(), units = gen.units, "unit cap reached");
        return false;
    }
    if id == GeneratorId::Cascade && state.generator(GeneratorId::Bot).units == 0 {
        debug!("cascade needs a bot to consume");
        return false;
    }
    let cost = formulas::next_unit_cost(state, id);
    if !afford_or_deny(state, cost, "unit") {
        return false;
    }

    pay(state, cost);
    if id == GeneratorId::Cascade {
        let bot = state.generator_mut(GeneratorId::Bot);
        bot.units -= 1;
    }
    let gen = state.generator_mut(id);
    gen.units += 1;
    debug!(generator = id.key(), units = gen.units, cost, "unit bought");
    true
}

/// Raise one of a generator's own upgrades by a level.
pub fn upgrade_generator(
    state: &mut EconomyState,
    id: GeneratorId,
    upgrade: GeneratorUpgrade,
) -> bool {
    if !state.is_unlocked(id) || !formulas::has_upgrade(id, upgrade) {
        return false;
    }
    let gen = state.generator(id);
    let level = gen.level(upgrade);
    if level >= formulas::max_level(id, upgrade, gen.prestige_level) {
        debug!(generator = id.key(), upgrade = upgrade.name(), level, "upgrade at cap");
        return false;
    }
    let cost = formulas::upgrade_cost(state, id, upgrade);
    if !afford_or_deny(state, cost, upgrade.name()) {
        return false;
    }

    pay(state, cost);
    *state.generator_mut(id).level_mut(upgrade) += 1;
    debug!(generator = id.key(), upgrade = upgrade.name(), level = level + 1, cost, "upgraded");
    true
}

/// One-time purchase of the auto-buy feature. It starts switched on.
pub fn buy_auto_buy(state: &mut EconomyState, id: GeneratorId) -> bool {
    if !id.produces() || !state.is_unlocked(id) {
        return false;
    }
    if state.generator(id).auto_buy_purchased {
        return false;
    }
    let cost = formulas::auto_buy_cost(state, id);
    if !afford_or_deny(state, cost, "auto-buy") {
        return false;
    }

    pay(state, cost);
    let gen = state.generator_mut(id);
    gen.auto_buy_purchased = true;
    gen.auto_buy = true;
    info!(generator = id.key(), cost, "auto-buy purchased");
    true
}

/// Flip auto-buy on or off. Requires the feature to be purchased.
pub fn toggle_auto_buy(state: &mut EconomyState, id: GeneratorId) -> bool {
    let gen = state.generator_mut(id);
    if !gen.auto_buy_purchased {
        return false;
    }
    gen.auto_buy = !gen.auto_buy;
    true
}

/// Raise a global upgrade by a level.
pub fn buy_global_upgrade(state: &mut EconomyState, kind: GlobalUpgrade) -> bool {
    let level = state.upgrades.level(kind);
    if level >= kind.max_level() {
        return false;
    }
    let cost = formulas::global_upgrade_cost(state, kind);
    if !afford_or_deny(state, cost, kind.name()) {
        return false;
    }

    pay(state, cost);
    *state.upgrades.level_mut(kind) += 1;
    debug!(upgrade = kind.name(), level = level + 1, cost, "global upgrade bought");
    true
}

/// One-time research global boost. Needs the research tier unlocked and
/// enough research points.
pub fn buy_research_boost(state: &mut EconomyState) -> bool {
    if !state.is_unlocked(GeneratorId::Research) || state.research.global_boost {
        return false;
    }
    if formulas::research_points(state) < formulas::RESEARCH_BOOST_POINTS {
        debug!(points = formulas::research_points(state), "not enough research points");
        return false;
    }
    let cost = formulas::research_boost_cost();

    pay(state, cost);
    state.research.global_boost = true;
    info!(cost, "research global boost purchased");
    true
}

/// Raise a research branch. Gated on the global boost, capped at 5.
pub fn upgrade_research(state: &mut EconomyState, branch: ResearchBranch) -> bool {
    if !state.research.global_boost {
        return false;
    }
    let level = state.research.level(branch);
    if level >= formulas::RESEARCH_MAX_LEVEL {
        return false;
    }
    let points = formulas::research_upgrade_cost(level);
    if formulas::research_points(state) < points {
        debug!(branch = branch.name(), points, "not enough research points");
        return false;
    }
    let cost = formulas::research_branch_cost(state, branch);

    pay(state, cost);
    *state.research.level_mut(branch) += 1;
    info!(branch = branch.name(), level = level + 1, cost, "research upgraded");
    true
}

/// Whether `prestige` would currently succeed.
pub fn can_prestige(state: &EconomyState, id: GeneratorId) -> bool {
    let gen = state.generator(id);
    id.produces()
        && gen.unlocked
        && gen.prestige_level < formulas::MAX_PRESTIGE_LEVEL
        && gen.auto_buy_purchased
        && formulas::all_upgrades_maxed(state, id)
        && formulas::can_afford(state, formulas::prestige_cost(state, id))
}

/// Reset a fully upgraded generator for 10 more levels on every cap.
///
/// Units go back to the free allowance, every upgrade to 0 and auto-buy is
/// lost. Unlock status and display name are kept.
pub fn prestige(state: &mut EconomyState, id: GeneratorId) -> bool {
    if !can_prestige(state, id) {
        return false;
    }
    let cost = formulas::prestige_cost(state, id);

    pay(state, cost);
    let gen = state.generator_mut(id);
    gen.units = id.free_units();
    for &upgrade in id.upgrades() {
        *gen.level_mut(upgrade) = 0;
    }
    gen.auto_buy = false;
    gen.auto_buy_purchased = false;
    gen.prestige_level += 1;
    info!(generator = id.key(), level = gen.prestige_level, cost, "prestige");
    true
}

/// Wipe the economy back to a fresh start. Settings live elsewhere and are
/// not touched.
pub fn reset(state: &mut EconomyState) {
    let seed = state.rng_seed;
    *state = EconomyState::with_seed(seed);
    info!("economy reset");
}
