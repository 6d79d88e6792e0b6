//! The economy tick: production accrual and auto-buy.

use tracing::{debug, trace};

use super::formulas::{self, TICKS_PER_SEC};
use super::logic;
use super::state::{EconomyState, GeneratorId};

/// Length of one tick in milliseconds.
pub const TICK_MS: f64 = 1000.0 / TICKS_PER_SEC as f64;

/// Runtime auto-buy cooldowns, one per generator. Not persisted: a reload
/// simply restarts every cooldown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoBuyClock {
    /// Economy time in ms, advanced one `TICK_MS` per tick.
    now_ms: f64,
    /// Economy time of each generator's last automatic purchase.
    last_purchase_ms: [f64; 3],
}

impl AutoBuyClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds until `id` may auto-buy again.
    pub fn remaining_ms(&self, state: &EconomyState, id: GeneratorId) -> f64 {
        let gen = state.generator(id);
        let delay = formulas::auto_buy_delay_ms(id, gen.auto_buy_delay_level);
        (self.last_purchase_ms[id.index()] + delay - self.now_ms).max(0.0)
    }

    fn ready(&self, state: &EconomyState, id: GeneratorId) -> bool {
        self.remaining_ms(state, id) <= 0.0
    }
}

/// What a batch of ticks did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Messages credited by production.
    pub produced: f64,
    /// Successful automatic purchases, in order.
    pub auto_bought: Vec<GeneratorId>,
}

/// Add wall-clock time to the playtime counter.
pub fn advance_playtime(state: &mut EconomyState, elapsed_ms: f64) {
    if elapsed_ms.is_finite() && elapsed_ms > 0.0 {
        state.playtime_ms += elapsed_ms;
    }
}

/// Advance the economy by `delta_ticks` ticks (at 10 ticks/sec).
pub fn tick(state: &mut EconomyState, auto: &mut AutoBuyClock, delta_ticks: u32) -> TickReport {
    let mut report = TickReport::default();
    if delta_ticks == 0 {
        return report;
    }
    for _ in 0..delta_ticks {
        let produced = formulas::production_per_tick(state);
        state.messages.credit(produced);
        report.produced += produced;

        auto.now_ms += TICK_MS;
        run_auto_buy(state, auto, &mut report);
    }

    let current = formulas::total_production(state);
    if current > state.best_production {
        state.best_production = current;
    }
    trace!(ticks = delta_ticks, produced = report.produced, "ticked");
    report
}

/// Try one automatic purchase for every generator whose cooldown elapsed.
/// An unaffordable purchase is retried on the next tick.
fn run_auto_buy(state: &mut EconomyState, auto: &mut AutoBuyClock, report: &mut TickReport) {
    for &id in GeneratorId::all() {
        let gen = state.generator(id);
        if !id.produces() || !gen.unlocked || !gen.auto_buy || !gen.auto_buy_purchased {
            continue;
        }
        if !auto.ready(state, id) {
            continue;
        }
        if logic::buy_unit(state, id) {
            auto.last_purchase_ms[id.index()] = auto.now_ms;
            report.auto_bought.push(id);
            debug!(generator = id.key(), "auto-buy");
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::economy::state::{GeneratorUpgrade, GlobalUpgrade, ResearchBranch};
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Step {
        Ticks(u32),
        Manual,
        Unit(GeneratorId),
        Upgrade(GeneratorId, GeneratorUpgrade),
        Global(GlobalUpgrade),
        Boost,
        Research(ResearchBranch),
    }

    fn arb_producer() -> impl Strategy<Value = GeneratorId> {
        prop_oneof![Just(GeneratorId::Bot), Just(GeneratorId::Cascade)]
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        let upgrade = prop_oneof![
            Just(GeneratorUpgrade::Efficiency),
            Just(GeneratorUpgrade::Speed),
            Just(GeneratorUpgrade::CascadeEfficiency),
            Just(GeneratorUpgrade::AutoBuyDelay),
        ];
        let global = prop_oneof![
            Just(GlobalUpgrade::AutoBoost),
            Just(GlobalUpgrade::MessageMultiplier),
            Just(GlobalUpgrade::CostEfficiency),
            Just(GlobalUpgrade::ManualPower),
        ];
        let branch = prop_oneof![
            Just(ResearchBranch::Manual),
            Just(ResearchBranch::Bot),
            Just(ResearchBranch::Cascade),
        ];
        prop_oneof![
            (1u32..50).prop_map(Step::Ticks),
            Just(Step::Manual),
            arb_producer().prop_map(Step::Unit),
            (arb_producer(), upgrade).prop_map(|(id, u)| Step::Upgrade(id, u)),
            global.prop_map(Step::Global),
            Just(Step::Boost),
            branch.prop_map(Step::Research),
        ]
    }

    proptest! {
        /// Balance always equals the starting funds plus everything credited
        /// minus every price paid, however ticks and purchases interleave.
        #[test]
        fn prop_balance_matches_ledger(
            start in 0u64..2_000_000,
            frac in 0.0f64..1.0,
            bots in 1u32..60,
            cascades in 0u32..20,
            steps in prop::collection::vec(arb_step(), 1..60),
        ) {
            let mut state = EconomyState::new();
            state.messages.whole = start;
            state.messages.fractional = frac;
            for &id in GeneratorId::all() {
                state.generator_mut(id).unlocked = true;
            }
            state.generator_mut(GeneratorId::Bot).units = bots;
            state.generator_mut(GeneratorId::Cascade).units = cascades;
            let mut auto = AutoBuyClock::new();

            let mut ledger = state.messages.total();
            for step in &steps {
                match step {
                    Step::Ticks(n) => ledger += tick(&mut state, &mut auto, *n).produced,
                    Step::Manual => ledger += logic::generate_manually(&mut state),
                    Step::Unit(id) => {
                        let cost = formulas::next_unit_cost(&state, *id);
                        if logic::buy_unit(&mut state, *id) {
                            ledger -= cost;
                        }
                    }
                    Step::Upgrade(id, u) => {
                        let cost = formulas::upgrade_cost(&state, *id, *u);
                        if logic::upgrade_generator(&mut state, *id, *u) {
                            ledger -= cost;
                        }
                    }
                    Step::Global(kind) => {
                        let cost = formulas::global_upgrade_cost(&state, *kind);
                        if logic::buy_global_upgrade(&mut state, *kind) {
                            ledger -= cost;
                        }
                    }
                    Step::Boost => {
                        let cost = formulas::research_boost_cost();
                        if logic::buy_research_boost(&mut state) {
                            ledger -= cost;
                        }
                    }
                    Step::Research(branch) => {
                        let cost = formulas::research_branch_cost(&state, *branch);
                        if logic::upgrade_research(&mut state, *branch) {
                            ledger -= cost;
                        }
                    }
                }
                prop_assert!(
                    (state.messages.total() - ledger).abs() < 1e-6,
                    "after {:?}: balance {} vs ledger {}", step, state.messages.total(), ledger
                );
                prop_assert!((0.0..1.0).contains(&state.messages.fractional));
            }
        }

        #[test]
        fn prop_tick_granularity_does_not_matter(
            bots in 0u32..100,
            eff in 0u32..10,
            ticks in 1u32..200,
        ) {
            let mut state = EconomyState::new();
            let bot = state.generator_mut(GeneratorId::Bot);
            bot.unlocked = true;
            bot.units = bots;
            bot.efficiency_level = eff;

            let mut one = state.clone();
            let mut auto = AutoBuyClock::new();
            tick(&mut one, &mut auto, ticks);

            let mut lump = state.clone();
            lump.messages.credit(formulas::production_per_tick(&state) * ticks as f64);

            prop_assert!((one.messages.total() - lump.messages.total()).abs() < 1e-6);
        }

        #[test]
        fn prop_split_ticks_match_single_batch(
            bots in 0u32..100,
            a in 0u32..100,
            b in 0u32..100,
        ) {
            let mut state = EconomyState::new();
            let bot = state.generator_mut(GeneratorId::Bot);
            bot.unlocked = true;
            bot.units = bots;

            let mut split = state.clone();
            let mut auto = AutoBuyClock::new();
            tick(&mut split, &mut auto, a);
            tick(&mut split, &mut auto, b);

            let mut batch = state.clone();
            let mut auto = AutoBuyClock::new();
            tick(&mut batch, &mut auto, a + b);

            prop_assert_eq!(split.messages.whole, batch.messages.whole);
            prop_assert!((split.messages.fractional - batch.messages.fractional).abs() < 1e-9);
        }

        #[test]
        fn prop_fraction_stays_in_range(
            bots in 0u32..100,
            ticks in 0u32..300,
        ) {
            let mut state = EconomyState::new();
            let bot = state.generator_mut(GeneratorId::Bot);
            bot.unlocked = true;
            bot.units = bots;
            let mut auto = AutoBuyClock::new();
            tick(&mut state, &mut auto, ticks);
            prop_assert!((0.0..1.0).contains(&state.messages.fractional));
        }
    }
}
