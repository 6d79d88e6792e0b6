//! Player-facing actions and their dispatch onto the transaction functions.
//!
//! The host maps key presses (or clicks) to an `Action`; `Economy::apply`
//! runs it and persists on success.

use super::logic;
use super::state::{EconomyState, GeneratorId, GeneratorUpgrade, GlobalUpgrade, ResearchBranch};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Type one message by hand.
    Generate,
    Unlock(GeneratorId),
    /// Assign a display name before the tier is unlocked.
    Preview(GeneratorId),
    BuyUnit(GeneratorId),
    Upgrade(GeneratorId, GeneratorUpgrade),
    BuyAutoBuy(GeneratorId),
    ToggleAutoBuy(GeneratorId),
    BuyGlobal(GlobalUpgrade),
    BuyResearchBoost,
    UpgradeResearch(ResearchBranch),
    Prestige(GeneratorId),
}

/// Run one transaction. Returns whether it succeeded.
pub(crate) fn dispatch(state: &mut EconomyState, action: Action) -> bool {
    match action {
        Action::Generate => {
            logic::generate_manually(state);
            true
        }
        Action::Unlock(id) => logic::unlock_generator(state, id),
        Action::Preview(id) => logic::assign_display_name(state, id),
        Action::BuyUnit(id) => logic::buy_unit(state, id),
        Action::Upgrade(id, upgrade) => logic::upgrade_generator(state, id, upgrade),
        Action::BuyAutoBuy(id) => logic::buy_auto_buy(state, id),
        Action::ToggleAutoBuy(id) => logic::toggle_auto_buy(state, id),
        Action::BuyGlobal(kind) => logic::buy_global_upgrade(state, kind),
        Action::BuyResearchBoost => logic::buy_research_boost(state),
        Action::UpgradeResearch(branch) => logic::upgrade_research(state, branch),
        Action::Prestige(id) => logic::prestige(state, id),
    }
}
