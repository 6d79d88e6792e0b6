//! message-idle: an incremental "message" economy.
//!
//! The `economy` module is a pure engine (state, formulas, transactions,
//! tick, persistence) with no browser dependencies; the binary wraps it in a
//! ratzilla terminal for the web.

pub mod config;
pub mod economy;
pub mod time;

pub use config::{EngineConfig, CONFIG_KEY};
pub use economy::actions::Action;
pub use economy::save::{MemoryStorage, SaveError, Storage};
pub use economy::Economy;
