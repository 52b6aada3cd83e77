pub mod config;
pub mod ledger;

pub use config::RiskConfig;
pub use ledger::{BracketOrder, PositionLedger};
