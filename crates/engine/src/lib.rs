pub mod binance;
pub mod orders;
pub mod scanner;
pub mod timed;

pub use binance::BinanceClient;
pub use orders::{OrderManager, Trigger};
pub use scanner::{CycleReport, ScanError, ScanLoop, ScanSettings, SymbolFailure, SymbolReport};
pub use timed::TimedGateway;
