use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Strategy-facing part of the bot config file (TOML).
///
/// Example `config/bot.toml`:
/// ```toml
/// [scan]
/// symbols = ["ETHUSDT", "BTCUSDT"]
/// timeframe = "1h"
/// poll_interval_secs = 60
/// call_timeout_secs = 30
///
/// [rules]
/// overbought = 70.0
/// oversold = 30.0
/// ```
///
/// The `[risk]` section of the same file is read by the `risk` crate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    pub scan: ScanConfig,
    #[serde(default)]
    pub rules: RuleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Exchange symbols, e.g. "ETHUSDT". Scanned in this order every cycle.
    pub symbols: Vec<String>,
    /// Candle interval passed to the gateway, e.g. "1h".
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    /// Wait between the end of one cycle and the start of the next.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Upper bound on any single gateway call.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

/// RSI bounds shared by both entry rules.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Longs are only opened below this RSI.
    pub overbought: f64,
    /// Shorts are only opened above this RSI.
    pub oversold: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

fn default_timeframe() -> String {
    "1h".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_call_timeout() -> u64 {
    30
}

impl StrategyFileConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read bot config at '{path}': {e}")))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content)?;
        if cfg.scan.symbols.is_empty() {
            return Err(Error::Config("[scan] symbols must not be empty".into()));
        }
        if cfg.rules.oversold >= cfg.rules.overbought {
            return Err(Error::Config(format!(
                "[rules] oversold ({}) must be below overbought ({})",
                cfg.rules.oversold, cfg.rules.overbought
            )));
        }
        Ok(cfg)
    }
}
