use crate::{Error, Result, TradingMode};

/// Process-level configuration loaded from environment variables at startup.
///
/// Trading parameters (symbols, thresholds, risk) live in the TOML file at
/// `bot_config_path`; this struct only carries credentials and wiring.
#[derive(Debug, Clone)]
pub struct Config {
    // Exchange credentials (empty in paper mode when not provided)
    pub binance_api_key: String,
    pub binance_secret: String,

    // Trading
    pub trading_mode: TradingMode,
    pub paper_slippage_bps: f64,
    pub paper_balance_usd: f64,

    // Trading parameters file path
    pub bot_config_path: String,
}

impl Config {
    /// Load configuration from environment variables. Loads `.env` if present.
    /// Live mode without credentials is a startup error.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let trading_mode = match lookup("TRADING_MODE")
            .unwrap_or_else(|| "paper".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => TradingMode::Paper,
            "live" => TradingMode::Live,
            other => {
                return Err(Error::Config(format!(
                    "TRADING_MODE must be 'paper' or 'live', got: '{other}'"
                )))
            }
        };

        let (binance_api_key, binance_secret) = match trading_mode {
            TradingMode::Live => (
                required(&lookup, "BINANCE_API_KEY")?,
                required(&lookup, "BINANCE_SECRET")?,
            ),
            TradingMode::Paper => (
                lookup("BINANCE_API_KEY").unwrap_or_default(),
                lookup("BINANCE_SECRET").unwrap_or_default(),
            ),
        };

        Ok(Config {
            binance_api_key,
            binance_secret,
            trading_mode,
            paper_slippage_bps: parsed(&lookup, "PAPER_SLIPPAGE_BPS", 10.0)?,
            paper_balance_usd: parsed(&lookup, "PAPER_BALANCE_USD", 100.0)?,
            bot_config_path: lookup("BOT_CONFIG_PATH")
                .unwrap_or_else(|| "config/bot.toml".to_string()),
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn parsed(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> Result<f64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} is not a number: '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_paper_without_credentials() {
        let cfg = Config::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Paper);
        assert_eq!(cfg.bot_config_path, "config/bot.toml");
        assert!((cfg.paper_slippage_bps - 10.0).abs() < 1e-9);
    }

    #[test]
    fn live_mode_requires_credentials() {
        let err = Config::from_lookup(env(&[("TRADING_MODE", "live")])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("BINANCE_API_KEY")));

        let cfg = Config::from_lookup(env(&[
            ("TRADING_MODE", "LIVE"),
            ("BINANCE_API_KEY", "key"),
            ("BINANCE_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Live);
        assert_eq!(cfg.binance_api_key, "key");
    }

    #[test]
    fn rejects_unknown_mode_and_bad_numbers() {
        assert!(Config::from_lookup(env(&[("TRADING_MODE", "demo")])).is_err());
        assert!(Config::from_lookup(env(&[("PAPER_SLIPPAGE_BPS", "ten")])).is_err());
    }
}
