use serde::{Deserialize, Serialize};

use common::{Error, OrderSide, Result};

/// Sizing and bracket parameters, read from the `[risk]` section of the bot
/// config file. Read-only for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Reference account value in quote currency used for sizing.
    pub account_balance: f64,
    /// Fraction of `account_balance` committed per entry (e.g. 0.01 = 1%).
    pub risk_fraction: f64,
    /// Distance of the stop from the entry (e.g. 0.01 = 1%).
    pub stop_loss_pct: f64,
    /// Distance of the target from the entry (e.g. 0.02 = 2%).
    pub take_profit_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_balance: 100.0,
            risk_fraction: 0.01,
            stop_loss_pct: 0.01,
            take_profit_pct: 0.02,
        }
    }
}

#[derive(Deserialize)]
struct RiskSection {
    #[serde(default)]
    risk: Option<RiskConfig>,
}

impl RiskConfig {
    /// Read the `[risk]` section from the bot config file. A missing section
    /// falls back to the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read bot config at '{path}': {e}")))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let section: RiskSection = toml::from_str(content)?;
        let cfg = section.risk.unwrap_or_default();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| v > 0.0 && v < 1.0;
        if !(self.account_balance > 0.0) {
            return Err(Error::Config("[risk] account_balance must be positive".into()));
        }
        if !in_unit(self.risk_fraction) {
            return Err(Error::Config("[risk] risk_fraction must be in (0, 1)".into()));
        }
        if !in_unit(self.stop_loss_pct) || !in_unit(self.take_profit_pct) {
            return Err(Error::Config(
                "[risk] stop_loss_pct and take_profit_pct must be in (0, 1)".into(),
            ));
        }
        Ok(())
    }

    /// Base-asset quantity for an entry at `entry_price`:
    /// `account_balance * risk_fraction / entry_price`.
    pub fn position_size(&self, entry_price: f64) -> f64 {
        if entry_price <= 0.0 {
            return 0.0;
        }
        self.account_balance * self.risk_fraction / entry_price
    }

    /// `(stop_price, target_price)` for an entry on `side` at `entry_price`.
    /// Long: stop below, target above. Short: reversed.
    pub fn bracket_prices(&self, side: OrderSide, entry_price: f64) -> (f64, f64) {
        match side {
            OrderSide::Buy => (
                entry_price * (1.0 - self.stop_loss_pct),
                entry_price * (1.0 + self.take_profit_pct),
            ),
            OrderSide::Sell => (
                entry_price * (1.0 + self.stop_loss_pct),
                entry_price * (1.0 - self.take_profit_pct),
            ),
        }
    }
}
