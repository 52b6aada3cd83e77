use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle as returned by the exchange. Candles are immutable once
/// fetched and arrive in ascending timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// All fields finite, volume non-negative, and both body ends inside the
    /// high/low range.
    pub fn is_well_formed(&self) -> bool {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        fields.iter().all(|v| v.is_finite())
            && self.volume >= 0.0
            && self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Side of an order on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Directional position held on a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

impl Position {
    /// The position an entry of `side` opens.
    pub fn from_entry(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Position::Long,
            OrderSide::Sell => Position::Short,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Flat => write!(f, "flat"),
            Position::Long => write!(f, "long"),
            Position::Short => write!(f, "short"),
        }
    }
}

/// Outcome of evaluating one rule on one candle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    OpenLong,
    OpenShort,
    Hold,
}

impl Signal {
    /// Entry side for an actionable signal, `None` for `Hold`.
    pub fn entry_side(&self) -> Option<OrderSide> {
        match self {
            Signal::OpenLong => Some(OrderSide::Buy),
            Signal::OpenShort => Some(OrderSide::Sell),
            Signal::Hold => None,
        }
    }
}

/// Kind of order submitted to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Market,
    Stop,
    TakeProfit,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "market"),
            OrderKind::Stop => write!(f, "stop"),
            OrderKind::TakeProfit => write!(f, "take_profit"),
        }
    }
}

/// Acknowledgement of an order accepted by the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHandle {
    pub id: String,
    pub symbol: String,
    pub kind: OrderKind,
    pub side: OrderSide,
    pub size: f64,
    /// Fill price for market orders when the exchange reports one,
    /// trigger price for conditional orders.
    pub price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// An order still resting on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: String,
    pub side: OrderSide,
    pub price: f64,
}

/// Account balances per asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Balance {
    /// Free + locked amount per asset.
    pub total: HashMap<String, f64>,
}

impl Balance {
    pub fn get(&self, asset: &str) -> f64 {
        self.total.get(asset).copied().unwrap_or(0.0)
    }
}

/// Whether the bot is running against the real exchange or simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}
