use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, OrderKind, OrderSide, Position, Result};

/// The protective stop + target recorded for an open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketOrder {
    /// Side of the entry fill. The legs are on the opposite side.
    pub side: OrderSide,
    pub size: f64,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub entry_order_id: String,
    /// `None` when the stop leg was not accepted by the exchange.
    pub stop_order_id: Option<String>,
    /// `None` when the take-profit leg was not accepted by the exchange.
    pub target_order_id: Option<String>,
    pub opened_at: DateTime<Utc>,
}

impl BracketOrder {
    /// Build a bracket, enforcing `size > 0` and the price ordering for the side:
    /// long `stop < entry < target`, short `target < entry < stop`.
    pub fn new(
        side: OrderSide,
        size: f64,
        entry_price: f64,
        stop_price: f64,
        target_price: f64,
        entry_order_id: impl Into<String>,
    ) -> Result<Self> {
        if !(size > 0.0) {
            return Err(Error::InvalidState(format!("bracket size must be positive, got {size}")));
        }
        let ordered = match side {
            OrderSide::Buy => stop_price < entry_price && entry_price < target_price,
            OrderSide::Sell => target_price < entry_price && entry_price < stop_price,
        };
        if !ordered {
            return Err(Error::InvalidState(format!(
                "{side} bracket out of order: stop {stop_price}, entry {entry_price}, target {target_price}"
            )));
        }
        Ok(Self {
            side,
            size,
            entry_price,
            stop_price,
            target_price,
            entry_order_id: entry_order_id.into(),
            stop_order_id: None,
            target_order_id: None,
            opened_at: Utc::now(),
        })
    }

    pub fn position(&self) -> Position {
        Position::from_entry(self.side)
    }

    /// Side of the protective legs.
    pub fn exit_side(&self) -> OrderSide {
        self.side.opposite()
    }

    /// Legs the exchange did not accept.
    pub fn missing_legs(&self) -> Vec<OrderKind> {
        let mut missing = Vec::new();
        if self.stop_order_id.is_none() {
            missing.push(OrderKind::Stop);
        }
        if self.target_order_id.is_none() {
            missing.push(OrderKind::TakeProfit);
        }
        missing
    }

    /// Recorded protective legs as `(kind, order id)`.
    pub fn legs(&self) -> impl Iterator<Item = (OrderKind, &str)> {
        [
            (OrderKind::Stop, self.stop_order_id.as_deref()),
            (OrderKind::TakeProfit, self.target_order_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, id)| id.map(|id| (kind, id)))
    }

    /// Trigger price of a leg kind.
    pub fn leg_price(&self, kind: OrderKind) -> f64 {
        match kind {
            OrderKind::Stop => self.stop_price,
            OrderKind::TakeProfit => self.target_price,
            OrderKind::Market => self.entry_price,
        }
    }

    /// Which threshold, if any, `price` has crossed.
    /// Long: at or below the stop, or at or above the target. Short: mirrored.
    pub fn triggered_by(&self, price: f64) -> Option<OrderKind> {
        match self.side {
            OrderSide::Buy if price <= self.stop_price => Some(OrderKind::Stop),
            OrderSide::Buy if price >= self.target_price => Some(OrderKind::TakeProfit),
            OrderSide::Sell if price >= self.stop_price => Some(OrderKind::Stop),
            OrderSide::Sell if price <= self.target_price => Some(OrderKind::TakeProfit),
            _ => None,
        }
    }
}

/// Per-symbol position and bracket state. The position is derived from the
/// bracket, so a symbol is flat exactly when it has no bracket.
///
/// Owned by the scan loop and lent to the order manager; mutations are applied
/// immediately and visible to the next read.
#[derive(Debug, Default)]
pub struct PositionLedger {
    brackets: HashMap<String, BracketOrder>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&BracketOrder> {
        self.brackets.get(symbol)
    }

    pub fn position(&self, symbol: &str) -> Position {
        self.get(symbol).map_or(Position::Flat, BracketOrder::position)
    }

    /// Record a newly opened bracket. Fails if the symbol already has one;
    /// callers must clear a superseded entry first.
    pub fn set_open(&mut self, symbol: &str, bracket: BracketOrder) -> Result<()> {
        if let Some(existing) = self.brackets.get(symbol) {
            return Err(Error::InvalidState(format!(
                "{symbol} already has an open {} bracket",
                existing.position()
            )));
        }
        info!(
            symbol = %symbol,
            side = %bracket.side,
            size = bracket.size,
            entry = bracket.entry_price,
            stop = bracket.stop_price,
            target = bracket.target_price,
            "Bracket recorded"
        );
        self.brackets.insert(symbol.to_string(), bracket);
        Ok(())
    }

    /// Remove and return the symbol's bracket, leaving it flat.
    pub fn clear(&mut self, symbol: &str) -> Option<BracketOrder> {
        let removed = self.brackets.remove(symbol);
        if let Some(b) = &removed {
            info!(symbol = %symbol, side = %b.side, "Bracket cleared, position flat");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    /// Verify every recorded bracket still satisfies its construction rules.
    pub fn check_invariants(&self) -> Result<()> {
        for (symbol, b) in &self.brackets {
            BracketOrder::new(b.side, b.size, b.entry_price, b.stop_price, b.target_price, "")
                .map_err(|e| Error::InvalidState(format!("{symbol}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_bracket() -> BracketOrder {
        BracketOrder::new(OrderSide::Buy, 0.5, 100.0, 99.0, 103.0, "entry-1").unwrap()
    }

    fn short_bracket() -> BracketOrder {
        BracketOrder::new(OrderSide::Sell, 0.5, 100.0, 101.0, 98.0, "entry-2").unwrap()
    }

    #[test]
    fn rejects_misordered_or_empty_brackets() {
        assert!(BracketOrder::new(OrderSide::Buy, 1.0, 100.0, 101.0, 103.0, "x").is_err());
        assert!(BracketOrder::new(OrderSide::Sell, 1.0, 100.0, 99.0, 98.0, "x").is_err());
        assert!(BracketOrder::new(OrderSide::Buy, 0.0, 100.0, 99.0, 103.0, "x").is_err());
    }

    #[test]
    fn position_follows_bracket_presence() {
        let mut ledger = PositionLedger::new();
        assert_eq!(ledger.position("ETHUSDT"), Position::Flat);

        ledger.set_open("ETHUSDT", long_bracket()).unwrap();
        assert_eq!(ledger.position("ETHUSDT"), Position::Long);
        assert!(ledger.get("ETHUSDT").is_some());
        assert_eq!(ledger.position("BTCUSDT"), Position::Flat);

        let removed = ledger.clear("ETHUSDT").unwrap();
        assert_eq!(removed.entry_order_id, "entry-1");
        assert_eq!(ledger.position("ETHUSDT"), Position::Flat);
        assert!(ledger.get("ETHUSDT").is_none());
        assert!(ledger.clear("ETHUSDT").is_none());
    }

    #[test]
    fn set_open_refuses_second_bracket() {
        let mut ledger = PositionLedger::new();
        ledger.set_open("ETHUSDT", long_bracket()).unwrap();
        let err = ledger.set_open("ETHUSDT", short_bracket()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(ledger.position("ETHUSDT"), Position::Long);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn long_trigger_thresholds() {
        let b = long_bracket();
        assert_eq!(b.triggered_by(98.0), Some(OrderKind::Stop));
        assert_eq!(b.triggered_by(99.0), Some(OrderKind::Stop));
        assert_eq!(b.triggered_by(103.5), Some(OrderKind::TakeProfit));
        assert_eq!(b.triggered_by(101.0), None);
    }

    #[test]
    fn short_trigger_thresholds() {
        let b = short_bracket();
        assert_eq!(b.triggered_by(101.5), Some(OrderKind::Stop));
        assert_eq!(b.triggered_by(97.0), Some(OrderKind::TakeProfit));
        assert_eq!(b.triggered_by(100.0), None);
    }

    #[test]
    fn missing_legs_reported() {
        let mut b = long_bracket();
        assert_eq!(b.missing_legs(), vec![OrderKind::Stop, OrderKind::TakeProfit]);
        b.stop_order_id = Some("s".into());
        assert_eq!(b.missing_legs(), vec![OrderKind::TakeProfit]);
        b.target_order_id = Some("t".into());
        assert!(b.missing_legs().is_empty());
    }

    #[test]
    fn invariants_hold_for_valid_entries() {
        let mut ledger = PositionLedger::new();
        ledger.set_open("ETHUSDT", long_bracket()).unwrap();
        ledger.set_open("BTCUSDT", short_bracket()).unwrap();
        assert!(ledger.check_invariants().is_ok());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn legs_list_only_recorded_ids() {
        let mut b = long_bracket();
        assert_eq!(b.legs().count(), 0);
        b.target_order_id = Some("t".into());
        assert_eq!(b.legs().collect::<Vec<_>>(), vec![(OrderKind::TakeProfit, "t")]);
        assert!((b.leg_price(OrderKind::TakeProfit) - b.target_price).abs() < 1e-12);
    }
}
