use std::sync::Arc;

use tracing::{error, info, warn};

use common::{Error, ExchangeGateway, OpenOrder, OrderKind, OrderSide, Result};
use risk::{BracketOrder, PositionLedger, RiskConfig};

/// A protective leg found past its threshold during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub order_id: String,
    pub kind: OrderKind,
    pub price: f64,
}

/// Places entries with their bracket legs and reconciles resting legs against
/// the ledger's thresholds.
///
/// This is the ONLY component that submits or cancels orders and the only
/// writer of the `PositionLedger`.
pub struct OrderManager {
    gateway: Arc<dyn ExchangeGateway>,
    risk: RiskConfig,
}

impl OrderManager {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, risk: RiskConfig) -> Self {
        Self { gateway, risk }
    }

    pub fn risk(&self) -> &RiskConfig {
        &self.risk
    }

    /// Open a position with a market order, then protect it with a stop and a
    /// take-profit on the opposing side.
    ///
    /// A failed market order leaves the ledger untouched. A failed leg leaves
    /// the filled position recorded with the leg missing and returns
    /// `Error::BracketIncomplete`. On a reversal the previous bracket's legs
    /// are cancelled after the fill; if that fails the new bracket is still
    /// recorded and `Error::CancelFailed` is returned.
    pub async fn enter_position(
        &self,
        ledger: &mut PositionLedger,
        symbol: &str,
        side: OrderSide,
        size: f64,
        entry_price: f64,
    ) -> Result<BracketOrder> {
        if let Some(existing) = ledger.get(symbol) {
            if existing.side == side {
                return Err(Error::InvalidState(format!(
                    "{symbol} already holds a {} position",
                    existing.position()
                )));
            }
        }

        let (stop_price, target_price) = self.risk.bracket_prices(side, entry_price);
        let mut bracket =
            BracketOrder::new(side, size, entry_price, stop_price, target_price, String::new())?;

        let entry = self
            .gateway
            .create_market_order(symbol, side, size)
            .await?;
        info!(
            symbol = %symbol,
            side = %side,
            size = size,
            order_id = %entry.id,
            "Order placed"
        );
        bracket.entry_order_id = entry.id;

        let stale = match ledger.clear(symbol) {
            Some(superseded) => {
                info!(
                    symbol = %symbol,
                    old_side = %superseded.side,
                    "Reversal, withdrawing previous bracket"
                );
                self.supersede(symbol, &superseded).await.err()
            }
            None => None,
        };

        let exit_side = side.opposite();
        let (stop, target) = tokio::join!(
            self.gateway.create_conditional_order(
                symbol,
                OrderKind::Stop,
                exit_side,
                size,
                stop_price
            ),
            self.gateway.create_conditional_order(
                symbol,
                OrderKind::TakeProfit,
                exit_side,
                size,
                target_price
            ),
        );

        let mut causes = Vec::new();
        match stop {
            Ok(handle) => bracket.stop_order_id = Some(handle.id),
            Err(e) => causes.push(format!("stop: {e}")),
        }
        match target {
            Ok(handle) => bracket.target_order_id = Some(handle.id),
            Err(e) => causes.push(format!("take_profit: {e}")),
        }

        ledger.set_open(symbol, bracket.clone())?;

        let missing = bracket.missing_legs();
        if !missing.is_empty() {
            let cause = causes.join("; ");
            error!(
                symbol = %symbol,
                missing = ?missing,
                cause = %cause,
                "Position open without a complete bracket"
            );
            if let Some(e) = &stale {
                error!(symbol = %symbol, error = %e, "Previous bracket not withdrawn");
            }
            return Err(Error::BracketIncomplete {
                symbol: symbol.to_string(),
                missing,
                cause,
            });
        }

        info!(
            symbol = %symbol,
            stop = stop_price,
            target = target_price,
            "Stop loss and take profit placed"
        );
        match stale {
            Some(e) => Err(e),
            None => Ok(bracket),
        }
    }

    /// Close out the symbol's bracket once the exchange shows it has fired,
    /// then withdraw whatever is left of it. No-op when the symbol is flat.
    ///
    /// The bracket's own legs rest at their trigger prices, so they are judged
    /// by presence: a recorded leg missing from the open orders has filled.
    /// Any other open order is judged by price: the first one at or past the
    /// stop or target is cancelled. Either way the ledger is cleared and the
    /// remaining legs are cancelled; a failed cancel there returns
    /// `Error::CancelFailed` with the symbol already flat.
    pub async fn reconcile(
        &self,
        ledger: &mut PositionLedger,
        symbol: &str,
    ) -> Result<Option<Trigger>> {
        let Some(bracket) = ledger.get(symbol).cloned() else {
            return Ok(None);
        };

        let mut resting = self.gateway.fetch_open_orders(symbol).await?;
        let is_leg = |id: &str| bracket.legs().any(|(_, leg)| leg == id);

        let crossed = resting.iter().find_map(|order| {
            if is_leg(&order.id) {
                return None;
            }
            bracket.triggered_by(order.price).map(|kind| (order.clone(), kind))
        });

        let trigger = if let Some((order, kind)) = crossed {
            info!(
                symbol = %symbol,
                side = %order.side,
                price = order.price,
                kind = %kind,
                "Order triggered"
            );
            self.gateway.cancel_order(&order.id, symbol).await?;
            info!(symbol = %symbol, order_id = %order.id, "Order canceled");
            resting.retain(|o| o.id != order.id);
            Trigger {
                order_id: order.id,
                kind,
                price: order.price,
            }
        } else if let Some((kind, id)) = bracket
            .legs()
            .find(|(_, id)| !resting.iter().any(|o| o.id == *id))
        {
            let price = bracket.leg_price(kind);
            info!(
                symbol = %symbol,
                order_id = %id,
                kind = %kind,
                price = price,
                "Order triggered"
            );
            Trigger {
                order_id: id.to_string(),
                kind,
                price,
            }
        } else {
            return Ok(None);
        };

        ledger.clear(symbol);
        self.withdraw(symbol, &bracket, &resting).await?;
        Ok(Some(trigger))
    }

    /// Withdraw the legs of a bracket replaced by a reversal.
    async fn supersede(&self, symbol: &str, bracket: &BracketOrder) -> Result<()> {
        if bracket.legs().next().is_none() {
            return Ok(());
        }
        match self.gateway.fetch_open_orders(symbol).await {
            Ok(resting) => self.withdraw(symbol, bracket, &resting).await,
            Err(e) => Err(Error::CancelFailed {
                symbol: symbol.to_string(),
                order_ids: bracket.legs().map(|(_, id)| id.to_string()).collect(),
                cause: e.to_string(),
            }),
        }
    }

    /// Cancel every recorded leg of `bracket` that is still among `resting`.
    async fn withdraw(
        &self,
        symbol: &str,
        bracket: &BracketOrder,
        resting: &[OpenOrder],
    ) -> Result<()> {
        let mut failed = Vec::new();
        let mut causes = Vec::new();

        for (kind, id) in bracket.legs() {
            if !resting.iter().any(|o| o.id == id) {
                continue;
            }
            match self.gateway.cancel_order(id, symbol).await {
                Ok(()) => info!(symbol = %symbol, order_id = %id, kind = %kind, "Order canceled"),
                Err(e) => {
                    warn!(symbol = %symbol, order_id = %id, kind = %kind, error = %e, "Cancel failed");
                    failed.push(id.to_string());
                    causes.push(format!("{kind}: {e}"));
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::CancelFailed {
                symbol: symbol.to_string(),
                order_ids: failed,
                cause: causes.join("; "),
            })
        }
    }
}
