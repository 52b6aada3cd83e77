use async_trait::async_trait;

use crate::{Balance, Candle, OpenOrder, OrderHandle, OrderKind, OrderSide, Result};

/// Abstraction over the exchange connection.
///
/// `BinanceClient` implements this for live trading.
/// `PaperClient` implements this for simulation.
///
/// Every call is awaited in place by the scan loop; implementations must not
/// assume concurrent use for the same symbol.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Historical candles for `symbol`, oldest first, no duplicate timestamps.
    async fn fetch_candles(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>>;

    /// Submit a market order for `size` base units.
    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: f64,
    ) -> Result<OrderHandle>;

    /// Submit a stop or take-profit order that activates at `trigger_price`.
    async fn create_conditional_order(
        &self,
        symbol: &str,
        kind: OrderKind,
        side: OrderSide,
        size: f64,
        trigger_price: f64,
    ) -> Result<OrderHandle>;

    /// Orders still resting on the exchange for `symbol`.
    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>>;

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<()>;

    /// Informational only; never consulted by trading logic.
    async fn fetch_balance(&self) -> Result<Balance>;
}
