use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use common::{
    Balance, Candle, Error, ExchangeGateway, OpenOrder, OrderHandle, OrderKind, OrderSide, Result,
};

/// Wraps a gateway so that no single call can stall the scan loop for longer
/// than `limit`. A timed-out call fails with `Error::Timeout`; trading
/// behaviour is otherwise unchanged.
pub struct TimedGateway {
    inner: Arc<dyn ExchangeGateway>,
    limit: Duration,
}

impl TimedGateway {
    pub fn new(inner: Arc<dyn ExchangeGateway>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn call<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.limit, fut)
            .await
            .map_err(|_| Error::Timeout {
                op,
                secs: self.limit.as_secs(),
            })?
    }
}

#[async_trait]
impl ExchangeGateway for TimedGateway {
    async fn fetch_candles(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>> {
        self.call("fetch_candles", self.inner.fetch_candles(symbol, timeframe))
            .await
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: f64,
    ) -> Result<OrderHandle> {
        self.call(
            "create_market_order",
            self.inner.create_market_order(symbol, side, size),
        )
        .await
    }

    async fn create_conditional_order(
        &self,
        symbol: &str,
        kind: OrderKind,
        side: OrderSide,
        size: f64,
        trigger_price: f64,
    ) -> Result<OrderHandle> {
        self.call(
            "create_conditional_order",
            self.inner
                .create_conditional_order(symbol, kind, side, size, trigger_price),
        )
        .await
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        self.call("fetch_open_orders", self.inner.fetch_open_orders(symbol))
            .await
    }

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<()> {
        self.call("cancel_order", self.inner.cancel_order(id, symbol))
            .await
    }

    async fn fetch_balance(&self) -> Result<Balance> {
        self.call("fetch_balance", self.inner.fetch_balance()).await
    }
}
