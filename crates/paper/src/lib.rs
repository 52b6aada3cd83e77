use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{
    Balance, Candle, Error, ExchangeGateway, OpenOrder, OrderHandle, OrderKind, OrderSide, Result,
};

const QUOTE_ASSET: &str = "USDT";

/// A conditional order resting in the simulated book.
#[derive(Debug, Clone)]
struct RestingOrder {
    id: String,
    kind: OrderKind,
    side: OrderSide,
    size: f64,
    trigger: f64,
    /// Open time of the newest candle seen when the order was placed. Only
    /// later candles can fill it.
    placed_after: Option<DateTime<Utc>>,
}

impl RestingOrder {
    fn eligible(&self, candle: &Candle) -> bool {
        self.placed_after.map_or(true, |t| candle.timestamp > t)
    }

    /// Stop sells and take-profit buys fire on the way down; the other two
    /// fire on the way up.
    fn crossed_by(&self, candle: &Candle) -> bool {
        match (self.kind, self.side) {
            (OrderKind::Stop, OrderSide::Sell) | (OrderKind::TakeProfit, OrderSide::Buy) => {
                candle.low <= self.trigger
            }
            (OrderKind::Stop, OrderSide::Buy) | (OrderKind::TakeProfit, OrderSide::Sell) => {
                candle.high >= self.trigger
            }
            (OrderKind::Market, _) => false,
        }
    }
}

#[derive(Default)]
struct Book {
    /// Latest close seen per symbol.
    prices: HashMap<String, f64>,
    /// Open time of the latest candle seen per symbol.
    last_candle: HashMap<String, DateTime<Utc>>,
    resting: HashMap<String, Vec<RestingOrder>>,
    balances: HashMap<String, f64>,
}

impl Book {
    fn settle(&mut self, symbol: &str, side: OrderSide, size: f64, price: f64) {
        let base = base_asset(symbol).to_string();
        let notional = size * price;
        let (base_delta, quote_delta) = match side {
            OrderSide::Buy => (size, -notional),
            OrderSide::Sell => (-size, notional),
        };
        *self.balances.entry(base).or_insert(0.0) += base_delta;
        *self.balances.entry(QUOTE_ASSET.to_string()).or_insert(0.0) += quote_delta;
    }
}

/// Simulated exchange for paper trading.
///
/// Candles come from a real feed (normally the public Binance klines
/// endpoint). Market orders fill at the latest close with configurable
/// slippage; stop and take-profit orders rest until a later candle's range
/// crosses their trigger. No real orders are ever sent.
pub struct PaperClient {
    feed: Arc<dyn ExchangeGateway>,
    book: RwLock<Book>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperClient {
    pub fn new(feed: Arc<dyn ExchangeGateway>, initial_balance_usd: f64, slippage_bps: f64) -> Self {
        info!(
            balance = initial_balance_usd,
            slippage_bps = slippage_bps,
            "PaperClient initialized"
        );
        let mut book = Book::default();
        book.balances
            .insert(QUOTE_ASSET.to_string(), initial_balance_usd);
        Self {
            feed,
            book: RwLock::new(book),
            slippage_bps,
        }
    }

    fn fill_price(&self, side: OrderSide, mid: f64) -> f64 {
        // Buys pay more, sells receive less
        match side {
            OrderSide::Buy => mid * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => mid * (1.0 - self.slippage_bps / 10_000.0),
        }
    }

    /// Record the newest candle and fill resting orders crossed by any
    /// candle newer than their placement.
    async fn sweep(&self, symbol: &str, candles: &[Candle]) {
        let Some(latest) = candles.last() else {
            return;
        };
        let mut book = self.book.write().await;
        book.prices.insert(symbol.to_string(), latest.close);
        book.last_candle.insert(symbol.to_string(), latest.timestamp);

        let Some(resting) = book.resting.get_mut(symbol) else {
            return;
        };
        let (filled, still_open): (Vec<_>, Vec<_>) = resting.drain(..).partition(|o| {
            candles
                .iter()
                .any(|c| o.eligible(c) && o.crossed_by(c))
        });
        *resting = still_open;

        for order in filled {
            info!(
                symbol = %symbol,
                order_id = %order.id,
                kind = %order.kind,
                trigger = order.trigger,
                "Paper conditional order filled"
            );
            book.settle(symbol, order.side, order.size, order.trigger);
        }
    }
}

fn base_asset(symbol: &str) -> &str {
    symbol.strip_suffix(QUOTE_ASSET).unwrap_or(symbol)
}

#[async_trait]
impl ExchangeGateway for PaperClient {
    async fn fetch_candles(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>> {
        let candles = self.feed.fetch_candles(symbol, timeframe).await?;
        self.sweep(symbol, &candles).await;
        Ok(candles)
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: f64,
    ) -> Result<OrderHandle> {
        let mut book = self.book.write().await;
        let mid = book.prices.get(symbol).copied().ok_or_else(|| {
            Error::Exchange(format!(
                "PaperClient has no price for '{symbol}'. Fetch candles first."
            ))
        })?;
        let fill_price = self.fill_price(side, mid);
        book.settle(symbol, side, size, fill_price);

        debug!(
            symbol = %symbol,
            side = %side,
            mid = mid,
            fill = fill_price,
            size = size,
            "Paper fill simulated"
        );

        Ok(OrderHandle {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            kind: OrderKind::Market,
            side,
            size,
            price: Some(fill_price),
            timestamp: Utc::now(),
        })
    }

    async fn create_conditional_order(
        &self,
        symbol: &str,
        kind: OrderKind,
        side: OrderSide,
        size: f64,
        trigger_price: f64,
    ) -> Result<OrderHandle> {
        if kind == OrderKind::Market {
            return Err(Error::Exchange("market orders are not conditional".into()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let mut book = self.book.write().await;
        let placed_after = book.last_candle.get(symbol).copied();
        book.resting
            .entry(symbol.to_string())
            .or_default()
            .push(RestingOrder {
                id: id.clone(),
                kind,
                side,
                size,
                trigger: trigger_price,
                placed_after,
            });

        Ok(OrderHandle {
            id,
            symbol: symbol.to_string(),
            kind,
            side,
            size,
            price: Some(trigger_price),
            timestamp: Utc::now(),
        })
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let book = self.book.read().await;
        Ok(book
            .resting
            .get(symbol)
            .map(|orders| {
                orders
                    .iter()
                    .map(|o| OpenOrder {
                        id: o.id.clone(),
                        side: o.side,
                        price: o.trigger,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<()> {
        let mut book = self.book.write().await;
        let orders = book.resting.get_mut(symbol).ok_or_else(|| {
            Error::Exchange(format!("Unknown order {id} for {symbol}"))
        })?;
        let before = orders.len();
        orders.retain(|o| o.id != id);
        if orders.len() == before {
            return Err(Error::Exchange(format!("Unknown order {id} for {symbol}")));
        }
        Ok(())
    }

    async fn fetch_balance(&self) -> Result<Balance> {
        Ok(Balance {
            total: self.book.read().await.balances.clone(),
        })
    }
}
