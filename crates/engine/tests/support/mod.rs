#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use common::{
    Balance, Candle, Error, ExchangeGateway, OpenOrder, OrderHandle, OrderKind, OrderSide, Result,
};

/// Every gateway call the code under test made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchCandles(String),
    Market { symbol: String, side: OrderSide, size: f64 },
    Conditional { symbol: String, kind: OrderKind, side: OrderSide, trigger: f64 },
    FetchOpen(String),
    Cancel { id: String, symbol: String },
}

/// In-memory gateway with scripted responses and failures. Accepted
/// conditional orders rest in the open-order book until cancelled or
/// replaced with `set_open_orders`.
#[derive(Default)]
pub struct ScriptedGateway {
    candles: Mutex<HashMap<String, Vec<Candle>>>,
    open_orders: Mutex<HashMap<String, Vec<OpenOrder>>>,
    failing_symbols: Mutex<HashSet<String>>,
    failing_kinds: Mutex<HashSet<&'static str>>,
    failing_cancels: AtomicBool,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles.lock().unwrap().insert(symbol.into(), candles);
    }

    pub fn set_open_orders(&self, symbol: &str, orders: Vec<OpenOrder>) {
        self.open_orders.lock().unwrap().insert(symbol.into(), orders);
    }

    /// Make `fetch_candles` fail for `symbol`.
    pub fn fail_symbol(&self, symbol: &str) {
        self.failing_symbols.lock().unwrap().insert(symbol.into());
    }

    /// Make every order of `kind` ("market", "stop", "take_profit") fail.
    pub fn fail_kind(&self, kind: &'static str) {
        self.failing_kinds.lock().unwrap().insert(kind);
    }

    /// Make every `cancel_order` fail.
    pub fn fail_cancels(&self) {
        self.failing_cancels.store(true, Ordering::SeqCst);
    }

    /// Orders currently resting for `symbol`.
    pub fn resting(&self, symbol: &str) -> Vec<OpenOrder> {
        self.open_orders.lock().unwrap().get(symbol).cloned().unwrap_or_default()
    }

    pub fn cancel_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Cancel { .. }))
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn market_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Market { .. }))
            .collect()
    }

    pub fn conditional_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Conditional { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn fails(&self, kind: OrderKind) -> bool {
        let label = match kind {
            OrderKind::Market => "market",
            OrderKind::Stop => "stop",
            OrderKind::TakeProfit => "take_profit",
        };
        self.failing_kinds.lock().unwrap().contains(label)
    }

    fn handle(&self, symbol: &str, kind: OrderKind, side: OrderSide, size: f64, price: Option<f64>) -> OrderHandle {
        OrderHandle {
            id: format!("ord-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            symbol: symbol.into(),
            kind,
            side,
            size,
            price,
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
impl ExchangeGateway for ScriptedGateway {
    async fn fetch_candles(&self, symbol: &str, _timeframe: &str) -> Result<Vec<Candle>> {
        self.record(Call::FetchCandles(symbol.into()));
        if self.failing_symbols.lock().unwrap().contains(symbol) {
            return Err(Error::Http(format!("connection reset fetching {symbol}")));
        }
        Ok(self.candles.lock().unwrap().get(symbol).cloned().unwrap_or_default())
    }

    async fn create_market_order(&self, symbol: &str, side: OrderSide, size: f64) -> Result<OrderHandle> {
        self.record(Call::Market { symbol: symbol.into(), side, size });
        if self.fails(OrderKind::Market) {
            return Err(Error::Exchange("HTTP 400: insufficient balance".into()));
        }
        Ok(self.handle(symbol, OrderKind::Market, side, size, None))
    }

    async fn create_conditional_order(
        &self,
        symbol: &str,
        kind: OrderKind,
        side: OrderSide,
        size: f64,
        trigger_price: f64,
    ) -> Result<OrderHandle> {
        self.record(Call::Conditional { symbol: symbol.into(), kind, side, trigger: trigger_price });
        if self.fails(kind) {
            return Err(Error::Exchange(format!("HTTP 400: {kind} rejected")));
        }
        let handle = self.handle(symbol, kind, side, size, Some(trigger_price));
        self.open_orders
            .lock()
            .unwrap()
            .entry(symbol.into())
            .or_default()
            .push(OpenOrder { id: handle.id.clone(), side, price: trigger_price });
        Ok(handle)
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        self.record(Call::FetchOpen(symbol.into()));
        Ok(self.open_orders.lock().unwrap().get(symbol).cloned().unwrap_or_default())
    }

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<()> {
        self.record(Call::Cancel { id: id.into(), symbol: symbol.into() });
        if self.failing_cancels.load(Ordering::SeqCst) {
            return Err(Error::Exchange(format!("HTTP 400: unknown order {id}")));
        }
        if let Some(orders) = self.open_orders.lock().unwrap().get_mut(symbol) {
            orders.retain(|o| o.id != id);
        }
        Ok(())
    }

    async fn fetch_balance(&self) -> Result<Balance> {
        Ok(Balance::default())
    }
}

pub fn candle(index: i64, open: f64, close: f64) -> Candle {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Candle {
        timestamp: start + Duration::hours(index),
        open,
        high: open.max(close) + 0.5,
        low: open.min(close) - 0.5,
        close,
        volume: 10.0,
    }
}

/// 34 doji candles alternating between 88 and 92, then a bearish candle
/// 100 -> 98 and a bullish engulfing candle 97 -> 101. The only signal in the
/// history is an engulfing long at 101 on the last candle.
pub fn engulfing_history() -> Vec<Candle> {
    let mut candles: Vec<Candle> = (0..34)
        .map(|i| {
            let level = if i % 2 == 0 { 88.0 } else { 92.0 };
            candle(i, level, level)
        })
        .collect();
    candles.push(candle(34, 100.0, 98.0));
    candles.push(candle(35, 97.0, 101.0));
    candles
}
