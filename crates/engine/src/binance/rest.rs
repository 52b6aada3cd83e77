use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use common::{
    Balance, Candle, Error, ExchangeGateway, OpenOrder, OrderHandle, OrderKind, OrderSide, Result,
};

const BASE_URL: &str = "https://api.binance.com";
const KLINE_LIMIT: u16 = 500;

/// REST API client for Binance spot. Implements the full gateway: candles,
/// market and conditional orders, open-order queries, cancels and balances.
pub struct BinanceClient {
    api_key: String,
    secret: String,
    base_url: String,
    http: Client,
}

impl BinanceClient {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            secret: secret.into(),
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another host (testnet or a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn timestamp_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn sign(&self, query: &str) -> Result<String> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid signing secret: {e}")))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn public_get(&self, path: &str, params: &str) -> Result<String> {
        let url = format!("{}{path}?{params}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        read_body(resp).await
    }

    /// Signed request. GET and DELETE carry the signed query in the URL,
    /// POST carries it as a form body.
    async fn signed(&self, method: Method, path: &str, params: &str) -> Result<String> {
        let ts = Self::timestamp_ms();
        let query = if params.is_empty() {
            format!("timestamp={ts}")
        } else {
            format!("{params}&timestamp={ts}")
        };
        let signature = self.sign(&query)?;
        let signed_query = format!("{query}&signature={signature}");

        let request = if method == Method::POST {
            self.http
                .post(format!("{}{path}", self.base_url))
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(signed_query)
        } else {
            self.http
                .request(method, format!("{}{path}?{signed_query}", self.base_url))
        };

        let resp = request
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        read_body(resp).await
    }

    async fn place_order(&self, params: String) -> Result<OrderResponse> {
        let body = self.signed(Method::POST, "/api/v3/order", &params).await?;
        serde_json::from_str(&body).map_err(|e| Error::Exchange(e.to_string()))
    }
}

async fn read_body(resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
    if !status.is_success() {
        return Err(Error::Exchange(format!("HTTP {status}: {body}")));
    }
    Ok(body)
}

#[async_trait]
impl ExchangeGateway for BinanceClient {
    async fn fetch_candles(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>> {
        let params = format!("symbol={symbol}&interval={timeframe}&limit={KLINE_LIMIT}");
        let body = self.public_get("/api/v3/klines", &params).await?;
        parse_klines(&body)
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: f64,
    ) -> Result<OrderHandle> {
        let params = format!(
            "symbol={symbol}&side={side}&type=MARKET&quantity={}&newClientOrderId={}",
            format_decimal(size),
            uuid::Uuid::new_v4().simple()
        );

        debug!(symbol = %symbol, side = %side, size = size, "Submitting market order to Binance");
        let resp = self.place_order(params).await?;

        let fill_price = resp
            .fills
            .first()
            .and_then(|f| f.price.parse::<f64>().ok());

        Ok(OrderHandle {
            id: resp.order_id.to_string(),
            symbol: symbol.to_string(),
            kind: OrderKind::Market,
            side,
            size,
            price: fill_price,
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
        let order_type = match kind {
            OrderKind::Stop => "STOP_LOSS_LIMIT",
            OrderKind::TakeProfit => "TAKE_PROFIT_LIMIT",
            OrderKind::Market => {
                return Err(Error::Exchange(
                    "market orders are not conditional".to_string(),
                ))
            }
        };
        let price = format_decimal(trigger_price);
        let params = format!(
            "symbol={symbol}&side={side}&type={order_type}&timeInForce=GTC&quantity={}&price={price}&stopPrice={price}",
            format_decimal(size)
        );

        debug!(symbol = %symbol, kind = %kind, trigger = trigger_price, "Submitting conditional order to Binance");
        let resp = self.place_order(params).await?;

        Ok(OrderHandle {
            id: resp.order_id.to_string(),
            symbol: symbol.to_string(),
            kind,
            side,
            size,
            price: Some(trigger_price),
            timestamp: Utc::now(),
        })
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let body = self
            .signed(Method::GET, "/api/v3/openOrders", &format!("symbol={symbol}"))
            .await?;
        parse_open_orders(&body)
    }

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<()> {
        self.signed(
            Method::DELETE,
            "/api/v3/order",
            &format!("symbol={symbol}&orderId={id}"),
        )
        .await?;
        Ok(())
    }

    async fn fetch_balance(&self) -> Result<Balance> {
        let body = self.signed(Method::GET, "/api/v3/account", "").await?;
        let account: AccountResponse =
            serde_json::from_str(&body).map_err(|e| Error::Exchange(e.to_string()))?;

        let total = account
            .balances
            .into_iter()
            .filter_map(|b| {
                let qty =
                    b.free.parse::<f64>().unwrap_or(0.0) + b.locked.parse::<f64>().unwrap_or(0.0);
                (qty > 0.0).then_some((b.asset, qty))
            })
            .collect();

        Ok(Balance { total })
    }
}

/// Binance rejects exponent notation and long fractional tails.
fn format_decimal(value: f64) -> String {
    let s = format!("{value:.8}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

// ─── Response parsing ────────────────────────────────────────────────────────

/// Kline rows are positional arrays:
/// `[open_time, "open", "high", "low", "close", "volume", close_time, ...]`.
fn parse_klines(body: &str) -> Result<Vec<Candle>> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(body)?;
    let mut candles: Vec<Candle> = Vec::with_capacity(rows.len());

    for row in rows {
        let open_time = row
            .first()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| Error::Exchange("kline row missing open time".into()))?;
        let field = |i: usize| -> Result<f64> {
            row.get(i)
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| Error::Exchange(format!("kline row has bad field {i}")))
        };
        let timestamp = Utc
            .timestamp_millis_opt(open_time)
            .single()
            .ok_or_else(|| Error::Exchange(format!("bad kline timestamp {open_time}")))?;

        if let Some(last) = candles.last() {
            if timestamp <= last.timestamp {
                return Err(Error::Exchange(format!(
                    "klines out of order at {timestamp}"
                )));
            }
        }

        candles.push(Candle {
            timestamp,
            open: field(1)?,
            high: field(2)?,
            low: field(3)?,
            close: field(4)?,
            volume: field(5)?,
        });
    }
    Ok(candles)
}

fn parse_open_orders(body: &str) -> Result<Vec<OpenOrder>> {
    let orders: Vec<OpenOrderResponse> =
        serde_json::from_str(body).map_err(|e| Error::Exchange(e.to_string()))?;

    orders
        .into_iter()
        .map(|o| {
            let side = match o.side.as_str() {
                "BUY" => OrderSide::Buy,
                "SELL" => OrderSide::Sell,
                other => return Err(Error::Exchange(format!("unknown order side '{other}'"))),
            };
            let limit = o.price.parse::<f64>().unwrap_or(0.0);
            let stop = o.stop_price.parse::<f64>().unwrap_or(0.0);
            // Plain stop orders report a zero limit price
            let price = if limit > 0.0 { limit } else { stop };
            Ok(OpenOrder {
                id: o.order_id.to_string(),
                side,
                price,
            })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
    #[serde(default)]
    fills: Vec<FillDetail>,
}

#[derive(Deserialize)]
struct FillDetail {
    price: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenOrderResponse {
    order_id: u64,
    side: String,
    price: String,
    #[serde(default)]
    stop_price: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    balances: Vec<AssetBalance>,
}

#[derive(Deserialize)]
struct AssetBalance {
    asset: String,
    free: String,
    locked: String,
}
