use thiserror::Error;

use crate::OrderKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Gateway call '{op}' timed out after {secs}s")]
    Timeout { op: &'static str, secs: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A ledger invariant would be broken. Never expected in correct operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The entry filled but at least one protective leg was not placed.
    /// The position is live on the exchange without full protection.
    #[error("Bracket incomplete on {symbol}: missing {missing:?} ({cause})")]
    BracketIncomplete {
        symbol: String,
        missing: Vec<OrderKind>,
        cause: String,
    },

    /// Protective legs that should have been withdrawn are still resting on
    /// the exchange.
    #[error("Failed to cancel {order_ids:?} on {symbol}: {cause}")]
    CancelFailed {
        symbol: String,
        order_ids: Vec<String>,
        cause: String,
    },
}

impl Error {
    /// True for failures that originate at the exchange boundary
    /// (network, auth, exchange-side rejection, timeouts).
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            Error::Exchange(_) | Error::Http(_) | Error::Timeout { .. } | Error::Json(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
