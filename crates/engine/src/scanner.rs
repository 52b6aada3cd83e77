use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use common::{Error, ExchangeGateway};
use risk::PositionLedger;
use strategy::indicators::EMA_PERIODS;
use strategy::{annotate, Decision, Rule, ScanConfig, SignalEvaluator};

use crate::orders::{OrderManager, Trigger};

/// What the scan loop needs from the config file.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub symbols: Vec<String>,
    pub timeframe: String,
    pub poll_interval: Duration,
}

impl From<&ScanConfig> for ScanSettings {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            symbols: cfg.symbols.clone(),
            timeframe: cfg.timeframe.clone(),
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
        }
    }
}

/// Result of one symbol's turn in a cycle.
#[derive(Debug, Clone, Default)]
pub struct SymbolReport {
    pub candles: usize,
    /// Signals acted on, in evaluation order.
    pub decisions: Vec<Decision>,
    pub trigger: Option<Trigger>,
}

/// A symbol's turn ended early: which step failed and why.
#[derive(Debug, thiserror::Error)]
#[error("{op} failed: {source}")]
pub struct ScanError {
    /// `fetch_candles`, `enter_position` or `reconcile`.
    pub op: &'static str,
    pub source: Error,
}

impl ScanError {
    fn at(op: &'static str) -> impl FnOnce(Error) -> Self {
        move |source| Self { op, source }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub op: &'static str,
    pub error: String,
}

/// Summary of one pass over every configured symbol.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub symbols_ok: usize,
    pub entries: usize,
    pub triggers: usize,
    /// Every symbol whose turn was aborted.
    pub failures: Vec<SymbolFailure>,
}

/// Drives fetch → indicators → signals → orders for each symbol in turn,
/// once per polling interval.
///
/// Owns the ledger; the order manager borrows it for each call. Symbols are
/// processed strictly one after another, so the ledger needs no locking.
pub struct ScanLoop {
    gateway: Arc<dyn ExchangeGateway>,
    evaluator: SignalEvaluator,
    orders: OrderManager,
    ledger: PositionLedger,
    settings: ScanSettings,
}

impl ScanLoop {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        evaluator: SignalEvaluator,
        orders: OrderManager,
        settings: ScanSettings,
    ) -> Self {
        Self {
            gateway,
            evaluator,
            orders,
            ledger: PositionLedger::new(),
            settings,
        }
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Run forever: one cycle, then the fixed wait. Call from the main task.
    pub async fn run(mut self) {
        info!(
            symbols = ?self.settings.symbols,
            timeframe = %self.settings.timeframe,
            interval = ?self.settings.poll_interval,
            "Scan loop running"
        );
        loop {
            let report = self.run_cycle().await;
            info!(
                ok = report.symbols_ok,
                failed = report.failures.len(),
                entries = report.entries,
                triggers = report.triggers,
                open = self.ledger.len(),
                "Cycle complete"
            );
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Process every symbol once. A failing symbol is logged and skipped; the
    /// rest of the cycle still runs.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        for symbol in self.settings.symbols.clone() {
            match self.scan_symbol(&symbol).await {
                Ok(sym) => {
                    report.symbols_ok += 1;
                    report.entries += sym.decisions.len();
                    report.triggers += usize::from(sym.trigger.is_some());
                }
                Err(e) => {
                    error!(
                        symbol = %symbol,
                        op = e.op,
                        gateway = e.source.is_gateway(),
                        error = %e.source,
                        "Symbol scan failed"
                    );
                    report.failures.push(SymbolFailure {
                        symbol: symbol.clone(),
                        op: e.op,
                        error: e.source.to_string(),
                    });
                }
            }

            if let Err(e) = self.ledger.check_invariants() {
                error!(symbol = %symbol, error = %e, "Ledger invariant violated");
            }
        }
        report
    }

    /// One symbol's turn: evaluate the full candle history, entering as
    /// signals fire, then reconcile any open bracket.
    pub async fn scan_symbol(&mut self, symbol: &str) -> Result<SymbolReport, ScanError> {
        info!(symbol = %symbol, "Fetching prices");
        let candles = self
            .gateway
            .fetch_candles(symbol, &self.settings.timeframe)
            .await
            .map_err(ScanError::at("fetch_candles"))?;
        info!(symbol = %symbol, count = candles.len(), "Fetched price points");

        let longest = EMA_PERIODS.iter().copied().max().unwrap_or_default();
        if candles.len() < longest {
            warn!(
                symbol = %symbol,
                count = candles.len(),
                needed = longest,
                "Insufficient history; long indicators absent"
            );
        }

        let bars = annotate(&candles);
        let mut report = SymbolReport {
            candles: candles.len(),
            ..SymbolReport::default()
        };

        for (i, pair) in bars.windows(2).enumerate() {
            let (prev, curr) = (&pair[0], &pair[1]);
            debug!(symbol = %symbol, index = i + 1, at = %curr.candle.timestamp, "Analyzing candle");

            for rule in Rule::ALL {
                // Re-read after every entry: a rule may act on the position the
                // previous rule just opened.
                let position = self.ledger.position(symbol);
                let signal = self.evaluator.evaluate(rule, prev, curr, position);
                let Some(side) = signal.entry_side() else {
                    continue;
                };

                let entry_price = curr.candle.close;
                info!(
                    symbol = %symbol,
                    signal = ?signal,
                    rule = %rule,
                    at = %curr.candle.timestamp,
                    price = entry_price,
                    "Signal"
                );
                report.decisions.push(Decision {
                    index: i + 1,
                    timestamp: curr.candle.timestamp,
                    rule,
                    signal,
                    price: entry_price,
                });

                let size = self.orders.risk().position_size(entry_price);
                self.orders
                    .enter_position(&mut self.ledger, symbol, side, size, entry_price)
                    .await
                    .map_err(ScanError::at("enter_position"))?;
            }
        }

        if self.ledger.get(symbol).is_some() {
            info!(symbol = %symbol, "Managing open orders");
            report.trigger = self
                .orders
                .reconcile(&mut self.ledger, symbol)
                .await
                .map_err(ScanError::at("reconcile"))?;
        }

        Ok(report)
    }
}
