use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{Config, ExchangeGateway, TradingMode};
use engine::{BinanceClient, OrderManager, ScanLoop, ScanSettings, TimedGateway};
use paper::PaperClient;
use risk::RiskConfig;
use strategy::{SignalEvaluator, StrategyFileConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("loading environment")?;
    info!(mode = %cfg.trading_mode, "SpotBot starting");

    let strategy_file = StrategyFileConfig::load(&cfg.bot_config_path)
        .with_context(|| format!("loading {}", cfg.bot_config_path))?;
    let risk_cfg = RiskConfig::load(&cfg.bot_config_path)
        .with_context(|| format!("loading risk section of {}", cfg.bot_config_path))?;

    // ── Exchange gateway (injected based on TRADING_MODE) ─────────────────────
    let binance = BinanceClient::new(&cfg.binance_api_key, &cfg.binance_secret)?;
    let raw: Arc<dyn ExchangeGateway> = match cfg.trading_mode {
        TradingMode::Live => {
            info!("Live trading mode, using BinanceClient");
            Arc::new(binance)
        }
        TradingMode::Paper => {
            info!(
                slippage_bps = cfg.paper_slippage_bps,
                balance = cfg.paper_balance_usd,
                "Paper trading mode, using PaperClient over public market data"
            );
            Arc::new(PaperClient::new(
                Arc::new(binance),
                cfg.paper_balance_usd,
                cfg.paper_slippage_bps,
            ))
        }
    };
    let gateway: Arc<dyn ExchangeGateway> = Arc::new(TimedGateway::new(
        raw,
        Duration::from_secs(strategy_file.scan.call_timeout_secs),
    ));

    match gateway.fetch_balance().await {
        Ok(balance) => info!(balance = ?balance.total, "Account balance"),
        Err(e) => error!(error = %e, "Failed to fetch account balance"),
    }

    // ── Scan loop ─────────────────────────────────────────────────────────────
    let orders = OrderManager::new(gateway.clone(), risk_cfg);
    let evaluator = SignalEvaluator::new(strategy_file.rules);
    let settings = ScanSettings::from(&strategy_file.scan);

    let scan = ScanLoop::new(gateway, evaluator, orders, settings);

    tokio::select! {
        _ = scan.run() => {}
        res = tokio::signal::ctrl_c() => {
            res.context("waiting for shutdown signal")?;
            info!("Shutdown signal received. Exiting.");
        }
    }
    Ok(())
}
