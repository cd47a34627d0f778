//! Run command implementation
//!
//! Replays a recorded feed (JSON lines of signals, candles, and price
//! updates) through the full engine: sizing, risk checks, regime
//! detection, adaptation, and exit monitoring.

use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::adaptive::AdaptiveConfig;
use crate::config::Config;
use crate::engine::Engine;
use crate::journal::Journal;
use crate::ledger::{Ledger, LedgerError};
use crate::monitor::{PositionMonitor, PriceError, PriceSource};
use crate::pipeline::Signal;
use crate::regime::{Candle, RegimeDetector};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Feed file: one JSON event per line
    #[arg(short, long)]
    pub feed: PathBuf,
}

/// One line of the replay feed
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum FeedEvent {
    Signal(Signal),
    Candle(Candle),
    Price {
        symbol: String,
        price: Decimal,
        timestamp: DateTime<Utc>,
    },
}

/// Price source backed by the latest replayed prices
struct ReplayPrices {
    prices: std::sync::Mutex<HashMap<String, Decimal>>,
}

impl ReplayPrices {
    fn new() -> Self {
        Self {
            prices: std::sync::Mutex::new(HashMap::new()),
        }
    }

    fn set(&self, symbol: String, price: Decimal) {
        if let Ok(mut prices) = self.prices.lock() {
            prices.insert(symbol, price);
        }
    }
}

#[async_trait]
impl PriceSource for ReplayPrices {
    async fn price(&self, symbol: &str) -> Result<Decimal, PriceError> {
        self.prices
            .lock()
            .map_err(|_| PriceError::Unavailable(symbol.to_string()))?
            .get(symbol)
            .copied()
            .ok_or_else(|| PriceError::Unavailable(symbol.to_string()))
    }
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut ledger = Ledger::new(config.account.initial_balance, config.limits.clone());
        if let Some(path) = &config.account.journal_path {
            ledger = ledger.with_journal(Journal::open(path)?);
        }

        let mut engine = Engine::new(
            ledger,
            config.strategy.to_parameters(),
            AdaptiveConfig {
                speed: config.adaptation.speed,
                strength: config.adaptation.strength,
            },
            RegimeDetector::new(config.regime.to_regime_config()),
        );

        let prices = Arc::new(ReplayPrices::new());
        let monitor = PositionMonitor::new(
            engine.ledger(),
            prices.clone(),
            config.monitor.to_monitor_config(),
        );

        let file = std::fs::File::open(&self.feed)?;
        let reader = std::io::BufReader::new(file);

        let mut accepted = 0usize;
        let mut rejected = 0usize;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: FeedEvent = serde_json::from_str(&line)
                .map_err(|e| anyhow::anyhow!("feed line {}: {}", line_no + 1, e))?;

            match event {
                FeedEvent::Signal(signal) => {
                    let at = signal.timestamp;
                    match engine.submit_signal(&signal, at).await {
                        Ok(id) => {
                            accepted += 1;
                            tracing::info!(%id, symbol = %signal.symbol, "signal accepted");
                        }
                        Err(LedgerError::Rejected(reason)) => {
                            rejected += 1;
                            tracing::info!(symbol = %signal.symbol, %reason, "signal rejected");
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                FeedEvent::Candle(candle) => {
                    let at = candle.timestamp;
                    engine.observe_candle(candle);
                    if let Some(record) = engine.evaluate_adaptation(at).await? {
                        tracing::info!(
                            regime = ?record.regime,
                            reason = ?record.reason,
                            "strategy parameters adapted"
                        );
                    }
                }
                FeedEvent::Price {
                    symbol,
                    price,
                    timestamp,
                } => {
                    prices.set(symbol, price);
                    let summary = monitor.tick(timestamp).await?;
                    for (id, reason) in &summary.closed {
                        tracing::info!(%id, %reason, "position closed");
                    }
                    if summary.emergency_triggered {
                        tracing::warn!("global stop-loss fired, account taken flat");
                    }
                }
            }
        }

        let report = engine.report().await;
        println!("Replay finished");
        println!("  Signals:        {} accepted, {} rejected", accepted, rejected);
        println!("  Balance:        {}", report.account.balance);
        println!("  Daily P&L:      {}", report.account.daily_pnl);
        println!("  Open positions: {}", report.metrics.open_positions);
        println!("  Win rate:       {}", report.metrics.win_rate);
        println!("  Max drawdown:   {}%", report.metrics.max_drawdown_pct);
        println!("  Risk level:     {:?}", report.metrics.risk_level);
        Ok(())
    }
}
