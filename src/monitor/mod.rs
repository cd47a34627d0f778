//! Position monitor
//!
//! Periodic re-pricing of open positions and exit-condition evaluation.
//! Price fetches are the only suspension points and fail closed: an
//! unavailable symbol is skipped this tick and retried on the next one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::ledger::{CloseReason, Ledger, PositionId};
use crate::telemetry::{record_latency, LatencyMetric};

/// Price fetch errors
#[derive(Debug, Error)]
pub enum PriceError {
    /// Transient: skip the symbol this tick, retry next tick
    #[error("price unavailable for {0}")]
    Unavailable(String),
}

/// Live price lookup for open symbols. The only async seam in the core.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current price for a symbol
    async fn price(&self, symbol: &str) -> Result<Decimal, PriceError>;
}

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Seconds between ticks
    pub tick_interval_secs: u64,
    /// Per-symbol price fetch timeout in milliseconds
    pub price_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            price_timeout_ms: 2_000,
        }
    }
}

/// What one tick did
#[derive(Debug, Default)]
pub struct TickSummary {
    /// Positions re-priced this tick
    pub marked: usize,
    /// Positions closed, with the reason recorded
    pub closed: Vec<(PositionId, CloseReason)>,
    /// Symbols skipped because their price was unavailable
    pub skipped: Vec<String>,
    /// Whether the global stop-loss fired during this tick
    pub emergency_triggered: bool,
}

/// Periodically re-prices open positions and triggers exits
pub struct PositionMonitor {
    ledger: Arc<Mutex<Ledger>>,
    source: Arc<dyn PriceSource>,
    config: MonitorConfig,
}

impl PositionMonitor {
    /// Create a monitor over the shared ledger
    pub fn new(ledger: Arc<Mutex<Ledger>>, source: Arc<dyn PriceSource>, config: MonitorConfig) -> Self {
        Self {
            ledger,
            source,
            config,
        }
    }

    /// One evaluation pass.
    ///
    /// Positions are walked in insertion order. Exit conditions are
    /// checked in priority order: max hold time, then stop-loss, then
    /// take-profit; the first match closes the position with that reason
    /// and nothing else is recorded for it this tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickSummary, anyhow::Error> {
        let started = Instant::now();
        let mut summary = TickSummary::default();

        let symbols: Vec<String> = {
            let ledger = self.ledger.lock().await;
            let mut symbols: Vec<String> = ledger
                .snapshot()
                .open_positions
                .iter()
                .map(|p| p.symbol.clone())
                .collect();
            symbols.dedup();
            symbols
        };
        if symbols.is_empty() {
            return Ok(summary);
        }

        let mut prices: HashMap<String, Decimal> = HashMap::new();
        for symbol in symbols {
            if prices.contains_key(&symbol) {
                continue;
            }
            let timeout = Duration::from_millis(self.config.price_timeout_ms);
            let fetch_started = Instant::now();
            match tokio::time::timeout(timeout, self.source.price(&symbol)).await {
                Ok(Ok(price)) => {
                    record_latency(LatencyMetric::PriceFetch, fetch_started.elapsed());
                    prices.insert(symbol, price);
                }
                Ok(Err(err)) => {
                    tracing::warn!(%symbol, %err, "price fetch failed, skipping this tick");
                    summary.skipped.push(symbol);
                }
                Err(_) => {
                    tracing::warn!(%symbol, "price fetch timed out, skipping this tick");
                    summary.skipped.push(symbol);
                }
            }
        }

        let mut ledger = self.ledger.lock().await;
        ledger.mark_to_market(&prices);

        let open = ledger.snapshot().open_positions;
        summary.marked = open.iter().filter(|p| prices.contains_key(&p.symbol)).count();
        let max_hold = ledger.limits().max_hold();

        for position in open {
            let price = match prices.get(&position.symbol) {
                Some(price) => *price,
                None => continue,
            };

            // Hold time first, so a stale stop or target on a very old
            // position cannot shadow the time exit.
            let reason = if position.held_for(now) >= max_hold {
                Some(CloseReason::TimeLimit)
            } else if position.stop_hit(price) {
                Some(CloseReason::StopLoss)
            } else if position.target_hit(price) {
                Some(CloseReason::TakeProfit)
            } else {
                None
            };

            if let Some(reason) = reason {
                ledger.close_position(&position.id, price, reason, now)?;
                summary.closed.push((position.id, reason));
            }
        }

        // Global stop-loss: a drawdown past the configured limit takes the
        // whole account flat.
        let limits_dd = ledger.limits().global_stop_loss_pct;
        if !ledger.emergency_stopped() && ledger.snapshot().account.drawdown_pct() >= limits_dd {
            ledger.emergency_stop("global_stop_loss", now)?;
            summary.emergency_triggered = true;
        }

        record_latency(LatencyMetric::MonitorTick, started.elapsed());
        Ok(summary)
    }

    /// Run the tick loop until shutdown is signalled. Cancellation is
    /// cooperative: the in-flight tick finishes before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.tick_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.tick(Utc::now()).await {
                        tracing::error!(%err, "monitor tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("monitor loop stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Direction, OpenRequest};
    use crate::risk::RiskLimits;
    use rust_decimal_macros::dec;

    struct StaticPrices {
        prices: HashMap<String, Decimal>,
    }

    #[async_trait]
    impl PriceSource for StaticPrices {
        async fn price(&self, symbol: &str) -> Result<Decimal, PriceError> {
            self.prices
                .get(symbol)
                .copied()
                .ok_or_else(|| PriceError::Unavailable(symbol.to_string()))
        }
    }

    fn source(pairs: &[(&str, Decimal)]) -> Arc<dyn PriceSource> {
        Arc::new(StaticPrices {
            prices: pairs
                .iter()
                .map(|(s, p)| (s.to_string(), *p))
                .collect(),
        })
    }

    fn request(symbol: &str) -> OpenRequest {
        OpenRequest {
            symbol: symbol.to_string(),
            direction: Direction::Long,
            entry_price: dec!(50000),
            quantity: dec!(0.1),
            stop_loss: dec!(49000),
            take_profit: dec!(52000),
        }
    }

    fn shared_ledger(limits: RiskLimits) -> Arc<Mutex<Ledger>> {
        Arc::new(Mutex::new(Ledger::new(dec!(100000), limits)))
    }

    fn lenient_limits() -> RiskLimits {
        let mut limits = RiskLimits::default();
        limits.max_correlation_exposure_pct = dec!(100);
        limits.cooldown_after_loss_secs = 0;
        limits
    }

    #[tokio::test]
    async fn test_stop_loss_exit() {
        let ledger = shared_ledger(lenient_limits());
        let now = Utc::now();
        ledger
            .lock()
            .await
            .open_position(request("BTCUSDT"), now)
            .unwrap();

        let monitor = PositionMonitor::new(
            ledger.clone(),
            source(&[("BTCUSDT", dec!(49000))]),
            MonitorConfig::default(),
        );
        let summary = monitor.tick(now + chrono::Duration::seconds(10)).await.unwrap();

        assert_eq!(summary.closed.len(), 1);
        assert_eq!(summary.closed[0].1, CloseReason::StopLoss);

        let guard = ledger.lock().await;
        assert!(guard.snapshot().open_positions.is_empty());
        let closed = &guard.closed()[0];
        assert_eq!(closed.realized_pnl, dec!(-100)); // (49000 - 50000) * 0.1
        assert_eq!(guard.snapshot().account.balance, dec!(99900));
    }

    #[tokio::test]
    async fn test_take_profit_exit() {
        let ledger = shared_ledger(lenient_limits());
        let now = Utc::now();
        ledger
            .lock()
            .await
            .open_position(request("BTCUSDT"), now)
            .unwrap();

        let monitor = PositionMonitor::new(
            ledger.clone(),
            source(&[("BTCUSDT", dec!(52000))]),
            MonitorConfig::default(),
        );
        let summary = monitor.tick(now + chrono::Duration::seconds(10)).await.unwrap();
        assert_eq!(summary.closed[0].1, CloseReason::TakeProfit);
        assert_eq!(ledger.lock().await.snapshot().account.balance, dec!(100200));
    }

    #[tokio::test]
    async fn test_time_limit_beats_stop_and_target() {
        let mut limits = lenient_limits();
        limits.max_hold_secs = 60;
        let ledger = shared_ledger(limits);
        let now = Utc::now();
        ledger
            .lock()
            .await
            .open_position(request("BTCUSDT"), now)
            .unwrap();

        // Price breaches the stop AND the hold limit is exceeded: the
        // time exit must win and be the only recorded reason.
        let monitor = PositionMonitor::new(
            ledger.clone(),
            source(&[("BTCUSDT", dec!(48000))]),
            MonitorConfig::default(),
        );
        let summary = monitor.tick(now + chrono::Duration::seconds(120)).await.unwrap();
        assert_eq!(summary.closed.len(), 1);
        assert_eq!(summary.closed[0].1, CloseReason::TimeLimit);
    }

    #[tokio::test]
    async fn test_unavailable_price_skips_symbol() {
        let ledger = shared_ledger(lenient_limits());
        let now = Utc::now();
        ledger
            .lock()
            .await
            .open_position(request("BTCUSDT"), now)
            .unwrap();

        let monitor = PositionMonitor::new(
            ledger.clone(),
            source(&[]), // no prices at all
            MonitorConfig::default(),
        );
        let summary = monitor.tick(now + chrono::Duration::seconds(10)).await.unwrap();

        assert_eq!(summary.skipped, vec!["BTCUSDT".to_string()]);
        assert!(summary.closed.is_empty());
        // Position untouched, retried next tick
        assert_eq!(ledger.lock().await.snapshot().open_positions.len(), 1);
    }

    #[tokio::test]
    async fn test_holding_position_stays_open() {
        let ledger = shared_ledger(lenient_limits());
        let now = Utc::now();
        ledger
            .lock()
            .await
            .open_position(request("BTCUSDT"), now)
            .unwrap();

        let monitor = PositionMonitor::new(
            ledger.clone(),
            source(&[("BTCUSDT", dec!(50500))]),
            MonitorConfig::default(),
        );
        let summary = monitor.tick(now + chrono::Duration::seconds(10)).await.unwrap();

        assert!(summary.closed.is_empty());
        let guard = ledger.lock().await;
        let snapshot = guard.snapshot();
        assert_eq!(snapshot.open_positions.len(), 1);
        assert_eq!(snapshot.open_positions[0].unrealized_pnl, dec!(50));
    }

    #[tokio::test]
    async fn test_global_stop_loss_triggers_emergency() {
        let mut limits = lenient_limits();
        limits.global_stop_loss_pct = dec!(0.05); // 0.05% of 100k = 50
        let ledger = shared_ledger(limits);
        let now = Utc::now();
        ledger
            .lock()
            .await
            .open_position(request("BTCUSDT"), now)
            .unwrap();

        // Stop-loss close realizes -100, past the 0.05% global limit
        let monitor = PositionMonitor::new(
            ledger.clone(),
            source(&[("BTCUSDT", dec!(49000))]),
            MonitorConfig::default(),
        );
        let summary = monitor.tick(now + chrono::Duration::seconds(10)).await.unwrap();

        assert!(summary.emergency_triggered);
        assert!(ledger.lock().await.emergency_stopped());
    }

    #[tokio::test]
    async fn test_run_loop_shutdown() {
        let ledger = shared_ledger(lenient_limits());
        let monitor = Arc::new(PositionMonitor::new(
            ledger,
            source(&[]),
            MonitorConfig {
                tick_interval_secs: 1,
                price_timeout_ms: 100,
            },
        ));

        let (tx, rx) = watch::channel(false);
        let handle = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.run(rx).await })
        };

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop must stop on shutdown")
            .unwrap();
    }
}
