//! Engine wiring
//!
//! Owns the serialization point (the ledger mutex), routes signals,
//! candles, and administrative commands, and drives strategy adaptation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::adaptive::{
    performance_score, AdaptationRecord, AdaptiveConfig, AdaptiveController, StrategyParameters,
};
use crate::ledger::{Ledger, LedgerError, PositionId};
use crate::monitor::{MonitorConfig, PositionMonitor, PriceSource};
use crate::pipeline::{Signal, SignalPipeline};
use crate::regime::{Candle, MarketConditions, RegimeDetector};
use crate::risk::{RiskLimits, RiskMetrics, RiskReport, DEFAULT_VOLATILITY_WINDOW};
use crate::telemetry::{record_latency, set_gauge, GaugeMetric, LatencyMetric};

/// Administrative commands accepted at runtime
#[derive(Debug, Clone)]
pub enum AdminCommand {
    /// Set the kill switch and liquidate everything
    EmergencyStop(String),
    /// Clear the kill switch
    ResetEmergency,
    /// Replace the limit set wholesale
    UpdateLimits(RiskLimits),
}

/// Top-level wiring of ledger, pipeline, regime detection, and adaptation
pub struct Engine {
    ledger: Arc<Mutex<Ledger>>,
    pipeline: SignalPipeline,
    controller: AdaptiveController,
    detector: RegimeDetector,
}

impl Engine {
    /// Build an engine around a ledger
    pub fn new(
        ledger: Ledger,
        params: StrategyParameters,
        adaptive: AdaptiveConfig,
        detector: RegimeDetector,
    ) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            pipeline: SignalPipeline::new(),
            controller: AdaptiveController::new(params, adaptive),
            detector,
        }
    }

    /// Replace the pipeline (to install a custom safety gate)
    pub fn with_pipeline(mut self, pipeline: SignalPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Shared handle to the ledger serialization point
    pub fn ledger(&self) -> Arc<Mutex<Ledger>> {
        self.ledger.clone()
    }

    /// Current strategy parameters
    pub fn params(&self) -> &StrategyParameters {
        self.controller.params()
    }

    /// Adaptation history
    pub fn adaptation_log(&self) -> &[AdaptationRecord] {
        self.controller.adaptation_log()
    }

    /// Route an external signal through sizing, validation, and commit
    pub async fn submit_signal(
        &self,
        signal: &Signal,
        now: DateTime<Utc>,
    ) -> Result<PositionId, LedgerError> {
        let started = std::time::Instant::now();
        let mut ledger = self.ledger.lock().await;
        let result = self
            .pipeline
            .process(signal, &mut ledger, self.controller.params(), now);
        record_latency(LatencyMetric::SignalProcessing, started.elapsed());
        result
    }

    /// Feed a market candle into the regime detector
    pub fn observe_candle(&mut self, candle: Candle) {
        self.detector.update(candle);
    }

    /// Current regime assessment
    pub fn conditions(&self) -> MarketConditions {
        self.detector.assess()
    }

    /// Re-evaluate strategy parameters against regime and performance.
    /// Adaptations are journaled through the ledger.
    pub async fn evaluate_adaptation(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Option<AdaptationRecord>, LedgerError> {
        let conditions = self.detector.assess();
        let mut ledger = self.ledger.lock().await;
        let snapshot = ledger.snapshot();
        let metrics = RiskMetrics::calculate(
            &snapshot,
            ledger.closed(),
            ledger.limits(),
            DEFAULT_VOLATILITY_WINDOW,
        );
        let performance = performance_score(
            metrics.win_rate.try_into().unwrap_or(0.0),
            metrics.drawdown_pct.try_into().unwrap_or(0.0),
        );

        match self.controller.evaluate(&conditions, performance, now) {
            Some(record) => {
                let record = record.clone();
                ledger.record_adaptation(record.clone())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Apply an administrative command
    pub async fn handle_command(
        &self,
        command: AdminCommand,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut ledger = self.ledger.lock().await;
        match command {
            AdminCommand::EmergencyStop(reason) => {
                ledger.emergency_stop(&reason, now)?;
            }
            AdminCommand::ResetEmergency => {
                ledger.reset_emergency(now)?;
            }
            AdminCommand::UpdateLimits(limits) => {
                ledger.set_limits(limits);
            }
        }
        Ok(())
    }

    /// Build the current risk report and publish the headline gauges
    pub async fn report(&self) -> RiskReport {
        let ledger = self.ledger.lock().await;
        let snapshot = ledger.snapshot();
        let metrics = RiskMetrics::calculate(
            &snapshot,
            ledger.closed(),
            ledger.limits(),
            DEFAULT_VOLATILITY_WINDOW,
        );

        set_gauge(GaugeMetric::Equity, decimal_f64(snapshot.account.balance));
        set_gauge(GaugeMetric::DailyPnl, decimal_f64(snapshot.account.daily_pnl));
        set_gauge(GaugeMetric::DrawdownPct, decimal_f64(metrics.drawdown_pct));
        set_gauge(GaugeMetric::ExposurePct, decimal_f64(metrics.exposure_pct));
        set_gauge(GaugeMetric::OpenPositions, metrics.open_positions as f64);
        set_gauge(GaugeMetric::WinRate, decimal_f64(metrics.win_rate));

        RiskReport {
            account: snapshot.account.clone(),
            metrics,
            limits: ledger.limits().clone(),
            open_positions: snapshot.open_positions,
        }
    }

    /// Spawn the monitor loop; returns the shutdown handle and the task
    pub fn spawn_monitor(
        &self,
        source: Arc<dyn PriceSource>,
        config: MonitorConfig,
    ) -> (watch::Sender<bool>, JoinHandle<()>) {
        let monitor = PositionMonitor::new(self.ledger.clone(), source, config);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { monitor.run(rx).await });
        (tx, handle)
    }
}

fn decimal_f64(value: Decimal) -> f64 {
    value.try_into().unwrap_or(0.0)
}
