//! Adaptive parameter controller
//!
//! Watches regime and recent performance and replaces a strategy's
//! parameter bundle when conditions call for it. Every replacement is
//! appended to the adaptation log; the log is never rewritten.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::types::{
    AdaptationReason, AdaptationRecord, AdaptationSpeed, ControllerState, StrategyParameters,
};
use crate::regime::{MarketConditions, MarketRegime};

/// RSI levels considered extreme enough to force a re-tune
const RSI_EXTREME_HIGH: f64 = 80.0;
const RSI_EXTREME_LOW: f64 = 20.0;
/// Annualized volatility considered extreme regardless of regime
const VOLATILITY_EXTREME: f64 = 2.5;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct AdaptiveConfig {
    /// Adaptation tier: interval and performance threshold
    pub speed: AdaptationSpeed,
    /// Scaling strength in (0, 1]; how far each adaptation moves the knobs
    pub strength: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            speed: AdaptationSpeed::Medium,
            strength: 0.5,
        }
    }
}

/// Blend recent win rate and drawdown into a [0, 1] performance score
pub fn performance_score(win_rate: f64, drawdown_pct: f64) -> f64 {
    let dd_penalty = (drawdown_pct / 10.0).clamp(0.0, 1.0);
    (0.6 * win_rate + 0.4 * (1.0 - dd_penalty)).clamp(0.0, 1.0)
}

/// Per-strategy adaptation state machine: Stable -> Adapting -> Stable
pub struct AdaptiveController {
    config: AdaptiveConfig,
    params: StrategyParameters,
    state: ControllerState,
    last_adaptation: Option<DateTime<Utc>>,
    log: Vec<AdaptationRecord>,
}

impl AdaptiveController {
    /// Create a controller owning the given parameter bundle
    pub fn new(params: StrategyParameters, config: AdaptiveConfig) -> Self {
        Self {
            config,
            params,
            state: ControllerState::Stable,
            last_adaptation: None,
            log: Vec::new(),
        }
    }

    /// Current parameter bundle
    pub fn params(&self) -> &StrategyParameters {
        &self.params
    }

    /// Current state
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Append-only adaptation history, oldest first
    pub fn adaptation_log(&self) -> &[AdaptationRecord] {
        &self.log
    }

    /// Decide whether to adapt, and if so replace the parameters.
    ///
    /// Returns the record of the replacement when one happened. The
    /// minimum inter-adaptation interval always applies; within it the
    /// controller stays stable no matter what conditions look like.
    pub fn evaluate(
        &mut self,
        conditions: &MarketConditions,
        performance: f64,
        now: DateTime<Utc>,
    ) -> Option<&AdaptationRecord> {
        if let Some(last) = self.last_adaptation {
            if now - last < self.config.speed.min_interval() {
                return None;
            }
        }

        let reason = self.trigger_reason(conditions, performance)?;

        self.state = ControllerState::Adapting;
        let old_params = self.params.clone();
        let new_params = self.scaled_params(conditions.regime);

        tracing::info!(
            strategy = %old_params.strategy,
            ?reason,
            regime = ?conditions.regime,
            "strategy parameters adapted"
        );

        let record = AdaptationRecord {
            id: Uuid::new_v4(),
            timestamp: now,
            strategy: old_params.strategy.clone(),
            old_params,
            new_params: new_params.clone(),
            regime: conditions.regime,
            reason,
        };

        self.params = new_params;
        self.last_adaptation = Some(now);
        self.log.push(record);
        self.state = ControllerState::Stable;
        self.log.last()
    }

    fn trigger_reason(
        &self,
        conditions: &MarketConditions,
        performance: f64,
    ) -> Option<AdaptationReason> {
        if performance < self.config.speed.performance_threshold() {
            return Some(AdaptationReason::PoorPerformance);
        }
        match conditions.regime {
            MarketRegime::HighVolatility => return Some(AdaptationReason::HighVolatility),
            MarketRegime::Breakout => return Some(AdaptationReason::Breakout),
            _ => {}
        }
        if conditions.correlation_breakdown {
            return Some(AdaptationReason::CorrelationBreakdown);
        }
        if conditions.rsi >= RSI_EXTREME_HIGH || conditions.rsi <= RSI_EXTREME_LOW {
            return Some(AdaptationReason::RsiExtreme);
        }
        if conditions.volatility >= VOLATILITY_EXTREME {
            return Some(AdaptationReason::VolatilityExtreme);
        }
        None
    }

    /// Build the replacement bundle, scaled by strength and regime
    fn scaled_params(&self, regime: MarketRegime) -> StrategyParameters {
        let s = Decimal::try_from(self.config.strength).unwrap_or(dec!(0.5));
        let mut p = self.params.clone();

        match regime {
            MarketRegime::HighVolatility | MarketRegime::Breakout => {
                // Wider stops, smaller size, stricter confidence gate
                p.stop_loss_pct *= dec!(1) + dec!(0.5) * s;
                p.take_profit_pct *= dec!(1) + dec!(0.3) * s;
                p.max_position_size_pct *= dec!(1) - dec!(0.4) * s;
                p.risk_per_trade_pct *= dec!(1) - dec!(0.3) * s;
                p.min_confidence *= dec!(1) + dec!(0.2) * s;
                p.fast_ma_period = shrink_period(p.fast_ma_period, self.config.strength);
                p.slow_ma_period = shrink_period(p.slow_ma_period, self.config.strength);
            }
            MarketRegime::LowVolatility | MarketRegime::Consolidation => {
                // Tighter stops, relaxed confidence gate
                p.stop_loss_pct *= dec!(1) - dec!(0.3) * s;
                p.take_profit_pct *= dec!(1) - dec!(0.2) * s;
                p.min_confidence *= dec!(1) - dec!(0.2) * s;
                p.max_position_size_pct *= dec!(1) + dec!(0.2) * s;
            }
            MarketRegime::BullTrend | MarketRegime::BearTrend => {
                // Ride the trend: further targets, longer slow leg
                p.take_profit_pct *= dec!(1) + dec!(0.4) * s;
                p.slow_ma_period = grow_period(p.slow_ma_period, self.config.strength);
            }
            MarketRegime::Reversal => {
                // Distrust entries until the turn resolves
                p.min_confidence *= dec!(1) + dec!(0.3) * s;
                p.risk_per_trade_pct *= dec!(1) - dec!(0.2) * s;
            }
            MarketRegime::Sideways => {
                p.take_profit_pct *= dec!(1) - dec!(0.1) * s;
            }
        }

        clamp_params(&mut p);
        p
    }
}

fn shrink_period(period: u32, strength: f64) -> u32 {
    let scaled = (period as f64 * (1.0 - 0.2 * strength)).round() as u32;
    scaled.max(2)
}

fn grow_period(period: u32, strength: f64) -> u32 {
    let scaled = (period as f64 * (1.0 + 0.2 * strength)).round() as u32;
    scaled.min(200)
}

/// Keep every knob inside its sane range after scaling
fn clamp_params(p: &mut StrategyParameters) {
    p.stop_loss_pct = p.stop_loss_pct.clamp(dec!(0.2), dec!(10));
    p.take_profit_pct = p.take_profit_pct.clamp(dec!(0.4), dec!(25));
    if p.take_profit_pct < p.stop_loss_pct {
        p.take_profit_pct = p.stop_loss_pct * dec!(1.5);
    }
    p.min_confidence = p.min_confidence.clamp(dec!(0.1), dec!(0.95));
    p.max_position_size_pct = p.max_position_size_pct.clamp(dec!(0.5), dec!(50));
    p.risk_per_trade_pct = p.risk_per_trade_pct.clamp(dec!(0.1), dec!(5));
    if p.fast_ma_period >= p.slow_ma_period {
        p.slow_ma_period = p.fast_ma_period + 1;
    }
}
