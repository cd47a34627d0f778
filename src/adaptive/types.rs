//! Adaptive controller types

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::regime::MarketRegime;

/// Tunable strategy knobs.
///
/// Replaced wholesale on adaptation; never mutated field by field outside
/// the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    /// Strategy the bundle belongs to
    pub strategy: String,
    /// Fast moving-average period
    pub fast_ma_period: u32,
    /// Slow moving-average period
    pub slow_ma_period: u32,
    /// Oscillator overbought threshold
    pub rsi_overbought: f64,
    /// Oscillator oversold threshold
    pub rsi_oversold: f64,
    /// Stop-loss distance as percentage of entry
    pub stop_loss_pct: Decimal,
    /// Take-profit distance as percentage of entry
    pub take_profit_pct: Decimal,
    /// Minimum signal confidence admitted by the pipeline
    pub min_confidence: Decimal,
    /// Maximum position value as percentage of balance
    pub max_position_size_pct: Decimal,
    /// Fraction of balance risked per trade
    pub risk_per_trade_pct: Decimal,
}

impl StrategyParameters {
    /// Sensible defaults for a new strategy
    pub fn defaults_for(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            fast_ma_period: 12,
            slow_ma_period: 26,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            stop_loss_pct: dec!(2),
            take_profit_pct: dec!(4),
            min_confidence: dec!(0.6),
            max_position_size_pct: dec!(10),
            risk_per_trade_pct: dec!(1),
        }
    }

    /// Builder: override the confidence gate
    pub fn with_min_confidence(mut self, min_confidence: Decimal) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Builder: override stop and target percentages
    pub fn with_protective_levels(mut self, stop_pct: Decimal, target_pct: Decimal) -> Self {
        self.stop_loss_pct = stop_pct;
        self.take_profit_pct = target_pct;
        self
    }

    /// Builder: override the per-trade risk fraction
    pub fn with_risk_per_trade(mut self, risk_pct: Decimal) -> Self {
        self.risk_per_trade_pct = risk_pct;
        self
    }
}

/// How aggressively the controller re-tunes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptationSpeed {
    Slow,
    Medium,
    Fast,
    Reactive,
}

impl AdaptationSpeed {
    /// Minimum time between adaptations
    pub fn min_interval(&self) -> Duration {
        match self {
            AdaptationSpeed::Slow => Duration::seconds(3600),
            AdaptationSpeed::Medium => Duration::seconds(1800),
            AdaptationSpeed::Fast => Duration::seconds(600),
            AdaptationSpeed::Reactive => Duration::seconds(120),
        }
    }

    /// Performance score below which the tier adapts
    pub fn performance_threshold(&self) -> f64 {
        match self {
            AdaptationSpeed::Slow => 0.3,
            AdaptationSpeed::Medium => 0.4,
            AdaptationSpeed::Fast => 0.5,
            AdaptationSpeed::Reactive => 0.6,
        }
    }
}

/// What triggered an adaptation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationReason {
    /// Recent performance score below the tier threshold
    PoorPerformance,
    /// Regime classified as high volatility
    HighVolatility,
    /// Regime classified as breakout
    Breakout,
    /// Correlation structure flagged as broken
    CorrelationBreakdown,
    /// RSI at an extreme
    RsiExtreme,
    /// Volatility at an extreme outside the regime bands
    VolatilityExtreme,
}

/// Append-only audit entry for one parameter replacement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub strategy: String,
    pub old_params: StrategyParameters,
    pub new_params: StrategyParameters,
    pub regime: MarketRegime,
    pub reason: AdaptationReason,
}

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// Parameters considered adequate for current conditions
    Stable,
    /// A replacement is being computed
    Adapting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_tiers_ordered() {
        assert!(AdaptationSpeed::Slow.min_interval() > AdaptationSpeed::Medium.min_interval());
        assert!(AdaptationSpeed::Fast.min_interval() > AdaptationSpeed::Reactive.min_interval());
        assert!(
            AdaptationSpeed::Reactive.performance_threshold()
                > AdaptationSpeed::Slow.performance_threshold()
        );
    }

    #[test]
    fn test_builder_replaces_fields() {
        let params = StrategyParameters::defaults_for("momentum")
            .with_min_confidence(dec!(0.8))
            .with_protective_levels(dec!(1.5), dec!(3))
            .with_risk_per_trade(dec!(0.5));
        assert_eq!(params.min_confidence, dec!(0.8));
        assert_eq!(params.stop_loss_pct, dec!(1.5));
        assert_eq!(params.take_profit_pct, dec!(3));
        assert_eq!(params.risk_per_trade_pct, dec!(0.5));
        assert_eq!(params.strategy, "momentum");
    }
}
