//! Regime detection over a rolling candle window
//!
//! Computes volatility, trend, volume, momentum, RSI, and
//! support/resistance features from recent OHLCV samples, then classifies
//! them through a deterministic decision tree.

use rust_decimal::Decimal;
use std::collections::VecDeque;

use super::types::{Candle, MarketConditions, MarketRegime};

/// Minimum samples before the detector produces a real classification
pub const MIN_SAMPLES: usize = 50;

/// Detector configuration
#[derive(Debug, Clone)]
pub struct RegimeConfig {
    /// Rolling window capacity in candles
    pub window: usize,
    /// Seconds covered by one candle, used to annualize volatility
    pub candle_interval_secs: u64,
    /// Fast EMA period for trend
    pub fast_ema: usize,
    /// Slow EMA period for trend
    pub slow_ema: usize,
    /// RSI period (Wilder smoothing)
    pub rsi_period: usize,
    /// EMA divergence (fraction of price) that maps to full trend strength
    pub trend_norm: f64,
    /// Lookback for support/resistance and recent volume
    pub recent_window: usize,
    /// Classification thresholds
    pub thresholds: RegimeThresholds,
}

/// Decision-tree thresholds
#[derive(Debug, Clone)]
pub struct RegimeThresholds {
    /// Annualized volatility above this is HighVolatility
    pub high_volatility: f64,
    /// Annualized volatility below this is the low band
    pub low_volatility: f64,
    /// |trend strength| above this is a directional trend
    pub strong_trend: f64,
    /// |trend strength| below this counts as no trend
    pub flat_trend: f64,
    /// RSI above this is overbought, below (100 - this) oversold
    pub rsi_overbought: f64,
    /// |momentum| above this is elevated
    pub momentum_elevated: f64,
    /// Volatility above this fraction of the high band is elevated
    pub elevated_vol_fraction: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            high_volatility: 1.5,
            low_volatility: 0.3,
            strong_trend: 0.7,
            flat_trend: 0.2,
            rsi_overbought: 70.0,
            momentum_elevated: 0.02,
            elevated_vol_fraction: 0.6,
        }
    }
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            window: 200,
            candle_interval_secs: 60,
            fast_ema: 12,
            slow_ema: 26,
            rsi_period: 14,
            trend_norm: 0.01,
            recent_window: 20,
            thresholds: RegimeThresholds::default(),
        }
    }
}

/// Classify a feature set. Deterministic; the tree order matters and the
/// first matching branch wins.
pub fn classify(
    volatility: f64,
    trend_strength: f64,
    momentum: f64,
    rsi: f64,
    t: &RegimeThresholds,
) -> MarketRegime {
    if volatility > t.high_volatility {
        return MarketRegime::HighVolatility;
    }
    if trend_strength > t.strong_trend {
        return MarketRegime::BullTrend;
    }
    if trend_strength < -t.strong_trend {
        return MarketRegime::BearTrend;
    }
    let overbought = rsi > t.rsi_overbought && momentum < 0.0;
    let oversold = rsi < 100.0 - t.rsi_overbought && momentum > 0.0;
    if overbought || oversold {
        return MarketRegime::Reversal;
    }
    if momentum.abs() > t.momentum_elevated
        && volatility > t.high_volatility * t.elevated_vol_fraction
    {
        return MarketRegime::Breakout;
    }
    if volatility < t.low_volatility {
        if trend_strength.abs() < t.flat_trend {
            return MarketRegime::Consolidation;
        }
        return MarketRegime::LowVolatility;
    }
    MarketRegime::Sideways
}

/// Rolling-window regime detector
pub struct RegimeDetector {
    config: RegimeConfig,
    candles: VecDeque<Candle>,
    correlation_breakdown: bool,
}

impl RegimeDetector {
    /// Create a detector with the given configuration
    pub fn new(config: RegimeConfig) -> Self {
        let capacity = config.window;
        Self {
            config,
            candles: VecDeque::with_capacity(capacity),
            correlation_breakdown: false,
        }
    }

    /// Create a detector with default configuration
    pub fn with_defaults() -> Self {
        Self::new(RegimeConfig::default())
    }

    /// Add a candle, evicting the oldest when the window is full
    pub fn update(&mut self, candle: Candle) {
        if self.candles.len() == self.config.window {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
    }

    /// Number of candles currently in the window
    pub fn sample_count(&self) -> usize {
        self.candles.len()
    }

    /// Externally supplied correlation-breakdown flag, carried into the
    /// next assessment
    pub fn set_correlation_breakdown(&mut self, flag: bool) {
        self.correlation_breakdown = flag;
    }

    /// Compute features and classify the current window.
    ///
    /// Returns neutral conditions (Sideways, RSI 50) with fewer than
    /// [`MIN_SAMPLES`] candles rather than failing.
    pub fn assess(&self) -> MarketConditions {
        if self.candles.len() < MIN_SAMPLES {
            let mut neutral = MarketConditions::neutral();
            neutral.correlation_breakdown = self.correlation_breakdown;
            return neutral;
        }

        let closes: Vec<f64> = self
            .candles
            .iter()
            .map(|c| decimal_to_f64(c.close))
            .collect();
        let volatility = self.annualized_volatility(&closes);
        let trend_strength = self.trend_strength(&closes);
        let momentum = momentum(&closes);
        let rsi = rsi(&closes, self.config.rsi_period);
        let volume_ratio = self.volume_ratio();
        let (support_distance, resistance_distance) = self.level_distances(&closes);

        let regime = classify(
            volatility,
            trend_strength,
            momentum,
            rsi,
            &self.config.thresholds,
        );

        MarketConditions {
            regime,
            volatility,
            trend_strength,
            volume_ratio,
            momentum,
            rsi,
            support_distance,
            resistance_distance,
            correlation_breakdown: self.correlation_breakdown,
        }
    }

    /// Stddev of log returns scaled to an annual horizon
    fn annualized_volatility(&self, closes: &[f64]) -> f64 {
        let returns: Vec<f64> = closes
            .windows(2)
            .filter(|w| w[0] > 0.0 && w[1] > 0.0)
            .map(|w| (w[1] / w[0]).ln())
            .collect();
        if returns.len() < 2 {
            return 0.0;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let samples_per_year = 31_536_000.0 / self.config.candle_interval_secs.max(1) as f64;
        variance.sqrt() * samples_per_year.sqrt()
    }

    /// Fast-minus-slow EMA divergence, normalized by price and clamped
    /// to [-1, 1]
    fn trend_strength(&self, closes: &[f64]) -> f64 {
        let fast = ema(closes, self.config.fast_ema);
        let slow = ema(closes, self.config.slow_ema);
        let last = *closes.last().unwrap_or(&0.0);
        if last <= 0.0 {
            return 0.0;
        }
        let raw = (fast - slow) / last;
        (raw / self.config.trend_norm).clamp(-1.0, 1.0)
    }

    /// Recent mean volume over the prior mean
    fn volume_ratio(&self) -> f64 {
        let volumes: Vec<f64> = self
            .candles
            .iter()
            .map(|c| decimal_to_f64(c.volume))
            .collect();
        let recent = self.config.recent_window.min(volumes.len() / 2);
        if recent == 0 {
            return 1.0;
        }
        let split = volumes.len() - recent;
        let prior_mean = volumes[..split].iter().sum::<f64>() / split as f64;
        let recent_mean = volumes[split..].iter().sum::<f64>() / recent as f64;
        if prior_mean <= 0.0 {
            return 1.0;
        }
        recent_mean / prior_mean
    }

    /// Distance to the lowest low and highest high over the recent window,
    /// as fractions of the last close
    fn level_distances(&self, closes: &[f64]) -> (f64, f64) {
        let last = *closes.last().unwrap_or(&0.0);
        if last <= 0.0 {
            return (0.0, 0.0);
        }
        let start = self.candles.len().saturating_sub(self.config.recent_window);
        let mut support = f64::MAX;
        let mut resistance = f64::MIN;
        for candle in self.candles.iter().skip(start) {
            support = support.min(decimal_to_f64(candle.low));
            resistance = resistance.max(decimal_to_f64(candle.high));
        }
        ((last - support) / last, (resistance - last) / last)
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.try_into().unwrap_or(0.0)
}

/// Exponential moving average over the full slice
fn ema(values: &[f64], period: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut ema = values[0];
    for v in &values[1..] {
        ema = alpha * v + (1.0 - alpha) * ema;
    }
    ema
}

/// Blend of 5- and 20-period simple returns
fn momentum(closes: &[f64]) -> f64 {
    let r5 = period_return(closes, 5);
    let r20 = period_return(closes, 20);
    0.6 * r5 + 0.4 * r20
}

fn period_return(closes: &[f64], period: usize) -> f64 {
    if closes.len() <= period {
        return 0.0;
    }
    let prev = closes[closes.len() - 1 - period];
    let last = closes[closes.len() - 1];
    if prev <= 0.0 {
        return 0.0;
    }
    (last - prev) / prev
}

/// 14-period Wilder RSI; neutral 50 when there is not enough data
fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() <= period {
        return 50.0;
    }
    let mut gains = 0.0;
    let mut losses = 0.0;
    for w in closes[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    for w in closes[period..].windows(2) {
        let change = w[1] - w[0];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        // No losses at all; flat series stays neutral
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
