//! Market regime types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Flat candle helper: open/high/low/close all equal
    pub fn flat(timestamp: DateTime<Utc>, price: Decimal, volume: Decimal) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }
}

/// Discrete market regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketRegime {
    BullTrend,
    BearTrend,
    Sideways,
    HighVolatility,
    LowVolatility,
    Breakout,
    Reversal,
    Consolidation,
}

/// Regime snapshot with the features that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConditions {
    /// Classified regime
    pub regime: MarketRegime,
    /// Annualized volatility from log returns
    pub volatility: f64,
    /// Signed trend strength in [-1, 1]
    pub trend_strength: f64,
    /// Recent mean volume over prior mean volume
    pub volume_ratio: f64,
    /// Blend of 5- and 20-period returns
    pub momentum: f64,
    /// 14-period Wilder RSI, 50 when data is short
    pub rsi: f64,
    /// Distance to the recent low, fraction of price
    pub support_distance: f64,
    /// Distance to the recent high, fraction of price
    pub resistance_distance: f64,
    /// Cross-asset correlation structure breaking down (supplied externally)
    pub correlation_breakdown: bool,
}

impl MarketConditions {
    /// Neutral default used when the window has too few samples
    pub fn neutral() -> Self {
        Self {
            regime: MarketRegime::Sideways,
            volatility: 0.0,
            trend_strength: 0.0,
            volume_ratio: 1.0,
            momentum: 0.0,
            rsi: 50.0,
            support_distance: 0.0,
            resistance_distance: 0.0,
            correlation_breakdown: false,
        }
    }
}
