//! Market regime detection module
//!
//! Classifies recent price/volume history into discrete regimes and
//! derives the feature set strategy adaptation runs on.

mod detector;
mod types;

pub use detector::{classify, RegimeConfig, RegimeDetector, RegimeThresholds, MIN_SAMPLES};
pub use types::{Candle, MarketConditions, MarketRegime};
