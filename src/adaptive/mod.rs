//! Adaptive strategy parameter control
//!
//! Regime- and performance-driven replacement of strategy parameter
//! bundles, with an append-only audit log.

mod controller;
mod types;

pub use controller::{performance_score, AdaptiveConfig, AdaptiveController};
pub use types::{
    AdaptationReason, AdaptationRecord, AdaptationSpeed, ControllerState, StrategyParameters,
};
