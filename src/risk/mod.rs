//! Risk management module
//!
//! Admission limits, validation, and derived metrics

mod limits;
mod metrics;
mod types;
mod validator;

pub use limits::{RiskLimits, EXPOSURE_HARD_CEILING_PCT};
pub use metrics::{RiskMetrics, RiskReport, DEFAULT_VOLATILITY_WINDOW};
pub use types::{RejectReason, RiskError, RiskLevel};
pub use validator::{validate, CorrelationModel, PrefixCorrelation};
