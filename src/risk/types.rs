//! Risk management types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reason a proposed position was rejected.
///
/// Closed set: callers (strategies, dashboards) branch on these, so every
/// variant carries a stable machine-readable name via `Display`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Emergency stop flag is set
    EmergencyStopActive,
    /// Maximum concurrent open positions reached
    MaxPositionsReached,
    /// Position value exceeds max size percentage of balance
    PositionTooLarge(Decimal),
    /// Daily loss limit already reached
    DailyLossLimitReached(Decimal),
    /// Daily trade count limit reached
    DailyTradeLimitReached(u32),
    /// Stop-loss distance wider than twice the configured percentage
    StopTooWide(Decimal),
    /// Post-addition aggregate exposure above the hard ceiling
    ExposureCeilingReached(Decimal),
    /// Post-loss cooldown window still active
    CooldownActive,
    /// Correlation exposure with existing positions too high
    CorrelationTooHigh(Decimal),
    /// Signal confidence below the strategy's minimum gate
    ConfidenceTooLow(Decimal),
    /// Stop/target ordering invalid for the direction, or quantity not positive
    InvalidLevels,
    /// Safety gate declined the position
    SafetyGateDeclined,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::EmergencyStopActive => "emergency_stop_active",
            RejectReason::MaxPositionsReached => "max_positions_reached",
            RejectReason::PositionTooLarge(_) => "position_too_large",
            RejectReason::DailyLossLimitReached(_) => "daily_loss_limit_reached",
            RejectReason::DailyTradeLimitReached(_) => "daily_trade_limit_reached",
            RejectReason::StopTooWide(_) => "stop_too_wide",
            RejectReason::ExposureCeilingReached(_) => "exposure_ceiling_reached",
            RejectReason::CooldownActive => "cooldown_active",
            RejectReason::CorrelationTooHigh(_) => "correlation_too_high",
            RejectReason::ConfidenceTooLow(_) => "confidence_too_low",
            RejectReason::InvalidLevels => "invalid_levels",
            RejectReason::SafetyGateDeclined => "safety_gate_declined",
        };
        f.write_str(s)
    }
}

/// Discrete risk level derived from the weighted metric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a weighted score to a level: thresholds at 2, 4, 6
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=1 => RiskLevel::Low,
            2..=3 => RiskLevel::Medium,
            4..=5 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// Risk subsystem errors
#[derive(Debug, Error)]
pub enum RiskError {
    /// Proposed position failed validation
    #[error("rejected: {0}")]
    Rejected(RejectReason),
}
