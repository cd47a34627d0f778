//! Risk limit configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Hard ceiling on post-addition aggregate exposure, percent of balance.
/// Applied after the configurable per-position checks.
pub const EXPOSURE_HARD_CEILING_PCT: Decimal = dec!(90);

/// Configured risk limits.
///
/// Immutable per session; reconfiguration replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum daily loss as percentage of initial balance
    pub max_daily_loss_pct: Decimal,
    /// Maximum trades per day
    pub max_daily_trades: u32,
    /// Maximum single position value as percentage of balance
    pub max_position_size_pct: Decimal,
    /// Maximum concurrent open positions
    pub max_open_positions: usize,
    /// Maximum aggregate correlation exposure as percentage of balance
    pub max_correlation_exposure_pct: Decimal,
    /// Per-position stop-loss distance as percentage of entry
    pub stop_loss_pct: Decimal,
    /// Global stop-loss: drawdown percentage that triggers emergency stop
    pub global_stop_loss_pct: Decimal,
    /// Maximum portfolio volatility the account tolerates
    pub max_volatility_exposure: Decimal,
    /// Maximum hold duration in seconds
    pub max_hold_secs: u64,
    /// Cooldown after a losing close, in seconds
    pub cooldown_after_loss_secs: u64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_daily_loss_pct: dec!(5),
            max_daily_trades: 20,
            max_position_size_pct: dec!(10),
            max_open_positions: 5,
            max_correlation_exposure_pct: dec!(30),
            stop_loss_pct: dec!(2),
            global_stop_loss_pct: dec!(10),
            max_volatility_exposure: dec!(0.8),
            max_hold_secs: 86_400,
            cooldown_after_loss_secs: 300,
        }
    }
}

impl RiskLimits {
    /// Maximum hold duration as a chrono duration
    pub fn max_hold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_hold_secs as i64)
    }

    /// Cooldown window as a chrono duration
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_after_loss_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = RiskLimits::default();
        assert_eq!(limits.max_daily_loss_pct, dec!(5));
        assert_eq!(limits.max_open_positions, 5);
        assert_eq!(limits.max_position_size_pct, dec!(10));
    }

    #[test]
    fn test_durations() {
        let limits = RiskLimits::default();
        assert_eq!(limits.max_hold(), chrono::Duration::days(1));
        assert_eq!(limits.cooldown(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            max_daily_loss_pct = 3.0
            max_daily_trades = 10
            max_position_size_pct = 5.0
            max_open_positions = 3
            max_correlation_exposure_pct = 20.0
            stop_loss_pct = 1.5
            global_stop_loss_pct = 8.0
            max_volatility_exposure = 0.6
            max_hold_secs = 3600
            cooldown_after_loss_secs = 600
        "#;
        let limits: RiskLimits = toml::from_str(toml).unwrap();
        assert_eq!(limits.max_daily_trades, 10);
        assert_eq!(limits.stop_loss_pct, dec!(1.5));
    }
}
