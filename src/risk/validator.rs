//! Admission checks for proposed positions
//!
//! Stateless check chain over a ledger snapshot. Checks run in a fixed
//! order and short-circuit on the first failure, so the returned reason
//! always names the first limit breached.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::limits::{RiskLimits, EXPOSURE_HARD_CEILING_PCT};
use super::types::RejectReason;
use crate::ledger::{LedgerSnapshot, OpenRequest, Position};

/// Pluggable correlation exposure estimate.
///
/// The shipped default is a symbol-prefix heuristic; real correlation data
/// can be supplied by implementing this trait.
pub trait CorrelationModel: Send + Sync {
    /// Notional value of existing open positions considered correlated
    /// with the proposed symbol.
    fn correlated_value(&self, symbol: &str, open: &[Position]) -> Decimal;
}

/// Symbol-prefix correlation heuristic: positions whose symbols share the
/// first three characters are treated as fully correlated.
#[derive(Debug, Clone, Default)]
pub struct PrefixCorrelation;

fn prefix(symbol: &str) -> &str {
    let end = symbol
        .char_indices()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(symbol.len());
    &symbol[..end]
}

impl CorrelationModel for PrefixCorrelation {
    fn correlated_value(&self, symbol: &str, open: &[Position]) -> Decimal {
        let p = prefix(symbol);
        open.iter()
            .filter(|pos| prefix(&pos.symbol) == p)
            .map(|pos| pos.value())
            .sum()
    }
}

/// Validate a proposed position against the configured limits.
///
/// Deterministic given its inputs; no hidden state.
pub fn validate(
    proposed: &OpenRequest,
    snapshot: &LedgerSnapshot,
    limits: &RiskLimits,
    correlation: &dyn CorrelationModel,
    now: DateTime<Utc>,
) -> Result<(), RejectReason> {
    let account = &snapshot.account;

    if account.emergency_stopped {
        return Err(RejectReason::EmergencyStopActive);
    }

    if snapshot.open_positions.len() >= limits.max_open_positions {
        return Err(RejectReason::MaxPositionsReached);
    }

    let balance = account.balance;
    if balance <= dec!(0) {
        return Err(RejectReason::PositionTooLarge(dec!(100)));
    }

    let size_pct = proposed.value() / balance * dec!(100);
    if size_pct > limits.max_position_size_pct {
        return Err(RejectReason::PositionTooLarge(size_pct));
    }

    let daily_loss = account.daily_loss_pct();
    if daily_loss >= limits.max_daily_loss_pct {
        return Err(RejectReason::DailyLossLimitReached(daily_loss));
    }

    if account.daily_trades >= limits.max_daily_trades {
        return Err(RejectReason::DailyTradeLimitReached(account.daily_trades));
    }

    // A strategy submitting a stop more than twice as wide as configured is
    // asking for more risk per unit than the account is sized for.
    let stop_distance_pct =
        (proposed.entry_price - proposed.stop_loss).abs() / proposed.entry_price * dec!(100);
    if stop_distance_pct > limits.stop_loss_pct * dec!(2) {
        return Err(RejectReason::StopTooWide(stop_distance_pct));
    }

    let exposure_after = (snapshot.exposure() + proposed.value()) / balance * dec!(100);
    if exposure_after > EXPOSURE_HARD_CEILING_PCT {
        return Err(RejectReason::ExposureCeilingReached(exposure_after));
    }

    if let Some(last_loss) = account.last_loss_at {
        if now - last_loss < limits.cooldown() {
            return Err(RejectReason::CooldownActive);
        }
    }

    let correlated = correlation.correlated_value(&proposed.symbol, &snapshot.open_positions);
    if correlated > dec!(0) {
        let correlated_pct = (correlated + proposed.value()) / balance * dec!(100);
        if correlated_pct > limits.max_correlation_exposure_pct {
            return Err(RejectReason::CorrelationTooHigh(correlated_pct));
        }
    }

    Ok(())
}
