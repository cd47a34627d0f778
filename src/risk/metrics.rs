//! Derived risk metrics
//!
//! Pure functions over a ledger snapshot and the closed-position history.
//! Metrics are recomputed on demand and never persisted as authoritative
//! state.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::limits::RiskLimits;
use super::types::RiskLevel;
use crate::ledger::{Account, ClosedPosition, LedgerSnapshot, Position};

/// Default number of closed trades in the volatility window
pub const DEFAULT_VOLATILITY_WINDOW: usize = 20;

/// Aggregate risk statistics derived from the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Drawdown from initial balance, positive percentage
    pub drawdown_pct: Decimal,
    /// Realized P&L since the daily boundary
    pub daily_pnl: Decimal,
    /// Aggregate open notional as percentage of balance
    pub exposure_pct: Decimal,
    /// Number of open positions
    pub open_positions: usize,
    /// Average open position size as percentage of balance
    pub avg_position_pct: Decimal,
    /// Stddev of recent per-trade normalized returns
    pub volatility: Decimal,
    /// Fraction of closed trades with positive P&L
    pub win_rate: Decimal,
    /// Peak-to-trough drawdown over the reconstructed balance curve
    pub max_drawdown_pct: Decimal,
    /// Weighted-score risk classification
    pub risk_level: RiskLevel,
}

impl RiskMetrics {
    /// Compute metrics from a snapshot and closed history.
    ///
    /// `volatility_window` bounds how many recent closed trades feed the
    /// return-volatility estimate.
    pub fn calculate(
        snapshot: &LedgerSnapshot,
        closed: &[ClosedPosition],
        limits: &RiskLimits,
        volatility_window: usize,
    ) -> Self {
        let account = &snapshot.account;
        let drawdown_pct = account.drawdown_pct();
        let exposure_pct = exposure_pct(snapshot);
        let open_count = snapshot.open_positions.len();
        let avg_position_pct = if open_count > 0 {
            exposure_pct / Decimal::from(open_count)
        } else {
            dec!(0)
        };
        let volatility = return_volatility(closed, volatility_window);
        let win_rate = win_rate(closed);
        let max_drawdown_pct = max_drawdown_pct(account.initial_balance, closed);

        let score = risk_score(
            drawdown_pct,
            exposure_pct,
            open_count,
            limits,
            volatility,
            win_rate,
            closed.len(),
        );

        Self {
            drawdown_pct,
            daily_pnl: account.daily_pnl,
            exposure_pct,
            open_positions: open_count,
            avg_position_pct,
            volatility,
            win_rate,
            max_drawdown_pct,
            risk_level: RiskLevel::from_score(score),
        }
    }
}

/// Full risk report for dashboards and reporting collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub account: Account,
    pub metrics: RiskMetrics,
    pub limits: RiskLimits,
    pub open_positions: Vec<Position>,
}

fn exposure_pct(snapshot: &LedgerSnapshot) -> Decimal {
    let balance = snapshot.account.balance;
    if balance <= dec!(0) {
        return dec!(0);
    }
    snapshot.exposure() / balance * dec!(100)
}

/// Stddev of normalized per-trade returns over the last `window` closes
fn return_volatility(closed: &[ClosedPosition], window: usize) -> Decimal {
    let start = closed.len().saturating_sub(window);
    let returns: Vec<f64> = closed[start..]
        .iter()
        .map(|c| c.return_pct().try_into().unwrap_or(0.0))
        .collect();
    if returns.len() < 2 {
        return dec!(0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    Decimal::try_from(variance.sqrt()).unwrap_or(dec!(0))
}

fn win_rate(closed: &[ClosedPosition]) -> Decimal {
    if closed.is_empty() {
        return dec!(0);
    }
    let wins = closed.iter().filter(|c| c.realized_pnl > dec!(0)).count();
    Decimal::from(wins) / Decimal::from(closed.len())
}

/// Peak-to-trough drawdown over the balance curve reconstructed from the
/// closed-position order, as a positive percentage of the peak.
fn max_drawdown_pct(initial_balance: Decimal, closed: &[ClosedPosition]) -> Decimal {
    let mut balance = initial_balance;
    let mut peak = initial_balance;
    let mut max_dd = dec!(0);
    for c in closed {
        balance += c.realized_pnl;
        if balance > peak {
            peak = balance;
        } else if peak > dec!(0) {
            let dd = (peak - balance) / peak * dec!(100);
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Weighted scoring per metric band
#[allow(clippy::too_many_arguments)]
fn risk_score(
    drawdown_pct: Decimal,
    exposure_pct: Decimal,
    open_count: usize,
    limits: &RiskLimits,
    volatility: Decimal,
    win_rate: Decimal,
    closed_count: usize,
) -> u32 {
    let mut score = 0;

    if drawdown_pct > dec!(2) {
        score += 2;
    } else if drawdown_pct > dec!(1) {
        score += 1;
    }

    if exposure_pct > dec!(80) {
        score += 2;
    } else if exposure_pct > dec!(50) {
        score += 1;
    }

    if open_count >= limits.max_open_positions {
        score += 1;
    }

    if volatility > dec!(0.05) {
        score += 2;
    } else if volatility > dec!(0.02) {
        score += 1;
    }

    // Win rate only means something with a few trades behind it
    if closed_count >= 5 {
        if win_rate < dec!(0.4) {
            score += 2;
        } else if win_rate < dec!(0.5) {
            score += 1;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CloseReason, Direction, PositionId};
    use chrono::Utc;

    fn closed_with_pnl(pnls: &[Decimal]) -> Vec<ClosedPosition> {
        pnls.iter()
            .enumerate()
            .map(|(i, pnl)| {
                let opened_at = Utc::now();
                let position = Position {
                    id: PositionId::derive(&format!("SYM{}", i), opened_at),
                    symbol: format!("SYM{}", i),
                    direction: Direction::Long,
                    entry_price: dec!(100),
                    current_price: dec!(100),
                    quantity: dec!(10),
                    stop_loss: dec!(98),
                    take_profit: dec!(104),
                    opened_at,
                    unrealized_pnl: dec!(0),
                };
                ClosedPosition {
                    position,
                    exit_price: dec!(100),
                    closed_at: Utc::now(),
                    realized_pnl: *pnl,
                    reason: CloseReason::Manual,
                }
            })
            .collect()
    }

    fn empty_snapshot(balance: Decimal) -> LedgerSnapshot {
        LedgerSnapshot {
            open_positions: vec![],
            account: Account::new(balance),
            closed_count: 0,
        }
    }

    #[test]
    fn test_win_rate_three_of_five() {
        let closed = closed_with_pnl(&[dec!(100), dec!(-50), dec!(80), dec!(-30), dec!(120)]);
        assert_eq!(win_rate(&closed), dec!(0.6));
    }

    #[test]
    fn test_win_rate_empty() {
        assert_eq!(win_rate(&[]), dec!(0));
    }

    #[test]
    fn test_max_drawdown_from_curve() {
        // Curve: 10000 -> 10100 -> 10050 -> 10130 -> 10100 -> 10220
        // Peak 10100, trough 10050: dd = 50/10100; later dip 10130->10100
        // is shallower.
        let closed = closed_with_pnl(&[dec!(100), dec!(-50), dec!(80), dec!(-30), dec!(120)]);
        let dd = max_drawdown_pct(dec!(10000), &closed);
        let expected = dec!(50) / dec!(10100) * dec!(100);
        assert_eq!(dd, expected);
    }

    #[test]
    fn test_max_drawdown_monotonic_gains() {
        let closed = closed_with_pnl(&[dec!(10), dec!(20), dec!(30)]);
        assert_eq!(max_drawdown_pct(dec!(10000), &closed), dec!(0));
    }

    #[test]
    fn test_volatility_needs_two_trades() {
        let closed = closed_with_pnl(&[dec!(100)]);
        assert_eq!(return_volatility(&closed, 20), dec!(0));
    }

    #[test]
    fn test_volatility_nonzero_for_mixed_returns() {
        let closed = closed_with_pnl(&[dec!(100), dec!(-50), dec!(80), dec!(-30), dec!(120)]);
        assert!(return_volatility(&closed, 20) > dec!(0));
    }

    #[test]
    fn test_volatility_windowing() {
        // Old noisy trades outside the window must not affect the estimate
        let mut pnls = vec![dec!(500), dec!(-500)];
        pnls.extend(std::iter::repeat(dec!(10)).take(20));
        let closed = closed_with_pnl(&pnls);
        let vol = return_volatility(&closed, 20);
        assert_eq!(vol, dec!(0)); // last 20 are identical returns
    }

    #[test]
    fn test_calculate_quiet_account_is_low_risk() {
        let snapshot = empty_snapshot(dec!(10000));
        let metrics = RiskMetrics::calculate(
            &snapshot,
            &[],
            &RiskLimits::default(),
            DEFAULT_VOLATILITY_WINDOW,
        );
        assert_eq!(metrics.risk_level, RiskLevel::Low);
        assert_eq!(metrics.exposure_pct, dec!(0));
        assert_eq!(metrics.open_positions, 0);
        assert_eq!(metrics.avg_position_pct, dec!(0));
    }

    #[test]
    fn test_calculate_drawn_down_account_scores_higher() {
        let mut snapshot = empty_snapshot(dec!(10000));
        snapshot.account.apply_realized(dec!(-300), Utc::now()); // 3% drawdown
        let closed = closed_with_pnl(&[dec!(-300)]);
        let metrics = RiskMetrics::calculate(
            &snapshot,
            &closed,
            &RiskLimits::default(),
            DEFAULT_VOLATILITY_WINDOW,
        );
        assert!(metrics.risk_level >= RiskLevel::Medium);
        assert_eq!(metrics.drawdown_pct, dec!(3));
    }

    #[test]
    fn test_risk_score_bands() {
        let limits = RiskLimits::default();
        // Everything calm
        assert_eq!(
            risk_score(dec!(0), dec!(0), 0, &limits, dec!(0), dec!(1), 10),
            0
        );
        // Deep drawdown + heavy exposure + at position cap
        assert_eq!(
            risk_score(dec!(3), dec!(85), 5, &limits, dec!(0), dec!(1), 10),
            5
        );
        // Low win rate over enough trades
        assert_eq!(
            risk_score(dec!(0), dec!(0), 0, &limits, dec!(0), dec!(0.3), 10),
            2
        );
        // Low win rate with too few trades is ignored
        assert_eq!(
            risk_score(dec!(0), dec!(0), 0, &limits, dec!(0), dec!(0.3), 3),
            0
        );
    }
}
