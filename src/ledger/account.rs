//! Account balance and daily counters

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Account state: balance, daily counters, emergency flag.
///
/// The balance is authoritative and moves only by realized P&L on close.
/// Daily counters reset lazily at the first operation after UTC midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Current balance
    pub balance: Decimal,
    /// Balance at session start, drawdown reference
    pub initial_balance: Decimal,
    /// Trades opened since the last daily boundary
    pub daily_trades: u32,
    /// Realized P&L since the last daily boundary
    pub daily_pnl: Decimal,
    /// Timestamp of the last losing close, drives the cooldown window
    pub last_loss_at: Option<DateTime<Utc>>,
    /// Global kill switch
    pub emergency_stopped: bool,
    /// UTC date the daily counters belong to
    day: NaiveDate,
}

impl Account {
    /// Create an account with the given starting balance
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            balance: initial_balance,
            initial_balance,
            daily_trades: 0,
            daily_pnl: dec!(0),
            last_loss_at: None,
            emergency_stopped: false,
            day: Utc::now().date_naive(),
        }
    }

    /// Reset daily counters if `now` crossed the UTC-midnight boundary.
    /// Returns true when a reset happened.
    pub fn roll_day(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if today != self.day {
            self.day = today;
            self.daily_trades = 0;
            self.daily_pnl = dec!(0);
            return true;
        }
        false
    }

    /// Record an opened trade against the daily counter
    pub fn record_open(&mut self, now: DateTime<Utc>) {
        self.roll_day(now);
        self.daily_trades += 1;
    }

    /// Apply a realized P&L to the balance and daily accumulator
    pub fn apply_realized(&mut self, pnl: Decimal, now: DateTime<Utc>) {
        self.roll_day(now);
        self.balance += pnl;
        self.daily_pnl += pnl;
        if pnl < dec!(0) {
            self.last_loss_at = Some(now);
        }
    }

    /// Daily loss as a positive percentage of the initial balance
    pub fn daily_loss_pct(&self) -> Decimal {
        if self.daily_pnl >= dec!(0) || self.initial_balance.is_zero() {
            return dec!(0);
        }
        -self.daily_pnl / self.initial_balance * dec!(100)
    }

    /// Drawdown from the initial balance as a positive percentage
    pub fn drawdown_pct(&self) -> Decimal {
        if self.initial_balance.is_zero() {
            return dec!(0);
        }
        let dd = (self.initial_balance - self.balance) / self.initial_balance * dec!(100);
        dd.max(dec!(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_account() {
        let account = Account::new(dec!(10000));
        assert_eq!(account.balance, dec!(10000));
        assert_eq!(account.daily_trades, 0);
        assert_eq!(account.daily_pnl, dec!(0));
        assert!(!account.emergency_stopped);
    }

    #[test]
    fn test_apply_realized_profit() {
        let mut account = Account::new(dec!(10000));
        account.apply_realized(dec!(150), Utc::now());
        assert_eq!(account.balance, dec!(10150));
        assert_eq!(account.daily_pnl, dec!(150));
        assert!(account.last_loss_at.is_none());
    }

    #[test]
    fn test_apply_realized_loss_sets_cooldown_anchor() {
        let mut account = Account::new(dec!(10000));
        let now = Utc::now();
        account.apply_realized(dec!(-200), now);
        assert_eq!(account.balance, dec!(9800));
        assert_eq!(account.last_loss_at, Some(now));
    }

    #[test]
    fn test_daily_loss_pct() {
        let mut account = Account::new(dec!(10000));
        account.apply_realized(dec!(-300), Utc::now());
        assert_eq!(account.daily_loss_pct(), dec!(3));
    }

    #[test]
    fn test_daily_loss_pct_zero_when_profitable() {
        let mut account = Account::new(dec!(10000));
        account.apply_realized(dec!(300), Utc::now());
        assert_eq!(account.daily_loss_pct(), dec!(0));
    }

    #[test]
    fn test_drawdown_pct() {
        let mut account = Account::new(dec!(10000));
        account.apply_realized(dec!(-500), Utc::now());
        assert_eq!(account.drawdown_pct(), dec!(5));

        account.apply_realized(dec!(1000), Utc::now());
        // Above initial: drawdown clamps at zero
        assert_eq!(account.drawdown_pct(), dec!(0));
    }

    #[test]
    fn test_roll_day_resets_once() {
        let mut account = Account::new(dec!(10000));
        let now = Utc::now();
        account.record_open(now);
        account.apply_realized(dec!(-100), now);
        assert_eq!(account.daily_trades, 1);

        let tomorrow = now + Duration::days(1);
        assert!(account.roll_day(tomorrow));
        assert_eq!(account.daily_trades, 0);
        assert_eq!(account.daily_pnl, dec!(0));

        // Second roll on the same day is a no-op
        assert!(!account.roll_day(tomorrow + Duration::hours(1)));
    }

    #[test]
    fn test_counters_monotonic_within_day() {
        let mut account = Account::new(dec!(10000));
        let now = Utc::now();
        for i in 1..=5 {
            account.record_open(now + Duration::minutes(i));
            assert_eq!(account.daily_trades, i as u32);
        }
    }
}
