//! Position types and lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Profit when price rises
    Long,
    /// Profit when price falls
    Short,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Stop-loss price touched
    StopLoss,
    /// Take-profit price touched
    TakeProfit,
    /// Maximum hold duration exceeded
    TimeLimit,
    /// Emergency stop liquidation
    Emergency,
    /// Administrative close
    Manual,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::StopLoss => "stop_loss",
            CloseReason::TakeProfit => "take_profit",
            CloseReason::TimeLimit => "time_limit",
            CloseReason::Emergency => "emergency",
            CloseReason::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Opaque position identifier, derived from symbol and open timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(String);

impl PositionId {
    /// Derive an id from symbol and open timestamp
    pub fn derive(symbol: &str, opened_at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", symbol, opened_at.timestamp_millis()))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An open position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier
    pub id: PositionId,
    /// Traded symbol
    pub symbol: String,
    /// Trade direction
    pub direction: Direction,
    /// Entry price
    pub entry_price: Decimal,
    /// Last marked price
    pub current_price: Decimal,
    /// Position quantity (always positive)
    pub quantity: Decimal,
    /// Stop-loss price
    pub stop_loss: Decimal,
    /// Take-profit price
    pub take_profit: Decimal,
    /// Open timestamp
    pub opened_at: DateTime<Utc>,
    /// Current unrealized P&L
    pub unrealized_pnl: Decimal,
}

impl Position {
    /// Notional value at the current price
    pub fn value(&self) -> Decimal {
        self.current_price * self.quantity
    }

    /// Recompute unrealized P&L for a new mark price
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl = match self.direction {
            Direction::Long => (price - self.entry_price) * self.quantity,
            Direction::Short => (self.entry_price - price) * self.quantity,
        };
    }

    /// Realized P&L if closed at the given price
    pub fn pnl_at(&self, exit_price: Decimal) -> Decimal {
        match self.direction {
            Direction::Long => (exit_price - self.entry_price) * self.quantity,
            Direction::Short => (self.entry_price - exit_price) * self.quantity,
        }
    }

    /// Whether the stop-loss is touched at the given price
    pub fn stop_hit(&self, price: Decimal) -> bool {
        match self.direction {
            Direction::Long => price <= self.stop_loss,
            Direction::Short => price >= self.stop_loss,
        }
    }

    /// Whether the take-profit is touched at the given price
    pub fn target_hit(&self, price: Decimal) -> bool {
        match self.direction {
            Direction::Long => price >= self.take_profit,
            Direction::Short => price <= self.take_profit,
        }
    }

    /// Hold duration as of `now`
    pub fn held_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.opened_at
    }
}

/// A request to open a position, prior to validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRequest {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl OpenRequest {
    /// Notional value at entry
    pub fn value(&self) -> Decimal {
        self.entry_price * self.quantity
    }

    /// Check the creation-time level ordering: quantity positive, and for
    /// Long `stop < entry < target` (inverse for Short).
    pub fn levels_valid(&self) -> bool {
        if self.quantity <= dec!(0) || self.entry_price <= dec!(0) {
            return false;
        }
        match self.direction {
            Direction::Long => {
                self.stop_loss < self.entry_price && self.entry_price < self.take_profit
            }
            Direction::Short => {
                self.take_profit < self.entry_price && self.entry_price < self.stop_loss
            }
        }
    }
}

/// A closed position, immutable history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    /// The position as it was at close
    pub position: Position,
    /// Exit price
    pub exit_price: Decimal,
    /// Exit timestamp
    pub closed_at: DateTime<Utc>,
    /// Realized P&L
    pub realized_pnl: Decimal,
    /// Close reason
    pub reason: CloseReason,
}

impl ClosedPosition {
    /// Realized return normalized by entry notional
    pub fn return_pct(&self) -> Decimal {
        let notional = self.position.entry_price * self.position.quantity;
        if notional.is_zero() {
            return dec!(0);
        }
        self.realized_pnl / notional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_position() -> Position {
        let opened_at = Utc::now();
        Position {
            id: PositionId::derive("BTCUSDT", opened_at),
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Long,
            entry_price: dec!(50000),
            current_price: dec!(50000),
            quantity: dec!(0.1),
            stop_loss: dec!(49000),
            take_profit: dec!(52000),
            opened_at,
            unrealized_pnl: dec!(0),
        }
    }

    #[test]
    fn test_id_derivation_stable() {
        let ts = Utc::now();
        let a = PositionId::derive("BTCUSDT", ts);
        let b = PositionId::derive("BTCUSDT", ts);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("BTCUSDT-"));
    }

    #[test]
    fn test_mark_long() {
        let mut pos = long_position();
        pos.mark(dec!(51000));
        assert_eq!(pos.current_price, dec!(51000));
        assert_eq!(pos.unrealized_pnl, dec!(100)); // (51000 - 50000) * 0.1
    }

    #[test]
    fn test_mark_short() {
        let mut pos = long_position();
        pos.direction = Direction::Short;
        pos.mark(dec!(49000));
        assert_eq!(pos.unrealized_pnl, dec!(100)); // (50000 - 49000) * 0.1
    }

    #[test]
    fn test_pnl_at_exit() {
        let pos = long_position();
        assert_eq!(pos.pnl_at(dec!(49000)), dec!(-100));
        assert_eq!(pos.pnl_at(dec!(52000)), dec!(200));
    }

    #[test]
    fn test_stop_and_target_long() {
        let pos = long_position();
        assert!(pos.stop_hit(dec!(49000)));
        assert!(pos.stop_hit(dec!(48500)));
        assert!(!pos.stop_hit(dec!(49500)));
        assert!(pos.target_hit(dec!(52000)));
        assert!(!pos.target_hit(dec!(51999)));
    }

    #[test]
    fn test_stop_and_target_short() {
        let mut pos = long_position();
        pos.direction = Direction::Short;
        pos.stop_loss = dec!(51000);
        pos.take_profit = dec!(48000);
        assert!(pos.stop_hit(dec!(51000)));
        assert!(!pos.stop_hit(dec!(50500)));
        assert!(pos.target_hit(dec!(48000)));
        assert!(!pos.target_hit(dec!(48001)));
    }

    #[test]
    fn test_levels_valid_long() {
        let req = OpenRequest {
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Long,
            entry_price: dec!(50000),
            quantity: dec!(0.1),
            stop_loss: dec!(49000),
            take_profit: dec!(52000),
        };
        assert!(req.levels_valid());
    }

    #[test]
    fn test_levels_invalid_long_stop_above_entry() {
        let req = OpenRequest {
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Long,
            entry_price: dec!(50000),
            quantity: dec!(0.1),
            stop_loss: dec!(50500),
            take_profit: dec!(52000),
        };
        assert!(!req.levels_valid());
    }

    #[test]
    fn test_levels_valid_short() {
        let req = OpenRequest {
            symbol: "ETHUSDT".to_string(),
            direction: Direction::Short,
            entry_price: dec!(3000),
            quantity: dec!(1),
            stop_loss: dec!(3100),
            take_profit: dec!(2800),
        };
        assert!(req.levels_valid());
    }

    #[test]
    fn test_levels_invalid_zero_quantity() {
        let req = OpenRequest {
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Long,
            entry_price: dec!(50000),
            quantity: dec!(0),
            stop_loss: dec!(49000),
            take_profit: dec!(52000),
        };
        assert!(!req.levels_valid());
    }

    #[test]
    fn test_return_pct() {
        let pos = long_position();
        let closed = ClosedPosition {
            exit_price: dec!(52000),
            closed_at: Utc::now(),
            realized_pnl: dec!(200),
            reason: CloseReason::TakeProfit,
            position: pos,
        };
        // 200 / (50000 * 0.1) = 0.04
        assert_eq!(closed.return_pct(), dec!(0.04));
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::StopLoss.to_string(), "stop_loss");
        assert_eq!(CloseReason::TimeLimit.to_string(), "time_limit");
        assert_eq!(CloseReason::Emergency.to_string(), "emergency");
    }
}
