//! Position ledger module
//!
//! Positions, account balance, lifecycle events, and the emergency stop
//! gate. The `Ledger` is the single serialization point for all state
//! mutation.

mod account;
mod book;
mod events;
mod position;

pub use account::Account;
pub use book::{Ledger, LedgerError, LedgerSnapshot};
pub use events::PositionEvent;
pub use position::{CloseReason, ClosedPosition, Direction, OpenRequest, Position, PositionId};
