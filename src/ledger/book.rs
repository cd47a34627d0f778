//! The position ledger
//!
//! Single source of truth for positions and the account balance. All
//! mutations go through this type; callers serialize access (the engine
//! holds it behind a mutex).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use super::account::Account;
use super::events::PositionEvent;
use super::position::{CloseReason, ClosedPosition, OpenRequest, Position, PositionId};
use crate::journal::{Journal, JournalError, JournalRecord};
use crate::risk::{validate, CorrelationModel, PrefixCorrelation, RejectReason, RiskLimits};

/// Ledger operation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Proposed position failed admission checks; expected and non-fatal
    #[error("rejected: {0}")]
    Rejected(RejectReason),
    /// Unknown or already-closed position id
    #[error("position not found: {0}")]
    PositionNotFound(PositionId),
    /// Journal write failed; the in-memory mutation stands and the caller
    /// must retry or abort loudly
    #[error("persistence failure: {0}")]
    Persistence(#[from] JournalError),
    /// Correctness contract broken; always fatal
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Read-only copy of ledger state for metrics/monitor/validator consumption
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    /// Open positions in insertion order
    pub open_positions: Vec<Position>,
    /// Account copy
    pub account: Account,
    /// Number of closed positions in history
    pub closed_count: usize,
}

impl LedgerSnapshot {
    /// Aggregate notional value of open positions at current prices
    pub fn exposure(&self) -> Decimal {
        self.open_positions.iter().map(|p| p.value()).sum()
    }
}

/// Owns the open set, closed history, and account
pub struct Ledger {
    account: Account,
    open: HashMap<PositionId, Position>,
    /// Insertion order of open positions, for deterministic tick evaluation
    order: Vec<PositionId>,
    closed: Vec<ClosedPosition>,
    limits: RiskLimits,
    correlation: Box<dyn CorrelationModel>,
    journal: Option<Journal>,
    event_tx: Option<UnboundedSender<PositionEvent>>,
}

impl Ledger {
    /// Create a ledger with the given starting balance and limits
    pub fn new(initial_balance: Decimal, limits: RiskLimits) -> Self {
        Self {
            account: Account::new(initial_balance),
            open: HashMap::new(),
            order: Vec::new(),
            closed: Vec::new(),
            limits,
            correlation: Box::new(PrefixCorrelation),
            journal: None,
            event_tx: None,
        }
    }

    /// Attach a journal for persistence
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Attach an event channel for audit collaborators
    pub fn with_events(mut self, tx: UnboundedSender<PositionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Replace the correlation model
    pub fn with_correlation(mut self, model: Box<dyn CorrelationModel>) -> Self {
        self.correlation = model;
        self
    }

    /// Current limits
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Replace the limit set wholesale
    pub fn set_limits(&mut self, limits: RiskLimits) {
        tracing::info!(?limits, "risk limits replaced");
        self.limits = limits;
    }

    /// Closed-position history, oldest first
    pub fn closed(&self) -> &[ClosedPosition] {
        &self.closed
    }

    /// Whether the emergency stop flag is set
    pub fn emergency_stopped(&self) -> bool {
        self.account.emergency_stopped
    }

    /// Read-only snapshot of current state
    pub fn snapshot(&self) -> LedgerSnapshot {
        let open_positions = self
            .order
            .iter()
            .filter_map(|id| self.open.get(id).cloned())
            .collect();
        LedgerSnapshot {
            open_positions,
            account: self.account.clone(),
            closed_count: self.closed.len(),
        }
    }

    /// Validate and open a position.
    ///
    /// Runs the admission checks first; on approval inserts the position,
    /// bumps the daily trade counter, journals, and emits an audit event.
    pub fn open_position(
        &mut self,
        req: OpenRequest,
        now: DateTime<Utc>,
    ) -> Result<PositionId, LedgerError> {
        self.account.roll_day(now);

        if !req.levels_valid() {
            return Err(LedgerError::Rejected(RejectReason::InvalidLevels));
        }

        let snapshot = self.snapshot();
        validate(&req, &snapshot, &self.limits, self.correlation.as_ref(), now)
            .map_err(LedgerError::Rejected)?;

        let id = PositionId::derive(&req.symbol, now);
        if self.open.contains_key(&id) {
            return Err(LedgerError::InvariantViolation(format!(
                "duplicate position id {}",
                id
            )));
        }

        let position = Position {
            id: id.clone(),
            symbol: req.symbol,
            direction: req.direction,
            entry_price: req.entry_price,
            current_price: req.entry_price,
            quantity: req.quantity,
            stop_loss: req.stop_loss,
            take_profit: req.take_profit,
            opened_at: now,
            unrealized_pnl: dec!(0),
        };

        self.account.record_open(now);
        self.open.insert(id.clone(), position.clone());
        self.order.push(id.clone());

        tracing::info!(
            id = %id,
            symbol = %position.symbol,
            direction = ?position.direction,
            entry = %position.entry_price,
            quantity = %position.quantity,
            "position opened"
        );
        self.emit(PositionEvent::opened(position.clone(), now));
        self.append(JournalRecord::Opened { position })?;

        Ok(id)
    }

    /// Close an open position at the given exit price.
    ///
    /// Returns the realized P&L. Closing an unknown or already-closed id
    /// is an error, never a no-op.
    pub fn close_position(
        &mut self,
        id: &PositionId,
        exit_price: Decimal,
        reason: CloseReason,
        now: DateTime<Utc>,
    ) -> Result<Decimal, LedgerError> {
        let mut position = self
            .open
            .remove(id)
            .ok_or_else(|| LedgerError::PositionNotFound(id.clone()))?;
        self.order.retain(|pid| pid != id);

        position.mark(exit_price);
        let pnl = position.pnl_at(exit_price);
        self.account.apply_realized(pnl, now);

        let closed = ClosedPosition {
            position,
            exit_price,
            closed_at: now,
            realized_pnl: pnl,
            reason,
        };

        tracing::info!(
            id = %id,
            reason = %reason,
            pnl = %pnl,
            balance = %self.account.balance,
            "position closed"
        );
        self.closed.push(closed.clone());
        self.emit(PositionEvent::closed(closed.clone(), now));
        self.append(JournalRecord::Closed { position: closed })?;

        self.verify_conservation()?;
        Ok(pnl)
    }

    /// Update current price and unrealized P&L for open positions whose
    /// symbol appears in the map. No other side effects.
    pub fn mark_to_market(&mut self, prices: &HashMap<String, Decimal>) {
        for position in self.open.values_mut() {
            if let Some(price) = prices.get(&position.symbol) {
                position.mark(*price);
            }
        }
    }

    /// Set the emergency flag and liquidate every open position at its
    /// last known price. Idempotent; returns the number of closes.
    pub fn emergency_stop(
        &mut self,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, LedgerError> {
        if !self.account.emergency_stopped {
            tracing::warn!(reason, "emergency stop triggered");
            self.account.emergency_stopped = true;
            self.append(JournalRecord::RiskEvent {
                timestamp: now,
                description: format!("emergency_stop: {}", reason),
            })?;
        }

        let ids: Vec<PositionId> = self.order.clone();
        let mut closed = 0;
        for id in ids {
            let last_price = match self.open.get(&id) {
                Some(p) => p.current_price,
                None => continue,
            };
            self.close_position(&id, last_price, CloseReason::Emergency, now)?;
            closed += 1;
        }
        Ok(closed)
    }

    /// Clear the emergency flag. Explicit administrative action only.
    pub fn reset_emergency(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.account.emergency_stopped {
            tracing::warn!("emergency stop reset");
            self.account.emergency_stopped = false;
            self.append(JournalRecord::RiskEvent {
                timestamp: now,
                description: "emergency_reset".to_string(),
            })?;
        }
        Ok(())
    }

    /// Persist an adaptation record through the ledger's journal
    pub fn record_adaptation(
        &mut self,
        record: crate::adaptive::AdaptationRecord,
    ) -> Result<(), LedgerError> {
        self.append(JournalRecord::Adaptation { record })?;
        Ok(())
    }

    /// Check balance conservation:
    /// `balance == initial_balance + Σ realized_pnl`.
    pub fn verify_conservation(&self) -> Result<(), LedgerError> {
        let realized: Decimal = self.closed.iter().map(|c| c.realized_pnl).sum();
        let expected = self.account.initial_balance + realized;
        if self.account.balance != expected {
            return Err(LedgerError::InvariantViolation(format!(
                "balance {} != initial {} + realized {}",
                self.account.balance, self.account.initial_balance, realized
            )));
        }
        Ok(())
    }

    /// Rebuild a ledger from journal records.
    ///
    /// Opens and closes replay through the account mutators with their
    /// recorded timestamps, so balance and history match the original run.
    pub fn from_records(
        initial_balance: Decimal,
        limits: RiskLimits,
        records: Vec<JournalRecord>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(initial_balance, limits);
        for record in records {
            match record {
                JournalRecord::Opened { position } => {
                    let id = position.id.clone();
                    ledger.account.record_open(position.opened_at);
                    ledger.open.insert(id.clone(), position);
                    ledger.order.push(id);
                }
                JournalRecord::Closed { position } => {
                    let id = position.position.id.clone();
                    ledger.open.remove(&id);
                    ledger.order.retain(|pid| pid != &id);
                    ledger
                        .account
                        .apply_realized(position.realized_pnl, position.closed_at);
                    ledger.closed.push(position);
                }
                JournalRecord::RiskEvent { description, .. } => {
                    if description.starts_with("emergency_stop") {
                        ledger.account.emergency_stopped = true;
                    } else if description == "emergency_reset" {
                        ledger.account.emergency_stopped = false;
                    }
                }
                JournalRecord::Adaptation { .. } => {}
            }
        }
        ledger.verify_conservation()?;
        Ok(ledger)
    }

    fn emit(&self, event: PositionEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.send(event).is_err() {
                tracing::debug!("event receiver dropped");
            }
        }
    }

    fn append(&mut self, record: JournalRecord) -> Result<(), JournalError> {
        match &mut self.journal {
            Some(journal) => journal.append(&record),
            None => Ok(()),
        }
    }
}
