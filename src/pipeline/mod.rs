//! Signal-to-execution pipeline
//!
//! Turns an external, already-scored strategy signal into a sized,
//! risk-checked, ledger-committed position.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::adaptive::StrategyParameters;
use crate::ledger::{Direction, Ledger, LedgerError, OpenRequest, PositionId};
use crate::risk::RejectReason;

/// An external strategy signal. Opaque to this core: confidence is
/// already scored by the producing strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub confidence: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub strategy: String,
    pub timestamp: DateTime<Utc>,
}

/// Optional pre-commit veto, consulted after sizing but before the
/// ledger commit.
pub trait SafetyGate: Send + Sync {
    /// Whether the sized position may proceed
    fn approve(&self, signal: &Signal, quantity: Decimal) -> bool;
}

/// Default gate: approves everything
#[derive(Debug, Clone, Default)]
pub struct ApproveAll;

impl SafetyGate for ApproveAll {
    fn approve(&self, _signal: &Signal, _quantity: Decimal) -> bool {
        true
    }
}

/// Risk-based position size: `risk_amount / stop_distance`, capped so the
/// position value never exceeds `max_size_pct` of the balance.
pub fn position_size(
    balance: Decimal,
    risk_per_trade_pct: Decimal,
    entry_price: Decimal,
    stop_loss: Decimal,
    max_size_pct: Decimal,
) -> Decimal {
    let stop_distance = (entry_price - stop_loss).abs();
    if stop_distance.is_zero() || entry_price <= dec!(0) {
        return dec!(0);
    }
    let risk_amount = balance * risk_per_trade_pct / dec!(100);
    let size = risk_amount / stop_distance;
    let cap = balance * max_size_pct / dec!(100) / entry_price;
    size.min(cap)
}

/// Signal processing pipeline
pub struct SignalPipeline {
    gate: Box<dyn SafetyGate>,
}

impl SignalPipeline {
    /// Create a pipeline with the default always-approve gate
    pub fn new() -> Self {
        Self {
            gate: Box::new(ApproveAll),
        }
    }

    /// Replace the safety gate
    pub fn with_gate(mut self, gate: Box<dyn SafetyGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Size, gate, validate, and commit a signal.
    ///
    /// Rejections come back as `LedgerError::Rejected` with a reason from
    /// the closed set; they are expected and logged at info level.
    pub fn process(
        &self,
        signal: &Signal,
        ledger: &mut Ledger,
        params: &StrategyParameters,
        now: DateTime<Utc>,
    ) -> Result<PositionId, LedgerError> {
        if signal.confidence < params.min_confidence {
            tracing::info!(
                symbol = %signal.symbol,
                confidence = %signal.confidence,
                gate = %params.min_confidence,
                "signal below confidence gate"
            );
            return Err(LedgerError::Rejected(RejectReason::ConfidenceTooLow(
                signal.confidence,
            )));
        }

        let balance = ledger.snapshot().account.balance;
        let quantity = position_size(
            balance,
            params.risk_per_trade_pct,
            signal.entry_price,
            signal.stop_loss,
            params.max_position_size_pct,
        );
        if quantity <= dec!(0) {
            return Err(LedgerError::Rejected(RejectReason::InvalidLevels));
        }

        if !self.gate.approve(signal, quantity) {
            tracing::info!(symbol = %signal.symbol, "safety gate declined");
            return Err(LedgerError::Rejected(RejectReason::SafetyGateDeclined));
        }

        let request = OpenRequest {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            entry_price: signal.entry_price,
            quantity,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
        };
        let id = ledger.open_position(request, now)?;
        tracing::info!(
            %id,
            strategy = %signal.strategy,
            quantity = %quantity,
            "signal executed"
        );
        Ok(id)
    }
}

impl Default for SignalPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskLimits;

    fn signal(confidence: Decimal) -> Signal {
        Signal {
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Long,
            confidence,
            entry_price: dec!(50000),
            stop_loss: dec!(49000),
            take_profit: dec!(52000),
            strategy: "momentum".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn params() -> StrategyParameters {
        StrategyParameters::defaults_for("momentum")
    }

    fn ledger(balance: Decimal) -> Ledger {
        Ledger::new(balance, RiskLimits::default())
    }

    #[test]
    fn test_size_formula_uncapped() {
        // risk = 10000 * 1% = 100; stop distance = 1000 -> size 0.1
        let size = position_size(dec!(10000), dec!(1), dec!(50000), dec!(49000), dec!(100));
        assert_eq!(size, dec!(0.1));
    }

    #[test]
    fn test_size_cap_binds() {
        // Uncapped 0.1, but 10% cap allows 1000/50000 = 0.02
        let size = position_size(dec!(10000), dec!(1), dec!(50000), dec!(49000), dec!(10));
        assert_eq!(size, dec!(0.02));
    }

    #[test]
    fn test_size_zero_stop_distance() {
        let size = position_size(dec!(10000), dec!(1), dec!(50000), dec!(50000), dec!(10));
        assert_eq!(size, dec!(0));
    }

    #[test]
    fn test_rejects_low_confidence() {
        let pipeline = SignalPipeline::new();
        let mut ledger = ledger(dec!(10000));
        let result = pipeline.process(&signal(dec!(0.4)), &mut ledger, &params(), Utc::now());
        assert!(matches!(
            result,
            Err(LedgerError::Rejected(RejectReason::ConfidenceTooLow(_)))
        ));
        assert!(ledger.snapshot().open_positions.is_empty());
    }

    #[test]
    fn test_processes_and_commits() {
        let pipeline = SignalPipeline::new();
        let mut ledger = ledger(dec!(10000));
        let id = pipeline
            .process(&signal(dec!(0.8)), &mut ledger, &params(), Utc::now())
            .unwrap();

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.open_positions.len(), 1);
        let position = &snapshot.open_positions[0];
        assert_eq!(position.id, id);
        // Cap binds: 10% of 10000 at 50000 = 0.02
        assert_eq!(position.quantity, dec!(0.02));
        assert_eq!(snapshot.account.daily_trades, 1);
    }

    #[test]
    fn test_safety_gate_veto() {
        struct DeclineAll;
        impl SafetyGate for DeclineAll {
            fn approve(&self, _signal: &Signal, _quantity: Decimal) -> bool {
                false
            }
        }

        let pipeline = SignalPipeline::new().with_gate(Box::new(DeclineAll));
        let mut ledger = ledger(dec!(10000));
        let result = pipeline.process(&signal(dec!(0.8)), &mut ledger, &params(), Utc::now());
        assert!(matches!(
            result,
            Err(LedgerError::Rejected(RejectReason::SafetyGateDeclined))
        ));
    }

    #[test]
    fn test_validator_still_runs_after_sizing() {
        // Emergency stop set: the pipeline sizes the order but the ledger
        // validator must still reject it.
        let pipeline = SignalPipeline::new();
        let mut ledger = ledger(dec!(10000));
        ledger.emergency_stop("test", Utc::now()).unwrap();
        let result = pipeline.process(&signal(dec!(0.8)), &mut ledger, &params(), Utc::now());
        assert!(matches!(
            result,
            Err(LedgerError::Rejected(RejectReason::EmergencyStopActive))
        ));
    }
}
