//! Position lifecycle events for audit/notification collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::position::{ClosedPosition, Position};

/// An audit event emitted by the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionEvent {
    /// A position was opened
    Opened {
        event_id: Uuid,
        timestamp: DateTime<Utc>,
        position: Position,
    },
    /// A position was closed
    Closed {
        event_id: Uuid,
        timestamp: DateTime<Utc>,
        position: ClosedPosition,
    },
}

impl PositionEvent {
    /// Build an opened event
    pub fn opened(position: Position, timestamp: DateTime<Utc>) -> Self {
        Self::Opened {
            event_id: Uuid::new_v4(),
            timestamp,
            position,
        }
    }

    /// Build a closed event
    pub fn closed(position: ClosedPosition, timestamp: DateTime<Utc>) -> Self {
        Self::Closed {
            event_id: Uuid::new_v4(),
            timestamp,
            position,
        }
    }
}
