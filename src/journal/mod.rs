//! Append-only journal
//!
//! JSON-lines persistence for positions, risk events, and adaptation
//! records. Replaying a journal reconstructs the ledger after a restart,
//! including the closed-position history that drawdown and win-rate
//! calculations depend on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::adaptive::AdaptationRecord;
use crate::ledger::{ClosedPosition, Position};

/// Journal errors
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A single journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum JournalRecord {
    /// A position was opened
    Opened { position: Position },
    /// A position was closed
    Closed { position: ClosedPosition },
    /// Emergency stops, resets, limit changes
    RiskEvent {
        timestamp: DateTime<Utc>,
        description: String,
    },
    /// A strategy parameter adaptation
    Adaptation {
        #[serde(rename = "adaptation")]
        record: AdaptationRecord,
    },
}

/// Append-only JSON-lines journal file
pub struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    /// Open (or create) a journal file for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush. Errors surface to the caller; a failed
    /// write must never be silently dropped.
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), JournalError> {
        let line = serde_json::to_string(record)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        Ok(())
    }

    /// Read all records from a journal file, oldest first
    pub fn replay(path: impl AsRef<Path>) -> Result<Vec<JournalRecord>, JournalError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}
