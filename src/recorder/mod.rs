//! Transaction Recorder
//!
//! Append-only audit trail of transfer attempts and outcomes. Records are
//! never mutated or deleted after persistence; history views and
//! reconciliation tooling consume them.

pub mod mem;
pub mod pg;

pub use mem::MemRecorder;
pub use pg::PgRecorder;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::core_types::{AccountId, Currency, Receiver, TxKind};

#[derive(Debug, Error, Clone)]
pub enum RecorderError {
    #[error("Store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for RecorderError {
    fn from(e: sqlx::Error) -> Self {
        RecorderError::Store(e.to_string())
    }
}

/// Outcome status of a recorded transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum RecordStatus {
    Completed = 1,
    Failed = 2,
    /// Unsafe outcome: the attempt is under reconciliation review.
    PendingReview = 3,
}

impl RecordStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(RecordStatus::Completed),
            2 => Some(RecordStatus::Failed),
            3 => Some(RecordStatus::PendingReview),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Completed => "COMPLETED",
            RecordStatus::Failed => "FAILED",
            RecordStatus::PendingReview => "PENDING_REVIEW",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record as submitted by a coordinator.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub kind: TxKind,
    /// None for system-originated movements.
    pub sender: Option<AccountId>,
    pub receiver: Receiver,
    pub amount: u64,
    pub currency: Currency,
    pub status: RecordStatus,
}

/// A record as persisted: generated id plus server timestamp.
#[derive(Debug, Clone)]
pub struct PersistedRecord {
    pub id: i64,
    pub kind: TxKind,
    pub sender: Option<AccountId>,
    pub receiver: Receiver,
    pub amount: u64,
    pub currency: Currency,
    pub status: RecordStatus,
    pub timestamp: DateTime<Utc>,
}

/// History filter: records where the account is sender or receiver.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub account: AccountId,
    pub kind: Option<TxKind>,
    pub limit: i64,
}

impl RecordFilter {
    pub fn for_account(account: AccountId) -> Self {
        Self {
            account,
            kind: None,
            limit: 50,
        }
    }
}

#[async_trait]
pub trait TransactionRecorder: Send + Sync {
    /// Append one immutable record; returns it with generated id and server
    /// timestamp.
    async fn append(&self, record: NewRecord) -> Result<PersistedRecord, RecorderError>;

    /// History view, newest first.
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<PersistedRecord>, RecorderError>;
}
