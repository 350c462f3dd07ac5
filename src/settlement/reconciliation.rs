//! Reconciliation queue and alert path
//!
//! When the off-chain ledger and on-chain state may have diverged, the
//! attempt is flagged here: a high-priority record is persisted and an alert
//! is raised through a path distinct from the caller-facing result.

use async_trait::async_trait;
use std::fmt;
use std::sync::Mutex;
use tracing::error;

use super::error::TransferError;
use super::store::AttemptId;
use crate::core_types::AccountId;

/// Why an attempt needs reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum ReconciliationReason {
    /// Confirmation wait elapsed; the chain transaction may still land.
    ConfirmationTimeout = 1,
    /// Chain confirmed but the local debit failed.
    LedgerUpdateFailed = 2,
    /// Internal transfer: debit applied, credit failed, and the compensating
    /// credit also failed.
    CompensationFailed = 3,
}

impl ReconciliationReason {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(ReconciliationReason::ConfirmationTimeout),
            2 => Some(ReconciliationReason::LedgerUpdateFailed),
            3 => Some(ReconciliationReason::CompensationFailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationReason::ConfirmationTimeout => "CONFIRMATION_TIMEOUT",
            ReconciliationReason::LedgerUpdateFailed => "LEDGER_UPDATE_FAILED",
            ReconciliationReason::CompensationFailed => "COMPENSATION_FAILED",
        }
    }
}

impl fmt::Display for ReconciliationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The persisted reconciliation payload: everything follow-up tooling needs
/// to compare ledger and chain state.
#[derive(Debug, Clone)]
pub struct ReconciliationRecord {
    pub attempt_id: AttemptId,
    pub account_id: AccountId,
    pub amount: u64,
    pub tx_signature: Option<String>,
    pub reason: ReconciliationReason,
}

#[async_trait]
pub trait ReconciliationQueue: Send + Sync {
    /// Atomic insert; never updated afterwards.
    async fn flag(&self, record: &ReconciliationRecord) -> Result<(), TransferError>;
}

/// Out-of-band alert path. Kept separate from the queue so paging
/// integrations can be swapped without touching persistence.
pub trait AlertSink: Send + Sync {
    fn raise(&self, record: &ReconciliationRecord);
}

/// Production sink: a structured ERROR event on a dedicated target that
/// log-based alerting subscribes to. Carries no secret material.
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn raise(&self, record: &ReconciliationRecord) {
        error!(
            target: "reconciliation_alert",
            attempt_id = %record.attempt_id,
            account_id = %record.account_id,
            amount = record.amount,
            tx_signature = record.tx_signature.as_deref().unwrap_or("-"),
            reason = %record.reason,
            "Settlement requires reconciliation"
        );
    }
}

/// PostgreSQL queue
pub struct PgReconciliationQueue {
    pool: sqlx::PgPool,
}

impl PgReconciliationQueue {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReconciliationQueue for PgReconciliationQueue {
    async fn flag(&self, record: &ReconciliationRecord) -> Result<(), TransferError> {
        sqlx::query(
            r#"
            INSERT INTO reconciliation_queue
                (attempt_id, account_id, amount, tx_signature, reason, created_at)
            VALUES
                ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(record.attempt_id.to_string())
        .bind(record.account_id.as_i64())
        .bind(record.amount as i64)
        .bind(&record.tx_signature)
        .bind(record.reason.id())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory queue for tests and demo deployments.
#[derive(Default)]
pub struct MemReconciliationQueue {
    records: Mutex<Vec<ReconciliationRecord>>,
}

impl MemReconciliationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ReconciliationRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReconciliationQueue for MemReconciliationQueue {
    async fn flag(&self, record: &ReconciliationRecord) -> Result<(), TransferError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_roundtrip() {
        for reason in [
            ReconciliationReason::ConfirmationTimeout,
            ReconciliationReason::LedgerUpdateFailed,
            ReconciliationReason::CompensationFailed,
        ] {
            assert_eq!(ReconciliationReason::from_id(reason.id()), Some(reason));
        }
        assert_eq!(ReconciliationReason::from_id(0), None);
    }

    #[tokio::test]
    async fn test_mem_queue_records() {
        let queue = MemReconciliationQueue::new();
        let record = ReconciliationRecord {
            attempt_id: AttemptId::new(),
            account_id: AccountId(7),
            amount: 50_000_000,
            tx_signature: Some("sig".to_string()),
            reason: ReconciliationReason::ConfirmationTimeout,
        };
        queue.flag(&record).await.unwrap();

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].account_id, AccountId(7));
        assert_eq!(snapshot[0].reason, ReconciliationReason::ConfirmationTimeout);
    }
}
