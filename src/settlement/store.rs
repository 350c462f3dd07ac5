//! Settlement attempt store
//!
//! Persisted FSM rows for external settlements, including failed attempts.
//! All state transitions go through atomic CAS updates so concurrent workers
//! cannot double-apply a step.

use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::str::FromStr;

use super::error::TransferError;
use super::state::SettlementState;
use crate::core_types::AccountId;

/// Attempt id - ULID-based unique identifier
///
/// Monotonic, sortable, and coordination-free across workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(ulid::Ulid);

impl AttemptId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttemptId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// One external settlement attempt.
#[derive(Debug, Clone)]
pub struct SettlementAttempt {
    pub attempt_id: AttemptId,
    /// Client idempotency key: a retry with the same cid returns this
    /// attempt instead of submitting again.
    pub cid: Option<String>,
    pub account_id: AccountId,
    pub destination: String,
    /// Amount in scaled units
    pub amount: u64,
    pub state: SettlementState,
    /// Chain transaction signature, once submitted
    pub tx_signature: Option<String>,
    /// Last error code/message (for debugging and replayed failures)
    pub error: Option<String>,
    pub retry_count: i32,
    /// Created timestamp (millis)
    pub created_at: i64,
    /// Last updated timestamp (millis)
    pub updated_at: i64,
}

impl SettlementAttempt {
    /// New attempt in INIT state.
    pub fn new(
        attempt_id: AttemptId,
        account_id: AccountId,
        destination: &str,
        amount: u64,
        cid: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            attempt_id,
            cid,
            account_id,
            destination: destination.to_string(),
            amount,
            state: SettlementState::Init,
            tx_signature: None,
            error: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl fmt::Display for SettlementAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settlement[{}] account={} -> {} amount={} state={}",
            self.attempt_id, self.account_id, self.destination, self.amount, self.state
        )
    }
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Persist a new attempt row.
    async fn create(&self, attempt: &SettlementAttempt) -> Result<(), TransferError>;

    async fn get(&self, attempt_id: AttemptId)
        -> Result<Option<SettlementAttempt>, TransferError>;

    /// Lookup by client idempotency key.
    async fn get_by_cid(&self, cid: &str) -> Result<Option<SettlementAttempt>, TransferError>;

    /// Atomic CAS: transition only if the current state matches. Returns
    /// false when another worker already moved the attempt.
    async fn update_state_if(
        &self,
        attempt_id: AttemptId,
        expected: SettlementState,
        new: SettlementState,
    ) -> Result<bool, TransferError>;

    /// CAS with an error code recorded alongside the transition.
    async fn update_state_with_error(
        &self,
        attempt_id: AttemptId,
        expected: SettlementState,
        new: SettlementState,
        error: &str,
    ) -> Result<bool, TransferError>;

    /// Record the chain signature once the transfer is submitted.
    async fn set_signature(&self, attempt_id: AttemptId, signature: &str)
        -> Result<(), TransferError>;
}

/// In-memory settlement store for tests and demo deployments.
#[derive(Default)]
pub struct MemSettlementStore {
    attempts: DashMap<AttemptId, SettlementAttempt>,
    cid_index: DashMap<String, AttemptId>,
}

impl MemSettlementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettlementStore for MemSettlementStore {
    async fn create(&self, attempt: &SettlementAttempt) -> Result<(), TransferError> {
        if let Some(cid) = &attempt.cid {
            self.cid_index.insert(cid.clone(), attempt.attempt_id);
        }
        self.attempts.insert(attempt.attempt_id, attempt.clone());
        Ok(())
    }

    async fn get(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Option<SettlementAttempt>, TransferError> {
        Ok(self.attempts.get(&attempt_id).map(|entry| entry.clone()))
    }

    async fn get_by_cid(&self, cid: &str) -> Result<Option<SettlementAttempt>, TransferError> {
        match self.cid_index.get(cid) {
            Some(id) => self.get(*id).await,
            None => Ok(None),
        }
    }

    async fn update_state_if(
        &self,
        attempt_id: AttemptId,
        expected: SettlementState,
        new: SettlementState,
    ) -> Result<bool, TransferError> {
        match self.attempts.get_mut(&attempt_id) {
            Some(mut entry) if entry.state == expected => {
                entry.state = new;
                entry.updated_at = chrono::Utc::now().timestamp_millis();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(TransferError::AttemptNotFound(attempt_id.to_string())),
        }
    }

    async fn update_state_with_error(
        &self,
        attempt_id: AttemptId,
        expected: SettlementState,
        new: SettlementState,
        error: &str,
    ) -> Result<bool, TransferError> {
        match self.attempts.get_mut(&attempt_id) {
            Some(mut entry) if entry.state == expected => {
                entry.state = new;
                entry.error = Some(error.to_string());
                entry.updated_at = chrono::Utc::now().timestamp_millis();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(TransferError::AttemptNotFound(attempt_id.to_string())),
        }
    }

    async fn set_signature(
        &self,
        attempt_id: AttemptId,
        signature: &str,
    ) -> Result<(), TransferError> {
        match self.attempts.get_mut(&attempt_id) {
            Some(mut entry) => {
                entry.tx_signature = Some(signature.to_string());
                entry.updated_at = chrono::Utc::now().timestamp_millis();
                Ok(())
            }
            None => Err(TransferError::AttemptNotFound(attempt_id.to_string())),
        }
    }
}
