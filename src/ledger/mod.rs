//! Balance Ledger
//!
//! Owns per-account balance state. Debit is the only operation that can fail
//! on balance grounds, and it observes the committed balance at the moment of
//! mutation; two concurrent debits can never both succeed when only one
//! amount's worth of balance exists.

pub mod mem;
pub mod pg;

pub use mem::MemLedger;
pub use pg::PgLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core_types::{AccountId, Currency};

/// Ledger operation errors
#[derive(Debug, Error, Clone)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Balance overflow")]
    Overflow,

    #[error("Store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Store(e.to_string())
    }
}

/// Account row: one per user. Mutated only through debit/credit; never
/// deleted by this engine. Currency is fixed at creation.
#[derive(Debug, Clone)]
pub struct Account {
    pub owner_id: AccountId,
    pub email: String,
    /// Balance in scaled units (micro-USDC). Non-negative at all observable
    /// times.
    pub balance: u64,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Atomic per-account balance primitives.
///
/// Implementations must make `debit` linearizable per account: an atomic
/// conditional update at the store layer, or a per-account lock with a short
/// critical section. No confirmation wait or other slow work may happen
/// inside that critical section.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Load a full account row.
    async fn account(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Resolve an account id from the receiver lookup key (email).
    async fn lookup_by_email(&self, email: &str) -> Result<Option<AccountId>, LedgerError>;

    /// Current balance in scaled units.
    async fn get_balance(&self, id: AccountId) -> Result<u64, LedgerError>;

    /// Atomic check-then-subtract. Fails `InsufficientFunds` without any
    /// mutation when the committed balance is short. Returns the balance
    /// after the debit.
    async fn debit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError>;

    /// Atomic add. Returns the balance after the credit.
    async fn credit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError>;
}
