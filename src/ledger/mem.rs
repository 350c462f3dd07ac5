//! In-memory ledger
//!
//! DashMap-backed implementation used by tests and demo deployments without
//! PostgreSQL. Each mutation holds the account's shard entry exclusively, so
//! debit/credit are linearizable per account.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{Account, BalanceLedger, LedgerError};
use crate::core_types::{AccountId, Currency};

#[derive(Default)]
pub struct MemLedger {
    accounts: DashMap<AccountId, Account>,
    email_index: DashMap<String, AccountId>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account. Provisioning is outside the engine; tests and demo
    /// setups use this directly.
    pub fn insert_account(&self, id: AccountId, email: &str, balance: u64, currency: Currency) {
        let now = Utc::now();
        self.accounts.insert(
            id,
            Account {
                owner_id: id,
                email: email.to_string(),
                balance,
                currency,
                created_at: now,
                updated_at: now,
            },
        );
        self.email_index.insert(email.to_string(), id);
    }
}

#[async_trait]
impl BalanceLedger for MemLedger {
    async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<AccountId>, LedgerError> {
        Ok(self.email_index.get(email).map(|entry| *entry))
    }

    async fn get_balance(&self, id: AccountId) -> Result<u64, LedgerError> {
        Ok(self.account(id).await?.balance)
    }

    async fn debit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError> {
        let mut entry = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;

        if entry.balance < amount {
            return Err(LedgerError::InsufficientFunds);
        }

        entry.balance -= amount;
        entry.updated_at = Utc::now();
        Ok(entry.balance)
    }

    async fn credit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError> {
        let mut entry = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;

        entry.balance = entry
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        entry.updated_at = Utc::now();
        Ok(entry.balance)
    }
}
