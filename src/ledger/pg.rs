//! PostgreSQL ledger
//!
//! Balance mutation is a single conditional UPDATE statement, so the
//! check-then-subtract is atomic at the store layer and linearizable per
//! account without any application-side lock.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{Account, BalanceLedger, LedgerError};
use crate::core_types::{AccountId, Currency};

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<Account, LedgerError> {
        let currency_code: String = row.get("currency");
        let currency = Currency::from_code(&currency_code)
            .ok_or_else(|| LedgerError::Store(format!("Unknown currency: {}", currency_code)))?;

        let balance: i64 = row.get("balance");
        if balance < 0 {
            // Unreachable with the schema CHECK in place; never propagate a
            // corrupt value as a u64.
            return Err(LedgerError::Store(format!(
                "Negative balance in store for account {}",
                row.get::<i64, _>("owner_id")
            )));
        }

        Ok(Account {
            owner_id: AccountId(row.get("owner_id")),
            email: row.get("email"),
            balance: balance as u64,
            currency,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl BalanceLedger for PgLedger {
    async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT owner_id, email, balance, currency, created_at, updated_at
            FROM accounts
            WHERE owner_id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_account(&row),
            None => Err(LedgerError::AccountNotFound(id)),
        }
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<AccountId>, LedgerError> {
        let owner_id = sqlx::query_scalar::<_, i64>(
            "SELECT owner_id FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner_id.map(AccountId))
    }

    async fn get_balance(&self, id: AccountId) -> Result<u64, LedgerError> {
        Ok(self.account(id).await?.balance)
    }

    async fn debit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError> {
        // Conditional single-statement update: the balance check and the
        // subtraction commit together or not at all.
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance - $1, updated_at = NOW()
            WHERE owner_id = $2 AND balance >= $1
            RETURNING balance
            "#,
        )
        .bind(amount as i64)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.get::<i64, _>("balance") as u64),
            None => {
                // Zero rows: either the account is missing or the balance
                // was short. Disambiguate with a plain read.
                let exists = sqlx::query_scalar::<_, i32>(
                    "SELECT 1 FROM accounts WHERE owner_id = $1",
                )
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

                if exists.is_some() {
                    Err(LedgerError::InsufficientFunds)
                } else {
                    Err(LedgerError::AccountNotFound(id))
                }
            }
        }
    }

    async fn credit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError> {
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + $1, updated_at = NOW()
            WHERE owner_id = $2
            RETURNING balance
            "#,
        )
        .bind(amount as i64)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.get::<i64, _>("balance") as u64),
            None => Err(LedgerError::AccountNotFound(id)),
        }
    }
}
