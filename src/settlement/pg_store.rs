//! PostgreSQL settlement store
//!
//! CAS state updates are single conditional UPDATE statements keyed on the
//! expected state, mirroring the ledger's conditional balance update.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::error::TransferError;
use super::state::SettlementState;
use super::store::{AttemptId, SettlementAttempt, SettlementStore};
use crate::core_types::AccountId;

pub struct PgSettlementStore {
    pool: PgPool,
}

impl PgSettlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_attempt(row: &sqlx::postgres::PgRow) -> Result<SettlementAttempt, TransferError> {
        let attempt_id_str: String = row.get("attempt_id");
        let attempt_id: AttemptId = attempt_id_str
            .parse()
            .map_err(|_| TransferError::Store("Invalid attempt_id format".to_string()))?;

        let state_id: i16 = row.get("state");
        let state = SettlementState::from_id(state_id)
            .ok_or_else(|| TransferError::Store(format!("Invalid state id: {}", state_id)))?;

        let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
        let updated_at: chrono::DateTime<chrono::Utc> = row.get("updated_at");

        Ok(SettlementAttempt {
            attempt_id,
            cid: row.get("cid"),
            account_id: AccountId(row.get("account_id")),
            destination: row.get("destination"),
            amount: row.get::<i64, _>("amount") as u64,
            state,
            tx_signature: row.get("tx_signature"),
            error: row.get("error_message"),
            retry_count: row.get("retry_count"),
            created_at: created_at.timestamp_millis(),
            updated_at: updated_at.timestamp_millis(),
        })
    }
}

const SELECT_COLUMNS: &str = "attempt_id, cid, account_id, destination, amount, state, \
     tx_signature, error_message, retry_count, created_at, updated_at";

#[async_trait]
impl SettlementStore for PgSettlementStore {
    async fn create(&self, attempt: &SettlementAttempt) -> Result<(), TransferError> {
        sqlx::query(
            r#"
            INSERT INTO settlement_attempts
                (attempt_id, cid, account_id, destination, amount, state, created_at, updated_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            "#,
        )
        .bind(attempt.attempt_id.to_string())
        .bind(&attempt.cid)
        .bind(attempt.account_id.as_i64())
        .bind(&attempt.destination)
        .bind(attempt.amount as i64)
        .bind(attempt.state.id())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Option<SettlementAttempt>, TransferError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM settlement_attempts WHERE attempt_id = $1",
            SELECT_COLUMNS
        ))
        .bind(attempt_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_attempt).transpose()
    }

    async fn get_by_cid(&self, cid: &str) -> Result<Option<SettlementAttempt>, TransferError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM settlement_attempts WHERE cid = $1",
            SELECT_COLUMNS
        ))
        .bind(cid)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_attempt).transpose()
    }

    async fn update_state_if(
        &self,
        attempt_id: AttemptId,
        expected: SettlementState,
        new: SettlementState,
    ) -> Result<bool, TransferError> {
        let result = sqlx::query(
            r#"
            UPDATE settlement_attempts
            SET state = $1, updated_at = NOW()
            WHERE attempt_id = $2 AND state = $3
            "#,
        )
        .bind(new.id())
        .bind(attempt_id.to_string())
        .bind(expected.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_state_with_error(
        &self,
        attempt_id: AttemptId,
        expected: SettlementState,
        new: SettlementState,
        error: &str,
    ) -> Result<bool, TransferError> {
        let result = sqlx::query(
            r#"
            UPDATE settlement_attempts
            SET state = $1, error_message = $2, updated_at = NOW()
            WHERE attempt_id = $3 AND state = $4
            "#,
        )
        .bind(new.id())
        .bind(error)
        .bind(attempt_id.to_string())
        .bind(expected.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_signature(
        &self,
        attempt_id: AttemptId,
        signature: &str,
    ) -> Result<(), TransferError> {
        sqlx::query(
            r#"
            UPDATE settlement_attempts
            SET tx_signature = $1, updated_at = NOW()
            WHERE attempt_id = $2
            "#,
        )
        .bind(signature)
        .bind(attempt_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
