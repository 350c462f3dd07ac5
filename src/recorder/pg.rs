//! PostgreSQL recorder
//!
//! Insert-only `transactions` table; no UPDATE or DELETE statement exists in
//! this module by design of the audit trail.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{NewRecord, PersistedRecord, RecordFilter, RecordStatus, RecorderError, TransactionRecorder};
use crate::core_types::{AccountId, Currency, Receiver, TxKind};

pub struct PgRecorder {
    pool: PgPool,
}

impl PgRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<PersistedRecord, RecorderError> {
        let kind_id: i16 = row.get("kind");
        let kind = TxKind::from_id(kind_id)
            .ok_or_else(|| RecorderError::Store(format!("Invalid kind id: {}", kind_id)))?;

        let status_id: i16 = row.get("status");
        let status = RecordStatus::from_id(status_id)
            .ok_or_else(|| RecorderError::Store(format!("Invalid status id: {}", status_id)))?;

        let receiver_kind: i16 = row.get("receiver_kind");
        let receiver_value: String = row.get("receiver");
        let receiver = Receiver::from_parts(receiver_kind, &receiver_value).ok_or_else(|| {
            RecorderError::Store(format!("Invalid receiver kind: {}", receiver_kind))
        })?;

        let currency_code: String = row.get("currency");
        let currency = Currency::from_code(&currency_code)
            .ok_or_else(|| RecorderError::Store(format!("Unknown currency: {}", currency_code)))?;

        Ok(PersistedRecord {
            id: row.get("id"),
            kind,
            sender: row.get::<Option<i64>, _>("sender").map(AccountId),
            receiver,
            amount: row.get::<i64, _>("amount") as u64,
            currency,
            status,
            timestamp: row.get("created_at"),
        })
    }
}

#[async_trait]
impl TransactionRecorder for PgRecorder {
    async fn append(&self, record: NewRecord) -> Result<PersistedRecord, RecorderError> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions
                (kind, sender, receiver, receiver_kind, amount, currency, status, created_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING id, kind, sender, receiver, receiver_kind, amount, currency, status, created_at
            "#,
        )
        .bind(record.kind.id())
        .bind(record.sender.map(|s| s.as_i64()))
        .bind(record.receiver.storage_value())
        .bind(record.receiver.kind_id())
        .bind(record.amount as i64)
        .bind(record.currency.code())
        .bind(record.status.id())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_record(&row)
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<PersistedRecord>, RecorderError> {
        // An account's history: records it sent, plus records addressed to it
        // as a platform receiver.
        let rows = sqlx::query(
            r#"
            SELECT id, kind, sender, receiver, receiver_kind, amount, currency, status, created_at
            FROM transactions
            WHERE (sender = $1 OR (receiver_kind = 1 AND receiver = $2))
              AND ($3::smallint IS NULL OR kind = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(filter.account.as_i64())
        .bind(filter.account.to_string())
        .bind(filter.kind.map(|k| k.id()))
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }
}
