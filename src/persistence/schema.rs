//! PostgreSQL schema
//!
//! In-code DDL, applied idempotently at startup. The balance CHECK backs the
//! ledger's non-negative invariant at the store layer: even a buggy caller
//! cannot commit a negative balance.

use anyhow::Result;
use sqlx::PgPool;

const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    owner_id    BIGINT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    balance     BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
    currency    TEXT NOT NULL DEFAULT 'USDC',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id             BIGSERIAL PRIMARY KEY,
    kind           SMALLINT NOT NULL,
    sender         BIGINT,
    receiver       TEXT NOT NULL,
    receiver_kind  SMALLINT NOT NULL,
    amount         BIGINT NOT NULL CHECK (amount > 0),
    currency       TEXT NOT NULL,
    status         SMALLINT NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_TRANSACTIONS_SENDER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS transactions_sender_idx
    ON transactions (sender, created_at DESC)
"#;

const CREATE_SETTLEMENT_ATTEMPTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS settlement_attempts (
    attempt_id     TEXT PRIMARY KEY,
    cid            TEXT UNIQUE,
    account_id     BIGINT NOT NULL,
    destination    TEXT NOT NULL,
    amount         BIGINT NOT NULL CHECK (amount > 0),
    state          SMALLINT NOT NULL,
    tx_signature   TEXT,
    error_message  TEXT,
    retry_count    INTEGER NOT NULL DEFAULT 0,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_RECONCILIATION_QUEUE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS reconciliation_queue (
    id            BIGSERIAL PRIMARY KEY,
    attempt_id    TEXT NOT NULL,
    account_id    BIGINT NOT NULL,
    amount        BIGINT NOT NULL,
    tx_signature  TEXT,
    reason        SMALLINT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Apply the schema. Safe to run on every startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Ensuring PostgreSQL schema");

    for (name, ddl) in [
        ("accounts", CREATE_ACCOUNTS_TABLE),
        ("transactions", CREATE_TRANSACTIONS_TABLE),
        ("transactions index", CREATE_TRANSACTIONS_SENDER_INDEX),
        ("settlement_attempts", CREATE_SETTLEMENT_ATTEMPTS_TABLE),
        ("reconciliation_queue", CREATE_RECONCILIATION_QUEUE_TABLE),
    ] {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", name, e))?;
    }

    Ok(())
}
