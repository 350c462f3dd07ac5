//! PostgreSQL persistence plumbing

pub mod schema;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connect to PostgreSQL with a bounded pool.
pub async fn connect(postgres_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(postgres_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    Ok(pool)
}
