//! Database pool configuration and schema bootstrap.

use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Create a tuned SQLite connection pool.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    SqlitePoolOptions::new()
        // SQLite is single-writer, but can have multiple readers
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .max_lifetime(Duration::from_secs(1800))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))
}

/// Apply the schema. Statements are idempotent (`IF NOT EXISTS`), so this is
/// safe on every startup and on in-memory test databases.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Schema bootstrap failed: {e}"))?;
    info!("database schema ready");
    Ok(())
}
