use crate::domain::error::{AppError, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS endpoints (
        id TEXT PRIMARY KEY,
        api_name TEXT NOT NULL,
        api_url TEXT NOT NULL,
        http_method TEXT NOT NULL,
        headers_json TEXT,
        parameters_json TEXT,
        payload_json TEXT,
        user_id TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_endpoints_user ON endpoints (user_id, created_at)",
    "CREATE TABLE IF NOT EXISTS export_credentials (
        owner TEXT PRIMARY KEY,
        repo TEXT NOT NULL,
        access_token TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )",
];

/// Opens the pool and makes sure the schema exists.
pub async fn init_db(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::DatabaseError(format!("Failed to parse DB URL: {e}")))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
    }

    // Each in-memory connection is its own database, so keep exactly one alive.
    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(5));
    if in_memory {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to connect DB: {e}")))?;

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create schema: {e}")))?;
    }

    Ok(pool)
}
