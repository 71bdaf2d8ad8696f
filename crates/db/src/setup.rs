//! Database setup and initialization.
//!
//! Provides `setup_database()` for initializing the `SQLite` database with
//! the full schema (`podcasts`, `users`, `purchase_records`,
//! `device_bindings`, `transaction_logs`, `notification_logs`) plus the
//! indexes implied by the access patterns in spec.md §4.

use anyhow::Result;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::path::Path;

/// Connects to (creating if necessary) the `SQLite` database at `db_path`
/// and ensures the schema exists.
///
/// # Errors
///
/// Returns an error if the database file cannot be opened/created or schema
/// creation fails.
pub async fn setup_database(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true),
    )
    .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Sets up an in-memory `SQLite` database for testing.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Creates the complete database schema. Safe to call multiple times; all
/// statements use `IF NOT EXISTS`.
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS podcasts (
            id TEXT PRIMARY KEY,
            company TEXT NOT NULL,
            channel TEXT NOT NULL,
            audio_key TEXT NOT NULL,
            segments_key TEXT NOT NULL,
            segment_count INTEGER NOT NULL,
            title TEXT,
            title_translation TEXT,
            subtitle TEXT,
            timestamp_sec INTEGER NOT NULL,
            language_code TEXT NOT NULL DEFAULT 'en',
            duration_sec REAL,
            raw_audio_url TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_podcasts_company_channel ON podcasts(company, channel)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_podcasts_timestamp ON podcasts(timestamp_sec)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_uuid TEXT NOT NULL UNIQUE,
            original_transaction_id TEXT,
            is_vip INTEGER NOT NULL DEFAULT 0,
            vip_expire_ms INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_original_transaction_id ON users(original_transaction_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS purchase_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_transaction_id TEXT NOT NULL UNIQUE,
            product_id TEXT NOT NULL,
            purchase_date_ms INTEGER NOT NULL,
            expire_date_ms INTEGER,
            status TEXT NOT NULL DEFAULT 'active',
            environment TEXT NOT NULL DEFAULT 'production',
            device_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_bindings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_transaction_id TEXT NOT NULL,
            device_uuid TEXT NOT NULL,
            device_name TEXT,
            bind_time_ms INTEGER NOT NULL,
            last_active_time_ms INTEGER NOT NULL,
            UNIQUE(original_transaction_id, device_uuid)
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_device_bindings_otid ON device_bindings(original_transaction_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_device_bindings_last_active ON device_bindings(last_active_time_ms)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transaction_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_transaction_id TEXT NOT NULL,
            transaction_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            device_uuid TEXT NOT NULL,
            jws_token TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transaction_logs_otid ON transaction_logs(original_transaction_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            notification_uuid TEXT NOT NULL UNIQUE,
            notification_type TEXT NOT NULL,
            subtype TEXT,
            original_transaction_id TEXT,
            transaction_id TEXT,
            environment TEXT NOT NULL,
            signed_payload TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_notification_logs_uuid ON notification_logs(notification_uuid)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS purchase_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_transaction_id TEXT NOT NULL,
            transaction_id TEXT NOT NULL,
            notification_type TEXT NOT NULL,
            environment TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_purchase_events_otid ON purchase_events(original_transaction_id)")
        .execute(pool)
        .await?;

    // Migration: device_name was added after the initial release.
    let _ = sqlx::query("ALTER TABLE device_bindings ADD COLUMN device_name TEXT")
        .execute(pool)
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn setup_test_database_creates_all_tables() {
        let pool = setup_test_database().await.unwrap();
        for table in [
            "podcasts",
            "users",
            "purchase_records",
            "device_bindings",
            "transaction_logs",
            "notification_logs",
            "purchase_events",
        ] {
            let query = format!("SELECT COUNT(*) FROM {table}");
            let _: (i64,) = sqlx::query_as(&query).fetch_one(&pool).await.unwrap();
        }
    }
}
