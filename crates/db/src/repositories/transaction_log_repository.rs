//! `SQLite` implementation of `TransactionLogRepository`.

use async_trait::async_trait;
use bilingo_core::{RepositoryError, TransactionLogRepository, TransactionLogRow};
use sqlx::SqlitePool;

pub struct SqliteTransactionLogRepository {
    pool: SqlitePool,
}

impl SqliteTransactionLogRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLogRepository for SqliteTransactionLogRepository {
    async fn append(&self, row: &TransactionLogRow) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO transaction_logs (
                original_transaction_id, transaction_id, event_type, device_uuid, jws_token, created_at_ms
            ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.original_transaction_id)
        .bind(&row.transaction_id)
        .bind(&row.event_type)
        .bind(&row.device_uuid)
        .bind(&row.jws_token)
        .bind(row.created_at_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    #[tokio::test]
    async fn append_is_append_only() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteTransactionLogRepository::new(pool);
        let row = TransactionLogRow {
            original_transaction_id: "otid-1".into(),
            transaction_id: "txn-1".into(),
            event_type: "verify".into(),
            device_uuid: "dev-1".into(),
            jws_token: "eyJ...".into(),
            created_at_ms: 1_000,
        };
        repo.append(&row).await.unwrap();
        repo.append(&row).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transaction_logs")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
