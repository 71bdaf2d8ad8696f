//! `SQLite` implementation of `PurchaseEventRepository`.

use async_trait::async_trait;
use bilingo_core::{PurchaseEventRepository, PurchaseEventRow, RepositoryError};
use sqlx::SqlitePool;

pub struct SqlitePurchaseEventRepository {
    pool: SqlitePool,
}

impl SqlitePurchaseEventRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseEventRepository for SqlitePurchaseEventRepository {
    async fn append(&self, row: &PurchaseEventRow) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO purchase_events (
                original_transaction_id, transaction_id, notification_type, environment, created_at_ms
            ) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&row.original_transaction_id)
        .bind(&row.transaction_id)
        .bind(&row.notification_type)
        .bind(row.environment.as_str())
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
    use bilingo_core::Environment;

    #[tokio::test]
    async fn append_is_append_only() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqlitePurchaseEventRepository::new(pool);
        let row = PurchaseEventRow {
            original_transaction_id: "otid-1".into(),
            transaction_id: "txn-1".into(),
            notification_type: "DID_RENEW".into(),
            environment: Environment::Production,
            created_at_ms: 1_000,
        };
        repo.append(&row).await.unwrap();
        repo.append(&row).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM purchase_events")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
