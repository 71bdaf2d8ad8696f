//! `SQLite` implementation of `NotificationLogRepository`, the idempotency
//! ledger for App Store Server Notifications.

use async_trait::async_trait;
use bilingo_core::{Environment, NotificationLogRepository, NotificationLogRow, RepositoryError};
use sqlx::{Row, SqlitePool};

pub struct SqliteNotificationLogRepository {
    pool: SqlitePool,
}

impl SqliteNotificationLogRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLogRepository for SqliteNotificationLogRepository {
    async fn exists(&self, notification_uuid: &str) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM notification_logs WHERE notification_uuid = ?")
            .bind(notification_uuid)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let count: i64 = row.get("c");
        Ok(count > 0)
    }

    async fn append(&self, row: &NotificationLogRow) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notification_logs (
                notification_uuid, notification_type, subtype, original_transaction_id,
                transaction_id, environment, signed_payload, created_at_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.notification_uuid)
        .bind(&row.notification_type)
        .bind(&row.subtype)
        .bind(&row.original_transaction_id)
        .bind(&row.transaction_id)
        .bind(row.environment.as_str())
        .bind(&row.signed_payload)
        .bind(row.created_at_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                RepositoryError::AlreadyExists(row.notification_uuid.clone())
            } else {
                RepositoryError::Storage(e.to_string())
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    fn row(uuid: &str) -> NotificationLogRow {
        NotificationLogRow {
            notification_uuid: uuid.to_string(),
            notification_type: "SUBSCRIBED".into(),
            subtype: Some("INITIAL_BUY".into()),
            original_transaction_id: Some("otid-1".into()),
            transaction_id: Some("txn-1".into()),
            environment: Environment::Production,
            signed_payload: "eyJ...".into(),
            created_at_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn exists_is_false_until_appended() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteNotificationLogRepository::new(pool);
        assert!(!repo.exists("notif-1").await.unwrap());
        repo.append(&row("notif-1")).await.unwrap();
        assert!(repo.exists("notif-1").await.unwrap());
    }

    #[tokio::test]
    async fn append_rejects_duplicate_uuid() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteNotificationLogRepository::new(pool);
        repo.append(&row("notif-1")).await.unwrap();
        let err = repo.append(&row("notif-1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists(_)));
    }
}
