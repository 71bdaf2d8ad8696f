//! `SQLite` implementation of `UserRepository`.

use async_trait::async_trait;
use bilingo_core::{RepositoryError, User, UserRepository};
use sqlx::{Row, SqlitePool};

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        internal_id: row.get("id"),
        device_uuid: row.get("device_uuid"),
        original_transaction_id: row.get("original_transaction_id"),
        is_vip: row.get::<i64, _>("is_vip") != 0,
        vip_expire_ms: row.get("vip_expire_ms"),
    }
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn get_by_device_uuid(&self, device_uuid: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, device_uuid, original_transaction_id, is_vip, vip_expire_ms \
             FROM users WHERE device_uuid = ?",
        )
        .bind(device_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn create(&self, device_uuid: &str) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (device_uuid, is_vip, updated_at) VALUES (?, 0, datetime('now'))",
        )
        .bind(device_uuid)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                RepositoryError::AlreadyExists(device_uuid.to_string())
            } else {
                RepositoryError::Storage(e.to_string())
            }
        })?;

        let row = sqlx::query(
            "SELECT id, device_uuid, original_transaction_id, is_vip, vip_expire_ms \
             FROM users WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(row_to_user(&row))
    }

    async fn update_vip_status(
        &self,
        device_uuid: &str,
        is_vip: bool,
        vip_expire_ms: Option<i64>,
        original_transaction_id: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET original_transaction_id = ?, is_vip = ?, vip_expire_ms = ?, \
             updated_at = datetime('now') WHERE device_uuid = ?",
        )
        .bind(original_transaction_id)
        .bind(is_vip)
        .bind(vip_expire_ms)
        .bind(device_uuid)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(device_uuid.to_string()));
        }
        Ok(())
    }

    async fn update_vip_status_by_original_transaction_id(
        &self,
        original_transaction_id: &str,
        is_vip: bool,
        vip_expire_ms: Option<i64>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET is_vip = ?, vip_expire_ms = ?, updated_at = datetime('now') \
             WHERE original_transaction_id = ?",
        )
        .bind(is_vip)
        .bind(vip_expire_ms)
        .bind(original_transaction_id)
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
    async fn create_then_get_round_trips() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        let created = repo.create("device-1").await.unwrap();
        assert!(!created.is_vip);

        let fetched = repo.get_by_device_uuid("device-1").await.unwrap().unwrap();
        assert_eq!(fetched.device_uuid, "device-1");
    }

    #[tokio::test]
    async fn update_vip_status_downgrades_only_the_targeted_device() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        repo.create("device-1").await.unwrap();
        repo.create("device-2").await.unwrap();
        repo.update_vip_status("device-1", true, Some(1_000), Some("otid-1"))
            .await
            .unwrap();
        repo.update_vip_status("device-2", true, Some(2_000), Some("otid-1"))
            .await
            .unwrap();

        repo.update_vip_status("device-1", false, None, None).await.unwrap();
        let downgraded = repo.get_by_device_uuid("device-1").await.unwrap().unwrap();
        assert!(!downgraded.is_vip);
        assert!(downgraded.original_transaction_id.is_none());

        let untouched = repo.get_by_device_uuid("device-2").await.unwrap().unwrap();
        assert!(untouched.is_vip);
        assert_eq!(untouched.vip_expire_ms, Some(2_000));
    }
}
