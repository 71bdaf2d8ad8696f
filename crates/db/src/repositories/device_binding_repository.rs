//! `SQLite` implementation of `DeviceBindingRepository`.

use async_trait::async_trait;
use bilingo_core::{DeviceBinding, DeviceBindingRepository, RepositoryError};
use sqlx::{Row, SqlitePool};

fn row_to_binding(row: &sqlx::sqlite::SqliteRow) -> DeviceBinding {
    DeviceBinding {
        original_transaction_id: row.get("original_transaction_id"),
        device_uuid: row.get("device_uuid"),
        device_name: row.get("device_name"),
        bind_time_ms: row.get("bind_time_ms"),
        last_active_time_ms: row.get("last_active_time_ms"),
    }
}

pub struct SqliteDeviceBindingRepository {
    pool: SqlitePool,
}

impl SqliteDeviceBindingRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceBindingRepository for SqliteDeviceBindingRepository {
    async fn list_for(&self, original_transaction_id: &str) -> Result<Vec<DeviceBinding>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT original_transaction_id, device_uuid, device_name, bind_time_ms, last_active_time_ms \
             FROM device_bindings WHERE original_transaction_id = ? ORDER BY last_active_time_ms ASC",
        )
        .bind(original_transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(rows.iter().map(row_to_binding).collect())
    }

    async fn get(
        &self,
        original_transaction_id: &str,
        device_uuid: &str,
    ) -> Result<Option<DeviceBinding>, RepositoryError> {
        let row = sqlx::query(
            "SELECT original_transaction_id, device_uuid, device_name, bind_time_ms, last_active_time_ms \
             FROM device_bindings WHERE original_transaction_id = ? AND device_uuid = ?",
        )
        .bind(original_transaction_id)
        .bind(device_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(row.as_ref().map(row_to_binding))
    }

    async fn insert(&self, binding: &DeviceBinding) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO device_bindings (
                original_transaction_id, device_uuid, device_name, bind_time_ms, last_active_time_ms
            ) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&binding.original_transaction_id)
        .bind(&binding.device_uuid)
        .bind(&binding.device_name)
        .bind(binding.bind_time_ms)
        .bind(binding.last_active_time_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                RepositoryError::AlreadyExists(format!(
                    "{}/{}",
                    binding.original_transaction_id, binding.device_uuid
                ))
            } else {
                RepositoryError::Storage(e.to_string())
            }
        })?;
        Ok(())
    }

    async fn touch_last_active(
        &self,
        original_transaction_id: &str,
        device_uuid: &str,
        now_ms: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE device_bindings SET last_active_time_ms = ? \
             WHERE original_transaction_id = ? AND device_uuid = ?",
        )
        .bind(now_ms)
        .bind(original_transaction_id)
        .bind(device_uuid)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "{original_transaction_id}/{device_uuid}"
            )));
        }
        Ok(())
    }

    async fn delete(
        &self,
        original_transaction_id: &str,
        device_uuid: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM device_bindings WHERE original_transaction_id = ? AND device_uuid = ?",
        )
        .bind(original_transaction_id)
        .bind(device_uuid)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "{original_transaction_id}/{device_uuid}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    fn binding(otid: &str, device: &str, last_active: i64) -> DeviceBinding {
        DeviceBinding {
            original_transaction_id: otid.to_string(),
            device_uuid: device.to_string(),
            device_name: Some("iPhone".into()),
            bind_time_ms: 1_000,
            last_active_time_ms: last_active,
        }
    }

    #[tokio::test]
    async fn list_for_orders_by_last_active_ascending() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteDeviceBindingRepository::new(pool);
        repo.insert(&binding("otid-1", "dev-b", 200)).await.unwrap();
        repo.insert(&binding("otid-1", "dev-a", 100)).await.unwrap();

        let rows = repo.list_for("otid-1").await.unwrap();
        assert_eq!(rows[0].device_uuid, "dev-a");
        assert_eq!(rows[1].device_uuid, "dev-b");
    }

    #[tokio::test]
    async fn delete_removes_binding() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteDeviceBindingRepository::new(pool);
        repo.insert(&binding("otid-1", "dev-a", 100)).await.unwrap();
        repo.delete("otid-1", "dev-a").await.unwrap();
        assert!(repo.get("otid-1", "dev-a").await.unwrap().is_none());
    }
}
