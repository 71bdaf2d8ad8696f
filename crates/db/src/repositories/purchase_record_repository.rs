//! `SQLite` implementation of `PurchaseRecordRepository`.

use async_trait::async_trait;
use bilingo_core::{Environment, PurchaseRecord, PurchaseRecordRepository, PurchaseStatus, RepositoryError};
use sqlx::{Row, SqlitePool};

fn status_to_str(status: PurchaseStatus) -> &'static str {
    match status {
        PurchaseStatus::Active => "active",
        PurchaseStatus::InRetry => "in_retry",
        PurchaseStatus::Expired => "expired",
        PurchaseStatus::Revoked => "revoked",
    }
}

fn status_from_str(s: &str) -> PurchaseStatus {
    match s {
        "in_retry" => PurchaseStatus::InRetry,
        "expired" => PurchaseStatus::Expired,
        "revoked" => PurchaseStatus::Revoked,
        _ => PurchaseStatus::Active,
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> PurchaseRecord {
    let status: String = row.get("status");
    let environment: String = row.get("environment");
    PurchaseRecord {
        original_transaction_id: row.get("original_transaction_id"),
        product_id: row.get("product_id"),
        purchase_date_ms: row.get("purchase_date_ms"),
        expire_date_ms: row.get("expire_date_ms"),
        status: status_from_str(&status),
        environment: if environment == "sandbox" {
            Environment::Sandbox
        } else {
            Environment::Production
        },
        device_count: row.get::<i64, _>("device_count") as u32,
    }
}

pub struct SqlitePurchaseRecordRepository {
    pool: SqlitePool,
}

impl SqlitePurchaseRecordRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseRecordRepository for SqlitePurchaseRecordRepository {
    async fn get(&self, original_transaction_id: &str) -> Result<Option<PurchaseRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT original_transaction_id, product_id, purchase_date_ms, expire_date_ms, \
             status, environment, device_count FROM purchase_records WHERE original_transaction_id = ?",
        )
        .bind(original_transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn insert(&self, record: &PurchaseRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO purchase_records (
                original_transaction_id, product_id, purchase_date_ms, expire_date_ms,
                status, environment, device_count, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        )
        .bind(&record.original_transaction_id)
        .bind(&record.product_id)
        .bind(record.purchase_date_ms)
        .bind(record.expire_date_ms)
        .bind(status_to_str(record.status))
        .bind(record.environment.as_str())
        .bind(i64::from(record.device_count))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                RepositoryError::AlreadyExists(record.original_transaction_id.clone())
            } else {
                RepositoryError::Storage(e.to_string())
            }
        })?;
        Ok(())
    }

    async fn update(&self, record: &PurchaseRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE purchase_records SET product_id = ?, purchase_date_ms = ?, expire_date_ms = ?, \
             status = ?, environment = ?, device_count = ?, updated_at = datetime('now') \
             WHERE original_transaction_id = ?",
        )
        .bind(&record.product_id)
        .bind(record.purchase_date_ms)
        .bind(record.expire_date_ms)
        .bind(status_to_str(record.status))
        .bind(record.environment.as_str())
        .bind(i64::from(record.device_count))
        .bind(&record.original_transaction_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(record.original_transaction_id.clone()));
        }
        Ok(())
    }

    async fn set_device_count(
        &self,
        original_transaction_id: &str,
        device_count: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE purchase_records SET device_count = ?, updated_at = datetime('now') \
             WHERE original_transaction_id = ?",
        )
        .bind(i64::from(device_count))
        .bind(original_transaction_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(original_transaction_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    fn record(otid: &str) -> PurchaseRecord {
        PurchaseRecord {
            original_transaction_id: otid.to_string(),
            product_id: "monthly".into(),
            purchase_date_ms: 1_000,
            expire_date_ms: Some(2_000),
            status: PurchaseStatus::Active,
            environment: Environment::Production,
            device_count: 0,
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqlitePurchaseRecordRepository::new(pool);
        repo.insert(&record("otid-1")).await.unwrap();
        let fetched = repo.get("otid-1").await.unwrap().unwrap();
        assert_eq!(fetched.product_id, "monthly");
        assert_eq!(fetched.status, PurchaseStatus::Active);
    }

    #[tokio::test]
    async fn update_changes_status_and_expire_date() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqlitePurchaseRecordRepository::new(pool);
        repo.insert(&record("otid-1")).await.unwrap();
        let mut updated = record("otid-1");
        updated.status = PurchaseStatus::Expired;
        updated.expire_date_ms = Some(3_000);
        repo.update(&updated).await.unwrap();

        let fetched = repo.get("otid-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, PurchaseStatus::Expired);
        assert_eq!(fetched.expire_date_ms, Some(3_000));
    }

    #[tokio::test]
    async fn set_device_count_on_missing_record_is_not_found() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqlitePurchaseRecordRepository::new(pool);
        let err = repo.set_device_count("missing", 1).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
