//! Device Binder (M3): the bind/kick/unbind state machine over the two-slot
//! policy (spec.md §4.3.4), grounded on `device_manager.py`'s
//! `DeviceManager.bind_device`/`unbind_device`/`check_device_status`.

use std::sync::Arc;

use bilingo_core::{CoreError, DeviceBinding, DeviceBindingRepository, PurchaseRecordRepository, UserRepository};

pub const MAX_DEVICES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    pub bound_devices: Vec<String>,
    pub kicked_device: Option<String>,
}

pub struct DeviceBinder {
    bindings: Arc<dyn DeviceBindingRepository>,
    purchase_records: Arc<dyn PurchaseRecordRepository>,
    users: Arc<dyn UserRepository>,
}

impl DeviceBinder {
    #[must_use]
    pub const fn new(
        bindings: Arc<dyn DeviceBindingRepository>,
        purchase_records: Arc<dyn PurchaseRecordRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { bindings, purchase_records, users }
    }

    /// `bind(T, U, name?)` per spec.md §4.3.4.
    pub async fn bind(
        &self,
        original_transaction_id: &str,
        device_uuid: &str,
        device_name: Option<&str>,
        now_ms: i64,
    ) -> Result<BindOutcome, CoreError> {
        let current = self
            .bindings
            .list_for(original_transaction_id)
            .await
            .map_err(CoreError::from)?;

        if let Some(existing) = current.iter().find(|b| b.device_uuid == device_uuid) {
            let _ = existing;
            self.bindings
                .touch_last_active(original_transaction_id, device_uuid, now_ms)
                .await
                .map_err(CoreError::from)?;
            return Ok(BindOutcome {
                bound_devices: current.into_iter().map(|b| b.device_uuid).collect(),
                kicked_device: None,
            });
        }

        if current.len() < MAX_DEVICES {
            self.bindings
                .insert(&DeviceBinding {
                    original_transaction_id: original_transaction_id.to_string(),
                    device_uuid: device_uuid.to_string(),
                    device_name: device_name.map(str::to_string),
                    bind_time_ms: now_ms,
                    last_active_time_ms: now_ms,
                })
                .await
                .map_err(CoreError::from)?;
            let new_count = current.len() + 1;
            self.purchase_records
                .set_device_count(original_transaction_id, new_count as u32)
                .await
                .map_err(CoreError::from)?;
            let mut bound_devices: Vec<String> = current.into_iter().map(|b| b.device_uuid).collect();
            bound_devices.push(device_uuid.to_string());
            return Ok(BindOutcome { bound_devices, kicked_device: None });
        }

        // Full: kick the oldest (list_for is ordered by last_active_time_ms ascending).
        let oldest = current[0].device_uuid.clone();
        self.bindings
            .delete(original_transaction_id, &oldest)
            .await
            .map_err(CoreError::from)?;
        // Downgrade only the kicked device's own row; the surviving device's
        // row is untouched (spec.md §4.3.4).
        self.users
            .update_vip_status(&oldest, false, None, None)
            .await
            .map_err(CoreError::from)?;
        self.bindings
            .insert(&DeviceBinding {
                original_transaction_id: original_transaction_id.to_string(),
                device_uuid: device_uuid.to_string(),
                device_name: device_name.map(str::to_string),
                bind_time_ms: now_ms,
                last_active_time_ms: now_ms,
            })
            .await
            .map_err(CoreError::from)?;

        let bound_devices = vec![
            current.get(1).map(|b| b.device_uuid.clone()).unwrap_or_default(),
            device_uuid.to_string(),
        ];
        Ok(BindOutcome { bound_devices, kicked_device: Some(oldest) })
    }

    /// `unbind(self, target, T)`. Rejects unbinding the caller's own device.
    pub async fn unbind(
        &self,
        current_device_uuid: &str,
        target_device_uuid: &str,
        original_transaction_id: &str,
    ) -> Result<(), CoreError> {
        if target_device_uuid == current_device_uuid {
            return Err(CoreError::Validation("cannot unbind current device".to_string()));
        }
        self.bindings
            .delete(original_transaction_id, target_device_uuid)
            .await
            .map_err(CoreError::from)?;

        let remaining = self
            .bindings
            .list_for(original_transaction_id)
            .await
            .map_err(CoreError::from)?;
        self.purchase_records
            .set_device_count(original_transaction_id, remaining.len() as u32)
            .await
            .map_err(CoreError::from)?;

        // Downgrade only the unbound device's own row (spec.md §4.3.4); the
        // remaining devices' rows are untouched.
        self.users
            .update_vip_status(target_device_uuid, false, None, None)
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }

    /// Login-time consistency check: a device whose user row carries a
    /// subscription it is not actually bound to gets downgraded and
    /// reported as kicked.
    pub async fn check_login_consistency(
        &self,
        device_uuid: &str,
        original_transaction_id: &str,
    ) -> Result<bool, CoreError> {
        let binding = self
            .bindings
            .get(original_transaction_id, device_uuid)
            .await
            .map_err(CoreError::from)?;
        if binding.is_none() {
            self.users
                .update_vip_status(device_uuid, false, None, None)
                .await
                .map_err(CoreError::from)?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bilingo_core::{PurchaseRecord, RepositoryError, User};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockBindings {
        rows: Mutex<Vec<DeviceBinding>>,
    }

    #[async_trait]
    impl DeviceBindingRepository for MockBindings {
        async fn list_for(&self, otid: &str) -> Result<Vec<DeviceBinding>, RepositoryError> {
            let mut rows: Vec<_> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.original_transaction_id == otid)
                .cloned()
                .collect();
            rows.sort_by_key(|b| b.last_active_time_ms);
            Ok(rows)
        }
        async fn get(&self, otid: &str, device: &str) -> Result<Option<DeviceBinding>, RepositoryError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.original_transaction_id == otid && b.device_uuid == device)
                .cloned())
        }
        async fn insert(&self, binding: &DeviceBinding) -> Result<(), RepositoryError> {
            self.rows.lock().unwrap().push(binding.clone());
            Ok(())
        }
        async fn touch_last_active(&self, otid: &str, device: &str, now_ms: i64) -> Result<(), RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(b) = rows
                .iter_mut()
                .find(|b| b.original_transaction_id == otid && b.device_uuid == device)
            {
                b.last_active_time_ms = now_ms;
            }
            Ok(())
        }
        async fn delete(&self, otid: &str, device: &str) -> Result<(), RepositoryError> {
            self.rows
                .lock()
                .unwrap()
                .retain(|b| !(b.original_transaction_id == otid && b.device_uuid == device));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockPurchaseRecords {
        device_counts: Mutex<std::collections::HashMap<String, u32>>,
    }

    #[async_trait]
    impl PurchaseRecordRepository for MockPurchaseRecords {
        async fn get(&self, _otid: &str) -> Result<Option<PurchaseRecord>, RepositoryError> {
            Ok(None)
        }
        async fn insert(&self, _record: &PurchaseRecord) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn update(&self, _record: &PurchaseRecord) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn set_device_count(&self, otid: &str, count: u32) -> Result<(), RepositoryError> {
            self.device_counts.lock().unwrap().insert(otid.to_string(), count);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockUsers {
        users: Mutex<std::collections::HashMap<String, User>>,
    }

    #[async_trait]
    impl UserRepository for MockUsers {
        async fn get_by_device_uuid(&self, device_uuid: &str) -> Result<Option<User>, RepositoryError> {
            Ok(self.users.lock().unwrap().get(device_uuid).cloned())
        }
        async fn create(&self, device_uuid: &str) -> Result<User, RepositoryError> {
            let user = User {
                internal_id: 1,
                device_uuid: device_uuid.to_string(),
                original_transaction_id: None,
                is_vip: false,
                vip_expire_ms: None,
            };
            self.users.lock().unwrap().insert(device_uuid.to_string(), user.clone());
            Ok(user)
        }
        async fn update_vip_status(
            &self,
            device_uuid: &str,
            is_vip: bool,
            vip_expire_ms: Option<i64>,
            original_transaction_id: Option<&str>,
        ) -> Result<(), RepositoryError> {
            let mut users = self.users.lock().unwrap();
            let entry = users.entry(device_uuid.to_string()).or_insert_with(|| User {
                internal_id: 1,
                device_uuid: device_uuid.to_string(),
                original_transaction_id: None,
                is_vip: false,
                vip_expire_ms: None,
            });
            entry.is_vip = is_vip;
            entry.vip_expire_ms = vip_expire_ms;
            entry.original_transaction_id = original_transaction_id.map(str::to_string);
            Ok(())
        }
        async fn update_vip_status_by_original_transaction_id(
            &self,
            otid: &str,
            is_vip: bool,
            vip_expire_ms: Option<i64>,
        ) -> Result<(), RepositoryError> {
            for user in self.users.lock().unwrap().values_mut() {
                if user.original_transaction_id.as_deref() == Some(otid) {
                    user.is_vip = is_vip;
                    user.vip_expire_ms = vip_expire_ms;
                }
            }
            Ok(())
        }
    }

    fn binder() -> DeviceBinder {
        DeviceBinder::new(
            Arc::new(MockBindings::default()),
            Arc::new(MockPurchaseRecords::default()),
            Arc::new(MockUsers::default()),
        )
    }

    fn binder_with_users() -> (DeviceBinder, Arc<MockUsers>) {
        let users = Arc::new(MockUsers::default());
        let binder = DeviceBinder::new(
            Arc::new(MockBindings::default()),
            Arc::new(MockPurchaseRecords::default()),
            users.clone(),
        );
        (binder, users)
    }

    #[tokio::test]
    async fn binding_a_third_device_kicks_the_oldest() {
        let binder = binder();
        binder.bind("otid-1", "dev-a", None, 100).await.unwrap();
        binder.bind("otid-1", "dev-b", None, 200).await.unwrap();
        let outcome = binder.bind("otid-1", "dev-c", None, 300).await.unwrap();
        assert_eq!(outcome.kicked_device.as_deref(), Some("dev-a"));
        assert!(outcome.bound_devices.contains(&"dev-b".to_string()));
        assert!(outcome.bound_devices.contains(&"dev-c".to_string()));
    }

    #[tokio::test]
    async fn binding_an_already_bound_device_only_touches_activity() {
        let binder = binder();
        binder.bind("otid-1", "dev-a", None, 100).await.unwrap();
        let outcome = binder.bind("otid-1", "dev-a", None, 200).await.unwrap();
        assert_eq!(outcome.kicked_device, None);
        assert_eq!(outcome.bound_devices, vec!["dev-a".to_string()]);
    }

    #[tokio::test]
    async fn kicking_a_device_preserves_the_surviving_devices_real_expiry() {
        let (binder, users) = binder_with_users();
        binder.bind("otid-1", "dev-a", None, 100).await.unwrap();
        binder.bind("otid-1", "dev-b", None, 200).await.unwrap();
        users
            .update_vip_status("dev-b", true, Some(123_456), Some("otid-1"))
            .await
            .unwrap();

        let outcome = binder.bind("otid-1", "dev-c", None, 300).await.unwrap();
        assert_eq!(outcome.kicked_device.as_deref(), Some("dev-a"));

        let survivor = users.get_by_device_uuid("dev-b").await.unwrap().unwrap();
        assert_eq!(survivor.vip_expire_ms, Some(123_456));
        assert!(survivor.is_vip);

        let kicked = users.get_by_device_uuid("dev-a").await.unwrap().unwrap();
        assert!(!kicked.is_vip);
        assert_eq!(kicked.original_transaction_id, None);
    }

    #[tokio::test]
    async fn unbind_rejects_self_target() {
        let binder = binder();
        binder.bind("otid-1", "dev-a", None, 100).await.unwrap();
        let err = binder.unbind("dev-a", "dev-a", "otid-1").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
