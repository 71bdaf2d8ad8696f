//! Device management routes (spec.md §6, §4.3.4): list/unbind devices for
//! the calling device's subscription.

use axum::extract::{Path, State};
use axum::Extension;
use axum::Json;
use bilingo_core::CoreError;
use serde_json::json;

use crate::auth::AuthenticatedDevice;
use crate::error::HttpError;
use crate::state::AppState;

pub async fn list_devices(
    State(state): State<AppState>,
    Extension(device): Extension<AuthenticatedDevice>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let user = state
        .users
        .get_by_device_uuid(&device.0)
        .await
        .map_err(CoreError::from)?
        .ok_or_else(|| HttpError::NotFound("device not registered".to_string()))?;

    let Some(original_transaction_id) = user.original_transaction_id else {
        return Ok(Json(json!({"code": 0, "message": "success", "data": {"devices": []}})));
    };

    let bindings = state.device_bindings.list_for(&original_transaction_id).await.map_err(CoreError::from)?;
    let devices: Vec<_> = bindings
        .into_iter()
        .map(|b| {
            json!({
                "device_uuid": b.device_uuid,
                "device_name": b.device_name,
                "bind_time": b.bind_time_ms,
                "last_active_time": b.last_active_time_ms,
                "is_current": b.device_uuid == device.0,
            })
        })
        .collect();

    Ok(Json(json!({"code": 0, "message": "success", "data": {"devices": devices}})))
}

pub async fn delete_device(
    State(state): State<AppState>,
    Extension(device): Extension<AuthenticatedDevice>,
    Path(target): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let user = state
        .users
        .get_by_device_uuid(&device.0)
        .await
        .map_err(CoreError::from)?
        .ok_or_else(|| HttpError::NotFound("device not registered".to_string()))?;

    let original_transaction_id = user
        .original_transaction_id
        .ok_or_else(|| HttpError::Validation("device has no active subscription".to_string()))?;

    state.device_binder.unbind(&device.0, &target, &original_transaction_id).await?;

    Ok(Json(json!({"code": 0, "message": "device removed"})))
}
