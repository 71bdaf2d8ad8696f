//! Register/login (spec.md §6, §4.3.4), grounded on
//! `original_source/server/api/auth_api.py`'s `register_or_login_handler`.

use axum::extract::State;
use axum::Json;
use bilingo_core::CoreError;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::create_access_token;
use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    device_uuid: String,
    #[serde(default)]
    #[allow(dead_code)]
    device_name: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    app_version: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let now_ms = Utc::now().timestamp_millis();
    let access_token = create_access_token(&state.jwt_secret, &req.device_uuid);

    let existing = state.users.get_by_device_uuid(&req.device_uuid).await.map_err(CoreError::from)?;

    let (user_id, mut is_vip, mut vip_expire_time, mut device_status, original_transaction_id) = match existing {
        Some(user) => (user.internal_id, user.is_vip, user.vip_expire_ms, "active".to_string(), user.original_transaction_id),
        None => {
            let user = state.users.create(&req.device_uuid).await.map_err(CoreError::from)?;
            return Ok(Json(json!({
                "code": 0,
                "message": "success",
                "data": {
                    "user_id": user.internal_id,
                    "is_vip": false,
                    "vip_expire_time": serde_json::Value::Null,
                    "device_status": "active",
                    "access_token": access_token,
                }
            })));
        }
    };

    if let Some(otid) = &original_transaction_id {
        let kicked = state
            .device_binder
            .check_login_consistency(&req.device_uuid, otid)
            .await?;
        if kicked {
            is_vip = false;
            device_status = "kicked".to_string();
        }
    }

    if is_vip {
        if let Some(expire_ms) = vip_expire_time {
            if expire_ms < now_ms {
                state.users.update_vip_status(&req.device_uuid, false, None, original_transaction_id.as_deref()).await.map_err(CoreError::from)?;
                is_vip = false;
                vip_expire_time = None;
            }
        }
    }

    Ok(Json(json!({
        "code": 0,
        "message": "success",
        "data": {
            "user_id": user_id,
            "is_vip": is_vip,
            "vip_expire_time": vip_expire_time,
            "device_status": device_status,
            "access_token": access_token,
        }
    })))
}
