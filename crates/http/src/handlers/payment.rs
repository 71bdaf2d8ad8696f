//! Verify-purchase and App Store Server Notification routes (spec.md §6,
//! §4.3.2, §4.3.3).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use entitlement::{VerifyPurchaseEvent, VerifyPurchaseRequest};
use serde::Deserialize;
use serde_json::json;

use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EventTypeDto {
    Purchase,
    Restore,
    Renew,
}

impl From<EventTypeDto> for VerifyPurchaseEvent {
    fn from(value: EventTypeDto) -> Self {
        match value {
            EventTypeDto::Purchase => Self::Purchase,
            EventTypeDto::Restore => Self::Restore,
            EventTypeDto::Renew => Self::Renew,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    jws_token: String,
    #[serde(default)]
    device_name: Option<String>,
    event_type: EventTypeDto,
}

pub async fn verify(
    State(state): State<AppState>,
    axum::Extension(device): axum::Extension<crate::auth::AuthenticatedDevice>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let now_ms = Utc::now().timestamp_millis();
    let request = VerifyPurchaseRequest {
        jws_token: &req.jws_token,
        device_uuid: &device.0,
        event_type: req.event_type.into(),
        device_name: req.device_name.as_deref(),
    };
    let result = state.entitlement.verify_purchase(&request, now_ms).await?;
    Ok(Json(json!({
        "code": 0,
        "message": "success",
        "data": {
            "is_vip": result.is_vip,
            "vip_expire_time": result.vip_expire_time_ms,
            "bound_devices": result.bound_devices,
            "kicked_device": result.kicked_device,
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    #[serde(rename = "signedPayload")]
    signed_payload: String,
}

pub async fn notify(
    State(state): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let now_ms = Utc::now().timestamp_millis();
    let result = state.entitlement.handle_notification(&req.signed_payload, now_ms).await?;
    Ok(Json(json!({
        "code": 0,
        "message": "success",
        "data": {
            "notification_type": result.notification_type,
            "is_vip": result.is_vip,
            "vip_expire_time": result.vip_expire_time_ms,
            "duplicate": result.duplicate,
        }
    })))
}
