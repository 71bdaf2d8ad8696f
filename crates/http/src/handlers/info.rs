//! Catalogue routes (spec.md §6, §4.4): channels/dates/podcasts/paged/
//! detail/check/upload.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use bilingo_core::{CoreError, PublishedPodcast};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthenticatedDevice;
use crate::error::{ok_envelope, HttpError};
use crate::state::AppState;

pub async fn channels(State(state): State<AppState>) -> Result<Json<serde_json::Value>, HttpError> {
    let rows = state.catalogue.list_channels().await?;
    let channels: Vec<_> = rows
        .into_iter()
        .map(|(company, channel)| json!({"company": company, "channel": channel}))
        .collect();
    Ok(ok_envelope(json!({"count": channels.len(), "channels": channels})))
}

pub async fn dates(
    State(state): State<AppState>,
    Path((company, channel)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let timestamps = state.catalogue.list_dates(&company, &channel).await?;
    Ok(ok_envelope(json!({"timestamps": timestamps})))
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    timestamp: i64,
}

pub async fn podcasts_by_day(
    State(state): State<AppState>,
    Path((company, channel)): Path<(String, String)>,
    Query(query): Query<DayQuery>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let podcasts = state.catalogue.list_by_day(&company, &channel, query.timestamp).await?;
    Ok(ok_envelope(json!({"podcasts": podcasts})))
}

#[derive(Debug, Deserialize)]
pub struct PagedQuery {
    page: u32,
    limit: u32,
}

pub async fn podcasts_paged(
    State(state): State<AppState>,
    Path((company, channel)): Path<(String, String)>,
    Query(query): Query<PagedQuery>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let (podcasts, total) = state.catalogue.list_paged(&company, &channel, query.page, query.limit).await?;
    let total_pages = total.div_ceil(u64::from(query.limit));
    Ok(ok_envelope(json!({"total": total, "total_pages": total_pages, "podcasts": podcasts})))
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    expires: u32,
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(device): Extension<AuthenticatedDevice>,
    Path(id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let detail = state.catalogue.detail(&id, query.expires).await?;
    if !detail.is_free {
        let user = state
            .users
            .get_by_device_uuid(&device.0)
            .await
            .map_err(CoreError::from)?
            .ok_or_else(|| HttpError::Forbidden("no subscription on this device".to_string()))?;
        let now_ms = Utc::now().timestamp_millis();
        let entitled = user.is_vip && user.vip_expire_ms.is_some_and(|expire_ms| expire_ms > now_ms);
        if !entitled {
            return Err(HttpError::Forbidden("VIP subscription required".to_string()));
        }
    }
    Ok(ok_envelope(json!({"podcast": detail})))
}

pub async fn check(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let exists = state.catalogue.exists(&id).await?;
    Ok(ok_envelope(json!({"exists": exists, "is_complete": exists})))
}

/// Ingestion-admin publish route. Accepts an already-fully-processed
/// episode row and upserts it into the Catalogue Store directly — the
/// same write path the ingestion orchestrator itself uses in-process, kept
/// as a standalone HTTP route for external tooling.
pub async fn upload(
    State(state): State<AppState>,
    Json(podcast): Json<PublishedPodcast>,
) -> Result<Json<serde_json::Value>, HttpError> {
    state.podcasts.upsert(&podcast).await.map_err(CoreError::from)?;
    Ok(ok_envelope(json!({"id": podcast.id})))
}

pub async fn upload_batch(
    State(state): State<AppState>,
    Json(podcasts): Json<Vec<PublishedPodcast>>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let mut count = 0usize;
    for podcast in &podcasts {
        state.podcasts.upsert(podcast).await.map_err(CoreError::from)?;
        count += 1;
    }
    Ok(ok_envelope(json!({"counts": count})))
}
