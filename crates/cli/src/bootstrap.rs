//! Composition root, grounded on the teacher's `gglib-cli/src/bootstrap.rs`
//! pattern: the only place infrastructure is wired together. Command
//! handlers receive the fully-composed context and delegate to it.

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use db::{setup_database, DbFactory};
use entitlement::{DeviceBinder, EntitlementProcessor, TrustAnchors};
use http_api::AppContext;
use ingest::{
    FeedClientConfig, HttpAsrAdapter, HttpFeedClient, HttpObjectStore, IngestionOrchestrator,
    ObjectStoreConfig,
};
use translate::{HttpLlmProvider, LlmProviderConfig};

use crate::settings::Settings;

/// Fully composed application context, handed to both the `serve` and
/// `ingest` commands.
pub struct CliContext {
    pub app_state: http_api::AppState,
    pub ingestion: Arc<IngestionOrchestrator>,
    pub http_bind_addr: String,
}

/// Parses a PEM bundle (one or more `-----BEGIN CERTIFICATE-----` blocks)
/// into raw DER certificates, the representation [`TrustAnchors`] expects.
fn parse_pem_bundle(pem: &str) -> Result<Vec<Vec<u8>>> {
    let mut roots = Vec::new();
    let mut current = String::new();
    let mut in_block = false;
    for line in pem.lines() {
        if line.starts_with("-----BEGIN CERTIFICATE-----") {
            in_block = true;
            current.clear();
            continue;
        }
        if line.starts_with("-----END CERTIFICATE-----") {
            in_block = false;
            let der = STANDARD.decode(current.as_bytes()).context("invalid base64 in Apple root CA bundle")?;
            roots.push(der);
            continue;
        }
        if in_block {
            current.push_str(line.trim());
        }
    }
    Ok(roots)
}

async fn load_trust_anchors(settings: &Settings) -> Result<TrustAnchors> {
    let Some(path) = &settings.apple_root_ca_path else {
        return Ok(TrustAnchors::default());
    };
    let pem = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading Apple root CA bundle from {}", path.display()))?;
    Ok(TrustAnchors::new(parse_pem_bundle(&pem)?))
}

pub async fn bootstrap(settings: &Settings) -> Result<CliContext> {
    tokio::fs::create_dir_all(&settings.download_dir).await.ok();
    tokio::fs::create_dir_all(&settings.segments_dir).await.ok();
    tokio::fs::create_dir_all(&settings.resume_state_dir).await.ok();

    let pool = setup_database(&settings.database_path).await.context("setting up sqlite database")?;

    let podcasts = DbFactory::podcast_repository(pool.clone());
    let users = DbFactory::user_repository(pool.clone());
    let purchase_records = DbFactory::purchase_record_repository(pool.clone());
    let device_bindings = DbFactory::device_binding_repository(pool.clone());
    let transaction_logs = DbFactory::transaction_log_repository(pool.clone());
    let notification_logs = DbFactory::notification_log_repository(pool.clone());
    let purchase_events = DbFactory::purchase_event_repository(pool.clone());

    let trust_anchors = load_trust_anchors(settings).await?;

    let entitlement = Arc::new(EntitlementProcessor::new(
        purchase_records.clone(),
        users.clone(),
        transaction_logs,
        notification_logs,
        purchase_events,
        DeviceBinder::new(device_bindings.clone(), purchase_records.clone(), users.clone()),
        trust_anchors.clone(),
        settings.require_trust,
        settings.apple_bundle_id.clone(),
        settings.apple_app_apple_id.clone(),
    ));

    let object_store: Arc<dyn bilingo_core::ObjectStorePort> = Arc::new(HttpObjectStore::new(ObjectStoreConfig {
        put_base_url: settings.object_store_put_base_url.clone(),
        cdn_base_url: settings.cdn_base_url.clone(),
        cdn_auth_key: settings.cdn_auth_key.clone(),
    }));

    let catalogue = Arc::new(bilingo_core::CatalogueService::new(podcasts.clone(), object_store.clone()));

    let app_state: http_api::AppState = Arc::new(AppContext {
        catalogue,
        entitlement,
        device_binder: DeviceBinder::new(device_bindings.clone(), purchase_records.clone(), users.clone()),
        users: users.clone(),
        device_bindings,
        podcasts: podcasts.clone(),
        jwt_secret: settings.jwt_secret.clone(),
        internal_token: settings.internal_token.clone(),
    });

    let llm_provider: Arc<dyn bilingo_core::LlmProviderPort> = Arc::new(HttpLlmProvider::new(LlmProviderConfig {
        endpoint: settings.llm_endpoint.clone(),
        api_key: settings.llm_api_key.clone(),
        model: settings.llm_model.clone(),
    }));
    let asr: Arc<dyn bilingo_core::AsrPort> = Arc::new(HttpAsrAdapter::new(ingest::AsrConfig {
        endpoint: settings.asr_endpoint.clone(),
        model_id: settings.asr_model_id.clone(),
    }));

    let feed: Arc<dyn ingest::FeedClientPort> =
        Arc::new(HttpFeedClient::new(FeedClientConfig { endpoint: settings.feed_endpoint.clone() }));

    let ingestion = Arc::new(IngestionOrchestrator::new(
        feed,
        asr,
        llm_provider,
        object_store,
        podcasts,
        settings.download_dir.clone(),
        settings.segments_dir.clone(),
    ));

    Ok(CliContext { app_state, ingestion, http_bind_addr: settings.http_bind_addr.clone() })
}
