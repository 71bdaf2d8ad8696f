//! Typed configuration, loaded the way the teacher's CLI loads it:
//! `dotenvy` for local `.env` files layered under the real process
//! environment, then manual field-by-field reads into a plain struct
//! (`SPEC_FULL.md` §6.3) rather than a config-file crate.

use std::path::PathBuf;

use anyhow::{Context, Result};

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required environment variable {key}"))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// All configuration the composition root needs, read once at startup and
/// handed down as `Arc<Settings>`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub http_bind_addr: String,

    pub jwt_secret: String,
    pub internal_token: String,

    pub object_store_put_base_url: String,
    pub cdn_base_url: String,
    pub cdn_auth_key: String,

    pub llm_endpoint: String,
    pub llm_api_key: String,
    pub llm_model: String,

    pub asr_endpoint: String,
    pub asr_model_id: String,

    pub feed_endpoint: String,

    pub apple_bundle_id: String,
    pub apple_app_apple_id: Option<String>,
    pub apple_root_ca_path: Option<PathBuf>,
    pub require_trust: bool,

    pub download_dir: PathBuf,
    pub segments_dir: PathBuf,
    pub resume_state_dir: PathBuf,
    pub ingest_concurrency: usize,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Ok(Self {
            database_path: PathBuf::from(env_var_or("DATABASE_PATH", "./data/bilingo.db")),
            http_bind_addr: env_var_or("HTTP_BIND_ADDR", "0.0.0.0:8080"),

            jwt_secret: env_var("JWT_SECRET")?,
            internal_token: env_var("INTERNAL_TOKEN")?,

            object_store_put_base_url: env_var("OBJECT_STORE_PUT_BASE_URL")?,
            cdn_base_url: env_var("CDN_BASE_URL")?,
            cdn_auth_key: env_var("CDN_AUTH_KEY")?,

            llm_endpoint: env_var("LLM_ENDPOINT")?,
            llm_api_key: env_var_or("LLM_API_KEY", ""),
            llm_model: env_var_or("LLM_MODEL", "gpt-4o-mini"),

            asr_endpoint: env_var("ASR_ENDPOINT")?,
            asr_model_id: env_var_or("ASR_MODEL_ID", "whisper-large-v3"),

            feed_endpoint: env_var("FEED_ENDPOINT")?,

            apple_bundle_id: env_var("APPLE_BUNDLE_ID")?,
            apple_app_apple_id: std::env::var("APPLE_APP_APPLE_ID").ok(),
            apple_root_ca_path: std::env::var("APPLE_ROOT_CA_PATH").ok().map(PathBuf::from),
            require_trust: env_var_or("REQUIRE_TRUST", "true") == "true",

            download_dir: PathBuf::from(env_var_or("INGEST_DOWNLOAD_DIR", "./data/downloads")),
            segments_dir: PathBuf::from(env_var_or("INGEST_SEGMENTS_DIR", "./data/segments")),
            resume_state_dir: PathBuf::from(env_var_or("INGEST_STATE_DIR", "./data/state")),
            ingest_concurrency: env_var_or("INGEST_CONCURRENCY", "3")
                .parse()
                .context("INGEST_CONCURRENCY must be a positive integer")?,
        })
    }
}
