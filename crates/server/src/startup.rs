//! Server startup: build every service once and wire them into `AppState`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use examly_core::Config;
use examly_llm::{create_provider, LlmClient};
use examly_notify::Notifier;
use examly_storage::BlobStore;
use examly_study::{Library, MaterialStore, MemoryStore, PgStore, Pipeline, VideoSearch};

use crate::state::{AppState, UploadLimits};

/// PostgreSQL when configured and reachable, otherwise an in-memory store.
async fn open_store(config: &Config) -> Arc<dyn MaterialStore> {
    if !config.postgres.is_configured() {
        warn!("PostgreSQL not configured; materials are kept in memory only");
        return Arc::new(MemoryStore::new());
    }
    match PgStore::connect(&config.postgres).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Failed to open PostgreSQL store: {}; falling back to memory", e);
            Arc::new(MemoryStore::new())
        }
    }
}

pub async fn build_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = open_store(config).await;

    let blobs = Arc::new(BlobStore::from_config(config)?);
    info!(remote = blobs.is_remote(), "Blob store ready");

    let notifier = Arc::new(Notifier::from_config(&config.smtp)?);

    // LLM init is config-based and fast; a missing key leaves AI endpoints disabled.
    let timeout = Duration::from_secs(config.server.request_timeout_secs);
    let (pipeline, llm_unavailable, llm_provider) = match create_provider(&config.llm, &config.ollama) {
        Ok(provider) => {
            let llm = LlmClient::from_config(provider, &config.llm);
            info!("LLM provider ready (provider: {})", llm.provider_name());
            let name = llm.provider_name().to_string();
            (Some(Pipeline::new(llm, store.clone(), blobs.clone(), timeout)), None, Some(name))
        }
        Err(e) => {
            warn!("LLM provider not available: {}; POST /api/process will be disabled", e);
            (None, Some(e.to_string()), None)
        }
    };

    Ok(Arc::new(AppState {
        library: Library::new(store, blobs, notifier),
        pipeline,
        llm_unavailable,
        llm_provider,
        videos: VideoSearch::from_config(&config.youtube),
        uploads: UploadLimits {
            max_files: config.server.max_files_per_upload as usize,
            max_file_bytes: config.server.max_upload_bytes(),
        },
        signed_url_ttl: Duration::from_secs(config.aws.signed_url_ttl_secs),
        config_summary: config.redacted_summary(),
    }))
}
