use std::time::Duration;

use examly_study::{Library, Pipeline, VideoSearch};

/// Per-request size limits for `POST /api/upload`.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_bytes: usize,
}

impl UploadLimits {
    /// Body limit for a full multipart upload, with room for the framing.
    pub fn body_limit(&self) -> usize {
        self.max_files * self.max_file_bytes + 1024 * 1024
    }
}

pub struct AppState {
    pub library: Library,
    /// `None` when the AI provider could not be built.
    pub pipeline: Option<Pipeline>,
    /// Why `pipeline` is missing, reported to callers of AI endpoints.
    pub llm_unavailable: Option<String>,
    pub llm_provider: Option<String>,
    pub videos: VideoSearch,
    pub uploads: UploadLimits,
    pub signed_url_ttl: Duration,
    pub config_summary: serde_json::Value,
}
