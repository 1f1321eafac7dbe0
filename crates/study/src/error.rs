//! Failure taxonomy for ingestion runs and material operations.

use examly_ingest::ExtractionError;
use examly_llm::{FailureClass, LlmError};
use examly_storage::StorageError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("No text could be extracted from the uploaded documents")]
    EmptyExtraction,

    #[error("AI service is not configured: {0}")]
    ConfigurationError(String),

    #[error("AI service rate limit reached, try again later: {0}")]
    RateLimited(String),

    #[error("AI service returned an empty response")]
    EmptyAIResponse,

    #[error("AI response was not valid JSON: {preview}")]
    AIResponseNotJSON { preview: String },

    #[error("AI processing failed: {0}")]
    AIProcessingFailed(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("storage error: {0}")]
    Store(String),

    #[error("processing did not finish within {0} seconds")]
    Timeout(u64),
}

/// Who can act on a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad upload or request; fix the input.
    Input,
    /// Missing credential; an operator has to act.
    Configuration,
    /// Retrying later may succeed.
    Transient,
    /// Missing record or insufficient rights.
    Access,
    Internal,
}

impl StudyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StudyError::UnsupportedFileType(_)
            | StudyError::EmptyExtraction
            | StudyError::BadRequest(_) => ErrorKind::Input,
            StudyError::ConfigurationError(_) => ErrorKind::Configuration,
            StudyError::RateLimited(_)
            | StudyError::EmptyAIResponse
            | StudyError::AIResponseNotJSON { .. }
            | StudyError::AIProcessingFailed(_)
            | StudyError::Timeout(_) => ErrorKind::Transient,
            StudyError::NotFound(_) | StudyError::Unauthorized(_) => ErrorKind::Access,
            StudyError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<LlmError> for StudyError {
    fn from(e: LlmError) -> Self {
        match e.classify() {
            FailureClass::Configuration => StudyError::ConfigurationError(e.to_string()),
            FailureClass::RateLimited => StudyError::RateLimited(e.to_string()),
            FailureClass::Other => StudyError::AIProcessingFailed(e.to_string()),
        }
    }
}

impl From<ExtractionError> for StudyError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::UnsupportedFileType(ext) => StudyError::UnsupportedFileType(ext),
            ExtractionError::EmptyExtraction => StudyError::EmptyExtraction,
            other => StudyError::BadRequest(other.to_string()),
        }
    }
}

impl From<StorageError> for StudyError {
    fn from(e: StorageError) -> Self {
        if e.is_not_found() {
            StudyError::NotFound("File".into())
        } else {
            StudyError::Store(e.to_string())
        }
    }
}

impl From<StoreError> for StudyError {
    fn from(e: StoreError) -> Self {
        StudyError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_failures_are_classified() {
        let e: StudyError = LlmError::NotConfigured("GEMINI_API_KEY".into()).into();
        assert!(matches!(e, StudyError::ConfigurationError(_)));
        assert_eq!(e.kind(), ErrorKind::Configuration);

        let e: StudyError = LlmError::ApiError { status: 429, body: "slow down".into() }.into();
        assert!(matches!(e, StudyError::RateLimited(_)));

        let e: StudyError = LlmError::ApiError { status: 500, body: "boom".into() }.into();
        assert!(matches!(e, StudyError::AIProcessingFailed(ref m) if m.contains("boom")));
        assert_eq!(e.kind(), ErrorKind::Transient);
    }

    #[test]
    fn extraction_failures_are_input_errors() {
        let e: StudyError = ExtractionError::UnsupportedFileType(".xyz".into()).into();
        assert_eq!(e.kind(), ErrorKind::Input);
        let e: StudyError = ExtractionError::EmptyExtraction.into();
        assert!(matches!(e, StudyError::EmptyExtraction));
    }

    #[test]
    fn access_errors() {
        assert_eq!(StudyError::NotFound("Material".into()).kind(), ErrorKind::Access);
        assert_eq!(StudyError::Unauthorized("nope".into()).kind(), ErrorKind::Access);
        assert_eq!(StudyError::Store("db".into()).kind(), ErrorKind::Internal);
    }
}
