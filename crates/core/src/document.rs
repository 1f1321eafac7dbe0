use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::UserId;

/// Unique identifier of an uploaded document.
pub type DocumentId = Uuid;

/// One uploaded study file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub owner_id: UserId,
    /// Name under which the blob was stored (`<millis>-<random>.<ext>`).
    pub file_name: String,
    /// Name the user uploaded.
    pub original_name: String,
    /// Lower-cased extension with leading dot, e.g. `".pdf"`.
    pub file_type: String,
    pub file_size: u64,
    /// Blob store path (`<owner>/<file_name>`).
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,
    /// Full extracted text. Never a truncated preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        owner_id: UserId,
        file_name: String,
        original_name: String,
        file_type: String,
        file_size: u64,
        file_path: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            file_name,
            original_name,
            file_type,
            file_size,
            file_path,
            chapter_order: None,
            chapter_title: None,
            extracted_text: None,
            processed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stored text, if any non-blank text was extracted.
    pub fn usable_text(&self) -> Option<&str> {
        self.extracted_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Progress-polling view of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStatus {
    pub id: DocumentId,
    pub original_name: String,
    pub file_type: String,
    pub extracted_text: String,
    pub processed: bool,
}

impl From<&Document> for ExtractionStatus {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            original_name: doc.original_name.clone(),
            file_type: doc.file_type.clone(),
            extracted_text: doc.extracted_text.clone().unwrap_or_default(),
            processed: doc.processed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(
            Uuid::new_v4(),
            "1700000000000-abc123.txt".into(),
            "notes.txt".into(),
            ".txt".into(),
            12,
            "user/1700000000000-abc123.txt".into(),
        )
    }

    #[test]
    fn blank_text_is_not_usable() {
        let mut doc = sample();
        assert!(doc.usable_text().is_none());
        doc.extracted_text = Some("   \n".into());
        assert!(doc.usable_text().is_none());
        doc.extracted_text = Some("Energy".into());
        assert_eq!(doc.usable_text(), Some("Energy"));
    }

    #[test]
    fn serializes_camel_case_and_skips_missing_chapter() {
        let doc = sample();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["originalName"], "notes.txt");
        assert_eq!(json["processed"], false);
        assert!(json.get("chapterOrder").is_none());
    }

    #[test]
    fn status_defaults_text_to_empty() {
        let status = ExtractionStatus::from(&sample());
        assert_eq!(status.extracted_text, "");
        assert!(!status.processed);
    }
}
