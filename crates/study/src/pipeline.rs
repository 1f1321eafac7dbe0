//! Ingestion: uploaded documents in, one persisted [`Material`] out.
//!
//! A run resolves each document's text, orders the documents as chapters,
//! synthesizes one bundle over all text and one per chapter, then stores
//! the result. Chapter synthesis runs concurrently and degrades per chapter;
//! overall synthesis and persistence are all-or-nothing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Deserialize;
use tracing::{info, warn};

use examly_core::{Chapter, Document, DocumentId, Language, Material, UserId};
use examly_ingest::extract_file;
use examly_llm::LlmClient;
use examly_storage::BlobStore;

use crate::error::StudyError;
use crate::sequencer::{ChapterInfo, Sequencer};
use crate::store::MaterialStore;
use crate::synthesizer::{Features, Synthesizer};
use crate::title::TitleResolver;

/// Separates document texts in the overall synthesis input.
const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";
/// Characters of combined text used for title detection.
const TITLE_PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionRequest {
    pub document_ids: Vec<DocumentId>,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub output_language: Option<Language>,
}

pub struct Pipeline {
    store: Arc<dyn MaterialStore>,
    blobs: Arc<BlobStore>,
    sequencer: Sequencer,
    synthesizer: Synthesizer,
    titles: TitleResolver,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(llm: LlmClient, store: Arc<dyn MaterialStore>, blobs: Arc<BlobStore>, timeout: Duration) -> Self {
        Self {
            store,
            blobs,
            sequencer: Sequencer::new(llm.clone()),
            synthesizer: Synthesizer::new(llm.clone()),
            titles: TitleResolver::new(llm),
            timeout,
        }
    }

    /// Run one ingestion for `owner`. Nothing is stored unless every
    /// mandatory step succeeds within the configured timeout.
    pub async fn run(&self, owner: UserId, request: IngestionRequest) -> Result<Material, StudyError> {
        if request.document_ids.is_empty() {
            return Err(StudyError::BadRequest("No documents provided".into()));
        }
        let mut seen = HashSet::with_capacity(request.document_ids.len());
        if let Some(dup) = request.document_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(StudyError::BadRequest(format!("Document {dup} was submitted more than once")));
        }

        let mut documents = self.store.get_documents(&request.document_ids).await?;
        if documents.len() != request.document_ids.len() || documents.iter().any(|d| d.owner_id != owner) {
            return Err(StudyError::NotFound("Some documents".into()));
        }

        let (material, texts, chapters) = tokio::time::timeout(self.timeout, self.build(owner, &documents, &request))
            .await
            .map_err(|_| StudyError::Timeout(self.timeout.as_secs()))??;

        self.store.insert_material(&material).await?;
        info!(
            material_id = %material.id,
            documents = documents.len(),
            chapters = material.chapters.len(),
            "material created"
        );

        self.record_chapters(&mut documents, texts, &chapters).await;
        Ok(material)
    }

    async fn build(
        &self,
        owner: UserId,
        documents: &[Document],
        request: &IngestionRequest,
    ) -> Result<(Material, Vec<String>, Vec<ChapterInfo>), StudyError> {
        let language = request.output_language.unwrap_or_default();
        let texts = self.resolve_texts(documents).await;
        if texts.iter().all(|t| t.trim().is_empty()) {
            return Err(StudyError::EmptyExtraction);
        }

        let file_names: Vec<String> = documents.iter().map(|d| d.original_name.clone()).collect();
        let chapters = self.sequencer.sequence(&texts, &file_names).await;

        let combined = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);
        let preview: String = combined.chars().take(TITLE_PREVIEW_CHARS).collect();
        let title = self
            .titles
            .material_title(request.title.as_deref(), &file_names, &preview)
            .await;

        info!(chars = combined.len(), documents = documents.len(), %language, "synthesizing material");
        let overall = self
            .synthesizer
            .synthesize(&combined, &request.features, language)
            .await?;

        let mut enriched = join_all(chapters.iter().map(|info| {
            self.synthesize_chapter(info, &texts[info.file_index], documents[info.file_index].id, &request.features, language)
        }))
        .await;
        enriched.sort_by_key(|c| c.order);

        let material = Material::new(
            owner,
            title,
            request.document_ids.clone(),
            overall.content,
            language,
            enriched,
        );
        Ok((material, texts, chapters))
    }

    /// Stored text when present, otherwise extract from the blob store.
    /// A document whose text cannot be obtained contributes an empty string.
    async fn resolve_texts(&self, documents: &[Document]) -> Vec<String> {
        join_all(documents.iter().map(|doc| async move {
            if let Some(text) = doc.usable_text() {
                return text.to_string();
            }
            match self.extract_from_blob(doc).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(document = %doc.id, file = %doc.original_name, error = %e, "text extraction failed");
                    String::new()
                }
            }
        }))
        .await
    }

    async fn extract_from_blob(&self, doc: &Document) -> Result<String, StudyError> {
        let local = self.blobs.materialize(&doc.file_path).await?;
        // The temp file is removed when `local` drops, whatever the outcome.
        let extracted = tokio::task::spawn_blocking(move || extract_file(local.path()))
            .await
            .map_err(|e| StudyError::Store(format!("extraction task failed: {e}")))??;
        info!(document = %doc.id, chars = extracted.total_chars(), units = extracted.units, "extracted from blob");
        Ok(extracted.text)
    }

    async fn synthesize_chapter(
        &self,
        info: &ChapterInfo,
        text: &str,
        document_id: DocumentId,
        features: &Features,
        language: Language,
    ) -> Chapter {
        if text.trim().is_empty() {
            return Chapter::bare(info.order, info.title.clone(), document_id);
        }
        match self.synthesizer.synthesize(text, features, language).await {
            Ok(synthesis) => Chapter {
                order: info.order,
                title: info.title.clone(),
                document_id,
                content: synthesis.content,
                youtube_videos: Some(synthesis.youtube_videos),
            },
            Err(e) => {
                warn!(chapter = %info.title, order = info.order, error = %e, "chapter synthesis failed");
                Chapter::bare(info.order, info.title.clone(), document_id)
            }
        }
    }

    /// Write chapter placement, freshly extracted text and the processed
    /// flag back to each document. Failures are logged, never returned.
    async fn record_chapters(&self, documents: &mut [Document], texts: Vec<String>, chapters: &[ChapterInfo]) {
        for (doc, text) in documents.iter_mut().zip(texts) {
            if doc.usable_text().is_none() && !text.trim().is_empty() {
                doc.extracted_text = Some(text);
            }
        }
        for info in chapters {
            if let Some(doc) = documents.get_mut(info.file_index) {
                doc.chapter_order = Some(info.order);
                doc.chapter_title = Some(info.title.clone());
            }
        }
        for doc in documents.iter_mut() {
            doc.processed = true;
            if let Err(e) = self.store.update_document(doc).await {
                warn!(document = %doc.id, error = %e, "failed to update document after processing");
            }
        }
    }
}
