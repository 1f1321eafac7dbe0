//! Reading order and titles for the documents of one ingestion run.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{info, warn};

use examly_core::humanize_filename;
use examly_llm::json::extract_array;
use examly_llm::LlmClient;

use crate::title::TitleResolver;

/// Characters of each file shown to the model when ordering a batch.
const ORDER_PREVIEW_CHARS: usize = 2000;
/// Characters kept as a chapter's short description on fallback.
const CONTENT_PREVIEW_CHARS: usize = 200;

/// Where one input file lands in the material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterInfo {
    /// 1-based reading position.
    pub order: u32,
    pub title: String,
    pub content: String,
    /// Position of the source file in the input.
    pub file_index: usize,
}

fn head(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn fallback_title(file_name: &str, index: usize) -> String {
    let name = humanize_filename(file_name);
    if name.is_empty() {
        format!("Chapter {}", index + 1)
    } else {
        name
    }
}

/// Input order, titles from file names. Total.
pub fn fallback_sequence(texts: &[String], file_names: &[String]) -> Vec<ChapterInfo> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| ChapterInfo {
            order: i as u32 + 1,
            title: fallback_title(file_names.get(i).map_or("", String::as_str), i),
            content: head(text, CONTENT_PREVIEW_CHARS),
            file_index: i,
        })
        .collect()
}

/// Make a model-proposed ordering usable: every file exactly once, orders
/// dense from 1. Entries pointing at unknown or already-claimed files are
/// dropped; files the model skipped are appended in input order. Returns
/// `None` if no entry was usable.
pub fn normalize(proposed: &[Value], texts: &[String], file_names: &[String]) -> Option<Vec<ChapterInfo>> {
    let n = texts.len();
    let mut claimed = HashSet::new();
    // (proposed order, file index, title, content)
    let mut entries: Vec<(u64, usize, String, String)> = Vec::with_capacity(n);

    for (position, value) in proposed.iter().enumerate() {
        let Some(obj) = value.as_object() else { continue };
        let file_index = match obj.get("fileIndex") {
            None | Some(Value::Null) => position,
            Some(v) => match v.as_u64() {
                Some(i) => i as usize,
                None => continue,
            },
        };
        if file_index >= n || !claimed.insert(file_index) {
            continue;
        }

        let order = obj.get("order").and_then(Value::as_u64).unwrap_or(u64::MAX);
        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .unwrap_or_else(|| fallback_title(&file_names[file_index], file_index));
        let content = obj
            .get("content")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| head(&texts[file_index], CONTENT_PREVIEW_CHARS));
        entries.push((order, file_index, title, content));
    }

    if entries.is_empty() {
        return None;
    }

    for i in (0..n).filter(|i| !claimed.contains(i)) {
        entries.push((
            u64::MAX,
            i,
            fallback_title(&file_names[i], i),
            head(&texts[i], CONTENT_PREVIEW_CHARS),
        ));
    }

    entries.sort_by_key(|(order, file_index, _, _)| (*order, *file_index));
    Some(
        entries
            .into_iter()
            .enumerate()
            .map(|(rank, (_, file_index, title, content))| ChapterInfo {
                order: rank as u32 + 1,
                title,
                content,
                file_index,
            })
            .collect(),
    )
}

fn order_prompt(texts: &[String], file_names: &[String]) -> String {
    let files = texts
        .iter()
        .zip(file_names)
        .enumerate()
        .map(|(i, (text, name))| format!("---FILE {}: {}---\n{}", i + 1, name, head(text, ORDER_PREVIEW_CHARS)))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Analyze these study materials and determine their chapter order, titles, and organization. Each file represents a chapter.

FILES:
{files}

IMPORTANT:
- Extract the chapter title from each file's content (look for titles, headings, chapter numbers)
- Determine the correct order based on content analysis: explicit chapter markers first, then file name hints
- If order cannot be determined from content, use file order

Return a JSON array of chapters in order:
[
  {{
    "order": 1,
    "title": "Extracted chapter title from content or filename",
    "content": "Brief description of chapter content",
    "fileIndex": 0
  }}
]

Return ONLY valid JSON array."#
    )
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    llm: LlmClient,
    titles: TitleResolver,
}

impl Sequencer {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            titles: TitleResolver::new(llm.clone()),
            llm,
        }
    }

    /// One [`ChapterInfo`] per text, sorted by order. Never fails: AI
    /// errors and unusable replies fall back to input order.
    pub async fn sequence(&self, texts: &[String], file_names: &[String]) -> Vec<ChapterInfo> {
        match texts.len() {
            0 => Vec::new(),
            1 => {
                let name = file_names.first().map_or("", String::as_str);
                let title = self.titles.chapter_title(&texts[0], name).await;
                vec![ChapterInfo {
                    order: 1,
                    title,
                    content: head(&texts[0], CONTENT_PREVIEW_CHARS),
                    file_index: 0,
                }]
            }
            n => match self.order_batch(texts, file_names).await {
                Some(chapters) => {
                    info!(chapters = n, "chapter order detected");
                    chapters
                }
                None => fallback_sequence(texts, file_names),
            },
        }
    }

    async fn order_batch(&self, texts: &[String], file_names: &[String]) -> Option<Vec<ChapterInfo>> {
        let reply = match self.llm.generate(&order_prompt(texts, file_names)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "chapter ordering failed, using upload order");
                return None;
            }
        };
        let Some(proposed) = extract_array(&reply) else {
            warn!("chapter ordering reply had no JSON array, using upload order");
            return None;
        };
        normalize(&proposed, texts, file_names)
    }
}
