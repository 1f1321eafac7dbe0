//! Title resolution for materials and single-file chapters.
//!
//! Both are best-effort chains: an AI suggestion first, then deterministic
//! strategies over file names and text, ending in a total fallback.

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use examly_core::filename::common_name_prefix;
use examly_core::humanize_filename;
use examly_ingest::{highlight, Category};
use examly_llm::LlmClient;

/// Preview length sent when asking for a material title.
const MATERIAL_PREVIEW_CHARS: usize = 500;
/// Previews this short are not worth an AI call.
const MIN_PREVIEW_FOR_AI: usize = 100;
/// Preview length sent when asking for a chapter title.
const CHAPTER_PREVIEW_CHARS: usize = 3000;

static CHAPTER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*((?:chapter|chapitre|unit|lesson|part)\s+[0-9IVXLC]+\s*[:.\-]\s*\S.*)$")
        .expect("chapter line pattern")
});

/// Strip wrapping quotes and fold the reply onto one line. Accepted only if
/// the result is longer than 3 and shorter than `max_len` characters.
pub fn clean_title(raw: &str, max_len: usize) -> Option<String> {
    let unquoted = raw
        .trim()
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\'']);
    let title = unquoted.split_whitespace().collect::<Vec<_>>().join(" ");
    let len = title.chars().count();
    (len > 3 && len < max_len).then_some(title)
}

fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ── Material titles ──────────────────────────────────────────────

type NameStrategy = fn(&[String]) -> Option<String>;

fn single_file_name(file_names: &[String]) -> Option<String> {
    match file_names {
        [only] => Some(humanize_filename(only)).filter(|n| !n.is_empty()),
        _ => None,
    }
}

fn shared_prefix(file_names: &[String]) -> Option<String> {
    if file_names.len() < 2 {
        return None;
    }
    Some(common_name_prefix(file_names)).filter(|p| p.chars().count() > 3)
}

const NAME_STRATEGIES: &[(&str, NameStrategy)] = &[
    ("single_file", single_file_name),
    ("common_prefix", shared_prefix),
];

fn dated_title() -> String {
    format!("Study Material - {}", Local::now().format("%Y-%m-%d"))
}

/// Picks a title for a new material when the caller did not supply one.
#[derive(Debug, Clone)]
pub struct TitleResolver {
    llm: LlmClient,
}

impl TitleResolver {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Explicit title, AI suggestion, file-name strategies, then a dated
    /// default. Never fails.
    pub async fn material_title(&self, explicit: Option<&str>, file_names: &[String], preview: &str) -> String {
        if let Some(title) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return title.to_string();
        }

        if preview.chars().count() > MIN_PREVIEW_FOR_AI {
            if let Some(title) = self.suggest_material_title(file_names, preview).await {
                return title;
            }
        }

        for (name, strategy) in NAME_STRATEGIES {
            if let Some(title) = strategy(file_names) {
                debug!(strategy = name, %title, "material title from file names");
                return title;
            }
        }
        dated_title()
    }

    async fn suggest_material_title(&self, file_names: &[String], preview: &str) -> Option<String> {
        let prompt = format!(
            "Analyze these file names and a preview of the content, then suggest a concise, descriptive title for this study material.\n\n\
             File names: {}\n\n\
             Content preview: {}\n\n\
             Return ONLY a title (3-8 words maximum), no explanations, no quotes, just the title.",
            file_names.join(", "),
            head(preview, MATERIAL_PREVIEW_CHARS),
        );
        match self.llm.generate(&prompt).await {
            Ok(reply) => clean_title(&reply, 100),
            Err(e) => {
                warn!(error = %e, "material title suggestion failed");
                None
            }
        }
    }

    /// Title for the only chapter of a single-file material: AI, a
    /// "Chapter N: ..." line, the first heading, the file name, then
    /// "Untitled Chapter".
    pub async fn chapter_title(&self, text: &str, file_name: &str) -> String {
        if let Some(title) = self.suggest_chapter_title(text, file_name).await {
            return title;
        }
        fallback_chapter_title(text, file_name)
    }

    async fn suggest_chapter_title(&self, text: &str, file_name: &str) -> Option<String> {
        let prompt = format!(
            "Extract the chapter title from this study material. Look for:\n\
             - Chapter headings (Chapter 1, Chapter 2, etc.)\n\
             - Title pages\n\
             - Main headings at the beginning\n\
             - File name hints: {file_name}\n\n\
             CONTENT PREVIEW:\n{}\n\n\
             Return ONLY the chapter title (3-10 words maximum), no explanations, no quotes, just the title. \
             If no clear title is found, suggest a descriptive title based on the content.",
            head(text, CHAPTER_PREVIEW_CHARS),
        );
        match self.llm.generate(&prompt).await {
            Ok(reply) => clean_title(&reply, 150),
            Err(e) => {
                warn!(file = file_name, error = %e, "chapter title suggestion failed");
                None
            }
        }
    }
}

type TextStrategy = fn(&str, &str) -> Option<String>;

fn chapter_line(text: &str, _file_name: &str) -> Option<String> {
    CHAPTER_LINE
        .captures(head(text, CHAPTER_PREVIEW_CHARS))
        .and_then(|c| clean_title(&c[1], 150))
}

fn first_heading(text: &str, _file_name: &str) -> Option<String> {
    let preview = head(text, CHAPTER_PREVIEW_CHARS);
    highlight(preview)
        .into_iter()
        .find(|span| span.category == Category::Heading)
        .and_then(|span| clean_title(&preview[span.start..span.end], 150))
}

fn file_name_title(_text: &str, file_name: &str) -> Option<String> {
    Some(humanize_filename(file_name)).filter(|t| !t.is_empty())
}

const CHAPTER_STRATEGIES: &[TextStrategy] = &[chapter_line, first_heading, file_name_title];

/// Deterministic part of the chapter title chain.
pub fn fallback_chapter_title(text: &str, file_name: &str) -> String {
    CHAPTER_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(text, file_name))
        .unwrap_or_else(|| "Untitled Chapter".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use examly_llm::testing::ScriptedProvider;
    use std::sync::Arc;

    fn resolver(provider: ScriptedProvider) -> TitleResolver {
        TitleResolver::new(LlmClient::new(Arc::new(provider), 0.7, 256))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_title_strips_quotes_and_newlines() {
        assert_eq!(clean_title("\"Laws of\nThermodynamics\"\n", 100).as_deref(), Some("Laws of Thermodynamics"));
        assert_eq!(clean_title("abc", 100), None);
        assert_eq!(clean_title(&"x".repeat(100), 100), None);
    }

    #[tokio::test]
    async fn explicit_title_wins() {
        let r = resolver(ScriptedProvider::new().reply("suggest", "Ignored Title"));
        let title = r.material_title(Some("  My Notes "), &names(&["a.pdf"]), &"x".repeat(200)).await;
        assert_eq!(title, "My Notes");
    }

    #[tokio::test]
    async fn ai_suggestion_used_for_long_previews() {
        let r = resolver(ScriptedProvider::new().reply("suggest a concise", "'Intro to Heat'"));
        let title = r.material_title(None, &names(&["a.pdf"]), &"x".repeat(200)).await;
        assert_eq!(title, "Intro to Heat");
    }

    #[tokio::test]
    async fn short_preview_skips_ai() {
        let provider = Arc::new(ScriptedProvider::new().reply("suggest a concise", "Never Used"));
        let r = TitleResolver::new(LlmClient::new(provider.clone(), 0.7, 256));
        let title = r.material_title(None, &names(&["heat_transfer-notes.pdf"]), "short").await;
        assert_eq!(title, "heat transfer notes");
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_common_prefix_then_dated_title() {
        let r = resolver(ScriptedProvider::new());
        let preview = "x".repeat(200);

        let title = r
            .material_title(None, &names(&["Physics_Ch1.pdf", "Physics_Ch2.pdf"]), &preview)
            .await;
        assert_eq!(title, "Physics Ch");

        let title = r.material_title(None, &names(&["alpha.pdf", "beta.pdf"]), &preview).await;
        assert!(title.starts_with("Study Material - "), "got {title}");
    }

    #[test]
    fn chapter_fallback_chain() {
        let text = "Chapter 1: Thermodynamics\n\nEnergy cannot be created or destroyed.";
        assert_eq!(fallback_chapter_title(text, "notes.txt"), "Chapter 1: Thermodynamics");

        let text = "INTRODUCTION TO OPTICS\nLight travels in straight lines.";
        assert_eq!(fallback_chapter_title(text, "notes.txt"), "INTRODUCTION TO OPTICS");

        assert_eq!(fallback_chapter_title("plain words here", "wave_optics.pdf"), "wave optics");
        assert_eq!(fallback_chapter_title("plain", "___.txt"), "Untitled Chapter");
    }

    #[tokio::test]
    async fn chapter_title_prefers_ai() {
        let r = resolver(ScriptedProvider::new().reply("Extract the chapter title", "The First Law"));
        assert_eq!(r.chapter_title("Energy...", "a.txt").await, "The First Law");

        let r = resolver(ScriptedProvider::new().fail("Extract the chapter title", 500, "down"));
        assert_eq!(
            r.chapter_title("Chapter 2: Entropy\nDisorder grows.", "a.txt").await,
            "Chapter 2: Entropy"
        );
    }
}
