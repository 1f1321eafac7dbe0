//! One AI request per text, decoded into a [`StudyContent`] bundle.
//!
//! The prompt is composed from a table of fragments, one per enrichment
//! field. Only fragments whose feature flag is set are included, except
//! video suggestions which are always requested. The reply is decoded
//! leniently: malformed entries are dropped one by one instead of failing
//! the whole bundle.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use examly_core::{
    CorrectAnswer, Difficulty, ExamQuestion, Flashcard, Formula, Language, Mcq, QuestionType,
    StudyContent, StudyDay, StudyPlan, VideoSuggestion,
};
use examly_llm::json::{extract_object, preview};
use examly_llm::LlmClient;

use crate::error::StudyError;

/// Longest text sent to the model, in characters.
pub const MAX_TEXT_CHARS: usize = 2_000_000;

const TRUNCATION_NOTICE: &str = "\n\n[Content truncated due to length - analyzing first 2M characters...]";

// ── Feature flags ────────────────────────────────────────────────

/// Which enrichment fields the caller wants generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Features {
    pub summary: bool,
    pub key_points: bool,
    pub formulas: bool,
    pub exam_questions: bool,
    pub mcqs: bool,
    pub flashcards: bool,
    /// `true`, `false`/`null`, or `{ "difficulty": "hard" }`.
    #[serde(deserialize_with = "study_plan_flag", skip_serializing_if = "Option::is_none")]
    pub study_plan: Option<StudyPlanOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyPlanOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

fn study_plan_flag<'de, D: Deserializer<'de>>(de: D) -> Result<Option<StudyPlanOptions>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Enabled(bool),
        Options(StudyPlanOptions),
    }

    Ok(match Option::<Flag>::deserialize(de)? {
        Some(Flag::Enabled(true)) => Some(StudyPlanOptions::default()),
        Some(Flag::Options(opts)) => Some(opts),
        Some(Flag::Enabled(false)) | None => None,
    })
}

impl Features {
    pub fn all() -> Self {
        Self {
            summary: true,
            key_points: true,
            formulas: true,
            exam_questions: true,
            mcqs: true,
            flashcards: true,
            study_plan: Some(StudyPlanOptions::default()),
        }
    }
}

// ── Prompt ───────────────────────────────────────────────────────

/// One requested JSON key and the prompt text describing it.
struct Fragment {
    enabled: fn(&Features) -> bool,
    render: fn(&str, &Features) -> String,
}

const FRAGMENTS: &[Fragment] = &[
    Fragment {
        enabled: |f| f.summary,
        render: |lang, _| format!(
            r#"  "summary": "A concise and clear summary (1-2 paragraphs maximum, 3-5 sentences) in {lang} that explains what this chapter/material is about. Focus on the main topic and purpose. Keep it brief, clear, and to the point.",
"#
        ),
    },
    Fragment {
        enabled: |f| f.key_points,
        render: |lang, _| format!(
            r#"  "keyPoints": ["Really important key point 1 in {lang}", "Really important key point 2 in {lang}", ...],
NOTE: Focus on DEFINITIONS and really important key points. Include ALL important definitions from the chapter. Do not include minor details.
"#
        ),
    },
    Fragment {
        enabled: |f| f.formulas,
        render: |lang, _| format!(
            r#"  "formulas": [
    {{
      "formula": "Mathematical formula in LaTeX or text format",
      "description": "What this formula represents (in {lang})",
      "context": "Where/when to use this formula (in {lang})"
    }}
  ],
NOTE: Only include formulas if they actually exist in the material. If no formulas exist, return an empty array [].
"#
        ),
    },
    Fragment {
        enabled: |f| f.exam_questions,
        render: |lang, _| format!(
            r#"  "examQuestions": [
    {{
      "question": "Exam-simulated question in {lang}",
      "answer": "Very short and concise answer in {lang} (1 sentence maximum, 10-20 words)",
      "type": "short" | "long" | "essay"
    }}
  ],
NOTE: Generate at least 10 exam-simulated questions, and 15-20 for longer or more complex chapters.
"#
        ),
    },
    Fragment {
        enabled: |f| f.mcqs,
        render: |lang, _| format!(
            r#"  "mcqs": [
    {{
      "question": "Multiple choice question in {lang}",
      "options": ["Option A in {lang}", "Option B in {lang}", "Option C in {lang}", "Option D in {lang}"],
      "correctAnswer": 0,
      "explanation": "Why this answer is correct (in {lang})"
    }}
  ],
NOTE: Generate at least 15 MCQs, each with exactly 4 options. correctAnswer is a single number (0-3), or an array of numbers like [0, 2] only when several options are genuinely correct.
"#
        ),
    },
    Fragment {
        enabled: |f| f.flashcards,
        render: |lang, _| format!(
            r#"  "flashcards": [
    {{
      "front": "Question or term in {lang}",
      "back": "Answer or definition in {lang} with key information",
      "category": "Category name"
    }}
  ],
NOTE: Create flashcards for ALL important terms, concepts, definitions and key facts. Aim for 40-60 flashcards.
"#
        ),
    },
    Fragment {
        enabled: |_| true,
        render: |lang, _| format!(
            r#"  "youtubeVideos": [
    {{
      "title": "Suggested video title that would help students understand this topic",
      "description": "Brief description of what the video covers and why it's relevant",
      "searchQuery": "YouTube search query to find this video (in {lang})",
      "relevance": "Why this video is relevant to the chapter content"
    }}
  ],
NOTE: Suggest 8-15 videos covering the important concepts, definitions and formulas. The searchQuery should be in {lang} and specific enough to find relevant videos.
"#
        ),
    },
    Fragment {
        enabled: |f| f.study_plan.is_some(),
        render: |_, f| {
            let difficulty = f
                .study_plan
                .as_ref()
                .and_then(|p| p.difficulty.as_deref())
                .map(|d| format!("NOTE: Target difficulty: {d}.\n"))
                .unwrap_or_default();
            format!(
                r#"  "studyPlan": {{
    "schedule": [
      {{
        "date": "YYYY-MM-DD",
        "topics": ["Topic 1", "Topic 2"],
        "difficulty": "easy" | "medium" | "hard"
      }}
    ],
    "totalDays": 7
  }},
{difficulty}"#
            )
        },
    },
];

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => format!("{}{TRUNCATION_NOTICE}", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn build_prompt(text: &str, features: &Features, language: Language) -> String {
    let lang = language.display_name();
    let fields: String = FRAGMENTS
        .iter()
        .filter(|fragment| (fragment.enabled)(features))
        .map(|fragment| (fragment.render)(lang, features))
        .collect();

    format!(
        r#"You are an AI Study Assistant. Analyze the following study material THOROUGHLY and provide a comprehensive, DETAILED JSON response.

IMPORTANT:
- You MUST respond in {lang}. All summaries, key points, questions, and explanations must be in {lang}.
- Analyze the ENTIRE content - do not skip any important details

STUDY MATERIAL:
{text}

INSTRUCTIONS:
1. Read and analyze the ENTIRE content carefully - every paragraph, every section
2. Identify ALL chapters, sections, subsections, and their order
3. Extract ALL requested information with maximum detail
4. Return ONLY valid JSON, no markdown formatting or explanations outside JSON

REQUIRED JSON FORMAT:
{{
{fields}  "chapterInfo": {{
    "order": 1,
    "title": "Chapter title if detected",
    "content": "Brief description"
  }}
}}

IMPORTANT:
- Extract ALL formulas, even if written in different formats
- Study plan should be realistic and spread over available days
- Return ONLY the JSON object, no additional text"#
    )
}

// ── Result ───────────────────────────────────────────────────────

/// Chapter position and title the model detected in the text.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterHint {
    pub order: Option<u32>,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Synthesis {
    pub content: StudyContent,
    pub youtube_videos: Vec<VideoSuggestion>,
    pub chapter_info: Option<ChapterHint>,
}

// ── Synthesizer ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Synthesizer {
    llm: LlmClient,
}

impl Synthesizer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    pub async fn synthesize(
        &self,
        text: &str,
        features: &Features,
        language: Language,
    ) -> Result<Synthesis, StudyError> {
        let prompt = build_prompt(&truncate(text), features, language);
        debug!(chars = text.len(), prompt_chars = prompt.len(), %language, "requesting synthesis");

        let raw = self.llm.generate(&prompt).await?;
        if raw.trim().is_empty() {
            return Err(StudyError::EmptyAIResponse);
        }

        let value = extract_object(&raw).ok_or_else(|| StudyError::AIResponseNotJSON {
            preview: preview(&raw, 500),
        })?;
        let synthesis = decode(&value, features);
        info!(
            provider = self.llm.provider_name(),
            videos = synthesis.youtube_videos.len(),
            mcqs = synthesis.content.mcqs.as_ref().map_or(0, Vec::len),
            "synthesis decoded"
        );
        Ok(synthesis)
    }
}

// ── Decoding ─────────────────────────────────────────────────────

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn objects<'a>(root: &'a Value, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    root.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    let s = value?.as_str()?.trim();
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn question_type(obj: &Map<String, Value>) -> QuestionType {
    text(obj, "type")
        .and_then(|t| serde_json::from_value(Value::String(t.to_lowercase())).ok())
        .unwrap_or_default()
}

fn difficulty(obj: &Map<String, Value>) -> Difficulty {
    text(obj, "difficulty")
        .and_then(|d| serde_json::from_value(Value::String(d.to_lowercase())).ok())
        .unwrap_or_default()
}

fn decode_mcq(obj: &Map<String, Value>) -> Option<Mcq> {
    let question = text(obj, "question")?;
    let options = strings(obj.get("options"));
    let correct_answer = CorrectAnswer::from_json(obj.get("correctAnswer")?)?;
    if options.is_empty() || !correct_answer.fits(options.len()) {
        debug!(question = %question, "dropping MCQ with out-of-range answer");
        return None;
    }
    Some(Mcq {
        question,
        options,
        correct_answer,
        explanation: text(obj, "explanation"),
    })
}

fn decode_study_plan(value: &Value) -> Option<StudyPlan> {
    let plan = value.as_object()?;
    let schedule: Vec<StudyDay> = plan
        .get("schedule")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .filter_map(|day| {
            Some(StudyDay {
                date: parse_date(day.get("date"))?,
                topics: strings(day.get("topics")),
                difficulty: difficulty(day),
            })
        })
        .collect();
    let total_days = plan
        .get("totalDays")
        .and_then(Value::as_u64)
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(schedule.len() as u32);

    Some(StudyPlan {
        exam_date: parse_date(plan.get("examDate")),
        schedule,
        total_days,
    })
}

/// Turn the model's JSON into typed content, keeping only requested fields.
pub fn decode(root: &Value, features: &Features) -> Synthesis {
    let mut content = StudyContent::default();

    if features.summary {
        content.summary = root.as_object().and_then(|o| text(o, "summary"));
    }
    if features.key_points {
        content.key_points = root.get("keyPoints").map(|v| strings(Some(v)));
    }
    if features.formulas {
        content.formulas = root.get("formulas").map(|_| {
            objects(root, "formulas")
                .filter_map(|f| {
                    Some(Formula {
                        formula: text(f, "formula")?,
                        description: text(f, "description").unwrap_or_default(),
                        context: text(f, "context").unwrap_or_default(),
                    })
                })
                .collect()
        });
    }
    if features.exam_questions {
        content.exam_questions = root.get("examQuestions").map(|_| {
            objects(root, "examQuestions")
                .filter_map(|q| {
                    Some(ExamQuestion {
                        question: text(q, "question")?,
                        answer: text(q, "answer").unwrap_or_default(),
                        kind: question_type(q),
                    })
                })
                .collect()
        });
    }
    if features.mcqs {
        content.mcqs = root
            .get("mcqs")
            .map(|_| objects(root, "mcqs").filter_map(decode_mcq).collect());
    }
    if features.flashcards {
        content.flashcards = root.get("flashcards").map(|_| {
            objects(root, "flashcards")
                .filter_map(|card| {
                    Some(Flashcard {
                        front: text(card, "front")?,
                        back: text(card, "back")?,
                        category: text(card, "category"),
                    })
                })
                .collect()
        });
    }
    if features.study_plan.is_some() {
        content.study_plan = root.get("studyPlan").and_then(decode_study_plan);
    }

    let youtube_videos = objects(root, "youtubeVideos")
        .filter_map(|v| {
            let title = text(v, "title")?;
            Some(VideoSuggestion {
                search_query: text(v, "searchQuery").unwrap_or_else(|| title.clone()),
                title,
                description: text(v, "description").unwrap_or_default(),
                relevance: text(v, "relevance").unwrap_or_default(),
            })
        })
        .collect();

    let chapter_info = root.get("chapterInfo").and_then(Value::as_object).map(|info| ChapterHint {
        order: info
            .get("order")
            .and_then(Value::as_u64)
            .and_then(|o| u32::try_from(o).ok()),
        title: text(info, "title").unwrap_or_default(),
        content: text(info, "content").unwrap_or_default(),
    });

    Synthesis {
        content,
        youtube_videos,
        chapter_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examly_llm::testing::ScriptedProvider;
    use serde_json::json;
    use std::sync::Arc;

    fn synthesizer(provider: ScriptedProvider) -> (Synthesizer, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        (Synthesizer::new(LlmClient::new(provider.clone(), 0.7, 1024)), provider)
    }

    #[test]
    fn prompt_contains_only_requested_fields() {
        let features = Features {
            summary: true,
            mcqs: true,
            ..Features::default()
        };
        let prompt = build_prompt("Energy is conserved.", &features, Language::French);
        assert!(prompt.contains(r#""summary""#));
        assert!(prompt.contains(r#""mcqs""#));
        assert!(prompt.contains(r#""youtubeVideos""#));
        assert!(!prompt.contains(r#""flashcards""#));
        assert!(!prompt.contains(r#""studyPlan""#));
        assert!(prompt.contains("You MUST respond in French"));
        assert!(prompt.contains("Energy is conserved."));
    }

    #[test]
    fn videos_requested_with_no_flags() {
        let prompt = build_prompt("x", &Features::default(), Language::English);
        assert!(prompt.contains(r#""youtubeVideos""#));
        assert!(!prompt.contains(r#""summary""#));
    }

    #[test]
    fn study_plan_flag_accepts_bool_and_object() {
        let f: Features = serde_json::from_value(json!({ "studyPlan": true })).unwrap();
        assert!(f.study_plan.is_some());
        let f: Features = serde_json::from_value(json!({ "studyPlan": false })).unwrap();
        assert!(f.study_plan.is_none());
        let f: Features = serde_json::from_value(json!({ "studyPlan": { "difficulty": "hard" } })).unwrap();
        assert_eq!(f.study_plan.unwrap().difficulty.as_deref(), Some("hard"));
        let f: Features = serde_json::from_value(json!({ "keyPoints": true })).unwrap();
        assert!(f.key_points && !f.summary);
    }

    #[test]
    fn long_text_is_truncated_with_notice() {
        let text = "a".repeat(MAX_TEXT_CHARS + 10);
        let truncated = truncate(&text);
        assert!(truncated.ends_with(TRUNCATION_NOTICE));
        assert_eq!(truncated.len(), MAX_TEXT_CHARS + TRUNCATION_NOTICE.len());
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn mcqs_with_out_of_range_answers_are_dropped() {
        let reply = json!({
            "mcqs": [
                { "question": "Q1", "options": ["a", "b", "c", "d"], "correctAnswer": 2 },
                { "question": "Q2", "options": ["a", "b", "c", "d"], "correctAnswer": [0, 3] },
                { "question": "Q3", "options": ["a", "b", "c", "d"], "correctAnswer": 4 },
                { "question": "Q4", "options": ["a", "b"], "correctAnswer": [1, 2] },
                { "question": "Q5", "options": ["a", "b", "c", "d"], "correctAnswer": "1" },
                { "question": "Q6", "options": ["a", "b", "c", "d"] }
            ]
        });
        let features = Features { mcqs: true, ..Features::default() };
        let mcqs = decode(&reply, &features).content.mcqs.unwrap();

        let kept: Vec<&str> = mcqs.iter().map(|m| m.question.as_str()).collect();
        assert_eq!(kept, vec!["Q1", "Q2", "Q5"]);
        for mcq in &mcqs {
            assert!(mcq.correct_answer.indices().iter().all(|&i| i < mcq.options.len()));
        }
        assert_eq!(mcqs[1].correct_answer, CorrectAnswer::Multiple(vec![0, 3]));
    }

    #[test]
    fn unrequested_fields_are_ignored() {
        let reply = json!({
            "summary": "About energy",
            "flashcards": [{ "front": "E", "back": "Energy" }],
            "youtubeVideos": [{ "title": "Energy basics", "searchQuery": "energy basics" }]
        });
        let decoded = decode(&reply, &Features { summary: true, ..Features::default() });
        assert_eq!(decoded.content.summary.as_deref(), Some("About energy"));
        assert!(decoded.content.flashcards.is_none());
        assert_eq!(decoded.youtube_videos.len(), 1);
    }

    #[test]
    fn study_plan_dates_and_difficulty() {
        let reply = json!({
            "studyPlan": {
                "schedule": [
                    { "date": "2026-03-01T00:00:00Z", "topics": ["Heat"], "difficulty": "Hard" },
                    { "date": "not a date", "topics": ["Skipped"] },
                    { "date": "2026-03-02", "topics": ["Work"], "difficulty": "easy | medium" }
                ]
            }
        });
        let features = Features { study_plan: Some(StudyPlanOptions::default()), ..Features::default() };
        let plan = decode(&reply, &features).content.study_plan.unwrap();
        assert_eq!(plan.schedule.len(), 2);
        assert_eq!(plan.schedule[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(plan.schedule[0].difficulty, Difficulty::Hard);
        assert_eq!(plan.schedule[1].difficulty, Difficulty::Medium);
        assert_eq!(plan.total_days, 2);
    }

    #[test]
    fn exam_question_type_defaults_to_short() {
        let reply = json!({
            "examQuestions": [
                { "question": "Define work", "answer": "Force times distance", "type": "essay" },
                { "question": "Define heat", "answer": "Energy transfer", "type": "short | long" },
                { "answer": "orphan" }
            ]
        });
        let qs = decode(&reply, &Features { exam_questions: true, ..Features::default() })
            .content
            .exam_questions
            .unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].kind, QuestionType::Essay);
        assert_eq!(qs[1].kind, QuestionType::Short);
    }

    #[tokio::test]
    async fn synthesize_parses_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"summary\": \"Thermo\", \"youtubeVideos\": [], \"chapterInfo\": {\"order\": 1, \"title\": \"Thermodynamics\"}}\n```";
        let (synth, provider) = synthesizer(ScriptedProvider::new().reply("AI Study Assistant", reply));

        let out = synth
            .synthesize("Energy", &Features { summary: true, ..Features::default() }, Language::English)
            .await
            .unwrap();
        assert_eq!(out.content.summary.as_deref(), Some("Thermo"));
        assert!(out.youtube_videos.is_empty());
        assert_eq!(out.chapter_info.unwrap().title, "Thermodynamics");
        assert_eq!(provider.prompts().len(), 1);
    }

    #[tokio::test]
    async fn non_json_reply_carries_preview() {
        let (synth, _) = synthesizer(ScriptedProvider::new().reply("AI Study Assistant", "I cannot help with that."));
        let err = synth
            .synthesize("x", &Features::default(), Language::English)
            .await
            .unwrap_err();
        match err {
            StudyError::AIResponseNotJSON { preview } => assert!(preview.contains("cannot help")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_and_failed_replies() {
        let (synth, _) = synthesizer(ScriptedProvider::new().reply("AI Study Assistant", "  \n"));
        let err = synth.synthesize("x", &Features::default(), Language::English).await.unwrap_err();
        assert!(matches!(err, StudyError::EmptyAIResponse));

        let (synth, _) = synthesizer(ScriptedProvider::new().fail("AI Study Assistant", 429, "quota exceeded"));
        let err = synth.synthesize("x", &Features::default(), Language::English).await.unwrap_err();
        assert!(matches!(err, StudyError::RateLimited(_)));
    }
}
