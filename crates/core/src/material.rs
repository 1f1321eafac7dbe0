use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::UserId;
use crate::document::DocumentId;
use crate::error::CoreError;

/// Unique identifier of a generated study material.
pub type MaterialId = Uuid;

// ── Output language ───────────────────────────────────────────

/// Serialized lower-case; deserialized through [`FromStr`], so "French"
/// and "fr" are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Language {
    #[default]
    English,
    French,
    Arabic,
}

impl Language {
    /// Name used inside prompts ("French").
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::French => "French",
            Language::Arabic => "Arabic",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => write!(f, "english"),
            Language::French => write!(f, "french"),
            Language::Arabic => write!(f, "arabic"),
        }
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "french" | "fr" => Ok(Language::French),
            "arabic" | "ar" => Ok(Language::Arabic),
            other => Err(CoreError::InvalidValue {
                field: "outputLanguage",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Language {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ── Enrichment items ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    #[serde(default)]
    pub formula: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Short,
    Long,
    Essay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
}

/// Which option(s) of an MCQ are correct. Zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Single(usize),
    Multiple(Vec<usize>),
}

impl CorrectAnswer {
    /// Decode the loosely typed value a model returns: a number, a numeric
    /// string, or an array of either. Empty arrays and negatives are rejected.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Array(items) => {
                let indices = items
                    .iter()
                    .map(index_from_json)
                    .collect::<Option<Vec<_>>>()?;
                if indices.is_empty() {
                    None
                } else {
                    Some(CorrectAnswer::Multiple(indices))
                }
            }
            other => index_from_json(other).map(CorrectAnswer::Single),
        }
    }

    pub fn indices(&self) -> Vec<usize> {
        match self {
            CorrectAnswer::Single(i) => vec![*i],
            CorrectAnswer::Multiple(v) => v.clone(),
        }
    }

    /// True when every index addresses one of `option_count` options.
    pub fn fits(&self, option_count: usize) -> bool {
        self.indices().iter().all(|&i| i < option_count)
    }
}

fn index_from_json(value: &serde_json::Value) -> Option<usize> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return usize::try_from(u).ok();
            }
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0).then_some(f as usize)
        }
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    #[serde(default)]
    pub schedule: Vec<StudyDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_days: u32,
}

/// A video the model suggests searching for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSuggestion {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub relevance: String,
}

/// The enrichment fields shared by a material and each of its chapters.
/// Absent fields were either not requested or not produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulas: Option<Vec<Formula>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_questions: Option<Vec<ExamQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcqs: Option<Vec<Mcq>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flashcards: Option<Vec<Flashcard>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_plan: Option<StudyPlan>,
}

impl StudyContent {
    pub fn is_empty(&self) -> bool {
        *self == StudyContent::default()
    }
}

// ── Chapters ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// 1-based reading position.
    pub order: u32,
    pub title: String,
    pub document_id: DocumentId,
    #[serde(flatten)]
    pub content: StudyContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_videos: Option<Vec<VideoSuggestion>>,
}

impl Chapter {
    /// A chapter whose enrichment failed or was skipped.
    pub fn bare(order: u32, title: String, document_id: DocumentId) -> Self {
        Self {
            order,
            title,
            document_id,
            content: StudyContent::default(),
            youtube_videos: None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        !self.content.is_empty() || self.youtube_videos.is_some()
    }
}

// ── Votes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

impl FromStr for VoteKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteKind::Up),
            "down" => Ok(VoteKind::Down),
            other => Err(CoreError::InvalidValue {
                field: "vote",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: UserId,
    pub vote: VoteKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub up: usize,
    pub down: usize,
    pub total: usize,
}

// ── Material ──────────────────────────────────────────────────

/// One generated study-material bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: MaterialId,
    pub owner_id: UserId,
    pub title: String,
    pub document_ids: Vec<DocumentId>,
    #[serde(flatten)]
    pub content: StudyContent,
    #[serde(default)]
    pub output_language: Language,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub shared_with: Vec<UserId>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    pub fn new(
        owner_id: UserId,
        title: String,
        document_ids: Vec<DocumentId>,
        content: StudyContent,
        output_language: Language,
        chapters: Vec<Chapter>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title,
            document_ids,
            content,
            output_language,
            chapters,
            shared_with: Vec::new(),
            votes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    /// Owners and users it was shared with may read.
    pub fn can_read(&self, user: UserId) -> bool {
        self.is_owner(user) || self.shared_with.contains(&user)
    }

    /// Grant read access. Returns false if the user already had it.
    pub fn share_with(&mut self, user: UserId) -> bool {
        if self.shared_with.contains(&user) {
            return false;
        }
        self.shared_with.push(user);
        self.updated_at = Utc::now();
        true
    }

    /// Record a vote, replacing any earlier vote by the same user.
    pub fn cast_vote(&mut self, user: UserId, vote: VoteKind) -> VoteTally {
        self.votes.retain(|v| v.user_id != user);
        self.votes.push(Vote { user_id: user, vote });
        self.updated_at = Utc::now();
        self.tally()
    }

    pub fn tally(&self) -> VoteTally {
        let up = self.votes.iter().filter(|v| v.vote == VoteKind::Up).count();
        VoteTally {
            up,
            down: self.votes.len() - up,
            total: self.votes.len(),
        }
    }

    pub fn rename(&mut self, title: &str) {
        self.title = title.trim().to_string();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn material() -> Material {
        Material::new(
            Uuid::new_v4(),
            "Physics".into(),
            vec![],
            StudyContent::default(),
            Language::default(),
            vec![],
        )
    }

    #[test]
    fn correct_answer_decodes_scalar_and_array() {
        assert_eq!(CorrectAnswer::from_json(&json!(2)), Some(CorrectAnswer::Single(2)));
        assert_eq!(CorrectAnswer::from_json(&json!(1.0)), Some(CorrectAnswer::Single(1)));
        assert_eq!(CorrectAnswer::from_json(&json!("3")), Some(CorrectAnswer::Single(3)));
        assert_eq!(
            CorrectAnswer::from_json(&json!([0, 2])),
            Some(CorrectAnswer::Multiple(vec![0, 2]))
        );
        assert_eq!(CorrectAnswer::from_json(&json!([])), None);
        assert_eq!(CorrectAnswer::from_json(&json!(-1)), None);
        assert_eq!(CorrectAnswer::from_json(&json!(1.5)), None);
        assert_eq!(CorrectAnswer::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn correct_answer_fits_options() {
        assert!(CorrectAnswer::Single(3).fits(4));
        assert!(!CorrectAnswer::Single(4).fits(4));
        assert!(!CorrectAnswer::Multiple(vec![0, 5]).fits(4));
    }

    #[test]
    fn correct_answer_wire_shape_is_untagged() {
        let mcq = Mcq {
            question: "q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: CorrectAnswer::Multiple(vec![0, 2]),
            explanation: None,
        };
        let v = serde_json::to_value(&mcq).unwrap();
        assert_eq!(v["correctAnswer"], json!([0, 2]));
        assert!(v.get("explanation").is_none());
    }

    #[test]
    fn vote_last_write_wins() {
        let mut m = material();
        let voter = Uuid::new_v4();
        m.cast_vote(voter, VoteKind::Up);
        let tally = m.cast_vote(voter, VoteKind::Down);
        assert_eq!(m.votes.len(), 1);
        assert_eq!(m.votes[0].vote, VoteKind::Down);
        assert_eq!(tally, VoteTally { up: 0, down: 1, total: 1 });
    }

    #[test]
    fn share_is_idempotent() {
        let mut m = material();
        let friend = Uuid::new_v4();
        assert!(!m.can_read(friend));
        assert!(m.share_with(friend));
        assert!(!m.share_with(friend));
        assert_eq!(m.shared_with.len(), 1);
        assert!(m.can_read(friend));
        assert!(!m.is_owner(friend));
    }

    #[test]
    fn bare_chapter_serializes_only_identity_fields() {
        let ch = Chapter::bare(2, "Waves".into(), Uuid::nil());
        let v = serde_json::to_value(&ch).unwrap();
        let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 3, "got {keys:?}");
        assert!(!ch.is_enriched());
    }

    #[test]
    fn material_content_is_flattened() {
        let mut m = material();
        m.content.summary = Some("About heat".into());
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["summary"], "About heat");
        assert_eq!(v["outputLanguage"], "english");
        let back: Material = serde_json::from_value(v).unwrap();
        assert_eq!(back.content.summary.as_deref(), Some("About heat"));
    }

    #[test]
    fn language_parses_loosely() {
        assert_eq!("French".parse::<Language>().unwrap(), Language::French);
        assert_eq!("ar".parse::<Language>().unwrap(), Language::Arabic);
        assert!("klingon".parse::<Language>().is_err());
        assert_eq!(Language::Arabic.display_name(), "Arabic");
    }

    #[test]
    fn language_deserializes_like_it_parses() {
        let lang: Language = serde_json::from_value(json!("French")).unwrap();
        assert_eq!(lang, Language::French);
        let lang: Language = serde_json::from_value(json!("ar")).unwrap();
        assert_eq!(lang, Language::Arabic);
        assert!(serde_json::from_value::<Language>(json!("klingon")).is_err());
        assert_eq!(serde_json::to_value(Language::French).unwrap(), json!("french"));
    }

    #[test]
    fn vote_kind_parses_strictly() {
        assert_eq!("up".parse::<VoteKind>().unwrap(), VoteKind::Up);
        assert!("Up".parse::<VoteKind>().is_err());
    }
}
