use serde::{Deserialize, Serialize};

/// Difficulty grade attached to a question. Unrecognized labels fall back to
/// [`Difficulty::Medium`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "easy" | "kolay" => Self::Easy,
            "hard" | "zor" => Self::Hard,
            _ => Self::Medium,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Which producer a question arrived from. Informational only; scoring never
/// branches on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceOrigin {
    Bank,
    AiGenerated,
    CuratedPool,
    Library,
    #[default]
    Unknown,
}

impl SourceOrigin {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "bank" => Self::Bank,
            "ai" | "ai-generated" => Self::AiGenerated,
            "pool" | "curated-pool" => Self::CuratedPool,
            "library" => Self::Library,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::AiGenerated => "ai-generated",
            Self::CuratedPool => "curated-pool",
            Self::Library => "library",
            Self::Unknown => "unknown",
        }
    }
}

/// One multiple-choice question in its canonical, post-normalization shape.
/// Choice identity is positional; `correct_choice_index` is resolved once at
/// normalization time and cached here. `None` means no choice could be
/// identified as correct, so the question can never score as correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt_text: String,
    pub choices: Vec<String>,
    pub correct_choice_index: Option<usize>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub subject_tag: Option<String>,
    #[serde(default)]
    pub source_origin: SourceOrigin,
}

impl Question {
    /// Whether any selection can ever be marked correct for this question.
    pub fn has_resolved_answer(&self) -> bool {
        self.correct_choice_index.is_some()
    }
}

/// One question record as produced by any upstream source, before
/// normalization. The aliases cover the historical shapes: the prompt has
/// appeared under `q`, `text` and `question`, the choice list under `o`,
/// `options` and `choices`, and the correct answer as an explicit index, a
/// bare number, a letter, or the full choice text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "q", alias = "text", alias = "question")]
    pub prompt: Option<String>,
    #[serde(default, alias = "o", alias = "options")]
    pub choices: Option<Vec<String>>,
    #[serde(default, alias = "answerIndex", alias = "correctIndex")]
    pub answer_index: Option<i64>,
    #[serde(default)]
    pub answer: Option<RawAnswer>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, alias = "subject")]
    pub subject_tag: Option<String>,
    #[serde(default, alias = "source")]
    pub source_origin: Option<String>,
}

/// The `answer` field of a raw record: either a numeric choice index or a
/// string (a single letter, or the full choice text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAnswer {
    Index(i64),
    Text(String),
}

impl From<&Question> for RawQuestion {
    /// Canonical raw form of an already-normalized question. Feeding this
    /// back through the normalizer reproduces the original question.
    fn from(question: &Question) -> Self {
        Self {
            id: Some(question.id.clone()),
            prompt: Some(question.prompt_text.clone()),
            choices: Some(question.choices.clone()),
            answer_index: question.correct_choice_index.map(|index| index as i64),
            answer: None,
            explanation: question.explanation.clone(),
            difficulty: Some(question.difficulty.label().to_string()),
            subject_tag: question.subject_tag.clone(),
            source_origin: Some(question.source_origin.label().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parse_accepts_both_vocabularies() {
        assert_eq!(Difficulty::parse("easy"), Difficulty::Easy);
        assert_eq!(Difficulty::parse("KOLAY"), Difficulty::Easy);
        assert_eq!(Difficulty::parse("zor"), Difficulty::Hard);
        assert_eq!(Difficulty::parse("unheard-of"), Difficulty::Medium);
        assert_eq!(Difficulty::parse(""), Difficulty::Medium);
    }

    #[test]
    fn raw_question_reads_all_prompt_and_choice_aliases() {
        let short: RawQuestion =
            serde_json::from_str(r#"{"q": "stem", "o": ["a", "b"], "answer": 1}"#).unwrap();
        assert_eq!(short.prompt.as_deref(), Some("stem"));
        assert_eq!(short.choices.as_ref().map(Vec::len), Some(2));
        assert_eq!(short.answer, Some(RawAnswer::Index(1)));

        let long: RawQuestion = serde_json::from_str(
            r#"{"question": "stem", "options": ["a", "b"], "answerIndex": 0}"#,
        )
        .unwrap();
        assert_eq!(long.prompt.as_deref(), Some("stem"));
        assert_eq!(long.answer_index, Some(0));

        let text: RawQuestion =
            serde_json::from_str(r#"{"text": "stem", "choices": ["a"], "answer": "B) b"}"#)
                .unwrap();
        assert_eq!(text.answer, Some(RawAnswer::Text("B) b".to_string())));
    }

    #[test]
    fn source_origin_survives_a_label_round_trip() {
        for origin in [
            SourceOrigin::Bank,
            SourceOrigin::AiGenerated,
            SourceOrigin::CuratedPool,
            SourceOrigin::Library,
            SourceOrigin::Unknown,
        ] {
            assert_eq!(SourceOrigin::parse(origin.label()), origin);
        }
    }
}
