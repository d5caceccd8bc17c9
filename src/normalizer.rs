use crate::{
    answer_resolver,
    error::QuizError,
    log_util::log_debug,
    question::{Difficulty, Question, RawQuestion, SourceOrigin},
};

/// Outcome of a tolerant batch normalization. Records without usable choices
/// are skipped rather than aborting the batch; `skipped` and `unresolved`
/// feed the caller's data-quality reporting.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub questions: Vec<Question>,
    /// Records dropped because no choice list survived alias mapping.
    pub skipped: usize,
    /// Admitted questions whose correct answer could not be resolved.
    pub unresolved: usize,
}

/// Map one raw record into the canonical question shape. The answer resolver
/// runs exactly once here; the result is cached on the question so later
/// lookups are O(1) and re-normalizing a canonical question is a no-op.
pub fn normalize(raw: &RawQuestion, position_hint: usize) -> Result<Question, QuizError> {
    let choices = raw
        .choices
        .as_ref()
        .filter(|choices| !choices.is_empty())
        .ok_or(QuizError::InvalidQuestion)?;
    let correct_choice_index = answer_resolver::resolve(raw, choices);
    Ok(Question {
        id: raw
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("q_{}", position_hint + 1)),
        prompt_text: raw.prompt.clone().unwrap_or_default(),
        choices: choices.clone(),
        correct_choice_index,
        explanation: raw.explanation.clone(),
        difficulty: raw
            .difficulty
            .as_deref()
            .map(Difficulty::parse)
            .unwrap_or_default(),
        subject_tag: raw.subject_tag.clone().filter(|tag| !tag.trim().is_empty()),
        source_origin: raw
            .source_origin
            .as_deref()
            .map(SourceOrigin::parse)
            .unwrap_or_default(),
    })
}

/// Normalize a whole batch, skipping malformed records and continuing.
pub fn normalize_batch(raws: &[RawQuestion]) -> NormalizedBatch {
    normalize_batch_from(raws, SourceOrigin::Unknown)
}

/// Like [`normalize_batch`], but stamps `fallback_origin` on records that do
/// not declare a source of their own.
pub fn normalize_batch_from(raws: &[RawQuestion], fallback_origin: SourceOrigin) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for (position, raw) in raws.iter().enumerate() {
        match normalize(raw, position) {
            Ok(mut question) => {
                if question.source_origin == SourceOrigin::Unknown {
                    question.source_origin = fallback_origin;
                }
                if question.correct_choice_index.is_none() {
                    batch.unresolved += 1;
                }
                batch.questions.push(question);
            }
            Err(_) => batch.skipped += 1,
        }
    }
    if batch.skipped > 0 {
        log_debug(&format!(
            "normalizer: skipped {} record(s) without usable choices",
            batch.skipped
        ));
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::RawAnswer;

    fn raw(prompt: &str, choices: &[&str], answer: RawAnswer) -> RawQuestion {
        RawQuestion {
            prompt: Some(prompt.to_string()),
            choices: Some(choices.iter().map(|choice| choice.to_string()).collect()),
            answer: Some(answer),
            ..RawQuestion::default()
        }
    }

    #[test]
    fn normalize_resolves_and_synthesizes_an_id() {
        let record = raw("capital?", &["Paris", "Lyon"], RawAnswer::Text("A".into()));
        let question = normalize(&record, 4).unwrap();
        assert_eq!(question.id, "q_5");
        assert_eq!(question.correct_choice_index, Some(0));
        assert_eq!(question.prompt_text, "capital?");
        assert_eq!(question.difficulty, Difficulty::Medium);
    }

    #[test]
    fn normalize_rejects_missing_or_empty_choices() {
        let missing = RawQuestion {
            prompt: Some("stem".to_string()),
            ..RawQuestion::default()
        };
        assert_eq!(normalize(&missing, 0), Err(QuizError::InvalidQuestion));

        let empty = RawQuestion {
            prompt: Some("stem".to_string()),
            choices: Some(Vec::new()),
            ..RawQuestion::default()
        };
        assert_eq!(normalize(&empty, 0), Err(QuizError::InvalidQuestion));
    }

    #[test]
    fn normalize_is_idempotent_for_canonical_questions() {
        let record = raw("stem", &["a", "b", "c"], RawAnswer::Text("c".into()));
        let first = normalize(&record, 0).unwrap();
        let second = normalize(&RawQuestion::from(&first), 9).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.correct_choice_index, Some(2));
    }

    #[test]
    fn batch_skips_bad_records_and_counts_unresolved() {
        let records = vec![
            raw("ok", &["a", "b"], RawAnswer::Index(0)),
            RawQuestion::default(),
            raw("orphan", &["a", "b"], RawAnswer::Text("missing".into())),
        ];
        let batch = normalize_batch(&records);
        assert_eq!(batch.questions.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.unresolved, 1);
        assert!(!batch.questions[1].has_resolved_answer());
    }

    #[test]
    fn batch_origin_fallback_respects_declared_sources() {
        let mut declared = raw("a", &["x", "y"], RawAnswer::Index(0));
        declared.source_origin = Some("library".to_string());
        let records = vec![declared, raw("b", &["x", "y"], RawAnswer::Index(1))];
        let batch = normalize_batch_from(&records, SourceOrigin::AiGenerated);
        assert_eq!(batch.questions[0].source_origin, SourceOrigin::Library);
        assert_eq!(batch.questions[1].source_origin, SourceOrigin::AiGenerated);
    }
}
