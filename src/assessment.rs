use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, thread_rng};
use serde::{Deserialize, Serialize};

use crate::{
    config,
    error::QuizError,
    log_util::log_debug,
    progress_store,
    question::Question,
    question_pool::{QuestionPool, UNGROUPED_SUBJECT},
    quiz_session::QuizSession,
    storage::StorageGateway,
};

/// Proficiency bucket derived from per-subject accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Weak,
    Medium,
    Good,
    Excellent,
}

impl Tier {
    /// Bucket an accuracy percentage. Boundaries are inclusive upward:
    /// exactly 40 is medium, exactly 60 good, exactly 80 excellent.
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 80.0 {
            Self::Excellent
        } else if percent >= 60.0 {
            Self::Good
        } else if percent >= 40.0 {
            Self::Medium
        } else {
            Self::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Weak => "zayıf",
            Self::Medium => "orta",
            Self::Good => "iyi",
            Self::Excellent => "çok iyi",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub correct_count: usize,
    pub total_count: usize,
}

impl SubjectScore {
    pub fn accuracy_percent(self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            100.0 * self.correct_count as f64 / self.total_count as f64
        }
    }
}

/// Outcome of one completed level assessment. Replaced wholesale on retake,
/// never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelAssessmentResult {
    pub per_subject_score: BTreeMap<String, SubjectScore>,
    pub per_subject_tier: BTreeMap<String, Tier>,
    pub computed_at: DateTime<Utc>,
}

/// Build the assessment paper from the user's self-reported weak subjects,
/// drawing per subject and padding from the field's mixed pool when the draw
/// lands under the configured minimum. With no subjects given, every subject
/// the field offers is assessed.
pub fn build_assessment(
    pool: &QuestionPool,
    weak_subjects: &[String],
    field_key: &str,
) -> Result<Vec<Question>, QuizError> {
    let config = config::current();
    let subjects = if weak_subjects.is_empty() {
        pool.subjects_in_field(field_key)
    } else {
        weak_subjects.to_vec()
    };

    let mut paper: Vec<Question> = Vec::new();
    if !subjects.is_empty() {
        let per_subject = config.assessment_target.div_ceil(subjects.len());
        for subject in &subjects {
            paper.extend(pool.sample_subject(field_key, subject, per_subject));
        }
    }

    if paper.len() < config.assessment_min {
        let needed = config.assessment_target.saturating_sub(paper.len());
        let drawn: HashSet<String> = paper.iter().map(|question| question.id.clone()).collect();
        let padding: Vec<Question> = pool
            .sample_mixed(field_key, needed + drawn.len())
            .into_iter()
            .filter(|question| !drawn.contains(&question.id))
            .take(needed)
            .collect();
        paper.extend(padding);
    }

    if paper.is_empty() {
        return Err(QuizError::EmptyQuestionSet);
    }
    paper.shuffle(&mut thread_rng());
    Ok(paper)
}

/// Cached variant of [`build_assessment`]: the generated paper is persisted
/// and returned as-is on subsequent calls, so repeated reads never
/// re-randomize. Clear the cached paper to force a rebuild.
pub fn load_or_build_assessment(
    gateway: &mut dyn StorageGateway,
    pool: &QuestionPool,
    weak_subjects: &[String],
    field_key: &str,
) -> Result<Vec<Question>, QuizError> {
    if let Some(paper) = progress_store::load_assessment_paper(gateway) {
        if !paper.is_empty() {
            return Ok(paper);
        }
    }
    let paper = build_assessment(pool, weak_subjects, field_key)?;
    if let Err(err) = progress_store::store_assessment_paper(gateway, &paper) {
        log_debug(&format!("assessment: failed to cache generated paper: {err}"));
    }
    Ok(paper)
}

/// Group a session's questions by subject, compute per-subject accuracy and
/// map it onto the four-tier scale.
pub fn evaluate(session: &QuizSession) -> LevelAssessmentResult {
    let mut per_subject_score: BTreeMap<String, SubjectScore> = BTreeMap::new();
    for (question, answer) in session.questions().iter().zip(session.answers()) {
        let subject = question
            .subject_tag
            .clone()
            .unwrap_or_else(|| UNGROUPED_SUBJECT.to_string());
        let entry = per_subject_score.entry(subject).or_default();
        entry.total_count += 1;
        if matches!(answer, Some(choice) if question.correct_choice_index == Some(*choice)) {
            entry.correct_count += 1;
        }
    }
    let per_subject_tier = per_subject_score
        .iter()
        .map(|(subject, subject_score)| {
            (
                subject.clone(),
                Tier::from_percent(subject_score.accuracy_percent()),
            )
        })
        .collect();
    LevelAssessmentResult {
        per_subject_score,
        per_subject_tier,
        computed_at: Utc::now(),
    }
}

/// One fixed sentence per subject, picked by tier.
pub fn recommendations(result: &LevelAssessmentResult) -> Vec<String> {
    result
        .per_subject_tier
        .iter()
        .map(|(subject, tier)| recommendation_sentence(subject, *tier))
        .collect()
}

fn recommendation_sentence(subject: &str, tier: Tier) -> String {
    match tier {
        Tier::Weak => format!(
            "{subject}: temel konulardan başlayıp bol soru çözerek eksiklerini kapatmalısın."
        ),
        Tier::Medium => {
            format!("{subject}: eksik konularını belirleyip düzenli konu tekrarı yapmalısın.")
        }
        Tier::Good => format!("{subject}: seviyeni korumak için haftalık deneme çözmelisin."),
        Tier::Excellent => {
            format!("{subject}: bu derste çok iyisin, zor sorularla kendini zorlayabilirsin.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{Difficulty, SourceOrigin};
    use crate::quiz_session::QuizMode;
    use crate::storage::MemoryStore;
    use std::collections::HashSet;

    fn tagged_question(id: &str, subject: &str, correct: usize) -> Question {
        Question {
            id: id.to_string(),
            prompt_text: format!("stem {id}"),
            choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_choice_index: Some(correct),
            explanation: None,
            difficulty: Difficulty::Medium,
            subject_tag: Some(subject.to_string()),
            source_origin: SourceOrigin::CuratedPool,
        }
    }

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(Tier::from_percent(0.0), Tier::Weak);
        assert_eq!(Tier::from_percent(39.0), Tier::Weak);
        assert_eq!(Tier::from_percent(40.0), Tier::Medium);
        assert_eq!(Tier::from_percent(59.0), Tier::Medium);
        assert_eq!(Tier::from_percent(60.0), Tier::Good);
        assert_eq!(Tier::from_percent(79.0), Tier::Good);
        assert_eq!(Tier::from_percent(80.0), Tier::Excellent);
        assert_eq!(Tier::from_percent(100.0), Tier::Excellent);
    }

    #[test]
    fn evaluate_buckets_each_subject_separately() {
        // matematik: 2/5 answered correctly (exactly 40%), fizik: 1/1.
        let mut questions: Vec<Question> = (0..5)
            .map(|n| tagged_question(&format!("m{n}"), "matematik", 0))
            .collect();
        questions.push(tagged_question("f0", "fizik", 1));

        let mut session = QuizSession::start(questions, QuizMode::Exam, None).unwrap();
        for answer in [0, 0, 1, 1, 1, 1] {
            session.select_answer(answer);
            session.advance();
        }
        session.finish(true);

        let result = evaluate(&session);
        let matematik = result.per_subject_score["matematik"];
        assert_eq!(matematik.correct_count, 2);
        assert_eq!(matematik.total_count, 5);
        assert_eq!(result.per_subject_tier["matematik"], Tier::Medium);
        assert_eq!(result.per_subject_tier["fizik"], Tier::Excellent);
    }

    #[test]
    fn untagged_questions_land_in_the_generic_bucket() {
        let mut question = tagged_question("u0", "ignored", 0);
        question.subject_tag = None;
        let mut session = QuizSession::start(vec![question], QuizMode::Exam, None).unwrap();
        session.select_answer(0);
        session.finish(true);

        let result = evaluate(&session);
        assert!(result.per_subject_score.contains_key(UNGROUPED_SUBJECT));
    }

    #[test]
    fn build_assessment_covers_the_requested_subjects() {
        let pool = QuestionPool::builtin();
        let weak = vec!["matematik".to_string(), "fizik".to_string()];
        let paper = build_assessment(&pool, &weak, "sayisal").unwrap();

        assert!(!paper.is_empty());
        let ids: HashSet<&str> = paper.iter().map(|question| question.id.as_str()).collect();
        assert_eq!(ids.len(), paper.len(), "padding must not duplicate questions");
        // The draw undershoots the minimum, so the paper is padded up to
        // everything the field can offer.
        assert_eq!(paper.len(), pool.available("sayisal"));
    }

    #[test]
    fn build_assessment_falls_back_to_every_subject_in_the_field() {
        let pool = QuestionPool::builtin();
        let paper = build_assessment(&pool, &[], "sozel").unwrap();
        let subjects: HashSet<String> = paper
            .iter()
            .filter_map(|question| question.subject_tag.clone())
            .collect();
        assert_eq!(subjects.len(), pool.subjects_in_field("sozel").len());
    }

    #[test]
    fn build_assessment_fails_on_an_empty_pool() {
        let pool = QuestionPool::new();
        assert_eq!(
            build_assessment(&pool, &[], "sayisal").unwrap_err(),
            QuizError::EmptyQuestionSet
        );
    }

    #[test]
    fn cached_assessment_is_stable_across_reads() {
        let pool = QuestionPool::builtin();
        let mut store = MemoryStore::new();
        let first =
            load_or_build_assessment(&mut store, &pool, &[], "sayisal").unwrap();
        let second =
            load_or_build_assessment(&mut store, &pool, &[], "sayisal").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn one_recommendation_sentence_per_subject() {
        let mut per_subject_score = BTreeMap::new();
        per_subject_score.insert(
            "matematik".to_string(),
            SubjectScore {
                correct_count: 1,
                total_count: 5,
            },
        );
        per_subject_score.insert(
            "tarih".to_string(),
            SubjectScore {
                correct_count: 5,
                total_count: 5,
            },
        );
        let result = LevelAssessmentResult {
            per_subject_tier: per_subject_score
                .iter()
                .map(|(subject, subject_score)| {
                    (
                        subject.clone(),
                        Tier::from_percent(subject_score.accuracy_percent()),
                    )
                })
                .collect(),
            per_subject_score,
            computed_at: Utc::now(),
        };

        let sentences = recommendations(&result);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].starts_with("matematik:"));
        assert!(sentences[1].starts_with("tarih:"));
    }
}
