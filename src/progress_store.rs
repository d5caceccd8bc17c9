use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

use crate::{
    assessment::{LevelAssessmentResult, SubjectScore},
    log_util::log_debug,
    question::{Question, RawQuestion},
    quiz_session::{QuizSession, SessionStatus},
    scoring,
    storage::{self, StorageGateway},
};

pub const SESSION_SNAPSHOT_KEY: &str = "studyprep.session";
pub const GENERATED_BATCH_KEY: &str = "studyprep.generated";
pub const ASSESSMENT_PAPER_KEY: &str = "studyprep.assessment.paper";
pub const ASSESSMENT_RESULT_KEY: &str = "studyprep.assessment.result";
pub const AGGREGATE_STATS_KEY: &str = "studyprep.stats";

/// Persist the full session for pause/resume.
pub fn save_snapshot(gateway: &mut dyn StorageGateway, session: &QuizSession) -> Result<()> {
    storage::store_json(gateway, SESSION_SNAPSHOT_KEY, session)
}

pub fn load_snapshot(gateway: &dyn StorageGateway) -> Option<QuizSession> {
    storage::load_json(gateway, SESSION_SNAPSHOT_KEY)
}

pub fn clear_snapshot(gateway: &mut dyn StorageGateway) {
    gateway.remove(SESSION_SNAPSHOT_KEY);
}

/// Best-effort durability: persist every `interval` ticks. The in-memory
/// session stays authoritative, so a failed write is only logged; the next
/// snapshot or the finish-time save retries it.
pub fn autosave_on_tick(gateway: &mut dyn StorageGateway, session: &QuizSession, interval: u64) {
    if interval == 0
        || session.elapsed_seconds() == 0
        || session.elapsed_seconds() % interval != 0
    {
        return;
    }
    if let Err(err) = save_snapshot(gateway, session) {
        log_debug(&format!(
            "progress_store: snapshot failed at {}s: {err}",
            session.elapsed_seconds()
        ));
    }
}

/// AI-generated questions cached under a well-known key until they expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedQuestionBatch {
    pub items: Vec<RawQuestion>,
    pub expires_at: DateTime<Utc>,
}

pub fn store_generated_batch(
    gateway: &mut dyn StorageGateway,
    items: Vec<RawQuestion>,
    ttl_minutes: i64,
) -> Result<()> {
    let batch = CachedQuestionBatch {
        items,
        expires_at: Utc::now() + Duration::minutes(ttl_minutes),
    };
    storage::store_json(gateway, GENERATED_BATCH_KEY, &batch)
}

/// Expired or unreadable caches are removed and read as absent.
pub fn load_generated_batch(gateway: &mut dyn StorageGateway) -> Option<Vec<RawQuestion>> {
    let value = gateway.get(GENERATED_BATCH_KEY)?;
    let batch: CachedQuestionBatch = match serde_json::from_str(&value) {
        Ok(batch) => batch,
        Err(err) => {
            log_debug(&format!(
                "progress_store: dropping unreadable generated cache: {err}"
            ));
            gateway.remove(GENERATED_BATCH_KEY);
            return None;
        }
    };
    if batch.expires_at <= Utc::now() {
        gateway.remove(GENERATED_BATCH_KEY);
        return None;
    }
    Some(batch.items)
}

/// The generated assessment paper, cached so repeated reads are stable.
pub fn store_assessment_paper(gateway: &mut dyn StorageGateway, paper: &[Question]) -> Result<()> {
    storage::store_json(gateway, ASSESSMENT_PAPER_KEY, &paper)
}

pub fn load_assessment_paper(gateway: &dyn StorageGateway) -> Option<Vec<Question>> {
    storage::load_json(gateway, ASSESSMENT_PAPER_KEY)
}

pub fn clear_assessment_paper(gateway: &mut dyn StorageGateway) {
    gateway.remove(ASSESSMENT_PAPER_KEY);
}

/// Replaced wholesale on every retake, never merged.
pub fn store_assessment_result(
    gateway: &mut dyn StorageGateway,
    result: &LevelAssessmentResult,
) -> Result<()> {
    storage::store_json(gateway, ASSESSMENT_RESULT_KEY, result)
}

pub fn load_assessment_result(gateway: &dyn StorageGateway) -> Option<LevelAssessmentResult> {
    storage::load_json(gateway, ASSESSMENT_RESULT_KEY)
}

/// Long-term totals accumulated across finished sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub sessions_completed: u32,
    pub questions_seen: u32,
    pub total_correct: u32,
    pub total_wrong: u32,
    pub total_unanswered: u32,
    pub per_subject: BTreeMap<String, SubjectScore>,
}

pub fn load_stats(gateway: &dyn StorageGateway) -> AggregateStats {
    storage::load_json(gateway, AGGREGATE_STATS_KEY).unwrap_or_default()
}

/// Fold a finished session into the long-term stats. Abandoned sessions are
/// deliberately ignored.
pub fn record_finished_session(
    gateway: &mut dyn StorageGateway,
    session: &QuizSession,
) -> Result<()> {
    if session.status() != SessionStatus::Finished {
        return Ok(());
    }
    let result = scoring::score(session);
    let mut stats = load_stats(gateway);
    stats.sessions_completed += 1;
    stats.questions_seen += session.questions().len() as u32;
    stats.total_correct += result.correct_count as u32;
    stats.total_wrong += result.wrong_count as u32;
    stats.total_unanswered += result.unanswered_count as u32;
    for (question, answer) in session.questions().iter().zip(session.answers()) {
        let Some(subject) = question.subject_tag.clone() else {
            continue;
        };
        let entry = stats.per_subject.entry(subject).or_default();
        entry.total_count += 1;
        if matches!(answer, Some(choice) if question.correct_choice_index == Some(*choice)) {
            entry.correct_count += 1;
        }
    }
    storage::store_json(gateway, AGGREGATE_STATS_KEY, &stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{Difficulty, SourceOrigin};
    use crate::quiz_session::QuizMode;
    use crate::storage::MemoryStore;
    use color_eyre::eyre::eyre;

    fn question(id: &str, subject: Option<&str>, correct: usize) -> Question {
        Question {
            id: id.to_string(),
            prompt_text: format!("stem {id}"),
            choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_choice_index: Some(correct),
            explanation: None,
            difficulty: Difficulty::Medium,
            subject_tag: subject.map(str::to_string),
            source_origin: SourceOrigin::Bank,
        }
    }

    fn answered_session() -> QuizSession {
        let questions = vec![
            question("q1", Some("matematik"), 0),
            question("q2", Some("matematik"), 1),
            question("q3", Some("fizik"), 2),
        ];
        let mut session = QuizSession::start(questions, QuizMode::Exam, None).unwrap();
        session.select_answer(0);
        session.advance();
        session.select_answer(3);
        session.advance();
        session.finish(true);
        session
    }

    /// Gateway whose writes always fail, for the swallow-and-continue paths.
    #[derive(Default)]
    struct FailingStore;

    impl StorageGateway for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(eyre!("disk full"))
        }

        fn remove(&mut self, _key: &str) {}
    }

    #[test]
    fn snapshot_round_trip_scores_identically() {
        let mut store = MemoryStore::new();
        let session = answered_session();
        save_snapshot(&mut store, &session).unwrap();

        let restored = load_snapshot(&store).unwrap();
        assert_eq!(restored.answers(), session.answers());
        assert_eq!(scoring::score(&restored), scoring::score(&session));

        clear_snapshot(&mut store);
        assert!(load_snapshot(&store).is_none());
    }

    #[test]
    fn autosave_fires_only_on_the_interval() {
        let mut store = MemoryStore::new();
        let questions = vec![question("q1", None, 0)];
        let mut session = QuizSession::start(questions, QuizMode::Exam, None).unwrap();

        for _ in 0..9 {
            session.tick();
            autosave_on_tick(&mut store, &session, 10);
        }
        assert!(load_snapshot(&store).is_none());

        session.tick();
        autosave_on_tick(&mut store, &session, 10);
        let restored = load_snapshot(&store).unwrap();
        assert_eq!(restored.elapsed_seconds(), 10);
    }

    #[test]
    fn autosave_swallows_persistence_failures() {
        let mut store = FailingStore;
        let questions = vec![question("q1", None, 0)];
        let mut session = QuizSession::start(questions, QuizMode::Exam, None).unwrap();
        for _ in 0..10 {
            session.tick();
        }
        autosave_on_tick(&mut store, &session, 10);
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn generated_batch_expires_and_is_removed() {
        let mut store = MemoryStore::new();
        let items = vec![RawQuestion {
            prompt: Some("stem".to_string()),
            choices: Some(vec!["a".into(), "b".into()]),
            answer_index: Some(0),
            ..RawQuestion::default()
        }];

        store_generated_batch(&mut store, items.clone(), 30).unwrap();
        assert_eq!(load_generated_batch(&mut store).map(|batch| batch.len()), Some(1));

        store_generated_batch(&mut store, items, -1).unwrap();
        assert!(load_generated_batch(&mut store).is_none());
        assert!(store.get(GENERATED_BATCH_KEY).is_none());
    }

    #[test]
    fn corrupt_generated_cache_is_dropped() {
        let mut store = MemoryStore::new();
        store.set(GENERATED_BATCH_KEY, "{broken").unwrap();
        assert!(load_generated_batch(&mut store).is_none());
        assert!(store.get(GENERATED_BATCH_KEY).is_none());
    }

    #[test]
    fn stats_accumulate_finished_sessions_only() {
        let mut store = MemoryStore::new();
        let session = answered_session();
        record_finished_session(&mut store, &session).unwrap();
        record_finished_session(&mut store, &session).unwrap();

        let mut abandoned =
            QuizSession::start(vec![question("q1", Some("tarih"), 0)], QuizMode::Exam, None)
                .unwrap();
        abandoned.abandon();
        record_finished_session(&mut store, &abandoned).unwrap();

        let stats = load_stats(&store);
        assert_eq!(stats.sessions_completed, 2);
        assert_eq!(stats.questions_seen, 6);
        assert_eq!(stats.total_correct, 2);
        assert_eq!(stats.total_wrong, 2);
        assert_eq!(stats.total_unanswered, 2);
        assert_eq!(stats.per_subject["matematik"].total_count, 4);
        assert_eq!(stats.per_subject["matematik"].correct_count, 2);
        assert!(!stats.per_subject.contains_key("tarih"));
    }

    #[test]
    fn assessment_result_is_replaced_wholesale() {
        let mut store = MemoryStore::new();
        let session = answered_session();
        let first = crate::assessment::evaluate(&session);
        store_assessment_result(&mut store, &first).unwrap();

        let mut retake_session = answered_session();
        retake_session.enter_review().unwrap();
        let second = crate::assessment::evaluate(&retake_session);
        store_assessment_result(&mut store, &second).unwrap();

        let loaded = load_assessment_result(&store).unwrap();
        assert_eq!(loaded.computed_at, second.computed_at);
    }
}
