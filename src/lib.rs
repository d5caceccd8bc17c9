//! Quiz execution engine for an adaptive multiple-choice study app:
//! question normalization, answer resolution, session state machine,
//! scoring, and level-assessment recommendations. Rendering and input
//! handling live with the embedding application.

pub mod ai_manager;
pub mod answer_resolver;
pub mod assessment;
pub mod config;
pub mod error;
pub mod log_util;
pub mod normalizer;
pub mod progress_store;
pub mod question;
pub mod question_pool;
pub mod quiz_session;
pub mod scoring;
pub mod storage;

pub use ai_manager::AiManager;
pub use assessment::{LevelAssessmentResult, SubjectScore, Tier};
pub use error::QuizError;
pub use normalizer::NormalizedBatch;
pub use question::{Difficulty, Question, RawAnswer, RawQuestion, SourceOrigin};
pub use question_pool::QuestionPool;
pub use quiz_session::{QuizMode, QuizSession, SelectionOutcome, SessionRules, SessionStatus};
pub use scoring::{ScoreResult, score};
pub use storage::{MemoryStore, SqliteStore, StorageGateway};
