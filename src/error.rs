use std::fmt::{self, Display};

/// Domain errors surfaced by the quiz engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizError {
    /// A raw record had no usable choices after mapping all known field aliases.
    InvalidQuestion,
    /// Session start was requested with zero questions.
    EmptyQuestionSet,
    /// Review was requested on a session that has not finished.
    SessionStillActive,
}

impl Display for QuizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidQuestion => "question record has no usable answer choices",
            Self::EmptyQuestionSet => "cannot start a session without questions",
            Self::SessionStillActive => "review is only available once a session has finished",
        })
    }
}

impl std::error::Error for QuizError {}
