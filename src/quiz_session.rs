use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::QuizError, log_util::log_debug, question::Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
    Practice,
    Exam,
    Review,
}

impl QuizMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Exam => "exam",
            Self::Review => "review",
        }
    }
}

/// Answer-locking and feedback visibility are deliberately independent of the
/// mode label. A future mode must pick both flags explicitly at
/// [`QuizSession::start_with_rules`]; nothing in the engine branches on mode
/// names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRules {
    /// The first recorded answer at a position is final.
    pub lock_first_answer: bool,
    /// Correctness is revealed right after each answer instead of at finish.
    pub immediate_feedback: bool,
}

impl SessionRules {
    pub fn for_mode(mode: QuizMode) -> Self {
        match mode {
            QuizMode::Practice => Self {
                lock_first_answer: true,
                immediate_feedback: true,
            },
            QuizMode::Exam => Self {
                lock_first_answer: false,
                immediate_feedback: false,
            },
            QuizMode::Review => Self {
                lock_first_answer: true,
                immediate_feedback: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Finished,
    Abandoned,
}

/// What happened to a [`QuizSession::select_answer`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The answer was recorded. `feedback` carries correctness when the
    /// session rules reveal it immediately.
    Accepted { feedback: Option<bool> },
    /// The position already holds a final answer.
    Locked,
    /// The session is not active, or the choice index is out of range.
    Rejected,
}

/// The state machine owning one attempt: question list (fixed at start),
/// answer sheet, cursor, timer and lifecycle. `finished` and `abandoned` are
/// terminal; no operation leaves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    mode: QuizMode,
    rules: SessionRules,
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    current_position: usize,
    started_at: DateTime<Utc>,
    elapsed_seconds: u64,
    time_limit_seconds: Option<u64>,
    status: SessionStatus,
    timed_out: bool,
    #[serde(default)]
    is_reviewing: bool,
}

impl QuizSession {
    pub fn start(
        questions: Vec<Question>,
        mode: QuizMode,
        time_limit_seconds: Option<u64>,
    ) -> Result<Self, QuizError> {
        Self::start_with_rules(questions, mode, SessionRules::for_mode(mode), time_limit_seconds)
    }

    pub fn start_with_rules(
        questions: Vec<Question>,
        mode: QuizMode,
        rules: SessionRules,
        time_limit_seconds: Option<u64>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyQuestionSet);
        }
        let answers = vec![None; questions.len()];
        Ok(Self {
            mode,
            rules,
            questions,
            answers,
            current_position: 0,
            started_at: Utc::now(),
            elapsed_seconds: 0,
            time_limit_seconds,
            status: SessionStatus::Active,
            timed_out: false,
            is_reviewing: false,
        })
    }

    /// Record a choice for the current question.
    pub fn select_answer(&mut self, choice_index: usize) -> SelectionOutcome {
        if self.status != SessionStatus::Active {
            return SelectionOutcome::Rejected;
        }
        if choice_index >= self.questions[self.current_position].choices.len() {
            return SelectionOutcome::Rejected;
        }
        if self.rules.lock_first_answer && self.answers[self.current_position].is_some() {
            return SelectionOutcome::Locked;
        }
        self.answers[self.current_position] = Some(choice_index);
        let feedback = self
            .rules
            .immediate_feedback
            .then(|| self.questions[self.current_position].correct_choice_index == Some(choice_index));
        SelectionOutcome::Accepted { feedback }
    }

    /// Move the cursor forward; a no-op at the last question.
    pub fn advance(&mut self) {
        if self.current_position + 1 < self.questions.len() {
            self.current_position += 1;
        }
    }

    /// Move the cursor back; a no-op at the first question.
    pub fn retreat(&mut self) {
        if self.current_position > 0 {
            self.current_position -= 1;
        }
    }

    /// Driven by an external one-second timer. Reaching the time limit
    /// force-finishes through the normal finish path and tags the session as
    /// timed out; there is no separate terminal state for it.
    pub fn tick(&mut self) -> SessionStatus {
        if self.status == SessionStatus::Active {
            self.elapsed_seconds += 1;
            if let Some(limit) = self.time_limit_seconds {
                if self.elapsed_seconds >= limit {
                    self.timed_out = true;
                    self.finish(true);
                }
            }
        }
        self.status
    }

    /// Freeze the answer sheet. The session never blocks on unanswered
    /// questions; obtaining confirmation for them is a UI collaborator's job.
    pub fn finish(&mut self, force: bool) {
        if self.status != SessionStatus::Active {
            return;
        }
        let open = self.unanswered_count();
        if !force && open > 0 {
            log_debug(&format!(
                "quiz_session: finishing with {open} unanswered question(s)"
            ));
        }
        self.status = SessionStatus::Finished;
    }

    /// Exit without scoring. Abandoned sessions never enter aggregate stats.
    pub fn abandon(&mut self) {
        if self.status == SessionStatus::Active {
            self.status = SessionStatus::Abandoned;
        }
    }

    /// Switch a finished session into review. Feedback becomes visible for
    /// every question regardless of the original rules.
    pub fn enter_review(&mut self) -> Result<(), QuizError> {
        if self.status != SessionStatus::Finished {
            return Err(QuizError::SessionStillActive);
        }
        self.is_reviewing = true;
        Ok(())
    }

    /// Whether correctness for `position` may be shown right now.
    pub fn feedback_visible(&self, position: usize) -> bool {
        self.is_reviewing
            || self.status == SessionStatus::Finished
            || (self.rules.immediate_feedback
                && self.answers.get(position).copied().flatten().is_some())
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_position]
    }

    pub fn progress_percent(&self) -> u8 {
        (((self.current_position + 1) * 100) / self.questions.len()) as u8
    }

    pub fn is_first_question(&self) -> bool {
        self.current_position == 0
    }

    pub fn is_last_question(&self) -> bool {
        self.current_position + 1 == self.questions.len()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|answer| answer.is_some()).count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.answers.len() - self.answered_count()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    pub fn rules(&self) -> SessionRules {
        self.rules
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_position(&self) -> usize {
        self.current_position
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn time_limit_seconds(&self) -> Option<u64> {
        self.time_limit_seconds
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn is_reviewing(&self) -> bool {
        self.is_reviewing
    }
}
