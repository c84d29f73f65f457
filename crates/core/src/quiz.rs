use std::fmt;
use thiserror::Error;

use crate::model::{Mastery, Question, QuestionDraft, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz session needs at least one valid question")]
    InvalidSession,
    #[error("quiz session already completed")]
    SessionClosed,
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Verdict for a submitted answer, with what the learner should see next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: String,
}

/// Final numbers of a completed quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub topic_id: TopicId,
    pub correct: usize,
    pub total: usize,
    /// Score of this quiz alone.
    pub raw_percent: Mastery,
    pub previous_mastery: Mastery,
    /// `max(previous_mastery, raw_percent)`
    pub final_mastery: Mastery,
}

impl QuizOutcome {
    #[must_use]
    pub fn improved(&self) -> bool {
        self.final_mastery > self.previous_mastery
    }
}

/// Result of moving past the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizStep {
    Next { index: usize },
    Complete(QuizOutcome),
}

/// Aggregated view of quiz progress, for "3 / 5" style indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    /// 1-based position of the current question; equals `total` once complete.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizState {
    InProgress { index: usize, correct: usize },
    Completed(QuizOutcome),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One pass through an ordered question list for a single topic.
///
/// The verdict for the current question is held aside until `advance`, so
/// re-submitting before advancing re-evaluates instead of counting twice.
/// Dropping the session commits nothing.
pub struct QuizSession {
    topic_id: TopicId,
    starting_mastery: Mastery,
    questions: Vec<Question>,
    state: QuizState,
    pending: Option<bool>,
}

impl QuizSession {
    /// # Errors
    ///
    /// Returns `QuizError::InvalidSession` if `questions` is empty.
    pub fn new(
        topic_id: TopicId,
        starting_mastery: Mastery,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::InvalidSession);
        }

        Ok(Self {
            topic_id,
            starting_mastery,
            questions,
            state: QuizState::InProgress {
                index: 0,
                correct: 0,
            },
            pending: None,
        })
    }

    /// Build a session from unchecked drafts, dropping malformed ones.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidSession` if no draft survives validation.
    pub fn from_drafts(
        topic_id: TopicId,
        starting_mastery: Mastery,
        drafts: Vec<QuestionDraft>,
    ) -> Result<Self, QuizError> {
        let questions = drafts
            .into_iter()
            .filter_map(|draft| match draft.validate() {
                Ok(question) => Some(question),
                Err(err) => {
                    tracing::warn!(topic = %topic_id, error = %err, "dropping malformed question");
                    None
                }
            })
            .collect();
        Self::new(topic_id, starting_mastery, questions)
    }

    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    #[must_use]
    pub fn starting_mastery(&self) -> Mastery {
        self.starting_mastery
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn state(&self) -> &QuizState {
        &self.state
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, QuizState::Completed(_))
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&QuizOutcome> {
        match &self.state {
            QuizState::Completed(outcome) => Some(outcome),
            QuizState::InProgress { .. } => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            QuizState::InProgress { index, .. } => self.questions.get(index),
            QuizState::Completed(_) => None,
        }
    }

    /// Whether the current question already has a verdict awaiting `advance`.
    #[must_use]
    pub fn has_pending_answer(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let total = self.questions.len();
        match self.state {
            QuizState::InProgress { index, .. } => QuizProgress {
                position: index + 1,
                total,
                answered: index,
                is_complete: false,
            },
            QuizState::Completed(_) => QuizProgress {
                position: total,
                total,
                answered: total,
                is_complete: true,
            },
        }
    }

    /// Check `candidate` against the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionClosed` once the session is complete.
    pub fn submit_answer(&mut self, candidate: &str) -> Result<AnswerFeedback, QuizError> {
        let question = self.current_question().ok_or(QuizError::SessionClosed)?;
        let feedback = AnswerFeedback {
            is_correct: question.is_correct(candidate),
            correct_answer: question.correct_answer().to_owned(),
            explanation: question.explanation().to_owned(),
        };
        self.pending = Some(feedback.is_correct);
        Ok(feedback)
    }

    /// Commit the current verdict and move on.
    ///
    /// A question advanced past without a submitted answer counts as wrong.
    /// After the last question the session completes and the mastery it
    /// yields is computed.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionClosed` once the session is complete.
    pub fn advance(&mut self) -> Result<QuizStep, QuizError> {
        let QuizState::InProgress { index, correct } = self.state else {
            return Err(QuizError::SessionClosed);
        };

        let correct = correct + usize::from(self.pending.take().unwrap_or(false));
        let next = index + 1;
        if next < self.questions.len() {
            self.state = QuizState::InProgress {
                index: next,
                correct,
            };
            return Ok(QuizStep::Next { index: next });
        }

        let total = self.questions.len();
        let raw_percent = Mastery::from_score(correct, total);
        let outcome = QuizOutcome {
            topic_id: self.topic_id.clone(),
            correct,
            total,
            raw_percent,
            previous_mastery: self.starting_mastery,
            final_mastery: self.starting_mastery.max(raw_percent),
        };
        self.state = QuizState::Completed(outcome.clone());
        Ok(QuizStep::Complete(outcome))
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("topic_id", &self.topic_id)
            .field("questions_len", &self.questions.len())
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
