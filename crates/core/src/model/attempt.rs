use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Mastery, TopicId};
use crate::quiz::QuizOutcome;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("too many questions for a single attempt: {len}")]
    TooManyQuestions { len: usize },

    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("an attempt must contain at least one question")]
    Empty,

    #[error("mastery after an attempt ({after}) is below mastery before it ({before})")]
    Regression { before: Mastery, after: Mastery },
}

/// Record of one completed quiz, kept as the learner's attempt history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    topic_id: TopicId,
    correct: u32,
    total: u32,
    mastery_before: Mastery,
    mastery_after: Mastery,
    completed_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the counts or mastery values are inconsistent.
    pub fn from_persisted(
        topic_id: TopicId,
        correct: u32,
        total: u32,
        mastery_before: Mastery,
        mastery_after: Mastery,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if total == 0 {
            return Err(AttemptError::Empty);
        }
        if correct > total {
            return Err(AttemptError::CountMismatch { correct, total });
        }
        if mastery_after < mastery_before {
            return Err(AttemptError::Regression {
                before: mastery_before,
                after: mastery_after,
            });
        }

        Ok(Self {
            topic_id,
            correct,
            total,
            mastery_before,
            mastery_after,
            completed_at,
        })
    }

    /// Build the history record for a finished quiz.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::TooManyQuestions` if a count cannot fit in `u32`.
    pub fn from_outcome(
        outcome: &QuizOutcome,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        let total = u32::try_from(outcome.total)
            .map_err(|_| AttemptError::TooManyQuestions { len: outcome.total })?;
        let correct = u32::try_from(outcome.correct)
            .map_err(|_| AttemptError::TooManyQuestions { len: outcome.correct })?;

        Self::from_persisted(
            outcome.topic_id.clone(),
            correct,
            total,
            outcome.previous_mastery,
            outcome.final_mastery,
            completed_at,
        )
    }

    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Score of this attempt alone, before the monotonic max is applied.
    #[must_use]
    pub fn raw_percent(&self) -> Mastery {
        Mastery::from_score(self.correct as usize, self.total as usize)
    }

    #[must_use]
    pub fn mastery_before(&self) -> Mastery {
        self.mastery_before
    }

    #[must_use]
    pub fn mastery_after(&self) -> Mastery {
        self.mastery_after
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn mastery(value: u32) -> Mastery {
        Mastery::new(value).unwrap()
    }

    #[test]
    fn attempt_from_outcome_keeps_counts() {
        let outcome = QuizOutcome {
            topic_id: TopicId::new("t1"),
            correct: 2,
            total: 3,
            raw_percent: mastery(67),
            previous_mastery: Mastery::ZERO,
            final_mastery: mastery(67),
        };

        let attempt = QuizAttempt::from_outcome(&outcome, fixed_now()).unwrap();

        assert_eq!(attempt.correct(), 2);
        assert_eq!(attempt.total(), 3);
        assert_eq!(attempt.raw_percent(), mastery(67));
        assert_eq!(attempt.mastery_after(), mastery(67));
        assert_eq!(attempt.completed_at(), fixed_now());
    }

    #[test]
    fn persisted_attempt_rejects_inconsistent_counts() {
        let err = QuizAttempt::from_persisted(
            TopicId::new("t1"),
            4,
            3,
            Mastery::ZERO,
            Mastery::FULL,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::CountMismatch { correct: 4, total: 3 });
    }

    #[test]
    fn persisted_attempt_rejects_regression() {
        let err = QuizAttempt::from_persisted(
            TopicId::new("t1"),
            1,
            3,
            mastery(80),
            mastery(33),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::Regression { .. }));
    }
}
