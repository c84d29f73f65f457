//! Errors returned by the progress, question, generation, analytics and study guide services.

use thiserror::Error;

use mastery_core::learner::LearnerError;
use mastery_core::model::QuestionError;
use mastery_core::quiz::QuizOutcome;
use storage::StorageError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("every reachable topic is already mastered")]
    NothingToStudy,
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The quiz finished and is committed in memory, but storing it failed.
    /// `ProgressService::save_progress` stores whatever is still missing.
    #[error("quiz on topic {} completed but was not saved: {source}", .outcome.topic_id)]
    Unsaved {
        outcome: Box<QuizOutcome>,
        #[source]
        source: StorageError,
    },
}

/// Errors emitted by `QuestionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionServiceError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error("no curriculum topic named {0:?}")]
    UnknownTopic(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuestionGenerationService` and its generators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionGenerationError {
    #[error("syllabus content cannot be empty")]
    EmptySyllabus,
    #[error("can generate between 1 and 10 questions, not {0}")]
    QuestionCount(u32),
    #[error("question generator failed: {0}")]
    Generator(String),
    #[error("could not decode generated questions: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Questions(#[from] QuestionServiceError),
}

/// Errors emitted by `AnalyticsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalyticsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StudyGuideService` and its generators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyGuideError {
    #[error("no student named {0:?} in the cohort")]
    UnknownStudent(String),
    #[error("study guide generator failed: {0}")]
    Generator(String),
    #[error("study guide generator returned an empty response")]
    EmptyResponse,
    #[error("could not encode study guide request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}
