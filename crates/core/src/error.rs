use thiserror::Error;

use crate::curriculum::CurriculumError;
use crate::graph::GraphError;
use crate::learner::LearnerError;
use crate::model::{AttemptError, MasteryError, QuestionError, SettingsError};
use crate::quiz::QuizError;

/// Any failure raised by the core crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Mastery(#[from] MasteryError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
}
