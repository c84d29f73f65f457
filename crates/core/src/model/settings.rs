use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("questions per quiz must be > 0")]
    InvalidQuestionsPerQuiz,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Configuration for how quizzes are assembled.
///
/// The question source supplies questions in its own order; only the first
/// `questions_per_quiz` of them make it into a session. No difficulty or
/// coverage balancing happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizSettingsRecord", into = "QuizSettingsRecord")]
pub struct QuizSettings {
    questions_per_quiz: u32,
}

impl QuizSettings {
    pub const DEFAULT_QUESTIONS_PER_QUIZ: u32 = 3;

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidQuestionsPerQuiz` if the size is zero.
    pub fn new(questions_per_quiz: u32) -> Result<Self, SettingsError> {
        if questions_per_quiz == 0 {
            return Err(SettingsError::InvalidQuestionsPerQuiz);
        }
        Ok(Self { questions_per_quiz })
    }

    #[must_use]
    pub fn questions_per_quiz(&self) -> u32 {
        self.questions_per_quiz
    }

    /// Session size as a `usize`, for slicing question lists.
    #[must_use]
    pub fn question_limit(&self) -> usize {
        usize::try_from(self.questions_per_quiz).unwrap_or(usize::MAX)
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            questions_per_quiz: Self::DEFAULT_QUESTIONS_PER_QUIZ,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuizSettingsRecord {
    #[serde(default = "default_questions_per_quiz")]
    questions_per_quiz: u32,
}

fn default_questions_per_quiz() -> u32 {
    QuizSettings::DEFAULT_QUESTIONS_PER_QUIZ
}

impl TryFrom<QuizSettingsRecord> for QuizSettings {
    type Error = SettingsError;

    fn try_from(record: QuizSettingsRecord) -> Result<Self, Self::Error> {
        Self::new(record.questions_per_quiz)
    }
}

impl From<QuizSettings> for QuizSettingsRecord {
    fn from(settings: QuizSettings) -> Self {
        Self {
            questions_per_quiz: settings.questions_per_quiz,
        }
    }
}
