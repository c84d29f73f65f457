mod attempt;
mod ids;
mod mastery;
mod question;
mod settings;
mod topic;

pub use ids::{LearnerId, ParseIdError, QuestionId, TopicId};

pub use attempt::{AttemptError, QuizAttempt};
pub use mastery::{Mastery, MasteryError, STRENGTH_THRESHOLD, WEAKNESS_THRESHOLD};
pub use question::{
    Difficulty, Question, QuestionDefect, QuestionDraft, QuestionError, QuestionKind,
    QuestionSource, QuestionType, answers_match,
};
pub use settings::{QuizSettings, SettingsError};
pub use topic::{Topic, TopicProgress, TopicStatus};
