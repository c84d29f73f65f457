#![forbid(unsafe_code)]

pub mod analytics_service;
pub mod error;
pub mod progress_service;
pub mod question_generation;
pub mod question_service;
pub mod study_guide;

pub use mastery_core::Clock;

pub use analytics_service::{AnalyticsService, CohortReport, LearnerReport, PathEntry};
pub use error::{
    AnalyticsError, ProgressServiceError, QuestionGenerationError, QuestionServiceError,
    StudyGuideError,
};
pub use progress_service::{ProgressService, QuizAdvance};
pub use question_generation::{
    QuestionGenerationService, QuestionGenerator, SyllabusRequest, drafts_from_json,
};
pub use question_service::{IngestReport, QuestionService};
pub use study_guide::{
    OutlineGenerator, StudyGuide, StudyGuideGenerator, StudyGuideOutcome, StudyGuideRequest,
    StudyGuideService, WeakTopic,
};
