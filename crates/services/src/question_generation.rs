//! Question drafts generated from a course syllabus.
//!
//! The model call sits behind [`QuestionGenerator`]. Whatever it returns is
//! marked as model-generated and goes through [`QuestionService::ingest`], so
//! malformed drafts are reported instead of stored.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mastery_core::model::{QuestionDraft, QuestionSource};

use crate::error::QuestionGenerationError;
use crate::question_service::{IngestReport, QuestionService};

/// Payload for a generation model; field names match the JSON it expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusRequest {
    pub syllabus: String,
    /// Topics to weight more heavily, free text. May be empty.
    #[serde(default)]
    pub importance: String,
    pub question_ratio: String,
    pub num_questions: u32,
}

impl SyllabusRequest {
    pub const DEFAULT_QUESTION_RATIO: &'static str =
        "A balance of 50% practical/application and 50% theoretical/conceptual questions.";
    pub const DEFAULT_NUM_QUESTIONS: u32 = 5;
    pub const MAX_NUM_QUESTIONS: u32 = 10;

    #[must_use]
    pub fn new(syllabus: impl Into<String>) -> Self {
        Self {
            syllabus: syllabus.into(),
            importance: String::new(),
            question_ratio: Self::DEFAULT_QUESTION_RATIO.to_owned(),
            num_questions: Self::DEFAULT_NUM_QUESTIONS,
        }
    }

    #[must_use]
    pub fn with_importance(mut self, importance: impl Into<String>) -> Self {
        self.importance = importance.into();
        self
    }

    #[must_use]
    pub fn with_question_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.question_ratio = ratio.into();
        self
    }

    #[must_use]
    pub fn with_num_questions(mut self, count: u32) -> Self {
        self.num_questions = count;
        self
    }

    /// # Errors
    ///
    /// Returns `EmptySyllabus` for blank syllabus text and `QuestionCount`
    /// unless `num_questions` is between 1 and `MAX_NUM_QUESTIONS`.
    pub fn validate(&self) -> Result<(), QuestionGenerationError> {
        if self.syllabus.trim().is_empty() {
            return Err(QuestionGenerationError::EmptySyllabus);
        }
        if !(1..=Self::MAX_NUM_QUESTIONS).contains(&self.num_questions) {
            return Err(QuestionGenerationError::QuestionCount(self.num_questions));
        }
        Ok(())
    }
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &SyllabusRequest,
    ) -> Result<Vec<QuestionDraft>, QuestionGenerationError>;
}

/// Decode a model reply holding a JSON array of question drafts.
///
/// # Errors
///
/// Returns `QuestionGenerationError::Decode` if the reply is not such an array.
pub fn drafts_from_json(reply: &str) -> Result<Vec<QuestionDraft>, QuestionGenerationError> {
    Ok(serde_json::from_str(reply.trim())?)
}

#[derive(Clone)]
pub struct QuestionGenerationService {
    generator: Arc<dyn QuestionGenerator>,
    questions: QuestionService,
}

impl QuestionGenerationService {
    #[must_use]
    pub fn new(generator: Arc<dyn QuestionGenerator>, questions: QuestionService) -> Self {
        Self {
            generator,
            questions,
        }
    }

    /// Generate drafts for `request` and ingest them as model-generated.
    /// Drafts beyond `num_questions` are dropped.
    ///
    /// # Errors
    ///
    /// Returns the request's validation error before calling the generator,
    /// the generator's own error, or `Questions` if the bank rejects a write.
    pub async fn generate(
        &self,
        request: &SyllabusRequest,
    ) -> Result<IngestReport, QuestionGenerationError> {
        request.validate()?;

        let mut drafts = self.generator.generate(request).await?;
        let limit = usize::try_from(request.num_questions).unwrap_or(usize::MAX);
        if drafts.len() > limit {
            tracing::debug!(
                returned = drafts.len(),
                requested = limit,
                "dropping surplus generated questions"
            );
            drafts.truncate(limit);
        }
        for draft in &mut drafts {
            draft.source = QuestionSource::GeneratedByModel;
        }

        Ok(self.questions.ingest(drafts).await?)
    }
}
