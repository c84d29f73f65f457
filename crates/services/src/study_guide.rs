//! Personalized study guides built from a student's weak topics.
//!
//! Text generation sits behind [`StudyGuideGenerator`]; a model-backed
//! generator lives outside this crate. [`OutlineGenerator`] produces a plain
//! markdown outline and needs no network.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mastery_core::cohort::CohortMatrix;
use mastery_core::model::Mastery;

use crate::analytics_service::AnalyticsService;
use crate::error::StudyGuideError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakTopic {
    pub topic: String,
    pub mastery: Mastery,
}

/// Payload handed to a generator: the student and their weak topics, lowest
/// mastery first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGuideRequest {
    pub student_name: String,
    pub weak_topics: Vec<WeakTopic>,
}

impl StudyGuideRequest {
    /// # Errors
    ///
    /// Returns `StudyGuideError::UnknownStudent` if the cohort has no such row.
    pub fn from_cohort(cohort: &CohortMatrix, student: &str) -> Result<Self, StudyGuideError> {
        let weak = cohort
            .weak_topics(student)
            .ok_or_else(|| StudyGuideError::UnknownStudent(student.to_owned()))?;
        Ok(Self {
            student_name: student.to_owned(),
            weak_topics: weak
                .into_iter()
                .map(|scored| WeakTopic {
                    topic: scored.label,
                    mastery: scored.mastery,
                })
                .collect(),
        })
    }

    /// # Errors
    ///
    /// Returns `StudyGuideError::Encode` if serialization fails.
    pub fn to_json(&self) -> Result<String, StudyGuideError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGuide {
    pub student_name: String,
    pub study_guide: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyGuideOutcome {
    /// The student has no topic below the weakness threshold.
    NothingToReview,
    Guide(StudyGuide),
}

#[async_trait]
pub trait StudyGuideGenerator: Send + Sync {
    /// Produce guide text for a request with at least one weak topic.
    ///
    /// # Errors
    ///
    /// Returns `StudyGuideError::Generator` when the backend fails.
    async fn generate(&self, request: &StudyGuideRequest) -> Result<String, StudyGuideError>;
}

/// Offline generator: one section per weak topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineGenerator;

#[async_trait]
impl StudyGuideGenerator for OutlineGenerator {
    async fn generate(&self, request: &StudyGuideRequest) -> Result<String, StudyGuideError> {
        let mut out = format!("# Study guide for {}\n", request.student_name);
        for weak in &request.weak_topics {
            out.push_str(&format!(
                "\n## {topic} (mastery {mastery})\n\
                 - Revisit the core ideas of {topic}.\n\
                 - Work through the explanations of missed questions.\n\
                 - Retake the {topic} quiz until it reaches 100%.\n",
                topic = weak.topic,
                mastery = weak.mastery,
            ));
        }
        Ok(out)
    }
}

#[derive(Clone)]
pub struct StudyGuideService {
    analytics: AnalyticsService,
    generator: Arc<dyn StudyGuideGenerator>,
}

impl StudyGuideService {
    #[must_use]
    pub fn new(analytics: AnalyticsService, generator: Arc<dyn StudyGuideGenerator>) -> Self {
        Self {
            analytics,
            generator,
        }
    }

    /// Build a guide for `student` from the stored cohort.
    ///
    /// # Errors
    ///
    /// See [`StudyGuideService::generate_for`]; also `Analytics` if the cohort
    /// cannot be loaded.
    pub async fn for_student(&self, student: &str) -> Result<StudyGuideOutcome, StudyGuideError> {
        let cohort = self.analytics.cohort().await?;
        self.generate_for(&cohort, student).await
    }

    /// # Errors
    ///
    /// Returns `UnknownStudent` for a name not in `cohort`, `EmptyResponse`
    /// when the generator returns only whitespace, or the generator's error.
    pub async fn generate_for(
        &self,
        cohort: &CohortMatrix,
        student: &str,
    ) -> Result<StudyGuideOutcome, StudyGuideError> {
        let request = StudyGuideRequest::from_cohort(cohort, student)?;
        if request.weak_topics.is_empty() {
            tracing::info!(student, "no weak topics, skipping study guide");
            return Ok(StudyGuideOutcome::NothingToReview);
        }

        tracing::debug!(
            student,
            weak_topics = request.weak_topics.len(),
            "requesting study guide"
        );
        let text = self.generator.generate(&request).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(StudyGuideError::EmptyResponse);
        }

        Ok(StudyGuideOutcome::Guide(StudyGuide {
            student_name: request.student_name,
            study_guide: text.to_owned(),
        }))
    }
}
