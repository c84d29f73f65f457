use std::sync::Arc;

use serde::Serialize;

use mastery_core::analytics::{Classification, Scored, classify_topics};
use mastery_core::cohort::CohortMatrix;
use mastery_core::graph::TopicGraph;
use mastery_core::learner::LearnerProgress;
use mastery_core::model::{LearnerId, Mastery, TopicId, TopicStatus};
use mastery_core::trajectory::{MasteryTrajectory, Period};
use storage::ProgressRepository;

use crate::error::AnalyticsError;

/// Owned row of a learner's learning path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathEntry {
    pub topic_id: TopicId,
    pub name: String,
    pub mastery: Mastery,
    pub status: TopicStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearnerReport {
    pub learner_id: LearnerId,
    pub path: Vec<PathEntry>,
    pub classification: Classification<String>,
    pub attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortReport {
    pub students: Classification<String>,
    pub topic_averages: Vec<Scored<String>>,
}

/// Read-only views for learners and instructors.
#[derive(Clone)]
pub struct AnalyticsService {
    graph: Arc<TopicGraph>,
    progress: Arc<dyn ProgressRepository>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(graph: Arc<TopicGraph>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { graph, progress }
    }

    /// Report on in-memory progress, without touching storage.
    #[must_use]
    pub fn report_for(&self, learner: &LearnerProgress) -> LearnerReport {
        let path = learner
            .learning_path(&self.graph)
            .into_iter()
            .map(|entry| PathEntry {
                topic_id: entry.topic.id.clone(),
                name: entry.topic.name.clone(),
                mastery: entry.mastery,
                status: entry.status,
            })
            .collect();

        LearnerReport {
            learner_id: learner.learner_id().clone(),
            path,
            classification: classify_topics(&self.graph, learner.mastery()),
            attempts: learner.attempts().len(),
        }
    }

    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if the learner's data cannot be read.
    pub async fn learner_report(
        &self,
        learner_id: &LearnerId,
    ) -> Result<LearnerReport, AnalyticsError> {
        let snapshot = self.progress.load_snapshot(learner_id).await?;
        let attempts = self
            .progress
            .list_attempts(learner_id)
            .await?
            .into_iter()
            .map(|row| row.attempt)
            .collect();
        let learner = LearnerProgress::from_parts(learner_id.clone(), snapshot, attempts);
        Ok(self.report_for(&learner))
    }

    /// Student × topic matrix over every stored learner.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any snapshot cannot be read.
    pub async fn cohort(&self) -> Result<CohortMatrix, AnalyticsError> {
        let learners = self.progress.list_learners().await?;
        let mut snapshots = Vec::with_capacity(learners.len());
        for learner in learners {
            let snapshot = self.progress.load_snapshot(&learner).await?;
            snapshots.push((learner, snapshot));
        }
        tracing::debug!(learners = snapshots.len(), "cohort loaded");
        Ok(CohortMatrix::from_snapshots(
            &self.graph,
            snapshots.iter().map(|(learner, snapshot)| (learner, snapshot)),
        ))
    }

    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any snapshot cannot be read.
    pub async fn cohort_report(&self) -> Result<CohortReport, AnalyticsError> {
        let matrix = self.cohort().await?;
        Ok(CohortReport {
            students: matrix.classify_students(),
            topic_averages: matrix.topic_averages(),
        })
    }

    /// Every stored learner's overall mastery per `period`, replayed from
    /// their attempt history.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any history cannot be read.
    pub async fn trajectory(&self, period: Period) -> Result<MasteryTrajectory, AnalyticsError> {
        let learners = self.progress.list_learners().await?;
        let mut histories = Vec::with_capacity(learners.len());
        for learner in learners {
            let attempts: Vec<_> = self
                .progress
                .list_attempts(&learner)
                .await?
                .into_iter()
                .map(|row| row.attempt)
                .collect();
            histories.push((learner, attempts));
        }
        let trajectory = MasteryTrajectory::from_attempts(
            &self.graph,
            period,
            histories
                .iter()
                .map(|(learner, attempts)| (learner, attempts.as_slice())),
        );
        tracing::debug!(
            learners = histories.len(),
            points = trajectory.points().len(),
            "trajectory built"
        );
        Ok(trajectory)
    }
}
