use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mastery_core::graph::TopicGraph;
use mastery_core::learner::{LearnerError, LearnerProgress};
use mastery_core::model::{LearnerId, QuizAttempt, QuizSettings, Topic, TopicId};
use mastery_core::quiz::{AnswerFeedback, QuizSession, QuizStep};
use mastery_core::store::MasteryStore;
use storage::{ProgressRepository, QuestionBank, StorageError};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Result of advancing a quiz through the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAdvance {
    pub step: QuizStep,
    /// Row id of the stored attempt once the quiz completes.
    pub attempt_id: Option<i64>,
}

impl QuizAdvance {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.step, QuizStep::Complete(_))
    }
}

/// Orchestrates quiz start, answering and persisted completion for a learner.
///
/// Clones share one record of in-flight quizzes, so a learner loaded twice
/// still gets at most one active quiz.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    graph: Arc<TopicGraph>,
    questions: Arc<dyn QuestionBank>,
    progress: Arc<dyn ProgressRepository>,
    settings: QuizSettings,
    active: Arc<Mutex<BTreeMap<LearnerId, TopicId>>>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        graph: Arc<TopicGraph>,
        questions: Arc<dyn QuestionBank>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            graph,
            questions,
            progress,
            settings: QuizSettings::default(),
            active: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: QuizSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn graph(&self) -> &TopicGraph {
        &self.graph
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Rebuild a learner's progress from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the snapshot or history cannot be read.
    pub async fn load_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<LearnerProgress, ProgressServiceError> {
        let snapshot = self.progress.load_snapshot(learner_id).await?;
        let attempts = self
            .progress
            .list_attempts(learner_id)
            .await?
            .into_iter()
            .map(|row| row.attempt)
            .collect();
        Ok(LearnerProgress::from_parts(
            learner_id.clone(),
            snapshot,
            attempts,
        ))
    }

    #[must_use]
    pub fn current_topic(&self, learner: &LearnerProgress) -> Option<&Topic> {
        learner.current_topic(&self.graph)
    }

    /// Start a quiz on the learner's current topic.
    ///
    /// # Errors
    ///
    /// Returns `NothingToStudy` when no topic is selectable, otherwise the
    /// same errors as [`ProgressService::start_quiz_for`].
    pub async fn start_quiz<'l>(
        &self,
        learner: &'l mut LearnerProgress,
    ) -> Result<&'l QuizSession, ProgressServiceError> {
        let topic_id = self
            .current_topic(learner)
            .map(|topic| topic.id.clone())
            .ok_or(ProgressServiceError::NothingToStudy)?;
        self.start_quiz_for(learner, &topic_id).await
    }

    /// Start a quiz on a specific unlocked topic.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Learner` if a quiz is already active, the
    /// topic is unknown or locked, or the bank has no usable question for it.
    /// Returns `ProgressServiceError::Storage` if the question bank fails.
    pub async fn start_quiz_for<'l>(
        &self,
        learner: &'l mut LearnerProgress,
        topic_id: &TopicId,
    ) -> Result<&'l QuizSession, ProgressServiceError> {
        if let Some(active) = learner.active_quiz() {
            return Err(LearnerError::SessionAlreadyActive(active.topic_id().clone()).into());
        }
        let topic = self
            .graph
            .topic(topic_id)
            .ok_or_else(|| LearnerError::UnknownTopic(topic_id.clone()))?;

        let learner_id = learner.learner_id().clone();
        self.claim_session(&learner_id, topic_id)?;

        let questions = match self
            .questions
            .questions_for_topic(&topic.name, self.settings.question_limit())
            .await
        {
            Ok(questions) => questions,
            Err(err) => {
                self.release_session(&learner_id);
                return Err(err.into());
            }
        };
        tracing::debug!(topic = %topic_id, fetched = questions.len(), "fetched quiz questions");

        match learner.start_quiz(&self.graph, topic_id, questions, &self.settings) {
            Ok(session) => {
                tracing::info!(
                    learner = %learner_id,
                    topic = %topic_id,
                    questions = session.total_questions(),
                    "quiz started"
                );
                Ok(session)
            }
            Err(err) => {
                self.release_session(&learner_id);
                Err(err.into())
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Learner` without an active quiz or after it closed.
    pub fn answer_current(
        &self,
        learner: &mut LearnerProgress,
        answer: &str,
    ) -> Result<AnswerFeedback, ProgressServiceError> {
        Ok(learner.submit_answer(answer)?)
    }

    /// Move past the current question, persisting mastery and the attempt
    /// when the quiz completes.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Learner` without an active quiz.
    /// Returns `ProgressServiceError::Unsaved` with the quiz outcome if
    /// persistence fails; the in-memory progress is already committed and
    /// [`ProgressService::save_progress`] stores it later.
    pub async fn advance(
        &self,
        learner: &mut LearnerProgress,
    ) -> Result<QuizAdvance, ProgressServiceError> {
        let step = learner.advance(self.clock.now())?;
        let QuizStep::Complete(outcome) = &step else {
            return Ok(QuizAdvance {
                step,
                attempt_id: None,
            });
        };
        self.release_session(learner.learner_id());

        let attempt_id = match self.persist(learner).await {
            Ok(appended) => appended.last().copied(),
            Err(source) => {
                tracing::error!(
                    learner = %learner.learner_id(),
                    topic = %outcome.topic_id,
                    error = %source,
                    "completed quiz could not be saved"
                );
                return Err(ProgressServiceError::Unsaved {
                    outcome: Box::new(outcome.clone()),
                    source,
                });
            }
        };
        tracing::info!(
            learner = %learner.learner_id(),
            topic = %outcome.topic_id,
            correct = outcome.correct,
            total = outcome.total,
            mastery = %outcome.final_mastery,
            "quiz completed"
        );

        Ok(QuizAdvance { step, attempt_id })
    }

    /// Store the learner's committed mastery and any attempts the repository
    /// does not hold yet. Returns the row ids of the appended attempts.
    ///
    /// Stored mastery is merged, never lowered; the learner picks up the
    /// merged values afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the repository fails.
    pub async fn save_progress(
        &self,
        learner: &mut LearnerProgress,
    ) -> Result<Vec<i64>, ProgressServiceError> {
        Ok(self.persist(learner).await?)
    }

    /// Drop the active quiz; nothing is persisted. Returns whether one existed.
    pub fn abandon_quiz(&self, learner: &mut LearnerProgress) -> bool {
        let abandoned = learner.abandon_quiz().is_some();
        if abandoned {
            self.release_session(learner.learner_id());
        }
        abandoned
    }

    async fn persist(&self, learner: &mut LearnerProgress) -> Result<Vec<i64>, StorageError> {
        let learner_id = learner.learner_id().clone();

        let stored = self.progress.load_snapshot(&learner_id).await?;
        let mut merged = MasteryStore::from_snapshot(stored);
        merged.merge(&learner.snapshot());
        let snapshot = merged.snapshot();
        self.progress.save_snapshot(&learner_id, &snapshot).await?;
        learner.restore(snapshot);

        // Attempts are matched by value; each stored row accounts for one
        // in-memory attempt.
        let stored = self.progress.list_attempts(&learner_id).await?;
        let mut unmatched: Vec<&QuizAttempt> = stored.iter().map(|row| &row.attempt).collect();
        let mut appended = Vec::new();
        for attempt in learner.attempts() {
            if let Some(index) = unmatched.iter().position(|s| *s == attempt) {
                unmatched.swap_remove(index);
                continue;
            }
            appended.push(self.progress.append_attempt(&learner_id, attempt).await?);
        }

        tracing::debug!(learner = %learner_id, appended = appended.len(), "progress saved");
        Ok(appended)
    }

    fn sessions(&self) -> MutexGuard<'_, BTreeMap<LearnerId, TopicId>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim_session(&self, learner_id: &LearnerId, topic_id: &TopicId) -> Result<(), LearnerError> {
        match self.sessions().entry(learner_id.clone()) {
            Entry::Occupied(entry) => Err(LearnerError::SessionAlreadyActive(entry.get().clone())),
            Entry::Vacant(entry) => {
                entry.insert(topic_id.clone());
                Ok(())
            }
        }
    }

    fn release_session(&self, learner_id: &LearnerId) {
        self.sessions().remove(learner_id);
    }
}
