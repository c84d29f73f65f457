use async_trait::async_trait;
use mastery_core::model::{LearnerId, Question, QuestionId, QuizAttempt};
use mastery_core::store::{MasterySnapshot, MasteryStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Failures from a question bank or progress backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),
}

/// A stored attempt together with its append-order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRow {
    pub id: i64,
    pub learner_id: LearnerId,
    pub attempt: QuizAttempt,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: i64, learner_id: LearnerId, attempt: QuizAttempt) -> Self {
        Self {
            id,
            learner_id,
            attempt,
        }
    }
}

/// Source of validated questions, keyed by the topic name they belong to.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Up to `limit` questions for `topic_name`, in bank order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn questions_for_topic(
        &self,
        topic_name: &str,
        limit: usize,
    ) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Insert a question, or replace the one with the same id in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no question has this id.
    async fn delete_question(&self, id: &QuestionId) -> Result<(), StorageError>;
}

/// Persistence for per-learner mastery snapshots and attempt history.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Committed mastery for a learner; empty if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be read.
    async fn load_snapshot(&self, learner: &LearnerId) -> Result<MasterySnapshot, StorageError>;

    /// Merge `snapshot` into the stored one. Per topic the higher value
    /// wins, so a stale copy of a learner can never lower stored mastery.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_snapshot(
        &self,
        learner: &LearnerId,
        snapshot: &MasterySnapshot,
    ) -> Result<(), StorageError>;

    /// Append an attempt and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(
        &self,
        learner: &LearnerId,
        attempt: &QuizAttempt,
    ) -> Result<i64, StorageError>;

    /// Attempts for a learner, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the history cannot be read.
    async fn list_attempts(&self, learner: &LearnerId) -> Result<Vec<AttemptRow>, StorageError>;

    /// Every learner with a saved snapshot or attempt, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the repository cannot be read.
    async fn list_learners(&self) -> Result<Vec<LearnerId>, StorageError>;
}

#[derive(Debug, Default)]
struct AttemptLog {
    next_id: i64,
    rows: BTreeMap<LearnerId, Vec<AttemptRow>>,
}

/// Process-local question bank and progress log. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<Vec<Question>>>,
    snapshots: Arc<Mutex<BTreeMap<LearnerId, MasterySnapshot>>>,
    attempts: Arc<Mutex<AttemptLog>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with `questions`, e.g. from a curriculum file.
    #[must_use]
    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            questions: Arc::new(Mutex::new(questions)),
            ..Self::default()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

#[async_trait]
impl QuestionBank for InMemoryRepository {
    async fn questions_for_topic(
        &self,
        topic_name: &str,
        limit: usize,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = lock(&self.questions)?;
        Ok(guard
            .iter()
            .filter(|q| q.topic() == topic_name)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        Ok(lock(&self.questions)?.clone())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = lock(&self.questions)?;
        match guard.iter_mut().find(|q| q.id() == question.id()) {
            Some(existing) => {
                tracing::debug!(question = %question.id(), "replacing stored question");
                *existing = question.clone();
            }
            None => guard.push(question.clone()),
        }
        Ok(())
    }

    async fn delete_question(&self, id: &QuestionId) -> Result<(), StorageError> {
        let mut guard = lock(&self.questions)?;
        let index = guard
            .iter()
            .position(|q| q.id() == id)
            .ok_or(StorageError::NotFound)?;
        guard.remove(index);
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_snapshot(&self, learner: &LearnerId) -> Result<MasterySnapshot, StorageError> {
        let guard = lock(&self.snapshots)?;
        Ok(guard.get(learner).cloned().unwrap_or_default())
    }

    async fn save_snapshot(
        &self,
        learner: &LearnerId,
        snapshot: &MasterySnapshot,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.snapshots)?;
        let stored = guard.entry(learner.clone()).or_default();
        let mut merged = MasteryStore::from_snapshot(std::mem::take(stored));
        merged.merge(snapshot);
        *stored = merged.snapshot();
        Ok(())
    }

    async fn append_attempt(
        &self,
        learner: &LearnerId,
        attempt: &QuizAttempt,
    ) -> Result<i64, StorageError> {
        let mut log = lock(&self.attempts)?;
        log.next_id += 1;
        let id = log.next_id;
        log.rows
            .entry(learner.clone())
            .or_default()
            .push(AttemptRow::new(id, learner.clone(), attempt.clone()));
        Ok(id)
    }

    async fn list_attempts(&self, learner: &LearnerId) -> Result<Vec<AttemptRow>, StorageError> {
        let log = lock(&self.attempts)?;
        Ok(log.rows.get(learner).cloned().unwrap_or_default())
    }

    async fn list_learners(&self) -> Result<Vec<LearnerId>, StorageError> {
        let mut learners: Vec<LearnerId> = lock(&self.snapshots)?.keys().cloned().collect();
        learners.extend(lock(&self.attempts)?.rows.keys().cloned());
        learners.sort();
        learners.dedup();
        Ok(learners)
    }
}

/// Aggregates the question bank and progress repository behind trait objects
/// for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionBank>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        let questions: Arc<dyn QuestionBank> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            questions,
            progress,
        }
    }
}
