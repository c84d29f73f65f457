use std::sync::Arc;

use mastery_core::graph::TopicGraph;
use mastery_core::model::{Question, QuestionDraft, QuestionId};
use storage::{QuestionBank, StorageError};

use crate::error::QuestionServiceError;

/// What happened to a batch of drafts.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub accepted: Vec<QuestionId>,
    pub rejected: Vec<QuestionServiceError>,
}

/// Validates drafts from authors or a generation model before they reach the bank.
#[derive(Clone)]
pub struct QuestionService {
    graph: Arc<TopicGraph>,
    questions: Arc<dyn QuestionBank>,
}

impl QuestionService {
    #[must_use]
    pub fn new(graph: Arc<TopicGraph>, questions: Arc<dyn QuestionBank>) -> Self {
        Self { graph, questions }
    }

    fn check(&self, draft: QuestionDraft) -> Result<Question, QuestionServiceError> {
        if self.graph.topic_by_name(&draft.topic).is_none() {
            return Err(QuestionServiceError::UnknownTopic(draft.topic));
        }
        Ok(draft.validate()?)
    }

    /// Store every well-formed draft; malformed ones are reported, not stored.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if the bank rejects a write.
    pub async fn ingest(
        &self,
        drafts: Vec<QuestionDraft>,
    ) -> Result<IngestReport, QuestionServiceError> {
        let mut report = IngestReport::default();
        for draft in drafts {
            match self.check(draft) {
                Ok(question) => {
                    self.questions.upsert_question(&question).await?;
                    report.accepted.push(question.id().clone());
                }
                Err(err) => {
                    tracing::warn!(error = %err, "question rejected at ingestion");
                    report.rejected.push(err);
                }
            }
        }
        tracing::info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "questions ingested"
        );
        Ok(report)
    }

    /// Replace an existing question, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns `Storage(NotFound)` for an unknown id, or the validation error
    /// for a malformed draft.
    pub async fn update(
        &self,
        id: &QuestionId,
        mut draft: QuestionDraft,
    ) -> Result<Question, QuestionServiceError> {
        let exists = self
            .questions
            .list_questions()
            .await?
            .iter()
            .any(|q| q.id() == id);
        if !exists {
            return Err(StorageError::NotFound.into());
        }

        draft.id = Some(id.clone());
        let question = self.check(draft)?;
        self.questions.upsert_question(&question).await?;
        Ok(question)
    }

    /// # Errors
    ///
    /// Returns `Storage(NotFound)` for an unknown id.
    pub async fn delete(&self, id: &QuestionId) -> Result<(), QuestionServiceError> {
        Ok(self.questions.delete_question(id).await?)
    }

    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if the bank cannot be read.
    pub async fn list(&self) -> Result<Vec<Question>, QuestionServiceError> {
        Ok(self.questions.list_questions().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastery_core::model::{QuestionDefect, QuestionError, QuestionSource, Topic};
    use storage::InMemoryRepository;

    fn build_service() -> (QuestionService, InMemoryRepository) {
        let graph = TopicGraph::new(vec![Topic::new("t1", "Intro")]).unwrap();
        let repo = InMemoryRepository::new();
        (QuestionService::new(Arc::new(graph), Arc::new(repo.clone())), repo)
    }

    #[tokio::test]
    async fn ingest_splits_accepted_and_rejected() {
        let (service, repo) = build_service();
        let drafts = vec![
            QuestionDraft::short_answer("Intro", "What is JSX?", "syntax extension")
                .with_source(QuestionSource::GeneratedByModel),
            QuestionDraft::multiple_choice("Intro", "Pick", vec!["a".into(), "b".into()], "c"),
            QuestionDraft::short_answer("Hooks", "useState?", "state"),
        ];

        let report = service.ingest(drafts).await.unwrap();

        assert_eq!(report.accepted.len(), 1);
        assert!(matches!(
            report.rejected[0],
            QuestionServiceError::Question(QuestionError::MalformedQuestion {
                defect: QuestionDefect::AnswerNotInOptions,
                ..
            })
        ));
        assert!(matches!(&report.rejected[1], QuestionServiceError::UnknownTopic(t) if t == "Hooks"));
        assert_eq!(repo.list_questions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_keeps_id_and_requires_existing_question() {
        let (service, _repo) = build_service();
        let report = service
            .ingest(vec![QuestionDraft::short_answer("Intro", "Q", "a").with_id("q1")])
            .await
            .unwrap();
        let id = report.accepted[0].clone();

        let updated = service
            .update(&id, QuestionDraft::short_answer("Intro", "Q edited", "b"))
            .await
            .unwrap();
        assert_eq!(updated.id(), &id);
        assert_eq!(service.list().await.unwrap()[0].text(), "Q edited");

        let err = service
            .update(&QuestionId::new("missing"), QuestionDraft::short_answer("Intro", "Q", "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionServiceError::Storage(StorageError::NotFound)));
    }
}
