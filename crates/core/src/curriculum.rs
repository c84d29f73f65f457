//! Curriculum documents: topics plus an optional question bank, as JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{GraphError, TopicGraph};
use crate::model::{Question, QuestionDraft, QuestionError, Topic};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("invalid curriculum document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// On-disk shape of a curriculum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumDocument {
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

/// A loaded curriculum with a validated graph and the questions that passed
/// ingestion.
#[derive(Debug, Clone)]
pub struct Curriculum {
    pub graph: TopicGraph,
    pub questions: Vec<Question>,
    pub rejected: Vec<QuestionError>,
}

impl Curriculum {
    /// # Errors
    ///
    /// Returns `Parse` for malformed JSON and `Graph` for duplicate topics or
    /// prerequisite cycles. Malformed questions are collected in `rejected`.
    pub fn from_json(json: &str) -> Result<Self, CurriculumError> {
        let document: CurriculumDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// # Errors
    ///
    /// Returns `Graph` for duplicate topics or prerequisite cycles.
    pub fn from_document(document: CurriculumDocument) -> Result<Self, CurriculumError> {
        let graph = TopicGraph::new(document.topics)?;

        let mut questions = Vec::new();
        let mut rejected = Vec::new();
        for draft in document.questions {
            if graph.topic_by_name(&draft.topic).is_none() {
                tracing::warn!(topic = %draft.topic, "question names no curriculum topic, skipping");
                continue;
            }
            match draft.validate() {
                Ok(question) => questions.push(question),
                Err(err) => {
                    tracing::warn!(error = %err, "rejecting malformed question");
                    rejected.push(err);
                }
            }
        }

        Ok(Self {
            graph,
            questions,
            rejected,
        })
    }
}
