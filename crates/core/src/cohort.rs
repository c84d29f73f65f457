//! Instructor view over many learners: a student × topic mastery matrix.

use serde::{Deserialize, Serialize};

use crate::analytics::{Classification, Scored, classify};
use crate::graph::TopicGraph;
use crate::model::{LearnerId, Mastery};
use crate::store::MasterySnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicScore {
    pub topic: String,
    pub mastery: Mastery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortRow {
    pub student: String,
    pub scores: Vec<TopicScore>,
}

impl CohortRow {
    #[must_use]
    pub fn overall(&self) -> Mastery {
        Mastery::mean(self.scores.iter().map(|s| s.mastery))
    }

    #[must_use]
    pub fn classify(&self) -> Classification<String> {
        classify(self.scores.iter().map(|s| (s.topic.clone(), s.mastery)))
    }
}

/// Rows keep insertion order; topics within a row keep their given order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CohortMatrix {
    rows: Vec<CohortRow>,
}

impl CohortMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per learner, topics in curriculum order and labelled by name.
    #[must_use]
    pub fn from_snapshots<'a, I>(graph: &TopicGraph, snapshots: I) -> Self
    where
        I: IntoIterator<Item = (&'a LearnerId, &'a MasterySnapshot)>,
    {
        let mut matrix = Self::new();
        for (learner, snapshot) in snapshots {
            let scores = graph
                .topics()
                .map(|topic| TopicScore {
                    topic: topic.name.clone(),
                    mastery: snapshot.get(&topic.id),
                })
                .collect();
            matrix.push_row(learner.to_string(), scores);
        }
        matrix
    }

    /// Add a student's row, replacing any existing row for the same student.
    pub fn push_row(&mut self, student: impl Into<String>, scores: Vec<TopicScore>) {
        let student = student.into();
        match self.rows.iter_mut().find(|r| r.student == student) {
            Some(row) => row.scores = scores,
            None => self.rows.push(CohortRow { student, scores }),
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[CohortRow] {
        &self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn students(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.student.as_str())
    }

    #[must_use]
    pub fn student(&self, name: &str) -> Option<&CohortRow> {
        self.rows.iter().find(|r| r.student == name)
    }

    /// A student's topics below the weakness threshold, lowest first.
    #[must_use]
    pub fn weak_topics(&self, name: &str) -> Option<Vec<Scored<String>>> {
        self.student(name).map(|row| row.classify().weaknesses)
    }

    /// Each student with their overall mastery, ready for `classify`.
    #[must_use]
    pub fn student_overview(&self) -> Vec<(String, Mastery)> {
        self.rows
            .iter()
            .map(|r| (r.student.clone(), r.overall()))
            .collect()
    }

    #[must_use]
    pub fn classify_students(&self) -> Classification<String> {
        classify(self.student_overview())
    }

    /// Rounded cohort mean per topic, topics in first-seen order.
    #[must_use]
    pub fn topic_averages(&self) -> Vec<Scored<String>> {
        let mut order: Vec<&str> = Vec::new();
        for score in self.rows.iter().flat_map(|r| &r.scores) {
            if !order.contains(&score.topic.as_str()) {
                order.push(&score.topic);
            }
        }

        order
            .into_iter()
            .map(|topic| Scored {
                label: topic.to_owned(),
                mastery: Mastery::mean(
                    self.rows
                        .iter()
                        .flat_map(|r| &r.scores)
                        .filter(|s| s.topic == topic)
                        .map(|s| s.mastery),
                ),
            })
            .collect()
    }
}
