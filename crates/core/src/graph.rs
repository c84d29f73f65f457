//! Curriculum graph: topics, prerequisite edges and unlock rules.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::model::{Topic, TopicId, TopicProgress, TopicStatus};
use crate::selector::select_current;
use crate::store::MasteryStore;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    #[error("topic {0} is defined more than once")]
    DuplicateTopic(TopicId),

    #[error("prerequisite cycle: {}", format_path(.path))]
    Cycle { path: Vec<TopicId> },
}

fn format_path(path: &[TopicId]) -> String {
    path.iter()
        .map(TopicId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

//
// ─── GRAPH ─────────────────────────────────────────────────────────────────────
//

/// Validated prerequisite DAG over the curriculum topics.
///
/// Topics keep their authoring order, which is the order the progress
/// selector scans in. Prerequisite ids that name no topic are kept as-is and
/// simply never count as met.
#[derive(Debug, Clone, Default)]
pub struct TopicGraph {
    order: Vec<TopicId>,
    topics: HashMap<TopicId, Topic>,
    dependents: HashMap<TopicId, BTreeSet<TopicId>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl TopicGraph {
    /// Build the graph, rejecting duplicate ids and prerequisite cycles.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::DuplicateTopic` or `GraphError::Cycle`.
    pub fn new(topics: impl IntoIterator<Item = Topic>) -> Result<Self, GraphError> {
        let mut graph = Self::default();

        for topic in topics {
            if graph.topics.contains_key(&topic.id) {
                return Err(GraphError::DuplicateTopic(topic.id));
            }
            for prereq in &topic.prerequisites {
                graph
                    .dependents
                    .entry(prereq.clone())
                    .or_default()
                    .insert(topic.id.clone());
            }
            graph.order.push(topic.id.clone());
            graph.topics.insert(topic.id.clone(), topic);
        }

        if let Some(path) = graph.find_cycle() {
            return Err(GraphError::Cycle { path });
        }

        for (topic, missing) in graph.dangling_prerequisites() {
            tracing::warn!(
                topic = %topic,
                prerequisite = %missing,
                "prerequisite names no topic; topic stays locked"
            );
        }

        Ok(graph)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Topics in authoring order.
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.order.iter().filter_map(|id| self.topics.get(id))
    }

    #[must_use]
    pub fn topic(&self, id: &TopicId) -> Option<&Topic> {
        self.topics.get(id)
    }

    #[must_use]
    pub fn topic_by_name(&self, name: &str) -> Option<&Topic> {
        self.topics().find(|t| t.name == name)
    }

    #[must_use]
    pub fn contains(&self, id: &TopicId) -> bool {
        self.topics.contains_key(id)
    }

    /// Topics that list `id` as a direct prerequisite.
    pub fn dependents(&self, id: &TopicId) -> impl Iterator<Item = &TopicId> {
        self.dependents.get(id).into_iter().flatten()
    }

    /// `(topic, missing prerequisite)` pairs for references to unknown topics.
    #[must_use]
    pub fn dangling_prerequisites(&self) -> Vec<(&TopicId, &TopicId)> {
        self.topics()
            .flat_map(|topic| {
                topic
                    .prerequisites
                    .iter()
                    .filter(|p| !self.topics.contains_key(*p))
                    .map(move |p| (&topic.id, p))
            })
            .collect()
    }

    /// True iff every prerequisite of `topic` is a known topic at full mastery.
    #[must_use]
    pub fn is_eligible(&self, topic: &Topic, store: &MasteryStore) -> bool {
        topic
            .prerequisites
            .iter()
            .all(|p| self.topics.contains_key(p) && store.get(p).is_complete())
    }

    #[must_use]
    pub fn is_complete(&self, topic: &Topic, store: &MasteryStore) -> bool {
        store.get(&topic.id).is_complete()
    }

    /// Every topic with its mastery and status, in authoring order.
    #[must_use]
    pub fn learning_path(&self, store: &MasteryStore) -> Vec<TopicProgress<'_>> {
        let current = select_current(self, store).map(|t| &t.id);
        self.topics()
            .map(|topic| {
                let mastery = store.get(&topic.id);
                let status = if mastery.is_complete() {
                    TopicStatus::Completed
                } else if Some(&topic.id) == current {
                    TopicStatus::Current
                } else if self.is_eligible(topic, store) {
                    TopicStatus::Unlocked
                } else {
                    TopicStatus::Locked
                };
                TopicProgress {
                    topic,
                    mastery,
                    status,
                }
            })
            .collect()
    }

    /// Depth-first walk over prerequisite edges with an explicit stack, so
    /// long chains cannot exhaust the thread stack.
    fn find_cycle(&self) -> Option<Vec<TopicId>> {
        let mut marks: HashMap<&TopicId, Mark> = HashMap::new();

        for root in &self.order {
            if marks.contains_key(root) {
                continue;
            }
            // Each frame is a topic and the index of its next prerequisite.
            let mut stack: Vec<(&TopicId, usize)> = vec![(root, 0)];
            marks.insert(root, Mark::Visiting);

            while let Some((id, next)) = stack.last_mut() {
                let prereq = self
                    .topics
                    .get(*id)
                    .and_then(|topic| topic.prerequisites.iter().nth(*next));
                let Some(prereq) = prereq else {
                    marks.insert(*id, Mark::Done);
                    stack.pop();
                    continue;
                };
                *next += 1;

                match marks.get(prereq) {
                    Some(Mark::Done) => {}
                    Some(Mark::Visiting) => {
                        let start = stack.iter().position(|(s, _)| *s == prereq).unwrap_or(0);
                        let mut path: Vec<TopicId> =
                            stack[start..].iter().map(|(s, _)| (*s).clone()).collect();
                        path.push(prereq.clone());
                        return Some(path);
                    }
                    // Dangling prerequisites are reported separately.
                    None if !self.topics.contains_key(prereq) => {}
                    None => {
                        marks.insert(prereq, Mark::Visiting);
                        stack.push((prereq, 0));
                    }
                }
            }
        }
        None
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
