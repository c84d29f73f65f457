use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::ids::TopicId;
use crate::model::mastery::Mastery;

/// A node of the curriculum graph.
///
/// Mastery is not stored here; it lives in the learner's `MasteryStore`
/// and is projected onto topics through `TopicProgress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    #[serde(default)]
    pub prerequisites: BTreeSet<TopicId>,
}

impl Topic {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: TopicId::new(id),
            name: name.into(),
            prerequisites: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_prerequisite(mut self, id: impl Into<String>) -> Self {
        self.prerequisites.insert(TopicId::new(id));
        self
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.prerequisites.is_empty()
    }
}

/// Where a topic sits on a learner's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Completed,
    Current,
    Unlocked,
    Locked,
}

/// A topic paired with the learner's committed mastery and path status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicProgress<'a> {
    pub topic: &'a Topic,
    pub mastery: Mastery,
    pub status: TopicStatus,
}

impl TopicProgress<'_> {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.mastery.is_complete()
    }
}
