//! Per-learner mastery bookkeeping.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::{Mastery, TopicId};

/// Committed mastery per topic for one learner.
///
/// Values never decrease: a write below the current value is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasteryStore {
    values: HashMap<TopicId, Mastery>,
}

impl MasteryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_snapshot(snapshot: MasterySnapshot) -> Self {
        let mut store = Self::new();
        store.restore(snapshot);
        store
    }

    /// Mastery for `topic_id`; topics never attempted have zero mastery.
    #[must_use]
    pub fn get(&self, topic_id: &TopicId) -> Mastery {
        self.values.get(topic_id).copied().unwrap_or(Mastery::ZERO)
    }

    /// Raise the mastery of `topic_id` to `new_mastery`.
    ///
    /// Returns `true` when the stored value changed. Lower values are a no-op.
    pub fn update(&mut self, topic_id: &TopicId, new_mastery: Mastery) -> bool {
        let current = self.get(topic_id);
        if new_mastery < current {
            tracing::debug!(
                topic = %topic_id,
                %current,
                rejected = %new_mastery,
                "ignoring mastery regression"
            );
            return false;
        }
        if new_mastery == current && self.values.contains_key(topic_id) {
            return false;
        }
        tracing::debug!(topic = %topic_id, from = %current, to = %new_mastery, "mastery updated");
        self.values.insert(topic_id.clone(), new_mastery);
        new_mastery != current
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TopicId, Mastery)> {
        self.values.iter().map(|(id, m)| (id, *m))
    }

    #[must_use]
    pub fn snapshot(&self) -> MasterySnapshot {
        MasterySnapshot {
            entries: self.values.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    /// Raise every topic to at least its value in `snapshot`.
    ///
    /// Returns the number of topics that changed.
    pub fn merge(&mut self, snapshot: &MasterySnapshot) -> usize {
        snapshot
            .iter()
            .filter(|(topic_id, mastery)| self.update(topic_id, *mastery))
            .count()
    }

    /// Replace the store contents with `snapshot`.
    pub fn restore(&mut self, snapshot: MasterySnapshot) {
        self.values = snapshot.entries.into_iter().collect();
    }
}

/// Serializable copy of a `MasteryStore`, the hook for external persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterySnapshot {
    entries: BTreeMap<TopicId, Mastery>,
}

impl MasterySnapshot {
    #[must_use]
    pub fn get(&self, topic_id: &TopicId) -> Mastery {
        self.entries.get(topic_id).copied().unwrap_or(Mastery::ZERO)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TopicId, Mastery)> {
        self.entries.iter().map(|(id, m)| (id, *m))
    }
}

impl FromIterator<(TopicId, Mastery)> for MasterySnapshot {
    fn from_iter<T: IntoIterator<Item = (TopicId, Mastery)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
