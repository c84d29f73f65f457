//! Strength/weakness classification over mastery snapshots.
//!
//! The same function serves one learner (topic → mastery) and an instructor
//! cohort (student → mastery); only the labels differ.

use serde::{Deserialize, Serialize};

use crate::graph::TopicGraph;
use crate::model::Mastery;
use crate::store::MasteryStore;

/// A labelled mastery value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scored<L> {
    pub label: L,
    pub mastery: Mastery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification<L> {
    /// Mastery at or above the strength threshold, in input order.
    pub strengths: Vec<Scored<L>>,
    /// Mastery below the weakness threshold, lowest first.
    pub weaknesses: Vec<Scored<L>>,
    pub overall_mastery: Mastery,
}

impl<L> Default for Classification<L> {
    fn default() -> Self {
        Self {
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            overall_mastery: Mastery::ZERO,
        }
    }
}

/// Partition `snapshot` into strengths and weaknesses and average it.
pub fn classify<L, I>(snapshot: I) -> Classification<L>
where
    L: Clone,
    I: IntoIterator<Item = (L, Mastery)>,
{
    let entries: Vec<Scored<L>> = snapshot
        .into_iter()
        .map(|(label, mastery)| Scored { label, mastery })
        .collect();
    if entries.is_empty() {
        return Classification::default();
    }

    let strengths = entries
        .iter()
        .filter(|e| e.mastery.is_strong())
        .cloned()
        .collect();
    let mut weaknesses: Vec<_> = entries
        .iter()
        .filter(|e| e.mastery.is_weak())
        .cloned()
        .collect();
    weaknesses.sort_by_key(|e| e.mastery);

    Classification {
        strengths,
        weaknesses,
        overall_mastery: Mastery::mean(entries.iter().map(|e| e.mastery)),
    }
}

/// Classify every curriculum topic for one learner, labelled by topic name.
///
/// Topics never attempted count as zero mastery.
#[must_use]
pub fn classify_topics(graph: &TopicGraph, store: &MasteryStore) -> Classification<String> {
    classify(
        graph
            .topics()
            .map(|topic| (topic.name.clone(), store.get(&topic.id))),
    )
}
