use crate::graph::TopicGraph;
use crate::model::Topic;
use crate::store::MasteryStore;

/// The topic a learner should work on next.
///
/// Scans in authoring order and returns the first topic that is both
/// incomplete and eligible. `None` means everything reachable is mastered,
/// or the remaining topics are blocked by prerequisites that cannot be met.
#[must_use]
pub fn select_current<'g>(graph: &'g TopicGraph, store: &MasteryStore) -> Option<&'g Topic> {
    graph
        .topics()
        .find(|topic| !graph.is_complete(topic, store) && graph.is_eligible(topic, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mastery, TopicId};

    fn two_topics() -> TopicGraph {
        TopicGraph::new(vec![
            Topic::new("A", "A"),
            Topic::new("B", "B").with_prerequisite("A"),
        ])
        .unwrap()
    }

    fn selected(graph: &TopicGraph, store: &MasteryStore) -> Option<String> {
        select_current(graph, store).map(|t| t.id.to_string())
    }

    #[test]
    fn starts_with_first_root() {
        let graph = two_topics();
        assert_eq!(selected(&graph, &MasteryStore::new()).as_deref(), Some("A"));
    }

    #[test]
    fn partial_mastery_does_not_unlock_dependents() {
        let graph = two_topics();
        let mut store = MasteryStore::new();
        store.update(&TopicId::new("A"), Mastery::new(67).unwrap());
        assert_eq!(selected(&graph, &store).as_deref(), Some("A"));

        store.update(&TopicId::new("A"), Mastery::new(99).unwrap());
        assert_eq!(selected(&graph, &store).as_deref(), Some("A"));
    }

    #[test]
    fn full_mastery_moves_to_next_topic() {
        let graph = two_topics();
        let mut store = MasteryStore::new();
        store.update(&TopicId::new("A"), Mastery::FULL);
        assert_eq!(selected(&graph, &store).as_deref(), Some("B"));

        store.update(&TopicId::new("B"), Mastery::FULL);
        assert_eq!(selected(&graph, &store), None);
    }

    #[test]
    fn order_comes_from_curriculum_not_mastery_or_name() {
        let graph = TopicGraph::new(vec![
            Topic::new("z", "Zeta"),
            Topic::new("a", "Alpha"),
        ])
        .unwrap();
        let mut store = MasteryStore::new();
        store.update(&TopicId::new("z"), Mastery::new(90).unwrap());

        for _ in 0..3 {
            assert_eq!(selected(&graph, &store).as_deref(), Some("z"));
        }
    }

    #[test]
    fn blocked_remainder_yields_none() {
        let graph = TopicGraph::new(vec![
            Topic::new("a", "A"),
            Topic::new("b", "B").with_prerequisite("missing"),
        ])
        .unwrap();
        let mut store = MasteryStore::new();
        store.update(&TopicId::new("a"), Mastery::FULL);
        assert_eq!(selected(&graph, &store), None);
    }

    #[test]
    fn never_selects_topic_with_unmet_prerequisite() {
        let graph = TopicGraph::new(vec![
            Topic::new("a", "A"),
            Topic::new("b", "B"),
            Topic::new("c", "C").with_prerequisite("a").with_prerequisite("b"),
        ])
        .unwrap();

        for a in [0, 50, 100] {
            for b in [0, 99, 100] {
                let mut store = MasteryStore::new();
                store.update(&TopicId::new("a"), Mastery::new(a).unwrap());
                store.update(&TopicId::new("b"), Mastery::new(b).unwrap());
                if let Some(topic) = select_current(&graph, &store) {
                    assert!(graph.is_eligible(topic, &store));
                    assert!(!store.get(&topic.id).is_complete());
                }
            }
        }
    }
}
