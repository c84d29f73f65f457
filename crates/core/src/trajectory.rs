//! Cohort mastery over time, replayed from attempt history.
//!
//! Buckets start at the earliest attempt in the cohort. Each point holds every
//! student's overall mastery as it stood when the bucket closed.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::TopicGraph;
use crate::model::{LearnerId, Mastery, QuizAttempt};
use crate::store::MasteryStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Day,
    #[default]
    Week,
}

impl Period {
    #[must_use]
    pub fn length(self) -> Duration {
        match self {
            Period::Day => Duration::days(1),
            Period::Week => Duration::weeks(1),
        }
    }

    /// 1-based label, e.g. `Week 3`.
    #[must_use]
    pub fn label(self, index: usize) -> String {
        match self {
            Period::Day => format!("Day {}", index + 1),
            Period::Week => format!("Week {}", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub period: String,
    /// Exclusive end of the bucket.
    pub ends_at: DateTime<Utc>,
    pub students: BTreeMap<String, Mastery>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasteryTrajectory {
    points: Vec<TrajectoryPoint>,
}

impl MasteryTrajectory {
    /// Replay each learner's attempts in completion order, one point per
    /// period from the first attempt to the last. Overall mastery averages
    /// every curriculum topic, so unattempted topics count as zero.
    #[must_use]
    pub fn from_attempts<'a, I>(graph: &TopicGraph, period: Period, histories: I) -> Self
    where
        I: IntoIterator<Item = (&'a LearnerId, &'a [QuizAttempt])>,
    {
        let histories: Vec<(&LearnerId, Vec<&QuizAttempt>)> = histories
            .into_iter()
            .map(|(learner, attempts)| {
                let mut ordered: Vec<&QuizAttempt> = attempts.iter().collect();
                ordered.sort_by_key(|attempt| attempt.completed_at());
                (learner, ordered)
            })
            .collect();

        let completed = histories
            .iter()
            .flat_map(|(_, attempts)| attempts.iter().map(|a| a.completed_at()));
        let (Some(first), Some(last)) = (completed.clone().min(), completed.max()) else {
            return Self::default();
        };

        let length = period.length();
        let buckets = (last - first).num_seconds() / length.num_seconds() + 1;
        let buckets = usize::try_from(buckets).unwrap_or(1);

        let mut replay: Vec<(MasteryStore, usize)> = vec![(MasteryStore::new(), 0); histories.len()];
        let mut points = Vec::with_capacity(buckets);
        let mut ends_at = first;
        for index in 0..buckets {
            ends_at += length;
            let mut students = BTreeMap::new();
            for ((learner, attempts), (store, next)) in histories.iter().zip(replay.iter_mut()) {
                while let Some(attempt) = attempts.get(*next).filter(|a| a.completed_at() < ends_at) {
                    store.update(attempt.topic_id(), attempt.mastery_after());
                    *next += 1;
                }
                let overall = Mastery::mean(graph.topics().map(|topic| store.get(&topic.id)));
                students.insert(learner.to_string(), overall);
            }
            points.push(TrajectoryPoint {
                period: period.label(index),
                ends_at,
                students,
            });
        }

        Self { points }
    }

    #[must_use]
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// One student's overall mastery per period; zero where they are absent.
    #[must_use]
    pub fn series(&self, student: &str) -> Vec<Mastery> {
        self.points
            .iter()
            .map(|point| point.students.get(student).copied().unwrap_or(Mastery::ZERO))
            .collect()
    }
}
