//! One learner's progress: committed mastery, attempt history and the single
//! quiz that may be in flight.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::graph::TopicGraph;
use crate::model::{
    AttemptError, LearnerId, Question, QuizAttempt, QuizSettings, Topic, TopicId, TopicProgress,
};
use crate::quiz::{AnswerFeedback, QuizError, QuizSession, QuizStep};
use crate::selector::select_current;
use crate::store::{MasterySnapshot, MasteryStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerError {
    #[error("a quiz on topic {0} is already in progress")]
    SessionAlreadyActive(TopicId),
    #[error("no quiz is in progress")]
    NoActiveSession,
    #[error("unknown topic: {0}")]
    UnknownTopic(TopicId),
    #[error("topic {0} is locked until its prerequisites are mastered")]
    TopicLocked(TopicId),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
}

/// Progress state owned by exactly one learner.
#[derive(Debug)]
pub struct LearnerProgress {
    learner_id: LearnerId,
    mastery: MasteryStore,
    attempts: Vec<QuizAttempt>,
    active: Option<QuizSession>,
}

impl LearnerProgress {
    #[must_use]
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            mastery: MasteryStore::new(),
            attempts: Vec::new(),
            active: None,
        }
    }

    #[must_use]
    pub fn from_parts(
        learner_id: LearnerId,
        snapshot: MasterySnapshot,
        attempts: Vec<QuizAttempt>,
    ) -> Self {
        Self {
            learner_id,
            mastery: MasteryStore::from_snapshot(snapshot),
            attempts,
            active: None,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    /// Committed mastery. In-flight quiz progress is never visible here.
    #[must_use]
    pub fn mastery(&self) -> &MasteryStore {
        &self.mastery
    }

    #[must_use]
    pub fn snapshot(&self) -> MasterySnapshot {
        self.mastery.snapshot()
    }

    /// Replace committed mastery, e.g. after loading from storage.
    pub fn restore(&mut self, snapshot: MasterySnapshot) {
        self.mastery.restore(snapshot);
    }

    #[must_use]
    pub fn attempts(&self) -> &[QuizAttempt] {
        &self.attempts
    }

    #[must_use]
    pub fn active_quiz(&self) -> Option<&QuizSession> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn current_topic<'g>(&self, graph: &'g TopicGraph) -> Option<&'g Topic> {
        select_current(graph, &self.mastery)
    }

    #[must_use]
    pub fn learning_path<'g>(&self, graph: &'g TopicGraph) -> Vec<TopicProgress<'g>> {
        graph.learning_path(&self.mastery)
    }

    /// Start a quiz on `topic_id` with the first questions the source supplied.
    /// Questions filed under another topic name are dropped.
    ///
    /// # Errors
    ///
    /// - `SessionAlreadyActive` if another quiz is in progress
    /// - `UnknownTopic` / `TopicLocked` if the topic cannot be studied yet
    /// - `Quiz(InvalidSession)` if no question belongs to the topic
    pub fn start_quiz(
        &mut self,
        graph: &TopicGraph,
        topic_id: &TopicId,
        mut questions: Vec<Question>,
        settings: &QuizSettings,
    ) -> Result<&QuizSession, LearnerError> {
        if let Some(active) = &self.active {
            return Err(LearnerError::SessionAlreadyActive(active.topic_id().clone()));
        }
        let topic = graph
            .topic(topic_id)
            .ok_or_else(|| LearnerError::UnknownTopic(topic_id.clone()))?;
        if !graph.is_eligible(topic, &self.mastery) {
            return Err(LearnerError::TopicLocked(topic_id.clone()));
        }

        let supplied = questions.len();
        questions.retain(|q| q.topic() == topic.name);
        if questions.len() < supplied {
            tracing::warn!(
                topic = %topic_id,
                dropped = supplied - questions.len(),
                "ignoring questions from another topic"
            );
        }
        questions.truncate(settings.question_limit());
        let session = QuizSession::new(topic_id.clone(), self.mastery.get(topic_id), questions)?;
        Ok(self.active.insert(session))
    }

    /// # Errors
    ///
    /// Returns `NoActiveSession` without a quiz, or the quiz's own error.
    pub fn submit_answer(&mut self, candidate: &str) -> Result<AnswerFeedback, LearnerError> {
        let session = self.active.as_mut().ok_or(LearnerError::NoActiveSession)?;
        Ok(session.submit_answer(candidate)?)
    }

    /// Advance the active quiz; on completion commit its mastery and record
    /// the attempt, then discard the session.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` without a quiz, or the quiz's own error.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<QuizStep, LearnerError> {
        let session = self.active.as_mut().ok_or(LearnerError::NoActiveSession)?;
        let step = session.advance()?;

        if let QuizStep::Complete(outcome) = &step {
            let attempt = QuizAttempt::from_outcome(outcome, now)?;
            self.mastery.update(&outcome.topic_id, outcome.final_mastery);
            self.attempts.push(attempt);
            self.active = None;
        }

        Ok(step)
    }

    /// Drop the active quiz without committing anything.
    pub fn abandon_quiz(&mut self) -> Option<QuizSession> {
        let abandoned = self.active.take();
        if let Some(session) = &abandoned {
            tracing::debug!(
                learner = %self.learner_id,
                topic = %session.topic_id(),
                "quiz abandoned"
            );
        }
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mastery, QuestionDraft};
    use crate::time::fixed_now;

    fn build_graph() -> TopicGraph {
        TopicGraph::new(vec![
            Topic::new("A", "Alpha"),
            Topic::new("B", "Beta").with_prerequisite("A"),
        ])
        .unwrap()
    }

    fn build_questions(topic: &str, answers: &[&str]) -> Vec<Question> {
        answers
            .iter()
            .enumerate()
            .map(|(i, a)| {
                QuestionDraft::short_answer(topic, format!("Q{i}"), *a)
                    .validate()
                    .unwrap()
            })
            .collect()
    }

    fn take_quiz(learner: &mut LearnerProgress, graph: &TopicGraph, answers: &[&str], given: &[&str]) {
        let topic = learner.current_topic(graph).unwrap().id.clone();
        learner
            .start_quiz(graph, &topic, build_questions("Alpha", answers), &QuizSettings::default())
            .unwrap();
        for answer in given {
            learner.submit_answer(answer).unwrap();
            learner.advance(fixed_now()).unwrap();
        }
    }

    #[test]
    fn completed_quiz_commits_mastery_and_attempt() {
        let graph = build_graph();
        let mut learner = LearnerProgress::new(LearnerId::new("student1"));

        take_quiz(&mut learner, &graph, &["a", "b", "c"], &["a", "x", "c"]);

        assert_eq!(learner.mastery().get(&TopicId::new("A")).value(), 67);
        assert_eq!(learner.attempts().len(), 1);
        assert!(learner.active_quiz().is_none());
        assert_eq!(learner.current_topic(&graph).unwrap().id, TopicId::new("A"));
    }

    #[test]
    fn second_start_while_active_is_rejected() {
        let graph = build_graph();
        let mut learner = LearnerProgress::new(LearnerId::new("student1"));
        let topic = TopicId::new("A");
        learner
            .start_quiz(&graph, &topic, build_questions("Alpha", &["a"]), &QuizSettings::default())
            .unwrap();

        let err = learner
            .start_quiz(&graph, &topic, build_questions("Alpha", &["a"]), &QuizSettings::default())
            .unwrap_err();
        assert_eq!(err, LearnerError::SessionAlreadyActive(topic));
    }

    #[test]
    fn locked_and_unknown_topics_cannot_start() {
        let graph = build_graph();
        let mut learner = LearnerProgress::new(LearnerId::new("student1"));

        let err = learner
            .start_quiz(&graph, &TopicId::new("B"), build_questions("Beta", &["a"]), &QuizSettings::default())
            .unwrap_err();
        assert_eq!(err, LearnerError::TopicLocked(TopicId::new("B")));

        let err = learner
            .start_quiz(&graph, &TopicId::new("Z"), build_questions("Zeta", &["a"]), &QuizSettings::default())
            .unwrap_err();
        assert_eq!(err, LearnerError::UnknownTopic(TopicId::new("Z")));
    }

    #[test]
    fn quiz_is_clamped_to_configured_size() {
        let graph = build_graph();
        let mut learner = LearnerProgress::new(LearnerId::new("student1"));
        let session = learner
            .start_quiz(
                &graph,
                &TopicId::new("A"),
                build_questions("Alpha", &["a", "b", "c", "d", "e"]),
                &QuizSettings::default(),
            )
            .unwrap();
        assert_eq!(session.total_questions(), 3);
    }

    #[test]
    fn questions_from_other_topics_are_dropped() {
        let graph = build_graph();
        let mut learner = LearnerProgress::new(LearnerId::new("student1"));
        let mut questions = build_questions("Beta", &["x", "y"]);
        questions.extend(build_questions("Alpha", &["a"]));

        let session = learner
            .start_quiz(&graph, &TopicId::new("A"), questions, &QuizSettings::default())
            .unwrap();
        assert_eq!(session.total_questions(), 1);
        assert!(session.questions().iter().all(|q| q.topic() == "Alpha"));
    }

    #[test]
    fn only_off_topic_questions_cannot_start() {
        let graph = build_graph();
        let mut learner = LearnerProgress::new(LearnerId::new("student1"));

        let err = learner
            .start_quiz(&graph, &TopicId::new("A"), build_questions("Beta", &["x"]), &QuizSettings::default())
            .unwrap_err();
        assert_eq!(err, LearnerError::Quiz(QuizError::InvalidSession));
        assert!(learner.active_quiz().is_none());
    }

    #[test]
    fn in_flight_progress_is_not_committed() {
        let graph = build_graph();
        let mut learner = LearnerProgress::new(LearnerId::new("student1"));
        learner
            .start_quiz(&graph, &TopicId::new("A"), build_questions("Alpha", &["a", "b"]), &QuizSettings::default())
            .unwrap();
        learner.submit_answer("a").unwrap();
        learner.advance(fixed_now()).unwrap();

        assert_eq!(learner.mastery().get(&TopicId::new("A")), Mastery::ZERO);

        let abandoned = learner.abandon_quiz();
        assert!(abandoned.is_some());
        assert_eq!(learner.mastery().get(&TopicId::new("A")), Mastery::ZERO);
        assert!(learner.attempts().is_empty());
        assert_eq!(learner.submit_answer("b"), Err(LearnerError::NoActiveSession));
    }

    #[test]
    fn full_mastery_unlocks_dependent() {
        let graph = build_graph();
        let mut learner = LearnerProgress::new(LearnerId::new("student1"));

        take_quiz(&mut learner, &graph, &["a", "b"], &["a", "b"]);

        assert_eq!(learner.mastery().get(&TopicId::new("A")), Mastery::FULL);
        assert_eq!(learner.current_topic(&graph).unwrap().id, TopicId::new("B"));
    }
}
