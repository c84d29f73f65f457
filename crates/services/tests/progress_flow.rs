use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mastery_core::graph::TopicGraph;
use mastery_core::learner::{LearnerError, LearnerProgress};
use mastery_core::model::{
    LearnerId, Mastery, QuestionDraft, QuizAttempt, QuizSettings, Topic, TopicId,
};
use mastery_core::quiz::QuizStep;
use mastery_core::store::MasterySnapshot;
use mastery_core::time::fixed_now;
use services::{Clock, ProgressService, ProgressServiceError};
use storage::{AttemptRow, InMemoryRepository, ProgressRepository, StorageError};

fn build_graph() -> Arc<TopicGraph> {
    Arc::new(
        TopicGraph::new(vec![
            Topic::new("t1", "Intro"),
            Topic::new("t2", "Props").with_prerequisite("t1"),
        ])
        .unwrap(),
    )
}

fn build_repo() -> InMemoryRepository {
    let questions = [
        ("Intro", "a"),
        ("Intro", "b"),
        ("Intro", "c"),
        ("Intro", "d"),
        ("Props", "p"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (topic, answer))| {
        QuestionDraft::short_answer(*topic, format!("Q{i}"), *answer)
            .with_id(format!("q{i}"))
            .validate()
            .unwrap()
    })
    .collect();
    InMemoryRepository::with_questions(questions)
}

fn build_service(repo: &InMemoryRepository) -> ProgressService {
    ProgressService::new(
        Clock::fixed(fixed_now()),
        build_graph(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
}

/// Delegates to an in-memory repository but refuses the next snapshot write.
struct RefusesNextSave {
    inner: InMemoryRepository,
    refuse: AtomicBool,
}

#[async_trait]
impl ProgressRepository for RefusesNextSave {
    async fn load_snapshot(&self, learner: &LearnerId) -> Result<MasterySnapshot, StorageError> {
        self.inner.load_snapshot(learner).await
    }

    async fn save_snapshot(
        &self,
        learner: &LearnerId,
        snapshot: &MasterySnapshot,
    ) -> Result<(), StorageError> {
        if self.refuse.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Connection("write refused".to_owned()));
        }
        self.inner.save_snapshot(learner, snapshot).await
    }

    async fn append_attempt(
        &self,
        learner: &LearnerId,
        attempt: &QuizAttempt,
    ) -> Result<i64, StorageError> {
        self.inner.append_attempt(learner, attempt).await
    }

    async fn list_attempts(&self, learner: &LearnerId) -> Result<Vec<AttemptRow>, StorageError> {
        self.inner.list_attempts(learner).await
    }

    async fn list_learners(&self) -> Result<Vec<LearnerId>, StorageError> {
        self.inner.list_learners().await
    }
}

async fn answer_all(service: &ProgressService, learner: &mut LearnerProgress, answers: &[&str]) {
    for answer in answers {
        service.answer_current(learner, answer).unwrap();
        service.advance(learner).await.unwrap();
    }
}

#[tokio::test]
async fn completed_quiz_is_persisted_and_reloadable() {
    let repo = build_repo();
    let service = build_service(&repo);
    let learner_id = LearnerId::new("student1");
    let mut learner = service.load_learner(&learner_id).await.unwrap();

    let session = service.start_quiz(&mut learner).await.unwrap();
    assert_eq!(session.topic_id(), &TopicId::new("t1"));
    assert_eq!(session.total_questions(), 3);

    let mut last = None;
    for answer in ["a", "wrong", "C "] {
        service.answer_current(&mut learner, answer).unwrap();
        last = Some(service.advance(&mut learner).await.unwrap());
    }

    let last = last.unwrap();
    assert!(last.is_complete());
    assert!(last.attempt_id.is_some());
    let QuizStep::Complete(outcome) = last.step else {
        panic!("expected completion");
    };
    assert_eq!(outcome.final_mastery.value(), 67);

    let reloaded = service.load_learner(&learner_id).await.unwrap();
    assert_eq!(reloaded.mastery().get(&TopicId::new("t1")).value(), 67);
    assert_eq!(reloaded.attempts().len(), 1);
    assert_eq!(reloaded.attempts()[0].completed_at(), fixed_now());
}

#[tokio::test]
async fn lower_score_never_reduces_stored_mastery() {
    let repo = build_repo();
    let service = build_service(&repo).with_settings(QuizSettings::new(2).unwrap());
    let learner_id = LearnerId::new("student1");
    let mut learner = service.load_learner(&learner_id).await.unwrap();

    for answers in [["a", "x"], ["x", "y"]] {
        service.start_quiz(&mut learner).await.unwrap();
        for answer in answers {
            service.answer_current(&mut learner, answer).unwrap();
            service.advance(&mut learner).await.unwrap();
        }
    }

    let stored = repo.load_snapshot(&learner_id).await.unwrap();
    assert_eq!(stored.get(&TopicId::new("t1")).value(), 50);
    assert_eq!(repo.list_attempts(&learner_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn mastered_topic_unlocks_next_and_locked_topic_is_refused() {
    let repo = build_repo();
    let service = build_service(&repo);
    let mut learner = service.load_learner(&LearnerId::new("student1")).await.unwrap();

    let err = service
        .start_quiz_for(&mut learner, &TopicId::new("t2"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProgressServiceError::Learner(LearnerError::TopicLocked(_))
    ));

    service.start_quiz(&mut learner).await.unwrap();
    for answer in ["a", "b", "c"] {
        service.answer_current(&mut learner, answer).unwrap();
        service.advance(&mut learner).await.unwrap();
    }

    let next = service.start_quiz(&mut learner).await.unwrap();
    assert_eq!(next.topic_id(), &TopicId::new("t2"));
    assert_eq!(next.total_questions(), 1);
}

#[tokio::test]
async fn second_quiz_while_active_is_rejected_and_abandon_commits_nothing() {
    let repo = build_repo();
    let service = build_service(&repo);
    let learner_id = LearnerId::new("student1");
    let mut learner = service.load_learner(&learner_id).await.unwrap();

    service.start_quiz(&mut learner).await.unwrap();
    service.answer_current(&mut learner, "a").unwrap();
    service.advance(&mut learner).await.unwrap();

    let err = service.start_quiz(&mut learner).await.unwrap_err();
    assert!(matches!(
        err,
        ProgressServiceError::Learner(LearnerError::SessionAlreadyActive(_))
    ));

    assert!(service.abandon_quiz(&mut learner));
    assert!(!service.abandon_quiz(&mut learner));
    assert!(repo.load_snapshot(&learner_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn topic_without_questions_cannot_start() {
    let repo = InMemoryRepository::new();
    let service = build_service(&repo);
    let mut learner = service.load_learner(&LearnerId::new("student1")).await.unwrap();

    let err = service.start_quiz(&mut learner).await.unwrap_err();
    assert!(matches!(err, ProgressServiceError::Learner(LearnerError::Quiz(_))));
    assert!(learner.active_quiz().is_none());
}

#[tokio::test]
async fn fully_mastered_curriculum_has_nothing_to_study() {
    let repo = build_repo();
    let learner_id = LearnerId::new("student1");
    let done = [
        (TopicId::new("t1"), Mastery::FULL),
        (TopicId::new("t2"), Mastery::FULL),
    ]
    .into_iter()
    .collect();
    repo.save_snapshot(&learner_id, &done).await.unwrap();
    let service = build_service(&repo);
    let mut learner = service.load_learner(&learner_id).await.unwrap();

    let err = service.start_quiz(&mut learner).await.unwrap_err();
    assert!(matches!(err, ProgressServiceError::NothingToStudy));
}

#[tokio::test]
async fn learner_loaded_twice_gets_one_quiz_and_keeps_higher_mastery() {
    let repo = build_repo();
    let service = build_service(&repo);
    let learner_id = LearnerId::new("student1");
    let t1 = TopicId::new("t1");
    let mut first = service.load_learner(&learner_id).await.unwrap();
    let mut second = service.load_learner(&learner_id).await.unwrap();

    service.start_quiz(&mut first).await.unwrap();
    let err = service.start_quiz(&mut second).await.unwrap_err();
    assert!(matches!(
        err,
        ProgressServiceError::Learner(LearnerError::SessionAlreadyActive(_))
    ));

    answer_all(&service, &mut first, &["a", "b", "c"]).await;
    assert_eq!(repo.load_snapshot(&learner_id).await.unwrap().get(&t1), Mastery::FULL);

    service.start_quiz(&mut second).await.unwrap();
    answer_all(&service, &mut second, &["a", "x", "y"]).await;

    assert_eq!(repo.load_snapshot(&learner_id).await.unwrap().get(&t1), Mastery::FULL);
    assert_eq!(second.mastery().get(&t1), Mastery::FULL);
    assert_eq!(repo.list_attempts(&learner_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn abandoning_frees_the_learner_for_another_copy() {
    let repo = build_repo();
    let service = build_service(&repo);
    let learner_id = LearnerId::new("student1");
    let mut first = service.load_learner(&learner_id).await.unwrap();
    let mut second = service.load_learner(&learner_id).await.unwrap();

    service.start_quiz(&mut first).await.unwrap();
    assert!(service.abandon_quiz(&mut first));

    let session = service.start_quiz(&mut second).await.unwrap();
    assert_eq!(session.topic_id(), &TopicId::new("t1"));
}

#[tokio::test]
async fn failed_save_returns_outcome_and_retry_stores_the_attempt() {
    let repo = build_repo();
    let progress = Arc::new(RefusesNextSave {
        inner: repo.clone(),
        refuse: AtomicBool::new(true),
    });
    let service = ProgressService::new(
        Clock::fixed(fixed_now()),
        build_graph(),
        Arc::new(repo.clone()),
        progress,
    );
    let learner_id = LearnerId::new("student1");
    let mut learner = service.load_learner(&learner_id).await.unwrap();

    service.start_quiz(&mut learner).await.unwrap();
    answer_all(&service, &mut learner, &["a", "b"]).await;
    service.answer_current(&mut learner, "x").unwrap();
    let err = service.advance(&mut learner).await.unwrap_err();

    let ProgressServiceError::Unsaved { outcome, .. } = err else {
        panic!("expected an unsaved completion");
    };
    assert_eq!(outcome.final_mastery.value(), 67);
    assert_eq!(learner.attempts().len(), 1);
    assert!(repo.list_attempts(&learner_id).await.unwrap().is_empty());

    let appended = service.save_progress(&mut learner).await.unwrap();
    assert_eq!(appended.len(), 1);
    assert_eq!(repo.list_attempts(&learner_id).await.unwrap().len(), 1);
    assert_eq!(
        repo.load_snapshot(&learner_id).await.unwrap().get(&TopicId::new("t1")).value(),
        67
    );

    assert!(service.save_progress(&mut learner).await.unwrap().is_empty());
    service.start_quiz(&mut learner).await.unwrap();
}
