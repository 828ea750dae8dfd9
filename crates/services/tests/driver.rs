use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{QuestionDraft, QuizDraft, QuizId};
use quiz_core::time::fixed_now;
use services::sessions::SessionPhase;
use services::{
    Clock, FullscreenProctor, HeadlessProctor, Identity, IdentityProvider, ProctorError,
    QuizAttemptService, SessionCommand, SessionDriver, SessionError, SessionMode, SessionNotice,
    SubmitTrigger, ViolationChoice,
};
use storage::repository::{InMemoryRepository, QuizRepository, ResultRepository};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Default)]
struct RecordingProctor {
    deny: bool,
    enters: AtomicUsize,
    exits: AtomicUsize,
}

#[async_trait]
impl FullscreenProctor for RecordingProctor {
    async fn enter(&self) -> Result<(), ProctorError> {
        self.enters.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(ProctorError::Denied("blocked by host".into()));
        }
        Ok(())
    }

    async fn exit(&self) -> Result<(), ProctorError> {
        self.exits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct SignedIn(&'static str);

#[async_trait]
impl IdentityProvider for SignedIn {
    async fn current_user(&self) -> Option<Identity> {
        Some(Identity {
            name: self.0.to_owned(),
        })
    }
}

async fn setup(
    time_limit: u32,
    identity: Arc<dyn IdentityProvider>,
) -> (InMemoryRepository, Arc<QuizAttemptService>) {
    let repo = InMemoryRepository::new();
    let quiz = QuizDraft {
        title: "Physics Fundamentals".into(),
        time_limit,
        questions: vec![
            QuestionDraft::new(1, "Unit of force?", vec!["N".into(), "J".into()], 0),
            QuestionDraft::new(2, "Speed of light?", vec!["c".into(), "g".into()], 0),
        ],
        ..QuizDraft::default()
    }
    .validate(QuizId::new("2"), fixed_now())
    .unwrap();
    repo.upsert_quiz(&quiz).await.unwrap();

    let attempts = Arc::new(QuizAttemptService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        identity,
    ));
    (repo, attempts)
}

/// Receive notices until `pick` returns something.
async fn wait_for<T>(
    notices: &mut UnboundedReceiver<SessionNotice>,
    mut pick: impl FnMut(&SessionNotice) -> Option<T>,
) -> T {
    loop {
        let notice = notices.recv().await.expect("driver closed early");
        if let Some(found) = pick(&notice) {
            return found;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn exam_times_out_and_auto_saves() {
    let (repo, attempts) = setup(1, Arc::new(SignedIn("PhysicsPhenom"))).await;
    let proctor = Arc::new(RecordingProctor::default());
    let (handle, mut notices) =
        SessionDriver::spawn(attempts, proctor.clone(), &QuizId::new("2"), SessionMode::Exam)
            .await
            .unwrap();

    let restored = wait_for(&mut notices, |n| match n {
        SessionNotice::Opened { restored } => Some(*restored),
        _ => None,
    })
    .await;
    assert!(!restored);

    handle.send(SessionCommand::StartExam).await.unwrap();
    handle.send(SessionCommand::Select(0)).await.unwrap();

    let mut countdown = Vec::new();
    let report = wait_for(&mut notices, |n| match n {
        SessionNotice::Countdown(left) => {
            countdown.push(*left);
            None
        }
        SessionNotice::Submitted(report) => Some(report.clone()),
        _ => None,
    })
    .await;

    assert_eq!(countdown.first(), Some(&59));
    assert_eq!(countdown.last(), Some(&1));
    assert_eq!(countdown.len(), 59);
    assert_eq!(report.trigger, SubmitTrigger::Timeout);
    assert_eq!(report.score.percent, 50);

    let saved = wait_for(&mut notices, |n| match n {
        SessionNotice::ResultSaved(record) => Some(record.clone()),
        _ => None,
    })
    .await;
    assert_eq!(saved.username(), "PhysicsPhenom");
    assert_eq!(repo.list_results().await.unwrap().len(), 1);
    assert_eq!(proctor.enters.load(Ordering::SeqCst), 1);
    assert_eq!(proctor.exits.load(Ordering::SeqCst), 1);

    // No ticks after submission.
    tokio::time::sleep(Duration::from_secs(5)).await;
    while let Ok(notice) = notices.try_recv() {
        assert!(!matches!(notice, SessionNotice::Countdown(_)));
    }

    handle.send(SessionCommand::Leave).await.unwrap();
    handle.closed().await;
}

#[tokio::test(start_paused = true)]
async fn fullscreen_violation_can_resume_then_end() {
    let (_repo, attempts) = setup(0, Arc::new(services::StaticIdentity::anonymous())).await;
    let (handle, mut notices) = SessionDriver::spawn(
        attempts,
        Arc::new(HeadlessProctor),
        &QuizId::new("2"),
        SessionMode::Exam,
    )
    .await
    .unwrap();

    handle.send(SessionCommand::StartExam).await.unwrap();
    handle
        .send(SessionCommand::FullscreenChanged { active: false })
        .await
        .unwrap();
    wait_for(&mut notices, |n| matches!(n, SessionNotice::ViolationRaised).then_some(())).await;

    // A second exit while one is pending raises nothing new.
    handle
        .send(SessionCommand::FullscreenChanged { active: false })
        .await
        .unwrap();
    handle
        .send(SessionCommand::ResolveViolation(ViolationChoice::ReturnToFullscreen))
        .await
        .unwrap();
    let snapshot = wait_for(&mut notices, |n| match n {
        SessionNotice::ViolationRaised => panic!("violation raised twice"),
        SessionNotice::State(s) if !s.violation_pending && s.fullscreen_active => Some(s.clone()),
        _ => None,
    })
    .await;
    assert_eq!(snapshot.phase, SessionPhase::InProgress);

    handle
        .send(SessionCommand::FullscreenChanged { active: false })
        .await
        .unwrap();
    handle
        .send(SessionCommand::ResolveViolation(ViolationChoice::EndExam))
        .await
        .unwrap();
    let report = wait_for(&mut notices, |n| match n {
        SessionNotice::Submitted(report) => Some(report.clone()),
        _ => None,
    })
    .await;
    assert_eq!(report.trigger, SubmitTrigger::Violation);
    assert_eq!(report.unanswered, 2);

    handle.send(SessionCommand::Leave).await.unwrap();
    handle.closed().await;
}

#[tokio::test(start_paused = true)]
async fn pending_violation_rejects_answers_and_submit() {
    let (_repo, attempts) = setup(0, Arc::new(services::StaticIdentity::anonymous())).await;
    let (handle, mut notices) = SessionDriver::spawn(
        attempts,
        Arc::new(HeadlessProctor),
        &QuizId::new("2"),
        SessionMode::Exam,
    )
    .await
    .unwrap();

    handle.send(SessionCommand::StartExam).await.unwrap();
    handle
        .send(SessionCommand::FullscreenChanged { active: false })
        .await
        .unwrap();
    wait_for(&mut notices, |n| matches!(n, SessionNotice::ViolationRaised).then_some(())).await;

    let blocked = SessionError::ViolationPending.to_string();
    for command in [
        SessionCommand::Select(0),
        SessionCommand::Submit { confirmed: true },
    ] {
        handle.send(command).await.unwrap();
        let reason = wait_for(&mut notices, |n| match n {
            SessionNotice::Rejected(reason) => Some(reason.clone()),
            SessionNotice::Submitted(_) => panic!("submitted behind the violation prompt"),
            _ => None,
        })
        .await;
        assert_eq!(reason, blocked);
    }

    handle
        .send(SessionCommand::ResolveViolation(ViolationChoice::ReturnToFullscreen))
        .await
        .unwrap();
    handle.send(SessionCommand::Select(0)).await.unwrap();
    let snapshot = wait_for(&mut notices, |n| match n {
        SessionNotice::Rejected(reason) => panic!("still rejected: {reason}"),
        SessionNotice::State(s) if s.selected.is_some() => Some(s.clone()),
        _ => None,
    })
    .await;
    assert!(!snapshot.violation_pending);
    assert_eq!(snapshot.progress.answered, 1);

    handle.send(SessionCommand::Leave).await.unwrap();
    handle.closed().await;
}

#[tokio::test(start_paused = true)]
async fn denied_fullscreen_degrades_but_continues() {
    let (_repo, attempts) = setup(0, Arc::new(services::StaticIdentity::anonymous())).await;
    let proctor = Arc::new(RecordingProctor {
        deny: true,
        ..RecordingProctor::default()
    });
    let (handle, mut notices) =
        SessionDriver::spawn(attempts, proctor, &QuizId::new("2"), SessionMode::Exam)
            .await
            .unwrap();

    handle.send(SessionCommand::StartExam).await.unwrap();
    let reason = wait_for(&mut notices, |n| match n {
        SessionNotice::FullscreenUnavailable(reason) => Some(reason.clone()),
        _ => None,
    })
    .await;
    assert!(reason.contains("blocked by host"));

    handle.send(SessionCommand::Select(1)).await.unwrap();
    let snapshot = wait_for(&mut notices, |n| match n {
        SessionNotice::State(s) if s.selected.is_some() => Some(s.clone()),
        _ => None,
    })
    .await;
    assert_eq!(snapshot.phase, SessionPhase::InProgress);
    assert!(!snapshot.fullscreen_active);

    handle.send(SessionCommand::Leave).await.unwrap();
    handle.closed().await;
}

#[tokio::test(start_paused = true)]
async fn incomplete_submit_warns_before_forcing() {
    let (_repo, attempts) = setup(0, Arc::new(services::StaticIdentity::anonymous())).await;
    let (handle, mut notices) = SessionDriver::spawn(
        attempts,
        Arc::new(HeadlessProctor),
        &QuizId::new("2"),
        SessionMode::Practice,
    )
    .await
    .unwrap();

    handle.send(SessionCommand::Select(0)).await.unwrap();
    handle
        .send(SessionCommand::Submit { confirmed: false })
        .await
        .unwrap();
    let warning = wait_for(&mut notices, |n| match n {
        SessionNotice::Warning(w) => Some(w.clone()),
        SessionNotice::Submitted(_) => panic!("submitted without confirmation"),
        _ => None,
    })
    .await;
    assert_eq!(
        warning,
        services::sessions::SessionWarning::UnansweredQuestions { count: 1 }
    );

    handle
        .send(SessionCommand::Submit { confirmed: true })
        .await
        .unwrap();
    let report = wait_for(&mut notices, |n| match n {
        SessionNotice::Submitted(report) => Some(report.clone()),
        _ => None,
    })
    .await;
    assert_eq!(report.trigger, SubmitTrigger::LearnerConfirmed);

    handle.send(SessionCommand::Review).await.unwrap();
    let snapshot = wait_for(&mut notices, |n| match n {
        SessionNotice::State(s) if s.phase == SessionPhase::Reviewing => Some(s.clone()),
        _ => None,
    })
    .await;
    assert_eq!(snapshot.selected_is_correct(), Some(true));

    handle.send(SessionCommand::Leave).await.unwrap();
    handle.closed().await;
}

#[tokio::test(start_paused = true)]
async fn cancel_at_gate_closes_the_session() {
    let (_repo, attempts) = setup(1, Arc::new(services::StaticIdentity::anonymous())).await;
    let (handle, mut notices) = SessionDriver::spawn(
        attempts,
        Arc::new(HeadlessProctor),
        &QuizId::new("2"),
        SessionMode::Exam,
    )
    .await
    .unwrap();
    let sender = handle.sender();

    handle.send(SessionCommand::CancelStart).await.unwrap();
    wait_for(&mut notices, |n| matches!(n, SessionNotice::Closed).then_some(())).await;
    assert!(notices.recv().await.is_none());

    handle.closed().await;
    assert!(sender.send(SessionCommand::Next).await.is_err());
}

#[tokio::test]
async fn spawn_fails_for_unknown_quiz() {
    let (_repo, attempts) = setup(1, Arc::new(services::StaticIdentity::anonymous())).await;
    let err = SessionDriver::spawn(
        attempts,
        Arc::new(HeadlessProctor),
        &QuizId::new("missing"),
        SessionMode::Practice,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SessionError::QuizNotFound(_)));
}
