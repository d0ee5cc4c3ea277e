//! End-to-end lesson sessions on the simulated player and offline ledger

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lessonplay::LessonSession;
use lessonplay::api::{ApiError, Ledger, PopupService};
use lessonplay::config::preferences::MemoryVolumeStore;
use lessonplay::lesson::{
    CtaAction, LessonId, OptionId, PopupDefinition, PopupId, PopupKind, QuizOption, Submission,
    SubmissionPage, SubmissionRequest,
};
use lessonplay::player::{
    POLL_INTERVAL, PlaybackAdapter, PlaybackController, PlayerEventReceiver, PlayerState, SdkGate,
    Shortcut, SimulatedSdk, Transport,
};
use lessonplay::popups::{PopupScheduler, TrailingPopup};
use lessonplay::session::{SubmissionReporter, SubmitOutcome};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

fn quiz(id: &str, at: f64, mandatory: bool) -> PopupDefinition {
    PopupDefinition::quiz(
        id,
        at,
        mandatory,
        vec![
            QuizOption { id: OptionId::new("a"), text: "Right".into(), is_correct: true },
            QuizOption { id: OptionId::new("b"), text: "Wrong".into(), is_correct: false },
        ],
    )
    .with_content(format!("Question {}", id))
}

/// A session plus the popups it has shown, driven on the paused clock
struct Harness {
    session: LessonSession<SimulatedSdk>,
    events: PlayerEventReceiver,
    shown: Vec<String>,
}

impl Harness {
    fn new(service: Arc<dyn PopupService>, duration: f64, trailing: Option<TrailingPopup>) -> Self {
        let (adapter, events) = PlaybackAdapter::new(SimulatedSdk::new(duration), SdkGate::new());
        let session = LessonSession::new(
            adapter,
            PlaybackController::new(Box::new(MemoryVolumeStore::default())),
            PopupScheduler::new(trailing),
            SubmissionReporter::new(service),
            true,
        );
        Self { session, events, shown: Vec::new() }
    }

    async fn open(&mut self, lesson: &str) {
        let fetch = self
            .session
            .open_lesson(LessonId::new(lesson), lesson)
            .await
            .expect("lesson was not open yet");
        let fetched = fetch.run().await;
        assert!(self.session.on_popups_fetched(fetched));
        self.pump();
    }

    fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.session.handle_player_event(event);
        }
    }

    /// Run the event loop for `span` of runtime clock
    async fn run_for(&mut self, span: Duration) {
        let end = Instant::now() + span;
        let mut next_poll = Instant::now() + POLL_INTERVAL;

        loop {
            let wake = self
                .session
                .next_deadline()
                .map_or(next_poll, |deadline| deadline.min(next_poll))
                .min(end);
            tokio::time::sleep_until(wake).await;

            self.pump();
            if let Some(popup) = self.session.fire_due_timers() {
                let label = popup.id().map_or("trailing".to_string(), |id| id.to_string());
                self.shown.push(label);
            }
            self.pump();

            if Instant::now() >= next_poll {
                self.session.poll();
                next_poll += POLL_INTERVAL;
            }
            if Instant::now() >= end {
                break;
            }
        }
    }

    fn state(&self) -> PlayerState {
        self.session.adapter().player_state()
    }

    fn active_id(&self) -> Option<String> {
        self.session.active_popup().and_then(|popup| popup.id()).map(|id| id.to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn mandatory_quiz_pauses_and_answering_resumes() {
    let ledger = Ledger::new("ada").with_lesson(
        "lesson-1",
        60.0,
        vec![quiz("q30", 30.0, true), quiz("q32", 32.0, false)],
    );
    let mut harness = Harness::new(Arc::new(ledger), 60.0, None);
    harness.open("lesson-1").await;
    assert_eq!(harness.state(), PlayerState::Playing);

    harness.run_for(Duration::from_secs(31)).await;
    assert_eq!(harness.active_id().as_deref(), Some("q30"));
    assert_eq!(harness.state(), PlayerState::Paused);

    let outcome = harness.session.answer_popup(&OptionId::new("a")).await;
    assert!(matches!(outcome, Some(SubmitOutcome::Recorded(ref s)) if s.is_correct == Some(true)));
    assert!(harness.session.active_popup().is_none());

    harness.run_for(Duration::from_millis(200)).await;
    assert_eq!(harness.state(), PlayerState::Playing);

    harness.run_for(Duration::from_secs(3)).await;
    assert_eq!(harness.active_id().as_deref(), Some("q32"));
    assert_eq!(harness.state(), PlayerState::Playing);
    assert_eq!(harness.shown, vec!["q30", "q32"]);
}

#[tokio::test(start_paused = true)]
async fn answering_again_in_a_later_session_is_a_conflict() {
    let ledger =
        Arc::new(Ledger::new("ada").with_lesson("lesson-1", 60.0, vec![quiz("q10", 10.0, true)]));

    let mut first = Harness::new(ledger.clone(), 60.0, None);
    first.open("lesson-1").await;
    first.run_for(Duration::from_secs(11)).await;
    let outcome = first.session.answer_popup(&OptionId::new("b")).await;
    assert!(matches!(outcome, Some(SubmitOutcome::Recorded(ref s)) if s.is_correct == Some(false)));

    let mut second = Harness::new(ledger.clone(), 60.0, None);
    second.open("lesson-1").await;
    second.run_for(Duration::from_secs(11)).await;
    assert_eq!(second.active_id().as_deref(), Some("q10"));

    let outcome = second.session.answer_popup(&OptionId::new("a")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::AlreadySubmitted(_)));
    assert!(outcome.is_error());
    assert_eq!(second.active_id().as_deref(), Some("q10"));
    assert_eq!(second.state(), PlayerState::Paused);
    assert!(second.session.scheduler().answered().is_empty());

    assert_eq!(second.session.dismiss_popup().await, None);
    second.run_for(Duration::from_millis(200)).await;
    assert_eq!(second.state(), PlayerState::Playing);
    assert_eq!(ledger.submission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn seeking_back_does_not_reoffer_an_answered_quiz() {
    let ledger = Ledger::new("ada").with_lesson("lesson-1", 60.0, vec![quiz("q20", 20.0, true)]);
    let mut harness = Harness::new(Arc::new(ledger), 60.0, None);
    harness.open("lesson-1").await;

    harness.run_for(Duration::from_secs(21)).await;
    harness.session.answer_popup(&OptionId::new("a")).await;
    harness.run_for(Duration::from_millis(200)).await;

    assert!(harness.session.shortcut(Shortcut::SeekBy(-10.0)));
    harness.run_for(Duration::from_secs(15)).await;

    assert_eq!(harness.shown, vec!["q20"]);
    assert_eq!(harness.state(), PlayerState::Playing);
    assert!(harness.session.snapshot().current_time_seconds > 22.0);
}

#[tokio::test(start_paused = true)]
async fn dismissed_call_to_action_is_recorded_as_close() {
    let ledger = Arc::new(Ledger::new("ada").with_lesson(
        "lesson-1",
        60.0,
        vec![PopupDefinition::cta("cta5", 5.0, false).with_content("Sign up")],
    ));
    let mut harness = Harness::new(ledger.clone(), 60.0, None);
    harness.open("lesson-1").await;

    harness.run_for(Duration::from_secs(6)).await;
    assert_eq!(harness.session.active_popup().map(|p| p.kind()), Some(PopupKind::Cta));
    assert_eq!(harness.state(), PlayerState::Playing);

    let outcome = harness.session.dismiss_popup().await.unwrap();
    match outcome {
        SubmitOutcome::Recorded(submission) => {
            assert_eq!(submission.answer.as_deref(), Some(CtaAction::Close.as_str()));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(harness.session.active_popup().is_none());
    assert_eq!(ledger.submission_count(), 1);
}

/// Ledger whose first submissions fail with a server error
struct FlakyService {
    inner: Ledger,
    failures: AtomicUsize,
}

#[async_trait]
impl PopupService for FlakyService {
    async fn lesson_popups(&self, lesson: &LessonId) -> Result<Vec<PopupDefinition>, ApiError> {
        self.inner.lesson_popups(lesson).await
    }

    async fn submit(
        &self,
        popup: &PopupId,
        request: &SubmissionRequest,
    ) -> Result<Submission, ApiError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ApiError::ApiError {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        self.inner.submit(popup, request).await
    }

    async fn submissions(&self, page: u32) -> Result<SubmissionPage, ApiError> {
        self.inner.submissions(page).await
    }
}

#[tokio::test(start_paused = true)]
async fn failed_open_keeps_the_call_to_action_for_a_retry() {
    let service = Arc::new(FlakyService {
        inner: Ledger::new("ada").with_lesson(
            "lesson-1",
            60.0,
            vec![PopupDefinition::cta("cta5", 5.0, false).with_content("Sign up")],
        ),
        failures: AtomicUsize::new(1),
    });
    let mut harness = Harness::new(service.clone(), 60.0, None);
    harness.open("lesson-1").await;
    harness.run_for(Duration::from_secs(6)).await;
    assert_eq!(harness.active_id().as_deref(), Some("cta5"));

    let outcome = harness.session.respond_cta(CtaAction::Open).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Failed { retryable: true, .. }));
    assert_eq!(harness.active_id().as_deref(), Some("cta5"));

    let outcome = harness.session.respond_cta(CtaAction::Open).await.unwrap();
    assert!(outcome.is_recorded());
    assert!(harness.session.active_popup().is_none());
    assert_eq!(service.inner.submission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn trailing_popup_appears_near_the_end() {
    let ledger = Ledger::new("ada").with_lesson("lesson-1", 60.0, Vec::new());
    let trailing = TrailingPopup::new("Enjoyed the lesson?");
    let mut harness = Harness::new(Arc::new(ledger), 60.0, Some(trailing));
    harness.open("lesson-1").await;

    harness.run_for(Duration::from_secs(49)).await;
    assert!(harness.session.active_popup().is_none());

    harness.run_for(Duration::from_secs(2)).await;
    let popup = harness.session.active_popup().expect("trailing popup showing");
    assert_eq!(popup.id(), None);
    assert_eq!(popup.content(), "Enjoyed the lesson?");
    assert_eq!(harness.state(), PlayerState::Playing);

    harness.run_for(Duration::from_secs(3)).await;
    assert_eq!(harness.session.dismiss_popup().await, Some(SubmitOutcome::Unrecorded));

    harness.run_for(Duration::from_secs(10)).await;
    assert_eq!(harness.shown, vec!["trailing"]);
    assert!(harness.session.snapshot().has_ended);
}

/// Ledger that counts popup fetches
struct CountingService {
    inner: Ledger,
    fetches: AtomicUsize,
}

#[async_trait]
impl PopupService for CountingService {
    async fn lesson_popups(&self, lesson: &LessonId) -> Result<Vec<PopupDefinition>, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.lesson_popups(lesson).await
    }

    async fn submit(
        &self,
        popup: &PopupId,
        request: &SubmissionRequest,
    ) -> Result<Submission, ApiError> {
        self.inner.submit(popup, request).await
    }

    async fn submissions(&self, page: u32) -> Result<SubmissionPage, ApiError> {
        self.inner.submissions(page).await
    }
}

#[tokio::test(start_paused = true)]
async fn each_lesson_change_fetches_once() {
    let service = Arc::new(CountingService {
        inner: Ledger::new("ada")
            .with_lesson("lesson-1", 60.0, vec![quiz("q1", 10.0, true)])
            .with_lesson("lesson-2", 60.0, vec![quiz("q2", 10.0, true), quiz("q3", 20.0, false)]),
        fetches: AtomicUsize::new(0),
    });
    let mut harness = Harness::new(service.clone(), 60.0, None);

    harness.open("lesson-1").await;
    assert!(harness.session.open_lesson(LessonId::new("lesson-1"), "lesson-1").await.is_none());
    assert_eq!(service.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(harness.session.scheduler().popups().len(), 1);

    harness.open("lesson-2").await;
    assert_eq!(service.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(harness.session.scheduler().popups().len(), 2);
    assert!(harness.session.scheduler().answered().is_empty());
}

#[tokio::test]
async fn demo_fixture_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/lessons.json");
    let ledger = Ledger::from_fixture(&path, "guest").unwrap();

    let first = ledger.lesson_popups(&LessonId::new("1")).await.unwrap();
    assert_eq!(first.len(), 3);
    assert!(first.first().is_some_and(|p| p.mandatory && p.kind == PopupKind::Quiz));

    // The inactive quiz is left out
    let second = ledger.lesson_popups(&LessonId::new("2")).await.unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(ledger.lesson(&LessonId::new("2")).and_then(|l| l.duration_seconds), Some(120.0));
}
