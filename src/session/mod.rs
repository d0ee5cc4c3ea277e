//! One viewing of a lesson
//!
//! [`LessonSession`] owns the playback adapter, the transport controls, the
//! popup scheduler and the reporter, and moves data between them. It does
//! no waiting of its own: the caller feeds it player events and poll ticks,
//! and fires deferred work once [`LessonSession::next_deadline`] passes.

pub mod reporter;

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::lesson::{CtaAction, LessonId, OptionId, PopupKind, PopupResponse};
use crate::player::{
    AdapterSignal, PlaybackAdapter, PlaybackController, PlaybackSnapshot, PlayerSdk, Shortcut,
    TaggedEvent, Transport,
};
use crate::popups::{ActivePopup, MatchTicket, PopupScheduler, ResumeTicket};

pub use reporter::{FetchedPopups, PopupFetch, SubmissionReporter, SubmitOutcome};

/// Current time on the runtime clock
///
/// Follows tokio's clock so a paused test runtime drives scheduling.
fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Playback plus popups for the lesson being watched
pub struct LessonSession<S: PlayerSdk> {
    adapter: PlaybackAdapter<S>,
    controller: PlaybackController,
    scheduler: PopupScheduler,
    reporter: SubmissionReporter,
    autoplay: bool,
    pending_match: Option<MatchTicket>,
    pending_resume: Option<ResumeTicket>,
    /// Cancels the popup fetch of the current lesson
    fetch_cancel: Option<CancellationToken>,
}

impl<S: PlayerSdk> LessonSession<S> {
    pub fn new(
        adapter: PlaybackAdapter<S>,
        controller: PlaybackController,
        scheduler: PopupScheduler,
        reporter: SubmissionReporter,
        autoplay: bool,
    ) -> Self {
        Self {
            adapter,
            controller,
            scheduler,
            reporter,
            autoplay,
            pending_match: None,
            pending_resume: None,
            fetch_cancel: None,
        }
    }

    /// Switch to `lesson` and load its video
    ///
    /// Returns the popup fetch for the new lesson; nothing happens if the
    /// lesson is already open. Any fetch still running for the previous
    /// lesson is cancelled.
    pub async fn open_lesson(&mut self, lesson: LessonId, media_id: &str) -> Option<PopupFetch> {
        if !self.scheduler.change_lesson(lesson.clone()) {
            return None;
        }

        tracing::info!("Opening lesson {}", lesson);
        self.pending_match = None;
        self.pending_resume = None;
        if let Some(previous) = self.fetch_cancel.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.fetch_cancel = Some(cancel.clone());
        let fetch = self.reporter.fetch(lesson, cancel);

        let volume = self.controller.volume();
        self.adapter.initialize(media_id, self.autoplay, Some(volume)).await;

        Some(fetch)
    }

    /// Install fetched popups; returns `false` for cancelled or stale results
    pub fn on_popups_fetched(&mut self, fetched: FetchedPopups) -> bool {
        if fetched.cancelled {
            return false;
        }
        self.scheduler.load_popups(&fetched.lesson, fetched.popups)
    }

    /// Apply an event from the player
    pub fn handle_player_event(&mut self, event: TaggedEvent) -> Option<AdapterSignal> {
        let signal = self.adapter.handle_event(event)?;
        match signal {
            AdapterSignal::FullscreenChanged(fullscreen) => {
                self.controller.on_fullscreen_change(fullscreen);
            }
            AdapterSignal::Ended => tracing::info!("Video ended"),
            AdapterSignal::Failed(code) => tracing::warn!("Playback failed with code {}", code),
            AdapterSignal::Ready | AdapterSignal::Play | AdapterSignal::Pause => {}
        }
        Some(signal)
    }

    /// Sample playback on a poll tick and consider popups
    pub fn poll(&mut self) {
        if self.adapter.sample().is_none() {
            return;
        }
        let snapshot = self.adapter.snapshot();
        if let Some(ticket) = self.scheduler.on_time_update(&snapshot, clock()) {
            self.pending_match = Some(ticket);
        }
    }

    /// Earliest pending deadline on the runtime clock
    pub fn next_deadline(&self) -> Option<tokio::time::Instant> {
        let matching = self.pending_match.map(|ticket| ticket.due);
        let resuming = self.pending_resume.map(|ticket| ticket.due);
        matching.into_iter().chain(resuming).min().map(tokio::time::Instant::from_std)
    }

    /// Run deferred work whose deadline has passed
    ///
    /// Returns the popup that appeared, if any.
    pub fn fire_due_timers(&mut self) -> Option<ActivePopup> {
        let now = clock();
        let mut shown = None;

        if let Some(ticket) = self.pending_match.filter(|ticket| ticket.due <= now) {
            self.pending_match = None;
            shown = self.scheduler.run_match(ticket, &mut self.adapter, now);
        }
        if let Some(ticket) = self.pending_resume.filter(|ticket| ticket.due <= now) {
            self.pending_resume = None;
            if self.scheduler.resume(ticket, &mut self.adapter) {
                tracing::debug!("Resumed playback after popup");
            }
        }

        shown
    }

    /// Apply a keyboard shortcut
    pub fn shortcut(&mut self, shortcut: Shortcut) -> bool {
        self.controller.handle_shortcut(&mut self.adapter, shortcut)
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.controller.set_volume(&mut self.adapter, volume);
    }

    pub fn set_playback_rate(&mut self, rate: f64) {
        self.controller.set_playback_rate(&mut self.adapter, rate);
    }

    /// Answer the quiz that is showing
    ///
    /// A recorded answer marks the popup as answered and closes it. Any other
    /// outcome leaves it open.
    pub async fn answer_popup(&mut self, selected: &OptionId) -> Option<SubmitOutcome> {
        let popup = self.scheduler.active()?.clone();
        if popup.kind() != PopupKind::Quiz {
            return None;
        }
        let text = popup
            .answers()
            .iter()
            .find(|option| &option.id == selected)
            .map(|option| option.text.clone())
            .unwrap_or_default();

        let response = PopupResponse::Answer { selected: selected.clone(), text };
        let outcome = self.reporter.submit(&popup, response, clock()).await;

        if outcome.is_recorded() {
            if let Some(id) = popup.id() {
                self.scheduler.record_answered(id.clone());
            }
            self.close_active();
        }
        Some(outcome)
    }

    /// Act on the call to action that is showing, then close it
    ///
    /// An `open` that failed with a retryable error keeps the popup up so it
    /// can be sent again.
    pub async fn respond_cta(&mut self, action: CtaAction) -> Option<SubmitOutcome> {
        let popup = self.scheduler.active()?.clone();
        if popup.kind() != PopupKind::Cta {
            return None;
        }

        let outcome = self.reporter.submit(&popup, PopupResponse::Action(action), clock()).await;
        if let (true, Some(id)) = (outcome.is_recorded(), popup.id()) {
            self.scheduler.record_answered(id.clone());
        }
        let retry = action == CtaAction::Open
            && matches!(outcome, SubmitOutcome::Failed { retryable: true, .. });
        if !retry {
            self.close_active();
        }
        Some(outcome)
    }

    /// Dismiss the popup that is showing
    ///
    /// A call to action reports a `close`; a quiz closes without a submission.
    pub async fn dismiss_popup(&mut self) -> Option<SubmitOutcome> {
        match self.scheduler.active()?.kind() {
            PopupKind::Cta => self.respond_cta(CtaAction::Close).await,
            PopupKind::Quiz => {
                self.close_active();
                None
            }
        }
    }

    fn close_active(&mut self) {
        let now = clock();
        if let Some(dismissal) = self.scheduler.close(&self.adapter, now) {
            self.pending_resume = dismissal.resume;
        }
    }

    pub fn adapter(&self) -> &PlaybackAdapter<S> {
        &self.adapter
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn scheduler(&self) -> &PopupScheduler {
        &self.scheduler
    }

    pub fn reporter(&self) -> &SubmissionReporter {
        &self.reporter
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.adapter.snapshot()
    }

    pub fn active_popup(&self) -> Option<&ActivePopup> {
        self.scheduler.active()
    }
}

impl<S: PlayerSdk> Drop for LessonSession<S> {
    fn drop(&mut self) {
        if let Some(cancel) = self.fetch_cancel.take() {
            cancel.cancel();
        }
    }
}
