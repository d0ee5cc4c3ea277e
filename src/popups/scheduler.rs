//! Popup scheduling state machine
//!
//! `Idle ⇄ Showing`. Position updates may start an evaluation, which is
//! deferred by [`MATCH_DEBOUNCE`] and then matched against the loaded
//! definitions. Closing a popup that paused playback schedules a resume
//! after [`RESUME_DELAY`]. Both deferred steps are tickets; a ticket from an
//! older generation is ignored when it fires.

use std::time::Instant;

use crate::lesson::{LessonId, PopupDefinition, PopupId, PopupKind};
use crate::player::{PlaybackSnapshot, PlayerCommand, PlayerState, Transport};

use super::active::{ActivePopup, PopupSource, TrailingPopup};
use super::{
    AnsweredSet, MATCH_DEBOUNCE, MATCH_TOLERANCE_SECONDS, MIN_EVALUATION_INTERVAL, RESUME_DELAY,
    TRAILING_WINDOW_END, TRAILING_WINDOW_START,
};

/// Deferred matching pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTicket {
    generation: u64,
    /// When the match should run
    pub due: Instant,
}

/// Deferred resume after a popup closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeTicket {
    generation: u64,
    /// When playback should resume
    pub due: Instant,
}

/// Result of closing the active popup
#[derive(Debug, Clone, PartialEq)]
pub struct Dismissal {
    /// The popup that was showing
    pub popup: ActivePopup,
    /// Set when the popup paused playback and the player is still paused
    pub resume: Option<ResumeTicket>,
}

/// A dismissed popup that stays hidden until playback leaves its window
#[derive(Debug, Clone, PartialEq)]
enum Suppressed {
    Scheduled { id: PopupId, appear_at_seconds: f64 },
    Trailing,
}

/// Decides which popup is showing, if any
#[derive(Debug, Default)]
pub struct PopupScheduler {
    lesson: Option<LessonId>,
    popups: Vec<PopupDefinition>,
    trailing: Option<TrailingPopup>,
    answered: AnsweredSet,
    active: Option<ActivePopup>,
    /// Dismissed popups waiting for playback to leave their windows
    suppressed: Vec<Suppressed>,
    last_evaluation: Option<Instant>,
    /// A match ticket is outstanding
    checking: bool,
    generation: u64,
}

impl PopupScheduler {
    pub fn new(trailing: Option<TrailingPopup>) -> Self {
        Self { trailing, ..Self::default() }
    }

    pub fn lesson(&self) -> Option<&LessonId> {
        self.lesson.as_ref()
    }

    pub fn popups(&self) -> &[PopupDefinition] {
        &self.popups
    }

    pub fn answered(&self) -> &AnsweredSet {
        &self.answered
    }

    pub fn active(&self) -> Option<&ActivePopup> {
        self.active.as_ref()
    }

    pub fn is_showing(&self) -> bool {
        self.active.is_some()
    }

    /// Whether a match ticket is outstanding
    pub fn is_checking(&self) -> bool {
        self.checking
    }

    /// Switch to another lesson
    ///
    /// Returns `true` when the identity changed, in which case the popup list
    /// must be fetched again. Everything tied to the old lesson is dropped.
    pub fn change_lesson(&mut self, lesson: LessonId) -> bool {
        if self.lesson.as_ref() == Some(&lesson) {
            return false;
        }

        tracing::debug!("Popup scheduler switching to lesson {}", lesson);
        self.lesson = Some(lesson);
        self.popups.clear();
        self.answered.clear();
        self.active = None;
        self.suppressed.clear();
        self.last_evaluation = None;
        self.checking = false;
        self.generation += 1;
        true
    }

    /// Install the popups fetched for `lesson`; late results for another lesson are dropped
    pub fn load_popups(&mut self, lesson: &LessonId, popups: Vec<PopupDefinition>) -> bool {
        if self.lesson.as_ref() != Some(lesson) {
            tracing::debug!("Dropping popups for stale lesson {}", lesson);
            return false;
        }
        tracing::info!("Loaded {} popups for lesson {}", popups.len(), lesson);
        self.popups = popups;
        true
    }

    /// Consider a playback position update
    ///
    /// Returns a ticket when matching should run after [`MATCH_DEBOUNCE`].
    pub fn on_time_update(&mut self, snapshot: &PlaybackSnapshot, now: Instant) -> Option<MatchTicket> {
        if self.popups.is_empty() && self.trailing.is_none() {
            return None;
        }
        if !snapshot.is_playing || self.active.is_some() || self.checking {
            return None;
        }
        if let Some(last) = self.last_evaluation {
            if now.saturating_duration_since(last) < MIN_EVALUATION_INTERVAL {
                return None;
            }
        }

        self.last_evaluation = Some(now);
        self.checking = true;
        Some(MatchTicket { generation: self.generation, due: now + MATCH_DEBOUNCE })
    }

    /// Run a deferred match
    ///
    /// Returns the popup that became visible. A mandatory popup pauses
    /// playback before it is marked visible.
    pub fn run_match(
        &mut self,
        ticket: MatchTicket,
        transport: &mut dyn Transport,
        now: Instant,
    ) -> Option<ActivePopup> {
        if ticket.generation != self.generation {
            tracing::debug!("Discarding stale match ticket");
            return None;
        }
        self.checking = false;

        let snapshot = transport.snapshot();
        if self.active.is_some() || !snapshot.is_playing {
            return None;
        }
        self.release_suppression(&snapshot);

        let source = match self.find_scheduled(snapshot.current_time_seconds) {
            Some(popup) => PopupSource::Scheduled(popup.clone()),
            None => PopupSource::Trailing(self.trailing_due(&snapshot)?.clone()),
        };

        let mandatory = matches!(&source, PopupSource::Scheduled(popup) if popup.mandatory);
        if mandatory {
            transport.command(PlayerCommand::Pause);
        }

        let popup = ActivePopup { source, shown_at: now, paused_playback: mandatory };
        match popup.id() {
            Some(id) => tracing::debug!(
                "Showing popup {} at {:.2}s (mandatory: {})",
                id,
                snapshot.current_time_seconds,
                mandatory
            ),
            None => tracing::debug!("Showing trailing popup at {:.2}s", snapshot.current_time_seconds),
        }

        self.generation += 1;
        self.active = Some(popup.clone());
        Some(popup)
    }

    fn find_scheduled(&self, time: f64) -> Option<&PopupDefinition> {
        self.popups.iter().find(|popup| {
            (time - popup.appear_at_seconds).abs() <= MATCH_TOLERANCE_SECONDS
                && !self.answered.contains(&popup.id)
                && !self.suppressed.iter().any(
                    |entry| matches!(entry, Suppressed::Scheduled { id, .. } if id == &popup.id),
                )
        })
    }

    fn trailing_due(&self, snapshot: &PlaybackSnapshot) -> Option<&TrailingPopup> {
        let trailing = self.trailing.as_ref()?;
        let remaining = snapshot.remaining_seconds()?;
        let in_window = (TRAILING_WINDOW_START..=TRAILING_WINDOW_END).contains(&remaining);
        (in_window && !self.suppressed.contains(&Suppressed::Trailing)).then_some(trailing)
    }

    /// Forget each dismissal whose window playback has left
    fn release_suppression(&mut self, snapshot: &PlaybackSnapshot) {
        self.suppressed.retain(|entry| match entry {
            Suppressed::Scheduled { appear_at_seconds, .. } => {
                (snapshot.current_time_seconds - appear_at_seconds).abs() <= MATCH_TOLERANCE_SECONDS
            }
            Suppressed::Trailing => snapshot
                .remaining_seconds()
                .is_some_and(|r| (TRAILING_WINDOW_START..=TRAILING_WINDOW_END).contains(&r)),
        });
    }

    fn suppress(&mut self, entry: Suppressed) {
        if !self.suppressed.contains(&entry) {
            self.suppressed.push(entry);
        }
    }

    /// Mark a popup as answered for the rest of the session
    pub fn record_answered(&mut self, id: PopupId) -> bool {
        self.answered.insert(id)
    }

    /// Close the active popup
    ///
    /// Quizzes are added to the answered set. Any other popup stays hidden
    /// until playback leaves its window. A resume ticket is returned when the
    /// popup paused playback and the player is still paused.
    pub fn close(&mut self, transport: &dyn Transport, now: Instant) -> Option<Dismissal> {
        let popup = self.active.take()?;
        self.generation += 1;

        match &popup.source {
            PopupSource::Scheduled(definition) if definition.kind == PopupKind::Quiz => {
                self.answered.insert(definition.id.clone());
            }
            PopupSource::Scheduled(definition) => {
                self.suppress(Suppressed::Scheduled {
                    id: definition.id.clone(),
                    appear_at_seconds: definition.appear_at_seconds,
                });
            }
            PopupSource::Trailing(_) => self.suppress(Suppressed::Trailing),
        }

        let resume = (popup.paused_playback && transport.player_state() == PlayerState::Paused)
            .then(|| ResumeTicket { generation: self.generation, due: now + RESUME_DELAY });

        Some(Dismissal { popup, resume })
    }

    /// Fire a deferred resume; returns whether playback was resumed
    pub fn resume(&mut self, ticket: ResumeTicket, transport: &mut dyn Transport) -> bool {
        if ticket.generation != self.generation || self.active.is_some() {
            tracing::debug!("Discarding stale resume ticket");
            return false;
        }
        if transport.player_state() != PlayerState::Paused {
            return false;
        }
        transport.command(PlayerCommand::Play);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::lesson::{OptionId, QuizOption};
    use crate::player::POLL_INTERVAL;
    use crate::player::testing::RecordingTransport;

    fn quiz(id: &str, at: f64, mandatory: bool) -> PopupDefinition {
        PopupDefinition::quiz(
            id,
            at,
            mandatory,
            vec![
                QuizOption { id: OptionId::new("1"), text: "No".into(), is_correct: false },
                QuizOption { id: OptionId::new("2"), text: "Yes".into(), is_correct: true },
            ],
        )
    }

    fn scheduler_with(popups: Vec<PopupDefinition>) -> PopupScheduler {
        let mut scheduler = PopupScheduler::new(None);
        let lesson = LessonId::new("lesson-1");
        scheduler.change_lesson(lesson.clone());
        scheduler.load_popups(&lesson, popups);
        scheduler
    }

    /// Position update followed by the debounced match
    fn evaluate(
        scheduler: &mut PopupScheduler,
        transport: &mut RecordingTransport,
        now: &mut Instant,
    ) -> Option<ActivePopup> {
        let ticket = scheduler.on_time_update(&transport.snapshot(), *now)?;
        *now = ticket.due;
        scheduler.run_match(ticket, transport, *now)
    }

    #[test]
    fn nothing_to_schedule_without_content() {
        let mut scheduler = scheduler_with(Vec::new());
        let transport = RecordingTransport::playing_at(30.0, 60.0);
        assert_eq!(scheduler.on_time_update(&transport.snapshot(), Instant::now()), None);
    }

    #[test]
    fn paused_playback_is_not_evaluated() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, true)]);
        let mut transport = RecordingTransport::playing_at(30.0, 60.0);
        transport.snapshot.is_playing = false;
        assert_eq!(scheduler.on_time_update(&transport.snapshot(), Instant::now()), None);
    }

    #[test]
    fn evaluations_are_rate_limited() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, true)]);
        let transport = RecordingTransport::playing_at(10.0, 60.0);
        let start = Instant::now();

        let ticket = scheduler.on_time_update(&transport.snapshot(), start).unwrap();
        assert_eq!(ticket.due, start + MATCH_DEBOUNCE);

        // Pending match drops further updates
        assert_eq!(scheduler.on_time_update(&transport.snapshot(), start), None);

        let mut transport = transport;
        assert_eq!(scheduler.run_match(ticket, &mut transport, start), None);
        assert!(!scheduler.is_checking());

        let soon = start + Duration::from_millis(300);
        assert_eq!(scheduler.on_time_update(&transport.snapshot(), soon), None);

        let later = start + MIN_EVALUATION_INTERVAL;
        assert!(scheduler.on_time_update(&transport.snapshot(), later).is_some());
    }

    #[test]
    fn mandatory_popup_pauses_before_showing() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, true)]);
        let mut transport = RecordingTransport::playing_at(30.2, 60.0);
        let mut now = Instant::now();

        let popup = evaluate(&mut scheduler, &mut transport, &mut now).unwrap();

        assert_eq!(popup.id(), Some(&PopupId::new("1")));
        assert!(popup.paused_playback);
        assert_eq!(transport.commands, vec![PlayerCommand::Pause]);
        assert!(scheduler.is_showing());
    }

    #[test]
    fn skippable_popup_never_pauses() {
        let mut scheduler = scheduler_with(vec![quiz("2", 32.0, false)]);
        let mut transport = RecordingTransport::playing_at(32.1, 60.0);
        let mut now = Instant::now();

        let popup = evaluate(&mut scheduler, &mut transport, &mut now).unwrap();

        assert!(!popup.paused_playback);
        assert!(transport.commands.is_empty());
    }

    #[test]
    fn tolerance_window_is_inclusive() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, false)]);
        let mut now = Instant::now();

        let mut transport = RecordingTransport::playing_at(29.0, 60.0);
        assert_eq!(evaluate(&mut scheduler, &mut transport, &mut now), None);

        now += MIN_EVALUATION_INTERVAL;
        transport.at(30.75);
        assert!(evaluate(&mut scheduler, &mut transport, &mut now).is_some());
    }

    #[test]
    fn overlapping_windows_offer_first_in_list_order() {
        let mut scheduler = scheduler_with(vec![quiz("late", 30.5, false), quiz("early", 30.0, false)]);
        let mut transport = RecordingTransport::playing_at(30.1, 60.0);
        let mut now = Instant::now();

        let popup = evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
        assert_eq!(popup.id(), Some(&PopupId::new("late")));
    }

    #[test]
    fn two_popups_scenario() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, true), quiz("2", 32.0, false)]);
        let mut transport = RecordingTransport::playing_at(30.2, 60.0);
        let mut now = Instant::now();

        let first = evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
        assert_eq!(first.id(), Some(&PopupId::new("1")));
        assert_eq!(transport.state, PlayerState::Paused);

        let dismissal = scheduler.close(&transport, now).unwrap();
        assert!(scheduler.answered().contains(&PopupId::new("1")));
        let resume = dismissal.resume.unwrap();
        assert_eq!(resume.due, now + RESUME_DELAY);
        assert!(scheduler.resume(resume, &mut transport));
        assert_eq!(transport.state, PlayerState::Playing);

        now += MIN_EVALUATION_INTERVAL;
        transport.at(32.1);
        let second = evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
        assert_eq!(second.id(), Some(&PopupId::new("2")));
        assert_eq!(transport.commands, vec![PlayerCommand::Pause, PlayerCommand::Play]);
    }

    #[test]
    fn answered_popup_is_not_reoffered_after_seeking_back() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, false)]);
        let mut transport = RecordingTransport::playing_at(30.0, 60.0);
        let mut now = Instant::now();

        evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
        scheduler.close(&transport, now);

        transport.at(10.0);
        now += MIN_EVALUATION_INTERVAL;
        assert_eq!(evaluate(&mut scheduler, &mut transport, &mut now), None);

        transport.at(30.0);
        now += MIN_EVALUATION_INTERVAL;
        assert_eq!(evaluate(&mut scheduler, &mut transport, &mut now), None);
    }

    #[test]
    fn dismissed_cta_waits_for_playback_to_leave_its_window() {
        let mut scheduler = scheduler_with(vec![PopupDefinition::cta("c", 30.0, false)]);
        let mut transport = RecordingTransport::playing_at(29.5, 60.0);
        let mut now = Instant::now();

        evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
        let dismissal = scheduler.close(&transport, now).unwrap();
        assert_eq!(dismissal.resume, None);
        assert!(scheduler.answered().is_empty());

        transport.at(30.2);
        now += MIN_EVALUATION_INTERVAL;
        assert_eq!(evaluate(&mut scheduler, &mut transport, &mut now), None);

        // Seeking back re-offers a call to action
        transport.at(20.0);
        now += MIN_EVALUATION_INTERVAL;
        assert_eq!(evaluate(&mut scheduler, &mut transport, &mut now), None);
        transport.at(30.0);
        now += MIN_EVALUATION_INTERVAL;
        assert!(evaluate(&mut scheduler, &mut transport, &mut now).is_some());
    }

    #[test]
    fn overlapping_dismissed_ctas_stay_hidden_together() {
        let mut scheduler = scheduler_with(vec![
            PopupDefinition::cta("a", 30.0, false),
            PopupDefinition::cta("b", 30.6, false),
        ]);
        let mut transport = RecordingTransport::playing_at(30.0, 60.0);
        let mut now = Instant::now();
        let mut shown = Vec::new();

        for at in [30.0, 30.5, 30.7] {
            transport.at(at);
            if let Some(popup) = evaluate(&mut scheduler, &mut transport, &mut now) {
                shown.push(popup.id().unwrap().to_string());
                scheduler.close(&transport, now).unwrap();
            }
            now += MIN_EVALUATION_INTERVAL;
        }

        assert_eq!(shown, vec!["a", "b"]);
    }

    #[test]
    fn trailing_popup_appears_in_window() {
        let mut scheduler = PopupScheduler::new(Some(TrailingPopup::new("Thanks for watching")));
        scheduler.change_lesson(LessonId::new("l"));
        let mut now = Instant::now();

        let mut transport = RecordingTransport::playing_at(49.0, 60.0);
        assert_eq!(evaluate(&mut scheduler, &mut transport, &mut now), None);

        for at in [50.0, 51.0, 52.0] {
            let mut scheduler = PopupScheduler::new(Some(TrailingPopup::new("Thanks")));
            scheduler.change_lesson(LessonId::new("l"));
            let mut transport = RecordingTransport::playing_at(at, 60.0);
            let popup = evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
            assert_eq!(popup.id(), None);
            assert!(!popup.is_mandatory());
            assert!(transport.commands.is_empty());
        }

        now += MIN_EVALUATION_INTERVAL;
        transport.at(52.5);
        assert_eq!(evaluate(&mut scheduler, &mut transport, &mut now), None);
    }

    #[test]
    fn trailing_popup_requires_known_duration() {
        let mut scheduler = PopupScheduler::new(Some(TrailingPopup::new("Thanks")));
        scheduler.change_lesson(LessonId::new("l"));
        let mut transport = RecordingTransport::playing_at(0.0, 0.0);
        let mut now = Instant::now();
        assert_eq!(evaluate(&mut scheduler, &mut transport, &mut now), None);
    }

    #[test]
    fn scheduled_popup_wins_over_trailing() {
        let mut scheduler = PopupScheduler::new(Some(TrailingPopup::new("Thanks")));
        let lesson = LessonId::new("l");
        scheduler.change_lesson(lesson.clone());
        scheduler.load_popups(&lesson, vec![quiz("1", 51.0, false)]);

        let mut transport = RecordingTransport::playing_at(51.0, 60.0);
        let mut now = Instant::now();
        let popup = evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
        assert_eq!(popup.id(), Some(&PopupId::new("1")));
    }

    #[test]
    fn lesson_change_resets_everything() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, true)]);
        let mut transport = RecordingTransport::playing_at(30.0, 60.0);
        let mut now = Instant::now();
        evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
        scheduler.record_answered(PopupId::new("1"));

        assert!(scheduler.change_lesson(LessonId::new("lesson-2")));

        assert!(!scheduler.is_showing());
        assert!(scheduler.answered().is_empty());
        assert!(scheduler.popups().is_empty());
        assert!(!scheduler.change_lesson(LessonId::new("lesson-2")));
    }

    #[test]
    fn pending_tickets_die_with_the_lesson() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, false)]);
        let mut transport = RecordingTransport::playing_at(30.0, 60.0);
        let now = Instant::now();

        let ticket = scheduler.on_time_update(&transport.snapshot(), now).unwrap();
        let next = LessonId::new("lesson-2");
        scheduler.change_lesson(next.clone());
        scheduler.load_popups(&next, vec![quiz("9", 30.0, true)]);

        assert_eq!(scheduler.run_match(ticket, &mut transport, now), None);
        assert!(transport.commands.is_empty());
    }

    #[test]
    fn late_fetch_for_old_lesson_is_ignored() {
        let mut scheduler = scheduler_with(Vec::new());
        scheduler.change_lesson(LessonId::new("lesson-2"));
        assert!(!scheduler.load_popups(&LessonId::new("lesson-1"), vec![quiz("1", 3.0, false)]));
        assert!(scheduler.popups().is_empty());
    }

    #[test]
    fn resume_is_skipped_when_user_already_resumed() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, true)]);
        let mut transport = RecordingTransport::playing_at(30.0, 60.0);
        let mut now = Instant::now();
        evaluate(&mut scheduler, &mut transport, &mut now).unwrap();

        let resume = scheduler.close(&transport, now).unwrap().resume.unwrap();
        transport.command(PlayerCommand::Play);
        transport.commands.clear();

        assert!(!scheduler.resume(resume, &mut transport));
        assert!(transport.commands.is_empty());
    }

    #[test]
    fn resume_is_dropped_once_another_popup_shows() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, true), quiz("2", 30.5, true)]);
        let mut transport = RecordingTransport::playing_at(30.0, 60.0);
        let mut now = Instant::now();
        evaluate(&mut scheduler, &mut transport, &mut now).unwrap();
        let resume = scheduler.close(&transport, now).unwrap().resume.unwrap();

        transport.command(PlayerCommand::Play);
        now += MIN_EVALUATION_INTERVAL;
        evaluate(&mut scheduler, &mut transport, &mut now).unwrap();

        assert!(!scheduler.resume(resume, &mut transport));
        assert_eq!(transport.state, PlayerState::Paused);
    }

    #[test]
    fn skippable_popup_does_not_resume_a_user_pause() {
        let mut scheduler = scheduler_with(vec![quiz("1", 30.0, false)]);
        let mut transport = RecordingTransport::playing_at(30.0, 60.0);
        let mut now = Instant::now();
        evaluate(&mut scheduler, &mut transport, &mut now).unwrap();

        transport.command(PlayerCommand::Pause);
        assert_eq!(scheduler.close(&transport, now).unwrap().resume, None);
    }

    /// Play straight through, closing every popup as soon as it shows
    fn play_through(popups: Vec<PopupDefinition>, duration: f64) -> HashMap<PopupId, usize> {
        let mut scheduler = scheduler_with(popups);
        let mut transport = RecordingTransport::playing_at(0.0, duration);
        let mut now = Instant::now();
        let mut offers = HashMap::new();
        let step = POLL_INTERVAL.as_secs_f64();

        while transport.snapshot.current_time_seconds < duration {
            if let Some(ticket) = scheduler.on_time_update(&transport.snapshot(), now) {
                now = ticket.due;
                let elapsed = MATCH_DEBOUNCE.as_secs_f64();
                transport.snapshot.current_time_seconds += elapsed;
                if let Some(popup) = scheduler.run_match(ticket, &mut transport, now) {
                    *offers.entry(popup.id().cloned().unwrap()).or_insert(0) += 1;
                    if let Some(resume) = scheduler.close(&transport, now).and_then(|d| d.resume) {
                        now = resume.due;
                        scheduler.resume(resume, &mut transport);
                    }
                }
            }
            now += POLL_INTERVAL;
            transport.snapshot.current_time_seconds += step;
        }
        offers
    }

    proptest! {
        #[test]
        fn every_popup_is_offered_exactly_once(
            specs in prop::collection::vec((2.0f64..6.0, any::<bool>(), any::<bool>()), 1..8)
        ) {
            let mut at = 1.0;
            let mut popups = Vec::new();
            for (i, (gap, is_quiz, mandatory)) in specs.into_iter().enumerate() {
                at += gap;
                let id = format!("p{}", i);
                popups.push(if is_quiz {
                    quiz(&id, at, mandatory)
                } else {
                    PopupDefinition::cta(id, at, mandatory)
                });
            }
            let duration = at + 5.0;
            let ids: Vec<PopupId> = popups.iter().map(|p| p.id.clone()).collect();

            let offers = play_through(popups, duration);

            for id in ids {
                prop_assert_eq!(offers.get(&id).copied(), Some(1), "popup {}", id);
            }
        }
    }
}
