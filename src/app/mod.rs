//! Application state and event handling

pub mod input;
pub mod state;

use std::io::{self, Stdout};

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::Config;
use crate::lesson::{CtaAction, LessonId, PopupKind};
use crate::player::{POLL_INTERVAL, PlayerEventReceiver, PlayerSdk};
use crate::session::{FetchedPopups, LessonSession};
use crate::theme::Theme;
use crate::ui;
use input::{Action, PopupAction, player_key_to_action, popup_key_to_action, step_rate};
use state::{AppState, PlayerView};

/// The lesson to play
#[derive(Debug, Clone)]
pub struct LessonTarget {
    pub lesson: LessonId,
    pub title: String,
    /// Identifier handed to the player SDK
    pub media_id: String,
}

/// The main application
pub struct App {
    /// Current application state
    state: AppState,

    theme: Theme,

    /// Terminal backend
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl App {
    /// Create a new application instance
    pub fn new(config: &Config) -> Result<Self> {
        let terminal = Self::setup_terminal()?;

        Ok(Self { state: AppState::default(), theme: config.active_theme(), terminal })
    }

    /// Set up the terminal for TUI rendering
    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    /// Restore the terminal to its original state
    fn restore_terminal(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    /// Play a lesson until the user quits
    pub async fn run<S: PlayerSdk>(
        &mut self,
        mut session: LessonSession<S>,
        mut player_events: PlayerEventReceiver,
        target: LessonTarget,
    ) -> Result<()> {
        // Set up panic hook to restore terminal
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        self.state.lesson_title = target.title.clone();

        let (fetched_tx, mut fetched_rx) = mpsc::unbounded_channel::<FetchedPopups>();
        if let Some(fetch) = session.open_lesson(target.lesson.clone(), &target.media_id).await {
            tokio::spawn(async move {
                // Receiver gone means the app already quit
                let _ = fetched_tx.send(fetch.run().await);
            });
        }
        if session.adapter().loading_failed() {
            self.state.status.error("The video could not be loaded");
        }

        let mut keys = EventStream::new();
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let view = PlayerView::capture(&session);
            self.terminal.draw(|frame| ui::draw(frame, &view, &self.state, &self.theme))?;

            let deadline = session.next_deadline();
            tokio::select! {
                maybe_event = keys.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(&mut session, key).await {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("Error reading terminal events: {}", e);
                        break;
                    }
                    None => break,
                },
                Some(event) = player_events.recv() => {
                    session.handle_player_event(event);
                }
                Some(fetched) = fetched_rx.recv() => {
                    session.on_popups_fetched(fetched);
                }
                _ = poll.tick() => session.poll(),
                _ = sleep_until(deadline) => {
                    if session.fire_due_timers().is_some() {
                        self.state.popup.reset();
                        self.state.show_help = false;
                    }
                }
            }
        }

        self.restore_terminal()?;
        Ok(())
    }

    /// Handle a key press, returns true if should exit
    async fn handle_key<S: PlayerSdk>(
        &mut self,
        session: &mut LessonSession<S>,
        key: KeyEvent,
    ) -> bool {
        if let Some(popup) = session.active_popup() {
            let kind = popup.kind();
            let option_count = popup.answers().len();
            return match popup_key_to_action(key.code, key.modifiers) {
                Some(action) => self.handle_popup_action(session, action, kind, option_count).await,
                None => false,
            };
        }

        match player_key_to_action(key.code, key.modifiers) {
            Some(Action::Quit) => return true,
            Some(Action::ToggleHelp) => self.state.show_help = !self.state.show_help,
            Some(Action::Player(shortcut)) => {
                if !session.shortcut(shortcut) {
                    self.state.status.info("Player is not ready yet");
                }
            }
            Some(Action::SlowerRate) => self.change_rate(session, false),
            Some(Action::FasterRate) => self.change_rate(session, true),
            None => {}
        }
        false
    }

    fn change_rate<S: PlayerSdk>(&mut self, session: &mut LessonSession<S>, faster: bool) {
        let rate = step_rate(session.controller().playback_rate(), faster);
        session.set_playback_rate(rate);
        self.state.status.info(format!("Speed {}x", rate));
    }

    async fn handle_popup_action<S: PlayerSdk>(
        &mut self,
        session: &mut LessonSession<S>,
        action: PopupAction,
        kind: PopupKind,
        option_count: usize,
    ) -> bool {
        match action {
            PopupAction::Quit => return true,
            PopupAction::Up => self.state.popup.select_previous(),
            PopupAction::Down => self.state.popup.select_next(option_count),
            PopupAction::Confirm => {
                let outcome = match kind {
                    PopupKind::Quiz => {
                        let selected = session
                            .active_popup()
                            .and_then(|popup| popup.answers().get(self.state.popup.selected_option))
                            .map(|option| option.id.clone());
                        match selected {
                            Some(selected) => session.answer_popup(&selected).await,
                            None => None,
                        }
                    }
                    PopupKind::Cta => session.respond_cta(CtaAction::Open).await,
                };
                if let Some(outcome) = outcome {
                    self.state.status.report(&outcome);
                }
            }
            PopupAction::Dismiss => {
                if let Some(outcome) = session.dismiss_popup().await {
                    self.state.status.report(&outcome);
                }
            }
        }

        if session.active_popup().is_none() {
            self.state.popup.reset();
        }
        false
    }
}

/// Sleep until `deadline`, or forever without one
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}
