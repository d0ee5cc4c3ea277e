//! Bridge between an external player SDK and the rest of the app

use super::error::PlayerError;
use super::sdk::SdkGate;
use super::{
    PlaybackSnapshot, PlayerBackend, PlayerCommand, PlayerEvent, PlayerEventReceiver,
    PlayerEventSender, PlayerSdk, PlayerState, TaggedEvent, Transport, event_channel,
};

/// Normalized signal produced from a player event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdapterSignal {
    Ready,
    Play,
    Pause,
    Ended,
    /// The player failed and will not recover on its own
    Failed(i32),
    FullscreenChanged(bool),
}

/// Owns the external player handle
pub struct PlaybackAdapter<S: PlayerSdk> {
    sdk: S,
    gate: SdkGate,
    player: Option<S::Player>,
    /// Cloned into every player the SDK creates
    events: PlayerEventSender,
    /// Bumped for each player; events tagged with an older one are stale
    generation: u64,
    snapshot: PlaybackSnapshot,
    state: PlayerState,
    ready: bool,
    loading: bool,
    loading_failed: bool,
    polling: bool,
    /// Start playback as soon as the player is ready
    autoplay: bool,
    /// Volume (0.0-1.0) applied once the player is ready
    initial_volume: Option<f64>,
}

impl<S: PlayerSdk> PlaybackAdapter<S> {
    /// Create an adapter and the event stream its players report to
    pub fn new(sdk: S, gate: SdkGate) -> (Self, PlayerEventReceiver) {
        let (events, rx) = event_channel();
        let adapter = Self {
            sdk,
            gate,
            player: None,
            events,
            generation: 0,
            snapshot: PlaybackSnapshot::default(),
            state: PlayerState::Unstarted,
            ready: false,
            loading: false,
            loading_failed: false,
            polling: false,
            autoplay: false,
            initial_volume: None,
        };
        (adapter, rx)
    }

    /// Load the SDK if needed and construct a player for `media_id`
    ///
    /// Failures are logged and surface through [`Self::loading_failed`].
    pub async fn initialize(&mut self, media_id: &str, autoplay: bool, initial_volume: Option<f64>) {
        self.teardown();
        self.generation += 1;

        self.loading = true;
        self.loading_failed = false;
        self.snapshot = PlaybackSnapshot::default();
        self.state = PlayerState::Unstarted;
        self.autoplay = autoplay;
        self.initial_volume = initial_volume;

        let sdk = &self.sdk;
        if let Err(e) = self.gate.ensure(|| sdk.load()).await {
            tracing::error!("Error loading player SDK: {}", e);
            self.fail();
            return;
        }

        match self.sdk.create_player(media_id, self.events.with_generation(self.generation)) {
            Ok(player) => {
                tracing::debug!("Created player for {}", media_id);
                self.player = Some(player);
            }
            Err(e) => {
                tracing::error!("Error creating player: {}", e);
                self.fail();
            }
        }
    }

    fn fail(&mut self) {
        self.loading_failed = true;
        self.loading = false;
    }

    /// Apply a player event and report what it means for everyone else
    pub fn handle_event(&mut self, tagged: TaggedEvent) -> Option<AdapterSignal> {
        let TaggedEvent { generation, event } = tagged;
        // Events from a player that has since been torn down or replaced
        if self.player.is_none() || generation != self.generation {
            tracing::debug!("Ignoring {:?} from player generation {}", event, generation);
            return None;
        }

        match event {
            PlayerEvent::Ready => {
                self.ready = true;
                self.loading = false;

                if let Some(player) = self.player.as_ref() {
                    self.snapshot.duration_seconds = player.duration();
                }
                if let Some(volume) = self.initial_volume {
                    self.command(PlayerCommand::SetVolume(scale_volume(volume)));
                }
                if self.autoplay {
                    self.command(PlayerCommand::Play);
                }
                Some(AdapterSignal::Ready)
            }
            PlayerEvent::StateChanged(state) => {
                self.state = state;
                match state {
                    PlayerState::Playing => {
                        self.snapshot.is_playing = true;
                        self.snapshot.has_ended = false;
                        self.polling = true;
                        Some(AdapterSignal::Play)
                    }
                    PlayerState::Paused => {
                        self.snapshot.is_playing = false;
                        self.polling = false;
                        Some(AdapterSignal::Pause)
                    }
                    PlayerState::Ended => {
                        self.snapshot.is_playing = false;
                        self.snapshot.has_ended = true;
                        self.polling = false;
                        Some(AdapterSignal::Ended)
                    }
                    PlayerState::Unstarted | PlayerState::Buffering | PlayerState::Cued => None,
                }
            }
            PlayerEvent::Error(code) => {
                tracing::error!("Player error: {}", PlayerError::Code(code));
                self.fail();
                Some(AdapterSignal::Failed(code))
            }
            PlayerEvent::FullscreenChanged(fullscreen) => {
                Some(AdapterSignal::FullscreenChanged(fullscreen))
            }
        }
    }

    /// Sample the player; returns the new position as a time update
    ///
    /// Called on every poll tick. Yields nothing unless the video is playing.
    pub fn sample(&mut self) -> Option<f64> {
        if !self.polling || !self.snapshot.is_playing {
            return None;
        }
        let player = self.player.as_mut()?;

        self.snapshot.current_time_seconds = player.current_time();
        self.snapshot.buffered_fraction = player.loaded_fraction().clamp(0.0, 1.0);
        if self.snapshot.duration_seconds <= 0.0 {
            self.snapshot.duration_seconds = player.duration();
        }

        Some(self.snapshot.current_time_seconds)
    }

    /// Stop polling and release the player; safe to call repeatedly
    pub fn teardown(&mut self) {
        self.polling = false;
        self.ready = false;
        if let Some(mut player) = self.player.take() {
            tracing::debug!("Destroying player");
            player.destroy();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn loading_failed(&self) -> bool {
        self.loading_failed
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    /// Generation of the current (or most recent) player
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Direct access to the backend, for front-ends that render it
    pub fn player(&self) -> Option<&S::Player> {
        self.player.as_ref()
    }
}

impl<S: PlayerSdk> Transport for PlaybackAdapter<S> {
    fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot
    }

    fn player_state(&self) -> PlayerState {
        self.state
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    /// Forward a command; a missing player makes this a no-op
    fn command(&mut self, command: PlayerCommand) {
        let Some(player) = self.player.as_mut() else {
            tracing::debug!("Dropping {:?}: no player", command);
            return;
        };

        let result = match command {
            PlayerCommand::Play => player.play(),
            PlayerCommand::Pause => player.pause(),
            PlayerCommand::Seek(seconds) => {
                let result = player.seek_to(seconds);
                if result.is_ok() {
                    self.snapshot.current_time_seconds = seconds;
                }
                result
            }
            PlayerCommand::SetVolume(volume) => player.set_volume(volume.min(100)),
            PlayerCommand::Mute => player.mute(),
            PlayerCommand::Unmute => player.unmute(),
            PlayerCommand::SetPlaybackRate(rate) => player.set_playback_rate(rate),
            PlayerCommand::SetFullscreen(fullscreen) => player.set_fullscreen(fullscreen),
        };

        if let Err(e) = result {
            tracing::warn!("Error executing player command {:?}: {}", command, e);
        }
    }

    fn clear_ended(&mut self) {
        self.snapshot.has_ended = false;
    }
}

impl<S: PlayerSdk> Drop for PlaybackAdapter<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Map a 0.0-1.0 volume onto the player's 0-100 scale
pub fn scale_volume(volume: f64) -> u8 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u8
}
