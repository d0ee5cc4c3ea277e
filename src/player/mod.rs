//! Video playback
//!
//! The adapter wraps an external player SDK behind [`PlayerSdk`] and
//! [`PlayerBackend`], turns its notifications into a single [`PlayerEvent`]
//! stream, and exposes commands plus a polled [`PlaybackSnapshot`]. The
//! controller layers user-facing transport state on top.

pub mod adapter;
pub mod controller;
pub mod error;
pub mod sdk;
pub mod simulated;

use std::time::Duration;

use tokio::sync::mpsc;

pub use adapter::{AdapterSignal, PlaybackAdapter};
pub use controller::{PlaybackController, Shortcut};
pub use error::PlayerError;
pub use sdk::SdkGate;
pub use simulated::{SimulatedPlayer, SimulatedSdk};

/// How often playback position is sampled while playing
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Discrete states reported by the external player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Map the numeric codes used by embedded web players
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
        }
    }

    /// Buffering and cued are transient and never drive scheduling
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Buffering | Self::Cued)
    }
}

/// Notification from the external player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// Player constructed and ready for commands
    Ready,
    /// Playback state changed
    StateChanged(PlayerState),
    /// Player reported an error code
    Error(i32),
    /// Fullscreen was entered or left, by request or by the user
    FullscreenChanged(bool),
}

/// A player event stamped with the generation of the player that sent it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: PlayerEvent,
}

/// Sending half of the player event stream, bound to one player generation
#[derive(Debug, Clone)]
pub struct PlayerEventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl PlayerEventSender {
    pub fn send(&self, event: PlayerEvent) -> Result<(), mpsc::error::SendError<TaggedEvent>> {
        self.tx.send(TaggedEvent { generation: self.generation, event })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A sender on the same stream for another player
    pub fn with_generation(&self, generation: u64) -> Self {
        Self { generation, tx: self.tx.clone() }
    }
}

/// Receiving half of the player event stream
pub type PlayerEventReceiver = mpsc::UnboundedReceiver<TaggedEvent>;

/// Open a player event stream; the sender starts at generation 0
pub fn event_channel() -> (PlayerEventSender, PlayerEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PlayerEventSender { generation: 0, tx }, rx)
}

/// Commands the adapter can forward to the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    Play,
    Pause,
    /// Seek to an absolute position in seconds
    Seek(f64),
    /// Volume on the player's 0-100 scale
    SetVolume(u8),
    Mute,
    Unmute,
    SetPlaybackRate(f64),
    SetFullscreen(bool),
}

/// Continuously updated view of the player
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub current_time_seconds: f64,
    pub duration_seconds: f64,
    pub is_playing: bool,
    /// Loaded fraction of the video, 0.0 to 1.0
    pub buffered_fraction: f64,
    pub has_ended: bool,
}

impl PlaybackSnapshot {
    /// Seconds left until the end, when the duration is known
    pub fn remaining_seconds(&self) -> Option<f64> {
        (self.duration_seconds > 0.0).then(|| self.duration_seconds - self.current_time_seconds)
    }
}

/// A constructed external player
pub trait PlayerBackend {
    fn play(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;
    fn seek_to(&mut self, seconds: f64) -> Result<(), PlayerError>;
    /// Volume on a 0-100 scale
    fn set_volume(&mut self, volume: u8) -> Result<(), PlayerError>;
    fn mute(&mut self) -> Result<(), PlayerError>;
    fn unmute(&mut self) -> Result<(), PlayerError>;
    fn set_playback_rate(&mut self, rate: f64) -> Result<(), PlayerError>;
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlayerError>;

    fn current_time(&mut self) -> f64;
    fn duration(&self) -> f64;
    /// Loaded fraction of the video, 0.0 to 1.0
    fn loaded_fraction(&self) -> f64;
    fn state(&self) -> PlayerState;

    /// Release the player; called at most once
    fn destroy(&mut self);
}

/// An external player SDK
#[allow(async_fn_in_trait)]
pub trait PlayerSdk {
    type Player: PlayerBackend;

    /// Load the SDK itself; runs once per process through [`SdkGate`]
    async fn load(&self) -> Result<(), PlayerError>;

    /// Construct a player for `media_id`, reporting through `events`
    fn create_player(
        &self,
        media_id: &str,
        events: PlayerEventSender,
    ) -> Result<Self::Player, PlayerError>;
}

/// Playback surface other components drive
///
/// Only the adapter touches the external player; the controller and the
/// popup scheduler go through this trait.
pub trait Transport {
    fn snapshot(&self) -> PlaybackSnapshot;
    fn player_state(&self) -> PlayerState;
    /// Whether the player has signalled readiness
    fn is_ready(&self) -> bool;
    fn command(&mut self, command: PlayerCommand);
    /// Forget that the video reached its end
    fn clear_ended(&mut self);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording transport for controller and scheduler tests

    use super::*;

    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        pub snapshot: PlaybackSnapshot,
        pub state: PlayerState,
        pub ready: bool,
        pub commands: Vec<PlayerCommand>,
    }

    impl RecordingTransport {
        pub fn playing_at(seconds: f64, duration: f64) -> Self {
            Self {
                snapshot: PlaybackSnapshot {
                    current_time_seconds: seconds,
                    duration_seconds: duration,
                    is_playing: true,
                    ..Default::default()
                },
                state: PlayerState::Playing,
                ready: true,
                commands: Vec::new(),
            }
        }

        pub fn at(&mut self, seconds: f64) -> &mut Self {
            self.snapshot.current_time_seconds = seconds;
            self
        }
    }

    impl Transport for RecordingTransport {
        fn snapshot(&self) -> PlaybackSnapshot {
            self.snapshot
        }

        fn player_state(&self) -> PlayerState {
            self.state
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn command(&mut self, command: PlayerCommand) {
            match command {
                PlayerCommand::Play => {
                    self.state = PlayerState::Playing;
                    self.snapshot.is_playing = true;
                }
                PlayerCommand::Pause => {
                    self.state = PlayerState::Paused;
                    self.snapshot.is_playing = false;
                }
                PlayerCommand::Seek(to) => self.snapshot.current_time_seconds = to,
                _ => {}
            }
            self.commands.push(command);
        }

        fn clear_ended(&mut self) {
            self.snapshot.has_ended = false;
        }
    }
}
