//! Clock-driven stand-in for an embedded video player
//!
//! Advances position with `tokio::time`, so tests that pause the runtime
//! clock control playback exactly.

use tokio::time::Instant;

use super::error::PlayerError;
use super::{PlayerBackend, PlayerEvent, PlayerEventSender, PlayerSdk, PlayerState};

/// Seconds of video the simulated network keeps buffered ahead
const BUFFER_AHEAD_SECONDS: f64 = 30.0;

/// SDK producing [`SimulatedPlayer`]s of a fixed length
#[derive(Debug, Clone)]
pub struct SimulatedSdk {
    duration_seconds: f64,
}

impl SimulatedSdk {
    pub fn new(duration_seconds: f64) -> Self {
        Self { duration_seconds: duration_seconds.max(0.0) }
    }
}

impl PlayerSdk for SimulatedSdk {
    type Player = SimulatedPlayer;

    async fn load(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn create_player(
        &self,
        media_id: &str,
        events: PlayerEventSender,
    ) -> Result<SimulatedPlayer, PlayerError> {
        if self.duration_seconds <= 0.0 {
            return Err(PlayerError::Construction {
                media_id: media_id.to_string(),
                message: "video has no duration".to_string(),
            });
        }

        let player = SimulatedPlayer {
            events,
            duration: self.duration_seconds,
            position: 0.0,
            playing_since: None,
            rate: 1.0,
            volume: 100,
            muted: false,
            fullscreen: false,
            state: PlayerState::Unstarted,
            destroyed: false,
        };
        player.emit(PlayerEvent::Ready);
        Ok(player)
    }
}

/// A video that plays against the runtime clock
#[derive(Debug)]
pub struct SimulatedPlayer {
    events: PlayerEventSender,
    duration: f64,
    /// Position when playback last started or was rebased
    position: f64,
    playing_since: Option<Instant>,
    rate: f64,
    volume: u8,
    muted: bool,
    fullscreen: bool,
    state: PlayerState,
    destroyed: bool,
}

impl SimulatedPlayer {
    fn emit(&self, event: PlayerEvent) {
        if self.destroyed {
            return;
        }
        // Receiver gone means nobody is listening any more
        let _ = self.events.send(event);
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            self.state = state;
            self.emit(PlayerEvent::StateChanged(state));
        }
    }

    /// Position without side effects
    fn position_now(&self) -> f64 {
        let elapsed = self
            .playing_since
            .map(|since| since.elapsed().as_secs_f64() * self.rate)
            .unwrap_or(0.0);
        (self.position + elapsed).min(self.duration)
    }

    /// Fold elapsed play time into `position`
    fn rebase(&mut self) {
        self.position = self.position_now();
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn ensure_alive(&self, command: &'static str) -> Result<(), PlayerError> {
        if self.destroyed {
            return Err(PlayerError::command(command, "player destroyed"));
        }
        Ok(())
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn playback_rate(&self) -> f64 {
        self.rate
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

impl PlayerBackend for SimulatedPlayer {
    fn play(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive("play")?;
        if self.state == PlayerState::Ended && self.position >= self.duration {
            self.position = 0.0;
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        self.set_state(PlayerState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive("pause")?;
        self.rebase();
        self.playing_since = None;
        if self.state == PlayerState::Playing {
            self.set_state(PlayerState::Paused);
        }
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<(), PlayerError> {
        self.ensure_alive("seekTo")?;
        self.position = seconds.clamp(0.0, self.duration);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), PlayerError> {
        self.ensure_alive("setVolume")?;
        self.volume = volume.min(100);
        Ok(())
    }

    fn mute(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive("mute")?;
        self.muted = true;
        Ok(())
    }

    fn unmute(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive("unMute")?;
        self.muted = false;
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f64) -> Result<(), PlayerError> {
        self.ensure_alive("setPlaybackRate")?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(PlayerError::command("setPlaybackRate", format!("invalid rate {}", rate)));
        }
        self.rebase();
        self.rate = rate;
        Ok(())
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlayerError> {
        self.ensure_alive("fullscreen")?;
        if self.fullscreen != fullscreen {
            self.fullscreen = fullscreen;
            self.emit(PlayerEvent::FullscreenChanged(fullscreen));
        }
        Ok(())
    }

    fn current_time(&mut self) -> f64 {
        let position = self.position_now();
        if self.playing_since.is_some() && position >= self.duration {
            self.position = self.duration;
            self.playing_since = None;
            self.set_state(PlayerState::Ended);
        }
        position
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn loaded_fraction(&self) -> f64 {
        ((self.position_now() + BUFFER_AHEAD_SECONDS) / self.duration).min(1.0)
    }

    fn state(&self) -> PlayerState {
        self.state
    }

    fn destroy(&mut self) {
        self.playing_since = None;
        self.destroyed = true;
    }
}
