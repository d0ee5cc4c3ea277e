//! User-facing transport controls

use crate::config::preferences::{DEFAULT_VOLUME, VolumeStore};

use super::adapter::scale_volume;
use super::{PlayerCommand, Transport};

/// Seconds skipped by the arrow keys
pub const SHORT_SEEK_SECONDS: f64 = 5.0;
/// Seconds skipped by `j` / `l`
pub const LONG_SEEK_SECONDS: f64 = 10.0;
/// Volume change per up/down key press
pub const VOLUME_STEP: f64 = 0.1;

/// A keyboard shortcut, independent of the input device
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shortcut {
    TogglePlay,
    ToggleFullscreen,
    ToggleMute,
    /// Relative seek in seconds
    SeekBy(f64),
    /// Relative volume change on the 0.0-1.0 scale
    VolumeBy(f64),
    /// Seek to `digit * 10%` of the video
    SeekToDigit(u8),
}

/// Volume, mute, fullscreen and rate, layered over a [`Transport`]
pub struct PlaybackController {
    volume: f64,
    muted: bool,
    fullscreen: bool,
    playback_rate: f64,
    store: Box<dyn VolumeStore>,
}

impl PlaybackController {
    /// Create a controller with the persisted volume
    pub fn new(store: Box<dyn VolumeStore>) -> Self {
        let mut controller =
            Self { volume: DEFAULT_VOLUME, muted: false, fullscreen: false, playback_rate: 1.0, store };
        controller.load_saved_volume();
        controller
    }

    /// Read the persisted volume, falling back to the default
    pub fn load_saved_volume(&mut self) -> f64 {
        let volume = self
            .store
            .load_volume()
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_VOLUME);
        self.volume = volume;
        self.muted = volume == 0.0;
        volume
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// Play or pause; restarts from the beginning once the video has ended
    pub fn toggle_play(&mut self, transport: &mut dyn Transport) {
        let snapshot = transport.snapshot();

        if snapshot.has_ended {
            transport.command(PlayerCommand::Seek(0.0));
            transport.command(PlayerCommand::Play);
            transport.clear_ended();
            return;
        }

        if snapshot.is_playing {
            transport.command(PlayerCommand::Pause);
        } else {
            transport.command(PlayerCommand::Play);
        }
    }

    /// Seek to an absolute position; playback resumes when leaving the end
    pub fn seek(&mut self, transport: &mut dyn Transport, to_seconds: f64) {
        transport.command(PlayerCommand::Seek(to_seconds));

        if transport.snapshot().has_ended {
            transport.clear_ended();
            transport.command(PlayerCommand::Play);
        }
    }

    /// Set the volume (0.0-1.0) and persist it
    pub fn set_volume(&mut self, transport: &mut dyn Transport, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        self.volume = volume;
        self.muted = volume == 0.0;
        transport.command(PlayerCommand::SetVolume(scale_volume(volume)));

        if let Err(e) = self.store.save_volume(volume) {
            tracing::warn!("Could not persist volume: {}", e);
        }
    }

    pub fn toggle_mute(&mut self, transport: &mut dyn Transport) {
        self.muted = !self.muted;
        transport.command(if self.muted { PlayerCommand::Mute } else { PlayerCommand::Unmute });
    }

    /// Ask for fullscreen to flip; the state follows the change notification
    pub fn toggle_fullscreen(&mut self, transport: &mut dyn Transport) {
        transport.command(PlayerCommand::SetFullscreen(!self.fullscreen));
    }

    /// Record a fullscreen change reported by the host
    pub fn on_fullscreen_change(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn set_playback_rate(&mut self, transport: &mut dyn Transport, rate: f64) {
        self.playback_rate = rate;
        transport.command(PlayerCommand::SetPlaybackRate(rate));
    }

    /// Apply a keyboard shortcut; ignored until the player is ready
    pub fn handle_shortcut(&mut self, transport: &mut dyn Transport, shortcut: Shortcut) -> bool {
        if !transport.is_ready() {
            return false;
        }

        match shortcut {
            Shortcut::TogglePlay => self.toggle_play(transport),
            Shortcut::ToggleFullscreen => self.toggle_fullscreen(transport),
            Shortcut::ToggleMute => self.toggle_mute(transport),
            Shortcut::SeekBy(delta) => {
                let snapshot = transport.snapshot();
                let upper = if snapshot.duration_seconds > 0.0 {
                    snapshot.duration_seconds
                } else {
                    f64::INFINITY
                };
                let target = (snapshot.current_time_seconds + delta).min(upper).max(0.0);
                seek_clearing_end(transport, target);
            }
            Shortcut::VolumeBy(delta) => {
                let volume = ((self.volume + delta) * 100.0).round() / 100.0;
                self.set_volume(transport, volume);
            }
            Shortcut::SeekToDigit(digit) => {
                let target = f64::from(digit.min(9)) * transport.snapshot().duration_seconds / 10.0;
                seek_clearing_end(transport, target);
            }
        }
        true
    }
}

fn seek_clearing_end(transport: &mut dyn Transport, to_seconds: f64) {
    transport.command(PlayerCommand::Seek(to_seconds));
    transport.clear_ended();
}
