//! Error types for the playback layer

use thiserror::Error;

/// Errors raised by a player SDK or its players
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlayerError {
    /// The SDK could not be loaded
    #[error("Failed to load player SDK: {0}")]
    SdkLoad(String),

    /// The player could not be constructed
    #[error("Failed to create player for {media_id}: {message}")]
    Construction {
        /// Media the player was created for
        media_id: String,
        /// Reason reported by the SDK
        message: String,
    },

    /// A command was rejected by the player
    #[error("Player command {command} failed: {message}")]
    Command {
        /// Command name
        command: &'static str,
        /// Reason reported by the SDK
        message: String,
    },

    /// The player reported an error code
    #[error("Player error code {0}")]
    Code(i32),
}

impl PlayerError {
    /// Shorthand for a failed command
    pub fn command(command: &'static str, message: impl Into<String>) -> Self {
        Self::Command { command, message: message.into() }
    }
}
