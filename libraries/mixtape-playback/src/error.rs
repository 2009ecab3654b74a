//! Error types for playback management

use mixtape_core::{MixtapeError, TrackId};
use std::time::Duration;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    #[error("Invalid seek position: {0:?}")]
    InvalidSeekPosition(Duration),

    /// Decoder failed while opening or reading a track
    #[error("Audio source error: {0}")]
    AudioSource(String),

    /// Too many consecutive tracks failed to load
    #[error("Gave up after {failures} consecutive load failures (last track: {last_track})")]
    SourceUnreachable { failures: u32, last_track: TrackId },

    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Core(#[from] MixtapeError),
}

impl From<PlaybackError> for MixtapeError {
    fn from(err: PlaybackError) -> Self {
        let message = err.to_string();
        match err {
            PlaybackError::Core(inner) => inner,
            PlaybackError::AudioSource(msg) => MixtapeError::Decoder(msg),
            PlaybackError::SourceUnreachable { .. } => MixtapeError::Device(message),
            _ => MixtapeError::InvalidInput(message),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
