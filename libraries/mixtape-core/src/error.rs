/// Core error types for Mixtape
use thiserror::Error;

use crate::types::TrackId;

/// Result type alias using `MixtapeError`
pub type Result<T> = std::result::Result<T, MixtapeError>;

/// Core error type shared by every Mixtape library
#[derive(Error, Debug)]
pub enum MixtapeError {
    /// Invalid smart playlist rule, weight profile or setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Track not found in the catalog
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Decoder could not open or read a track
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// Encoder failed while writing a ripped track
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Optical drive unavailable or unreadable
    #[error("Device error: {0}")]
    Device(String),

    /// Operation stopped by a cancellation request
    #[error("Operation cancelled")]
    Cancelled,

    /// Duplicate entry
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl MixtapeError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a decoder error
    pub fn decoder(msg: impl Into<String>) -> Self {
        Self::Decoder(msg.into())
    }

    /// Create an encoder error
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error means the referenced entity is gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::TrackNotFound(_))
    }
}
