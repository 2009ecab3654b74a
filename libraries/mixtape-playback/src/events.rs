//! Playback events
//!
//! Queued by the manager at state changes and drained by the UI.

use mixtape_core::TrackId;
use serde::{Deserialize, Serialize};

use crate::types::PlaybackState;

/// Events emitted by the playback system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    StateChanged { state: PlaybackState },

    /// A new track started
    TrackChanged {
        track_id: TrackId,
        previous_track_id: Option<TrackId>,
    },

    /// Track reached its end naturally
    ///
    /// Consumers record the play in the catalog.
    TrackFinished { track_id: TrackId },

    /// Track could not be loaded and was skipped
    TrackFailed {
        track_id: TrackId,
        message: String,
        consecutive_failures: u32,
    },

    QueueChanged { length: usize },

    /// Upcoming tracks were put in a new order
    QueueReshuffled,

    PositionUpdate { position_ms: u64, duration_ms: u64 },

    Error { message: String },
}
