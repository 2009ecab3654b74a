//! Platform-agnostic audio source trait
//!
//! Sample rendering belongs to the platform's output layer; the playback
//! state machine only needs position, seeking and end-of-track.

use crate::error::Result;
use std::time::Duration;

/// An opened, decodable track
pub trait AudioSource: Send {
    /// Seek to position in track
    ///
    /// Fails with `InvalidSeekPosition` past the end of the track.
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Total track duration
    fn duration(&self) -> Duration;

    /// Current playback position
    fn position(&self) -> Duration;

    /// Whether the decoder has reached the end of the track
    fn is_finished(&self) -> bool;

    /// Equivalent to `seek(Duration::ZERO)`
    fn reset(&mut self) -> Result<()> {
        self.seek(Duration::ZERO)
    }
}
