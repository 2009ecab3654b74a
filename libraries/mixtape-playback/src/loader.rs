//! Track loading collaborator

use mixtape_core::Result;

use crate::source::AudioSource;
use crate::types::QueueTrack;

/// Opens queued tracks for playback
///
/// Failures are `Decoder` or `NotFound` errors; the playback manager counts
/// them and moves on to the next track.
pub trait TrackLoader: Send {
    fn load(&mut self, track: &QueueTrack) -> Result<Box<dyn AudioSource>>;
}

impl<F> TrackLoader for F
where
    F: FnMut(&QueueTrack) -> Result<Box<dyn AudioSource>> + Send,
{
    fn load(&mut self, track: &QueueTrack) -> Result<Box<dyn AudioSource>> {
        self(track)
    }
}
