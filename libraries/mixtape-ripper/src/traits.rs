//! Drive and encoder collaborators

use async_trait::async_trait;
use mixtape_core::{Disc, DiscTrack};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::profile::EncodingProfile;
use crate::types::{ParanoiaLevel, TrackTags};

/// An optical drive holding an audio CD
#[async_trait]
pub trait OpticalDrive: Send + Sync {
    /// Read the table of contents
    async fn scan_disc(&self) -> Result<Disc>;

    /// Open a track for reading as 16-bit stereo PCM in a WAV container
    async fn read_track(&self, track: &DiscTrack, paranoia: ParanoiaLevel) -> Result<Box<dyn TrackReader>>;

    async fn eject(&self) -> Result<()>;
}

/// Sequential reader over one disc track
#[async_trait]
pub trait TrackReader: Send {
    /// Next chunk of audio, `None` once the track is exhausted
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Starts encode sessions writing to a file
#[async_trait]
pub trait AudioEncoder: Send + Sync {
    async fn start(
        &self,
        output: &Path,
        profile: &EncodingProfile,
        tags: &TrackTags,
    ) -> Result<Box<dyn EncodeSession>>;
}

/// One file being encoded
#[async_trait]
pub trait EncodeSession: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<()>;

    /// Flush and close the output file
    async fn finish(self: Box<Self>) -> Result<()>;

    /// Stop without completing the file; the caller removes it
    async fn abort(self: Box<Self>) {}
}

/// Cooperative cancellation shared between a caller and running jobs
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation before reuse
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());

        flag.cancel();
        assert!(other.is_cancelled());

        other.reset();
        assert!(!flag.is_cancelled());
    }
}
