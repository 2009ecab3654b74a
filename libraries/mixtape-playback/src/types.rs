//! Core types for playback management

use chrono::{DateTime, Utc};
use mixtape_core::{Rating, Track, TrackId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::weighted::WeightProfile;

/// Track information for queue management
///
/// Contains all metadata needed for playback, display and shuffle scoring.
/// Copied out of the catalog when the queue is built, so later catalog
/// changes never reorder or mutate a queue in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueTrack {
    /// Catalog track identifier
    pub id: TrackId,

    /// File path for audio decoding
    pub path: PathBuf,

    pub title: String,

    pub artist: String,

    /// Compilation artist when set, otherwise the track artist
    pub album_artist: String,

    pub album: Option<String>,

    pub duration: Duration,

    pub track_number: Option<u32>,

    pub rating: Rating,

    pub play_count: u32,

    pub last_played: Option<DateTime<Utc>>,

    /// Source context for display
    pub source: TrackSource,
}

impl From<&Track> for QueueTrack {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            path: track.file_path.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album_artist: track.album_artist().to_string(),
            album: (!track.album.is_empty()).then(|| track.album.clone()),
            duration: Duration::from_millis(track.duration_ms),
            track_number: track.track_number,
            rating: track.rating,
            play_count: track.play_count,
            last_played: track.last_played,
            source: TrackSource::Single,
        }
    }
}

impl QueueTrack {
    pub fn with_source(mut self, source: TrackSource) -> Self {
        self.source = source;
        self
    }
}

/// Where a queued track came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackSource {
    /// Track from a stored or smart playlist
    Playlist { name: String },

    /// Track from an album
    Album { name: String },

    /// Track from artist discography
    Artist { name: String },

    /// Radio station
    Radio { name: String },

    /// Individual track (no context)
    Single,
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No track loaded
    Stopped,

    /// Decoder is opening the current track
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// The current track could not be loaded
    Failed,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Replay the current track when it ends
    Track,

    /// Loop entire queue
    All,
}

/// Shuffle mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    /// Insertion order
    #[default]
    Off,

    /// Uniform random permutation
    Random,

    /// Shuffle whole albums, keeping each album's track order
    Album,

    /// Shuffle whole artists, keeping each artist's track order
    Artist,

    /// Weighted by rating, play count, recency and chance
    Smart,
}

/// Configuration for playback manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Maximum history size (default: 50)
    pub history_size: usize,

    /// Initial shuffle mode (default: Off)
    pub shuffle: ShuffleMode,

    /// Initial repeat mode (default: Off)
    pub repeat: RepeatMode,

    /// Smart shuffle weights
    pub weights: WeightProfile,

    /// Consecutive load failures before playback gives up (default: 5)
    pub max_consecutive_failures: u32,

    /// `previous()` restarts the current track past this point (default: 3s)
    pub restart_threshold: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            history_size: 50,
            shuffle: ShuffleMode::Off,
            repeat: RepeatMode::Off,
            weights: WeightProfile::default(),
            max_consecutive_failures: 5,
            restart_threshold: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.history_size, 50);
        assert_eq!(config.shuffle, ShuffleMode::Off);
        assert_eq!(config.repeat, RepeatMode::Off);
        assert_eq!(config.max_consecutive_failures, 5);
    }

    #[test]
    fn queue_track_from_catalog_track() {
        let mut track = Track::new("Test Song", "/music/song.flac").with_id("track1");
        track.artist = "Guest".to_string();
        track.compilation_artist = Some("Various Artists".to_string());
        track.duration_ms = 180_000;
        track.rating = Rating::new(7);

        let queued = QueueTrack::from(&track);

        assert_eq!(queued.id, TrackId::new("track1"));
        assert_eq!(queued.album_artist, "Various Artists");
        assert_eq!(queued.album, None);
        assert_eq!(queued.duration, Duration::from_secs(180));
        assert_eq!(queued.rating.value(), 7);
    }
}
