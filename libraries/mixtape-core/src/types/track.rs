/// Catalog track types
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::disc::DiscFingerprint;
use super::ids::TrackId;

/// User rating on a bounded 0-10 scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Highest rating value
    pub const MAX: u8 = 10;

    /// Create a rating, clamping to the 0-10 scale
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    /// Raw rating value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Rating mapped to `[0.0, 1.0]`
    pub fn normalized(self) -> f64 {
        f64::from(self.0) / f64::from(Self::MAX)
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            Err(format!("rating {} is out of range 0-{}", value, Self::MAX))
        } else {
            Ok(Self(value))
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A track in the catalog
///
/// Records are immutable once published; changes go through
/// [`Catalog::update`](crate::Catalog::update) which publishes a new copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub compilation_artist: Option<String>,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: u64,
    pub file_path: PathBuf,
    #[serde(default = "Utc::now")]
    pub date_added: DateTime<Utc>,
    /// Set for tracks produced by the CD ripper
    #[serde(default)]
    pub disc_fingerprint: Option<DiscFingerprint>,
}

impl Track {
    /// Create a track with a generated id and empty metadata
    pub fn new(title: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            id: TrackId::generate(),
            title: title.into(),
            artist: String::new(),
            compilation_artist: None,
            album: String::new(),
            genre: String::new(),
            track_number: None,
            year: None,
            rating: Rating::default(),
            play_count: 0,
            last_played: None,
            duration_ms: 0,
            file_path: file_path.into(),
            date_added: Utc::now(),
            disc_fingerprint: None,
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<TrackId>) -> Self {
        self.id = id.into();
        self
    }

    /// Artist shown for album grouping: the compilation artist when set
    pub fn album_artist(&self) -> &str {
        self.compilation_artist.as_deref().unwrap_or(&self.artist)
    }
}

/// Partial update applied by `Catalog::update`
///
/// `None` leaves a field untouched. Optional track fields use a nested
/// option so they can be cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub compilation_artist: Option<Option<String>>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<Option<u32>>,
    pub year: Option<Option<u32>>,
    pub rating: Option<Rating>,
    pub play_count: Option<u32>,
    pub last_played: Option<Option<DateTime<Utc>>>,
    pub duration_ms: Option<u64>,
    pub file_path: Option<PathBuf>,
}

impl TrackUpdate {
    /// Update that only changes the rating
    pub fn rating(rating: Rating) -> Self {
        Self {
            rating: Some(rating),
            ..Self::default()
        }
    }

    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the update to a track in place
    pub fn apply_to(&self, track: &mut Track) {
        if let Some(ref title) = self.title {
            track.title.clone_from(title);
        }
        if let Some(ref artist) = self.artist {
            track.artist.clone_from(artist);
        }
        if let Some(ref compilation_artist) = self.compilation_artist {
            track.compilation_artist.clone_from(compilation_artist);
        }
        if let Some(ref album) = self.album {
            track.album.clone_from(album);
        }
        if let Some(ref genre) = self.genre {
            track.genre.clone_from(genre);
        }
        if let Some(track_number) = self.track_number {
            track.track_number = track_number;
        }
        if let Some(year) = self.year {
            track.year = year;
        }
        if let Some(rating) = self.rating {
            track.rating = rating;
        }
        if let Some(play_count) = self.play_count {
            track.play_count = play_count;
        }
        if let Some(last_played) = self.last_played {
            track.last_played = last_played;
        }
        if let Some(duration_ms) = self.duration_ms {
            track.duration_ms = duration_ms;
        }
        if let Some(ref file_path) = self.file_path {
            track.file_path.clone_from(file_path);
        }
    }
}
