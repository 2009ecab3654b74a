/// Persisted playback session types
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::ids::TrackId;

/// Which player surface a session belongs to
///
/// Each context keeps its own resume record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackContext {
    MainPlayer,
    PlaylistEditor,
    Radio,
}

impl PlaybackContext {
    pub const ALL: [PlaybackContext; 3] = [Self::MainPlayer, Self::PlaylistEditor, Self::Radio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainPlayer => "main_player",
            Self::PlaylistEditor => "playlist_editor",
            Self::Radio => "radio",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "main_player" | "main" => Some(Self::MainPlayer),
            "playlist_editor" | "editor" => Some(Self::PlaylistEditor),
            "radio" => Some(Self::Radio),
            _ => None,
        }
    }
}

impl fmt::Display for PlaybackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a stored session is restored at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeMode {
    /// Ignore the stored session
    #[default]
    Off,
    /// Restart the stored queue from its first track
    FirstTrack,
    /// Start the stored track from the beginning
    ExactTrack,
    /// Start the stored track at the stored offset
    ExactPosition,
}

impl ResumeMode {
    /// Mode actually honoured for a context
    ///
    /// Radio stations have no meaningful offset or queue start, so radio
    /// resumes the previous station or nothing.
    pub fn effective_for(self, context: PlaybackContext) -> Self {
        match (context, self) {
            (PlaybackContext::Radio, Self::FirstTrack | Self::ExactPosition) => Self::ExactTrack,
            (_, mode) => mode,
        }
    }
}

/// Last clean-exit position of a playback context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub context: PlaybackContext,
    /// Track playing when the session ended
    pub track_id: Option<TrackId>,
    /// Seek offset into `track_id`
    pub position_ms: u64,
    /// Source queue in play order at save time
    #[serde(default)]
    pub queue: Vec<TrackId>,
    pub saved_at: DateTime<Utc>,
}

impl ResumeState {
    pub fn new(context: PlaybackContext) -> Self {
        Self {
            context,
            track_id: None,
            position_ms: 0,
            queue: Vec::new(),
            saved_at: Utc::now(),
        }
    }

    pub fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms)
    }
}
