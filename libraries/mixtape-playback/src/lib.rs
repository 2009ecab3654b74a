//! Mixtape - Playback Management
//!
//! Platform-agnostic playback state machine for Mixtape.
//!
//! This crate provides:
//! - Two-tier queue system (explicit + source) with index navigation
//! - Playback history (configurable size)
//! - Shuffle modes (Random, Album, Artist, Smart)
//! - Weighted sampling for smart shuffle
//! - Repeat modes (Off, Track, All)
//! - Load-failure handling with automatic advance
//! - Per-context session resume
//!
//! # Architecture
//!
//! `mixtape-playback` never touches audio devices or the database. Track
//! opening is delegated to a [`TrackLoader`], resume persistence to a
//! [`mixtape_core::ResumeStore`].
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use mixtape_core::Track;
//! use mixtape_playback::{PlaybackConfig, PlaybackManager, PlaybackState, QueueTrack};
//!
//! let mut manager = PlaybackManager::new(PlaybackConfig::default());
//!
//! let track = Track::new("My Song", "/music/song.ogg").with_id("track1");
//! manager.add_to_queue_end(QueueTrack::from(&track));
//!
//! // No loader set: the platform opens the track and calls set_audio_source
//! manager.play().unwrap();
//! assert_eq!(manager.get_state(), PlaybackState::Loading);
//! ```
//!
//! # Example: Shuffle and Repeat
//!
//! ```rust
//! use mixtape_playback::{PlaybackManager, RepeatMode, ShuffleMode, WeightProfile};
//!
//! let mut manager = PlaybackManager::default();
//!
//! // Favour highly rated, rarely played tracks
//! manager.set_weights(WeightProfile::new(0.5, 0.3, 0.1, 0.1).unwrap());
//! manager.set_shuffle(ShuffleMode::Smart);
//! manager.set_repeat(RepeatMode::All);
//! ```

mod error;
mod events;
mod history;
mod loader;
mod manager;
mod queue;
pub mod resume;
pub mod shuffle;
mod source;
pub mod types;
pub mod weighted;

pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use history::History;
pub use loader::TrackLoader;
pub use manager::PlaybackManager;
pub use queue::{Queue, QueueEntry};
pub use resume::{resolve_queue, MemoryResumeStore, ResumeSession, ResumeTarget};
pub use shuffle::{next_order, next_order_with};
pub use source::AudioSource;
pub use types::{PlaybackConfig, PlaybackState, QueueTrack, RepeatMode, ShuffleMode, TrackSource};
pub use weighted::{WeightProfile, WeightedSampler};
