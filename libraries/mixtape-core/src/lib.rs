//! Mixtape Core
//!
//! Platform-agnostic core types, collaborator traits, and error handling for Mixtape.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Disc`, `ResumeState`, etc.
//! - **Core Traits**: `Catalog`, `ResumeStore`
//! - **Error Handling**: Unified `MixtapeError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use mixtape_core::{CatalogSnapshot, Rating, Track};
//!
//! let mut track = Track::new("My Favorite Song", "/music/song.ogg");
//! track.rating = Rating::new(8);
//!
//! let snapshot = CatalogSnapshot::from_tracks(vec![track]).unwrap();
//! assert_eq!(snapshot.len(), 1);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{MixtapeError, Result};
pub use traits::{Catalog, ResumeStore};
pub use types::{
    cddb_disc_id, CatalogSnapshot, Disc, DiscFingerprint, DiscTrack, PlaybackContext, Rating,
    ResumeMode, ResumeState, Track, TrackId, TrackUpdate, SECTORS_PER_SECOND,
};
