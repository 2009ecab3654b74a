//! Mixtape - Smart Playlists
//!
//! Rule engine that turns a set of criteria into an ordered, optionally
//! limited view over the track catalog.
//!
//! - Criteria are closed `field / operator / value` triples validated when
//!   they are built, so a broken rule fails with a configuration error
//!   instead of quietly matching nothing
//! - Rows join their criteria with AND/OR; the playlist joins rows with
//!   Match All / Match Any
//! - Results are ordered by any number of keys (ties broken by track id)
//!   and truncated to the limit afterwards
//!
//! # Example
//!
//! ```rust
//! use mixtape_core::{CatalogSnapshot, Track};
//! use mixtape_smartlist::{
//!     Criterion, CriterionValue, EvaluationContext, MatchPolicy, Operator, OrderKey,
//!     SmartField, SmartPlaylist,
//! };
//!
//! let mut fresh = Track::new("Fresh", "/music/fresh.ogg");
//! fresh.play_count = 0;
//! let mut worn = Track::new("Worn", "/music/worn.ogg");
//! worn.play_count = 40;
//! let snapshot = CatalogSnapshot::from_tracks(vec![fresh, worn]).unwrap();
//!
//! let playlist = SmartPlaylist::new("Unheard", "Discovery", MatchPolicy::All)
//!     .with_criterion(
//!         Criterion::new(SmartField::PlayCount, Operator::LessThan, CriterionValue::Number(3))
//!             .unwrap(),
//!     )
//!     .order_by(OrderKey::ascending(SmartField::Title));
//!
//! let tracks = playlist.evaluate(&snapshot, &EvaluationContext::default()).unwrap();
//! assert_eq!(tracks.len(), 1);
//! assert_eq!(tracks[0].title, "Fresh");
//! ```

mod criterion;
mod engine;
mod field;
mod library;
mod playlist;

pub use criterion::{
    Conjunction, CriteriaRow, Criterion, CriterionValue, DateSpec, Operator, MAX_RELATIVE_DAYS,
};
pub use engine::SmartPlaylistEngine;
pub use field::{FieldKind, SmartField};
pub use library::SmartPlaylistLibrary;
pub use playlist::{
    EvaluationContext, MatchPolicy, OrderKey, PlaylistContents, SmartPlaylist, SortDirection,
};
