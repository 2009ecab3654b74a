/// Collaborator traits for Mixtape
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{MixtapeError, Result};
use crate::types::{
    CatalogSnapshot, DiscFingerprint, PlaybackContext, ResumeState, Track, TrackId, TrackUpdate,
};

/// Track catalog
///
/// Single writer, many readers. Readers work on the snapshot current at
/// the time they asked for it; writes publish a new snapshot atomically.
pub trait Catalog: Send + Sync {
    /// Current published snapshot
    fn snapshot(&self) -> Arc<CatalogSnapshot>;

    /// Insert a new track
    ///
    /// # Errors
    /// `Duplicate` when a track with the same id already exists
    fn insert(&self, track: Track) -> Result<TrackId>;

    /// Apply a partial update and return the new record
    ///
    /// # Errors
    /// `TrackNotFound` when the id is unknown
    fn update(&self, id: &TrackId, update: TrackUpdate) -> Result<Track>;

    /// Remove a track and return the removed record
    fn remove(&self, id: &TrackId) -> Result<Track>;

    /// Increment the play count and stamp the last-played time
    fn record_play(&self, id: &TrackId, at: DateTime<Utc>) -> Result<Track>;

    fn get(&self, id: &TrackId) -> Result<Track> {
        self.snapshot()
            .get(id)
            .map(|t| Track::clone(t))
            .ok_or_else(|| MixtapeError::TrackNotFound(id.clone()))
    }

    /// Tracks matching `predicate`, in insertion order
    fn query(&self, predicate: &dyn Fn(&Track) -> bool) -> Vec<Track> {
        self.snapshot()
            .iter()
            .filter(|t| predicate(t))
            .map(|t| Track::clone(t))
            .collect()
    }

    /// Tracks previously ripped from the given disc position
    fn find_by_fingerprint(&self, fingerprint: &DiscFingerprint) -> Vec<Track> {
        self.snapshot()
            .find_by_fingerprint(fingerprint)
            .into_iter()
            .map(|t| Track::clone(&t))
            .collect()
    }
}

/// Persistence for per-context resume records
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn load(&self, context: PlaybackContext) -> Result<Option<ResumeState>>;

    /// Replace the record for `state.context`
    async fn save(&self, state: &ResumeState) -> Result<()>;

    async fn clear(&self, context: PlaybackContext) -> Result<()>;
}

#[async_trait]
impl<T: ResumeStore + ?Sized> ResumeStore for Arc<T> {
    async fn load(&self, context: PlaybackContext) -> Result<Option<ResumeState>> {
        (**self).load(context).await
    }

    async fn save(&self, state: &ResumeState) -> Result<()> {
        (**self).save(state).await
    }

    async fn clear(&self, context: PlaybackContext) -> Result<()> {
        (**self).clear(context).await
    }
}
