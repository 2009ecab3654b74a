/// Immutable catalog views
use std::collections::HashMap;
use std::sync::Arc;

use super::disc::DiscFingerprint;
use super::ids::TrackId;
use super::track::Track;
use crate::error::{MixtapeError, Result};

/// A published, immutable view of the catalog
///
/// Readers hold an `Arc<CatalogSnapshot>` for as long as they need a
/// consistent view. Writers mutate a private clone and publish it whole,
/// so a reader never sees a half-applied change. Iteration follows
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    version: u64,
    order: Vec<TrackId>,
    tracks: HashMap<TrackId, Arc<Track>>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from tracks, rejecting duplicate ids
    pub fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Result<Self> {
        let mut snapshot = Self::new();
        for track in tracks {
            snapshot.insert(track)?;
        }
        snapshot.version = 0;
        Ok(snapshot)
    }

    /// Monotonic publish counter
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &TrackId) -> Option<&Arc<Track>> {
        self.tracks.get(id)
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.contains_key(id)
    }

    /// Tracks in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Track>> + '_ {
        self.order.iter().filter_map(|id| self.tracks.get(id))
    }

    pub fn find_by_fingerprint(&self, fingerprint: &DiscFingerprint) -> Vec<Arc<Track>> {
        self.iter()
            .filter(|t| t.disc_fingerprint.as_ref() == Some(fingerprint))
            .cloned()
            .collect()
    }

    // Mutators are only used by catalog writers on their private copy.

    pub fn insert(&mut self, track: Track) -> Result<TrackId> {
        if self.tracks.contains_key(&track.id) {
            return Err(MixtapeError::duplicate(format!("track id {}", track.id)));
        }
        let id = track.id.clone();
        self.order.push(id.clone());
        self.tracks.insert(id.clone(), Arc::new(track));
        self.version += 1;
        Ok(id)
    }

    pub fn replace(&mut self, track: Track) -> Result<()> {
        let slot = self
            .tracks
            .get_mut(&track.id)
            .ok_or_else(|| MixtapeError::TrackNotFound(track.id.clone()))?;
        *slot = Arc::new(track);
        self.version += 1;
        Ok(())
    }

    pub fn remove(&mut self, id: &TrackId) -> Result<Arc<Track>> {
        let track = self
            .tracks
            .remove(id)
            .ok_or_else(|| MixtapeError::TrackNotFound(id.clone()))?;
        self.order.retain(|existing| existing != id);
        self.version += 1;
        Ok(track)
    }
}
