//! Copy-on-write in-memory catalog

use chrono::{DateTime, Utc};
use mixtape_core::{
    Catalog, CatalogSnapshot, MixtapeError, Result, Track, TrackId, TrackUpdate,
};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex, RwLock};

use crate::tracks;

/// In-memory track catalog
///
/// Writers are serialized by `writer`, copy the current snapshot, apply
/// their change to the copy and publish it with a single pointer swap.
/// Readers only ever clone the published `Arc`.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
    writer: Mutex<()>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from tracks, rejecting duplicate ids
    pub fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Result<Self> {
        Ok(Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::from_tracks(tracks)?)),
            writer: Mutex::new(()),
        })
    }

    /// Load the persisted catalog
    pub async fn hydrate(pool: &SqlitePool) -> Result<Self> {
        let tracks = tracks::load_all(pool).await?;
        tracing::info!(count = tracks.len(), "Catalog hydrated");
        Self::from_tracks(tracks)
    }

    fn write<T>(&self, change: impl FnOnce(&mut CatalogSnapshot) -> Result<T>) -> Result<T> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| MixtapeError::storage("catalog writer lock poisoned"))?;

        let mut next = CatalogSnapshot::clone(&self.snapshot());
        let output = change(&mut next)?;

        let mut current = self
            .current
            .write()
            .map_err(|_| MixtapeError::storage("catalog snapshot lock poisoned"))?;
        *current = Arc::new(next);
        Ok(output)
    }
}

impl Catalog for MemoryCatalog {
    fn snapshot(&self) -> Arc<CatalogSnapshot> {
        match self.current.read() {
            Ok(current) => Arc::clone(&current),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn insert(&self, track: Track) -> Result<TrackId> {
        let id = self.write(|snapshot| snapshot.insert(track))?;
        tracing::debug!(track_id = %id, "Track inserted");
        Ok(id)
    }

    fn update(&self, id: &TrackId, update: TrackUpdate) -> Result<Track> {
        self.write(|snapshot| {
            let mut track = snapshot
                .get(id)
                .map(|t| Track::clone(t))
                .ok_or_else(|| MixtapeError::TrackNotFound(id.clone()))?;
            update.apply_to(&mut track);
            snapshot.replace(track.clone())?;
            Ok(track)
        })
    }

    fn remove(&self, id: &TrackId) -> Result<Track> {
        let removed = self.write(|snapshot| snapshot.remove(id))?;
        tracing::debug!(track_id = %id, "Track removed");
        Ok(Track::clone(&removed))
    }

    fn record_play(&self, id: &TrackId, at: DateTime<Utc>) -> Result<Track> {
        self.write(|snapshot| {
            let mut track = snapshot
                .get(id)
                .map(|t| Track::clone(t))
                .ok_or_else(|| MixtapeError::TrackNotFound(id.clone()))?;
            track.play_count = track.play_count.saturating_add(1);
            track.last_played = Some(at);
            snapshot.replace(track.clone())?;
            Ok(track)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixtape_core::Rating;
    use std::thread;

    fn track(id: &str, title: &str) -> Track {
        Track::new(title, format!("/music/{}.ogg", id)).with_id(id)
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let catalog = MemoryCatalog::from_tracks(vec![track("a", "A")]).unwrap();
        let before = catalog.snapshot();

        catalog.insert(track("b", "B")).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(catalog.snapshot().len(), 2);
    }

    #[test]
    fn update_missing_track_is_not_found() {
        let catalog = MemoryCatalog::new();
        let err = catalog
            .update(&TrackId::new("ghost"), TrackUpdate::rating(Rating::new(3)))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn failed_write_publishes_nothing() {
        let catalog = MemoryCatalog::from_tracks(vec![track("a", "A")]).unwrap();
        let version = catalog.snapshot().version();

        assert!(catalog.insert(track("a", "Again")).is_err());
        assert_eq!(catalog.snapshot().version(), version);
        assert_eq!(catalog.get(&TrackId::new("a")).unwrap().title, "A");
    }

    #[test]
    fn record_play_increments_count() {
        let catalog = MemoryCatalog::from_tracks(vec![track("a", "A")]).unwrap();
        let now = Utc::now();

        let updated = catalog.record_play(&TrackId::new("a"), now).unwrap();
        assert_eq!(updated.play_count, 1);
        assert_eq!(updated.last_played, Some(now));
    }

    #[test]
    fn concurrent_writers_lose_no_updates() {
        let catalog = Arc::new(MemoryCatalog::from_tracks(vec![track("a", "A")]).unwrap());
        let id = TrackId::new("a");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                let id = id.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        catalog.record_play(&id, Utc::now()).unwrap();
                        assert!(catalog.snapshot().contains(&id));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(catalog.get(&id).unwrap().play_count, 200);
    }
}
