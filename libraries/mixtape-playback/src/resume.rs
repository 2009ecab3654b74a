//! Session resume
//!
//! A session is read once per context when the player starts and written
//! only on a clean stop or an explicit save. Crashes keep the previous
//! record.

use async_trait::async_trait;
use mixtape_core::{
    Catalog, CatalogSnapshot, PlaybackContext, ResumeMode, ResumeState, ResumeStore, Result,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::manager::PlaybackManager;
use crate::types::QueueTrack;

/// What a restore cued up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeTarget {
    /// Nothing restored
    Fresh,
    /// Stored queue from its first track
    FirstTrack,
    /// Stored track from its start; `index` is its source queue position
    Track { index: usize },
    /// Stored track at a stored offset
    Position { index: usize, offset: Duration },
}

/// Stored queue ids that still exist in the catalog, in stored order
///
/// When the stored queue is empty but a track id is present (radio), the
/// track alone forms the queue.
pub fn resolve_queue(state: &ResumeState, snapshot: &CatalogSnapshot) -> Vec<QueueTrack> {
    let ids: Vec<_> = if state.queue.is_empty() {
        state.track_id.iter().cloned().collect()
    } else {
        state.queue.clone()
    };

    ids.iter()
        .filter_map(|id| match snapshot.get(id) {
            Some(track) => Some(QueueTrack::from(track.as_ref())),
            None => {
                tracing::debug!(track_id = %id, "Dropping stored queue entry no longer in catalog");
                None
            }
        })
        .collect()
}

/// Binds a playback context and resume mode to a store
pub struct ResumeSession<S> {
    store: S,
    context: PlaybackContext,
    mode: ResumeMode,
}

impl<S: ResumeStore> ResumeSession<S> {
    pub fn new(store: S, context: PlaybackContext, mode: ResumeMode) -> Self {
        Self {
            store,
            context,
            mode,
        }
    }

    pub fn context(&self) -> PlaybackContext {
        self.context
    }

    /// Effective mode for this context
    pub fn mode(&self) -> ResumeMode {
        self.mode.effective_for(self.context)
    }

    /// Read the stored session and cue it in `manager`
    ///
    /// With resume off the store is not read and the manager is untouched.
    pub async fn restore(
        &self,
        manager: &mut PlaybackManager,
        catalog: &dyn Catalog,
    ) -> Result<ResumeTarget> {
        if self.mode() == ResumeMode::Off {
            return Ok(ResumeTarget::Fresh);
        }

        let Some(state) = self.store.load(self.context).await? else {
            tracing::debug!(context = %self.context, "No stored session");
            return Ok(ResumeTarget::Fresh);
        };

        let tracks = resolve_queue(&state, &catalog.snapshot());
        let target = manager.restore_session(tracks, Some(&state), self.mode);
        tracing::info!(context = %self.context, ?target, "Restored playback session");
        Ok(target)
    }

    /// Store the current session without stopping
    pub async fn save(&self, manager: &mut PlaybackManager) -> Result<()> {
        let state = manager.session_state(self.context);
        self.store.save(&state).await
    }

    /// Stop playback and store where it stopped
    pub async fn shutdown(&self, manager: &mut PlaybackManager) -> Result<ResumeState> {
        let state = manager.shutdown(self.context);
        self.store.save(&state).await?;
        Ok(state)
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear(self.context).await
    }
}

/// Process-local resume store
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    states: Mutex<HashMap<PlaybackContext, ResumeState>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn load(&self, context: PlaybackContext) -> Result<Option<ResumeState>> {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        Ok(states.get(&context).cloned())
    }

    async fn save(&self, state: &ResumeState) -> Result<()> {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.insert(state.context, state.clone());
        Ok(())
    }

    async fn clear(&self, context: PlaybackContext) -> Result<()> {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.remove(&context);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixtape_core::{Track, TrackId};

    fn snapshot(ids: &[&str]) -> CatalogSnapshot {
        CatalogSnapshot::from_tracks(
            ids.iter()
                .map(|id| Track::new(format!("Track {}", id), format!("/music/{}.ogg", id)).with_id(*id))
                .collect::<Vec<_>>(),
        )
        .unwrap()
    }

    #[test]
    fn resolve_drops_missing_tracks() {
        let mut state = ResumeState::new(PlaybackContext::MainPlayer);
        state.queue = vec![TrackId::new("a"), TrackId::new("gone"), TrackId::new("b")];

        let tracks = resolve_queue(&state, &snapshot(&["a", "b"]));
        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn resolve_radio_station_without_queue() {
        let mut state = ResumeState::new(PlaybackContext::Radio);
        state.track_id = Some(TrackId::new("station"));

        let tracks = resolve_queue(&state, &snapshot(&["station"]));
        assert_eq!(tracks.len(), 1);
    }

    #[tokio::test]
    async fn memory_store_keeps_contexts_apart() {
        let store = MemoryResumeStore::new();
        let mut main = ResumeState::new(PlaybackContext::MainPlayer);
        main.position_ms = 1_000;
        store.save(&main).await.unwrap();

        assert_eq!(store.load(PlaybackContext::MainPlayer).await.unwrap(), Some(main));
        assert!(store.load(PlaybackContext::Radio).await.unwrap().is_none());

        store.clear(PlaybackContext::MainPlayer).await.unwrap();
        assert!(store.load(PlaybackContext::MainPlayer).await.unwrap().is_none());
    }
}
