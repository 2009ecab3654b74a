//! Evaluation of smart playlists against a live catalog

use chrono::Utc;
use mixtape_core::{Catalog, Result, Track};
use std::sync::Arc;

use crate::playlist::{EvaluationContext, PlaylistContents, SmartPlaylist};

/// Runs smart playlists against the catalog's current snapshot
///
/// Every call takes a fresh snapshot, so results reflect catalog changes
/// made since the previous evaluation.
pub struct SmartPlaylistEngine {
    catalog: Arc<dyn Catalog>,
}

impl SmartPlaylistEngine {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    pub fn evaluate(&self, playlist: &SmartPlaylist) -> Result<Vec<Arc<Track>>> {
        self.evaluate_with(playlist, &EvaluationContext::default())
    }

    pub fn evaluate_with(&self, playlist: &SmartPlaylist, ctx: &EvaluationContext) -> Result<Vec<Arc<Track>>> {
        let snapshot = self.catalog.snapshot();
        let tracks = playlist.evaluate(&snapshot, ctx)?;
        tracing::debug!(
            playlist = %playlist.name,
            catalog_version = snapshot.version(),
            matched = tracks.len(),
            "Smart playlist evaluated"
        );
        Ok(tracks)
    }

    /// Match count shown while editing, before any limit
    pub fn count_matches(&self, playlist: &SmartPlaylist) -> Result<usize> {
        playlist.count_matches(&self.catalog.snapshot(), &EvaluationContext::default())
    }

    /// Evaluate and keep the result as a static track list
    pub fn materialize(&self, playlist: &SmartPlaylist) -> Result<PlaylistContents> {
        let ctx = EvaluationContext::at(Utc::now());
        let tracks = self.evaluate_with(playlist, &ctx)?;
        Ok(PlaylistContents::from_tracks(playlist.name.clone(), &tracks, ctx.now))
    }
}
