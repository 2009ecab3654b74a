//! Smart playlist categories

use mixtape_core::{MixtapeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::playlist::SmartPlaylist;

/// Smart playlists grouped by category name
///
/// Playlist names are unique within a category. Deleting a category
/// deletes its playlists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartPlaylistLibrary {
    categories: BTreeMap<String, BTreeMap<String, SmartPlaylist>>,
}

impl SmartPlaylistLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    pub fn create_category(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MixtapeError::configuration("category name is empty"));
        }
        if self.categories.contains_key(name) {
            return Err(MixtapeError::duplicate(format!("category '{}'", name)));
        }
        self.categories.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    /// Rename a category, re-homing its playlists
    pub fn rename_category(&mut self, from: &str, to: &str) -> Result<()> {
        let to = to.trim();
        if to.is_empty() {
            return Err(MixtapeError::configuration("category name is empty"));
        }
        if from == to {
            return Ok(());
        }
        if self.categories.contains_key(to) {
            return Err(MixtapeError::duplicate(format!("category '{}'", to)));
        }
        let mut playlists = self
            .categories
            .remove(from)
            .ok_or_else(|| MixtapeError::not_found("Category", from))?;
        for playlist in playlists.values_mut() {
            playlist.category = to.to_string();
        }
        self.categories.insert(to.to_string(), playlists);
        Ok(())
    }

    /// Delete a category and return the playlists it held
    pub fn delete_category(&mut self, name: &str) -> Result<Vec<SmartPlaylist>> {
        self.categories
            .remove(name)
            .map(|playlists| playlists.into_values().collect())
            .ok_or_else(|| MixtapeError::not_found("Category", name))
    }

    /// Add or replace a playlist in its category
    ///
    /// The category is created on first use. The definition is validated
    /// before it is stored.
    pub fn save(&mut self, playlist: SmartPlaylist) -> Result<Option<SmartPlaylist>> {
        playlist.validate()?;
        if playlist.category.trim().is_empty() {
            return Err(MixtapeError::configuration(format!(
                "smart playlist '{}' has no category",
                playlist.name
            )));
        }
        let category = self.categories.entry(playlist.category.clone()).or_default();
        Ok(category.insert(playlist.name.clone(), playlist))
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&SmartPlaylist> {
        self.categories.get(category)?.get(name)
    }

    pub fn remove(&mut self, category: &str, name: &str) -> Result<SmartPlaylist> {
        self.categories
            .get_mut(category)
            .and_then(|playlists| playlists.remove(name))
            .ok_or_else(|| MixtapeError::not_found("Smart playlist", format!("{}/{}", category, name)))
    }

    /// Playlists of a category, sorted by name
    pub fn playlists(&self, category: &str) -> Vec<&SmartPlaylist> {
        self.categories
            .get(category)
            .map(|playlists| playlists.values().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
