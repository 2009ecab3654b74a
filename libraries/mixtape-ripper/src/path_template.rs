//! Destination file names for ripped tracks
//!
//! Templates like `{AlbumArtist}/{Album}/{TrackNo} - {Title}` resolve to a
//! path relative to the library root.
//!
//! # Available Placeholders
//!
//! | Placeholder | Description | Fallback |
//! |-------------|-------------|----------|
//! | `{Artist}` | Track artist | "Unknown Artist" |
//! | `{AlbumArtist}` | Compilation artist | Falls back to `{Artist}` |
//! | `{Album}` | Album title | "Unknown Album" |
//! | `{Title}` | Track title | "Track NN" |
//! | `{TrackNo}` | Track number (zero-padded) | "00" |
//! | `{Year}` | Release year | "0000" |
//! | `{Genre}` | Genre | "Unknown" |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::TrackTags;

pub const DEFAULT_TEMPLATE: &str = "{AlbumArtist}/{Album}/{TrackNo} - {Title}";

/// Template with year-prefixed album folders
pub const YEAR_TEMPLATE: &str = "{AlbumArtist}/{Year} - {Album}/{TrackNo} - {Title}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTemplate {
    template: String,
    /// Replace spaces in every component with underscores
    #[serde(default)]
    replace_whitespace: bool,
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PathTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            replace_whitespace: false,
        }
    }

    pub fn with_whitespace_replacement(mut self, replace: bool) -> Self {
        self.replace_whitespace = replace;
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn replaces_whitespace(&self) -> bool {
        self.replace_whitespace
    }

    /// Resolve to a relative path ending in `.{extension}`
    pub fn resolve(&self, tags: &TrackTags, extension: &str) -> PathBuf {
        let mut resolved = self.template.clone();

        // Values are sanitized before substitution so a '/' in a title
        // cannot introduce a directory
        resolved = resolve_placeholder(&resolved, "AlbumArtist", || {
            tags.album_artist
                .as_deref()
                .filter(|a| !a.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| or_fallback(&tags.artist, "Unknown Artist"))
        });
        resolved = resolve_placeholder(&resolved, "Artist", || or_fallback(&tags.artist, "Unknown Artist"));
        resolved = resolve_placeholder(&resolved, "Album", || or_fallback(&tags.album, "Unknown Album"));
        resolved = resolve_placeholder(&resolved, "Title", || {
            if tags.title.trim().is_empty() {
                format!("Track {:02}", tags.track_number)
            } else {
                tags.title.clone()
            }
        });
        resolved = resolve_placeholder(&resolved, "TrackNo", || {
            if tags.track_number == 0 {
                "00".to_string()
            } else {
                format!("{:02}", tags.track_number)
            }
        });
        resolved = resolve_placeholder(&resolved, "Year", || {
            tags.year.map(|y| y.to_string()).unwrap_or_else(|| "0000".to_string())
        });
        resolved = resolve_placeholder(&resolved, "Genre", || or_fallback(&tags.genre, "Unknown"));

        let mut path = PathBuf::new();
        let components: Vec<&str> = resolved.split('/').filter(|c| !c.is_empty()).collect();
        let last = components.len().saturating_sub(1);

        for (i, component) in components.iter().enumerate() {
            let mut component = sanitize_path_component(component);
            if self.replace_whitespace {
                component = component.split_whitespace().collect::<Vec<_>>().join("_");
            }
            if i == last {
                component = format!("{}.{}", component, extension);
            }
            path.push(component);
        }

        path
    }
}

fn or_fallback(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn resolve_placeholder<F>(template: &str, name: &str, value_fn: F) -> String
where
    F: FnOnce() -> String,
{
    let placeholder = format!("{{{}}}", name);
    if template.contains(&placeholder) {
        template.replace(&placeholder, &value_fn().replace(['/', '\\'], "_"))
    } else {
        template.to_string()
    }
}

/// Make a single path component safe on common filesystems
pub fn sanitize_path_component(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Windows rejects trailing dots; this also defuses ".."
    let trimmed = sanitized.trim().trim_end_matches('.');

    let reserved = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    if reserved.contains(&trimmed.to_uppercase().as_str()) {
        format!("_{}", trimmed)
    } else if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> TrackTags {
        TrackTags {
            title: "Bohemian Rhapsody".to_string(),
            artist: "Queen".to_string(),
            album_artist: None,
            album: "A Night at the Opera".to_string(),
            genre: "Rock".to_string(),
            year: Some(1975),
            track_number: 11,
        }
    }

    #[test]
    fn default_template() {
        let path = PathTemplate::default().resolve(&tags(), "ogg");
        assert_eq!(path, PathBuf::from("Queen/A Night at the Opera/11 - Bohemian Rhapsody.ogg"));
    }

    #[test]
    fn year_and_genre_tokens() {
        let path = PathTemplate::new("{Genre}/{Year} - {Album}/{TrackNo}").resolve(&tags(), "flac");
        assert_eq!(path, PathBuf::from("Rock/1975 - A Night at the Opera/11.flac"));
    }

    #[test]
    fn fallbacks_for_missing_metadata() {
        let tags = TrackTags {
            track_number: 3,
            ..Default::default()
        };
        let path = PathTemplate::new("{AlbumArtist}/{Album}/{Year}/{TrackNo} - {Title}").resolve(&tags, "mp3");
        assert_eq!(path, PathBuf::from("Unknown Artist/Unknown Album/0000/03 - Track 03.mp3"));
    }

    #[test]
    fn compilation_artist_for_album_folder() {
        let mut tags = tags();
        tags.album_artist = Some("Various Artists".to_string());
        let path = PathTemplate::new("{AlbumArtist}/{Artist} - {Title}").resolve(&tags, "ogg");
        assert_eq!(path, PathBuf::from("Various Artists/Queen - Bohemian Rhapsody.ogg"));
    }

    #[test]
    fn whitespace_replacement() {
        let path = PathTemplate::default()
            .with_whitespace_replacement(true)
            .resolve(&tags(), "ogg");
        assert_eq!(path, PathBuf::from("Queen/A_Night_at_the_Opera/11_-_Bohemian_Rhapsody.ogg"));
    }

    #[test]
    fn slashes_in_values_stay_in_one_component() {
        let mut tags = tags();
        tags.title = "Either/Or: Live?".to_string();
        tags.album = "..".to_string();
        let path = PathTemplate::default().resolve(&tags, "ogg");
        assert_eq!(path, PathBuf::from("Queen/_/11 - Either_Or_ Live_.ogg"));
    }

    #[test]
    fn sanitize_reserved_names() {
        assert_eq!(sanitize_path_component("CON"), "_CON");
        assert_eq!(sanitize_path_component("  "), "_");
        assert_eq!(sanitize_path_component("Song."), "Song");
    }
}
