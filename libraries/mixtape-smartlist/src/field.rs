//! Track fields that rules and order-by clauses can reference

use chrono::{DateTime, Utc};
use mixtape_core::{MixtapeError, Result, Track};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Value shape of a field, which decides the operators it accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Numeric,
    Date,
}

/// A track field usable in criteria and order-by keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmartField {
    Artist,
    CompilationArtist,
    Album,
    Genre,
    Title,
    TrackNumber,
    Year,
    Rating,
    PlayCount,
    /// Track length in whole seconds
    Length,
    LastPlayed,
    DateAdded,
}

impl SmartField {
    pub const ALL: [SmartField; 12] = [
        Self::Artist,
        Self::CompilationArtist,
        Self::Album,
        Self::Genre,
        Self::Title,
        Self::TrackNumber,
        Self::Year,
        Self::Rating,
        Self::PlayCount,
        Self::Length,
        Self::LastPlayed,
        Self::DateAdded,
    ];

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Artist | Self::CompilationArtist | Self::Album | Self::Genre | Self::Title => {
                FieldKind::Text
            }
            Self::TrackNumber | Self::Year | Self::Rating | Self::PlayCount | Self::Length => {
                FieldKind::Numeric
            }
            Self::LastPlayed | Self::DateAdded => FieldKind::Date,
        }
    }

    /// Name shown in the playlist editor
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Artist => "Artist",
            Self::CompilationArtist => "Comp. Artist",
            Self::Album => "Album",
            Self::Genre => "Genre",
            Self::Title => "Title",
            Self::TrackNumber => "Track No.",
            Self::Year => "Year",
            Self::Rating => "Rating",
            Self::PlayCount => "Play Count",
            Self::Length => "Length",
            Self::LastPlayed => "Last Play",
            Self::DateAdded => "Date Imported",
        }
    }

    /// Stable name used in stored definitions
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::CompilationArtist => "compilation_artist",
            Self::Album => "album",
            Self::Genre => "genre",
            Self::Title => "title",
            Self::TrackNumber => "track_number",
            Self::Year => "year",
            Self::Rating => "rating",
            Self::PlayCount => "play_count",
            Self::Length => "length",
            Self::LastPlayed => "last_played",
            Self::DateAdded => "date_added",
        }
    }

    /// Parse a stored or display name
    ///
    /// # Errors
    /// `Configuration` for names that match no field
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized: String = name
            .trim()
            .trim_end_matches('.')
            .chars()
            .map(|c| match c {
                ' ' | '-' | '.' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        let field = match normalized.as_str() {
            "artist" => Self::Artist,
            "compilation_artist" | "comp__artist" | "comp_artist" => Self::CompilationArtist,
            "album" => Self::Album,
            "genre" => Self::Genre,
            "title" => Self::Title,
            "track_number" | "track_no" | "track" => Self::TrackNumber,
            "year" => Self::Year,
            "rating" => Self::Rating,
            "play_count" | "playcount" => Self::PlayCount,
            "length" | "duration" => Self::Length,
            "last_played" | "last_play" => Self::LastPlayed,
            "date_added" | "date_imported" => Self::DateAdded,
            _ => {
                return Err(MixtapeError::configuration(format!(
                    "unknown smart playlist field '{}'",
                    name
                )))
            }
        };
        Ok(field)
    }

    /// Text value; `None` for non-text fields
    pub(crate) fn text<'a>(self, track: &'a Track) -> Option<&'a str> {
        match self {
            Self::Artist => Some(&track.artist),
            Self::CompilationArtist => Some(track.compilation_artist.as_deref().unwrap_or("")),
            Self::Album => Some(&track.album),
            Self::Genre => Some(&track.genre),
            Self::Title => Some(&track.title),
            _ => None,
        }
    }

    /// Numeric value; `None` for non-numeric fields and unset values
    pub(crate) fn number(self, track: &Track) -> Option<i64> {
        match self {
            Self::TrackNumber => track.track_number.map(i64::from),
            Self::Year => track.year.map(i64::from),
            Self::Rating => Some(i64::from(track.rating.value())),
            Self::PlayCount => Some(i64::from(track.play_count)),
            Self::Length => Some((track.duration_ms / 1000) as i64),
            _ => None,
        }
    }

    /// Timestamp value; `None` for non-date fields and unset values
    pub(crate) fn date(self, track: &Track) -> Option<DateTime<Utc>> {
        match self {
            Self::LastPlayed => track.last_played,
            Self::DateAdded => Some(track.date_added),
            _ => None,
        }
    }

    /// Compare two tracks on this field, unset values first
    pub fn compare(self, a: &Track, b: &Track) -> Ordering {
        match self.kind() {
            FieldKind::Text => {
                let a = self.text(a).unwrap_or("").to_lowercase();
                let b = self.text(b).unwrap_or("").to_lowercase();
                a.cmp(&b)
            }
            FieldKind::Numeric => self.number(a).cmp(&self.number(b)),
            FieldKind::Date => self.date(a).cmp(&self.date(b)),
        }
    }
}

impl fmt::Display for SmartField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for SmartField {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SmartField {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_and_stored_names() {
        for field in SmartField::ALL {
            assert_eq!(SmartField::from_name(field.as_str()).unwrap(), field);
            assert_eq!(SmartField::from_name(field.display_name()).unwrap(), field);
        }
    }

    #[test]
    fn unknown_field_is_configuration_error() {
        let err = SmartField::from_name("Mood").unwrap_err();
        assert!(matches!(err, MixtapeError::Configuration(_)));
    }

    #[test]
    fn unset_values_sort_first() {
        let mut a = Track::new("A", "/a.ogg");
        let mut b = Track::new("B", "/b.ogg");
        a.year = None;
        b.year = Some(1970);
        assert_eq!(SmartField::Year.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn text_compare_ignores_case() {
        let a = Track::new("apple", "/a.ogg");
        let b = Track::new("Banana", "/b.ogg");
        assert_eq!(SmartField::Title.compare(&a, &b), Ordering::Less);
    }
}
