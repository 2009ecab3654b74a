/// Audio CD table-of-contents types
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// CD audio frames (sectors) per second
pub const SECTORS_PER_SECOND: u32 = 75;

/// Pregap before the first track, in sectors
const LEAD_IN_SECTORS: u32 = 150;

/// One audio track from a disc's table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscTrack {
    /// 1-based track number on the disc
    pub number: u32,
    pub start_sector: u32,
    pub length_sectors: u32,
    /// CD-Text title, when the disc carries one
    #[serde(default)]
    pub title: Option<String>,
    /// CD-Text performer
    #[serde(default)]
    pub artist: Option<String>,
}

impl DiscTrack {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.length_sectors) * 1000 / u64::from(SECTORS_PER_SECOND))
    }
}

/// Identifies a ripped track across rips of the same disc
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscFingerprint {
    pub disc_id: String,
    pub track_number: u32,
}

impl DiscFingerprint {
    pub fn new(disc_id: impl Into<String>, track_number: u32) -> Self {
        Self {
            disc_id: disc_id.into(),
            track_number,
        }
    }
}

impl fmt::Display for DiscFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.disc_id, self.track_number)
    }
}

/// A scanned disc: its id and table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disc {
    pub id: String,
    pub tracks: Vec<DiscTrack>,
}

impl Disc {
    /// Build a disc from its table of contents, computing the disc id
    pub fn from_toc(tracks: Vec<DiscTrack>) -> Self {
        Self {
            id: cddb_disc_id(&tracks),
            tracks,
        }
    }

    pub fn track(&self, number: u32) -> Option<&DiscTrack> {
        self.tracks.iter().find(|t| t.number == number)
    }

    pub fn fingerprint(&self, track_number: u32) -> DiscFingerprint {
        DiscFingerprint::new(self.id.clone(), track_number)
    }

    pub fn total_duration(&self) -> Duration {
        self.tracks.iter().map(DiscTrack::duration).sum()
    }
}

fn digit_sum(mut n: u32) -> u32 {
    let mut sum = 0;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum
}

/// CDDB (freedb) disc id for a table of contents, as 8 lowercase hex digits
pub fn cddb_disc_id(tracks: &[DiscTrack]) -> String {
    let (Some(first), Some(last)) = (tracks.first(), tracks.last()) else {
        return "00000000".to_string();
    };

    let checksum: u32 = tracks
        .iter()
        .map(|t| digit_sum((t.start_sector + LEAD_IN_SECTORS) / SECTORS_PER_SECOND))
        .sum();

    let first_offset = (first.start_sector + LEAD_IN_SECTORS) / SECTORS_PER_SECOND;
    let leadout = (last.start_sector + last.length_sectors + LEAD_IN_SECTORS) / SECTORS_PER_SECOND;
    let total_seconds = leadout.saturating_sub(first_offset);

    let id = ((checksum % 0xff) << 24) | ((total_seconds & 0xffff) << 8) | (tracks.len() as u32 & 0xff);
    format!("{:08x}", id)
}
