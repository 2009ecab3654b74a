use mixtape_core::{DiscFingerprint, DiscTrack, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Result, RipError};
use crate::profile::EncodingProfile;

/// Identifies one rip job within a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single rip job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RipStatus {
    Pending,
    Ripping,
    Encoding,
    Tagging,
    Done,
    Failed,
    Cancelled,
    SkippedDuplicate,
}

impl RipStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::Failed | Self::Cancelled | Self::SkippedDuplicate
        )
    }

    pub fn can_transition_to(self, next: RipStatus) -> bool {
        use RipStatus::{Cancelled, Done, Encoding, Failed, Pending, Ripping, SkippedDuplicate, Tagging};

        match (self, next) {
            (Pending, Ripping | SkippedDuplicate)
            | (Ripping, Encoding | Failed)
            | (Encoding, Tagging | Failed)
            | (Tagging, Done | Failed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Ripping => "ripping",
            Self::Encoding => "encoding",
            Self::Tagging => "tagging",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::SkippedDuplicate => "skipped_duplicate",
        };
        f.write_str(name)
    }
}

/// Drive error-correction level, applied to every read in a rip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParanoiaLevel {
    /// No verification; fast but may pass on scratches as clicks
    Faster,
    /// Full verification with retries
    #[default]
    Full,
}

/// What to do when a disc track was ripped before
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Leave the earlier rip alone and skip the job
    #[default]
    Skip,
    /// Delete the earlier file and catalog entry, then rip again
    Confirm,
}

/// Album-level metadata entered for a disc before ripping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    pub artist: String,
    pub album: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub year: Option<u32>,
    /// Set for compilations; per-track artists come from the disc
    #[serde(default)]
    pub compilation_artist: Option<String>,
    /// Titles by track number, overriding CD-Text
    #[serde(default)]
    pub titles: Vec<String>,
}

/// Tags written into an encoded file and used to build its path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album_artist: Option<String>,
    pub album: String,
    pub genre: String,
    pub year: Option<u32>,
    pub track_number: u32,
}

impl TrackTags {
    /// Tags for `track`, preferring entered titles over CD-Text
    pub fn for_track(album: &AlbumInfo, track: &DiscTrack) -> Self {
        let index = track.number.saturating_sub(1) as usize;
        let title = album
            .titles
            .get(index)
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .or_else(|| track.title.clone())
            .unwrap_or_else(|| format!("Track {:02}", track.number));

        let artist = match (&album.compilation_artist, &track.artist) {
            (Some(_), Some(performer)) => performer.clone(),
            _ => album.artist.clone(),
        };

        Self {
            title,
            artist,
            album_artist: album.compilation_artist.clone(),
            album: album.album.clone(),
            genre: album.genre.clone(),
            year: album.year,
            track_number: track.number,
        }
    }
}

/// One disc track to rip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipJob {
    pub id: JobId,
    pub disc_track: DiscTrack,
    pub fingerprint: DiscFingerprint,
    pub tags: TrackTags,
    pub profile: EncodingProfile,
    /// Final file path under the library root
    pub destination: PathBuf,
    pub status: RipStatus,
    /// Last error for failed jobs
    #[serde(default)]
    pub error: Option<String>,
    /// Catalog entry created for a finished job
    #[serde(default)]
    pub track_id: Option<TrackId>,
}

impl RipJob {
    pub fn new(
        disc_track: DiscTrack,
        fingerprint: DiscFingerprint,
        tags: TrackTags,
        profile: EncodingProfile,
        destination: PathBuf,
    ) -> Self {
        Self {
            id: JobId::generate(),
            disc_track,
            fingerprint,
            tags,
            profile,
            destination,
            status: RipStatus::Pending,
            error: None,
            track_id: None,
        }
    }

    pub fn track_number(&self) -> u32 {
        self.disc_track.number
    }

    /// Path the encoder writes to until the job succeeds
    pub fn part_path(&self) -> PathBuf {
        part_path(&self.destination)
    }

    /// Move to `next`, rejecting changes the job lifecycle does not allow
    pub fn transition(&mut self, next: RipStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(RipError::InvalidTransition {
                job: self.id,
                from: self.status,
                to: next,
            });
        }
        tracing::debug!(job = %self.id, track = self.track_number(), from = %self.status, to = %next, "Rip job status");
        self.status = next;
        Ok(())
    }
}

pub(crate) fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Progress reported while a rip runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RipEvent {
    StatusChanged {
        job: JobId,
        track: u32,
        status: RipStatus,
    },
    /// Bytes moved through the current stage
    Progress {
        job: JobId,
        track: u32,
        stage: RipStatus,
        bytes: u64,
        total_bytes: u64,
    },
    DuplicateFound {
        job: JobId,
        track: u32,
        existing: Vec<TrackId>,
        overwrite: bool,
    },
    JobFailed {
        job: JobId,
        track: u32,
        message: String,
    },
    PostProcessFailed {
        message: String,
    },
    Ejected,
}

/// Outcome of a finished rip
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RipSummary {
    pub disc_id: String,
    /// Every job in track order, in its final status
    pub jobs: Vec<RipJob>,
    pub post_process_error: Option<String>,
    pub ejected: bool,
    pub duration_seconds: u64,
}

impl RipSummary {
    pub fn count(&self, status: RipStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }

    pub fn done(&self) -> usize {
        self.count(RipStatus::Done)
    }

    pub fn job_for_track(&self, track: u32) -> Option<&RipJob> {
        self.jobs.iter().find(|j| j.track_number() == track)
    }
}
