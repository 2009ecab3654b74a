//! Optical drive backed by the `cdparanoia` and `eject` tools

use async_trait::async_trait;
use mixtape_core::{Disc, DiscTrack};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

use crate::error::{Result, RipError};
use crate::traits::{OpticalDrive, TrackReader};
use crate::types::ParanoiaLevel;

const READ_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct CdParanoiaDrive {
    device: PathBuf,
    cdparanoia: PathBuf,
    eject: PathBuf,
}

impl CdParanoiaDrive {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            cdparanoia: PathBuf::from("cdparanoia"),
            eject: PathBuf::from("eject"),
        }
    }

    pub fn with_tools(mut self, cdparanoia: impl Into<PathBuf>, eject: impl Into<PathBuf>) -> Self {
        self.cdparanoia = cdparanoia.into();
        self.eject = eject.into();
        self
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    fn spawn_error(&self, tool: &Path, err: std::io::Error) -> RipError {
        RipError::device(format!("cannot run {} for {}: {}", tool.display(), self.device.display(), err))
    }
}

#[async_trait]
impl OpticalDrive for CdParanoiaDrive {
    async fn scan_disc(&self) -> Result<Disc> {
        debug!(device = %self.device.display(), "Querying table of contents");

        // The TOC listing goes to stderr
        let output = Command::new(&self.cdparanoia)
            .arg("-Q")
            .arg("-d")
            .arg(&self.device)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(&self.cdparanoia, e))?;

        let listing = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(RipError::device(format!(
                "{}: {}",
                self.device.display(),
                listing.lines().last().unwrap_or("no disc")
            )));
        }

        let tracks = parse_toc(&listing);
        if tracks.is_empty() {
            return Err(RipError::device(format!("{}: no audio tracks", self.device.display())));
        }

        Ok(Disc::from_toc(tracks))
    }

    async fn read_track(&self, track: &DiscTrack, paranoia: ParanoiaLevel) -> Result<Box<dyn TrackReader>> {
        let mut command = Command::new(&self.cdparanoia);
        command.arg("--quiet");
        if paranoia == ParanoiaLevel::Faster {
            command.arg("--disable-paranoia");
        }
        command
            .arg("-d")
            .arg(&self.device)
            .arg("--output-wav")
            .arg(track.number.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| self.spawn_error(&self.cdparanoia, e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RipError::device("cdparanoia stdout unavailable"))?;

        debug!(track = track.number, ?paranoia, "Reading track");
        Ok(Box::new(CdParanoiaReader {
            track: track.number,
            child,
            stdout,
        }))
    }

    async fn eject(&self) -> Result<()> {
        let status = Command::new(&self.eject)
            .arg(&self.device)
            .status()
            .await
            .map_err(|e| self.spawn_error(&self.eject, e))?;

        if !status.success() {
            return Err(RipError::device(format!("eject {} exited with {}", self.device.display(), status)));
        }
        info!(device = %self.device.display(), "Disc ejected");
        Ok(())
    }
}

struct CdParanoiaReader {
    track: u32,
    child: Child,
    stdout: ChildStdout,
}

#[async_trait]
impl TrackReader for CdParanoiaReader {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        let n = self
            .stdout
            .read(&mut buf)
            .await
            .map_err(|e| RipError::Read(format!("track {}: {}", self.track, e)))?;

        if n == 0 {
            let status = self
                .child
                .wait()
                .await
                .map_err(|e| RipError::Read(format!("track {}: {}", self.track, e)))?;
            if !status.success() {
                return Err(RipError::Read(format!("track {}: cdparanoia exited with {}", self.track, status)));
            }
            return Ok(None);
        }

        buf.truncate(n);
        Ok(Some(buf))
    }
}

/// Parse the table of contents printed by `cdparanoia -Q`
///
/// ```text
/// track        length               begin        copy pre ch
/// ===========================================================
///   1.    16503 [03:40.03]        0 [00:00.00]    no   no  2
/// ```
///
/// Begin sectors exclude the two-second lead-in.
pub fn parse_toc(listing: &str) -> Vec<DiscTrack> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let number = fields.next()?.strip_suffix('.')?.parse().ok()?;
            let length_sectors = fields.next()?.parse().ok()?;
            // Skip the [mm:ss.ff] length
            let start_sector = fields.nth(1)?.parse().ok()?;
            Some(DiscTrack {
                number,
                start_sector,
                length_sectors,
                title: None,
                artist: None,
            })
        })
        .collect()
}
