//! Rip orchestration: duplicate checks, drive reads, encoding and cataloguing

use mixtape_core::{Catalog, Disc, Track};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::RipConfig;
use crate::error::{Result, RipError};
use crate::traits::{AudioEncoder, CancelFlag, OpticalDrive};
use crate::types::{AlbumInfo, OverwritePolicy, ParanoiaLevel, RipEvent, RipJob, RipStatus, RipSummary, TrackTags};

const EVENT_BUFFER: usize = 256;

/// WAV header written ahead of the PCM data
const WAV_HEADER_BYTES: u64 = 44;

/// Bytes of 16-bit stereo PCM per CD sector
const BYTES_PER_SECTOR: u64 = 2352;

/// Rips disc tracks into the library
pub struct RipPipeline {
    drive: Arc<dyn OpticalDrive>,
    encoder: Arc<dyn AudioEncoder>,
    catalog: Arc<dyn Catalog>,
    config: RipConfig,
    cancel: CancelFlag,
}

/// State shared by every job of one run
struct RipContext {
    drive: Arc<dyn OpticalDrive>,
    /// Held for the whole read of a track
    drive_lock: Mutex<()>,
    encoder: Arc<dyn AudioEncoder>,
    catalog: Arc<dyn Catalog>,
    paranoia: ParanoiaLevel,
    overwrite: OverwritePolicy,
    cancel: CancelFlag,
    /// Set when a job hits a pipeline-fatal error
    abort: CancelFlag,
    events: mpsc::Sender<RipEvent>,
}

impl RipContext {
    fn stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.abort.is_cancelled()
    }

    async fn emit(&self, event: RipEvent) {
        // Receiver may be gone; the rip carries on regardless
        let _ = self.events.send(event).await;
    }

    /// Progress is best-effort and dropped when the receiver lags
    fn progress(&self, job: &RipJob, bytes: u64) {
        let _ = self.events.try_send(RipEvent::Progress {
            job: job.id,
            track: job.track_number(),
            stage: job.status,
            bytes,
            total_bytes: expected_bytes(job),
        });
    }

    async fn set_status(&self, job: &mut RipJob, status: RipStatus) -> Result<()> {
        job.transition(status)?;
        self.emit(RipEvent::StatusChanged {
            job: job.id,
            track: job.track_number(),
            status,
        })
        .await;
        Ok(())
    }
}

struct JobOutcome {
    job: RipJob,
    fatal: Option<RipError>,
}

impl RipPipeline {
    pub fn new(
        drive: Arc<dyn OpticalDrive>,
        encoder: Arc<dyn AudioEncoder>,
        catalog: Arc<dyn Catalog>,
        config: RipConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            drive,
            encoder,
            catalog,
            config,
            cancel: CancelFlag::new(),
        })
    }

    pub fn config(&self) -> &RipConfig {
        &self.config
    }

    /// Flag that cancels the running rip; clones share it
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        info!("Rip cancellation requested");
        self.cancel.cancel();
    }

    pub async fn scan(&self) -> Result<Disc> {
        let disc = self.drive.scan_disc().await?;
        info!(disc_id = %disc.id, tracks = disc.tracks.len(), "Disc scanned");
        Ok(disc)
    }

    /// One pending job per disc track, with tags and destination resolved
    pub fn plan(&self, disc: &Disc, album: &AlbumInfo) -> Vec<RipJob> {
        let profile = self.config.profile();

        disc.tracks
            .iter()
            .map(|track| {
                let tags = TrackTags::for_track(album, track);
                let destination = self
                    .config
                    .library_root
                    .join(self.config.template.resolve(&tags, profile.extension()));
                RipJob::new(
                    track.clone(),
                    disc.fingerprint(track.number),
                    tags,
                    profile,
                    destination,
                )
            })
            .collect()
    }

    /// Run `jobs` in the background
    ///
    /// Events stream over the returned receiver. The handle resolves to the
    /// summary, or to the first pipeline-fatal error with the job that hit
    /// it. A cancellation raised before starting stops every job; the flag
    /// is cleared once the run it stopped has finished.
    pub fn start(
        &self,
        jobs: Vec<RipJob>,
    ) -> (mpsc::Receiver<RipEvent>, JoinHandle<Result<RipSummary>>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let ctx = Arc::new(RipContext {
            drive: Arc::clone(&self.drive),
            drive_lock: Mutex::new(()),
            encoder: Arc::clone(&self.encoder),
            catalog: Arc::clone(&self.catalog),
            paranoia: self.config.paranoia,
            overwrite: self.config.overwrite,
            cancel: self.cancel.clone(),
            abort: CancelFlag::new(),
            events: tx,
        });
        let config = self.config.clone();
        let cancel = self.cancel.clone();

        let handle = tokio::spawn(async move {
            let result = Self::rip_impl(ctx, config, jobs).await;
            cancel.reset();
            result
        });

        (rx, handle)
    }

    async fn rip_impl(ctx: Arc<RipContext>, config: RipConfig, jobs: Vec<RipJob>) -> Result<RipSummary> {
        let start_time = Instant::now();
        let disc_id = jobs
            .first()
            .map(|j| j.fingerprint.disc_id.clone())
            .unwrap_or_default();

        info!(disc_id = %disc_id, jobs = jobs.len(), workers = config.max_concurrent_jobs, "Starting rip");

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let mut workers = JoinSet::new();
        let mut finished = Vec::with_capacity(jobs.len());

        for job in jobs {
            if job.status != RipStatus::Pending {
                debug!(job = %job.id, status = %job.status, "Skipping job that is not pending");
                finished.push(job);
                continue;
            }

            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            workers.spawn(async move {
                // Closed only on drop, which cannot happen while workers hold it
                let _permit = semaphore.acquire_owned().await;
                run_job(&ctx, job).await
            });
        }

        let mut fatal = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => {
                    if fatal.is_none() {
                        fatal = outcome.fatal;
                    }
                    finished.push(outcome.job);
                }
                Err(e) => {
                    error!("Rip worker panicked: {}", e);
                    ctx.abort.cancel();
                    if fatal.is_none() {
                        fatal = Some(RipError::Worker(e.to_string()));
                    }
                }
            }
        }

        finished.sort_by_key(RipJob::track_number);

        if let Some(err) = fatal {
            error!("Rip aborted: {}", err);
            return Err(err);
        }

        let mut summary = RipSummary {
            disc_id,
            jobs: finished,
            ..Default::default()
        };

        if let Some(script) = &config.post_process {
            if ready_for_post_process(&summary) && !ctx.stopped() {
                if let Err(e) = run_post_process(script, &summary).await {
                    warn!("{}", e);
                    summary.post_process_error = Some(e.to_string());
                    ctx.emit(RipEvent::PostProcessFailed { message: e.to_string() }).await;
                }
            }
        }

        if config.eject_after && !ctx.stopped() {
            match ctx.drive.eject().await {
                Ok(()) => {
                    summary.ejected = true;
                    ctx.emit(RipEvent::Ejected).await;
                }
                Err(e) => warn!("Eject failed: {}", e),
            }
        }

        summary.duration_seconds = start_time.elapsed().as_secs();
        info!(
            disc_id = %summary.disc_id,
            done = summary.done(),
            failed = summary.count(RipStatus::Failed),
            skipped = summary.count(RipStatus::SkippedDuplicate),
            cancelled = summary.count(RipStatus::Cancelled),
            "Rip finished"
        );

        Ok(summary)
    }
}

/// Drive one job to a terminal status
async fn run_job(ctx: &RipContext, mut job: RipJob) -> JobOutcome {
    let err = match rip_one(ctx, &mut job).await {
        Ok(()) => return JobOutcome { job, fatal: None },
        Err(err) => err,
    };

    discard_output(&job).await;

    if matches!(err, RipError::Cancelled) {
        info!(job = %job.id, track = job.track_number(), "Rip job cancelled");
        finish_unsuccessful(ctx, &mut job, RipStatus::Cancelled).await;
        return JobOutcome { job, fatal: None };
    }

    job.error = Some(err.to_string());
    let status = if job.status.can_transition_to(RipStatus::Failed) {
        RipStatus::Failed
    } else {
        RipStatus::Cancelled
    };

    if err.is_fatal() {
        error!(job = %job.id, track = job.track_number(), "Rip job hit a fatal error: {}", err);
        ctx.abort.cancel();
        finish_unsuccessful(ctx, &mut job, status).await;
        let fatal = RipError::Aborted {
            job: job.id,
            track: job.track_number(),
            source: Box::new(err),
        };
        return JobOutcome {
            job,
            fatal: Some(fatal),
        };
    }

    warn!(job = %job.id, track = job.track_number(), "Rip job failed: {}", err);
    ctx.emit(RipEvent::JobFailed {
        job: job.id,
        track: job.track_number(),
        message: err.to_string(),
    })
    .await;
    finish_unsuccessful(ctx, &mut job, status).await;
    JobOutcome { job, fatal: None }
}

async fn finish_unsuccessful(ctx: &RipContext, job: &mut RipJob, status: RipStatus) {
    if let Err(e) = ctx.set_status(job, status).await {
        // Already terminal
        debug!("{}", e);
    }
}

async fn rip_one(ctx: &RipContext, job: &mut RipJob) -> Result<()> {
    if ctx.stopped() {
        return Err(RipError::Cancelled);
    }

    if skip_duplicate(ctx, job).await? {
        return Ok(());
    }

    let audio = read_from_drive(ctx, job).await?;

    ctx.set_status(job, RipStatus::Encoding).await?;
    encode(ctx, job, &audio).await?;

    ctx.set_status(job, RipStatus::Tagging).await?;
    let id = ctx.catalog.insert(catalog_entry(job))?;
    job.track_id = Some(id);

    ctx.set_status(job, RipStatus::Done).await?;
    info!(job = %job.id, track = job.track_number(), path = %job.destination.display(), "Track ripped");
    Ok(())
}

/// Returns true when the job was skipped as a duplicate
async fn skip_duplicate(ctx: &RipContext, job: &mut RipJob) -> Result<bool> {
    let existing = ctx.catalog.find_by_fingerprint(&job.fingerprint);
    if existing.is_empty() {
        return Ok(false);
    }

    let overwrite = ctx.overwrite == OverwritePolicy::Confirm;
    ctx.emit(RipEvent::DuplicateFound {
        job: job.id,
        track: job.track_number(),
        existing: existing.iter().map(|t| t.id.clone()).collect(),
        overwrite,
    })
    .await;

    if !overwrite {
        info!(fingerprint = %job.fingerprint, "Track already ripped, skipping");
        ctx.set_status(job, RipStatus::SkippedDuplicate).await?;
        return Ok(true);
    }

    for track in existing {
        info!(track_id = %track.id, path = %track.file_path.display(), "Replacing earlier rip");
        remove_if_exists(&track.file_path).await?;
        match ctx.catalog.remove(&track.id) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(false)
}

/// Read the whole track while holding the drive
async fn read_from_drive(ctx: &RipContext, job: &mut RipJob) -> Result<Vec<Vec<u8>>> {
    let _drive = ctx.drive_lock.lock().await;
    if ctx.stopped() {
        return Err(RipError::Cancelled);
    }

    ctx.set_status(job, RipStatus::Ripping).await?;
    let mut reader = ctx.drive.read_track(&job.disc_track, ctx.paranoia).await?;

    let mut chunks = Vec::new();
    let mut bytes = 0u64;
    while let Some(chunk) = reader.read_chunk().await? {
        if ctx.stopped() {
            return Err(RipError::Cancelled);
        }
        bytes += chunk.len() as u64;
        chunks.push(chunk);
        ctx.progress(job, bytes);
    }

    debug!(job = %job.id, bytes, "Track read from drive");
    Ok(chunks)
}

async fn encode(ctx: &RipContext, job: &RipJob, audio: &[Vec<u8>]) -> Result<()> {
    let part = job.part_path();
    if let Some(parent) = part.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| RipError::io(parent, e))?;
    }

    let mut session = ctx.encoder.start(&part, &job.profile, &job.tags).await?;

    let mut bytes = 0u64;
    for chunk in audio {
        if ctx.stopped() {
            session.abort().await;
            return Err(RipError::Cancelled);
        }
        if let Err(e) = session.write(chunk).await {
            session.abort().await;
            return Err(e);
        }
        bytes += chunk.len() as u64;
        ctx.progress(job, bytes);
    }

    session.finish().await?;

    if ctx.stopped() {
        return Err(RipError::Cancelled);
    }

    tokio::fs::rename(&part, &job.destination)
        .await
        .map_err(|e| RipError::io(&job.destination, e))
}

fn catalog_entry(job: &RipJob) -> Track {
    let tags = &job.tags;
    let mut track = Track::new(tags.title.clone(), job.destination.clone());
    track.artist = tags.artist.clone();
    track.compilation_artist = tags.album_artist.clone();
    track.album = tags.album.clone();
    track.genre = tags.genre.clone();
    track.year = tags.year;
    track.track_number = Some(tags.track_number);
    track.duration_ms = job.disc_track.duration().as_millis() as u64;
    track.disc_fingerprint = Some(job.fingerprint.clone());
    track
}

/// Remove whatever a failed or cancelled job left behind
async fn discard_output(job: &RipJob) {
    let mut leftovers = vec![job.part_path()];
    // Renamed into place but never catalogued
    if job.status == RipStatus::Tagging {
        leftovers.push(job.destination.clone());
    }

    for path in leftovers {
        if let Err(e) = remove_if_exists(&path).await {
            warn!("Could not remove partial file: {}", e);
        }
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RipError::io(path, e)),
    }
}

fn expected_bytes(job: &RipJob) -> u64 {
    u64::from(job.disc_track.length_sectors) * BYTES_PER_SECTOR + WAV_HEADER_BYTES
}

/// Every job that was not skipped finished, and at least one did
fn ready_for_post_process(summary: &RipSummary) -> bool {
    summary.done() > 0
        && summary
            .jobs
            .iter()
            .all(|j| matches!(j.status, RipStatus::Done | RipStatus::SkippedDuplicate))
}

async fn run_post_process(script: &Path, summary: &RipSummary) -> Result<()> {
    let files: Vec<&Path> = summary
        .jobs
        .iter()
        .filter(|j| j.status == RipStatus::Done)
        .map(|j| j.destination.as_path())
        .collect();

    info!(script = %script.display(), files = files.len(), "Running post-processing script");

    let output = tokio::process::Command::new(script)
        .args(&files)
        .output()
        .await
        .map_err(|e| RipError::PostProcess(format!("{}: {}", script.display(), e)))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(RipError::PostProcess(format!(
            "{} exited with {}: {}",
            script.display(),
            output.status,
            stderr.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::EncodingProfile;
    use mixtape_core::{DiscFingerprint, DiscTrack};
    use std::path::PathBuf;

    fn job(track: u32, status: RipStatus) -> RipJob {
        let mut job = RipJob::new(
            DiscTrack {
                number: track,
                start_sector: 0,
                length_sectors: 75,
                title: None,
                artist: None,
            },
            DiscFingerprint::new("0a0b0c0d", track),
            TrackTags::default(),
            EncodingProfile::default(),
            PathBuf::from(format!("/music/{}.ogg", track)),
        );
        job.status = status;
        job
    }

    fn summary(statuses: &[RipStatus]) -> RipSummary {
        RipSummary {
            jobs: statuses.iter().enumerate().map(|(i, s)| job(i as u32 + 1, *s)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn post_process_after_all_done() {
        assert!(ready_for_post_process(&summary(&[RipStatus::Done, RipStatus::Done])));
        assert!(ready_for_post_process(&summary(&[RipStatus::Done, RipStatus::SkippedDuplicate])));
    }

    #[test]
    fn no_post_process_after_failures_or_nothing_ripped() {
        assert!(!ready_for_post_process(&summary(&[RipStatus::Done, RipStatus::Failed])));
        assert!(!ready_for_post_process(&summary(&[RipStatus::Done, RipStatus::Cancelled])));
        assert!(!ready_for_post_process(&summary(&[RipStatus::SkippedDuplicate])));
    }

    #[test]
    fn expected_size_of_one_second() {
        assert_eq!(expected_bytes(&job(1, RipStatus::Pending)), 75 * 2352 + 44);
    }

    #[test]
    fn catalog_entry_carries_fingerprint_and_tags() {
        let mut job = job(4, RipStatus::Tagging);
        job.tags = TrackTags {
            title: "Song".to_string(),
            artist: "Band".to_string(),
            album: "Record".to_string(),
            track_number: 4,
            ..Default::default()
        };

        let track = catalog_entry(&job);
        assert_eq!(track.title, "Song");
        assert_eq!(track.track_number, Some(4));
        assert_eq!(track.duration_ms, 1000);
        assert_eq!(track.disc_fingerprint, Some(DiscFingerprint::new("0a0b0c0d", 4)));
        assert_eq!(track.file_path, PathBuf::from("/music/4.ogg"));
    }
}
