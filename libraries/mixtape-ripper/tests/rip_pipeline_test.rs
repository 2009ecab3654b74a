//! End-to-end rip pipeline tests with an in-memory drive and file-writing encoder

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mixtape_core::{
    Catalog, CatalogSnapshot, Disc, DiscTrack, MixtapeError, Track, TrackId, TrackUpdate,
};
use mixtape_ripper::{
    AlbumInfo, AudioEncoder, CancelFlag, EncodeSession, EncoderKind, EncodingProfile, OpticalDrive,
    OverwritePolicy, ParanoiaLevel, PathTemplate, Result, RipConfig, RipError, RipEvent,
    RipPipeline, RipQuality, RipStatus, RipSummary, TrackReader, TrackTags,
};
use mixtape_storage::MemoryCatalog;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

const CHUNK_BYTES: usize = 1024;
const CHUNKS_PER_TRACK: usize = 4;

// ===== Fake drive =====

#[derive(Default)]
struct FakeDrive {
    tracks: u32,
    unreadable: Vec<u32>,
    offline_at: Option<u32>,
    ejected: AtomicBool,
    paranoia_seen: Mutex<Vec<ParanoiaLevel>>,
}

impl FakeDrive {
    fn with_tracks(tracks: u32) -> Self {
        Self {
            tracks,
            ..Default::default()
        }
    }

    fn disc(&self) -> Disc {
        Disc::from_toc(
            (1..=self.tracks)
                .map(|n| DiscTrack {
                    number: n,
                    start_sector: (n - 1) * 7500,
                    length_sectors: 7500,
                    title: None,
                    artist: None,
                })
                .collect(),
        )
    }
}

#[async_trait]
impl OpticalDrive for FakeDrive {
    async fn scan_disc(&self) -> Result<Disc> {
        Ok(self.disc())
    }

    async fn read_track(&self, track: &DiscTrack, paranoia: ParanoiaLevel) -> Result<Box<dyn TrackReader>> {
        self.paranoia_seen.lock().unwrap().push(paranoia);
        if self.offline_at == Some(track.number) {
            return Err(RipError::device("drive not ready"));
        }
        Ok(Box::new(FakeReader {
            track: track.number,
            remaining: CHUNKS_PER_TRACK,
            unreadable: self.unreadable.contains(&track.number),
        }))
    }

    async fn eject(&self) -> Result<()> {
        self.ejected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeReader {
    track: u32,
    remaining: usize,
    unreadable: bool,
}

#[async_trait]
impl TrackReader for FakeReader {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.unreadable {
            return Err(RipError::Read(format!("track {}: scratched", self.track)));
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        tokio::task::yield_now().await;
        Ok(Some(vec![self.track as u8; CHUNK_BYTES]))
    }
}

// ===== Fake encoder =====

#[derive(Default)]
struct FakeEncoder {
    /// Cancel this flag once a session has taken this many chunks
    cancel_after: Mutex<Option<(CancelFlag, usize)>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

#[async_trait]
impl AudioEncoder for FakeEncoder {
    async fn start(
        &self,
        output: &Path,
        _profile: &EncodingProfile,
        _tags: &TrackTags,
    ) -> Result<Box<dyn EncodeSession>> {
        let file = tokio::fs::File::create(output)
            .await
            .map_err(|e| RipError::io(output, e))?;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            file,
            written: 0,
            cancel_after: self.cancel_after.lock().unwrap().clone(),
            active: Arc::clone(&self.active),
        }))
    }
}

struct FakeSession {
    file: tokio::fs::File,
    written: usize,
    cancel_after: Option<(CancelFlag, usize)>,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl EncodeSession for FakeSession {
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await.map_err(|e| RipError::encoder(e.to_string()))?;
        self.written += 1;
        if let Some((flag, after)) = &self.cancel_after {
            if self.written >= *after {
                flag.cancel();
            }
        }
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<()> {
        self.file.flush().await.map_err(|e| RipError::encoder(e.to_string()))?;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort(self: Box<Self>) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

// ===== Fake catalog =====

/// Catalog that refuses every insert
#[derive(Default)]
struct FullCatalog {
    inner: MemoryCatalog,
}

impl Catalog for FullCatalog {
    fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.inner.snapshot()
    }

    fn insert(&self, track: Track) -> mixtape_core::Result<TrackId> {
        Err(MixtapeError::duplicate(format!("track {} already exists", track.id)))
    }

    fn update(&self, id: &TrackId, update: TrackUpdate) -> mixtape_core::Result<Track> {
        self.inner.update(id, update)
    }

    fn remove(&self, id: &TrackId) -> mixtape_core::Result<Track> {
        self.inner.remove(id)
    }

    fn record_play(&self, id: &TrackId, at: DateTime<Utc>) -> mixtape_core::Result<Track> {
        self.inner.record_play(id, at)
    }
}

// ===== Helpers =====

fn album() -> AlbumInfo {
    AlbumInfo {
        artist: "The Band".to_string(),
        album: "Live at Home".to_string(),
        genre: "Rock".to_string(),
        year: Some(2001),
        titles: vec!["Opener".to_string(), "Ballad".to_string()],
        ..Default::default()
    }
}

fn config(root: &Path) -> RipConfig {
    RipConfig {
        library_root: root.to_path_buf(),
        encoder: EncoderKind::Vorbis,
        quality: RipQuality::High,
        max_concurrent_jobs: 2,
        ..Default::default()
    }
}

fn pipeline(
    drive: &Arc<FakeDrive>,
    encoder: FakeEncoder,
    catalog: &Arc<MemoryCatalog>,
    config: RipConfig,
) -> RipPipeline {
    RipPipeline::new(drive.clone(), Arc::new(encoder), catalog.clone(), config).unwrap()
}

/// Scan, plan and run to completion, collecting every event
async fn rip(pipeline: &RipPipeline) -> (Result<RipSummary>, Vec<RipEvent>) {
    let disc = pipeline.scan().await.unwrap();
    let jobs = pipeline.plan(&disc, &album());

    let (mut rx, handle) = pipeline.start(jobs);
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });

    let result = handle.await.unwrap();
    let events = collector.await.unwrap();
    (result, events)
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(files_under(&path));
        } else {
            files.push(path);
        }
    }
    files.sort();
    files
}

fn part_files(dir: &Path) -> Vec<PathBuf> {
    files_under(dir)
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "part"))
        .collect()
}

// ===== Tests =====

#[tokio::test]
async fn rips_every_track_into_catalog() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(3));
    let catalog = Arc::new(MemoryCatalog::new());
    let pipeline = pipeline(&drive, FakeEncoder::default(), &catalog, config(library.path()));

    let (result, events) = rip(&pipeline).await;
    let summary = result.unwrap();

    assert_eq!(summary.done(), 3);
    assert_eq!(summary.disc_id, drive.disc().id);
    assert_eq!(catalog.snapshot().len(), 3);

    let expected = library.path().join("The Band/Live at Home/01 - Opener.ogg");
    assert!(expected.exists());
    assert_eq!(std::fs::metadata(&expected).unwrap().len(), (CHUNK_BYTES * CHUNKS_PER_TRACK) as u64);
    assert!(library.path().join("The Band/Live at Home/03 - Track 03.ogg").exists());
    assert!(part_files(library.path()).is_empty());

    let track = catalog
        .find_by_fingerprint(&drive.disc().fingerprint(2))
        .pop()
        .unwrap();
    assert_eq!(track.title, "Ballad");
    assert_eq!(track.track_number, Some(2));
    assert_eq!(track.year, Some(2001));
    assert_eq!(track.duration_ms, 100_000);

    for job in &summary.jobs {
        let statuses: Vec<RipStatus> = events
            .iter()
            .filter_map(|e| match e {
                RipEvent::StatusChanged { job: id, status, .. } if *id == job.id => Some(*status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![RipStatus::Ripping, RipStatus::Encoding, RipStatus::Tagging, RipStatus::Done]
        );
        assert!(job.track_id.is_some());
    }
}

#[tokio::test]
async fn second_rip_of_same_disc_is_skipped() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(2));
    let catalog = Arc::new(MemoryCatalog::new());

    let first = pipeline(&drive, FakeEncoder::default(), &catalog, config(library.path()));
    assert_eq!(rip(&first).await.0.unwrap().done(), 2);

    let second = pipeline(&drive, FakeEncoder::default(), &catalog, config(library.path()));
    let (result, events) = rip(&second).await;
    let summary = result.unwrap();

    assert_eq!(summary.count(RipStatus::SkippedDuplicate), 2);
    assert_eq!(catalog.snapshot().len(), 2);
    assert_eq!(catalog.find_by_fingerprint(&drive.disc().fingerprint(1)).len(), 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, RipEvent::DuplicateFound { overwrite: false, .. })));
}

#[tokio::test]
async fn confirmed_overwrite_replaces_earlier_rip() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(2));
    let catalog = Arc::new(MemoryCatalog::new());

    let first = pipeline(&drive, FakeEncoder::default(), &catalog, config(library.path()));
    let first_ids: Vec<_> = rip(&first).await.0.unwrap().jobs.into_iter().filter_map(|j| j.track_id).collect();

    let overwrite = RipConfig {
        overwrite: OverwritePolicy::Confirm,
        ..config(library.path())
    };
    let second = pipeline(&drive, FakeEncoder::default(), &catalog, overwrite);
    let summary = rip(&second).await.0.unwrap();

    assert_eq!(summary.done(), 2);
    assert_eq!(catalog.snapshot().len(), 2);
    for id in &first_ids {
        assert!(catalog.get(id).is_err(), "earlier entry {} still catalogued", id);
    }
    assert_eq!(files_under(library.path()).len(), 2);
}

#[tokio::test]
async fn cancel_during_encoding_leaves_nothing_behind() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(3));
    let catalog = Arc::new(MemoryCatalog::new());

    let config = RipConfig {
        max_concurrent_jobs: 1,
        ..config(library.path())
    };
    let encoder = Arc::new(FakeEncoder::default());
    let pipeline = RipPipeline::new(drive.clone(), encoder.clone(), catalog.clone(), config).unwrap();

    // The encoder pulls the plug halfway through the first track
    *encoder.cancel_after.lock().unwrap() = Some((pipeline.cancel_flag(), 2));

    let (result, events) = rip(&pipeline).await;
    let summary = result.unwrap();

    assert_eq!(summary.done(), 0);
    assert!(summary.count(RipStatus::Cancelled) >= 1);
    assert!(catalog.snapshot().is_empty());
    assert!(files_under(library.path()).is_empty(), "left {:?}", files_under(library.path()));
    assert!(!events
        .iter()
        .any(|e| matches!(e, RipEvent::StatusChanged { status: RipStatus::Done, .. })));
}

#[tokio::test]
async fn cancel_before_start_stops_every_job() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(3));
    let catalog = Arc::new(MemoryCatalog::new());
    let pipeline = pipeline(&drive, FakeEncoder::default(), &catalog, config(library.path()));

    let disc = pipeline.scan().await.unwrap();
    let jobs = pipeline.plan(&disc, &album());
    pipeline.cancel();

    let (mut rx, handle) = pipeline.start(jobs);
    while rx.recv().await.is_some() {}
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(summary.count(RipStatus::Cancelled), 3);
    assert_eq!(summary.done(), 0);
    assert!(catalog.snapshot().is_empty());
    assert!(files_under(library.path()).is_empty(), "left {:?}", files_under(library.path()));
    assert!(drive.paranoia_seen.lock().unwrap().is_empty());

    // The finished run clears the flag, so the pipeline can rip again
    assert!(!pipeline.cancel_flag().is_cancelled());
    assert_eq!(rip(&pipeline).await.0.unwrap().done(), 3);
}

#[tokio::test]
async fn catalog_rejection_fails_the_job() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(2));
    let catalog = Arc::new(FullCatalog::default());
    let pipeline = RipPipeline::new(
        drive.clone(),
        Arc::new(FakeEncoder::default()),
        catalog.clone(),
        config(library.path()),
    )
    .unwrap();

    let (result, events) = rip(&pipeline).await;
    let summary = result.unwrap();

    assert_eq!(summary.count(RipStatus::Failed), 2);
    assert_eq!(summary.count(RipStatus::Cancelled), 0);
    for job in &summary.jobs {
        assert!(job.error.as_deref().unwrap_or_default().contains("already exists"));
        assert!(job.track_id.is_none());
    }
    assert!(events
        .iter()
        .any(|e| matches!(e, RipEvent::StatusChanged { status: RipStatus::Failed, .. })));
    assert!(files_under(library.path()).is_empty(), "left {:?}", files_under(library.path()));
}

#[tokio::test]
async fn unreadable_track_fails_alone() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive {
        tracks: 3,
        unreadable: vec![2],
        ..Default::default()
    });
    let catalog = Arc::new(MemoryCatalog::new());
    let pipeline = pipeline(&drive, FakeEncoder::default(), &catalog, config(library.path()));

    let (result, events) = rip(&pipeline).await;
    let summary = result.unwrap();

    assert_eq!(summary.done(), 2);
    let failed = summary.job_for_track(2).unwrap();
    assert_eq!(failed.status, RipStatus::Failed);
    assert!(failed.error.as_deref().unwrap_or_default().contains("scratched"));
    assert!(events
        .iter()
        .any(|e| matches!(e, RipEvent::JobFailed { track: 2, .. })));
    assert_eq!(catalog.snapshot().len(), 2);
}

#[tokio::test]
async fn device_failure_aborts_with_job_identity() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive {
        tracks: 4,
        offline_at: Some(2),
        ..Default::default()
    });
    let catalog = Arc::new(MemoryCatalog::new());
    let pipeline = pipeline(&drive, FakeEncoder::default(), &catalog, config(library.path()));

    let (result, _) = rip(&pipeline).await;

    match result {
        Err(RipError::Aborted { track, source, .. }) => {
            assert_eq!(track, 2);
            assert!(matches!(*source, RipError::Device(_)));
        }
        other => panic!("expected abort, got {:?}", other.map(|s| s.done())),
    }
    assert!(catalog
        .find_by_fingerprint(&drive.disc().fingerprint(2))
        .is_empty());
    assert!(part_files(library.path()).is_empty());
}

#[tokio::test]
async fn concurrent_jobs_are_capped() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(6));
    let catalog = Arc::new(MemoryCatalog::new());
    let max_active = Arc::new(AtomicUsize::new(0));
    let encoder = FakeEncoder {
        max_active: Arc::clone(&max_active),
        ..Default::default()
    };
    let pipeline = pipeline(&drive, encoder, &catalog, config(library.path()));

    let summary = rip(&pipeline).await.0.unwrap();

    assert_eq!(summary.done(), 6);
    let peak = max_active.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak {}", peak);
}

#[tokio::test]
async fn paranoia_and_eject_follow_config() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(2));
    let catalog = Arc::new(MemoryCatalog::new());
    let config = RipConfig {
        paranoia: ParanoiaLevel::Faster,
        eject_after: true,
        ..config(library.path())
    };
    let pipeline = pipeline(&drive, FakeEncoder::default(), &catalog, config);

    let (result, events) = rip(&pipeline).await;
    assert!(result.unwrap().ejected);
    assert!(drive.ejected.load(Ordering::SeqCst));
    assert!(events.contains(&RipEvent::Ejected));
    assert!(drive
        .paranoia_seen
        .lock()
        .unwrap()
        .iter()
        .all(|p| *p == ParanoiaLevel::Faster));
}

#[tokio::test]
async fn plan_resolves_profile_and_destination() {
    let library = tempfile::tempdir().unwrap();
    let drive = Arc::new(FakeDrive::with_tracks(2));
    let catalog = Arc::new(MemoryCatalog::new());
    let config = RipConfig {
        quality: RipQuality::Perfect,
        template: PathTemplate::new("{Genre}/{Year}/{TrackNo} {Title}").with_whitespace_replacement(true),
        ..config(library.path())
    };
    let pipeline = pipeline(&drive, FakeEncoder::default(), &catalog, config);

    let jobs = pipeline.plan(&drive.disc(), &album());
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j.status == RipStatus::Pending));
    assert_eq!(jobs[0].profile.encoder, EncoderKind::Flac);
    assert_eq!(jobs[0].destination, library.path().join("Rock/2001/01_Opener.flac"));
    assert_eq!(jobs[1].fingerprint, drive.disc().fingerprint(2));
}

#[cfg(unix)]
#[tokio::test]
async fn post_process_script_runs_after_success() {
    use std::os::unix::fs::PermissionsExt;

    let library = tempfile::tempdir().unwrap();
    let scripts = tempfile::tempdir().unwrap();
    let marker = scripts.path().join("ran.txt");

    let script = scripts.path().join("after-rip.sh");
    std::fs::write(&script, format!("#!/bin/sh\necho \"$#\" > '{}'\n", marker.display())).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let broken = scripts.path().join("broken.sh");
    std::fs::write(&broken, "#!/bin/sh\necho nope >&2\nexit 3\n").unwrap();
    std::fs::set_permissions(&broken, std::fs::Permissions::from_mode(0o755)).unwrap();

    let drive = Arc::new(FakeDrive::with_tracks(2));
    let catalog = Arc::new(MemoryCatalog::new());
    let ok = RipConfig {
        post_process: Some(script),
        ..config(library.path())
    };
    let summary = rip(&pipeline(&drive, FakeEncoder::default(), &catalog, ok)).await.0.unwrap();
    assert!(summary.post_process_error.is_none());
    assert_eq!(std::fs::read_to_string(&marker).unwrap().trim(), "2");

    // A failing script is reported but keeps the jobs done
    let other_library = tempfile::tempdir().unwrap();
    let catalog = Arc::new(MemoryCatalog::new());
    let failing = RipConfig {
        post_process: Some(broken),
        ..config(other_library.path())
    };
    let (result, events) = rip(&pipeline(&drive, FakeEncoder::default(), &catalog, failing)).await;
    let summary = result.unwrap();
    assert_eq!(summary.done(), 2);
    assert!(summary.post_process_error.unwrap().contains("nope"));
    assert!(events
        .iter()
        .any(|e| matches!(e, RipEvent::PostProcessFailed { .. })));
}
