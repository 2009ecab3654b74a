//! Command implementations shared by the `mixtape` binary and its tests

use anyhow::{Context, Result};
use mixtape_core::{Catalog, CatalogSnapshot, PlaybackContext, ResumeMode, ResumeState, Track};
use mixtape_playback::{next_order, resolve_queue, QueueTrack, ShuffleMode, WeightProfile};
use mixtape_ripper::{
    AlbumInfo, CdParanoiaDrive, CommandEncoder, OverwritePolicy, RipEvent, RipJob, RipPipeline,
    RipSummary,
};
use mixtape_smartlist::{SmartPlaylist, SmartPlaylistEngine, SmartPlaylistLibrary};
use mixtape_storage::{resume_state, smart_playlists, tracks, MemoryCatalog};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::CliError;

/// Open the database and bring its schema up to date
pub async fn open_database(database_url: &str) -> Result<SqlitePool> {
    if let Some(parent) = database_url
        .strip_prefix("sqlite://")
        .filter(|path| !path.starts_with(':'))
        .and_then(|path| Path::new(path).parent())
    {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
    }

    let pool = mixtape_storage::create_pool(database_url)
        .await
        .with_context(|| format!("cannot open database {database_url}"))?;
    mixtape_storage::run_migrations(&pool).await?;
    Ok(pool)
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| {
        CliError::Input {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Upsert every track in a JSON array file
pub async fn import_tracks(pool: &SqlitePool, path: &Path) -> Result<usize> {
    let json = read_input(path)?;
    let imported: Vec<Track> = serde_json::from_str(&json).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    // Reject duplicate ids before touching the database
    CatalogSnapshot::from_tracks(imported.iter().cloned())?;

    for track in &imported {
        tracks::upsert(pool, track).await?;
    }

    info!(count = imported.len(), file = %path.display(), "Tracks imported");
    Ok(imported.len())
}

pub fn load_playlist(path: &Path) -> Result<SmartPlaylist> {
    let json = read_input(path)?;
    SmartPlaylist::from_json(&json).with_context(|| format!("in {}", path.display()))
}

pub async fn load_catalog(pool: &SqlitePool) -> Result<Arc<MemoryCatalog>> {
    Ok(Arc::new(MemoryCatalog::hydrate(pool).await?))
}

/// Tracks matching `playlist`, in its order and limit
pub async fn evaluate(pool: &SqlitePool, playlist: &SmartPlaylist) -> Result<Vec<Arc<Track>>> {
    let catalog = load_catalog(pool).await?;
    let engine = SmartPlaylistEngine::new(catalog);
    Ok(engine.evaluate(playlist)?)
}

/// Playlist results in the order the scheduler would play them
pub async fn shuffle(
    pool: &SqlitePool,
    playlist: &SmartPlaylist,
    mode: ShuffleMode,
    weights: &WeightProfile,
) -> Result<Vec<Arc<Track>>> {
    let matched = evaluate(pool, playlist).await?;
    let queue: Vec<QueueTrack> = matched.iter().map(|t| QueueTrack::from(t.as_ref())).collect();

    Ok(next_order(&queue, weights, mode)
        .into_iter()
        .map(|index| Arc::clone(&matched[index]))
        .collect())
}

pub async fn save_smartlist(pool: &SqlitePool, playlist: &SmartPlaylist) -> Result<()> {
    smart_playlists::save(pool, playlist).await?;
    info!(category = %playlist.category, name = %playlist.name, "Smart playlist saved");
    Ok(())
}

pub async fn smartlist_library(pool: &SqlitePool) -> Result<SmartPlaylistLibrary> {
    Ok(smart_playlists::load_library(pool).await?)
}

pub fn parse_context(name: &str) -> Result<PlaybackContext> {
    PlaybackContext::from_str(name).ok_or_else(|| CliError::UnknownContext(name.to_string()).into())
}

/// Stored session for `context` and how much of its queue still resolves
pub struct ResumeReport {
    pub state: ResumeState,
    pub mode: ResumeMode,
    pub resolvable: usize,
}

pub async fn resume_report(
    pool: &SqlitePool,
    config: &AppConfig,
    context: PlaybackContext,
) -> Result<Option<ResumeReport>> {
    let Some(state) = resume_state::get(pool, context).await? else {
        return Ok(None);
    };

    let catalog = load_catalog(pool).await?;
    let resolvable = resolve_queue(&state, &catalog.snapshot()).len();
    let mode = config.playback.resume.mode_for(context).effective_for(context);

    Ok(Some(ResumeReport {
        state,
        mode,
        resolvable,
    }))
}

pub async fn clear_resume(pool: &SqlitePool, context: PlaybackContext) -> Result<()> {
    resume_state::delete(pool, context).await?;
    info!(%context, "Resume state cleared");
    Ok(())
}

/// Write catalog changes made during a rip back to the database
///
/// New and changed tracks are upserted; tracks that disappeared (replaced
/// by an overwrite) are deleted.
pub async fn persist_changes(
    pool: &SqlitePool,
    before: &CatalogSnapshot,
    after: &CatalogSnapshot,
) -> Result<usize> {
    let mut changed = 0;

    for track in after.iter() {
        let unchanged = before.get(&track.id).is_some_and(|old| old == track);
        if !unchanged {
            tracks::upsert(pool, track).await?;
            changed += 1;
        }
    }

    for track in before.iter() {
        if !after.contains(&track.id) {
            tracks::delete(pool, &track.id).await?;
            changed += 1;
        }
    }

    Ok(changed)
}

pub struct RipRequest {
    pub album: AlbumInfo,
    pub overwrite: OverwritePolicy,
    pub dry_run: bool,
}

/// Result of the `rip` command
pub enum RipOutcome {
    Planned(Vec<RipJob>),
    Finished(RipSummary),
}

/// Rip the disc in the configured drive into the library
///
/// Ctrl-C cancels the rip; finished tracks are kept.
pub async fn rip(pool: &SqlitePool, config: &AppConfig, request: RipRequest) -> Result<RipOutcome> {
    let catalog = load_catalog(pool).await?;
    let before = catalog.snapshot();

    let ripper = &config.ripper;
    let drive = CdParanoiaDrive::new(&ripper.device)
        .with_tools(&ripper.tools.cdparanoia, &ripper.tools.eject);
    let encoder = CommandEncoder::new()
        .with_lame(&ripper.tools.lame)
        .with_oggenc(&ripper.tools.oggenc)
        .with_flac(&ripper.tools.flac);

    let pipeline = RipPipeline::new(
        Arc::new(drive),
        Arc::new(encoder),
        Arc::clone(&catalog) as Arc<dyn Catalog>,
        config.rip_config(request.overwrite),
    )?;

    let disc = pipeline.scan().await?;
    let jobs = pipeline.plan(&disc, &request.album);
    if request.dry_run {
        return Ok(RipOutcome::Planned(jobs));
    }

    let (mut events, handle) = pipeline.start(jobs);

    let cancel = pipeline.cancel_flag();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling rip");
            cancel.cancel();
        }
    });

    while let Some(event) = events.recv().await {
        print_event(&event);
    }
    interrupt.abort();

    let result = handle.await.context("rip task stopped unexpectedly")?;

    // Tracks finished before a failure are still part of the library
    let changed = persist_changes(pool, &before, &catalog.snapshot()).await?;
    info!(changed, "Catalog changes saved");

    Ok(RipOutcome::Finished(result?))
}

fn print_event(event: &RipEvent) {
    match event {
        RipEvent::StatusChanged { track, status, .. } => {
            println!("track {track:02}: {status}");
        }
        RipEvent::DuplicateFound {
            track,
            existing,
            overwrite,
            ..
        } => {
            let action = if *overwrite { "replacing" } else { "skipping" };
            println!(
                "track {track:02}: already ripped ({} existing), {action}",
                existing.len()
            );
        }
        RipEvent::JobFailed { track, message, .. } => {
            eprintln!("track {track:02}: failed: {message}");
        }
        RipEvent::PostProcessFailed { message } => {
            eprintln!("post-process script failed: {message}");
        }
        RipEvent::Ejected => println!("disc ejected"),
        RipEvent::Progress { .. } => {}
    }
}
