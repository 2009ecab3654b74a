//! Command tests against a throwaway database

use mixtape_cli::commands;
use mixtape_cli::AppConfig;
use mixtape_core::{CatalogSnapshot, PlaybackContext, Rating, ResumeMode, ResumeState, Track, TrackId};
use mixtape_playback::{ShuffleMode, WeightProfile};
use mixtape_smartlist::{Criterion, CriterionValue, OrderKey, Operator, SmartField, SmartPlaylist};
use mixtape_storage::{resume_state, tracks};
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> SqlitePool {
    let url = format!("sqlite://{}", dir.path().join("db/mixtape.db").display());
    commands::open_database(&url).await.unwrap()
}

fn track(id: &str, genre: &str, rating: u8) -> Track {
    let mut track = Track::new(format!("Song {id}"), format!("/music/{id}.ogg")).with_id(id);
    track.artist = "Band".to_string();
    track.genre = genre.to_string();
    track.rating = Rating::new(rating);
    track
}

fn write_tracks(path: &Path, tracks: &[Track]) {
    std::fs::write(path, serde_json::to_string(tracks).unwrap()).unwrap();
}

fn rock_playlist() -> SmartPlaylist {
    SmartPlaylist::new("Rock", "Genres", Default::default())
        .with_criterion(
            Criterion::new(
                SmartField::Genre,
                Operator::Equals,
                CriterionValue::Text("Rock".to_string()),
            )
            .unwrap(),
        )
        .order_by(OrderKey::descending(SmartField::Rating))
}

#[tokio::test]
async fn import_then_evaluate() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open(&dir).await;

    let file = dir.path().join("tracks.json");
    write_tracks(
        &file,
        &[track("a", "Rock", 4), track("b", "Jazz", 9), track("c", "Rock", 8)],
    );

    assert_eq!(commands::import_tracks(&pool, &file).await.unwrap(), 3);
    assert_eq!(tracks::count(&pool).await.unwrap(), 3);

    let matched = commands::evaluate(&pool, &rock_playlist()).await.unwrap();
    let ids: Vec<&str> = matched.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["c", "a"]);
}

#[tokio::test]
async fn import_rejects_duplicate_ids() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open(&dir).await;

    let file = dir.path().join("tracks.json");
    write_tracks(&file, &[track("a", "Rock", 4), track("a", "Jazz", 9)]);

    assert!(commands::import_tracks(&pool, &file).await.is_err());
    assert_eq!(tracks::count(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn import_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open(&dir).await;

    let err = commands::import_tracks(&pool, &dir.path().join("nope.json"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("nope.json"));
}

#[tokio::test]
async fn shuffle_off_keeps_playlist_order() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open(&dir).await;
    for t in [track("a", "Rock", 2), track("b", "Rock", 9), track("c", "Rock", 5)] {
        tracks::upsert(&pool, &t).await.unwrap();
    }

    let ordered = commands::shuffle(&pool, &rock_playlist(), ShuffleMode::Off, &WeightProfile::default())
        .await
        .unwrap();
    let ids: Vec<&str> = ordered.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["b", "c", "a"]);

    let ranked = commands::shuffle(&pool, &rock_playlist(), ShuffleMode::Smart, &WeightProfile::rating_only())
        .await
        .unwrap();
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].id.as_str(), "b");
}

#[tokio::test]
async fn saved_smartlists_are_listed_by_category() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open(&dir).await;

    let file = dir.path().join("rock.json");
    std::fs::write(&file, rock_playlist().to_json().unwrap()).unwrap();
    let playlist = commands::load_playlist(&file).unwrap();
    commands::save_smartlist(&pool, &playlist).await.unwrap();

    let library = commands::smartlist_library(&pool).await.unwrap();
    assert_eq!(library.len(), 1);
    assert_eq!(library.playlists("Genres")[0].name, "Rock");
}

#[tokio::test]
async fn resume_report_counts_surviving_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open(&dir).await;
    let config = AppConfig::default();

    tracks::upsert(&pool, &track("a", "Rock", 5)).await.unwrap();
    let state = ResumeState {
        track_id: Some(TrackId::new("a")),
        position_ms: 12_000,
        queue: vec![TrackId::new("a"), TrackId::new("gone")],
        ..ResumeState::new(PlaybackContext::Radio)
    };
    resume_state::upsert(&pool, &state).await.unwrap();

    let report = commands::resume_report(&pool, &config, PlaybackContext::Radio)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.resolvable, 1);
    assert_eq!(report.mode, ResumeMode::ExactTrack);

    commands::clear_resume(&pool, PlaybackContext::Radio).await.unwrap();
    assert!(commands::resume_report(&pool, &config, PlaybackContext::Radio)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn persist_changes_writes_diff() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open(&dir).await;

    let before = CatalogSnapshot::from_tracks([track("old", "Rock", 3), track("kept", "Rock", 3)]).unwrap();
    for t in before.iter() {
        tracks::upsert(&pool, t).await.unwrap();
    }

    let after = CatalogSnapshot::from_tracks([track("kept", "Rock", 3), track("new", "Rock", 7)]).unwrap();
    let changed = commands::persist_changes(&pool, &before, &after).await.unwrap();

    assert_eq!(changed, 2);
    assert!(tracks::get(&pool, &TrackId::new("new")).await.is_ok());
    assert!(tracks::get(&pool, &TrackId::new("old")).await.is_err());
    assert_eq!(tracks::count(&pool).await.unwrap(), 2);
}
