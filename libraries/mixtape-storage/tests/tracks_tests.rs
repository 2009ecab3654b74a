//! Integration tests for track persistence and catalog hydration

mod test_helpers;

use chrono::{TimeZone, Utc};
use mixtape_core::{Catalog, DiscFingerprint, TrackId, TrackUpdate};
use mixtape_storage::{tracks, MemoryCatalog, StorageError};
use test_helpers::*;

#[tokio::test]
async fn upsert_and_get_round_trip() {
    let db = TestDb::new().await;
    let mut track = create_test_track("t1", "First");
    track.last_played = Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap());
    track.compilation_artist = Some("Various Artists".to_string());
    track.disc_fingerprint = Some(DiscFingerprint::new("02003c01", 1));

    tracks::upsert(db.pool(), &track).await.unwrap();
    let loaded = tracks::get(db.pool(), &TrackId::new("t1")).await.unwrap();

    assert_eq!(loaded.title, "First");
    assert_eq!(loaded.compilation_artist.as_deref(), Some("Various Artists"));
    assert_eq!(loaded.last_played, track.last_played);
    assert_eq!(loaded.disc_fingerprint, track.disc_fingerprint);
    assert_eq!(loaded.rating, track.rating);
    assert_eq!(loaded.date_added.timestamp_millis(), track.date_added.timestamp_millis());
}

#[tokio::test]
async fn upsert_updates_without_moving_track() {
    let db = TestDb::new().await;
    tracks::upsert(db.pool(), &create_test_track("a", "A")).await.unwrap();
    tracks::upsert(db.pool(), &create_test_track("b", "B")).await.unwrap();

    let mut changed = create_test_track("a", "A (remaster)");
    changed.play_count = 9;
    tracks::upsert(db.pool(), &changed).await.unwrap();

    let all = tracks::load_all(db.pool()).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(all[0].title, "A (remaster)");
    assert_eq!(all[0].play_count, 9);
}

#[tokio::test]
async fn get_missing_track_is_not_found() {
    let db = TestDb::new().await;
    let err = tracks::get(db.pool(), &TrackId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn delete_removes_track() {
    let db = TestDb::new().await;
    tracks::upsert(db.pool(), &create_test_track("a", "A")).await.unwrap();

    tracks::delete(db.pool(), &TrackId::new("a")).await.unwrap();

    assert_eq!(tracks::count(db.pool()).await.unwrap(), 0);
    assert!(tracks::delete(db.pool(), &TrackId::new("a")).await.is_err());
}

#[tokio::test]
async fn hydrated_catalog_matches_database() {
    let db = TestDb::new().await;
    for (id, title) in [("x", "X"), ("y", "Y"), ("z", "Z")] {
        tracks::upsert(db.pool(), &create_test_track(id, title)).await.unwrap();
    }

    let catalog = MemoryCatalog::hydrate(db.pool()).await.unwrap();
    assert_eq!(catalog.snapshot().len(), 3);

    let updated = catalog
        .update(&TrackId::new("y"), TrackUpdate { genre: Some("Jazz".into()), ..TrackUpdate::default() })
        .unwrap();
    tracks::upsert(db.pool(), &updated).await.unwrap();

    let reloaded = tracks::get(db.pool(), &TrackId::new("y")).await.unwrap();
    assert_eq!(reloaded.genre, "Jazz");
}
