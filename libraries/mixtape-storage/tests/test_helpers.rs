//! Test helpers and fixtures for storage integration tests
//!
//! These helpers create test databases using real SQLite files (not in-memory)
//! so every pooled connection sees the same schema.

#![allow(dead_code)]

use mixtape_core::{Rating, Track};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Test database wrapper that cleans up on drop
pub struct TestDb {
    pub pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestDb {
    /// Create a new test database with migrations applied
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let pool = mixtape_storage::create_pool(&db_url)
            .await
            .expect("Failed to create pool");

        mixtape_storage::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        Self {
            pool,
            _temp_dir: temp_dir,
        }
    }

    /// Get the pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Test fixture: a track with a fixed id and some metadata
pub fn create_test_track(id: &str, title: &str) -> Track {
    let mut track = Track::new(title, format!("/music/{}.flac", id)).with_id(id);
    track.artist = "Test Artist".to_string();
    track.album = "Test Album".to_string();
    track.genre = "Rock".to_string();
    track.track_number = Some(1);
    track.year = Some(2001);
    track.rating = Rating::new(6);
    track.duration_ms = 215_000;
    track
}
