//! Mixtape Storage
//!
//! `SQLite` persistence for Mixtape plus the in-memory, copy-on-write track
//! catalog that playback and the rule engine read from.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: Each feature owns its own queries (`tracks`,
//!   `resume_state`, `smart_playlists`)
//! - **Snapshot Catalog**: `MemoryCatalog` is hydrated from `tracks` at
//!   startup and publishes immutable snapshots to readers
//!
//! # Example
//!
//! ```rust,no_run
//! use mixtape_storage::{create_pool, run_migrations, MemoryCatalog};
//! use mixtape_core::Catalog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://mixtape.db").await?;
//! run_migrations(&pool).await?;
//!
//! let catalog = MemoryCatalog::hydrate(&pool).await?;
//! println!("{} tracks", catalog.snapshot().len());
//! # Ok(())
//! # }
//! ```

mod catalog;
mod error;

// Vertical slices
pub mod resume_state;
pub mod smart_playlists;
pub mod tracks;

pub use catalog::MemoryCatalog;
pub use error::StorageError;
pub use resume_state::SqliteResumeStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://mixtape.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::info!("SQLite pool ready");
    Ok(pool)
}
