//! Smart playlist definitions and their categories

use crate::error::{Result, StorageError};
use mixtape_smartlist::{SmartPlaylist, SmartPlaylistLibrary};
use sqlx::{Row, SqlitePool};

/// Load every category and playlist
///
/// Definitions are validated while loading; a stored definition that no
/// longer validates fails the whole load rather than disappearing.
pub async fn load_library(pool: &SqlitePool) -> Result<SmartPlaylistLibrary> {
    let mut library = SmartPlaylistLibrary::new();

    let categories = sqlx::query("SELECT name FROM smart_playlist_categories ORDER BY name")
        .fetch_all(pool)
        .await?;
    for row in categories {
        library.create_category(&row.try_get::<String, _>("name")?)?;
    }

    let playlists = sqlx::query("SELECT definition_json FROM smart_playlists ORDER BY category, name")
        .fetch_all(pool)
        .await?;
    for row in playlists {
        let playlist = SmartPlaylist::from_json(&row.try_get::<String, _>("definition_json")?)?;
        library.save(playlist)?;
    }

    Ok(library)
}

/// Create a category if it does not exist
pub async fn ensure_category(pool: &SqlitePool, name: &str) -> Result<()> {
    sqlx::query("INSERT INTO smart_playlist_categories (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert or replace a playlist definition
pub async fn save(pool: &SqlitePool, playlist: &SmartPlaylist) -> Result<()> {
    playlist.validate()?;
    let definition = playlist.to_json()?;
    let now = chrono::Utc::now().timestamp_millis();

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO smart_playlist_categories (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(&playlist.category)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO smart_playlists (category, name, definition_json, updated_at_ms)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(category, name)
         DO UPDATE SET
            definition_json = excluded.definition_json,
            updated_at_ms = excluded.updated_at_ms",
    )
    .bind(&playlist.category)
    .bind(&playlist.name)
    .bind(definition)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Delete one playlist
pub async fn delete(pool: &SqlitePool, category: &str, name: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM smart_playlists WHERE category = ? AND name = ?")
        .bind(category)
        .bind(name)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Smart playlist", format!("{}/{}", category, name)));
    }
    Ok(())
}

/// Delete a category together with its playlists
pub async fn delete_category(pool: &SqlitePool, name: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM smart_playlists WHERE category = ?")
        .bind(name)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM smart_playlist_categories WHERE name = ?")
        .bind(name)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Category", name));
    }

    tx.commit().await?;
    Ok(())
}

/// Rename a category; stored definitions are rewritten with the new name
pub async fn rename_category(pool: &SqlitePool, from: &str, to: &str) -> Result<()> {
    let library = load_library(pool).await?;
    if !library.has_category(from) {
        return Err(StorageError::not_found("Category", from));
    }

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO smart_playlist_categories (name) VALUES (?)")
        .bind(to)
        .execute(&mut *tx)
        .await?;

    for playlist in library.playlists(from) {
        let mut moved = playlist.clone();
        moved.category = to.to_string();
        sqlx::query(
            "UPDATE smart_playlists SET category = ?, definition_json = ? WHERE category = ? AND name = ?",
        )
        .bind(to)
        .bind(moved.to_json()?)
        .bind(from)
        .bind(&playlist.name)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM smart_playlist_categories WHERE name = ?")
        .bind(from)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
