//! Track catalog persistence

use crate::error::{Result, StorageError};
use chrono::{DateTime, TimeZone, Utc};
use mixtape_core::{DiscFingerprint, Rating, Track, TrackId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;

const SELECT_COLUMNS: &str = "SELECT id, title, artist, compilation_artist, album, genre,
        track_number, year, rating, play_count, last_played_ms, duration_ms,
        file_path, date_added_ms, disc_id, disc_track
     FROM tracks";

fn timestamp(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::SerializationError(format!("invalid timestamp {}", ms)))
}

fn row_to_track(row: &SqliteRow) -> Result<Track> {
    let rating: i64 = row.try_get("rating")?;
    let rating = u8::try_from(rating)
        .ok()
        .and_then(|r| Rating::try_from(r).ok())
        .ok_or_else(|| StorageError::SerializationError(format!("invalid rating {}", rating)))?;

    let last_played = row
        .try_get::<Option<i64>, _>("last_played_ms")?
        .map(timestamp)
        .transpose()?;

    let disc_id: Option<String> = row.try_get("disc_id")?;
    let disc_track: Option<i64> = row.try_get("disc_track")?;
    let disc_fingerprint = match (disc_id, disc_track) {
        (Some(disc_id), Some(number)) => Some(DiscFingerprint::new(disc_id, number as u32)),
        _ => None,
    };

    Ok(Track {
        id: TrackId::new(row.try_get::<String, _>("id")?),
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        compilation_artist: row.try_get("compilation_artist")?,
        album: row.try_get("album")?,
        genre: row.try_get("genre")?,
        track_number: row.try_get::<Option<i64>, _>("track_number")?.map(|n| n as u32),
        year: row.try_get::<Option<i64>, _>("year")?.map(|y| y as u32),
        rating,
        play_count: row.try_get::<i64, _>("play_count")? as u32,
        last_played,
        duration_ms: row.try_get::<i64, _>("duration_ms")? as u64,
        file_path: PathBuf::from(row.try_get::<String, _>("file_path")?),
        date_added: timestamp(row.try_get("date_added_ms")?)?,
        disc_fingerprint,
    })
}

/// Load every track in insertion order
pub async fn load_all(pool: &SqlitePool) -> Result<Vec<Track>> {
    let rows = sqlx::query(&format!("{} ORDER BY rowid", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_track).collect()
}

/// Get a single track
pub async fn get(pool: &SqlitePool, id: &TrackId) -> Result<Track> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StorageError::not_found("Track", id.as_str()))?;

    row_to_track(&row)
}

/// Insert or replace a track, keeping its original insertion position
pub async fn upsert(pool: &SqlitePool, track: &Track) -> Result<()> {
    let file_path = track.file_path.to_string_lossy().into_owned();
    let (disc_id, disc_track) = match track.disc_fingerprint {
        Some(ref fp) => (Some(fp.disc_id.as_str()), Some(i64::from(fp.track_number))),
        None => (None, None),
    };

    sqlx::query(
        "INSERT INTO tracks
         (id, title, artist, compilation_artist, album, genre, track_number, year,
          rating, play_count, last_played_ms, duration_ms, file_path, date_added_ms,
          disc_id, disc_track)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id)
         DO UPDATE SET
            title = excluded.title,
            artist = excluded.artist,
            compilation_artist = excluded.compilation_artist,
            album = excluded.album,
            genre = excluded.genre,
            track_number = excluded.track_number,
            year = excluded.year,
            rating = excluded.rating,
            play_count = excluded.play_count,
            last_played_ms = excluded.last_played_ms,
            duration_ms = excluded.duration_ms,
            file_path = excluded.file_path,
            date_added_ms = excluded.date_added_ms,
            disc_id = excluded.disc_id,
            disc_track = excluded.disc_track",
    )
    .bind(track.id.as_str())
    .bind(&track.title)
    .bind(&track.artist)
    .bind(track.compilation_artist.as_deref())
    .bind(&track.album)
    .bind(&track.genre)
    .bind(track.track_number.map(i64::from))
    .bind(track.year.map(i64::from))
    .bind(i64::from(track.rating.value()))
    .bind(i64::from(track.play_count))
    .bind(track.last_played.map(|t| t.timestamp_millis()))
    .bind(track.duration_ms as i64)
    .bind(file_path)
    .bind(track.date_added.timestamp_millis())
    .bind(disc_id)
    .bind(disc_track)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a track
pub async fn delete(pool: &SqlitePool, id: &TrackId) -> Result<()> {
    let result = sqlx::query("DELETE FROM tracks WHERE id = ?")
        .bind(id.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Track", id.as_str()));
    }
    Ok(())
}

/// Number of stored tracks
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM tracks")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("n")?)
}
