//! Resume state persistence, one record per playback context

use crate::error::{Result, StorageError};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mixtape_core::{PlaybackContext, ResumeState, ResumeStore, TrackId};
use sqlx::{Row, SqlitePool};

/// Get the stored resume state for a context
pub async fn get(pool: &SqlitePool, context: PlaybackContext) -> Result<Option<ResumeState>> {
    let row = sqlx::query(
        "SELECT context, track_id, position_ms, queue_json, saved_at_ms
         FROM resume_state WHERE context = ?",
    )
    .bind(context.as_str())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let queue: Vec<TrackId> = serde_json::from_str(&row.try_get::<String, _>("queue_json")?)?;
    let saved_at_ms: i64 = row.try_get("saved_at_ms")?;
    let saved_at = Utc
        .timestamp_millis_opt(saved_at_ms)
        .single()
        .ok_or_else(|| StorageError::SerializationError(format!("invalid timestamp {}", saved_at_ms)))?;

    Ok(Some(ResumeState {
        context,
        track_id: row.try_get::<Option<String>, _>("track_id")?.map(TrackId::new),
        position_ms: row.try_get::<i64, _>("position_ms")?.max(0) as u64,
        queue,
        saved_at,
    }))
}

/// Create or replace the resume state for `state.context`
pub async fn upsert(pool: &SqlitePool, state: &ResumeState) -> Result<()> {
    let queue_json = serde_json::to_string(&state.queue)?;

    sqlx::query(
        "INSERT INTO resume_state (context, track_id, position_ms, queue_json, saved_at_ms)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(context)
         DO UPDATE SET
            track_id = excluded.track_id,
            position_ms = excluded.position_ms,
            queue_json = excluded.queue_json,
            saved_at_ms = excluded.saved_at_ms",
    )
    .bind(state.context.as_str())
    .bind(state.track_id.as_ref().map(|id| id.as_str()))
    .bind(state.position_ms as i64)
    .bind(queue_json)
    .bind(state.saved_at.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove the resume state for a context
pub async fn delete(pool: &SqlitePool, context: PlaybackContext) -> Result<()> {
    sqlx::query("DELETE FROM resume_state WHERE context = ?")
        .bind(context.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// `ResumeStore` backed by the `resume_state` table
#[derive(Debug, Clone)]
pub struct SqliteResumeStore {
    pool: SqlitePool,
}

impl SqliteResumeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for SqliteResumeStore {
    async fn load(&self, context: PlaybackContext) -> mixtape_core::Result<Option<ResumeState>> {
        Ok(get(&self.pool, context).await?)
    }

    async fn save(&self, state: &ResumeState) -> mixtape_core::Result<()> {
        upsert(&self.pool, state).await?;
        tracing::debug!(context = %state.context, position_ms = state.position_ms, "Resume state saved");
        Ok(())
    }

    async fn clear(&self, context: PlaybackContext) -> mixtape_core::Result<()> {
        Ok(delete(&self.pool, context).await?)
    }
}
