use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::mood::{MoodEntry, MoodLabel};

/// Read surface over the per-user, append-only mood log. Both operations
/// return rows newest-first.
pub trait MoodStore: Send + Sync {
    /// Every timestamp for the user, for streak computation. Callers must
    /// not swallow failures here; streak accuracy depends on completeness.
    fn history_dates(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<DateTime<Utc>>, RepositoryError>> + Send;

    /// Display slice, capped at `limit`.
    fn history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<MoodEntry>, RepositoryError>> + Send;
}

#[derive(Clone)]
pub struct PgMoodStore {
    pool: PgPool,
}

impl PgMoodStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry, stamped with server now. The emoji is derived
    /// from the label, never taken from the client.
    pub async fn insert(&self, user_id: Uuid, label: MoodLabel) -> Result<MoodEntry, RepositoryError> {
        sqlx::query_as::<_, MoodEntry>(
            r#"
            INSERT INTO mood_entries (id, user_id, emoji, label)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(label.emoji())
        .bind(label)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::new("Failed to insert mood entry", e))
    }
}

impl MoodStore for PgMoodStore {
    async fn history_dates(&self, user_id: Uuid) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT occurred_at FROM mood_entries
            WHERE user_id = $1
            ORDER BY occurred_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::new("Failed to fetch mood history dates", e))
    }

    async fn history(&self, user_id: Uuid, limit: i64) -> Result<Vec<MoodEntry>, RepositoryError> {
        sqlx::query_as::<_, MoodEntry>(
            r#"
            SELECT * FROM mood_entries
            WHERE user_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::new("Failed to fetch mood history", e))
    }
}
