use std::future::Future;

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ProfileError, RepositoryError};
use crate::models::profile::{Focus, NotificationPreferences, Profile};

/// Read surface the session orchestrator depends on. Postgres-backed in
/// production; tests substitute fakes.
pub trait ProfileStore: Send + Sync {
    /// Missing row is `Ok(None)`, not an error; the orchestrator decides
    /// whether to self-heal.
    fn profile_by_id(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<Profile>, RepositoryError>> + Send;

    fn create_default(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> impl Future<Output = Result<(), ProfileError>> + Send;

    fn push_subscription(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<Value>, RepositoryError>> + Send;
}

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn update_name(&self, user_id: Uuid, name: &str) -> Result<(), ProfileError> {
        sqlx::query("UPDATE profiles SET name = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| ProfileError::new("Failed to update name", e))?;
        Ok(())
    }

    pub async fn update_focus(&self, user_id: Uuid, focus: Focus) -> Result<(), ProfileError> {
        sqlx::query("UPDATE profiles SET focus = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(focus)
            .execute(&self.pool)
            .await
            .map_err(|e| ProfileError::new("Failed to update focus", e))?;
        Ok(())
    }

    /// Returns the stored URL so callers render exactly what persisted.
    pub async fn update_avatar(
        &self,
        user_id: Uuid,
        avatar_url: &str,
    ) -> Result<String, ProfileError> {
        sqlx::query_scalar::<_, String>(
            r#"
            UPDATE profiles SET avatar_url = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING avatar_url
            "#,
        )
        .bind(user_id)
        .bind(avatar_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ProfileError::new("Failed to update profile picture", e))
    }

    pub async fn set_premium(&self, user_id: Uuid, is_premium: bool) -> Result<bool, ProfileError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE profiles SET is_premium = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING is_premium
            "#,
        )
        .bind(user_id)
        .bind(is_premium)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ProfileError::new("Failed to update premium status", e))
    }

    pub async fn update_notification_preferences(
        &self,
        user_id: Uuid,
        preferences: NotificationPreferences,
    ) -> Result<(), ProfileError> {
        sqlx::query(
            r#"
            UPDATE profiles SET notification_preferences = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(sqlx::types::Json(preferences))
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::new("Failed to update notification preferences", e))?;
        Ok(())
    }

    /// `None` clears the stored subscription.
    pub async fn update_push_subscription(
        &self,
        user_id: Uuid,
        subscription: Option<&Value>,
    ) -> Result<(), ProfileError> {
        sqlx::query(
            r#"
            UPDATE profiles SET push_subscription = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(subscription)
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::new("Failed to update push subscription", e))?;
        Ok(())
    }
}

impl ProfileStore for PgProfileStore {
    async fn profile_by_id(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::new("Failed to fetch profile", e))
    }

    async fn create_default(&self, user_id: Uuid, name: &str) -> Result<(), ProfileError> {
        sqlx::query("INSERT INTO profiles (id, name) VALUES ($1, $2)")
            .bind(user_id)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| ProfileError::new("Failed to create profile", e))?;
        Ok(())
    }

    async fn push_subscription(&self, user_id: Uuid) -> Result<Option<Value>, RepositoryError> {
        sqlx::query_scalar::<_, Option<Value>>(
            "SELECT push_subscription FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map(Option::flatten)
        .map_err(|e| RepositoryError::new("Failed to fetch push subscription", e))
    }
}
