use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::profile::{Focus, NotificationPreferences};
use crate::repo::{PgProfileStore, ProfileStore};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub focus: Option<Focus>,
    pub avatar_url: Option<String>,
    pub is_premium: bool,
    pub notification_preferences: NotificationPreferences,
    pub push_subscription: Option<Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNameRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFocusRequest {
    pub focus: Focus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAvatarRequest {
    #[validate(length(min = 1, max = 2048, message = "Avatar URL must be 1-2048 characters"))]
    pub avatar_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePushSubscriptionRequest {
    /// `null` clears the stored subscription.
    pub subscription: Option<Value>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProfileResponse>> {
    let store = PgProfileStore::new(state.db.clone());

    let profile = store
        .profile_by_id(auth_user.id)
        .await?
        .ok_or(AppError::NotFound("Profile not found".into()))?;
    let push_subscription = store.push_subscription(auth_user.id).await?;

    let notification_preferences = profile.notification_preferences();
    Ok(Json(ProfileResponse {
        id: profile.id,
        name: profile.name,
        focus: profile.focus,
        avatar_url: profile.avatar_url,
        is_premium: profile.is_premium,
        notification_preferences,
        push_subscription,
    }))
}

pub async fn update_name(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateNameRequest>,
) -> AppResult<Json<serde_json::Value>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    PgProfileStore::new(state.db.clone())
        .update_name(auth_user.id, &body.name)
        .await?;

    Ok(Json(serde_json::json!({ "name": body.name })))
}

pub async fn update_focus(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateFocusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    PgProfileStore::new(state.db.clone())
        .update_focus(auth_user.id, body.focus)
        .await?;

    Ok(Json(serde_json::json!({ "focus": body.focus })))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateAvatarRequest>,
) -> AppResult<Json<serde_json::Value>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let stored = PgProfileStore::new(state.db.clone())
        .update_avatar(auth_user.id, &body.avatar_url)
        .await?;

    Ok(Json(serde_json::json!({ "avatar_url": stored })))
}

pub async fn update_notification_preferences(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<NotificationPreferences>,
) -> AppResult<Json<NotificationPreferences>> {
    PgProfileStore::new(state.db.clone())
        .update_notification_preferences(auth_user.id, body)
        .await?;

    Ok(Json(body))
}

pub async fn update_push_subscription(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdatePushSubscriptionRequest>,
) -> AppResult<Json<serde_json::Value>> {
    PgProfileStore::new(state.db.clone())
        .update_push_subscription(auth_user.id, body.subscription.as_ref())
        .await?;

    Ok(Json(serde_json::json!({
        "push_subscription": body.subscription,
    })))
}

/// Flip the premium flag after a completed upgrade. Checkout itself happens
/// outside this service.
pub async fn activate_premium(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let is_premium = PgProfileStore::new(state.db.clone())
        .set_premium(auth_user.id, true)
        .await?;

    Ok(Json(serde_json::json!({ "is_premium": is_premium })))
}
