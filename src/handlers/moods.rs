use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::i18n::{self, Lang};
use crate::models::mood::{MoodEntry, MoodLabel};
use crate::repo::{MoodStore, PgMoodStore};
use crate::streak::calculate_streak;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMoodRequest {
    pub label: MoodLabel,
}

#[derive(Debug, Deserialize)]
pub struct MoodHistoryQuery {
    pub limit: Option<i64>,
    pub lang: Option<Lang>,
}

/// Display shape: the canonical label key plus its translated text.
#[derive(Debug, Serialize)]
pub struct MoodEntryView {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub emoji: String,
    pub label: MoodLabel,
    pub label_text: &'static str,
}

impl MoodEntryView {
    fn new(entry: MoodEntry, lang: Lang) -> Self {
        Self {
            id: entry.id,
            occurred_at: entry.occurred_at,
            emoji: entry.emoji,
            label: entry.label,
            label_text: i18n::mood_label(entry.label, lang),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StreakResponse {
    pub streak: u32,
}

pub async fn create_mood(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateMoodRequest>,
) -> AppResult<Json<MoodEntry>> {
    let entry = PgMoodStore::new(state.db.clone())
        .insert(auth_user.id, body.label)
        .await?;

    Ok(Json(entry))
}

pub async fn list_moods(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MoodHistoryQuery>,
) -> AppResult<Json<Vec<MoodEntryView>>> {
    let limit = query
        .limit
        .unwrap_or(state.config.mood_history_limit)
        .clamp(1, 100);
    let lang = query.lang.unwrap_or_default();

    let entries = PgMoodStore::new(state.db.clone())
        .history(auth_user.id, limit)
        .await?;

    let views = entries
        .into_iter()
        .map(|entry| MoodEntryView::new(entry, lang))
        .collect();

    Ok(Json(views))
}

pub async fn get_streak(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<StreakResponse>> {
    let dates = PgMoodStore::new(state.db.clone())
        .history_dates(auth_user.id)
        .await?;

    Ok(Json(StreakResponse {
        streak: calculate_streak(&dates),
    }))
}
