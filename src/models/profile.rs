use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User-selected thematic area used to tailor the daily message.
///
/// Persisted under its canonical Spanish name, matching the values the
/// onboarding flow writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "focus_area")]
pub enum Focus {
    #[serde(rename = "Autoestima")]
    #[sqlx(rename = "Autoestima")]
    SelfEsteem,
    #[serde(rename = "Ansiedad")]
    #[sqlx(rename = "Ansiedad")]
    Anxiety,
    #[serde(rename = "Motivación")]
    #[sqlx(rename = "Motivación")]
    Motivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationTone {
    #[serde(rename = "Amable")]
    Gentle,
    #[serde(rename = "Directo")]
    Direct,
    #[serde(rename = "Motivador")]
    Motivational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationLength {
    #[serde(rename = "Corto")]
    Short,
    #[serde(rename = "Medio")]
    Medium,
    #[serde(rename = "Detallado")]
    Detailed,
}

/// How the daily message should read for this user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub tone: NotificationTone,
    pub length: NotificationLength,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            tone: NotificationTone::Gentle,
            length: NotificationLength::Medium,
        }
    }
}

/// Profile row, keyed by the auth account id.
///
/// The push subscription payload lives in the same row but is fetched
/// separately; older rows may predate the column.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub focus: Option<Focus>,
    pub avatar_url: Option<String>,
    pub is_premium: bool,
    pub notification_preferences: Option<sqlx::types::Json<NotificationPreferences>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn notification_preferences(&self) -> NotificationPreferences {
        self.notification_preferences
            .as_ref()
            .map(|j| j.0)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_serialize_to_canonical_names() {
        let prefs = NotificationPreferences::default();
        let json = serde_json::to_value(prefs).unwrap();
        assert_eq!(json["tone"], "Amable");
        assert_eq!(json["length"], "Medio");
    }

    #[test]
    fn focus_round_trips_through_canonical_names() {
        let focus: Focus = serde_json::from_str("\"Autoestima\"").unwrap();
        assert_eq!(focus, Focus::SelfEsteem);
        assert_eq!(serde_json::to_string(&focus).unwrap(), "\"Autoestima\"");
    }
}
