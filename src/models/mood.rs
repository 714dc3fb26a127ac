use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One user-submitted record of subjective emotional state at a point in
/// time. Entries are immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub emoji: String,
    pub label: MoodLabel,
}

/// Closed five-point mood scale. The snake_case key is the canonical
/// persisted form; display strings come from the `i18n` lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "mood_label", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MoodLabel {
    VeryBad,
    Neutral,
    Ok,
    Great,
    VeryGood,
}

impl MoodLabel {
    /// Fixed glyph shown in the mood picker for each level.
    pub fn emoji(self) -> &'static str {
        match self {
            MoodLabel::VeryBad => "😞",
            MoodLabel::Neutral => "😐",
            MoodLabel::Ok => "🙂",
            MoodLabel::Great => "😄",
            MoodLabel::VeryGood => "🤩",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_serializes_to_snake_case_key() {
        assert_eq!(
            serde_json::to_string(&MoodLabel::VeryBad).unwrap(),
            "\"very_bad\""
        );
        assert_eq!(serde_json::to_string(&MoodLabel::Ok).unwrap(), "\"ok\"");
    }

    #[test]
    fn every_label_has_a_distinct_emoji() {
        let labels = [
            MoodLabel::VeryBad,
            MoodLabel::Neutral,
            MoodLabel::Ok,
            MoodLabel::Great,
            MoodLabel::VeryGood,
        ];
        let emojis: std::collections::HashSet<_> = labels.iter().map(|l| l.emoji()).collect();
        assert_eq!(emojis.len(), labels.len());
    }
}
