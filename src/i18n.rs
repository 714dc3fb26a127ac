//! Display-string lookup for canonical persisted values.
//!
//! Rows store one canonical key; translation happens at read time through
//! these exhaustive match tables.

use serde::Deserialize;

use crate::models::mood::MoodLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    #[default]
    Es,
}

pub fn mood_label(label: MoodLabel, lang: Lang) -> &'static str {
    match (lang, label) {
        (Lang::En, MoodLabel::VeryBad) => "Very bad",
        (Lang::En, MoodLabel::Neutral) => "Neutral",
        (Lang::En, MoodLabel::Ok) => "Good",
        (Lang::En, MoodLabel::Great) => "Great",
        (Lang::En, MoodLabel::VeryGood) => "Amazing",
        (Lang::Es, MoodLabel::VeryBad) => "Muy mal",
        (Lang::Es, MoodLabel::Neutral) => "Neutral",
        (Lang::Es, MoodLabel::Ok) => "Bien",
        (Lang::Es, MoodLabel::Great) => "Genial",
        (Lang::Es, MoodLabel::VeryGood) => "Increíble",
    }
}
