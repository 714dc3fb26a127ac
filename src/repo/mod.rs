pub mod moods;
pub mod profiles;

pub use moods::{MoodStore, PgMoodStore};
pub use profiles::{PgProfileStore, ProfileStore};
