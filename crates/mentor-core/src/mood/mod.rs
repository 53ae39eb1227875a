//! Mood check-in domain module.

mod model;

pub use model::{MOOD_SCORE_MAX, MOOD_SCORE_MIN, MoodEntry, MoodUpdate, NewMoodEntry, clamp_score};
