use crate::entity::Entity;
use crate::store::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MOOD_SCORE_MIN: f64 = 0.0;
pub const MOOD_SCORE_MAX: f64 = 10.0;

/// Clamps a slider score into `[MOOD_SCORE_MIN, MOOD_SCORE_MAX]`; NaN becomes the minimum.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return MOOD_SCORE_MIN;
    }
    score.clamp(MOOD_SCORE_MIN, MOOD_SCORE_MAX)
}

/// A single mood check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    #[serde(default)]
    pub id: String,
    pub mood: String,
    #[serde(default)]
    pub energy: f64,
    #[serde(default)]
    pub stress: f64,
    #[serde(default)]
    pub focus: f64,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_liner: Option<String>,
    #[serde(default)]
    pub user_id: String,
}

impl Entity for MoodEntry {
    const COLLECTION: Collection = Collection::MoodEntries;
    const ENTITY_NAME: &'static str = "mood entry";
    const ORDER_FIELD: &'static str = "date";
    const REQUIRED_TIMESTAMPS: &'static [&'static str] = &["date"];

    fn id(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> DateTime<Utc> {
        self.date
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMoodEntry {
    pub mood: String,
    pub energy: f64,
    pub stress: f64,
    pub focus: f64,
    /// Check-in time; the gateway uses "now" when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_liner: Option<String>,
}

impl NewMoodEntry {
    pub fn new(mood: impl Into<String>, energy: f64, stress: f64, focus: f64) -> Self {
        Self {
            mood: mood.into(),
            energy,
            stress,
            focus,
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Returns the entry with every score clamped, and whether anything changed.
    pub fn clamped(mut self) -> (Self, bool) {
        let before = (self.energy, self.stress, self.focus);
        self.energy = clamp_score(self.energy);
        self.stress = clamp_score(self.stress);
        self.focus = clamp_score(self.focus);
        let changed = before.0.to_bits() != self.energy.to_bits()
            || before.1.to_bits() != self.stress.to_bits()
            || before.2.to_bits() != self.focus.to_bits();
        (self, changed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_liner: Option<String>,
}

impl MoodUpdate {
    pub fn clamped(mut self) -> Self {
        self.energy = self.energy.map(clamp_score);
        self.stress = self.stress.map(clamp_score);
        self.focus = self.focus.map(clamp_score);
        self
    }
}
