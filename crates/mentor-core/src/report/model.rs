use crate::entity::Entity;
use crate::store::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generated analysis of recent moods, tasks and journal entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInsights {
    pub mood_trend: String,
    pub productivity_insight: String,
    pub journal_themes: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Generated summary of one week of activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyInsights {
    pub summary: String,
    pub mood_analysis: String,
    pub task_analysis: String,
    pub journal_insights: String,
    #[serde(default)]
    pub next_week_goals: Vec<String>,
}

/// An archived progress report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub insights: ProgressInsights,
}

impl Entity for ProgressReport {
    const COLLECTION: Collection = Collection::ProgressReports;
    const ENTITY_NAME: &'static str = "progress report";
    const ORDER_FIELD: &'static str = "createdAt";
    const REQUIRED_TIMESTAMPS: &'static [&'static str] = &["createdAt"];

    fn id(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// An archived weekly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub insights: WeeklyInsights,
}

impl Entity for WeeklyReport {
    const COLLECTION: Collection = Collection::WeeklyReports;
    const ENTITY_NAME: &'static str = "weekly report";
    const ORDER_FIELD: &'static str = "createdAt";
    const REQUIRED_TIMESTAMPS: &'static [&'static str] = &["createdAt"];

    fn id(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Per-user activity snapshot, stored under the user id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub total_tasks: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub in_progress_tasks: u32,
    /// Completed share of all tasks, in `[0, 1]`.
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub mood_entries: u32,
    #[serde(default)]
    pub average_energy: f64,
    #[serde(default)]
    pub average_stress: f64,
    #[serde(default)]
    pub average_focus: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_mood: Option<String>,
    #[serde(default)]
    pub journal_entries: u32,
    /// Consecutive days, ending today or yesterday, with a mood check-in.
    #[serde(default)]
    pub check_in_streak: u32,
    pub updated_at: DateTime<Utc>,
}

impl Entity for UserAnalytics {
    const COLLECTION: Collection = Collection::UserAnalytics;
    const ENTITY_NAME: &'static str = "user analytics";
    const ORDER_FIELD: &'static str = "updatedAt";
    const REQUIRED_TIMESTAMPS: &'static [&'static str] = &["updatedAt"];

    fn id(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
