use crate::entity::Entity;
use crate::store::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalCategory {
    Study,
    Personal,
    Reflection,
    Goal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<JournalCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

impl JournalEntry {
    pub fn has_feedback(&self) -> bool {
        self.ai_feedback.as_deref().is_some_and(|f| !f.is_empty())
    }
}

impl Entity for JournalEntry {
    const COLLECTION: Collection = Collection::JournalEntries;
    const ENTITY_NAME: &'static str = "journal entry";
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
pub struct NewJournalEntry {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<JournalCategory>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

impl NewJournalEntry {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: JournalCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<JournalCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

impl JournalUpdate {
    pub fn feedback(feedback: impl Into<String>) -> Self {
        Self {
            ai_feedback: Some(feedback.into()),
            ..Self::default()
        }
    }
}
