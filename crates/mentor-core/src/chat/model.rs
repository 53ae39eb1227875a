use crate::entity::Entity;
use crate::store::{Collection, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title of the session opened automatically for a new user.
pub const DEFAULT_SESSION_TITLE: &str = "General Chat";

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_id: String,
}

impl Entity for ChatMessage {
    const COLLECTION: Collection = Collection::ChatMessages;
    const ENTITY_NAME: &'static str = "chat message";
    const ORDER_FIELD: &'static str = "timestamp";
    const ORDER_DIRECTION: Direction = Direction::Ascending;
    const REQUIRED_TIMESTAMPS: &'static [&'static str] = &["timestamp"];
    const MIRROR_ON_PERMISSION_DENIED: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    #[serde(rename = "type")]
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A mentor conversation thread.
///
/// `is_active` marks the session the user last switched to. Nothing keeps
/// it unique across a user's sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub user_id: String,
}

impl Entity for ChatSession {
    const COLLECTION: Collection = Collection::ChatSessions;
    const ENTITY_NAME: &'static str = "chat session";
    const ORDER_FIELD: &'static str = "lastMessageAt";
    const REQUIRED_TIMESTAMPS: &'static [&'static str] = &["createdAt", "lastMessageAt"];

    fn id(&self) -> &str {
        &self.id
    }

    fn order_key(&self) -> DateTime<Utc> {
        self.last_message_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatSession {
    pub title: String,
    pub is_active: bool,
}

impl NewChatSession {
    pub fn active(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ChatSessionUpdate {
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }
}
