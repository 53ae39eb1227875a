//! Persistence gateway.
//!
//! Typed CRUD over every InsideMentor entity. Each operation resolves the
//! owning identity, builds the write payload, and hands it to the matching
//! [`EntityRepository`], which decides between the remote store and the
//! mirror.

use crate::entity_repository::EntityRepository;
use crate::mirror_store::MirrorStore;
use chrono::{DateTime, Utc};
use mentor_core::chat::{ChatMessage, ChatSession, ChatSessionUpdate, NewChatMessage, NewChatSession};
use mentor_core::config::StoreSettings;
use mentor_core::identity::{ANONYMOUS_OWNER, IdentityProvider};
use mentor_core::journal::{JournalEntry, JournalUpdate, NewJournalEntry};
use mentor_core::mood::{MoodEntry, MoodUpdate, NewMoodEntry};
use mentor_core::payload::to_fields;
use mentor_core::report::{ProgressInsights, ProgressReport, UserAnalytics, WeeklyInsights, WeeklyReport};
use mentor_core::store::{DocumentStore, Fields};
use mentor_core::task::{NewTask, Task, TaskStatus, TaskUpdate};
use mentor_core::timestamp::to_wire;
use mentor_core::user::{UserProfile, UserProfileUpdate};
use mentor_core::{MentorError, Result};
use std::sync::Arc;

/// CRUD facade over the remote store with transparent mirror fallback.
///
/// # Example
///
/// ```
/// use mentor_core::task::NewTask;
/// use mentor_infrastructure::{PersistenceGateway, StaticIdentity};
/// use std::sync::Arc;
///
/// # async fn demo() -> mentor_core::Result<()> {
/// let gateway = PersistenceGateway::new(None, Arc::new(StaticIdentity::signed_in("u1")));
/// let task = gateway.add_task(NewTask::new("Read Ch.3")).await?;
/// assert_eq!(gateway.get_tasks("u1").await, vec![task]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PersistenceGateway {
    identity: Arc<dyn IdentityProvider>,
    settings: StoreSettings,
    mirror: Arc<MirrorStore>,
    users: EntityRepository<UserProfile>,
    tasks: EntityRepository<Task>,
    moods: EntityRepository<MoodEntry>,
    journals: EntityRepository<JournalEntry>,
    messages: EntityRepository<ChatMessage>,
    sessions: EntityRepository<ChatSession>,
    progress_reports: EntityRepository<ProgressReport>,
    weekly_reports: EntityRepository<WeeklyReport>,
    analytics: EntityRepository<UserAnalytics>,
}

impl PersistenceGateway {
    /// Creates a gateway with default store settings.
    pub fn new(remote: Option<Arc<dyn DocumentStore>>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::with_settings(remote, identity, StoreSettings::default())
    }

    pub fn with_settings(
        remote: Option<Arc<dyn DocumentStore>>,
        identity: Arc<dyn IdentityProvider>,
        settings: StoreSettings,
    ) -> Self {
        let mirror = Arc::new(MirrorStore::new());
        Self {
            identity,
            settings,
            users: EntityRepository::new(remote.clone(), mirror.clone()),
            tasks: EntityRepository::new(remote.clone(), mirror.clone()),
            moods: EntityRepository::new(remote.clone(), mirror.clone()),
            journals: EntityRepository::new(remote.clone(), mirror.clone()),
            messages: EntityRepository::new(remote.clone(), mirror.clone()),
            sessions: EntityRepository::new(remote.clone(), mirror.clone()),
            progress_reports: EntityRepository::new(remote.clone(), mirror.clone()),
            weekly_reports: EntityRepository::new(remote.clone(), mirror.clone()),
            analytics: EntityRepository::new(remote, mirror.clone()),
            mirror,
        }
    }

    /// Whether calls currently reach the remote store.
    pub fn is_remote_available(&self) -> bool {
        self.tasks.is_remote_available()
    }

    /// The mirror backing degraded mode (read-only inspection).
    pub fn mirror(&self) -> &MirrorStore {
        &self.mirror
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Resolves the owning identity or rejects the operation.
    fn require_owner(&self, operation: &'static str) -> Result<String> {
        self.identity.current_user_id().ok_or_else(|| {
            tracing::warn!("[Persistence] Rejected '{}': no signed-in user", operation);
            MentorError::unauthenticated(operation)
        })
    }

    fn now_fields(name: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(name.to_string(), to_wire(Utc::now()));
        fields
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Stores a user profile under its own id.
    pub async fn create_user(&self, user: &UserProfile) -> Result<UserProfile> {
        if user.id.trim().is_empty() {
            return Err(MentorError::internal("user profile requires an id"));
        }
        let mut fields = to_fields(user)?;
        fields.remove("id");
        if !fields.contains_key("createdAt") {
            fields.extend(Self::now_fields("createdAt"));
        }
        let stored = self.users.put(&user.id, &user.id, fields).await?;
        tracing::info!("[Persistence] Stored user {}", stored.id);
        Ok(stored)
    }

    pub async fn get_user(&self, user_id: &str) -> Option<UserProfile> {
        self.users.get(user_id).await
    }

    pub async fn update_user(&self, user_id: &str, update: &UserProfileUpdate) -> Result<()> {
        self.require_owner("update user")?;
        self.users.update(user_id, to_fields(update)?).await
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn add_task(&self, task: NewTask) -> Result<Task> {
        let owner = self.require_owner("add task")?;
        let mut fields = to_fields(&task)?;
        fields.extend(Self::now_fields("createdAt"));
        self.tasks.create(&owner, fields).await
    }

    /// Lists the user's tasks, newest first.
    pub async fn get_tasks(&self, user_id: &str) -> Vec<Task> {
        self.tasks.list(user_id, None).await
    }

    pub async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<()> {
        self.require_owner("update task")?;
        self.tasks.update(task_id, to_fields(update)?).await
    }

    /// Moves a task to another board column.
    ///
    /// Moving into `done` stamps `completedAt`; moving anywhere else clears it.
    pub async fn move_task(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        let mut update = TaskUpdate::status(status);
        if status == TaskStatus::Done {
            update.completed_at = Some(Utc::now());
        }
        self.update_task(task_id, &update).await?;
        if status != TaskStatus::Done {
            self.tasks.remove_fields(task_id, &["completedAt"]).await?;
        }
        Ok(())
    }

    pub async fn complete_task(&self, task_id: &str) -> Result<()> {
        self.move_task(task_id, TaskStatus::Done).await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.require_owner("delete task")?;
        self.tasks.delete(task_id).await
    }

    // ------------------------------------------------------------------
    // Mood entries
    // ------------------------------------------------------------------

    /// Records a mood check-in. Scores outside `[0, 10]` are clamped.
    pub async fn add_mood_entry(&self, entry: NewMoodEntry) -> Result<MoodEntry> {
        let owner = self.require_owner("add mood entry")?;
        let (entry, clamped) = entry.clamped();
        if clamped {
            tracing::info!("[Persistence] Clamped out-of-range mood scores for {}", owner);
        }
        let mut fields = to_fields(&entry)?;
        if !fields.contains_key("date") {
            fields.extend(Self::now_fields("date"));
        }
        self.moods.create(&owner, fields).await
    }

    /// Lists the most recent mood entries, newest first (default limit 7).
    pub async fn get_mood_entries(&self, user_id: &str, limit: Option<usize>) -> Vec<MoodEntry> {
        let limit = limit.unwrap_or(self.settings.mood_limit);
        self.moods.list(user_id, Some(limit)).await
    }

    /// Lists every mood entry dated at or after `since`, newest first.
    pub async fn get_mood_entries_since(&self, user_id: &str, since: DateTime<Utc>) -> Vec<MoodEntry> {
        self.moods.list_since(user_id, since).await
    }

    pub async fn update_mood_entry(&self, entry_id: &str, update: MoodUpdate) -> Result<()> {
        self.require_owner("update mood entry")?;
        self.moods.update(entry_id, to_fields(&update.clamped())?).await
    }

    pub async fn delete_mood_entry(&self, entry_id: &str) -> Result<()> {
        self.require_owner("delete mood entry")?;
        self.moods.delete(entry_id).await
    }

    // ------------------------------------------------------------------
    // Journal entries
    // ------------------------------------------------------------------

    pub async fn add_journal_entry(&self, entry: NewJournalEntry) -> Result<JournalEntry> {
        let owner = self.require_owner("add journal entry")?;
        let mut fields = to_fields(&entry)?;
        if !fields.contains_key("date") {
            fields.extend(Self::now_fields("date"));
        }
        self.journals.create(&owner, fields).await
    }

    /// Lists the most recent journal entries, newest first (default limit 10).
    pub async fn get_journal_entries(&self, user_id: &str, limit: Option<usize>) -> Vec<JournalEntry> {
        let limit = limit.unwrap_or(self.settings.journal_limit);
        self.journals.list(user_id, Some(limit)).await
    }

    pub async fn update_journal_entry(&self, entry_id: &str, update: &JournalUpdate) -> Result<()> {
        self.require_owner("update journal entry")?;
        self.journals.update(entry_id, to_fields(update)?).await
    }

    /// Attaches generated feedback to a journal entry.
    pub async fn attach_journal_feedback(&self, entry_id: &str, feedback: &str) -> Result<()> {
        self.update_journal_entry(entry_id, &JournalUpdate::feedback(feedback))
            .await
    }

    pub async fn delete_journal_entry(&self, entry_id: &str) -> Result<()> {
        self.require_owner("delete journal entry")?;
        self.journals.delete(entry_id).await
    }

    // ------------------------------------------------------------------
    // Chat messages
    // ------------------------------------------------------------------

    /// Appends a chat message.
    ///
    /// Without a signed-in user the message is kept in the mirror under the
    /// anonymous owner instead of being rejected.
    pub async fn add_chat_message(&self, message: NewChatMessage) -> Result<ChatMessage> {
        let mut fields = to_fields(&message)?;
        if !fields.contains_key("timestamp") {
            fields.extend(Self::now_fields("timestamp"));
        }
        match self.identity.current_user_id() {
            Some(owner) => self.messages.create(&owner, fields).await,
            None => {
                tracing::warn!("[Persistence] No signed-in user; keeping chat message in the mirror");
                self.messages.create_in_mirror(ANONYMOUS_OWNER, fields)
            }
        }
    }

    /// Lists the conversation, oldest first.
    pub async fn get_chat_messages(&self, user_id: &str) -> Vec<ChatMessage> {
        self.messages.list(user_id, None).await
    }

    pub async fn delete_chat_message(&self, message_id: &str) -> Result<()> {
        self.require_owner("delete chat message")?;
        self.messages.delete(message_id).await
    }

    /// Deletes every chat message of `user_id`, returning how many were removed.
    pub async fn clear_chat_messages(&self, user_id: &str) -> Result<usize> {
        self.require_owner("clear chat messages")?;
        let removed = self.messages.clear_owner(user_id).await?;
        tracing::info!("[Persistence] Cleared {} chat messages for {}", removed, user_id);
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Chat sessions
    // ------------------------------------------------------------------

    pub async fn add_chat_session(&self, session: NewChatSession) -> Result<ChatSession> {
        let owner = self.require_owner("add chat session")?;
        let mut fields = to_fields(&session)?;
        let now = to_wire(Utc::now());
        fields.insert("createdAt".to_string(), now.clone());
        fields.insert("lastMessageAt".to_string(), now);
        fields.insert("messageCount".to_string(), 0.into());
        self.sessions.create(&owner, fields).await
    }

    /// Lists sessions, most recently active first.
    pub async fn get_chat_sessions(&self, user_id: &str) -> Vec<ChatSession> {
        self.sessions.list(user_id, None).await
    }

    pub async fn update_chat_session(&self, session_id: &str, update: &ChatSessionUpdate) -> Result<()> {
        self.require_owner("update chat session")?;
        self.sessions.update(session_id, to_fields(update)?).await
    }

    pub async fn delete_chat_session(&self, session_id: &str) -> Result<()> {
        self.require_owner("delete chat session")?;
        self.sessions.delete(session_id).await
    }

    // ------------------------------------------------------------------
    // Reports and analytics
    // ------------------------------------------------------------------

    pub async fn save_progress_report(&self, insights: &ProgressInsights) -> Result<ProgressReport> {
        let owner = self.require_owner("save progress report")?;
        let mut fields = to_fields(insights)?;
        fields.extend(Self::now_fields("createdAt"));
        self.progress_reports.create(&owner, fields).await
    }

    pub async fn get_progress_reports(&self, user_id: &str, limit: Option<usize>) -> Vec<ProgressReport> {
        self.progress_reports.list(user_id, limit).await
    }

    pub async fn save_weekly_report(&self, insights: &WeeklyInsights) -> Result<WeeklyReport> {
        let owner = self.require_owner("save weekly report")?;
        let mut fields = to_fields(insights)?;
        fields.extend(Self::now_fields("createdAt"));
        self.weekly_reports.create(&owner, fields).await
    }

    pub async fn get_weekly_reports(&self, user_id: &str, limit: Option<usize>) -> Vec<WeeklyReport> {
        self.weekly_reports.list(user_id, limit).await
    }

    /// Replaces the analytics snapshot of the signed-in user.
    pub async fn save_user_analytics(&self, analytics: &UserAnalytics) -> Result<UserAnalytics> {
        let owner = self.require_owner("save user analytics")?;
        let mut fields = to_fields(analytics)?;
        fields.remove("id");
        fields.extend(Self::now_fields("updatedAt"));
        self.analytics.put(&owner, &owner, fields).await
    }

    pub async fn get_user_analytics(&self, user_id: &str) -> Option<UserAnalytics> {
        self.analytics.get(user_id).await
    }
}
