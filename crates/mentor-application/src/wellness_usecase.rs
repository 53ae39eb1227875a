//! Wellness use cases.
//!
//! `WellnessUseCase` coordinates the persistence gateway, the AI gateway and
//! the auth session for the student-facing flows: check-ins, journaling,
//! mentor chat, quick task capture, analytics and report archiving.

use crate::ai::{
    AiGateway, Greeting, JournalSummary, MENTOR_APOLOGY, MentorContext, MoodInsight, MoodSummary,
    TaskSummary, WeeklyData,
};
use crate::analytics::{check_in_streak, compute_user_analytics};
use chrono::{Duration, NaiveDate, Utc};
use mentor_core::chat::{
    ChatMessage, ChatSession, ChatSessionUpdate, DEFAULT_SESSION_TITLE, NewChatMessage, NewChatSession,
};
use mentor_core::identity::{AuthState, IdentityProvider};
use mentor_core::journal::{JournalEntry, NewJournalEntry};
use mentor_core::mood::{MoodEntry, NewMoodEntry};
use mentor_core::report::{ProgressReport, UserAnalytics, WeeklyReport};
use mentor_core::task::Task;
use mentor_core::user::UserProfile;
use mentor_core::{MentorError, Result};
use mentor_infrastructure::{AuthSession, PersistenceGateway};
use std::sync::Arc;

/// Mood entries considered when computing analytics.
const ANALYTICS_MOOD_WINDOW: usize = 30;
/// First look-back, in days, when counting the check-in streak.
const STREAK_WINDOW_DAYS: i64 = 31;

/// A stored check-in with the insight generated for it.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodCheckIn {
    pub entry: MoodEntry,
    pub insight: MoodInsight,
}

/// Both sides of one mentor exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct MentorExchange {
    pub user_message: ChatMessage,
    pub reply: ChatMessage,
    /// The session after its counters were bumped, when one was given and
    /// the update succeeded.
    pub session: Option<ChatSession>,
}

/// Configuration and session snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct WellnessStatus {
    pub ai_configured: bool,
    pub remote_store_available: bool,
    pub email_auth_available: bool,
    pub auth_state: AuthState,
    pub cached_responses: usize,
}

#[derive(Clone)]
pub struct WellnessUseCase {
    persistence: PersistenceGateway,
    ai: AiGateway,
    session: Arc<AuthSession>,
}

impl WellnessUseCase {
    pub fn new(persistence: PersistenceGateway, ai: AiGateway, session: Arc<AuthSession>) -> Self {
        Self {
            persistence,
            ai,
            session,
        }
    }

    pub fn persistence(&self) -> &PersistenceGateway {
        &self.persistence
    }

    pub fn ai(&self) -> &AiGateway {
        &self.ai
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    fn require_user(&self, operation: &'static str) -> Result<String> {
        self.session
            .current_user_id()
            .ok_or_else(|| MentorError::unauthenticated(operation))
    }

    // ------------------------------------------------------------------
    // Account
    // ------------------------------------------------------------------

    /// Signs in and loads the stored profile.
    ///
    /// A fresh identity gets fresh suggestions, so the AI cache is cleared.
    pub async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<UserProfile> {
        let user = self.session.sign_in(email, password).await?;
        let Some(profile) = self.persistence.get_user(&user.uid).await else {
            tracing::warn!("[Auth] Signed in as {} but no profile is stored", user.uid);
            self.session.mark_signed_out();
            return Err(MentorError::auth("User data not found"));
        };
        self.ai.clear_cache();
        Ok(profile)
    }

    /// Creates the account, then stores `profile` under the new user id.
    pub async fn register_with_email(
        &self,
        email: &str,
        password: &str,
        mut profile: UserProfile,
    ) -> Result<UserProfile> {
        let user = self.session.register(email, password).await?;
        profile.id = user.uid;
        profile.email = email.to_string();
        let stored = self.persistence.create_user(&profile).await?;
        self.ai.clear_cache();
        Ok(stored)
    }

    /// Attributes the session to an institute-issued profile without an
    /// email account. Storing the profile is best effort.
    pub async fn sign_in_local(&self, profile: UserProfile) -> Result<UserProfile> {
        if profile.id.trim().is_empty() {
            return Err(MentorError::auth("Invalid student ID"));
        }
        self.session.sign_in_local(profile.id.clone());
        self.ai.clear_cache();
        match self.persistence.create_user(&profile).await {
            Ok(stored) => Ok(stored),
            Err(err) => {
                tracing::warn!("[Auth] Could not store profile {}: {}", profile.id, err);
                Ok(profile)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.session.sign_out().await
    }

    // ------------------------------------------------------------------
    // Check-ins and journaling
    // ------------------------------------------------------------------

    /// Stores a check-in and reflects on it against the earlier entries.
    pub async fn mood_check_in(&self, entry: NewMoodEntry) -> Result<MoodCheckIn> {
        let user_id = self.require_user("check in mood")?;
        let earlier = self.persistence.get_mood_entries(&user_id, None).await;
        let entry = self.persistence.add_mood_entry(entry).await?;

        let history: Vec<MoodSummary> = earlier.iter().map(MoodSummary::from).collect();
        let insight = self.ai.generate_mood_insight(&history, &entry.mood).await;
        Ok(MoodCheckIn { entry, insight })
    }

    /// Stores a journal entry, generates feedback from the three entries
    /// before it and attaches that feedback once.
    pub async fn write_journal_entry(&self, entry: NewJournalEntry) -> Result<JournalEntry> {
        let user_id = self.require_user("write journal entry")?;
        let past: Vec<String> = self
            .persistence
            .get_journal_entries(&user_id, Some(3))
            .await
            .into_iter()
            .map(|e| e.content)
            .collect();
        let mut stored = self.persistence.add_journal_entry(entry).await?;

        let feedback = self
            .ai
            .generate_journal_feedback(&stored.content, &past, Some(&user_id))
            .await;
        self.persistence
            .attach_journal_feedback(&stored.id, &feedback.feedback)
            .await?;
        stored.ai_feedback = Some(feedback.feedback);
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Mentor chat
    // ------------------------------------------------------------------

    /// Gathers what the mentor should know: latest mood, up to three pending
    /// tasks, the latest journal entry and the check-in streak.
    pub async fn mentor_context(&self, user_id: &str) -> MentorContext {
        let moods = self.persistence.get_mood_entries(user_id, None).await;
        let tasks = self.persistence.get_tasks(user_id).await;
        let journals = self.persistence.get_journal_entries(user_id, Some(1)).await;
        let streak = self.check_in_streak_of(user_id, Utc::now().date_naive()).await;

        MentorContext {
            latest_mood: moods
                .first()
                .map(|m| m.mood.clone())
                .unwrap_or_else(|| "No recent mood data".to_string()),
            tasks: tasks
                .iter()
                .filter(|t| t.is_pending())
                .take(3)
                .map(TaskSummary::from)
                .collect(),
            last_journal_entry: journals
                .first()
                .map(|j| j.content.clone())
                .unwrap_or_else(|| "No recent journal entries".to_string()),
            streak,
        }
    }

    /// Counts the check-in streak ending `today` over the full mood history.
    ///
    /// Reads a dated window of check-ins and doubles it while the streak
    /// still reaches the window's first day.
    async fn check_in_streak_of(&self, user_id: &str, today: NaiveDate) -> u32 {
        let mut window = STREAK_WINDOW_DAYS;
        loop {
            let Some(since) = today
                .checked_sub_signed(Duration::days(window))
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|start| start.and_utc())
            else {
                return 0;
            };
            let moods = self.persistence.get_mood_entries_since(user_id, since).await;
            let streak = check_in_streak(&moods, today);
            if i64::from(streak) < window {
                return streak;
            }
            window = window.saturating_mul(2);
        }
    }

    /// Returns the session to open the mentor with, creating "General Chat"
    /// for a user without any.
    ///
    /// Preference: an existing "General Chat", then the active session, then
    /// the most recently used one.
    pub async fn ensure_default_session(&self) -> Result<ChatSession> {
        let user_id = self.require_user("open chat session")?;
        let sessions = self.persistence.get_chat_sessions(&user_id).await;
        let preferred = sessions
            .iter()
            .find(|s| s.title == DEFAULT_SESSION_TITLE)
            .or_else(|| sessions.iter().find(|s| s.is_active))
            .or_else(|| sessions.first());
        if let Some(session) = preferred {
            return Ok(session.clone());
        }
        tracing::info!("[Persistence] Creating default chat session for {}", user_id);
        self.persistence
            .add_chat_session(NewChatSession::active(DEFAULT_SESSION_TITLE))
            .await
    }

    /// Opens "Chat N+1" as the active session.
    pub async fn start_new_session(&self) -> Result<ChatSession> {
        let user_id = self.require_user("start chat session")?;
        let existing = self.persistence.get_chat_sessions(&user_id).await.len();
        self.persistence
            .add_chat_session(NewChatSession::active(format!("Chat {}", existing + 1)))
            .await
    }

    /// Marks `session_id` active, then every other session inactive.
    ///
    /// The updates run one after another; a failure midway leaves more than
    /// one session active.
    pub async fn switch_chat_session(&self, session_id: &str) -> Result<()> {
        let user_id = self.require_user("switch chat session")?;
        self.persistence
            .update_chat_session(session_id, &ChatSessionUpdate::active(true))
            .await?;
        for other in self.persistence.get_chat_sessions(&user_id).await {
            if other.id != session_id {
                self.persistence
                    .update_chat_session(&other.id, &ChatSessionUpdate::active(false))
                    .await?;
            }
        }
        Ok(())
    }

    /// Stores the user's message, generates and stores the mentor's reply,
    /// and bumps the session counters.
    ///
    /// Works without a signed-in user; the messages then stay in the mirror.
    /// When the reply cannot be stored an apology is stored in its place.
    pub async fn send_mentor_message(
        &self,
        session: Option<&ChatSession>,
        message: &str,
    ) -> Result<MentorExchange> {
        let user_id = self.session.current_user_id();
        let user_message = self.persistence.add_chat_message(NewChatMessage::user(message)).await?;

        let context = match &user_id {
            Some(id) => self.mentor_context(id).await,
            None => MentorContext::default(),
        };
        let reply = self
            .ai
            .generate_mentor_response(message, &context, user_id.as_deref())
            .await;

        let reply = match self
            .persistence
            .add_chat_message(NewChatMessage::ai(reply.response))
            .await
        {
            Ok(stored) => stored,
            Err(err) => {
                tracing::error!("[Persistence] Could not store mentor reply: {}", err);
                self.persistence
                    .add_chat_message(NewChatMessage::ai(MENTOR_APOLOGY))
                    .await?
            }
        };

        let session = match session {
            Some(current) => self.bump_session(current, reply.timestamp).await,
            None => None,
        };

        Ok(MentorExchange {
            user_message,
            reply,
            session,
        })
    }

    async fn bump_session(
        &self,
        current: &ChatSession,
        at: chrono::DateTime<Utc>,
    ) -> Option<ChatSession> {
        let update = ChatSessionUpdate {
            last_message_at: Some(at),
            message_count: Some(current.message_count + 2),
            ..ChatSessionUpdate::default()
        };
        match self.persistence.update_chat_session(&current.id, &update).await {
            Ok(()) => Some(ChatSession {
                last_message_at: at,
                message_count: current.message_count + 2,
                ..current.clone()
            }),
            Err(err) => {
                tracing::warn!("[Persistence] Could not update chat session {}: {}", current.id, err);
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Parses free text such as "physics mock test friday 4pm high" and
    /// stores the resulting task.
    pub async fn quick_add_task(&self, text: &str) -> Result<Task> {
        self.require_user("add task")?;
        let parsed = self.ai.parse_task_input(text).await;
        self.persistence.add_task(parsed.into_new_task()).await
    }

    /// Pending tasks in the order recommended for the user's current energy.
    pub async fn prioritized_tasks(&self) -> Result<Vec<Task>> {
        let user_id = self.require_user("prioritize tasks")?;
        let mut pending: Vec<Task> = self
            .persistence
            .get_tasks(&user_id)
            .await
            .into_iter()
            .filter(Task::is_pending)
            .collect();
        let moods: Vec<MoodSummary> = self
            .persistence
            .get_mood_entries(&user_id, None)
            .await
            .iter()
            .map(MoodSummary::from)
            .collect();
        let summaries: Vec<TaskSummary> = pending.iter().map(TaskSummary::from).collect();

        let order = self
            .ai
            .sort_tasks_by_mood(&summaries, &moods, Some(&user_id))
            .await;
        pending.sort_by_key(|task| {
            order
                .sorted_tasks
                .iter()
                .position(|id| *id == task.id)
                .unwrap_or(usize::MAX)
        });
        Ok(pending)
    }

    /// Greeting for the dashboard, from the five newest tasks and three
    /// newest check-ins.
    pub async fn dashboard_greeting(&self) -> Result<Greeting> {
        let user_id = self.require_user("load dashboard")?;
        let name = self
            .persistence
            .get_user(&user_id)
            .await
            .map(|profile| profile.display_name().to_string())
            .unwrap_or_else(|| "there".to_string());
        let tasks: Vec<TaskSummary> = self
            .persistence
            .get_tasks(&user_id)
            .await
            .iter()
            .take(5)
            .map(TaskSummary::from)
            .collect();
        let moods: Vec<MoodSummary> = self
            .persistence
            .get_mood_entries(&user_id, Some(3))
            .await
            .iter()
            .map(MoodSummary::from)
            .collect();
        Ok(self.ai.generate_dashboard_greeting(&name, &tasks, &moods).await)
    }

    // ------------------------------------------------------------------
    // Analytics and reports
    // ------------------------------------------------------------------

    pub async fn refresh_analytics(&self) -> Result<UserAnalytics> {
        let user_id = self.require_user("refresh analytics")?;
        let tasks = self.persistence.get_tasks(&user_id).await;
        let moods = self
            .persistence
            .get_mood_entries(&user_id, Some(ANALYTICS_MOOD_WINDOW))
            .await;
        let journals = self.persistence.get_journal_entries(&user_id, None).await;

        let now = Utc::now();
        let streak = self.check_in_streak_of(&user_id, now.date_naive()).await;
        let snapshot = compute_user_analytics(&user_id, &tasks, &moods, &journals, streak, now);
        self.persistence.save_user_analytics(&snapshot).await
    }

    pub async fn archive_progress_report(&self) -> Result<ProgressReport> {
        let user_id = self.require_user("save progress report")?;
        let moods: Vec<MoodSummary> = self
            .persistence
            .get_mood_entries(&user_id, None)
            .await
            .iter()
            .map(MoodSummary::from)
            .collect();
        let tasks: Vec<TaskSummary> = self
            .persistence
            .get_tasks(&user_id)
            .await
            .iter()
            .map(TaskSummary::from)
            .collect();
        let journals: Vec<JournalSummary> = self
            .persistence
            .get_journal_entries(&user_id, None)
            .await
            .iter()
            .map(JournalSummary::from)
            .collect();

        let insights = self
            .ai
            .generate_progress_report(&moods, &tasks, &journals, Some(&user_id))
            .await;
        self.persistence.save_progress_report(&insights).await
    }

    /// Summarizes the last seven days and archives the result.
    pub async fn archive_weekly_report(&self) -> Result<WeeklyReport> {
        let user_id = self.require_user("save weekly report")?;
        let since = Utc::now() - Duration::days(7);

        let weekly = WeeklyData {
            mood_entries: self
                .persistence
                .get_mood_entries(&user_id, Some(ANALYTICS_MOOD_WINDOW))
                .await
                .iter()
                .filter(|m| m.date >= since)
                .map(MoodSummary::from)
                .collect(),
            tasks: self
                .persistence
                .get_tasks(&user_id)
                .await
                .iter()
                .filter(|t| t.created_at >= since || t.completed_at.is_some_and(|at| at >= since))
                .map(TaskSummary::from)
                .collect(),
            journal_entries: self
                .persistence
                .get_journal_entries(&user_id, None)
                .await
                .iter()
                .filter(|j| j.date >= since)
                .map(JournalSummary::from)
                .collect(),
        };

        let insights = self.ai.generate_weekly_report(&weekly, Some(&user_id)).await;
        self.persistence.save_weekly_report(&insights).await
    }

    pub fn status(&self) -> WellnessStatus {
        WellnessStatus {
            ai_configured: self.ai.is_configured(),
            remote_store_available: self.persistence.is_remote_available(),
            email_auth_available: self.session.has_backend(),
            auth_state: self.session.state(),
            cached_responses: self.ai.cache_stats().size,
        }
    }
}
