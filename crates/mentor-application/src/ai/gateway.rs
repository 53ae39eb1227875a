//! AiGateway - resilient structured generation for the InsideMentor features.
//!
//! Every operation runs the same pipeline: cache lookup, fallback when no
//! client is wired, prompt rendering, rate-limited dispatch with retry,
//! response cleanup and typed parsing, then caching of whatever value is
//! returned. Operations never fail; a fallback value stands in for any
//! problem along the way.

use super::cleanup::parse_structured;
use super::prompts::{JournalSummary, MoodSummary, PromptLibrary, TaskSummary, time_of_day};
use super::resilience::{CacheStats, ResiliencePolicy};
use super::responses::{
    Greeting, JournalFeedback, MentorContext, MentorReply, MoodInsight, ParsedTask, TaskBreakdown,
    TaskOrder, TaskOrderPayload, WeeklyData, progress_fallback, weekly_fallback,
};
use chrono::{DateTime, Local, Timelike, Utc};
use mentor_core::completion::{CompletionError, CompletionErrorKind, TextCompletion};
use mentor_core::config::AiSettings;
use mentor_core::report::{ProgressInsights, WeeklyInsights};
use mentor_core::{MentorError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// Builds `"[user_<id>_]<operation>_<fingerprint>"`.
///
/// `serde_json` maps keep keys sorted, so equal fingerprints always
/// serialize to the same text.
pub fn cache_key(operation: &str, fingerprint: &Value, user_id: Option<&str>) -> String {
    let prefix = match user_id {
        Some(id) if !id.is_empty() => format!("user_{id}_"),
        _ => String::new(),
    };
    format!("{prefix}{operation}_{fingerprint}")
}

/// Name-based digest that keeps free text out of cache keys.
pub fn digest(text: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, text.as_bytes()).to_string()
}

fn newest<'a>(dates: impl Iterator<Item = &'a DateTime<Utc>>) -> Option<DateTime<Utc>> {
    dates.max().copied()
}

fn activity_fingerprint(
    moods: &[MoodSummary],
    tasks: &[TaskSummary],
    journals: &[JournalSummary],
) -> Value {
    json!({
        "moodCount": moods.len(),
        "newestMood": newest(moods.iter().map(|m| &m.date)),
        "taskCount": tasks.len(),
        "doneCount": tasks.iter().filter(|t| t.status == "done").count(),
        "journalCount": journals.len(),
        "newestJournal": newest(journals.iter().map(|j| &j.date)),
    })
}

#[derive(Clone)]
pub struct AiGateway {
    client: Option<Arc<dyn TextCompletion>>,
    policy: Arc<ResiliencePolicy>,
    prompts: Arc<PromptLibrary>,
}

impl AiGateway {
    /// Creates a gateway over `client`, sharing `policy` with any other
    /// gateway built from the same instance.
    pub fn new(client: Option<Arc<dyn TextCompletion>>, policy: Arc<ResiliencePolicy>) -> Self {
        Self {
            client,
            policy,
            prompts: Arc::new(PromptLibrary::new()),
        }
    }

    /// A gateway that answers every operation with its fallback.
    pub fn unconfigured(settings: AiSettings) -> Self {
        Self::new(None, Arc::new(ResiliencePolicy::new(settings)))
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn policy(&self) -> &Arc<ResiliencePolicy> {
        &self.policy
    }

    /// Drops every cached response; returns how many were dropped.
    pub fn clear_cache(&self) -> usize {
        let dropped = self.policy.clear();
        tracing::info!("[AiGateway] Cleared {} cached responses", dropped);
        dropped
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.policy.stats()
    }

    /// Sends `prompt` as is, without cache or fallback.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Raw completion text
    /// - `Err(MentorError::Completion)`: No client is configured, a
    ///   non-retryable failure occurred, or retries were exhausted
    pub async fn complete_raw(&self, prompt: &str) -> Result<String> {
        let client = self.client.as_ref().ok_or_else(|| {
            MentorError::Completion(CompletionError::new(
                CompletionErrorKind::Other,
                "No completion client is configured",
            ))
        })?;
        Ok(self.policy.dispatch(client.as_ref(), prompt).await?)
    }

    async fn run<T, R, P>(&self, operation: &str, key: String, fallback: T, render: R, interpret: P) -> T
    where
        T: Serialize + DeserializeOwned,
        R: FnOnce(&PromptLibrary) -> Result<String>,
        P: FnOnce(&str) -> Option<T>,
    {
        if let Some(hit) = self.policy.cached::<T>(&key) {
            return hit;
        }

        let value = match &self.client {
            None => {
                tracing::debug!("[AiGateway] No completion client, using fallback for {}", operation);
                fallback
            }
            Some(client) => match render(self.prompts.as_ref()) {
                Err(err) => {
                    tracing::error!("[AiGateway] Could not build {} prompt: {}", operation, err);
                    fallback
                }
                Ok(prompt) => {
                    tracing::debug!("[AiGateway] Generating {}", operation);
                    match self.policy.dispatch(client.as_ref(), &prompt).await {
                        Ok(text) => interpret(&text).unwrap_or(fallback),
                        Err(err) => {
                            tracing::warn!("[AiGateway] {} failed, using fallback: {}", operation, err);
                            fallback
                        }
                    }
                }
            },
        };

        self.policy.store(key, &value);
        value
    }

    pub async fn generate_dashboard_greeting(
        &self,
        user_name: &str,
        recent_tasks: &[TaskSummary],
        recent_moods: &[MoodSummary],
    ) -> Greeting {
        let key = cache_key(
            "greeting",
            &json!({
                "userName": user_name,
                "taskCount": recent_tasks.len(),
                "moodCount": recent_moods.len(),
                "lastTask": recent_tasks.first().map(|t| t.title.as_str()).unwrap_or_default(),
                "lastMood": recent_moods.first().map(|m| m.mood.as_str()).unwrap_or_default(),
            }),
            None,
        );
        let part_of_day = time_of_day(Local::now().hour());
        self.run(
            "greeting",
            key,
            Greeting::fallback(user_name),
            |prompts| prompts.greeting(user_name, part_of_day, recent_tasks, recent_moods),
            parse_structured::<Greeting>,
        )
        .await
    }

    pub async fn generate_mood_insight(&self, mood_logs: &[MoodSummary], current_mood: &str) -> MoodInsight {
        let recent: Vec<&str> = mood_logs.iter().take(3).map(|m| m.mood.as_str()).collect();
        let key = cache_key(
            "moodInsight",
            &json!({
                "currentMood": current_mood,
                "moodCount": mood_logs.len(),
                "recentMoods": recent.join(","),
            }),
            None,
        );
        self.run(
            "moodInsight",
            key,
            MoodInsight::fallback(),
            |prompts| prompts.mood_insight(current_mood, Utc::now(), mood_logs),
            |text| parse_structured::<MoodInsight>(text).filter(|i| !i.observation.trim().is_empty()),
        )
        .await
    }

    /// Orders `tasks` for the user's current energy. The result always holds
    /// every input id exactly once.
    pub async fn sort_tasks_by_mood(
        &self,
        tasks: &[TaskSummary],
        mood_logs: &[MoodSummary],
        user_id: Option<&str>,
    ) -> TaskOrder {
        let ids: Vec<String> = tasks.iter().map(|t| t.id.clone().unwrap_or_default()).collect();
        if tasks.is_empty() {
            return TaskOrder::fallback(&ids);
        }
        let key = cache_key(
            "sortTasks",
            &json!({
                "tasks": tasks
                    .iter()
                    .map(|t| format!("{}:{}:{}", t.id.as_deref().unwrap_or_default(), t.status, t.priority))
                    .collect::<Vec<_>>(),
                "latestMood": mood_logs.first().map(|m| m.mood.as_str()),
                "latestEnergy": mood_logs.first().map(|m| m.energy),
            }),
            user_id,
        );
        self.run(
            "sortTasks",
            key,
            TaskOrder::fallback(&ids),
            |prompts| prompts.sort_tasks(tasks, mood_logs),
            |text| {
                parse_structured::<TaskOrderPayload>(text)
                    .map(|payload| TaskOrder::reconcile(payload.into_ids(), &ids))
            },
        )
        .await
    }

    pub async fn break_down_task(&self, task_title: &str, user_id: Option<&str>) -> TaskBreakdown {
        let key = cache_key("breakdown", &json!({ "title": task_title }), user_id);
        self.run(
            "breakdown",
            key,
            TaskBreakdown::fallback(),
            |prompts| prompts.break_down_task(task_title),
            |text| parse_structured::<TaskBreakdown>(text).and_then(TaskBreakdown::normalized),
        )
        .await
    }

    /// Reflects on `current_entry` in light of up to three `past_entries`.
    pub async fn generate_journal_feedback(
        &self,
        current_entry: &str,
        past_entries: &[String],
        user_id: Option<&str>,
    ) -> JournalFeedback {
        let key = cache_key(
            "journalFeedback",
            &json!({
                "entry": digest(current_entry),
                "past": past_entries.iter().take(3).map(|p| digest(p)).collect::<Vec<_>>(),
            }),
            user_id,
        );
        self.run(
            "journalFeedback",
            key,
            JournalFeedback::fallback(),
            |prompts| prompts.journal_feedback(current_entry, past_entries),
            |text| parse_structured::<JournalFeedback>(text).filter(|f| !f.feedback.trim().is_empty()),
        )
        .await
    }

    pub async fn generate_progress_report(
        &self,
        moods: &[MoodSummary],
        tasks: &[TaskSummary],
        journals: &[JournalSummary],
        user_id: Option<&str>,
    ) -> ProgressInsights {
        let key = cache_key("progressReport", &activity_fingerprint(moods, tasks, journals), user_id);
        self.run(
            "progressReport",
            key,
            progress_fallback(),
            |prompts| prompts.progress_report(moods, tasks, journals),
            parse_structured::<ProgressInsights>,
        )
        .await
    }

    pub async fn generate_weekly_report(&self, weekly: &WeeklyData, user_id: Option<&str>) -> WeeklyInsights {
        let key = cache_key(
            "weeklyReport",
            &activity_fingerprint(&weekly.mood_entries, &weekly.tasks, &weekly.journal_entries),
            user_id,
        );
        self.run(
            "weeklyReport",
            key,
            weekly_fallback(),
            |prompts| prompts.weekly_report(&weekly.mood_entries, &weekly.tasks, &weekly.journal_entries),
            parse_structured::<WeeklyInsights>,
        )
        .await
    }

    pub async fn generate_mentor_response(
        &self,
        message: &str,
        context: &MentorContext,
        user_id: Option<&str>,
    ) -> MentorReply {
        let key = cache_key(
            "mentor",
            &json!({
                "message": digest(message),
                "latestMood": context.latest_mood,
                "pendingTasks": context.tasks.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
                "journal": digest(&context.last_journal_entry),
            }),
            user_id,
        );
        self.run(
            "mentor",
            key,
            MentorReply::fallback(),
            |prompts| {
                prompts.mentor(
                    message,
                    &context.latest_mood,
                    &context.tasks,
                    &context.last_journal_entry,
                    context.streak,
                )
            },
            |text| parse_structured::<MentorReply>(text).filter(|r| !r.response.trim().is_empty()),
        )
        .await
    }

    /// Extracts title, due date, time and priority from free text.
    pub async fn parse_task_input(&self, raw_text: &str) -> ParsedTask {
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let key = cache_key("parseTask", &json!({ "text": digest(raw_text), "today": today }), None);
        self.run(
            "parseTask",
            key,
            ParsedTask::fallback(raw_text),
            |prompts| prompts.parse_task(raw_text, &today),
            |text| parse_structured::<ParsedTask>(text).filter(|t| !t.title.trim().is_empty()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_scopes_and_sorts() {
        let key = cache_key("breakdown", &json!({"title": "Essay", "a": 1}), Some("u1"));
        assert_eq!(key, r#"user_u1_breakdown_{"a":1,"title":"Essay"}"#);
        let key = cache_key("greeting", &json!({"userName": "Asha"}), None);
        assert_eq!(key, r#"greeting_{"userName":"Asha"}"#);
        assert_eq!(cache_key("x", &json!({}), Some("")), "x_{}");
    }

    #[test]
    fn test_digest_is_stable_and_opaque() {
        assert_eq!(digest("I feel tired"), digest("I feel tired"));
        assert_ne!(digest("I feel tired"), digest("I feel rested"));
        assert!(!digest("I feel tired").contains("tired"));
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_reports_state() {
        let gateway = AiGateway::unconfigured(AiSettings::default());
        assert!(!gateway.is_configured());
        let err = gateway.complete_raw("ping").await.unwrap_err();
        assert!(matches!(err, MentorError::Completion(_)));
        assert_eq!(gateway.cache_stats().size, 0);
    }
}
