//! Typed results of the AI operations, their inputs, and fallback values.

use super::prompts::{JournalSummary, MoodSummary, TaskSummary};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use mentor_core::report::{ProgressInsights, WeeklyInsights};
use mentor_core::task::{NewTask, TaskPriority};
use serde::{Deserialize, Serialize};

/// Shown instead of a mentor reply when nothing usable came back.
pub const MENTOR_APOLOGY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

const MOOD_INSIGHT_FALLBACK: &str =
    "Thanks for sharing your mood. Every check-in helps track your wellbeing journey.";
const JOURNAL_FALLBACK: &str =
    "Thank you for sharing your thoughts. Your journal entries show growth and self-reflection.";
const MENTOR_FALLBACK: &str = "I understand how you're feeling. Let's work through this together. What would be most helpful for you right now?";
const DEFAULT_SUBTASKS: &[&str] = &[
    "Research the topic",
    "Create an outline",
    "Write the first draft",
    "Review and revise",
    "Finalize the task",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Greeting {
    pub greeting: String,
    pub progress_insight: String,
    pub quick_tip: String,
}

impl Greeting {
    pub fn fallback(user_name: &str) -> Self {
        Self {
            greeting: format!("Good morning, {user_name}! Ready to make today productive?"),
            progress_insight: "Keep up the great work on your tasks!".to_string(),
            quick_tip: "Start with your most important task to build momentum.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodInsight {
    pub observation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_action: Option<String>,
}

impl MoodInsight {
    pub fn fallback() -> Self {
        Self {
            observation: MOOD_INSIGHT_FALLBACK.to_string(),
            follow_up_action: None,
        }
    }
}

/// Recommended task order, as task ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOrder {
    pub sorted_tasks: Vec<String>,
}

impl TaskOrder {
    /// The input order unchanged.
    pub fn fallback(task_ids: &[String]) -> Self {
        Self {
            sorted_tasks: task_ids.to_vec(),
        }
    }

    /// Keeps known ids once each, in the proposed order, then appends the
    /// ids the proposal left out in input order.
    pub fn reconcile(proposed: Vec<String>, task_ids: &[String]) -> Self {
        let mut sorted: Vec<String> = Vec::with_capacity(task_ids.len());
        for id in proposed {
            if task_ids.contains(&id) && !sorted.contains(&id) {
                sorted.push(id);
            }
        }
        for id in task_ids {
            if !sorted.contains(id) {
                sorted.push(id.clone());
            }
        }
        Self {
            sorted_tasks: sorted,
        }
    }
}

/// Accepts `{"sortedTasks": [...]}` as well as a bare id array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum TaskOrderPayload {
    Object(TaskOrder),
    Ids(Vec<String>),
}

impl TaskOrderPayload {
    pub(crate) fn into_ids(self) -> Vec<String> {
        match self {
            Self::Object(order) => order.sorted_tasks,
            Self::Ids(ids) => ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBreakdown {
    pub subtasks: Vec<String>,
}

impl TaskBreakdown {
    pub fn fallback() -> Self {
        Self {
            subtasks: DEFAULT_SUBTASKS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Trims every subtask and drops blank ones; `None` when nothing remains.
    pub fn normalized(self) -> Option<Self> {
        let subtasks: Vec<String> = self
            .subtasks
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if subtasks.is_empty() {
            None
        } else {
            Some(Self { subtasks })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalFeedback {
    pub feedback: String,
}

impl JournalFeedback {
    pub fn fallback() -> Self {
        Self {
            feedback: JOURNAL_FALLBACK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorReply {
    pub response: String,
}

impl MentorReply {
    pub fn fallback() -> Self {
        Self {
            response: MENTOR_FALLBACK.to_string(),
        }
    }
}

/// A task extracted from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTask {
    pub title: String,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParsedTask {
    /// The raw text as title, medium priority.
    pub fn fallback(raw_text: &str) -> Self {
        Self {
            title: raw_text.to_string(),
            due_date: None,
            time: None,
            priority: TaskPriority::Medium,
            description: None,
        }
    }

    /// Builds a task; an unreadable date is dropped, an unreadable time
    /// leaves the due instant at midnight UTC.
    pub fn into_new_task(self) -> NewTask {
        let due = self
            .due_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            .and_then(|date| {
                let naive = match self
                    .time
                    .as_deref()
                    .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok())
                {
                    Some(time) => date.and_time(time),
                    None => date.and_hms_opt(0, 0, 0)?,
                };
                Some(Utc.from_utc_datetime(&naive))
            });

        let mut task = NewTask::new(self.title).with_priority(self.priority);
        if let Some(description) = self.description.filter(|d| !d.trim().is_empty()) {
            task = task.with_description(description);
        }
        if let Some(due) = due {
            task = task.with_due_date(due);
        }
        task
    }
}

pub fn progress_fallback() -> ProgressInsights {
    ProgressInsights {
        mood_trend: "Your mood has been stable recently.".to_string(),
        productivity_insight: "You've been making good progress on your tasks.".to_string(),
        journal_themes: "Your journal entries show thoughtful reflection.".to_string(),
        recommendations: vec![
            "Keep up the great work!".to_string(),
            "Consider setting daily goals.".to_string(),
        ],
    }
}

pub fn weekly_fallback() -> WeeklyInsights {
    WeeklyInsights {
        summary: "You had a productive week with good emotional balance.".to_string(),
        mood_analysis: "Your mood remained positive throughout the week.".to_string(),
        task_analysis: "You completed most of your planned tasks.".to_string(),
        journal_insights: "Your journal entries show growth and self-reflection.".to_string(),
        next_week_goals: vec![
            "Set specific daily goals".to_string(),
            "Maintain your positive momentum".to_string(),
        ],
    }
}

/// What the mentor knows about the student when replying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorContext {
    pub latest_mood: String,
    pub tasks: Vec<TaskSummary>,
    pub last_journal_entry: String,
    pub streak: u32,
}

/// One week of activity for the weekly report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyData {
    pub mood_entries: Vec<MoodSummary>,
    pub tasks: Vec<TaskSummary>,
    pub journal_entries: Vec<JournalSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reconcile_drops_unknown_and_appends_missing() {
        let order = TaskOrder::reconcile(ids(&["t3", "ghost", "t1", "t3"]), &ids(&["t1", "t2", "t3"]));
        assert_eq!(order.sorted_tasks, ids(&["t3", "t1", "t2"]));
    }

    #[test]
    fn test_task_order_accepts_bare_array() {
        let payload: TaskOrderPayload = serde_json::from_str(r#"["b","a"]"#).unwrap();
        assert_eq!(payload.into_ids(), ids(&["b", "a"]));
        let payload: TaskOrderPayload = serde_json::from_str(r#"{"sortedTasks":["a"]}"#).unwrap();
        assert_eq!(payload.into_ids(), ids(&["a"]));
    }

    #[test]
    fn test_breakdown_normalization() {
        let breakdown = TaskBreakdown {
            subtasks: ids(&["  Outline  ", "", "   "]),
        };
        assert_eq!(breakdown.normalized().unwrap().subtasks, ids(&["Outline"]));
        assert!(TaskBreakdown { subtasks: vec![] }.normalized().is_none());
        assert_eq!(TaskBreakdown::fallback().subtasks.len(), 5);
    }

    #[test]
    fn test_parsed_task_into_new_task() {
        let parsed: ParsedTask = serde_json::from_str(
            r#"{"title":"Study Physics","dueDate":"2025-07-31","time":"16:00","priority":"high"}"#,
        )
        .unwrap();
        let task = parsed.into_new_task();
        assert_eq!(task.title, "Study Physics");
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(
            task.due_date,
            Some(Utc.with_ymd_and_hms(2025, 7, 31, 16, 0, 0).unwrap())
        );

        let parsed: ParsedTask =
            serde_json::from_str(r#"{"title":"Essay","dueDate":"next week"}"#).unwrap();
        assert_eq!(parsed.priority, TaskPriority::Medium);
        assert_eq!(parsed.into_new_task().due_date, None);
    }

    #[test]
    fn test_greeting_fallback_uses_name() {
        assert_eq!(
            Greeting::fallback("Asha").greeting,
            "Good morning, Asha! Ready to make today productive?"
        );
    }
}
