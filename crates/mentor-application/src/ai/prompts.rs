//! Prompt templates for every AI operation.
//!
//! Templates are rendered with minijinja. Structured inputs are serialized to
//! JSON in Rust and passed in as strings, so the templates only interpolate.

use chrono::{DateTime, Utc};
use mentor_core::journal::JournalEntry;
use mentor_core::mood::MoodEntry;
use mentor_core::task::Task;
use mentor_core::{MentorError, Result};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

const GREETING: &str = r#"You are the voice of the InsideMentor app. Based on the following user data, generate three distinct JSON fields: greeting, progressInsight, and quickTip. Be warm, encouraging, and concise.

User Data:
{
  "userName": "{{ user_name }}",
  "timeOfDay": "{{ time_of_day }}",
  "recentTasks": {{ tasks_json }},
  "recentMoodLogs": {{ moods_json }}
}

Expected AI Response (Output):
{
  "greeting": "personalized greeting message",
  "progressInsight": "brief insight about their progress",
  "quickTip": "bite-sized, actionable advice based on context"
}"#;

const MOOD_INSIGHT: &str = r#"You are a gentle and supportive AI mentor. A user just logged their mood. Based on their recent history, provide one short, non-judgmental observation (max 20 words). Notice a simple pattern (e.g., time of day, repetition) and offer a gentle reflection.

User Data:
{
  "currentMood": {{ current_json }},
  "recentHistory": {{ history_json }}
}

Return as JSON: {"observation": "string", "followUpAction": "optional suggested action"}"#;

const SORT_TASKS: &str = r#"You are InsideMentor, helping a student prioritize tasks based on their current energy and mood.

Available tasks: {{ tasks_json }}
Recent mood data: {{ moods_json }}

Analyze the user's recent mood and energy levels, then reorder the tasks to optimize productivity:
- If user has low energy: prioritize easy, quick wins first
- If user has high energy: prioritize challenging, important tasks
- Consider task complexity, importance, and estimated time

Return ONLY a JSON array of task IDs in the recommended order: {"sortedTasks": ["task_id_1", "task_id_2", ...]}"#;

const BREAK_DOWN: &str = r#"You are InsideMentor, helping a student break down a large task into manageable steps.

Task: "{{ title }}"

Break this task into 3-5 specific, actionable subtasks that:
- Are concrete and measurable
- Can be completed in 30-60 minutes each
- Follow a logical sequence
- Are specific to this particular task

Return as JSON: {"subtasks": ["subtask1", "subtask2", ...]}"#;

const JOURNAL_FEEDBACK: &str = r#"You are InsideMentor, providing thoughtful feedback on a student's journal entry.

Current journal entry: "{{ current }}"

Past entries (last 3): {{ past_json }}

Provide a thoughtful, empathetic reflection (3-4 sentences) that:
- Acknowledges their feelings and experiences
- Identifies patterns or growth across entries
- Offers gentle encouragement or insights
- Maintains a supportive, academic wellness focus

Return as JSON: {"feedback": "string"}"#;

const PROGRESS_REPORT: &str = r#"You are InsideMentor, analyzing a student's progress data. Generate insights and recommendations.

Data:
- Mood entries: {{ moods_json }}
- Tasks: {{ tasks_json }}
- Journal entries: {{ journals_json }}

Provide analysis in JSON format:
{
  "moodTrend": "brief mood pattern analysis",
  "productivityInsight": "task completion and productivity insights",
  "journalThemes": "recurring themes from journal entries",
  "recommendations": ["actionable recommendation 1", "actionable recommendation 2"]
}"#;

const WEEKLY_REPORT: &str = r#"You are InsideMentor, generating a weekly progress report. Analyze the following data and provide insights.

Weekly Data:
- Mood entries: {{ moods_json }}
- Tasks: {{ tasks_json }}
- Journal entries: {{ journals_json }}

Generate a comprehensive weekly report in JSON format:
{
  "summary": "one-paragraph weekly summary",
  "moodAnalysis": "detailed mood pattern analysis",
  "taskAnalysis": "productivity and task completion analysis",
  "journalInsights": "themes and growth patterns from journal entries",
  "nextWeekGoals": ["specific goal 1", "specific goal 2", "specific goal 3"]
}"#;

const MENTOR: &str = r#"You are InsideMentor, an emotionally intelligent AI guide for coaching students under pressure. Your role is to provide empathetic, judgment-free, and personalized guidance that blends emotional and academic support.

Current Context:
User Message: "{{ message }}"
Mood Trends: {{ latest_mood }}
Pending Tasks: {{ tasks_json }}
Journal Themes: "{{ last_journal }}"
{%- if streak %}
Check-in Streak: {{ streak }} days
{%- endif %}

Your Responsibilities:
{%- for item in responsibilities %}
- {{ item }}
{%- endfor %}

Return as JSON: {"response": "string"}"#;

const PARSE_TASK: &str = r#"You are a task parser. Extract the Title, Due Date, Time, and Priority from the following text. The current date is {{ today }}. Respond only with a JSON object.

Text: "{{ text }}"

Return JSON with these fields:
- title: The task title
- dueDate: Date in YYYY-MM-DD format (optional)
- time: Time in HH:MM format (optional)
- priority: "low", "medium", or "high"
- description: Any additional details (optional)

Example: {"title": "Study Physics", "dueDate": "2025-07-31", "time": "16:00", "priority": "high"}"#;

const MENTOR_RESPONSIBILITIES: &[&str] = &[
    "Understand the underlying emotion and immediate concern",
    "Respond only to what the student seems to need right now",
    "Suggest small, achievable next steps (emotionally or academically)",
    "Never pressure. Always empower gently",
];

const TEMPLATES: &[(&str, &str)] = &[
    ("greeting", GREETING),
    ("mood_insight", MOOD_INSIGHT),
    ("sort_tasks", SORT_TASKS),
    ("break_down_task", BREAK_DOWN),
    ("journal_feedback", JOURNAL_FEEDBACK),
    ("progress_report", PROGRESS_REPORT),
    ("weekly_report", WEEKLY_REPORT),
    ("mentor", MENTOR),
    ("parse_task", PARSE_TASK),
];

/// Task fields shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub status: String,
    pub priority: String,
}

impl TaskSummary {
    pub fn new(title: impl Into<String>, status: impl Into<String>, priority: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            status: status.into(),
            priority: priority.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self::new(&task.title, task.status.as_str(), task.priority.as_str()).with_id(&task.id)
    }
}

/// Mood fields shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSummary {
    pub mood: String,
    pub energy: f64,
    pub date: DateTime<Utc>,
}

impl From<&MoodEntry> for MoodSummary {
    fn from(entry: &MoodEntry) -> Self {
        Self {
            mood: entry.mood.clone(),
            energy: entry.energy,
            date: entry.date,
        }
    }
}

/// Journal fields shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalSummary {
    pub content: String,
    pub date: DateTime<Utc>,
}

impl From<&JournalEntry> for JournalSummary {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            content: entry.content.clone(),
            date: entry.date,
        }
    }
}

/// `Morning` before noon, `Afternoon` before 17:00, `Evening` after.
pub fn time_of_day(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Morning",
        12..=16 => "Afternoon",
        _ => "Evening",
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn first<T>(items: &[T], n: usize) -> &[T] {
    &items[..items.len().min(n)]
}

/// Renders the prompt for each AI operation.
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PromptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptLibrary")
            .field("templates", &TEMPLATES.len())
            .finish()
    }
}

impl PromptLibrary {
    pub fn new() -> Self {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            if let Err(err) = env.add_template(name, source) {
                tracing::error!("[AiGateway] Prompt template '{}' failed to load: {}", name, err);
            }
        }
        Self { env }
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|err| MentorError::Template(format!("{name}: {err}")))
    }

    pub fn greeting(
        &self,
        user_name: &str,
        time_of_day: &str,
        tasks: &[TaskSummary],
        moods: &[MoodSummary],
    ) -> Result<String> {
        self.render(
            "greeting",
            context! {
                user_name,
                time_of_day,
                tasks_json => to_json(tasks)?,
                moods_json => to_json(moods)?,
            },
        )
    }

    /// Only the three most recent history entries are included.
    pub fn mood_insight(
        &self,
        current_mood: &str,
        logged_at: DateTime<Utc>,
        history: &[MoodSummary],
    ) -> Result<String> {
        let current = serde_json::json!({ "mood": current_mood, "timestamp": logged_at });
        self.render(
            "mood_insight",
            context! {
                current_json => to_json(&current)?,
                history_json => to_json(first(history, 3))?,
            },
        )
    }

    pub fn sort_tasks(&self, tasks: &[TaskSummary], moods: &[MoodSummary]) -> Result<String> {
        self.render(
            "sort_tasks",
            context! {
                tasks_json => to_json(tasks)?,
                moods_json => to_json(moods)?,
            },
        )
    }

    pub fn break_down_task(&self, title: &str) -> Result<String> {
        self.render("break_down_task", context! { title })
    }

    pub fn journal_feedback(&self, current: &str, past: &[String]) -> Result<String> {
        self.render(
            "journal_feedback",
            context! {
                current,
                past_json => to_json(first(past, 3))?,
            },
        )
    }

    /// Includes at most 7 moods, 10 tasks and 5 journal entries.
    pub fn progress_report(
        &self,
        moods: &[MoodSummary],
        tasks: &[TaskSummary],
        journals: &[JournalSummary],
    ) -> Result<String> {
        self.render(
            "progress_report",
            context! {
                moods_json => to_json(first(moods, 7))?,
                tasks_json => to_json(first(tasks, 10))?,
                journals_json => to_json(first(journals, 5))?,
            },
        )
    }

    pub fn weekly_report(
        &self,
        moods: &[MoodSummary],
        tasks: &[TaskSummary],
        journals: &[JournalSummary],
    ) -> Result<String> {
        self.render(
            "weekly_report",
            context! {
                moods_json => to_json(moods)?,
                tasks_json => to_json(tasks)?,
                journals_json => to_json(journals)?,
            },
        )
    }

    pub fn mentor(
        &self,
        message: &str,
        latest_mood: &str,
        tasks: &[TaskSummary],
        last_journal: &str,
        streak: u32,
    ) -> Result<String> {
        self.render(
            "mentor",
            context! {
                message,
                latest_mood,
                last_journal,
                streak,
                tasks_json => to_json(tasks)?,
                responsibilities => MENTOR_RESPONSIBILITIES,
            },
        )
    }

    pub fn parse_task(&self, text: &str, today: &str) -> Result<String> {
        self.render("parse_task", context! { text, today })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mood(label: &str, day: u32) -> MoodSummary {
        MoodSummary {
            mood: label.into(),
            energy: 6.0,
            date: Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(time_of_day(0), "Morning");
        assert_eq!(time_of_day(11), "Morning");
        assert_eq!(time_of_day(12), "Afternoon");
        assert_eq!(time_of_day(16), "Afternoon");
        assert_eq!(time_of_day(17), "Evening");
    }

    #[test]
    fn test_greeting_embeds_serialized_context() {
        let prompts = PromptLibrary::new();
        let tasks = vec![TaskSummary::new("Read Ch.3", "todo", "high")];
        let prompt = prompts
            .greeting("Asha", "Morning", &tasks, &[mood("Happy", 10)])
            .unwrap();
        assert!(prompt.contains(r#""userName": "Asha""#));
        assert!(prompt.contains(r#""recentTasks": [{"title":"Read Ch.3","status":"todo","priority":"high"}]"#));
        assert!(prompt.contains(r#""mood":"Happy""#));
    }

    #[test]
    fn test_history_and_report_inputs_are_truncated() {
        let prompts = PromptLibrary::new();
        let history: Vec<MoodSummary> = (1..=5).map(|d| mood(&format!("m{d}"), d)).collect();
        let prompt = prompts
            .mood_insight("Calm", Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(), &history)
            .unwrap();
        assert!(prompt.contains("m3"));
        assert!(!prompt.contains("m4"));

        let past: Vec<String> = ["a1", "a2", "a3", "a4"].iter().map(|s| s.to_string()).collect();
        let prompt = prompts.journal_feedback("today", &past).unwrap();
        assert!(prompt.contains(r#"Past entries (last 3): ["a1","a2","a3"]"#));
    }

    #[test]
    fn test_mentor_lists_responsibilities() {
        let prompts = PromptLibrary::new();
        let prompt = prompts
            .mentor("I'm stressed", "Anxious", &[], "No recent journal entries", 0)
            .unwrap();
        assert!(prompt.contains(r#"User Message: "I'm stressed""#));
        assert!(prompt.contains("- Never pressure. Always empower gently"));
        assert!(!prompt.contains("Check-in Streak"));

        let prompt = prompts.mentor("hi", "Happy", &[], "", 4).unwrap();
        assert!(prompt.contains("Check-in Streak: 4 days"));
    }

    #[test]
    fn test_every_template_renders() {
        let prompts = PromptLibrary::new();
        assert!(prompts.sort_tasks(&[], &[]).is_ok());
        assert!(prompts.break_down_task("Essay").unwrap().contains(r#"Task: "Essay""#));
        assert!(prompts.progress_report(&[], &[], &[]).is_ok());
        assert!(prompts.weekly_report(&[], &[], &[]).is_ok());
        assert!(
            prompts
                .parse_task("physics tomorrow", "2025-03-10")
                .unwrap()
                .contains("The current date is 2025-03-10.")
        );
    }
}
