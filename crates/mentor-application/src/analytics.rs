//! User analytics snapshot computed from the stored activity.

use chrono::{DateTime, Days, NaiveDate, Utc};
use mentor_core::journal::JournalEntry;
use mentor_core::mood::MoodEntry;
use mentor_core::report::UserAnalytics;
use mentor_core::task::{Task, TaskStatus};
use std::collections::BTreeSet;

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / f64::from(count) }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Most frequent label; ties go to the label seen first (moods are newest first).
fn dominant_mood(moods: &[MoodEntry]) -> Option<String> {
    let mut tally: Vec<(&str, u32)> = Vec::new();
    for entry in moods {
        match tally.iter_mut().find(|(label, _)| *label == entry.mood) {
            Some((_, n)) => *n += 1,
            None => tally.push((entry.mood.as_str(), 1)),
        }
    }
    let mut best: Option<(&str, u32)> = None;
    for (label, n) in tally {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((label, n));
        }
    }
    best.map(|(label, _)| label.to_string())
}

/// Consecutive check-in days ending `today`, or ending yesterday when there
/// is no check-in yet today.
pub fn check_in_streak(moods: &[MoodEntry], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = moods.iter().map(|m| m.date.date_naive()).collect();
    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.checked_sub_days(Days::new(1)) {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    streak
}

/// Aggregates a snapshot; `streak` comes from [`check_in_streak`] over the
/// full check-in history, not just the `moods` window.
pub fn compute_user_analytics(
    user_id: &str,
    tasks: &[Task],
    moods: &[MoodEntry],
    journals: &[JournalEntry],
    streak: u32,
    now: DateTime<Utc>,
) -> UserAnalytics {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    let in_progress = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();

    UserAnalytics {
        id: user_id.to_string(),
        user_id: user_id.to_string(),
        total_tasks: count(total),
        completed_tasks: count(completed),
        in_progress_tasks: count(in_progress),
        completion_rate: if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64
        },
        mood_entries: count(moods.len()),
        average_energy: mean(moods.iter().map(|m| m.energy)),
        average_stress: mean(moods.iter().map(|m| m.stress)),
        average_focus: mean(moods.iter().map(|m| m.focus)),
        dominant_mood: dominant_mood(moods),
        journal_entries: count(journals.len()),
        check_in_streak: streak,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mood(label: &str, day: u32, energy: f64) -> MoodEntry {
        MoodEntry {
            id: format!("m{day}"),
            mood: label.into(),
            energy,
            stress: 4.0,
            focus: 5.0,
            date: Utc.with_ymd_and_hms(2025, 3, day, 20, 0, 0).unwrap(),
            notes: None,
            one_liner: None,
            user_id: "u1".into(),
        }
    }

    fn task(status: TaskStatus) -> Task {
        Task {
            id: "t".into(),
            title: "t".into(),
            description: None,
            status,
            priority: Default::default(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            due_date: None,
            user_id: "u1".into(),
            task_type: None,
            subject: None,
            topic: None,
            estimated_time: None,
            completed_at: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_streak_counts_back_from_today_or_yesterday() {
        let moods = vec![mood("Happy", 10, 6.0), mood("Calm", 9, 6.0), mood("Tired", 7, 6.0)];
        assert_eq!(check_in_streak(&moods, day(10)), 2);
        assert_eq!(check_in_streak(&moods, day(11)), 2);
        assert_eq!(check_in_streak(&moods, day(12)), 0);
        assert_eq!(check_in_streak(&[], day(10)), 0);
    }

    #[test]
    fn test_snapshot_aggregates() {
        let tasks = vec![
            task(TaskStatus::Done),
            task(TaskStatus::InProgress),
            task(TaskStatus::Todo),
            task(TaskStatus::Done),
        ];
        let moods = vec![mood("Calm", 10, 8.0), mood("Happy", 9, 6.0), mood("Calm", 8, 4.0)];
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 21, 0, 0).unwrap();
        let streak = check_in_streak(&moods, now.date_naive());
        let analytics = compute_user_analytics("u1", &tasks, &moods, &[], streak, now);

        assert_eq!(analytics.id, "u1");
        assert_eq!(analytics.total_tasks, 4);
        assert_eq!(analytics.completed_tasks, 2);
        assert_eq!(analytics.in_progress_tasks, 1);
        assert_eq!(analytics.completion_rate, 0.5);
        assert_eq!(analytics.average_energy, 6.0);
        assert_eq!(analytics.dominant_mood.as_deref(), Some("Calm"));
        assert_eq!(analytics.check_in_streak, 3);
        assert_eq!(analytics.journal_entries, 0);
    }

    #[test]
    fn test_empty_activity() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 21, 0, 0).unwrap();
        let analytics = compute_user_analytics("u1", &[], &[], &[], 0, now);
        assert_eq!(analytics.completion_rate, 0.0);
        assert_eq!(analytics.average_focus, 0.0);
        assert_eq!(analytics.dominant_mood, None);
    }
}
