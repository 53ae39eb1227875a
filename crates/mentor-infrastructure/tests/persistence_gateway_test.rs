use chrono::{DateTime, Duration, Utc};
use mentor_core::chat::{ChatRole, ChatSessionUpdate, NewChatMessage, NewChatSession};
use mentor_core::journal::NewJournalEntry;
use mentor_core::mood::NewMoodEntry;
use mentor_core::store::{Collection, DocumentStore, Fields, StoreErrorKind};
use mentor_core::task::{NewTask, TaskPriority, TaskStatus, TaskUpdate};
use mentor_core::user::{UserProfile, UserProfileUpdate};
use mentor_infrastructure::{InMemoryDocumentStore, PersistenceGateway, StaticIdentity, StoreOp};
use serde_json::json;
use std::sync::Arc;

fn mirror_gateway(user: Option<&str>) -> PersistenceGateway {
    let identity = match user {
        Some(uid) => StaticIdentity::signed_in(uid),
        None => StaticIdentity::anonymous(),
    };
    PersistenceGateway::new(None, Arc::new(identity))
}

fn remote_gateway(store: Arc<InMemoryDocumentStore>, user: &str) -> PersistenceGateway {
    PersistenceGateway::new(Some(store), Arc::new(StaticIdentity::signed_in(user)))
}

fn at(days_ago: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-10T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
        - Duration::days(days_ago)
}

fn mood_fields(user: &str, mood: &str, date: serde_json::Value) -> Fields {
    match json!({"userId": user, "mood": mood, "energy": 5, "stress": 5, "focus": 5, "date": date}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_add_task_then_list_in_mirror_mode() {
    let gateway = mirror_gateway(Some("u1"));
    assert!(!gateway.is_remote_available());

    let created = gateway
        .add_task(
            NewTask::new("Read Ch.3")
                .with_priority(TaskPriority::Medium)
                .with_status(TaskStatus::Todo),
        )
        .await
        .unwrap();

    let tasks = gateway.get_tasks("u1").await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Read Ch.3");
    assert_eq!(tasks[0].priority, TaskPriority::Medium);
    assert_eq!(tasks[0].status, TaskStatus::Todo);
    assert_eq!(tasks[0].user_id, "u1");
    assert!(!tasks[0].id.is_empty());
    assert_eq!(tasks[0].id, created.id);
    assert!(tasks[0].description.is_none());
}

#[tokio::test]
async fn test_sequential_session_updates_last_write_wins() {
    let gateway = mirror_gateway(Some("u1"));
    let session = gateway
        .add_chat_session(NewChatSession::active("General Chat"))
        .await
        .unwrap();

    gateway
        .update_chat_session(&session.id, &ChatSessionUpdate::active(true))
        .await
        .unwrap();
    gateway
        .update_chat_session(&session.id, &ChatSessionUpdate::active(false))
        .await
        .unwrap();

    let sessions = gateway.get_chat_sessions("u1").await;
    assert_eq!(sessions.len(), 1);
    assert!(!sessions[0].is_active);
}

#[tokio::test]
async fn test_sequential_session_updates_on_remote_store() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let gateway = remote_gateway(store.clone(), "u1");
    let session = gateway
        .add_chat_session(NewChatSession::active("General Chat"))
        .await
        .unwrap();

    gateway
        .update_chat_session(&session.id, &ChatSessionUpdate::active(true))
        .await
        .unwrap();
    gateway
        .update_chat_session(&session.id, &ChatSessionUpdate::active(false))
        .await
        .unwrap();

    let stored = store.document(Collection::ChatSessions, &session.id).unwrap();
    assert_eq!(stored.fields["isActive"], json!(false));
}

#[tokio::test]
async fn test_writes_without_identity_are_rejected() {
    let gateway = mirror_gateway(None);

    let err = gateway.add_task(NewTask::new("Read")).await.unwrap_err();
    assert!(err.is_unauthenticated());
    let err = gateway
        .add_mood_entry(NewMoodEntry::new("Calm", 5.0, 3.0, 6.0))
        .await
        .unwrap_err();
    assert!(err.is_unauthenticated());
    let err = gateway
        .add_journal_entry(NewJournalEntry::new("Day 1", "Started revising"))
        .await
        .unwrap_err();
    assert!(err.is_unauthenticated());
}

#[tokio::test]
async fn test_chat_message_without_identity_goes_to_mirror() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let gateway = PersistenceGateway::new(Some(store.clone()), Arc::new(StaticIdentity::anonymous()));

    let message = gateway.add_chat_message(NewChatMessage::user("hello")).await.unwrap();

    assert!(!message.id.is_empty());
    assert_eq!(message.user_id, "");
    assert_eq!(message.role, ChatRole::User);
    assert_eq!(store.calls(StoreOp::Add), 0);
    assert_eq!(gateway.mirror().count(Collection::ChatMessages, ""), 1);
}

#[tokio::test]
async fn test_permission_denied_chat_message_falls_back_to_mirror() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.fail_next(StoreOp::Add, StoreErrorKind::PermissionDenied, "Missing or insufficient permissions.");
    let gateway = remote_gateway(store.clone(), "u1");

    let message = gateway.add_chat_message(NewChatMessage::ai("hi there")).await.unwrap();

    assert_eq!(message.user_id, "u1");
    assert!(store.is_empty(Collection::ChatMessages));
    assert_eq!(gateway.mirror().count(Collection::ChatMessages, "u1"), 1);
}

#[tokio::test]
async fn test_permission_denied_task_propagates() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.fail_next(StoreOp::Add, StoreErrorKind::PermissionDenied, "denied");
    let gateway = remote_gateway(store.clone(), "u1");

    let err = gateway.add_task(NewTask::new("Read")).await.unwrap_err();
    assert!(err.as_store_error().is_some_and(|e| e.is_permission_denied()));
    assert_eq!(gateway.mirror().count(Collection::Tasks, "u1"), 0);
}

#[tokio::test]
async fn test_missing_index_fallback_matches_ordered_result() {
    let indexed = Arc::new(InMemoryDocumentStore::new());
    let unindexed = Arc::new(InMemoryDocumentStore::new().without_composite_index());

    // Mixed wire encodings, inserted out of order, with a tie on day 2.
    let rows = [
        ("m1", mood_fields("u1", "Calm", json!(at(5).to_rfc3339()))),
        ("m2", mood_fields("u1", "Happy", json!({"seconds": at(1).timestamp(), "nanoseconds": 0}))),
        ("m3", mood_fields("u1", "Tired", json!(at(2).timestamp_millis()))),
        ("m4", mood_fields("u2", "Sad", json!(at(0).to_rfc3339()))),
        ("m5", mood_fields("u1", "Focused", json!(at(2).to_rfc3339()))),
        ("m6", mood_fields("u1", "Stressed", json!(at(9).to_rfc3339()))),
    ];
    for (id, fields) in rows {
        indexed.seed(Collection::MoodEntries, id, fields.clone());
        unindexed.seed(Collection::MoodEntries, id, fields);
    }

    let from_fallback = remote_gateway(unindexed.clone(), "u1")
        .get_mood_entries("u1", Some(3))
        .await;
    let dates: Vec<_> = from_fallback.iter().map(|m| m.date).collect();
    assert_eq!(dates, vec![at(1), at(2), at(2)]);
    // Ties keep retrieval order.
    let ids: Vec<_> = from_fallback.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m2", "m3", "m5"]);
    assert_eq!(unindexed.calls(StoreOp::Query), 2);

    let full_fallback = remote_gateway(unindexed, "u1").get_mood_entries("u1", Some(10)).await;
    let full_ordered = remote_gateway(indexed, "u1").get_mood_entries("u1", Some(10)).await;
    let fallback_dates: Vec<_> = full_fallback.iter().map(|m| m.date).collect();
    let ordered_dates: Vec<_> = full_ordered.iter().map(|m| m.date).collect();
    assert_eq!(fallback_dates, ordered_dates);
    assert_eq!(fallback_dates.len(), 5);
}

#[tokio::test]
async fn test_list_failure_reads_as_empty() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.seed(Collection::MoodEntries, "m1", mood_fields("u1", "Calm", json!(at(1).to_rfc3339())));
    store.fail_next(StoreOp::Query, StoreErrorKind::Unavailable, "offline");
    let gateway = remote_gateway(store, "u1");

    assert!(gateway.get_mood_entries("u1", None).await.is_empty());
    assert_eq!(gateway.get_mood_entries("u1", None).await.len(), 1);
}

#[tokio::test]
async fn test_remote_timestamps_are_normalized() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.seed(
        Collection::Tasks,
        "t1",
        match json!({"userId": "u1", "title": "Lab report", "status": "in-progress", "priority": "high",
                     "createdAt": {"_seconds": at(3).timestamp(), "_nanoseconds": 0},
                     "dueDate": "not a date"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        },
    );
    let gateway = remote_gateway(store, "u1");

    let tasks = gateway.get_tasks("u1").await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].created_at, at(3));
    assert_eq!(tasks[0].status, TaskStatus::InProgress);
    assert!(tasks[0].due_date.is_none());
}

#[tokio::test]
async fn test_null_fields_are_stripped_before_writes() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let gateway = remote_gateway(store.clone(), "u1");

    let entry = gateway
        .add_journal_entry(NewJournalEntry::new("Day 1", ""))
        .await
        .unwrap();

    let stored = store.document(Collection::JournalEntries, &entry.id).unwrap();
    assert_eq!(stored.fields["content"], json!(""));
    assert!(!stored.fields.contains_key("aiFeedback"));
    assert!(!stored.fields.contains_key("category"));
    assert!(stored.fields.values().all(|v| !v.is_null()));
}

#[tokio::test]
async fn test_task_board_moves() {
    let gateway = mirror_gateway(Some("u1"));
    let task = gateway.add_task(NewTask::new("Revise optics")).await.unwrap();

    gateway.move_task(&task.id, TaskStatus::InProgress).await.unwrap();
    gateway.complete_task(&task.id).await.unwrap();
    let done = gateway.get_tasks("u1").await.remove(0);
    assert_eq!(done.status, TaskStatus::Done);
    assert!(done.completed_at.is_some());

    // done can be reopened by an explicit update
    gateway
        .update_task(&task.id, &TaskUpdate::status(TaskStatus::Todo))
        .await
        .unwrap();
    assert_eq!(gateway.get_tasks("u1").await[0].status, TaskStatus::Todo);

    gateway.delete_task(&task.id).await.unwrap();
    assert!(gateway.get_tasks("u1").await.is_empty());
    assert!(gateway.delete_task(&task.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_reopening_task_clears_completion_time() {
    let gateway = mirror_gateway(Some("u1"));
    let task = gateway.add_task(NewTask::new("Past paper")).await.unwrap();
    gateway.complete_task(&task.id).await.unwrap();
    assert!(gateway.get_tasks("u1").await[0].completed_at.is_some());

    gateway.move_task(&task.id, TaskStatus::InProgress).await.unwrap();
    let reopened = gateway.get_tasks("u1").await.remove(0);
    assert_eq!(reopened.status, TaskStatus::InProgress);
    assert!(reopened.completed_at.is_none());

    let store = Arc::new(InMemoryDocumentStore::new());
    let gateway = remote_gateway(store.clone(), "u1");
    let task = gateway.add_task(NewTask::new("Past paper")).await.unwrap();
    gateway.complete_task(&task.id).await.unwrap();
    assert!(store.document(Collection::Tasks, &task.id).unwrap().get("completedAt").is_some());

    gateway.move_task(&task.id, TaskStatus::Todo).await.unwrap();
    assert!(store.document(Collection::Tasks, &task.id).unwrap().get("completedAt").is_none());
    let reopened = gateway.get_tasks("u1").await.remove(0);
    assert_eq!(reopened.status, TaskStatus::Todo);
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn test_mood_entries_since_reads_past_default_limit() {
    let gateway = mirror_gateway(Some("u1"));
    for day in 0..12 {
        gateway
            .add_mood_entry(NewMoodEntry::new("Calm", 5.0, 5.0, 5.0).with_date(at(day)))
            .await
            .unwrap();
    }
    assert_eq!(gateway.get_mood_entries("u1", None).await.len(), 7);

    let recent = gateway.get_mood_entries_since("u1", at(9)).await;
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0].date, at(0));
    assert_eq!(recent[9].date, at(9));
}

#[tokio::test]
async fn test_mood_scores_are_clamped_and_limited() {
    let gateway = mirror_gateway(Some("u1"));
    for day in 0..9 {
        gateway
            .add_mood_entry(NewMoodEntry::new("Calm", 5.0, 5.0, 5.0).with_date(at(day)))
            .await
            .unwrap();
    }
    let entry = gateway
        .add_mood_entry(NewMoodEntry::new("Wired", 14.0, -1.0, f64::NAN).with_date(at(-1)))
        .await
        .unwrap();
    assert_eq!((entry.energy, entry.stress, entry.focus), (10.0, 0.0, 0.0));

    let entries = gateway.get_mood_entries("u1", None).await;
    assert_eq!(entries.len(), 7);
    assert_eq!(entries[0].mood, "Wired");
    assert!(entries.windows(2).all(|w| w[0].date >= w[1].date));
}

#[tokio::test]
async fn test_chat_messages_are_oldest_first_and_clearable() {
    let gateway = mirror_gateway(Some("u1"));
    gateway
        .add_chat_message(NewChatMessage::user("first").at(at(1)))
        .await
        .unwrap();
    gateway
        .add_chat_message(NewChatMessage::ai("second").at(at(0)))
        .await
        .unwrap();

    let contents: Vec<_> = gateway
        .get_chat_messages("u1")
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["first", "second"]);

    assert_eq!(gateway.clear_chat_messages("u1").await.unwrap(), 2);
    assert!(gateway.get_chat_messages("u1").await.is_empty());
}

#[tokio::test]
async fn test_clear_chat_messages_on_remote_store() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let gateway = remote_gateway(store.clone(), "u1");
    gateway.add_chat_message(NewChatMessage::user("a")).await.unwrap();
    gateway.add_chat_message(NewChatMessage::ai("b")).await.unwrap();

    assert_eq!(gateway.clear_chat_messages("u1").await.unwrap(), 2);
    assert!(store.is_empty(Collection::ChatMessages));
}

#[tokio::test]
async fn test_user_profile_round_trip() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let gateway = remote_gateway(store.clone(), "u1");

    let mut profile = UserProfile::new("u1", "Asha", "asha@example.com");
    profile.preferred_subjects = vec!["Physics".into()];
    gateway.create_user(&profile).await.unwrap();

    gateway
        .update_user(
            "u1",
            &UserProfileUpdate {
                institute: Some("City College".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let loaded = gateway.get_user("u1").await.unwrap();
    assert_eq!(loaded.name, "Asha");
    assert_eq!(loaded.institute.as_deref(), Some("City College"));
    assert!(loaded.created_at.is_some());
    assert!(gateway.get_user("nobody").await.is_none());
    assert!(store.is_configured());
}
