//! End-to-end session flow over real HTTP
//!
//! Drives the state machine through a complete conversation against a
//! mock service: connect, generate, clarify, revise, accept, export.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prefstore::{PrefStore, Preferences};
use schedclient::config::ServiceConfig;
use schedclient::{HttpApi, Phase, SessionMachine};

async fn machine_for(server: &MockServer, temp: &TempDir) -> Arc<SessionMachine> {
    let config = ServiceConfig {
        base_url: server.uri(),
        timeout_ms: 5_000,
    };
    let api = Arc::new(HttpApi::from_config(&config).unwrap());
    let store = Arc::new(PrefStore::open(temp.path().join("preferences.json")).unwrap());
    Arc::new(SessionMachine::new(api, store))
}

#[tokio::test]
async fn test_full_conversation_to_export() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    // Saved preferences from an earlier run load at startup
    let store = PrefStore::open(temp.path().join("preferences.json")).unwrap();
    let mut prefs = Preferences::default();
    prefs.task_preference = "deep work first".to_string();
    store.save(&prefs).unwrap();

    Mock::given(method("GET"))
        .and(path("/start_session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session_id": "s-1"})))
        .expect(1)
        .mount(&server)
        .await;

    // The generate response rotates the session id; every later call
    // must carry the rotated one.
    Mock::given(method("POST"))
        .and(path("/generate_schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s-2",
            "status": "questions",
            "questions": ["When do you want lunch?", "Any immovable meetings?"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/submit_answers"))
        .and(body_partial_json(json!({"session_id": "s-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "schedule": ["09:00, 2h, Deep work", "12:00, 1h, Lunch"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/revise_schedule"))
        .and(body_partial_json(json!({"session_id": "s-2", "feedback": "move lunch to 13:00"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "schedule": ["09:00, 2h, Deep work", "13:00, 1h, Lunch"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/download_schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"BEGIN:VCALENDAR".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let machine = machine_for(&server, &temp).await;

    // Connect: session established, saved preferences merged in
    let snap = machine.start().await.unwrap();
    assert_eq!(snap.phase, Phase::Ready);
    assert_eq!(snap.preferences.unwrap().task_preference, "deep work first");

    // Provide inputs and generate
    let cal = temp.path().join("cal.ics");
    std::fs::write(&cal, b"BEGIN:VCALENDAR\nEND:VCALENDAR\n").unwrap();
    machine.set_calendar_file(&cal);
    machine.set_tasks_text("finish the report\nreview two PRs");

    let snap = machine.generate().await.unwrap();
    assert_eq!(snap.phase, Phase::AwaitingClarification);
    assert_eq!(snap.questions.len(), 2);
    assert_eq!(snap.session_id.as_deref(), Some("s-2"), "rotated id wins");

    // Answer only the first question; partial sets are allowed
    machine.set_answer(0, "noon-ish").unwrap();
    let snap = machine.submit_answers().await.unwrap();
    assert_eq!(snap.phase, Phase::ScheduleReady);
    assert_eq!(snap.schedule.as_ref().unwrap().len(), 2);

    // One round of feedback replaces the schedule wholesale
    machine.set_feedback("move lunch to 13:00");
    let snap = machine.submit_feedback().await.unwrap();
    assert_eq!(snap.phase, Phase::ScheduleReady);
    assert_eq!(snap.schedule.as_ref().unwrap()[1].start_time, "13:00");
    assert!(snap.feedback.is_empty());

    // Accept and export
    machine.accept().unwrap();
    let dest = temp.path().join("schedule.ics");
    let written = machine.export(&dest).await.unwrap();
    assert_eq!(written, 15);
    assert_eq!(std::fs::read(&dest).unwrap(), b"BEGIN:VCALENDAR");
}

#[tokio::test]
async fn test_service_outage_mid_session_keeps_schedule() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/start_session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session_id": "s-1"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/generate_schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "schedule": ["09:00, 1h, Focus"]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/revise_schedule"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let machine = machine_for(&server, &temp).await;
    machine.start().await.unwrap();
    machine.set_preferences(Preferences::default()).unwrap();

    let cal = temp.path().join("cal.ics");
    std::fs::write(&cal, b"BEGIN:VCALENDAR").unwrap();
    machine.set_calendar_file(&cal);
    machine.set_tasks_text("one task");

    let snap = machine.generate().await.unwrap();
    assert_eq!(snap.phase, Phase::ScheduleReady);

    // The failed revision reports its error and changes nothing
    machine.set_feedback("tighter mornings");
    assert!(machine.submit_feedback().await.is_err());

    let snap = machine.snapshot();
    assert_eq!(snap.phase, Phase::ScheduleReady);
    assert_eq!(snap.schedule.unwrap()[0].description, "Focus");
    assert_eq!(snap.feedback, "tighter mornings");
}
