//! SessionMachine - the session interaction state machine
//!
//! Owns the current phase of the conversation with the scheduling
//! service and applies every server response as an explicit phase
//! transition. The shell never mutates state directly: it dispatches
//! intents and renders the immutable [`Snapshot`] each intent returns.
//!
//! Exactly one network operation may be in flight per machine; a second
//! intent issued meanwhile is rejected with [`SessionError::Busy`] and
//! never reaches the service. Every failed operation returns the machine
//! to the state it was in before the attempt and leaves held state
//! (preferences, inputs, prior schedule, session id) intact.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use prefstore::{PrefStore, Preferences};

use super::context::SessionContext;
use super::error::SessionError;
use crate::api::{AnswerSet, GenerateRequest, SchedulerApi, ServiceReply};
use crate::domain::{ScheduleEntry, TaskInput, parse_lines};

/// Where the conversation currently stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No session yet
    #[default]
    Idle,
    /// Session-start exchange in flight
    AwaitingSession,
    /// Session held, inputs editable, nothing generated yet
    Ready,
    /// Generation request in flight
    Generating,
    /// The service needs answers before it can produce a schedule
    AwaitingClarification,
    /// A schedule is held and open for feedback, acceptance or export
    ScheduleReady,
    /// Revision request in flight
    Revising,
    /// Schedule approved by the user; terminal except for export
    Accepted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingSession => "awaiting-session",
            Phase::Ready => "ready",
            Phase::Generating => "generating",
            Phase::AwaitingClarification => "awaiting-clarification",
            Phase::ScheduleReady => "schedule-ready",
            Phase::Revising => "revising",
            Phase::Accepted => "accepted",
        };
        write!(f, "{}", name)
    }
}

/// Immutable view of machine state handed to the shell
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub phase: Phase,
    pub session_id: Option<String>,
    pub preferences: Option<Preferences>,
    pub calendar_path: Option<PathBuf>,
    pub tasks_text: String,
    pub questions: Vec<String>,
    pub answers: AnswerSet,
    pub schedule: Option<Vec<ScheduleEntry>>,
    pub feedback: String,
}

#[derive(Debug, Default)]
struct MachineState {
    phase: Phase,
    preferences: Option<Preferences>,
    input: TaskInput,
    questions: Vec<String>,
    answers: AnswerSet,
    schedule: Option<Vec<ScheduleEntry>>,
    feedback: String,
}

/// The session interaction state machine
pub struct SessionMachine {
    api: Arc<dyn SchedulerApi>,
    session: SessionContext,
    store: Arc<PrefStore>,
    state: Mutex<MachineState>,
    in_flight: AtomicBool,
}

impl SessionMachine {
    pub fn new(api: Arc<dyn SchedulerApi>, store: Arc<PrefStore>) -> Self {
        Self {
            session: SessionContext::new(api.clone()),
            api,
            store,
            state: Mutex::new(MachineState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Current state as an immutable snapshot
    pub fn snapshot(&self) -> Snapshot {
        let s = self.state.lock().unwrap();
        Snapshot {
            phase: s.phase,
            session_id: self.session.current(),
            preferences: s.preferences.clone(),
            calendar_path: s.input.calendar_path.clone(),
            tasks_text: s.input.tasks_text.clone(),
            questions: s.questions.clone(),
            answers: s.answers.clone(),
            schedule: s.schedule.clone(),
            feedback: s.feedback.clone(),
        }
    }

    // === Local intents (no network) ===

    /// Save preferences wholesale and install them for later requests
    pub fn set_preferences(&self, prefs: Preferences) -> Result<Snapshot, SessionError> {
        debug!("set_preferences: called");
        self.store
            .save(&prefs)
            .map_err(|e| SessionError::Store(e.to_string()))?;
        self.state.lock().unwrap().preferences = Some(prefs);
        Ok(self.snapshot())
    }

    /// Select the calendar file to schedule around
    pub fn set_calendar_file(&self, path: impl Into<PathBuf>) -> Snapshot {
        let path = path.into();
        debug!(path = %path.display(), "set_calendar_file: called");
        self.state.lock().unwrap().input.set_calendar(path);
        self.snapshot()
    }

    /// Replace the free-text task list
    pub fn set_tasks_text(&self, text: impl Into<String>) -> Snapshot {
        self.state.lock().unwrap().input.tasks_text = text.into();
        self.snapshot()
    }

    /// Record the answer for one clarification question
    pub fn set_answer(&self, index: usize, text: impl Into<String>) -> Result<Snapshot, SessionError> {
        let mut s = self.state.lock().unwrap();
        if index >= s.questions.len() {
            return Err(SessionError::NoSuchQuestion(index));
        }
        s.answers.insert(index, text.into());
        drop(s);
        Ok(self.snapshot())
    }

    /// Replace the pending revision feedback text
    pub fn set_feedback(&self, text: impl Into<String>) -> Snapshot {
        self.state.lock().unwrap().feedback = text.into();
        self.snapshot()
    }

    /// Mark the held schedule as user-approved (terminal, local-only)
    pub fn accept(&self) -> Result<Snapshot, SessionError> {
        debug!("accept: called");
        let mut s = self.state.lock().unwrap();
        if s.phase != Phase::ScheduleReady {
            return Err(SessionError::InvalidIntent(s.phase));
        }
        s.phase = Phase::Accepted;
        drop(s);
        Ok(self.snapshot())
    }

    // === Network intents ===

    /// Establish the session and load saved preferences
    ///
    /// The two run concurrently; a preference-load failure is non-fatal
    /// (the user simply configures from defaults), a session failure
    /// returns the machine to Idle for a user-triggered retry.
    pub async fn start(&self) -> Result<Snapshot, SessionError> {
        debug!("start: called");
        self.begin()?;
        let result = self.start_inner().await;
        self.end();
        result.map(|_| self.snapshot())
    }

    /// Submit calendar, tasks and preferences for generation
    pub async fn generate(&self) -> Result<Snapshot, SessionError> {
        debug!("generate: called");
        self.begin()?;
        let result = self.generate_inner().await;
        self.end();
        result.map(|_| self.snapshot())
    }

    /// Submit the answer set (partial answers are allowed)
    pub async fn submit_answers(&self) -> Result<Snapshot, SessionError> {
        debug!("submit_answers: called");
        self.begin()?;
        let result = self.submit_answers_inner().await;
        self.end();
        result.map(|_| self.snapshot())
    }

    /// Submit the pending feedback for revision
    pub async fn submit_feedback(&self) -> Result<Snapshot, SessionError> {
        debug!("submit_feedback: called");
        self.begin()?;
        let result = self.submit_feedback_inner().await;
        self.end();
        result.map(|_| self.snapshot())
    }

    /// Download the canonical calendar file for this session to `dest`
    ///
    /// A side-effecting query: machine state is never changed, and the
    /// call may be repeated any number of times from ScheduleReady or
    /// Accepted.
    pub async fn export(&self, dest: &Path) -> Result<u64, SessionError> {
        debug!(dest = %dest.display(), "export: called");
        self.begin()?;
        let result = self.export_inner(dest).await;
        self.end();
        result
    }

    // === Guard ===

    fn begin(&self) -> Result<(), SessionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("begin: intent rejected, operation already in flight");
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    fn end(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    // === Transition bodies ===

    async fn start_inner(&self) -> Result<(), SessionError> {
        {
            let mut s = self.state.lock().unwrap();
            if s.phase != Phase::Idle {
                return Err(SessionError::InvalidIntent(s.phase));
            }
            s.phase = Phase::AwaitingSession;
        }

        // Session acquisition and preference loading are independent and
        // need not serialize.
        let store = self.store.clone();
        let prefs_task = tokio::task::spawn_blocking(move || store.load());
        let (session, prefs) = tokio::join!(self.session.acquire(), prefs_task);

        let prefs = match prefs {
            Ok(Ok(p)) => p,
            Ok(Err(e)) => {
                warn!(error = %e, "start: preference load failed, continuing without");
                None
            }
            Err(e) => {
                warn!(error = %e, "start: preference load task failed, continuing without");
                None
            }
        };

        let mut s = self.state.lock().unwrap();
        if let Some(p) = prefs {
            s.preferences = Some(p);
        }
        match session {
            Ok(id) => {
                debug!(session_id = %id, "start: ready");
                s.phase = Phase::Ready;
                Ok(())
            }
            Err(e) => {
                s.phase = Phase::Idle;
                Err(e)
            }
        }
    }

    async fn generate_inner(&self) -> Result<(), SessionError> {
        let (input, preferences) = {
            let mut s = self.state.lock().unwrap();
            if s.phase != Phase::Ready {
                return Err(SessionError::InvalidIntent(s.phase));
            }
            let Some(prefs) = s.preferences.clone() else {
                return Err(SessionError::MissingInput("preferences"));
            };
            if s.input.calendar_path.is_none() {
                return Err(SessionError::MissingInput("calendar file"));
            }
            if s.input.tasks_text.trim().is_empty() {
                return Err(SessionError::MissingInput("task text"));
            }
            s.phase = Phase::Generating;
            (s.input.clone(), prefs)
        };

        let outcome = self.run_generate(&input, preferences).await;

        let mut s = self.state.lock().unwrap();
        match outcome.and_then(|reply| Self::install_reply(&mut s, reply)) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Inputs and preferences are untouched; only the phase
                // rolls back.
                s.phase = Phase::Ready;
                Err(e)
            }
        }
    }

    async fn run_generate(&self, input: &TaskInput, preferences: Preferences) -> Result<ServiceReply, SessionError> {
        // The encode step precedes the request; if it fails nothing is
        // sent.
        let ics_file = input.encode_calendar().await.map_err(SessionError::Encode)?;
        let session_id = self.session.current().ok_or(SessionError::NoSession)?;

        let request = GenerateRequest {
            ics_file,
            tasks_text: input.tasks_text.clone(),
            target_day: Some(preferences.target_day.clone()),
            preferences,
        };

        let reply = self
            .api
            .generate(&session_id, &request)
            .await
            .map_err(SessionError::Generation)?;

        if let Some(id) = reply.session_id {
            self.session.rotate(id);
        }
        Ok(reply.reply)
    }

    async fn submit_answers_inner(&self) -> Result<(), SessionError> {
        let answers = {
            let s = self.state.lock().unwrap();
            if s.phase != Phase::AwaitingClarification {
                return Err(SessionError::InvalidIntent(s.phase));
            }
            s.answers.clone()
        };

        let session_id = self.session.current().ok_or(SessionError::NoSession)?;
        let outcome = self
            .api
            .submit_answers(&session_id, &answers)
            .await
            .map_err(SessionError::AnswerSubmission);

        // On any failure the machine simply stays in AwaitingClarification
        // with questions and answers intact.
        let mut s = self.state.lock().unwrap();
        outcome.and_then(|lines| Self::install_reply(&mut s, ServiceReply::Schedule(lines)))
    }

    async fn submit_feedback_inner(&self) -> Result<(), SessionError> {
        let feedback = {
            let mut s = self.state.lock().unwrap();
            if s.phase != Phase::ScheduleReady {
                return Err(SessionError::InvalidIntent(s.phase));
            }
            if s.feedback.trim().is_empty() {
                return Err(SessionError::MissingInput("feedback"));
            }
            s.phase = Phase::Revising;
            s.feedback.clone()
        };

        let outcome = match self.session.current() {
            Some(session_id) => self
                .api
                .revise(&session_id, &feedback)
                .await
                .map_err(SessionError::Revision),
            None => Err(SessionError::NoSession),
        };

        let mut s = self.state.lock().unwrap();
        match outcome.and_then(|reply| Self::install_reply(&mut s, reply)) {
            Ok(()) => {
                // Feedback is ephemeral: cleared on success only.
                s.feedback.clear();
                Ok(())
            }
            Err(e) => {
                // The prior schedule stays untouched.
                s.phase = Phase::ScheduleReady;
                Err(e)
            }
        }
    }

    async fn export_inner(&self, dest: &Path) -> Result<u64, SessionError> {
        {
            let s = self.state.lock().unwrap();
            if !matches!(s.phase, Phase::ScheduleReady | Phase::Accepted) {
                return Err(SessionError::InvalidIntent(s.phase));
            }
        }
        let session_id = self.session.current().ok_or(SessionError::NoSession)?;
        self.api.download(&session_id, dest).await.map_err(SessionError::Export)
    }

    /// Apply a classified service reply to the state
    ///
    /// Questions and schedule are mutually exclusive: installing one
    /// clears the other. A malformed schedule line fails the transition
    /// before anything is installed.
    fn install_reply(s: &mut MachineState, reply: ServiceReply) -> Result<(), SessionError> {
        match reply {
            ServiceReply::Questions(questions) => {
                debug!(count = questions.len(), "install_reply: clarification questions");
                s.answers = (0..questions.len()).map(|i| (i, String::new())).collect();
                s.questions = questions;
                s.schedule = None;
                s.phase = Phase::AwaitingClarification;
            }
            ServiceReply::Schedule(lines) => {
                debug!(count = lines.len(), "install_reply: schedule lines");
                let entries = parse_lines(&lines)?;
                s.schedule = Some(entries);
                s.questions.clear();
                s.answers.clear();
                s.phase = Phase::ScheduleReady;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::mock::ScriptedApi;
    use crate::api::{ApiError, GenerateReply};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    struct Fixture {
        api: Arc<ScriptedApi>,
        machine: Arc<SessionMachine>,
        _temp: TempDir,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let api = Arc::new(ScriptedApi::new());
        let store = Arc::new(PrefStore::open(temp.path().join("preferences.json")).unwrap());
        let machine = Arc::new(SessionMachine::new(api.clone(), store));
        Fixture {
            api,
            machine,
            _temp: temp,
        }
    }

    /// Drive the machine to Ready with all generate preconditions met
    async fn ready_fixture() -> Fixture {
        let fx = fixture();
        fx.api.push_start(Ok("s-1".to_string()));
        fx.machine.start().await.unwrap();

        fx.machine.set_preferences(Preferences::default()).unwrap();
        let cal = fx._temp.path().join("cal.ics");
        std::fs::write(&cal, b"BEGIN:VCALENDAR\nEND:VCALENDAR\n").unwrap();
        fx.machine.set_calendar_file(&cal);
        fx.machine.set_tasks_text("write report\nreview PRs");
        fx
    }

    fn questions_reply(questions: &[&str]) -> GenerateReply {
        GenerateReply {
            session_id: None,
            reply: ServiceReply::Questions(questions.iter().map(|q| q.to_string()).collect()),
        }
    }

    fn schedule_reply(lines: &[&str]) -> GenerateReply {
        GenerateReply {
            session_id: None,
            reply: ServiceReply::Schedule(lines.iter().map(|l| l.to_string()).collect()),
        }
    }

    // === Startup ===

    #[tokio::test]
    async fn test_start_reaches_ready_with_session() {
        let fx = fixture();
        fx.api.push_start(Ok("s-1".to_string()));

        let snap = fx.machine.start().await.unwrap();
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(snap.session_id.as_deref(), Some("s-1"));
    }

    #[tokio::test]
    async fn test_start_loads_saved_preferences() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(PrefStore::open(temp.path().join("preferences.json")).unwrap());
        let mut prefs = Preferences::default();
        prefs.task_preference = "mornings only".to_string();
        store.save(&prefs).unwrap();

        let api = Arc::new(ScriptedApi::new());
        api.push_start(Ok("s-1".to_string()));
        let machine = SessionMachine::new(api, store);

        let snap = machine.start().await.unwrap();
        assert_eq!(snap.preferences.unwrap().task_preference, "mornings only");
    }

    #[tokio::test]
    async fn test_start_failure_returns_to_idle_and_is_retryable() {
        let fx = fixture();
        fx.api.push_start(Err(ApiError::Service("down".to_string())));
        fx.api.push_start(Ok("s-1".to_string()));

        let err = fx.machine.start().await.unwrap_err();
        assert!(matches!(err, SessionError::Session(_)));
        assert_eq!(fx.machine.snapshot().phase, Phase::Idle);

        // Re-triggering the intent succeeds
        let snap = fx.machine.start().await.unwrap();
        assert_eq!(snap.phase, Phase::Ready);
    }

    // === Generation ===

    #[tokio::test]
    async fn test_generate_requires_all_inputs() {
        let fx = fixture();
        fx.api.push_start(Ok("s-1".to_string()));
        fx.machine.start().await.unwrap();

        let err = fx.machine.generate().await.unwrap_err();
        assert!(matches!(err, SessionError::MissingInput("preferences")));
        assert_eq!(fx.machine.snapshot().phase, Phase::Ready);
        assert_eq!(fx.api.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generate_questions_initializes_empty_answer_set() {
        let fx = ready_fixture().await;
        fx.api.push_generate(Ok(questions_reply(&["Q1", "Q2"])));

        let snap = fx.machine.generate().await.unwrap();
        assert_eq!(snap.phase, Phase::AwaitingClarification);
        assert_eq!(snap.questions, vec!["Q1", "Q2"]);
        assert_eq!(snap.answers.len(), 2);
        assert_eq!(snap.answers.get(&0).map(String::as_str), Some(""));
        assert_eq!(snap.answers.get(&1).map(String::as_str), Some(""));
        assert!(snap.schedule.is_none());
    }

    #[tokio::test]
    async fn test_generate_success_installs_parsed_schedule() {
        let fx = ready_fixture().await;
        fx.api
            .push_generate(Ok(schedule_reply(&["09:00, 30m, Standup, daily", "10:00, 2h, Report"])));

        let snap = fx.machine.generate().await.unwrap();
        assert_eq!(snap.phase, Phase::ScheduleReady);
        let schedule = snap.schedule.unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].description, "Standup, daily");
    }

    #[tokio::test]
    async fn test_generate_rotates_session_id_newest_wins() {
        let fx = ready_fixture().await;
        fx.api.push_generate(Ok(GenerateReply {
            session_id: Some("s-2".to_string()),
            reply: ServiceReply::Schedule(vec!["09:00, 1h, Focus".to_string()]),
        }));

        let snap = fx.machine.generate().await.unwrap();
        assert_eq!(snap.session_id.as_deref(), Some("s-2"));
    }

    #[tokio::test]
    async fn test_generate_failure_keeps_inputs_and_phase() {
        let fx = ready_fixture().await;
        fx.api.push_generate(Err(ApiError::Http {
            status: 502,
            message: "bad gateway".to_string(),
        }));

        let err = fx.machine.generate().await.unwrap_err();
        assert!(matches!(err, SessionError::Generation(_)));

        let snap = fx.machine.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert!(snap.preferences.is_some());
        assert!(snap.calendar_path.is_some());
        assert_eq!(snap.tasks_text, "write report\nreview PRs");
    }

    #[tokio::test]
    async fn test_generate_malformed_schedule_installs_nothing() {
        let fx = ready_fixture().await;
        fx.api
            .push_generate(Ok(schedule_reply(&["09:00, 30m, Standup", "garbled"])));

        let err = fx.machine.generate().await.unwrap_err();
        assert!(matches!(err, SessionError::Format(_)));

        let snap = fx.machine.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert!(snap.schedule.is_none());
    }

    #[tokio::test]
    async fn test_generate_encode_failure_sends_no_request() {
        let fx = ready_fixture().await;
        fx.machine.set_calendar_file("/nonexistent/cal.ics");

        let err = fx.machine.generate().await.unwrap_err();
        assert!(matches!(err, SessionError::Encode(_)));
        assert_eq!(fx.api.generate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.machine.snapshot().phase, Phase::Ready);
    }

    #[tokio::test]
    async fn test_second_generate_while_in_flight_is_rejected() {
        let fx = ready_fixture().await;
        let gate = fx.api.gate_generate();
        fx.api.push_generate(Ok(schedule_reply(&["09:00, 1h, Focus"])));

        let machine = fx.machine.clone();
        let first = tokio::spawn(async move { machine.generate().await });

        // Wait until the first intent is inside the service call
        while fx.api.generate_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(fx.machine.snapshot().phase, Phase::Generating);

        let err = fx.machine.generate().await.unwrap_err();
        assert!(matches!(err, SessionError::Busy));

        gate.notify_one();
        first.await.unwrap().unwrap();

        // Only one request ever reached the service
        assert_eq!(fx.api.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.machine.snapshot().phase, Phase::ScheduleReady);
    }

    // === Clarification ===

    async fn clarification_fixture() -> Fixture {
        let fx = ready_fixture().await;
        fx.api.push_generate(Ok(questions_reply(&["Q1", "Q2"])));
        fx.machine.generate().await.unwrap();
        fx
    }

    #[tokio::test]
    async fn test_submit_answers_success_clears_questions_installs_schedule() {
        let fx = clarification_fixture().await;
        fx.machine.set_answer(0, "mornings").unwrap();
        fx.api.push_answers(Ok(vec!["09:00, 30m, Standup".to_string()]));

        // Partial answer sets are permitted - Q2 stays empty
        let snap = fx.machine.submit_answers().await.unwrap();
        assert_eq!(snap.phase, Phase::ScheduleReady);
        assert!(snap.questions.is_empty());
        assert!(snap.answers.is_empty());
        assert_eq!(snap.schedule.unwrap()[0].start_time, "09:00");
    }

    #[tokio::test]
    async fn test_submit_answers_failure_keeps_clarification_state() {
        let fx = clarification_fixture().await;
        fx.machine.set_answer(1, "no meetings").unwrap();
        fx.api.push_answers(Err(ApiError::Service("need more".to_string())));

        let err = fx.machine.submit_answers().await.unwrap_err();
        assert!(matches!(err, SessionError::AnswerSubmission(_)));

        let snap = fx.machine.snapshot();
        assert_eq!(snap.phase, Phase::AwaitingClarification);
        assert_eq!(snap.questions.len(), 2);
        assert_eq!(snap.answers.get(&1).map(String::as_str), Some("no meetings"));
    }

    #[tokio::test]
    async fn test_set_answer_out_of_range() {
        let fx = clarification_fixture().await;
        assert!(matches!(
            fx.machine.set_answer(5, "x"),
            Err(SessionError::NoSuchQuestion(5))
        ));
    }

    // === Revision ===

    async fn schedule_fixture() -> Fixture {
        let fx = ready_fixture().await;
        fx.api.push_generate(Ok(schedule_reply(&["09:00, 1h, Focus"])));
        fx.machine.generate().await.unwrap();
        fx
    }

    #[tokio::test]
    async fn test_feedback_questions_clear_old_schedule() {
        let fx = schedule_fixture().await;
        fx.machine.set_feedback("move everything after lunch");
        fx.api
            .push_revise(Ok(ServiceReply::Questions(vec!["Which lunch slot?".to_string()])));

        let snap = fx.machine.submit_feedback().await.unwrap();
        assert_eq!(snap.phase, Phase::AwaitingClarification);
        assert_eq!(snap.questions, vec!["Which lunch slot?"]);
        assert!(snap.schedule.is_none(), "old schedule must be cleared");
        assert!(snap.feedback.is_empty(), "feedback clears on success");
    }

    #[tokio::test]
    async fn test_feedback_schedule_replaces_wholesale() {
        let fx = schedule_fixture().await;
        fx.machine.set_feedback("push focus to the afternoon");
        fx.api
            .push_revise(Ok(ServiceReply::Schedule(vec!["14:00, 1h, Focus".to_string()])));

        let snap = fx.machine.submit_feedback().await.unwrap();
        assert_eq!(snap.phase, Phase::ScheduleReady);
        let schedule = snap.schedule.unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].start_time, "14:00");
    }

    #[tokio::test]
    async fn test_feedback_failure_keeps_prior_schedule_and_feedback() {
        let fx = schedule_fixture().await;
        fx.machine.set_feedback("make mornings lighter");
        fx.api.push_revise(Err(ApiError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "request timed out",
        ))));

        let err = fx.machine.submit_feedback().await.unwrap_err();
        assert!(matches!(err, SessionError::Revision(_)));

        let snap = fx.machine.snapshot();
        assert_eq!(snap.phase, Phase::ScheduleReady);
        assert_eq!(snap.schedule.unwrap()[0].start_time, "09:00");
        assert_eq!(snap.feedback, "make mornings lighter");
    }

    #[tokio::test]
    async fn test_empty_feedback_is_rejected_locally() {
        let fx = schedule_fixture().await;
        let err = fx.machine.submit_feedback().await.unwrap_err();
        assert!(matches!(err, SessionError::MissingInput("feedback")));
        assert_eq!(fx.api.revise_calls.load(Ordering::SeqCst), 0);
    }

    // === Accept & export ===

    #[tokio::test]
    async fn test_accept_is_local_and_terminal() {
        let fx = schedule_fixture().await;
        let snap = fx.machine.accept().unwrap();
        assert_eq!(snap.phase, Phase::Accepted);

        // No further feedback once accepted
        fx.machine.set_feedback("too late");
        assert!(matches!(
            fx.machine.submit_feedback().await,
            Err(SessionError::InvalidIntent(Phase::Accepted))
        ));
    }

    #[tokio::test]
    async fn test_accept_requires_a_schedule() {
        let fx = fixture();
        assert!(matches!(
            fx.machine.accept(),
            Err(SessionError::InvalidIntent(Phase::Idle))
        ));
    }

    #[tokio::test]
    async fn test_export_writes_file_and_repeats() {
        let fx = schedule_fixture().await;
        fx.machine.accept().unwrap();
        fx.api.push_download(Ok(b"BEGIN:VCALENDAR".to_vec()));
        fx.api.push_download(Ok(b"BEGIN:VCALENDAR".to_vec()));

        let dest = fx._temp.path().join("schedule.ics");
        let written = fx.machine.export(&dest).await.unwrap();
        assert_eq!(written, 15);
        assert_eq!(std::fs::read(&dest).unwrap(), b"BEGIN:VCALENDAR");

        // Export may be invoked any number of times
        fx.machine.export(&dest).await.unwrap();
        assert_eq!(fx.machine.snapshot().phase, Phase::Accepted);
    }

    #[tokio::test]
    async fn test_export_without_server_side_schedule_fails_cleanly() {
        let fx = schedule_fixture().await;
        fx.api.push_download(Err(ApiError::Http {
            status: 404,
            message: "no schedule for session".to_string(),
        }));

        let dest = fx._temp.path().join("schedule.ics");
        let err = fx.machine.export(&dest).await.unwrap_err();
        assert!(matches!(err, SessionError::Export(_)));
        assert_eq!(fx.machine.snapshot().phase, Phase::ScheduleReady);
    }

    #[tokio::test]
    async fn test_export_before_any_schedule_is_invalid() {
        let fx = fixture();
        fx.api.push_start(Ok("s-1".to_string()));
        fx.machine.start().await.unwrap();

        let dest = fx._temp.path().join("schedule.ics");
        assert!(matches!(
            fx.machine.export(&dest).await,
            Err(SessionError::InvalidIntent(Phase::Ready))
        ));
    }
}
