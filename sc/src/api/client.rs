//! SchedulerApi trait definition

use async_trait::async_trait;
use std::path::Path;

use super::{AnswerSet, ApiError, GenerateReply, GenerateRequest, ServiceReply};

/// One session-scoped conversation partner
///
/// Every method maps to exactly one request against the scheduling
/// service. The caller supplies the session id on every post-start call;
/// the implementation attaches it however the service expects (header,
/// body field, query parameter). Implementations never retry on their
/// own - a failed call is reported once and the user re-issues the
/// intent.
#[async_trait]
pub trait SchedulerApi: Send + Sync {
    /// Open a fresh server-side conversation, returning its id
    async fn start_session(&self) -> Result<String, ApiError>;

    /// Submit calendar, tasks and preferences for schedule generation
    async fn generate(&self, session_id: &str, request: &GenerateRequest) -> Result<GenerateReply, ApiError>;

    /// Submit clarification answers (partial sets are allowed)
    async fn submit_answers(&self, session_id: &str, answers: &AnswerSet) -> Result<Vec<String>, ApiError>;

    /// Submit free-text revision feedback for the current schedule
    async fn revise(&self, session_id: &str, feedback: &str) -> Result<ServiceReply, ApiError>;

    /// Stream the canonical calendar file for this session to `dest`,
    /// returning the number of bytes written
    async fn download(&self, session_id: &str, dest: &Path) -> Result<u64, ApiError>;
}
