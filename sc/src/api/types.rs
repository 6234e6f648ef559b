//! Wire types for the scheduling service
//!
//! Raw response shapes are deserialized exactly as the service sends them
//! and then classified ONCE, here at the boundary, into [`ServiceReply`].
//! Nothing above this module ever inspects a raw `status` string or probes
//! optional JSON fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use prefstore::Preferences;

use super::ApiError;

/// Body of a generation request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Base64-encoded calendar file
    pub ics_file: String,
    /// Free-text task list
    pub tasks_text: String,
    /// Full preference record, camelCase on the wire
    pub preferences: Preferences,
    /// Day to schedule for (`YYYY-MM-DD`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_day: Option<String>,
}

/// Ordered answers keyed by question index
///
/// Serializes as an object with stringified integer keys, which is what
/// the service expects for a sparse answer map.
pub type AnswerSet = BTreeMap<usize, String>;

/// Classified payload of a schedule-producing response
///
/// The service either needs more information (an ordered question list)
/// or has produced a schedule (one wire line per entry).
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReply {
    Questions(Vec<String>),
    Schedule(Vec<String>),
}

/// Classified generation response: the reply plus an optional rotated
/// session id (the newest id always wins)
#[derive(Debug, Clone)]
pub struct GenerateReply {
    pub session_id: Option<String>,
    pub reply: ServiceReply,
}

// Raw shapes, private to the boundary

#[derive(Debug, Deserialize)]
pub(super) struct RawStartSession {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawGenerate {
    pub session_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<String>,
    pub error: Option<String>,
}

impl RawGenerate {
    pub(super) fn classify(self) -> Result<GenerateReply, ApiError> {
        let reply = match self.status.as_str() {
            "questions" => ServiceReply::Questions(self.questions),
            "success" => ServiceReply::Schedule(self.schedule),
            other => {
                let message = self
                    .error
                    .unwrap_or_else(|| format!("unexpected status '{}'", other));
                return Err(ApiError::Service(message));
            }
        };
        Ok(GenerateReply {
            session_id: self.session_id,
            reply,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawAnswers {
    pub status: String,
    #[serde(default)]
    pub schedule: Vec<String>,
    pub error: Option<String>,
}

impl RawAnswers {
    pub(super) fn classify(self) -> Result<Vec<String>, ApiError> {
        match self.status.as_str() {
            "success" => Ok(self.schedule),
            other => Err(ApiError::Service(
                self.error
                    .unwrap_or_else(|| format!("unexpected status '{}'", other)),
            )),
        }
    }
}

/// Revision responses carry no discriminator; the shape itself decides.
/// A non-empty question list takes priority over a schedule.
#[derive(Debug, Deserialize)]
pub(super) struct RawRevise {
    #[serde(default)]
    pub questions: Option<Vec<String>>,
    #[serde(default)]
    pub schedule: Option<Vec<String>>,
}

impl RawRevise {
    pub(super) fn classify(self) -> Result<ServiceReply, ApiError> {
        if let Some(questions) = self.questions
            && !questions.is_empty()
        {
            return Ok(ServiceReply::Questions(questions));
        }
        match self.schedule {
            Some(schedule) => Ok(ServiceReply::Schedule(schedule)),
            None => Err(ApiError::InvalidResponse(
                "revision response carried neither questions nor schedule".to_string(),
            )),
        }
    }
}
