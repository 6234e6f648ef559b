//! Session flow error types
//!
//! One variant per failable transition, so the shell can render exactly
//! which step went wrong and leave the user's inputs editable. Every
//! error is local to the transition that raised it: previously held
//! state (preferences, prior schedule, session id) always survives.

use thiserror::Error;

use super::machine::Phase;
use crate::api::ApiError;
use crate::domain::ScheduleFormatError;

/// Errors raised by session flow transitions
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not establish a session: {0}")]
    Session(#[source] ApiError),

    #[error("Schedule generation failed: {0}")]
    Generation(#[source] ApiError),

    #[error("Answer submission failed: {0}")]
    AnswerSubmission(#[source] ApiError),

    #[error("Revision failed: {0}")]
    Revision(#[source] ApiError),

    #[error("Export failed: {0}")]
    Export(#[source] ApiError),

    #[error(transparent)]
    Format(#[from] ScheduleFormatError),

    #[error("Calendar file could not be read for encoding: {0}")]
    Encode(#[source] std::io::Error),

    #[error("Preference store error: {0}")]
    Store(String),

    #[error("No session id is held; start a session first")]
    NoSession,

    #[error("Another operation is already in flight")]
    Busy,

    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("No clarification question at index {0}")]
    NoSuchQuestion(usize),

    #[error("Intent is not valid in phase {0}")]
    InvalidIntent(Phase),
}

impl SessionError {
    /// The transport-level error behind this failure, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SessionError::Session(e)
            | SessionError::Generation(e)
            | SessionError::AnswerSubmission(e)
            | SessionError::Revision(e)
            | SessionError::Export(e) => Some(e),
            _ => None,
        }
    }
}
