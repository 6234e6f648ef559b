//! Generation input: calendar file plus free-text task list

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the user supplies before a schedule can be generated
///
/// Both parts are required; the shell keeps the generate affordance
/// disabled until [`TaskInput::is_complete`] holds.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    /// Calendar file to schedule around (read at generate time)
    pub calendar_path: Option<PathBuf>,
    /// Free-text task list
    pub tasks_text: String,
}

impl TaskInput {
    pub fn is_complete(&self) -> bool {
        self.calendar_path.is_some() && !self.tasks_text.trim().is_empty()
    }

    pub fn set_calendar(&mut self, path: impl Into<PathBuf>) {
        self.calendar_path = Some(path.into());
    }

    /// Read the calendar file and transcode it for transport
    ///
    /// This is the awaited encode step that precedes every generation
    /// request; if it fails the request must not be sent.
    pub async fn encode_calendar(&self) -> std::io::Result<String> {
        let path = self.calendar_path.as_deref().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no calendar file selected")
        })?;
        let bytes = read_calendar(path).await?;
        Ok(BASE64_STANDARD.encode(bytes))
    }
}

async fn read_calendar(path: &Path) -> std::io::Result<Vec<u8>> {
    debug!(path = %path.display(), "read_calendar: called");
    tokio::fs::read(path).await
}
