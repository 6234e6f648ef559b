//! Schedule wire-format codec
//!
//! The service returns a schedule as flat text lines,
//! `"<startTime>, <duration>, <description...>"`. The description may
//! itself contain `", "`, so it is reassembled from every token after the
//! first two. A line with fewer than two tokens fails the whole batch:
//! installing a partially-parsed schedule would silently corrupt data, so
//! the caller gets an error and keeps whatever schedule it already held.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Token separator within a schedule line
const FIELD_SEP: &str = ", ";

/// One atomic calendar item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Placement start, as the service formats it (e.g. "09:00")
    pub start_time: String,
    /// Duration, as the service formats it (e.g. "30m")
    pub duration: String,
    /// Human description; may contain commas
    pub description: String,
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}{}", self.start_time, FIELD_SEP, self.duration, FIELD_SEP, self.description)
    }
}

/// Malformed schedule line error
#[derive(Debug, Error)]
#[error("Malformed schedule entry at line {line}: {content:?}")]
pub struct ScheduleFormatError {
    /// 1-based index of the offending line
    pub line: usize,
    pub content: String,
}

/// Parse the wire lines into ordered entries
///
/// Order-preserving and total for well-formed input; the first malformed
/// line rejects the whole batch.
pub fn parse_lines(lines: &[String]) -> Result<Vec<ScheduleEntry>, ScheduleFormatError> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| parse_line(line).ok_or_else(|| ScheduleFormatError {
            line: idx + 1,
            content: line.clone(),
        }))
        .collect()
}

fn parse_line(line: &str) -> Option<ScheduleEntry> {
    let mut tokens = line.split(FIELD_SEP);
    let start_time = tokens.next()?.to_string();
    let duration = tokens.next()?.to_string();
    let description = tokens.collect::<Vec<_>>().join(FIELD_SEP);
    Some(ScheduleEntry {
        start_time,
        duration,
        description,
    })
}

/// Re-join entries into wire lines (display, export previews, round-trips)
pub fn to_lines(entries: &[ScheduleEntry]) -> Vec<String> {
    entries.iter().map(|e| e.to_string()).collect()
}
