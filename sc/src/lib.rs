//! SchedClient - session-driven client for an AI schedule generation
//! service
//!
//! Drives a remote scheduling service through a multi-step, session-scoped
//! conversation: submit a calendar file and task list, answer the
//! clarification questions the service poses, receive a generated
//! schedule, revise it with free-text feedback until it is right, then
//! export it as a calendar file.
//!
//! # Core Concepts
//!
//! - **One session per run**: a single server-side conversation spans
//!   generation and every revision
//! - **Explicit state machine**: every server response is applied as a
//!   phase transition; the shell only dispatches intents and renders
//!   snapshots
//! - **Classified responses**: the service's `status` discriminator is
//!   resolved once at the API boundary, never probed ad hoc
//! - **Failures keep state**: a failed request returns the machine to its
//!   pre-call phase with inputs, preferences and any prior schedule intact
//!
//! # Modules
//!
//! - [`api`] - service contract, HTTP client and wire types
//! - [`domain`] - schedule codec and generation inputs
//! - [`session`] - session identity and the interaction state machine
//! - [`repl`] - interactive shell
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod repl;
pub mod session;

// Re-export commonly used types
pub use api::{AnswerSet, ApiError, GenerateReply, GenerateRequest, HttpApi, SchedulerApi, ServiceReply};
pub use config::{Config, ServiceConfig, StorageConfig};
pub use domain::{ScheduleEntry, ScheduleFormatError, TaskInput, parse_lines, to_lines};
pub use session::{Phase, SessionContext, SessionError, SessionMachine, Snapshot};
