//! Scheduling-service API module
//!
//! Provides the request/response contract with the remote service and the
//! HTTP client that speaks it.

pub mod client;
mod error;
mod http;
mod types;

pub use client::SchedulerApi;
pub use error::ApiError;
pub use http::HttpApi;
pub use types::{AnswerSet, GenerateReply, GenerateRequest, ServiceReply};
