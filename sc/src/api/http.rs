//! HTTP implementation of the SchedulerApi
//!
//! Talks to the scheduling service with reqwest. Every request carries a
//! bounded timeout from config; there is deliberately no retry loop here,
//! because a failed transition is only ever re-attempted by the user
//! re-issuing the intent.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::types::{RawAnswers, RawGenerate, RawRevise, RawStartSession};
use super::{AnswerSet, ApiError, GenerateReply, GenerateRequest, SchedulerApi, ServiceReply};
use crate::config::ServiceConfig;

/// Header correlating requests to one server-side conversation
const SESSION_HEADER: &str = "X-Session-ID";

/// Reqwest-backed scheduling-service client
pub struct HttpApi {
    base_url: String,
    http: Client,
}

impl HttpApi {
    /// Create a new client from configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ApiError> {
        debug!(?config, "from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-2xx response into an [`ApiError::Http`]
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status().as_u16();
        if !response.status().is_success() {
            debug!(status, "check_status: non-success response");
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Http { status, message });
        }
        Ok(response)
    }
}

#[async_trait]
impl SchedulerApi for HttpApi {
    async fn start_session(&self) -> Result<String, ApiError> {
        debug!("start_session: called");
        let response = self.http.get(self.url("start_session")).send().await?;
        let response = Self::check_status(response).await?;

        let raw: RawStartSession = response.json().await?;
        if raw.session_id.is_empty() {
            return Err(ApiError::InvalidResponse("empty session id".to_string()));
        }
        debug!(session_id = %raw.session_id, "start_session: session established");
        Ok(raw.session_id)
    }

    async fn generate(&self, session_id: &str, request: &GenerateRequest) -> Result<GenerateReply, ApiError> {
        debug!(%session_id, tasks_len = request.tasks_text.len(), "generate: called");
        let response = self
            .http
            .post(self.url("generate_schedule"))
            .header(SESSION_HEADER, session_id)
            .json(request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let raw: RawGenerate = response.json().await?;
        debug!(status = %raw.status, "generate: classifying response");
        raw.classify()
    }

    async fn submit_answers(&self, session_id: &str, answers: &AnswerSet) -> Result<Vec<String>, ApiError> {
        debug!(%session_id, answer_count = answers.len(), "submit_answers: called");
        let body = serde_json::json!({
            "answers": answers,
            "session_id": session_id,
        });

        let response = self
            .http
            .post(self.url("submit_answers"))
            .header(SESSION_HEADER, session_id)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let raw: RawAnswers = response.json().await?;
        debug!(status = %raw.status, "submit_answers: classifying response");
        raw.classify()
    }

    async fn revise(&self, session_id: &str, feedback: &str) -> Result<ServiceReply, ApiError> {
        debug!(%session_id, feedback_len = feedback.len(), "revise: called");
        let body = serde_json::json!({
            "session_id": session_id,
            "feedback": feedback,
        });

        let response = self
            .http
            .post(self.url("revise_schedule"))
            .header(SESSION_HEADER, session_id)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let raw: RawRevise = response.json().await?;
        raw.classify()
    }

    async fn download(&self, session_id: &str, dest: &Path) -> Result<u64, ApiError> {
        debug!(%session_id, dest = %dest.display(), "download: called");
        let response = self
            .http
            .get(self.url("download_schedule"))
            .query(&[("session_id", session_id)])
            .header(SESSION_HEADER, session_id)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let mut file = tokio::fs::File::create(dest).await?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(written, "download: complete");
        Ok(written)
    }
}
