//! HTTP client for the Beatoven track composition API.

use super::models::{ComposeRequest, ComposeResponse, TaskResponse, TaskStatus};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BEATOVEN_BASE_URL: &str = "https://public-api.beatoven.ai/api/v1";

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Connection to composition service failed: {0}")]
    Transport(String),

    #[error("Composition service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Composition service response carried no task id")]
    MissingTaskId,

    #[error("Invalid composition service response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Connection to composition service failed: {0}")]
    Transport(String),

    #[error("Task status request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid task status response: {0}")]
    InvalidResponse(String),
}

/// A remote service that composes tracks asynchronously.
#[async_trait]
pub trait CompositionApi: Send + Sync {
    /// Starts a composition and returns its task id.
    async fn submit(&self, request: &ComposeRequest) -> Result<String, SubmissionError>;

    /// Fetches the current status of a task.
    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, PollError>;
}

pub struct BeatovenClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BeatovenClient {
    /// # Arguments
    /// * `base_url` - Base URL of the API (e.g., "https://public-api.beatoven.ai/api/v1")
    /// * `api_key` - Bearer token
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompositionApi for BeatovenClient {
    async fn submit(&self, request: &ComposeRequest) -> Result<String, SubmissionError> {
        let url = format!("{}/tracks/compose", self.base_url);
        debug!(genre = %request.prompt.genre, "Submitting composition");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: ComposeResponse = response
            .json()
            .await
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))?;

        body.task_id
            .filter(|task_id| !task_id.is_empty())
            .ok_or(SubmissionError::MissingTaskId)
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, PollError> {
        let url = format!("{}/tasks/{}", self.base_url, urlencoding::encode(task_id));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: TaskResponse = response
            .json()
            .await
            .map_err(|e| PollError::InvalidResponse(e.to_string()))?;

        Ok(body.into())
    }
}
