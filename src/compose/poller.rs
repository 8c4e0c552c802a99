//! Submit-then-poll driver for asynchronous composition jobs.

use super::client::{CompositionApi, SubmissionError};
use super::models::{ComposeRequest, ComposedTrack, JobState, TaskStatus, DEFAULT_TRACK_FORMAT};
use crate::genre::Genre;
use crate::server::metrics;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Composition task {task_id} failed")]
    Failed { task_id: String },

    #[error("Composition task {task_id} finished without a track url")]
    MissingTrackUrl { task_id: String },

    #[error("Composition task {task_id} did not finish after {attempts} polls")]
    TimedOut { task_id: String, attempts: u32 },

    #[error("Composition wait was cancelled")]
    Cancelled,
}

pub struct ComposeJobPoller {
    api: Arc<dyn CompositionApi>,
    poll_interval: Duration,
    max_attempts: u32,
    format: String,
}

impl ComposeJobPoller {
    pub fn new(api: Arc<dyn CompositionApi>) -> Self {
        Self {
            api,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            format: DEFAULT_TRACK_FORMAT.to_string(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub async fn submit(&self, genre: Genre) -> Result<String, SubmissionError> {
        let request = ComposeRequest::for_genre(genre, &self.format);
        let task_id = self.api.submit(&request).await?;
        info!(task_id = %task_id, genre = %genre, "Composition submitted");
        Ok(task_id)
    }

    /// A single status check. Any failure is treated as transient.
    pub async fn poll(&self, task_id: &str) -> Option<TaskStatus> {
        match self.api.task_status(task_id).await {
            Ok(status) => Some(status),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "Polling error");
                metrics::record_compose_poll_error();
                None
            }
        }
    }

    /// Polls until the task reaches a terminal state, the attempt budget is
    /// spent or `cancel` fires. There is no delay after the last attempt.
    pub async fn wait_until_terminal(
        &self,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CompositionError> {
        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(CompositionError::Cancelled);
            }

            if let Some(status) = self.poll(task_id).await {
                debug!(
                    task_id = %task_id,
                    attempt,
                    max_attempts = self.max_attempts,
                    state = ?status.state,
                    "Composition status"
                );
                match status.state {
                    JobState::Composed => {
                        return status.track_url.ok_or_else(|| {
                            CompositionError::MissingTrackUrl {
                                task_id: task_id.to_string(),
                            }
                        });
                    }
                    JobState::Failed => {
                        return Err(CompositionError::Failed {
                            task_id: task_id.to_string(),
                        });
                    }
                    JobState::Pending | JobState::Processing | JobState::Other(_) => {}
                }
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(CompositionError::Cancelled),
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        Err(CompositionError::TimedOut {
            task_id: task_id.to_string(),
            attempts: self.max_attempts,
        })
    }

    pub async fn compose(
        &self,
        genre: Genre,
        cancel: &CancellationToken,
    ) -> Result<ComposedTrack, CompositionError> {
        let task_id = self.submit(genre).await?;
        let track_url = self.wait_until_terminal(&task_id, cancel).await?;
        info!(task_id = %task_id, "Composition finished");
        Ok(ComposedTrack {
            task_id,
            track_url,
            local_path: None,
        })
    }
}
