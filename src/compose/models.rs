use crate::genre::Genre;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TRACK_FORMAT: &str = "wav";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposePrompt {
    pub text: String,
    pub genre: String,
}

/// Body of a track composition request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeRequest {
    pub prompt: ComposePrompt,
    pub format: String,
    pub looping: bool,
}

impl ComposeRequest {
    pub fn for_genre(genre: Genre, format: &str) -> Self {
        ComposeRequest {
            prompt: ComposePrompt {
                text: genre.composition_prompt().to_string(),
                genre: genre.composition_tag(),
            },
            format: format.to_string(),
            looping: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ComposeResponse {
    pub task_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct TaskMeta {
    pub track_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TaskResponse {
    pub status: Option<String>,
    #[serde(default)]
    pub meta: Option<TaskMeta>,
}

/// Remote job state as reported by a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Processing,
    Composed,
    Failed,
    Other(String),
}

impl JobState {
    pub fn parse(status: &str) -> JobState {
        match status {
            "pending" | "queued" | "submitted" => JobState::Pending,
            "composing" | "processing" | "running" => JobState::Processing,
            "composed" | "completed" => JobState::Composed,
            "failed" => JobState::Failed,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Composed | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: JobState,
    pub track_url: Option<String>,
}

impl From<TaskResponse> for TaskStatus {
    fn from(response: TaskResponse) -> Self {
        TaskStatus {
            state: JobState::parse(response.status.as_deref().unwrap_or_default()),
            track_url: response.meta.and_then(|meta| meta.track_url),
        }
    }
}

/// A finished composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedTrack {
    pub task_id: String,
    pub track_url: String,
    /// Set when the track was also saved to the local audio directory.
    pub local_path: Option<PathBuf>,
}
