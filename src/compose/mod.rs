//! AI track composition: the Beatoven client, the job poller and local
//! delivery of finished tracks.

mod client;
mod delivery;
mod models;
mod poller;

pub use client::{
    BeatovenClient, CompositionApi, PollError, SubmissionError, DEFAULT_BEATOVEN_BASE_URL,
};
pub use delivery::TrackDelivery;
pub use models::{
    ComposePrompt, ComposeRequest, ComposedTrack, JobState, TaskStatus, DEFAULT_TRACK_FORMAT,
};
pub use poller::{ComposeJobPoller, CompositionError, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
