//! MindTune Server Library
//!
//! Genre prediction from listening habits and mood, playlist lookup and
//! AI track composition, exposed as modules for the binaries and tests.

pub mod compose;
pub mod config;
pub mod genre;
pub mod oidc;
pub mod playlist;
pub mod profile;
pub mod server;
pub mod session;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use genre::{Genre, GenreClassifier, GenreModel};
pub use profile::{FeatureVector, ProfileStore, SqliteProfileStore, UserProfile};
pub use server::{run_server, RequestsLoggingLevel};
pub use session::{InMemorySessionStore, SessionStore};
