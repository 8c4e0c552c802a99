//! Signed-in user sessions.

mod store;

pub use store::{generate_session_token, InMemorySessionStore, SessionStore, UserSession};
