use chrono::{DateTime, Duration, Utc};
use rand::{rng, Rng};
use rand_distr::Alphanumeric;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;

const SESSION_TOKEN_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSession {
    #[serde(skip_serializing)]
    pub token: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl UserSession {
    /// A fresh session with a random token.
    pub fn new(email: String, name: Option<String>) -> Self {
        let now = Utc::now();
        UserSession {
            token: generate_session_token(),
            email,
            name,
            created_at: now,
            last_seen: now,
        }
    }
}

pub fn generate_session_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Sessions keyed by token.
pub trait SessionStore: Send + Sync {
    /// Returns the session and refreshes its `last_seen` timestamp.
    /// Sessions idle past the store's limit are removed instead.
    fn get(&self, token: &str) -> Option<UserSession>;

    fn set(&self, session: UserSession);

    /// Removes the session, returning it if it existed.
    fn clear(&self, token: &str) -> Option<UserSession>;

    /// Drops sessions not seen for longer than `max_idle`.
    /// Returns the number of sessions removed.
    fn prune_idle(&self, max_idle: Duration) -> usize;
}

/// Oldest `last_seen` still considered active, `None` when nothing can be
/// idle for that long.
fn idle_cutoff(max_idle: Duration) -> Option<DateTime<Utc>> {
    Utc::now().checked_sub_signed(max_idle)
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, UserSession>>,
    max_idle: Option<Duration>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `get` rejects sessions idle longer than `max_idle`.
    pub fn with_max_idle(max_idle: Duration) -> Self {
        InMemorySessionStore {
            sessions: RwLock::new(HashMap::new()),
            max_idle: Some(max_idle),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, token: &str) -> Option<UserSession> {
        let mut sessions = self.sessions.write().unwrap();
        let cutoff = self.max_idle.and_then(idle_cutoff);
        if let Some(cutoff) = cutoff {
            if sessions.get(token)?.last_seen < cutoff {
                sessions.remove(token);
                return None;
            }
        }
        let session = sessions.get_mut(token)?;
        session.last_seen = Utc::now();
        Some(session.clone())
    }

    fn set(&self, session: UserSession) {
        self.sessions
            .write()
            .unwrap()
            .insert(session.token.clone(), session);
    }

    fn clear(&self, token: &str) -> Option<UserSession> {
        self.sessions.write().unwrap().remove(token)
    }

    fn prune_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = idle_cutoff(max_idle) else {
            return 0;
        };
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen >= cutoff);
        before - sessions.len()
    }
}
