//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own profile database, audio
//! directory and fake upstreams.

use super::constants::*;
use super::fakes::FakeUpstreams;
use mindtune_server::config::{
    AppConfig, BeatovenSettings, ClassifierSettings, GenreModelSource, SessionSettings,
    SpotifySettings,
};
use mindtune_server::genre::PredictionPolicy;
use mindtune_server::profile::{ProfileStore, SqliteProfileStore, UserProfile};
use mindtune_server::server::{build_state, make_app, RequestsLoggingLevel};
use mindtune_server::session::{InMemorySessionStore, SessionStore, UserSession};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Profile store for direct database access in tests
    pub profile_store: Arc<dyn ProfileStore>,

    /// Session store, used to sign users in without an identity provider
    pub session_store: Arc<dyn SessionStore>,

    /// Upstream stand-ins, when the server was spawned with integrations
    pub upstreams: Option<FakeUpstreams>,

    /// Cancelled on drop, like a real shutdown
    pub shutdown: CancellationToken,

    pub audio_dir: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl TestServer {
    /// Spawns a server with every integration pointed at fake upstreams.
    pub async fn spawn() -> Self {
        let upstreams = FakeUpstreams::spawn().await;
        Self::spawn_with(Some(upstreams), PredictionPolicy::default()).await
    }

    /// Same as [`spawn`](Self::spawn) with a strict classifier.
    pub async fn spawn_strict() -> Self {
        let upstreams = FakeUpstreams::spawn().await;
        Self::spawn_with(Some(upstreams), PredictionPolicy::Strict).await
    }

    /// Spawns a server with no integrations configured.
    pub async fn spawn_bare() -> Self {
        Self::spawn_with(None, PredictionPolicy::default()).await
    }

    async fn spawn_with(upstreams: Option<FakeUpstreams>, policy: PredictionPolicy) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let audio_dir = temp_dir.path().join("audio");

        let app_config = AppConfig {
            db_dir: temp_dir.path().to_path_buf(),
            port: 0,
            metrics_port: 0,
            logging_level: RequestsLoggingLevel::None,
            audio_dir: Some(audio_dir.clone()),
            oidc: None,
            spotify: upstreams.as_ref().map(|u| SpotifySettings {
                client_id: "spotify-id".to_string(),
                client_secret: "spotify-secret".to_string(),
                accounts_url: u.spotify_accounts_url(),
                api_url: u.spotify_api_url(),
                page_size: 5,
                timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            }),
            beatoven: upstreams.as_ref().map(|u| BeatovenSettings {
                api_key: "beatoven-key".to_string(),
                base_url: u.beatoven_url(),
                poll_interval: Duration::from_millis(TEST_POLL_INTERVAL_MS),
                max_attempts: TEST_MAX_ATTEMPTS,
                format: "wav".to_string(),
                timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            }),
            classifier: ClassifierSettings {
                model: upstreams.as_ref().map(|u| GenreModelSource::Http {
                    url: u.model_url(),
                    timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
                }),
                policy,
            },
            session: SessionSettings::default(),
        };

        let profile_store: Arc<dyn ProfileStore> = Arc::new(
            SqliteProfileStore::new(app_config.profile_db_path())
                .expect("Failed to open profile store"),
        );
        let max_idle = chrono::Duration::from_std(app_config.session.ttl)
            .expect("Session TTL out of range");
        let session_store: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::with_max_idle(max_idle));

        let state = build_state(&app_config, profile_store.clone(), session_store.clone())
            .await
            .expect("Failed to build server state");
        let shutdown = state.shutdown.clone();
        let app = make_app(state);

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            profile_store,
            session_store,
            upstreams,
            shutdown,
            audio_dir,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// The fake upstreams; panics on a bare server.
    pub fn upstreams(&self) -> &FakeUpstreams {
        self.upstreams
            .as_ref()
            .expect("Server was spawned without upstreams")
    }

    /// Signs a user in and returns the session token.
    pub fn sign_in(&self, email: &str) -> String {
        let session = UserSession::new(email.to_string(), Some(TEST_NAME.to_string()));
        let token = session.token.clone();
        self.session_store.set(session);
        token
    }

    /// Stores a profile document for a user, bypassing the API.
    /// Stores a session last seen `idle` ago and returns its token.
    pub fn sign_in_idle(&self, email: &str, idle: chrono::Duration) -> String {
        let mut session = UserSession::new(email.to_string(), Some(TEST_NAME.to_string()));
        session.last_seen = chrono::Utc::now() - idle;
        let token = session.token.clone();
        self.session_store.set(session);
        token
    }

    pub fn store_profile(&self, email: &str, document: serde_json::Value) {
        let profile = UserProfile::from_document(&document).expect("Invalid profile document");
        self.profile_store
            .save_profile(email, &profile)
            .expect("Failed to store profile");
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
