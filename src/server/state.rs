use axum::extract::FromRef;

use crate::compose::{ComposeJobPoller, TrackDelivery};
use crate::genre::GenreClassifier;
use crate::oidc::{AuthStateStore, OidcClient};
use crate::playlist::PlaylistLookup;
use crate::profile::ProfileStore;
use crate::session::SessionStore;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::ServerConfig;

pub type GuardedProfileStore = Arc<dyn ProfileStore>;
pub type GuardedSessionStore = Arc<dyn SessionStore>;
pub type OptionalClassifier = Option<GenreClassifier>;
pub type OptionalPlaylistLookup = Option<PlaylistLookup>;
pub type OptionalComposer = Option<Arc<ComposeJobPoller>>;
pub type OptionalTrackDelivery = Option<Arc<TrackDelivery>>;
pub type OptionalOidcClient = Option<Arc<OidcClient>>;
pub type GuardedAuthStateStore = Arc<AuthStateStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub profile_store: GuardedProfileStore,
    pub session_store: GuardedSessionStore,
    pub classifier: OptionalClassifier,
    pub playlist_lookup: OptionalPlaylistLookup,
    pub composer: OptionalComposer,
    pub track_delivery: OptionalTrackDelivery,
    pub oidc_client: OptionalOidcClient,
    pub auth_state_store: GuardedAuthStateStore,
    /// Cancelled when the server shuts down; in-flight composition waits
    /// stop polling.
    pub shutdown: CancellationToken,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedProfileStore {
    fn from_ref(input: &ServerState) -> Self {
        input.profile_store.clone()
    }
}

impl FromRef<ServerState> for GuardedSessionStore {
    fn from_ref(input: &ServerState) -> Self {
        input.session_store.clone()
    }
}

impl FromRef<ServerState> for OptionalOidcClient {
    fn from_ref(input: &ServerState) -> Self {
        input.oidc_client.clone()
    }
}

impl FromRef<ServerState> for GuardedAuthStateStore {
    fn from_ref(input: &ServerState) -> Self {
        input.auth_state_store.clone()
    }
}
