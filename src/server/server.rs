use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{error, info};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::{
    log_requests, make_auth_routes, make_music_routes, make_profile_routes, metrics,
    session::require_session, state::*, ServerConfig,
};
use crate::compose::{BeatovenClient, ComposeJobPoller, TrackDelivery};
use crate::config::{AppConfig, GenreModelSource};
use crate::genre::{GenreClassifier, GenreModel, HttpGenreModel, LinearGenreModel};
use crate::oidc::{AuthStateStore, OidcClient};
use crate::playlist::{PlaylistLookup, SpotifyClient};
use crate::profile::{ProfileStore, SqliteProfileStore};
use crate::server::session::Session;
use crate::session::{InMemorySessionStore, SessionStore};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub signed_in_as: Option<String>,
    pub features: EnabledFeatures,
}

#[derive(Serialize)]
struct EnabledFeatures {
    pub sign_in: bool,
    pub genre_prediction: bool,
    pub playlists: bool,
    pub composition: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        signed_in_as: session.map(|s| s.email),
        features: EnabledFeatures {
            sign_in: state.oidc_client.is_some(),
            genre_prediction: state.classifier.is_some(),
            playlists: state.playlist_lookup.is_some(),
            composition: state.composer.is_some(),
        },
    };
    Json(stats)
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        profile_store: Arc<dyn ProfileStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_owned(),
            profile_store,
            session_store,
            classifier: None,
            playlist_lookup: None,
            composer: None,
            track_delivery: None,
            oidc_client: None,
            auth_state_store: Arc::new(AuthStateStore::new()),
            shutdown: CancellationToken::new(),
        }
    }
}

fn make_genre_model(source: &GenreModelSource) -> Result<Arc<dyn GenreModel>> {
    Ok(match source {
        GenreModelSource::LinearFile(path) => {
            info!("Loading genre model weights from {:?}", path);
            Arc::new(LinearGenreModel::from_file(path)?)
        }
        GenreModelSource::Http { url, timeout } => {
            info!("Using genre model endpoint {}", url);
            Arc::new(HttpGenreModel::new(url.clone(), *timeout))
        }
    })
}

/// Builds the server state, wiring in every integration the config enables.
pub async fn build_state(
    app_config: &AppConfig,
    profile_store: Arc<dyn ProfileStore>,
    session_store: Arc<dyn SessionStore>,
) -> Result<ServerState> {
    let config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        session_ttl: app_config.session.ttl,
        session_prune_interval: app_config.session.prune_interval,
    };
    let mut state = ServerState::new(config, profile_store, session_store);

    if let Some(source) = &app_config.classifier.model {
        let model = make_genre_model(source)?;
        state.classifier = Some(GenreClassifier::new(model, app_config.classifier.policy));
    } else {
        info!("No genre model configured, genre prediction disabled");
    }

    if let Some(spotify) = &app_config.spotify {
        let client = SpotifyClient::new(
            &spotify.accounts_url,
            &spotify.api_url,
            spotify.client_id.clone(),
            spotify.client_secret.clone(),
            spotify.timeout,
        )?;
        state.playlist_lookup = Some(PlaylistLookup::new(Arc::new(client), spotify.page_size));
    } else {
        info!("No [spotify] section, playlist lookup disabled");
    }

    if let Some(beatoven) = &app_config.beatoven {
        let client = BeatovenClient::new(&beatoven.base_url, beatoven.api_key.clone(), beatoven.timeout)?;
        let poller = ComposeJobPoller::new(Arc::new(client))
            .with_poll_interval(beatoven.poll_interval)
            .with_max_attempts(beatoven.max_attempts)
            .with_format(beatoven.format.clone());
        state.composer = Some(Arc::new(poller));

        if let Some(audio_dir) = &app_config.audio_dir {
            state.track_delivery = Some(Arc::new(TrackDelivery::new(
                audio_dir.clone(),
                beatoven.timeout,
            )?));
        }
    } else {
        info!("No [beatoven] section, composition disabled");
    }

    if let Some(oidc) = &app_config.oidc {
        let client = OidcClient::new(oidc)
            .await
            .context("Failed to initialize OIDC client")?;
        state.oidc_client = Some(Arc::new(client));
    } else {
        info!("No [oidc] section, sign-in disabled");
    }

    Ok(state)
}

pub fn make_app(state: ServerState) -> Router {
    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let mut app: Router = home_router
        .nest("/v1/auth", make_auth_routes(state.clone()))
        .nest("/v1/profile", make_profile_routes(state.clone()))
        .nest("/v1/music", make_music_routes(state.clone()));

    if let Some(delivery) = &state.track_delivery {
        let audio_routes: Router = Router::new()
            .nest_service("/v1/audio", ServeDir::new(delivery.audio_dir()))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_session));
        app = app.merge(audio_routes);
    }

    app.layer(middleware::from_fn_with_state(state.clone(), log_requests))
}

fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Periodically drops idle sessions until `shutdown` fires.
pub fn spawn_session_pruning(
    session_store: Arc<dyn SessionStore>,
    max_idle: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let max_idle = chrono_duration(max_idle);
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let pruned = session_store.prune_idle(max_idle);
            if pruned > 0 {
                info!("Pruned {} idle sessions", pruned);
            }
        }
    })
}

async fn serve_metrics(port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics::metrics_handler));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", port))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

pub async fn run_server(app_config: AppConfig) -> Result<()> {
    info!(
        "Opening SQLite profile database at {:?}...",
        app_config.profile_db_path()
    );
    let profile_store: Arc<dyn ProfileStore> =
        Arc::new(SqliteProfileStore::new(app_config.profile_db_path())?);
    let in_memory_sessions = Arc::new(InMemorySessionStore::with_max_idle(chrono_duration(
        app_config.session.ttl,
    )));
    let session_store: Arc<dyn SessionStore> = in_memory_sessions.clone();

    let state = build_state(&app_config, profile_store, session_store.clone()).await?;
    let shutdown = state.shutdown.clone();

    spawn_session_pruning(
        session_store,
        app_config.session.ttl,
        app_config.session.prune_interval,
        shutdown.clone(),
    );

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(15));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => metrics::set_active_sessions(in_memory_sessions.len()),
                }
            }
        });
    }

    let metrics_shutdown = shutdown.clone();
    let metrics_port = app_config.metrics_port;
    tokio::spawn(async move {
        if let Err(err) = serve_metrics(metrics_port, metrics_shutdown).await {
            error!("Metrics server stopped: {:#}", err);
        }
    });

    let app = make_app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", app_config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", app_config.port))?;

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", metrics_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", err);
            }
            info!("Shutting down, cancelling in-flight compositions");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}
