use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use super::metrics::{record_compose_job, record_genre_prediction, record_playlist_lookup};
use super::responses::{json_error, not_configured};
use super::session::Session;
use super::state::*;
use crate::compose::{CompositionError, TrackDelivery};
use crate::genre::Genre;

#[derive(Deserialize, Debug, Default)]
struct GenreQuery {
    genre: Option<String>,
}

#[derive(Serialize)]
struct GenreResponse {
    genre: Genre,
    fallback: bool,
}

#[derive(Serialize)]
struct PlaylistResponse {
    genre: Genre,
    name: String,
    playlist_url: String,
}

#[derive(Serialize)]
struct ComposeResponse {
    genre: Genre,
    task_id: String,
    track_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_track_url: Option<String>,
}

/// Predicts the genre for the session's user from their stored profile.
async fn predict_genre(state: &ServerState, session: &Session) -> Result<GenreResponse, Response> {
    let Some(classifier) = &state.classifier else {
        return Err(not_configured("Genre prediction", "classifier"));
    };

    let profile = match state.profile_store.get_profile(&session.email) {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return Err(json_error(
                StatusCode::NOT_FOUND,
                "No profile for this user",
            ))
        }
        Err(err) => {
            error!("Failed to load profile of {}: {:#}", session.email, err);
            return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }
    };

    match classifier.predict_profile(&profile).await {
        Ok(prediction) => {
            let outcome = if prediction.fell_back { "fallback" } else { "model" };
            record_genre_prediction(prediction.genre.as_str(), outcome);
            Ok(GenreResponse {
                genre: prediction.genre,
                fallback: prediction.fell_back,
            })
        }
        Err(err) => {
            error!("Genre prediction failed for {}: {}", session.email, err);
            record_genre_prediction("none", "error");
            Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

/// An explicit `?genre=` wins over the prediction.
async fn resolve_genre(
    state: &ServerState,
    session: &Session,
    query: GenreQuery,
) -> Result<Genre, Response> {
    match query.genre.filter(|g| !g.trim().is_empty()) {
        Some(label) => label
            .parse::<Genre>()
            .map_err(|err| json_error(StatusCode::BAD_REQUEST, err)),
        None => predict_genre(state, session).await.map(|p| p.genre),
    }
}

async fn get_genre(session: Session, State(state): State<ServerState>) -> Response {
    match predict_genre(&state, &session).await {
        Ok(prediction) => Json(prediction).into_response(),
        Err(response) => response,
    }
}

async fn post_playlist(
    session: Session,
    State(state): State<ServerState>,
    Query(query): Query<GenreQuery>,
) -> Response {
    let Some(lookup) = state.playlist_lookup.clone() else {
        return not_configured("Playlist lookup", "spotify");
    };
    let genre = match resolve_genre(&state, &session, query).await {
        Ok(genre) => genre,
        Err(response) => return response,
    };

    match lookup.find_playlist(genre).await {
        Ok(Some(playlist)) => {
            record_playlist_lookup("found");
            Json(PlaylistResponse {
                genre,
                name: playlist.name,
                playlist_url: playlist.url,
            })
            .into_response()
        }
        Ok(None) => {
            record_playlist_lookup("empty");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "genre": genre, "error": "No playlist found" })),
            )
                .into_response()
        }
        Err(err) => {
            warn!("Playlist lookup for {} failed: {}", genre, err);
            record_playlist_lookup("error");
            json_error(StatusCode::BAD_GATEWAY, err.to_string())
        }
    }
}

fn composition_failure(err: &CompositionError) -> (StatusCode, &'static str) {
    match err {
        CompositionError::Submission(_) => (StatusCode::BAD_GATEWAY, "submission_failed"),
        CompositionError::Failed { .. } => (StatusCode::BAD_GATEWAY, "failed"),
        CompositionError::MissingTrackUrl { .. } => (StatusCode::BAD_GATEWAY, "missing_track_url"),
        CompositionError::TimedOut { .. } => (StatusCode::GATEWAY_TIMEOUT, "timed_out"),
        CompositionError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
    }
}

async fn post_compose(
    session: Session,
    State(state): State<ServerState>,
    Query(query): Query<GenreQuery>,
) -> Response {
    let Some(composer) = state.composer.clone() else {
        return not_configured("Composition", "beatoven");
    };
    let genre = match resolve_genre(&state, &session, query).await {
        Ok(genre) => genre,
        Err(response) => return response,
    };

    info!("{} requested a {} track", session.email, genre);
    let mut track = match composer.compose(genre, &state.shutdown).await {
        Ok(track) => track,
        Err(err) => {
            let (status, outcome) = composition_failure(&err);
            warn!("Composition for {} ended with {}: {}", session.email, outcome, err);
            record_compose_job(outcome);
            return (
                status,
                Json(json!({ "error": err.to_string(), "outcome": outcome })),
            )
                .into_response();
        }
    };
    record_compose_job("composed");

    if let Some(delivery) = &state.track_delivery {
        match delivery
            .deliver(&track.task_id, &track.track_url, composer.format())
            .await
        {
            Ok(path) => track.local_path = Some(path),
            Err(err) => warn!("Could not save track {} locally: {:#}", track.task_id, err),
        }
    }

    let local_track_url = track.local_path.as_ref().map(|_| {
        format!(
            "/v1/audio/{}",
            TrackDelivery::file_name(&track.task_id, composer.format())
        )
    });
    Json(ComposeResponse {
        genre,
        task_id: track.task_id,
        track_url: track.track_url,
        local_track_url,
    })
    .into_response()
}

pub fn make_music_routes(state: ServerState) -> Router {
    Router::new()
        .route("/genre", get(get_genre))
        .route("/playlist", post(post_playlist))
        .route("/compose", post(post_compose))
        .with_state(state)
}
