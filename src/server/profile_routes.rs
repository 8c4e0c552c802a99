use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use super::responses::json_error;
use super::session::Session;
use super::state::*;
use crate::profile::{normalize, MoodReport, UserProfile};

fn load_profile(store: &GuardedProfileStore, email: &str) -> Result<UserProfile, Response> {
    match store.get_profile(email) {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => Err(json_error(StatusCode::NOT_FOUND, "No profile for this user")),
        Err(err) => {
            error!("Failed to load profile of {}: {:#}", email, err);
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

fn save_profile(store: &GuardedProfileStore, email: &str, profile: &UserProfile) -> Response {
    match store.save_profile(email, profile) {
        Ok(()) => Json(profile.to_document()).into_response(),
        Err(err) => {
            error!("Failed to save profile of {}: {:#}", email, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_profile(session: Session, State(store): State<GuardedProfileStore>) -> Response {
    match store.get_document(&session.email) {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "No profile for this user"),
        Err(err) => {
            error!("Failed to read profile of {}: {:#}", session.email, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn put_profile(
    session: Session,
    State(store): State<GuardedProfileStore>,
    Json(body): Json<Value>,
) -> Response {
    let profile = match UserProfile::from_document(&body) {
        Ok(profile) => profile,
        Err(err) => return json_error(StatusCode::BAD_REQUEST, err.to_string()),
    };
    debug!("Replacing profile of {}", session.email);
    save_profile(&store, &session.email, &profile)
}

async fn put_mood(
    session: Session,
    State(store): State<GuardedProfileStore>,
    Json(mood): Json<MoodReport>,
) -> Response {
    if let Err(err) = mood.validate() {
        return json_error(StatusCode::BAD_REQUEST, err.to_string());
    }
    let mut profile = match load_profile(&store, &session.email) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    profile.apply_mood(&mood, chrono::Utc::now());
    save_profile(&store, &session.email, &profile)
}

async fn get_features(session: Session, State(store): State<GuardedProfileStore>) -> Response {
    let profile = match load_profile(&store, &session.email) {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    let features = normalize(&profile);

    let named: Map<String, Value> = features
        .named()
        .into_iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();
    Json(json!({
        "features": named,
        "vector": features,
    }))
    .into_response()
}

pub fn make_profile_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(get_profile))
        .route("/", put(put_profile))
        .route("/mood", put(put_mood))
        .route("/features", get(get_features))
        .with_state(state)
}
