use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::metrics::record_login;
use super::responses::{json_error, not_configured};
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::*;
use crate::session::UserSession;

#[derive(Deserialize, Debug)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn oidc_login(
    State(oidc_client): State<OptionalOidcClient>,
    State(auth_states): State<GuardedAuthStateStore>,
) -> Response {
    let Some(client) = oidc_client else {
        return not_configured("Sign-in", "oidc");
    };

    auth_states.cleanup_expired().await;
    let (url, auth_state) = client.authorize_url();
    auth_states.store(auth_state).await;

    Redirect::to(&url).into_response()
}

async fn oidc_callback(
    State(state): State<ServerState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(client) = state.oidc_client.clone() else {
        return not_configured("Sign-in", "oidc");
    };

    if let Some(provider_error) = params.error {
        warn!(
            "Provider rejected sign-in: {} {}",
            provider_error,
            params.error_description.unwrap_or_default()
        );
        record_login("rejected");
        return json_error(StatusCode::UNAUTHORIZED, "Sign-in was rejected by the provider");
    }

    let (Some(code), Some(csrf)) = (params.code, params.state) else {
        return json_error(StatusCode::BAD_REQUEST, "Missing code or state");
    };

    let Some(stored) = state.auth_state_store.take(&csrf).await else {
        record_login("invalid_state");
        return json_error(StatusCode::BAD_REQUEST, "Unknown or expired sign-in state");
    };

    let identity = match client.exchange_code(&code, &csrf, &stored).await {
        Ok(identity) => identity,
        Err(err) => {
            error!("OIDC code exchange failed: {:#}", err);
            record_login("failure");
            return json_error(StatusCode::UNAUTHORIZED, "Sign-in failed");
        }
    };

    let session = UserSession::new(identity.email, identity.name);
    let token = session.token.clone();
    info!("{} signed in", session.email);
    state.session_store.set(session);
    record_login("success");

    let max_age = time::Duration::seconds(state.config.session_ttl.as_secs() as i64);
    let cookie = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, token))
        .path("/")
        .http_only(true)
        .max_age(max_age)
        .same_site(SameSite::Lax)
        .build();

    (jar.add(cookie), Redirect::to("/")).into_response()
}

async fn logout(State(state): State<ServerState>, jar: CookieJar, session: Session) -> Response {
    state.session_store.clear(&session.token);
    info!("{} signed out", session.email);

    let cookie = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
        .same_site(SameSite::Lax)
        .build();

    (jar.add(cookie), StatusCode::OK).into_response()
}

async fn me(State(state): State<ServerState>, session: Session) -> Response {
    match state.session_store.get(&session.token) {
        Some(user_session) => Json(user_session).into_response(),
        // Logged out concurrently.
        None => StatusCode::FORBIDDEN.into_response(),
    }
}

pub fn make_auth_routes(state: ServerState) -> Router {
    Router::new()
        .route("/oidc/login", get(oidc_login))
        .route("/oidc/callback", get(oidc_callback))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .with_state(state)
}
