use super::state::ServerState;
use crate::session::UserSession;

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

/// The signed-in user behind a request.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub name: Option<String>,
}

impl From<UserSession> for Session {
    fn from(session: UserSession) -> Self {
        Session {
            token: session.token,
            email: session.email,
            name: session.name,
        }
    }
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    AccessDenied,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(|s| s.to_string())
}

/// Accepts both a bare token and `Bearer <token>`.
fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(HEADER_SESSION_TOKEN_KEY)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_session_from_request_parts(parts: &Parts, ctx: &ServerState) -> Option<Session> {
    let token = match extract_session_token_from_cookies(parts)
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return None;
        }
        Some(x) => x,
    };

    match ctx.session_store.get(&token) {
        Some(session) => {
            debug!("Found session for {}", session.email);
            Some(session.into())
        }
        None => {
            debug!("Session token not found");
            None
        }
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx).ok_or(SessionExtractionError::AccessDenied)
    }
}

impl FromRequestParts<ServerState> for Option<Session> {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx))
    }
}

/// Middleware for routes that are not handlers themselves, like static audio.
pub async fn require_session(_session: Session, request: Request, next: Next) -> Response {
    next.run(request).await
}
