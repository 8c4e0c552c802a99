//! Request logging middleware

use super::super::state::ServerState;
use crate::server::metrics::{categorize_endpoint, record_http_request};
use axum::extract::State;
use axum::{
    body::Body,
    http::{header::HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
    Headers,
    Body,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

enum ContentLength {
    Known(usize),
    Unknown(&'static str),
}

fn parse_content_length(headers: &HeaderMap) -> ContentLength {
    let Some(value) = headers.get("content-length") else {
        return ContentLength::Unknown("Content-length not set.");
    };
    let Ok(str_value) = value.to_str() else {
        return ContentLength::Unknown("Could not get Content-length string value.");
    };
    match str_value.parse::<usize>() {
        Ok(size) => ContentLength::Known(size),
        Err(_) => ContentLength::Unknown("Could not parse Content-length numeric value."),
    }
}

/// Buffers a small body so it can be logged, returning the rebuilt body.
/// Bodies above the limit or without a length are left untouched.
async fn log_body(label: &str, headers: &HeaderMap, body: Body) -> Result<Body, Response> {
    match parse_content_length(headers) {
        ContentLength::Unknown(reason) => {
            info!("  {} Body: {}", label, reason);
            Ok(body)
        }
        ContentLength::Known(size) if size < MAX_LOGGABLE_BODY_LENGTH => {
            let bytes = axum::body::to_bytes(body, size).await.map_err(|err| {
                error!("Failed to read {} body: {:?}", label, err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })?;
            info!("  {} Body:\n{}", label, String::from_utf8_lossy(&bytes));
            Ok(Body::from(bytes))
        }
        ContentLength::Known(size) => {
            info!(
                "  {} Body: Too big to log ({:#})",
                label,
                byte_unit::Byte::from(size)
            );
            Ok(body)
        }
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, request.uri());
    }

    if level >= RequestsLoggingLevel::Headers {
        info!("  Req Headers:");
        for (name, value) in request.headers().iter() {
            info!("    {:?}: {:?}", name, value);
        }
    }

    let request = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        match log_body("Req", &parts.headers, body).await {
            Ok(body) => Request::from_parts(parts, body),
            Err(response) => return response,
        }
    } else {
        request
    };

    let response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        info!("  Resp Headers:");
        for (name, value) in response.headers().iter() {
            info!("    {:?}: {:?}", name, value);
        }
    }

    let response = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        match log_body("Resp", &parts.headers, body).await {
            Ok(body) => Response::from_parts(parts, body),
            Err(response) => return response,
        }
    } else {
        response
    };

    let status = response.status().as_u16();
    let duration = start.elapsed();

    if level > RequestsLoggingLevel::None {
        info!("<<< {} ({}ms)", status, duration.as_millis());
    }

    record_http_request(&method, categorize_endpoint(&path), status, duration);

    response
}
