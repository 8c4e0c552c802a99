use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all MindTune metrics
const PREFIX: &str = "mindtune";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 300.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Auth Metrics
    pub static ref AUTH_LOGINS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_auth_logins_total"), "OIDC sign-in attempts"),
        &["status"]
    ).expect("Failed to create auth_logins_total metric");

    pub static ref AUTH_ACTIVE_SESSIONS: Gauge = Gauge::new(
        format!("{PREFIX}_auth_active_sessions"),
        "Number of active sessions"
    ).expect("Failed to create auth_active_sessions metric");

    // Music Metrics
    pub static ref GENRE_PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_genre_predictions_total"), "Genre predictions by genre and outcome"),
        &["genre", "outcome"]
    ).expect("Failed to create genre_predictions_total metric");

    pub static ref COMPOSE_JOBS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_compose_jobs_total"), "Composition jobs by outcome"),
        &["outcome"]
    ).expect("Failed to create compose_jobs_total metric");

    pub static ref COMPOSE_POLL_ERRORS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_compose_poll_errors_total"),
        "Transient errors while polling composition status"
    ).expect("Failed to create compose_poll_errors_total metric");

    pub static ref PLAYLIST_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_playlist_lookups_total"), "Playlist lookups by outcome"),
        &["outcome"]
    ).expect("Failed to create playlist_lookups_total metric");

    // Process Metrics
    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGINS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_ACTIVE_SESSIONS.clone()));
    let _ = REGISTRY.register(Box::new(GENRE_PREDICTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(COMPOSE_JOBS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(COMPOSE_POLL_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PLAYLIST_LOOKUPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses ids out of paths so label cardinality stays bounded.
pub fn categorize_endpoint(path: &str) -> &'static str {
    if path.starts_with("/v1/auth") {
        "auth"
    } else if path.starts_with("/v1/profile") {
        "profile"
    } else if path.starts_with("/v1/music") {
        "music"
    } else if path.starts_with("/v1/audio") {
        "audio"
    } else if path == "/" {
        "home"
    } else {
        "other"
    }
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_login(status: &str) {
    AUTH_LOGINS_TOTAL.with_label_values(&[status]).inc();
}

pub fn set_active_sessions(count: usize) {
    AUTH_ACTIVE_SESSIONS.set(count as f64);
}

pub fn record_genre_prediction(genre: &str, outcome: &str) {
    GENRE_PREDICTIONS_TOTAL
        .with_label_values(&[genre, outcome])
        .inc();
}

pub fn record_compose_job(outcome: &str) {
    COMPOSE_JOBS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_compose_poll_error() {
    COMPOSE_POLL_ERRORS_TOTAL.inc();
}

pub fn record_playlist_lookup(outcome: &str) {
    PLAYLIST_LOOKUPS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
