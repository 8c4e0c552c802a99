//! In-process stand-ins for the upstream services
//!
//! One axum server answers for the genre model, Spotify (accounts and Web
//! API) and Beatoven, each under its own path prefix. Tests steer the
//! answers through the shared script fields.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// How the fake composer treats submitted tasks.
#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum ComposeScript {
    /// Reports "composing" for this many polls, then "composed".
    ComposedAfter(u32),
    /// Reports "composing" for this many polls, then "failed".
    FailedAfter(u32),
    /// Never leaves "composing".
    NeverFinishes,
    /// Rejects the submission.
    RejectSubmission,
}

#[derive(Clone)]
struct FakeState {
    base_url: String,
    predicted_class: Arc<Mutex<Option<i64>>>,
    playlists: Arc<Mutex<Vec<(String, String)>>>,
    search_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    compose_script: Arc<Mutex<ComposeScript>>,
    submissions: Arc<Mutex<Vec<Value>>>,
    polls: Arc<Mutex<HashMap<String, u32>>>,
}

/// Handle to the running fake upstreams.
pub struct FakeUpstreams {
    pub base_url: String,
    state: FakeState,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl FakeUpstreams {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = FakeState {
            base_url: base_url.clone(),
            predicted_class: Arc::new(Mutex::new(Some(0))),
            playlists: Arc::new(Mutex::new(vec![])),
            search_queries: Arc::new(Mutex::new(vec![])),
            compose_script: Arc::new(Mutex::new(ComposeScript::ComposedAfter(1))),
            submissions: Arc::new(Mutex::new(vec![])),
            polls: Arc::new(Mutex::new(HashMap::new())),
        };

        let app = Router::new()
            .route("/model/predict", post(predict))
            .route("/spotify-accounts/api/token", post(token))
            .route("/spotify/search", get(search))
            .route("/beatoven/tracks/compose", post(compose))
            .route("/beatoven/tasks/{task_id}", get(task_status))
            .route("/files/{name}", get(download))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake upstreams failed");
        });

        Self {
            base_url,
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn model_url(&self) -> String {
        format!("{}/model/predict", self.base_url)
    }

    pub fn spotify_accounts_url(&self) -> String {
        format!("{}/spotify-accounts", self.base_url)
    }

    pub fn spotify_api_url(&self) -> String {
        format!("{}/spotify", self.base_url)
    }

    pub fn beatoven_url(&self) -> String {
        format!("{}/beatoven", self.base_url)
    }

    /// `None` makes the model answer 500.
    pub fn set_predicted_class(&self, class: Option<i64>) {
        *self.state.predicted_class.lock().unwrap() = class;
    }

    pub fn set_playlists(&self, playlists: &[(&str, &str)]) {
        *self.state.playlists.lock().unwrap() = playlists
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect();
    }

    pub fn search_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.search_queries.lock().unwrap().clone()
    }

    pub fn set_compose_script(&self, script: ComposeScript) {
        *self.state.compose_script.lock().unwrap() = script;
    }

    pub fn submissions(&self) -> Vec<Value> {
        self.state.submissions.lock().unwrap().clone()
    }

    pub fn poll_count(&self, task_id: &str) -> u32 {
        self.state
            .polls
            .lock()
            .unwrap()
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for FakeUpstreams {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn predict(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    let rows = body["instances"].as_array().map(Vec::len).unwrap_or(0);
    match *state.predicted_class.lock().unwrap() {
        Some(class) => Json(json!({ "predictions": vec![class; rows] })).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "model unavailable").into_response(),
    }
}

async fn token() -> Json<Value> {
    Json(json!({
        "access_token": "fake-spotify-token",
        "token_type": "Bearer",
        "expires_in": 3600
    }))
}

async fn search(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(20);
    state.search_queries.lock().unwrap().push(params);

    let items: Vec<Value> = state
        .playlists
        .lock()
        .unwrap()
        .iter()
        .take(limit)
        .map(|(name, url)| json!({ "name": name, "external_urls": { "spotify": url } }))
        .collect();
    Json(json!({ "playlists": { "items": items } }))
}

async fn compose(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    let script = *state.compose_script.lock().unwrap();
    if let ComposeScript::RejectSubmission = script {
        return (StatusCode::BAD_REQUEST, "bad prompt").into_response();
    }

    let mut submissions = state.submissions.lock().unwrap();
    submissions.push(body);
    let task_id = format!("task-{}", submissions.len());
    Json(json!({ "status": "started", "task_id": task_id })).into_response()
}

async fn task_status(State(state): State<FakeState>, Path(task_id): Path<String>) -> Json<Value> {
    let poll = {
        let mut polls = state.polls.lock().unwrap();
        let count = polls.entry(task_id.clone()).or_insert(0);
        *count += 1;
        *count
    };

    let script = *state.compose_script.lock().unwrap();
    let composing = json!({ "status": "composing" });
    Json(match script {
        ComposeScript::ComposedAfter(n) if poll > n => json!({
            "status": "composed",
            "meta": { "track_url": format!("{}/files/{}.wav", state.base_url, task_id) }
        }),
        ComposeScript::FailedAfter(n) if poll > n => json!({ "status": "failed" }),
        _ => composing,
    })
}

async fn download(Path(name): Path<String>) -> Response {
    if name.ends_with(".wav") {
        (StatusCode::OK, b"RIFF-fake-audio".to_vec()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}
