//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for all server endpoints.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use super::server::TestServer;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

/// HTTP test client, optionally carrying a session token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Session token sent as a bearer token, if signed in
    pub token: Option<String>,
}

#[allow(dead_code)]
impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client signed in as `email`
    pub fn authenticated(server: &TestServer, email: &str) -> Self {
        let token = server.sign_in(email);
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid token"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url: server.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Home and Auth Endpoints
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /v1/auth/me
    pub async fn me(&self) -> Response {
        self.client
            .get(self.url("/v1/auth/me"))
            .send()
            .await
            .expect("Me request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(self.url("/v1/auth/logout"))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /v1/auth/oidc/login
    pub async fn oidc_login(&self) -> Response {
        self.client
            .get(self.url("/v1/auth/oidc/login"))
            .send()
            .await
            .expect("OIDC login request failed")
    }

    /// GET /v1/auth/oidc/callback
    pub async fn oidc_callback(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(self.url("/v1/auth/oidc/callback"))
            .query(query)
            .send()
            .await
            .expect("OIDC callback request failed")
    }

    // ========================================================================
    // Profile Endpoints
    // ========================================================================

    /// GET /v1/profile
    pub async fn get_profile(&self) -> Response {
        self.client
            .get(self.url("/v1/profile"))
            .send()
            .await
            .expect("Get profile request failed")
    }

    /// PUT /v1/profile
    pub async fn put_profile(&self, document: &Value) -> Response {
        self.client
            .put(self.url("/v1/profile"))
            .json(document)
            .send()
            .await
            .expect("Put profile request failed")
    }

    /// PUT /v1/profile/mood
    pub async fn put_mood(&self, mood: &Value) -> Response {
        self.client
            .put(self.url("/v1/profile/mood"))
            .json(mood)
            .send()
            .await
            .expect("Put mood request failed")
    }

    /// GET /v1/profile/features
    pub async fn get_features(&self) -> Response {
        self.client
            .get(self.url("/v1/profile/features"))
            .send()
            .await
            .expect("Get features request failed")
    }

    // ========================================================================
    // Music Endpoints
    // ========================================================================

    /// GET /v1/music/genre
    pub async fn get_genre(&self) -> Response {
        self.client
            .get(self.url("/v1/music/genre"))
            .send()
            .await
            .expect("Get genre request failed")
    }

    /// POST /v1/music/playlist
    pub async fn find_playlist(&self, genre: Option<&str>) -> Response {
        let mut request = self.client.post(self.url("/v1/music/playlist"));
        if let Some(genre) = genre {
            request = request.query(&[("genre", genre)]);
        }
        request.send().await.expect("Playlist request failed")
    }

    /// POST /v1/music/compose
    pub async fn compose(&self, genre: Option<&str>) -> Response {
        let mut request = self.client.post(self.url("/v1/music/compose"));
        if let Some(genre) = genre {
            request = request.query(&[("genre", genre)]);
        }
        request.send().await.expect("Compose request failed")
    }

    /// GET on an arbitrary path, e.g. a delivered track
    pub async fn get_path(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }
}
