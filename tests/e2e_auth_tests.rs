//! End-to-end tests for sessions and authentication requirements

mod common;

use common::{TestClient, TestServer, TEST_EMAIL, TEST_NAME};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_home_is_public() {
    let server = TestServer::spawn_bare().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.home().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert!(body["uptime"].as_str().unwrap().starts_with("0d "));
    assert!(body["signed_in_as"].is_null());
    assert_eq!(body["features"]["composition"], false);
    assert_eq!(body["features"]["sign_in"], false);
}

#[tokio::test]
async fn test_home_reports_enabled_features_and_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(&server, TEST_EMAIL);

    let body: Value = client.home().await.json().await.unwrap();
    assert_eq!(body["signed_in_as"], TEST_EMAIL);
    assert_eq!(body["features"]["genre_prediction"], true);
    assert_eq!(body["features"]["playlists"], true);
    assert_eq!(body["features"]["composition"], true);
}

#[tokio::test]
async fn test_protected_endpoints_require_authentication() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    assert_eq!(client.me().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.logout().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.get_profile().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.get_features().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.get_genre().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        client.find_playlist(Some("Rock")).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        client.compose(Some("Rock")).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        client.get_path("/v1/audio/task-1.wav").await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_bearer_token_identifies_user() {
    let server = TestServer::spawn_bare().await;
    let client = TestClient::authenticated(&server, TEST_EMAIL);

    let response = client.me().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], TEST_EMAIL);
    assert_eq!(body["name"], TEST_NAME);
    assert!(body["created_at"].is_string());
    // The token never leaves the server in a body
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_session_cookie_identifies_user() {
    let server = TestServer::spawn_bare().await;
    let token = server.sign_in(TEST_EMAIL);
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .get(format!("{}/v1/auth/me", server.base_url))
        .header("Cookie", format!("session_token={}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], TEST_EMAIL);
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let server = TestServer::spawn_bare().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .get(format!("{}/v1/auth/me", server.base_url))
        .header("Authorization", "Bearer not-a-real-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_session_idle_past_ttl_is_rejected() {
    let server = TestServer::spawn_bare().await;
    let client = TestClient::new(server.base_url.clone());
    let stale_token = server.sign_in_idle(TEST_EMAIL, chrono::Duration::hours(500));
    let recent_token = server.sign_in_idle(TEST_EMAIL, chrono::Duration::hours(1));

    for _ in 0..2 {
        let response = client
            .client
            .get(format!("{}/v1/auth/me", server.base_url))
            .header("Authorization", format!("Bearer {}", stale_token))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let response = client
        .client
        .get(format!("{}/v1/auth/me", server.base_url))
        .header("Authorization", format!("Bearer {}", recent_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let server = TestServer::spawn_bare().await;
    let client = TestClient::authenticated(&server, TEST_EMAIL);

    assert_eq!(client.me().await.status(), StatusCode::OK);

    let response = client.logout().await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("Logout should expire the session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("session_token=;"));

    assert_eq!(client.me().await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sign_in_unavailable_without_provider() {
    let server = TestServer::spawn_bare().await;
    let client = TestClient::new(server.base_url.clone());

    assert_eq!(
        client.oidc_login().await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    let response = client
        .oidc_callback(&[("code", "abc"), ("state", "xyz")])
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("oidc"));
}
