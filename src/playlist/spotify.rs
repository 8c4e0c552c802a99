//! Spotify Web API client for playlist search.
//!
//! Uses the client-credentials flow: no user context, only catalog access.
//! The access token is cached until shortly before it expires.

use super::{CatalogError, PlaylistCatalog, PlaylistSummary};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Tokens are refreshed this long before their advertised expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Deserialize)]
struct SearchResponse {
    playlists: Option<PlaylistPage>,
}

#[derive(Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<Option<SpotifyPlaylist>>,
}

#[derive(Deserialize)]
struct SpotifyPlaylist {
    name: Option<String>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct SpotifyClient {
    client: reqwest::Client,
    accounts_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(
        accounts_url: &str,
        api_url: &str,
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/api/token", self.accounts_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Auth {
                status: status.as_u16(),
                message: body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        info!("Obtained Spotify access token valid for {:?}", lifetime);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl PlaylistCatalog for SpotifyClient {
    async fn search_playlists(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistSummary>, CatalogError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/search?q={}&type=playlist&limit={}",
            self.api_url,
            urlencoding::encode(query),
            limit
        );
        debug!(query = %query, limit, "Searching Spotify playlists");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 {
            self.invalidate_token().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

        let playlists = body
            .playlists
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|playlist| {
                let url = playlist.external_urls?.spotify?;
                Some(PlaylistSummary {
                    name: playlist.name.unwrap_or_default(),
                    url,
                })
            })
            .collect();

        Ok(playlists)
    }
}
