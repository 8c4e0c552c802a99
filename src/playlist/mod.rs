//! Playlist lookup against a music catalog.

mod lookup;
mod spotify;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use lookup::{PlaylistLookup, DEFAULT_PAGE_SIZE};
pub use spotify::{SpotifyClient, DEFAULT_SPOTIFY_ACCOUNTS_URL, DEFAULT_SPOTIFY_API_URL};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Connection to catalog failed: {0}")]
    Transport(String),

    #[error("Catalog authentication failed (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Catalog error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),
}

/// A public playlist, reduced to what the app shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistSummary {
    pub name: String,
    pub url: String,
}

#[async_trait]
pub trait PlaylistCatalog: Send + Sync {
    /// Returns at most `limit` playlists matching `query`.
    async fn search_playlists(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistSummary>, CatalogError>;
}
