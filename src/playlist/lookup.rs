use super::{CatalogError, PlaylistCatalog, PlaylistSummary};
use crate::genre::Genre;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Picks a public playlist for a genre.
#[derive(Clone)]
pub struct PlaylistLookup {
    catalog: Arc<dyn PlaylistCatalog>,
    page_size: usize,
}

impl PlaylistLookup {
    pub fn new(catalog: Arc<dyn PlaylistCatalog>, page_size: usize) -> Self {
        Self {
            catalog,
            page_size: page_size.max(1),
        }
    }

    pub async fn find_playlist(
        &self,
        genre: Genre,
    ) -> Result<Option<PlaylistSummary>, CatalogError> {
        let page = self.search(genre).await?;
        Ok(page.choose(&mut rand::rng()).cloned())
    }

    /// Same as [`find_playlist`](Self::find_playlist) with a caller-provided
    /// random source.
    pub async fn find_playlist_with_rng<R: Rng + Send>(
        &self,
        genre: Genre,
        rng: &mut R,
    ) -> Result<Option<PlaylistSummary>, CatalogError> {
        let page = self.search(genre).await?;
        Ok(page.choose(rng).cloned())
    }

    async fn search(&self, genre: Genre) -> Result<Vec<PlaylistSummary>, CatalogError> {
        let page = self
            .catalog
            .search_playlists(genre.as_str(), self.page_size)
            .await?;
        debug!(genre = %genre, results = page.len(), "Playlist search finished");
        Ok(page)
    }
}
