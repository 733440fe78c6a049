//! Favorite service
//!
//! Idempotent membership toggle between users and items. Favorites are a
//! convenience feature: the cheap read paths (id projection, membership
//! check) degrade to empty/false on storage failure instead of propagating,
//! so a broken favorites table never blocks browsing.

use crate::db::repositories::{FavoriteRepository, ItemRepository};
use crate::models::Item;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Error types for favorite service operations
#[derive(Debug, thiserror::Error)]
pub enum FavoriteServiceError {
    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Favorite service
pub struct FavoriteService {
    repo: Arc<dyn FavoriteRepository>,
    item_repo: Arc<dyn ItemRepository>,
}

impl FavoriteService {
    /// Create a new favorite service
    pub fn new(repo: Arc<dyn FavoriteRepository>, item_repo: Arc<dyn ItemRepository>) -> Self {
        Self { repo, item_repo }
    }

    /// Toggle the favorite state for a (user, item) pair.
    ///
    /// Returns the new membership state: true when the item is now
    /// favorited, false when the toggle removed it. Concurrent toggles on
    /// the same pair are serialized by the unique row constraint - whichever
    /// interleaving occurs, no duplicate row ever persists.
    pub async fn toggle(&self, user_id: i64, item_id: i64) -> Result<bool, FavoriteServiceError> {
        if self
            .item_repo
            .get_by_id(item_id)
            .await
            .context("Failed to check item")?
            .is_none()
        {
            return Err(FavoriteServiceError::NotFound(item_id));
        }

        let existing = self
            .repo
            .find(user_id, item_id)
            .await
            .context("Failed to check favorite")?;

        if existing.is_some() {
            self.repo
                .remove(user_id, item_id)
                .await
                .context("Failed to remove favorite")?;
            Ok(false)
        } else {
            // A concurrent toggle may have inserted first; the insert is a
            // no-op then and the pair is favorited either way.
            self.repo
                .insert(user_id, item_id)
                .await
                .context("Failed to insert favorite")?;
            Ok(true)
        }
    }

    /// Item IDs favorited by the user, for cheap membership marking in
    /// listings. Failures degrade to an empty list.
    pub async fn get_user_favorite_ids(&self, user_id: i64) -> Vec<i64> {
        match self.repo.get_item_ids(user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Failed to load favorite IDs for user {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    /// Fully hydrated favorited items, most recently favorited first
    pub async fn get_user_favorites(&self, user_id: i64) -> Result<Vec<Item>, FavoriteServiceError> {
        let ids = self
            .repo
            .get_item_ids(user_id)
            .await
            .context("Failed to load favorite IDs")?;

        self.item_repo
            .list_by_ids(&ids)
            .await
            .context("Failed to load favorited items")
            .map_err(Into::into)
    }

    /// Membership check for a single pair. Failures degrade to false.
    pub async fn is_favorited(&self, user_id: i64, item_id: i64) -> bool {
        match self.repo.find(user_id, item_id).await {
            Ok(favorite) => favorite.is_some(),
            Err(e) => {
                tracing::warn!(
                    "Failed to check favorite ({}, {}): {}",
                    user_id,
                    item_id,
                    e
                );
                false
            }
        }
    }
}
