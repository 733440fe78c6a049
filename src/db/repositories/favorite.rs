//! Favorite repository
//!
//! Database operations for the user/item favorite relation. The unique
//! (user_id, item_id) constraint guarantees no duplicate row can persist,
//! whatever interleaving concurrent toggles arrive in; inserts ignore the
//! conflict instead of failing.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Favorite;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Favorite repository trait
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Get the favorite row for the pair, if present
    async fn find(&self, user_id: i64, item_id: i64) -> Result<Option<Favorite>>;

    /// Insert a favorite row. A concurrent duplicate insert is ignored;
    /// returns whether a new row was actually created.
    async fn insert(&self, user_id: i64, item_id: i64) -> Result<bool>;

    /// Remove the favorite row for the pair. Returns whether a row existed.
    async fn remove(&self, user_id: i64, item_id: i64) -> Result<bool>;

    /// Item IDs favorited by the user, most recently favorited first
    async fn get_item_ids(&self, user_id: i64) -> Result<Vec<i64>>;
}

/// SQLx-based favorite repository implementation
pub struct SqlxFavoriteRepository {
    pool: DynDatabasePool,
}

impl SqlxFavoriteRepository {
    /// Create a new SQLx favorite repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FavoriteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FavoriteRepository for SqlxFavoriteRepository {
    async fn find(&self, user_id: i64, item_id: i64) -> Result<Option<Favorite>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_sqlite(self.pool.as_sqlite().unwrap(), user_id, item_id).await
            }
            DatabaseDriver::Mysql => {
                find_mysql(self.pool.as_mysql().unwrap(), user_id, item_id).await
            }
        }
    }

    async fn insert(&self, user_id: i64, item_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_sqlite(self.pool.as_sqlite().unwrap(), user_id, item_id).await
            }
            DatabaseDriver::Mysql => {
                insert_mysql(self.pool.as_mysql().unwrap(), user_id, item_id).await
            }
        }
    }

    async fn remove(&self, user_id: i64, item_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                remove_sqlite(self.pool.as_sqlite().unwrap(), user_id, item_id).await
            }
            DatabaseDriver::Mysql => {
                remove_mysql(self.pool.as_mysql().unwrap(), user_id, item_id).await
            }
        }
    }

    async fn get_item_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_item_ids_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                get_item_ids_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn find_sqlite(pool: &SqlitePool, user_id: i64, item_id: i64) -> Result<Option<Favorite>> {
    let row = sqlx::query(
        "SELECT id, user_id, item_id, created_at FROM favorites WHERE user_id = ? AND item_id = ?",
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(pool)
    .await
    .context("Failed to look up favorite")?;

    Ok(row.map(|r| Favorite {
        id: r.get("id"),
        user_id: r.get("user_id"),
        item_id: r.get("item_id"),
        created_at: r.get("created_at"),
    }))
}

async fn insert_sqlite(pool: &SqlitePool, user_id: i64, item_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO favorites (user_id, item_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(item_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to insert favorite")?;

    Ok(result.rows_affected() > 0)
}

async fn remove_sqlite(pool: &SqlitePool, user_id: i64, item_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND item_id = ?")
        .bind(user_id)
        .bind(item_id)
        .execute(pool)
        .await
        .context("Failed to remove favorite")?;

    Ok(result.rows_affected() > 0)
}

async fn get_item_ids_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT item_id FROM favorites WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to get favorite item IDs")?;

    Ok(rows.iter().map(|r| r.get("item_id")).collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn find_mysql(pool: &MySqlPool, user_id: i64, item_id: i64) -> Result<Option<Favorite>> {
    let row = sqlx::query(
        "SELECT id, user_id, item_id, created_at FROM favorites WHERE user_id = ? AND item_id = ?",
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(pool)
    .await
    .context("Failed to look up favorite")?;

    Ok(row.map(|r| Favorite {
        id: r.get("id"),
        user_id: r.get("user_id"),
        item_id: r.get("item_id"),
        created_at: r.get("created_at"),
    }))
}

async fn insert_mysql(pool: &MySqlPool, user_id: i64, item_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT IGNORE INTO favorites (user_id, item_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(item_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to insert favorite")?;

    Ok(result.rows_affected() > 0)
}

async fn remove_mysql(pool: &MySqlPool, user_id: i64, item_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND item_id = ?")
        .bind(user_id)
        .bind(item_id)
        .execute(pool)
        .await
        .context("Failed to remove favorite")?;

    Ok(result.rows_affected() > 0)
}

async fn get_item_ids_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT item_id FROM favorites WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to get favorite item IDs")?;

    Ok(rows.iter().map(|r| r.get("item_id")).collect())
}
