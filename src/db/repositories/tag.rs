//! Tag repository
//!
//! Database operations for tags and their item associations.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL
//!
//! The tags table carries unique constraints on both name and slug; slug
//! uniqueness is the de-duplication guard for concurrent find-or-create
//! calls. Usage counts are recomputed in full from the item_tags join table
//! by `recount_usage`, never incremented in place.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag. Fails on duplicate name or slug.
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// List tags ordered by usage count descending, capped at limit
    async fn list(&self, limit: usize) -> Result<Vec<Tag>>;

    /// Tags with usage_count > 0, ordered by usage count descending
    async fn get_popular(&self, limit: usize) -> Result<Vec<Tag>>;

    /// Case-insensitive substring search on name, ordered by usage count
    /// descending. The query string must already be lowercased.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Tag>>;

    /// Associate tag with item (no-op when the association exists)
    async fn add_to_item(&self, tag_id: i64, item_id: i64) -> Result<()>;

    /// Remove tag from item
    async fn remove_from_item(&self, tag_id: i64, item_id: i64) -> Result<()>;

    /// Get tags for an item, ordered by name
    async fn get_by_item_id(&self, item_id: i64) -> Result<Vec<Tag>>;

    /// IDs of items associated with a tag, newest association first
    async fn get_item_ids_by_tag(&self, tag_id: i64) -> Result<Vec<i64>>;

    /// Recompute usage_count for every tag from the item_tags join table
    async fn recount_usage(&self) -> Result<()>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), tag).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), tag).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => get_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await,
        }
    }

    async fn list(&self, limit: usize) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), limit).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn get_popular(&self, limit: usize) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_popular_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => get_popular_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                search_sqlite(self.pool.as_sqlite().unwrap(), query, limit).await
            }
            DatabaseDriver::Mysql => {
                search_mysql(self.pool.as_mysql().unwrap(), query, limit).await
            }
        }
    }

    async fn add_to_item(&self, tag_id: i64, item_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_to_item_sqlite(self.pool.as_sqlite().unwrap(), tag_id, item_id).await
            }
            DatabaseDriver::Mysql => {
                add_to_item_mysql(self.pool.as_mysql().unwrap(), tag_id, item_id).await
            }
        }
    }

    async fn remove_from_item(&self, tag_id: i64, item_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                remove_from_item_sqlite(self.pool.as_sqlite().unwrap(), tag_id, item_id).await
            }
            DatabaseDriver::Mysql => {
                remove_from_item_mysql(self.pool.as_mysql().unwrap(), tag_id, item_id).await
            }
        }
    }

    async fn get_by_item_id(&self, item_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_item_id_sqlite(self.pool.as_sqlite().unwrap(), item_id).await
            }
            DatabaseDriver::Mysql => {
                get_by_item_id_mysql(self.pool.as_mysql().unwrap(), item_id).await
            }
        }
    }

    async fn get_item_ids_by_tag(&self, tag_id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_item_ids_sqlite(self.pool.as_sqlite().unwrap(), tag_id).await
            }
            DatabaseDriver::Mysql => {
                get_item_ids_mysql(self.pool.as_mysql().unwrap(), tag_id).await
            }
        }
    }

    async fn recount_usage(&self) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => recount_usage_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => recount_usage_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

const TAG_COLUMNS: &str = "id, name, slug, usage_count, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO tags (name, slug, usage_count, created_at) VALUES (?, ?, 0, ?)",
    )
    .bind(&tag.name)
    .bind(&tag.slug)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        name: tag.name.clone(),
        slug: tag.slug.clone(),
        usage_count: 0,
        created_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    Ok(row.map(|r| row_to_tag_sqlite(&r)))
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(&format!("SELECT {} FROM tags WHERE slug = ?", TAG_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    Ok(row.map(|r| row_to_tag_sqlite(&r)))
}

async fn list_sqlite(pool: &SqlitePool, limit: usize) -> Result<Vec<Tag>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tags ORDER BY usage_count DESC, name ASC LIMIT ?",
        TAG_COLUMNS
    ))
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn get_popular_sqlite(pool: &SqlitePool, limit: usize) -> Result<Vec<Tag>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tags WHERE usage_count > 0 ORDER BY usage_count DESC, name ASC LIMIT ?",
        TAG_COLUMNS
    ))
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to get popular tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn search_sqlite(pool: &SqlitePool, query: &str, limit: usize) -> Result<Vec<Tag>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tags WHERE name LIKE ? ORDER BY usage_count DESC, name ASC LIMIT ?",
        TAG_COLUMNS
    ))
    .bind(format!("%{}%", query))
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to search tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn add_to_item_sqlite(pool: &SqlitePool, tag_id: i64, item_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?, ?)")
        .bind(item_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to add tag to item")?;

    Ok(())
}

async fn remove_from_item_sqlite(pool: &SqlitePool, tag_id: i64, item_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM item_tags WHERE item_id = ? AND tag_id = ?")
        .bind(item_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to remove tag from item")?;

    Ok(())
}

async fn get_by_item_id_sqlite(pool: &SqlitePool, item_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.slug, t.usage_count, t.created_at
        FROM tags t
        INNER JOIN item_tags it ON t.id = it.tag_id
        WHERE it.item_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(item_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags by item")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn get_item_ids_sqlite(pool: &SqlitePool, tag_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT item_id FROM item_tags WHERE tag_id = ? ORDER BY created_at DESC, item_id DESC",
    )
    .bind(tag_id)
    .fetch_all(pool)
    .await
    .context("Failed to get item IDs by tag")?;

    Ok(rows.iter().map(|r| r.get("item_id")).collect())
}

async fn recount_usage_sqlite(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tags
        SET usage_count = (SELECT COUNT(*) FROM item_tags WHERE item_tags.tag_id = tags.id)
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to recount tag usage")?;

    Ok(())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        usage_count: row.get("usage_count"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO tags (name, slug, usage_count, created_at) VALUES (?, ?, 0, ?)",
    )
    .bind(&tag.name)
    .bind(&tag.slug)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        name: tag.name.clone(),
        slug: tag.slug.clone(),
        usage_count: 0,
        created_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    Ok(row.map(|r| row_to_tag_mysql(&r)))
}

async fn get_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(&format!("SELECT {} FROM tags WHERE slug = ?", TAG_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    Ok(row.map(|r| row_to_tag_mysql(&r)))
}

async fn list_mysql(pool: &MySqlPool, limit: usize) -> Result<Vec<Tag>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tags ORDER BY usage_count DESC, name ASC LIMIT ?",
        TAG_COLUMNS
    ))
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn get_popular_mysql(pool: &MySqlPool, limit: usize) -> Result<Vec<Tag>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tags WHERE usage_count > 0 ORDER BY usage_count DESC, name ASC LIMIT ?",
        TAG_COLUMNS
    ))
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to get popular tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn search_mysql(pool: &MySqlPool, query: &str, limit: usize) -> Result<Vec<Tag>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tags WHERE name LIKE ? ORDER BY usage_count DESC, name ASC LIMIT ?",
        TAG_COLUMNS
    ))
    .bind(format!("%{}%", query))
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to search tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn add_to_item_mysql(pool: &MySqlPool, tag_id: i64, item_id: i64) -> Result<()> {
    sqlx::query("INSERT IGNORE INTO item_tags (item_id, tag_id) VALUES (?, ?)")
        .bind(item_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to add tag to item")?;

    Ok(())
}

async fn remove_from_item_mysql(pool: &MySqlPool, tag_id: i64, item_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM item_tags WHERE item_id = ? AND tag_id = ?")
        .bind(item_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to remove tag from item")?;

    Ok(())
}

async fn get_by_item_id_mysql(pool: &MySqlPool, item_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.slug, t.usage_count, t.created_at
        FROM tags t
        INNER JOIN item_tags it ON t.id = it.tag_id
        WHERE it.item_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(item_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags by item")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn get_item_ids_mysql(pool: &MySqlPool, tag_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT item_id FROM item_tags WHERE tag_id = ? ORDER BY created_at DESC, item_id DESC",
    )
    .bind(tag_id)
    .fetch_all(pool)
    .await
    .context("Failed to get item IDs by tag")?;

    Ok(rows.iter().map(|r| r.get("item_id")).collect())
}

async fn recount_usage_mysql(pool: &MySqlPool) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tags
        SET usage_count = (SELECT COUNT(*) FROM item_tags WHERE item_tags.tag_id = tags.id)
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to recount tag usage")?;

    Ok(())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        usage_count: row.get("usage_count"),
        created_at: row.get("created_at"),
    }
}
