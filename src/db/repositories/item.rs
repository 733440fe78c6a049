//! Item repository
//!
//! Database operations for shared items (snippets, files, links). The three
//! variants live in one table with an `item_type` discriminant; variant
//! columns are nullable and reconstructed into `ItemKind` on read.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateItemInput, Item, ItemKind};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Item repository trait
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Create a new item owned by the given author
    async fn create(&self, author_id: i64, input: &CreateItemInput) -> Result<Item>;

    /// Get item by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Item>>;

    /// List all items, newest first
    async fn list(&self) -> Result<Vec<Item>>;

    /// List items matching the given IDs, preserving input order
    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Item>>;

    /// Persist all mutable fields of an item
    async fn update(&self, item: &Item) -> Result<Item>;

    /// Delete an item. Returns false when the item does not exist.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count all items
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based item repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxItemRepository {
    pool: DynDatabasePool,
}

impl SqlxItemRepository {
    /// Create a new SQLx item repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ItemRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ItemRepository for SqlxItemRepository {
    async fn create(&self, author_id: i64, input: &CreateItemInput) -> Result<Item> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().unwrap(), author_id, input).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().unwrap(), author_id, input).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Item>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Item>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_ids_sqlite(self.pool.as_sqlite().unwrap(), ids).await,
            DatabaseDriver::Mysql => list_by_ids_mysql(self.pool.as_mysql().unwrap(), ids).await,
        }?;

        // Preserve the caller's ordering (e.g. reverse-chronological favorites)
        let mut ordered = Vec::with_capacity(items.len());
        for id in ids {
            if let Some(item) = items.iter().find(|i| i.id == *id) {
                ordered.push(item.clone());
            }
        }
        Ok(ordered)
    }

    async fn update(&self, item: &Item) -> Result<Item> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), item).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), item).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

const ITEM_COLUMNS: &str = "id, item_type, title, description, category, author_id, language, \
     code, file_name, file_size, file_extension, download_url, url, repository, website, \
     youtube, created_at, updated_at";

/// Variant payload flattened into the nullable column set
#[derive(Default)]
struct KindColumns<'a> {
    language: Option<&'a str>,
    code: Option<&'a str>,
    file_name: Option<&'a str>,
    file_size: Option<&'a str>,
    file_extension: Option<&'a str>,
    download_url: Option<&'a str>,
    url: Option<&'a str>,
}

fn kind_columns(kind: &ItemKind) -> KindColumns<'_> {
    match kind {
        ItemKind::Snippet { language, code } => KindColumns {
            language: Some(language),
            code: Some(code),
            ..Default::default()
        },
        ItemKind::File {
            file_name,
            file_size,
            file_extension,
            download_url,
        } => KindColumns {
            file_name: Some(file_name),
            file_size: Some(file_size),
            file_extension: Some(file_extension),
            download_url: Some(download_url),
            ..Default::default()
        },
        ItemKind::Link { url } => KindColumns {
            url: Some(url),
            ..Default::default()
        },
    }
}

fn kind_from_columns(
    item_type: &str,
    language: Option<String>,
    code: Option<String>,
    file_name: Option<String>,
    file_size: Option<String>,
    file_extension: Option<String>,
    download_url: Option<String>,
    url: Option<String>,
) -> Result<ItemKind> {
    match item_type {
        "snippet" => Ok(ItemKind::Snippet {
            language: language.context("snippet row missing language")?,
            code: code.context("snippet row missing code")?,
        }),
        "file" => Ok(ItemKind::File {
            file_name: file_name.context("file row missing file_name")?,
            file_size: file_size.context("file row missing file_size")?,
            file_extension: file_extension.context("file row missing file_extension")?,
            download_url: download_url.context("file row missing download_url")?,
        }),
        "link" => Ok(ItemKind::Link {
            url: url.context("link row missing url")?,
        }),
        other => bail!("Unknown item type in database: {}", other),
    }
}

fn ids_placeholders(len: usize) -> String {
    vec!["?"; len].join(", ")
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, author_id: i64, input: &CreateItemInput) -> Result<Item> {
    let now = Utc::now();
    let cols = kind_columns(&input.kind);

    let result = sqlx::query(
        r#"
        INSERT INTO items (item_type, title, description, category, author_id, language, code,
                           file_name, file_size, file_extension, download_url, url,
                           repository, website, youtube, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.kind.type_name())
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.category)
    .bind(author_id)
    .bind(cols.language)
    .bind(cols.code)
    .bind(cols.file_name)
    .bind(cols.file_size)
    .bind(cols.file_extension)
    .bind(cols.download_url)
    .bind(cols.url)
    .bind(&input.repository)
    .bind(&input.website)
    .bind(&input.youtube)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create item")?;

    Ok(Item {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        description: input.description.clone(),
        category: input.category.clone(),
        author_id,
        kind: input.kind.clone(),
        repository: input.repository.clone(),
        website: input.website.clone(),
        youtube: input.youtube.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Item>> {
    let row = sqlx::query(&format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get item by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_item_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Item>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM items ORDER BY created_at DESC, id DESC",
        ITEM_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list items")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row_to_item_sqlite(&row)?);
    }

    Ok(items)
}

async fn list_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Item>> {
    let sql = format!(
        "SELECT {} FROM items WHERE id IN ({})",
        ITEM_COLUMNS,
        ids_placeholders(ids.len())
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list items by IDs")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row_to_item_sqlite(&row)?);
    }

    Ok(items)
}

async fn update_sqlite(pool: &SqlitePool, item: &Item) -> Result<Item> {
    let now = Utc::now();
    let cols = kind_columns(&item.kind);

    sqlx::query(
        r#"
        UPDATE items
        SET item_type = ?, title = ?, description = ?, category = ?, language = ?, code = ?,
            file_name = ?, file_size = ?, file_extension = ?, download_url = ?, url = ?,
            repository = ?, website = ?, youtube = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(item.kind.type_name())
    .bind(&item.title)
    .bind(&item.description)
    .bind(&item.category)
    .bind(cols.language)
    .bind(cols.code)
    .bind(cols.file_name)
    .bind(cols.file_size)
    .bind(cols.file_extension)
    .bind(cols.download_url)
    .bind(cols.url)
    .bind(&item.repository)
    .bind(&item.website)
    .bind(&item.youtube)
    .bind(now)
    .bind(item.id)
    .execute(pool)
    .await
    .context("Failed to update item")?;

    Ok(Item {
        updated_at: now,
        ..item.clone()
    })
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete item")?;

    Ok(result.rows_affected() > 0)
}

async fn count_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM items")
        .fetch_one(pool)
        .await
        .context("Failed to count items")?;

    Ok(row.get("count"))
}

fn row_to_item_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Item> {
    let item_type: String = row.get("item_type");
    let kind = kind_from_columns(
        &item_type,
        row.get("language"),
        row.get("code"),
        row.get("file_name"),
        row.get("file_size"),
        row.get("file_extension"),
        row.get("download_url"),
        row.get("url"),
    )?;

    Ok(Item {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        author_id: row.get("author_id"),
        kind,
        repository: row.get("repository"),
        website: row.get("website"),
        youtube: row.get("youtube"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, author_id: i64, input: &CreateItemInput) -> Result<Item> {
    let now = Utc::now();
    let cols = kind_columns(&input.kind);

    let result = sqlx::query(
        r#"
        INSERT INTO items (item_type, title, description, category, author_id, language, code,
                           file_name, file_size, file_extension, download_url, url,
                           repository, website, youtube, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.kind.type_name())
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.category)
    .bind(author_id)
    .bind(cols.language)
    .bind(cols.code)
    .bind(cols.file_name)
    .bind(cols.file_size)
    .bind(cols.file_extension)
    .bind(cols.download_url)
    .bind(cols.url)
    .bind(&input.repository)
    .bind(&input.website)
    .bind(&input.youtube)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create item")?;

    Ok(Item {
        id: result.last_insert_id() as i64,
        title: input.title.clone(),
        description: input.description.clone(),
        category: input.category.clone(),
        author_id,
        kind: input.kind.clone(),
        repository: input.repository.clone(),
        website: input.website.clone(),
        youtube: input.youtube.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Item>> {
    let row = sqlx::query(&format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get item by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_item_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Item>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM items ORDER BY created_at DESC, id DESC",
        ITEM_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list items")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row_to_item_mysql(&row)?);
    }

    Ok(items)
}

async fn list_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Item>> {
    let sql = format!(
        "SELECT {} FROM items WHERE id IN ({})",
        ITEM_COLUMNS,
        ids_placeholders(ids.len())
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list items by IDs")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row_to_item_mysql(&row)?);
    }

    Ok(items)
}

async fn update_mysql(pool: &MySqlPool, item: &Item) -> Result<Item> {
    let now = Utc::now();
    let cols = kind_columns(&item.kind);

    sqlx::query(
        r#"
        UPDATE items
        SET item_type = ?, title = ?, description = ?, category = ?, language = ?, code = ?,
            file_name = ?, file_size = ?, file_extension = ?, download_url = ?, url = ?,
            repository = ?, website = ?, youtube = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(item.kind.type_name())
    .bind(&item.title)
    .bind(&item.description)
    .bind(&item.category)
    .bind(cols.language)
    .bind(cols.code)
    .bind(cols.file_name)
    .bind(cols.file_size)
    .bind(cols.file_extension)
    .bind(cols.download_url)
    .bind(cols.url)
    .bind(&item.repository)
    .bind(&item.website)
    .bind(&item.youtube)
    .bind(now)
    .bind(item.id)
    .execute(pool)
    .await
    .context("Failed to update item")?;

    Ok(Item {
        updated_at: now,
        ..item.clone()
    })
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete item")?;

    Ok(result.rows_affected() > 0)
}

async fn count_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM items")
        .fetch_one(pool)
        .await
        .context("Failed to count items")?;

    Ok(row.get("count"))
}

fn row_to_item_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Item> {
    let item_type: String = row.get("item_type");
    let kind = kind_from_columns(
        &item_type,
        row.get("language"),
        row.get("code"),
        row.get("file_name"),
        row.get("file_size"),
        row.get("file_extension"),
        row.get("download_url"),
        row.get("url"),
    )?;

    Ok(Item {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        author_id: row.get("author_id"),
        kind,
        repository: row.get("repository"),
        website: row.get("website"),
        youtube: row.get("youtube"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
