//! Comment repository
//!
//! Database operations for comments. Soft-deleted rows are kept in storage
//! for audit; filtering and redaction happen in the service layer, which
//! knows the viewer.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, user_id: i64, input: &CreateCommentInput) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Get all comments for an item (including soft-deleted), oldest first,
    /// joined with author name and avatar
    async fn list_by_item(&self, item_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Persist mutable fields (content, screenshot, soft-delete state)
    async fn update(&self, comment: &Comment) -> Result<Comment>;

    /// Hard-delete a comment. Returns false when the comment does not exist.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count all comments
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, user_id: i64, input: &CreateCommentInput) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().unwrap(), user_id, input).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().unwrap(), user_id, input).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_by_item(&self, item_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_item_sqlite(self.pool.as_sqlite().unwrap(), item_id).await
            }
            DatabaseDriver::Mysql => {
                list_by_item_mysql(self.pool.as_mysql().unwrap(), item_id).await
            }
        }
    }

    async fn update(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), comment).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), comment).await,
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

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    input: &CreateCommentInput,
) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (item_id, user_id, content, screenshot, is_deleted, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(input.item_id)
    .bind(user_id)
    .bind(&input.content)
    .bind(&input.screenshot)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        item_id: input.item_id,
        user_id,
        content: input.content.clone(),
        screenshot: input.screenshot.clone(),
        is_deleted: false,
        deletion_reason: None,
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_comment_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_by_item_sqlite(pool: &SqlitePool, item_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.item_id, c.user_id, c.content, c.screenshot, c.is_deleted,
               c.deletion_reason, c.created_at, c.updated_at,
               u.name AS user_name, u.avatar AS user_avatar
        FROM comments c
        INNER JOIN users u ON c.user_id = u.id
        WHERE c.item_id = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(item_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            comment: row_to_comment_sqlite(row),
            user_name: row.get("user_name"),
            user_avatar: row.get("user_avatar"),
        })
        .collect())
}

async fn update_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE comments
        SET content = ?, screenshot = ?, is_deleted = ?, deletion_reason = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&comment.content)
    .bind(&comment.screenshot)
    .bind(comment.is_deleted)
    .bind(&comment.deletion_reason)
    .bind(now)
    .bind(comment.id)
    .execute(pool)
    .await
    .context("Failed to update comment")?;

    Ok(Comment {
        updated_at: now,
        ..comment.clone()
    })
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(result.rows_affected() > 0)
}

async fn count_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM comments")
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;

    Ok(row.get("count"))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        item_id: row.get("item_id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        screenshot: row.get("screenshot"),
        is_deleted: row.get("is_deleted"),
        deletion_reason: row.get("deletion_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(
    pool: &MySqlPool,
    user_id: i64,
    input: &CreateCommentInput,
) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (item_id, user_id, content, screenshot, is_deleted, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(input.item_id)
    .bind(user_id)
    .bind(&input.content)
    .bind(&input.screenshot)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        item_id: input.item_id,
        user_id,
        content: input.content.clone(),
        screenshot: input.screenshot.clone(),
        is_deleted: false,
        deletion_reason: None,
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_comment_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_by_item_mysql(pool: &MySqlPool, item_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.item_id, c.user_id, c.content, c.screenshot, c.is_deleted,
               c.deletion_reason, c.created_at, c.updated_at,
               u.name AS user_name, u.avatar AS user_avatar
        FROM comments c
        INNER JOIN users u ON c.user_id = u.id
        WHERE c.item_id = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(item_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|row| CommentWithAuthor {
            comment: row_to_comment_mysql(row),
            user_name: row.get("user_name"),
            user_avatar: row.get("user_avatar"),
        })
        .collect())
}

async fn update_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE comments
        SET content = ?, screenshot = ?, is_deleted = ?, deletion_reason = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&comment.content)
    .bind(&comment.screenshot)
    .bind(comment.is_deleted)
    .bind(&comment.deletion_reason)
    .bind(now)
    .bind(comment.id)
    .execute(pool)
    .await
    .context("Failed to update comment")?;

    Ok(Comment {
        updated_at: now,
        ..comment.clone()
    })
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(result.rows_affected() > 0)
}

async fn count_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM comments")
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;

    Ok(row.get("count"))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        item_id: row.get("item_id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        screenshot: row.get("screenshot"),
        is_deleted: row.get("is_deleted"),
        deletion_reason: row.get("deletion_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ItemRepository, SqlxItemRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateItemInput, ItemKind, User};

    async fn setup() -> (SqlxCommentRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::new(pool.clone());
        let user = user_repo
            .create(&User::new(
                "Commenter".to_string(),
                "commenter@example.com".to_string(),
                "hash".to_string(),
                "https://example.com/a.png".to_string(),
            ))
            .await
            .unwrap();

        let item_repo = SqlxItemRepository::new(pool.clone());
        let item = item_repo
            .create(
                user.id,
                &CreateItemInput {
                    title: "Item".to_string(),
                    description: "Desc".to_string(),
                    category: "Utility".to_string(),
                    kind: ItemKind::Link {
                        url: "https://example.com".to_string(),
                    },
                    repository: None,
                    website: None,
                    youtube: None,
                },
            )
            .await
            .unwrap();

        (SqlxCommentRepository::new(pool), user.id, item.id)
    }

    fn input(item_id: i64, content: &str) -> CreateCommentInput {
        CreateCommentInput {
            item_id,
            content: content.to_string(),
            screenshot: None,
        }
    }

    #[tokio::test]
    async fn test_create_comment() {
        let (repo, user_id, item_id) = setup().await;

        let comment = repo
            .create(user_id, &input(item_id, "nice snippet"))
            .await
            .expect("Failed to create comment");

        assert!(comment.id > 0);
        assert!(!comment.is_deleted);
        assert!(comment.deletion_reason.is_none());
    }

    #[tokio::test]
    async fn test_list_by_item_joins_author() {
        let (repo, user_id, item_id) = setup().await;
        repo.create(user_id, &input(item_id, "first")).await.unwrap();
        repo.create(user_id, &input(item_id, "second")).await.unwrap();

        let comments = repo.list_by_item(item_id).await.expect("Failed to list");

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment.content, "first");
        assert_eq!(comments[1].comment.content, "second");
        assert_eq!(comments[0].user_name, "Commenter");
        assert_eq!(comments[0].user_avatar, "https://example.com/a.png");
    }

    #[tokio::test]
    async fn test_update_soft_delete_state() {
        let (repo, user_id, item_id) = setup().await;
        let mut comment = repo.create(user_id, &input(item_id, "spammy")).await.unwrap();

        comment.is_deleted = true;
        comment.deletion_reason = Some("spam".to_string());
        repo.update(&comment).await.expect("Failed to update");

        let reloaded = repo.get_by_id(comment.id).await.unwrap().unwrap();
        assert!(reloaded.is_deleted);
        assert_eq!(reloaded.deletion_reason.as_deref(), Some("spam"));
        // Content stays in storage for audit
        assert_eq!(reloaded.content, "spammy");
    }

    #[tokio::test]
    async fn test_hard_delete() {
        let (repo, user_id, item_id) = setup().await;
        let comment = repo.create(user_id, &input(item_id, "bye")).await.unwrap();

        assert!(repo.delete(comment.id).await.unwrap());
        assert!(repo.get_by_id(comment.id).await.unwrap().is_none());
        assert!(!repo.delete(comment.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_count() {
        let (repo, user_id, item_id) = setup().await;
        assert_eq!(repo.count().await.unwrap(), 0);
        repo.create(user_id, &input(item_id, "one")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
