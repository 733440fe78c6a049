//! User repository
//!
//! Database operations for user accounts.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ApprovalStatus, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::BTreeMap;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user. Fails on duplicate email.
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List users, optionally filtered by status and/or role,
    /// newest registration first
    async fn list(
        &self,
        status: Option<ApprovalStatus>,
        role: Option<UserRole>,
    ) -> Result<Vec<User>>;

    /// Persist all mutable fields of a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user. Returns false when the user does not exist.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count users matching an optional status and/or role filter
    async fn count(
        &self,
        status: Option<ApprovalStatus>,
        role: Option<UserRole>,
    ) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => get_by_email_mysql(self.pool.as_mysql().unwrap(), email).await,
        }
    }

    async fn list(
        &self,
        status: Option<ApprovalStatus>,
        role: Option<UserRole>,
    ) -> Result<Vec<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), status, role).await
            }
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), status, role).await,
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn count(
        &self,
        status: Option<ApprovalStatus>,
        role: Option<UserRole>,
    ) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_sqlite(self.pool.as_sqlite().unwrap(), status, role).await
            }
            DatabaseDriver::Mysql => count_mysql(self.pool.as_mysql().unwrap(), status, role).await,
        }
    }
}

/// Build the WHERE clause shared by list and count
fn filter_clause(status: Option<ApprovalStatus>, role: Option<UserRole>) -> String {
    let mut conditions = Vec::new();
    if status.is_some() {
        conditions.push("status = ?");
    }
    if role.is_some() {
        conditions.push("role = ?");
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn serialize_social_links(links: &BTreeMap<String, String>) -> String {
    serde_json::to_string(links).unwrap_or_else(|_| "{}".to_string())
}

// ============================================================================
// SQLite implementations
// ============================================================================

const USER_COLUMNS: &str = "id, name, email, password_hash, role, status, avatar, bio, \
     is_public_profile, social_links, rejection_reason, created_at, updated_at";

async fn create_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role, status, avatar, bio,
                           is_public_profile, social_links, rejection_reason, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(&user.avatar)
    .bind(&user.bio)
    .bind(user.is_public_profile)
    .bind(serialize_social_links(&user.social_links))
    .bind(&user.rejection_reason)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_rowid();

    Ok(User {
        id,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(
    pool: &SqlitePool,
    status: Option<ApprovalStatus>,
    role: Option<UserRole>,
) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users{} ORDER BY created_at DESC",
        USER_COLUMNS,
        filter_clause(status, role)
    );

    let mut query = sqlx::query(&sql);
    if let Some(status) = status {
        query = query.bind(status.to_string());
    }
    if let Some(role) = role {
        query = query.bind(role.to_string());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user_sqlite(&row)?);
    }

    Ok(users)
}

async fn update_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, password_hash = ?, role = ?, status = ?, avatar = ?,
            bio = ?, is_public_profile = ?, social_links = ?, rejection_reason = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(&user.avatar)
    .bind(&user.bio)
    .bind(user.is_public_profile)
    .bind(serialize_social_links(&user.social_links))
    .bind(&user.rejection_reason)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    Ok(User {
        updated_at: now,
        ..user.clone()
    })
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(result.rows_affected() > 0)
}

async fn count_sqlite(
    pool: &SqlitePool,
    status: Option<ApprovalStatus>,
    role: Option<UserRole>,
) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) as count FROM users{}",
        filter_clause(status, role)
    );

    let mut query = sqlx::query(&sql);
    if let Some(status) = status {
        query = query.bind(status.to_string());
    }
    if let Some(role) = role {
        query = query.bind(role.to_string());
    }

    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let status: String = row.get("status");
    let social_links: String = row.get("social_links");

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: role.parse().context("Invalid role in database")?,
        status: status.parse().context("Invalid status in database")?,
        avatar: row.get("avatar"),
        bio: row.get("bio"),
        is_public_profile: row.get("is_public_profile"),
        social_links: serde_json::from_str(&social_links).unwrap_or_default(),
        rejection_reason: row.get("rejection_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role, status, avatar, bio,
                           is_public_profile, social_links, rejection_reason, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(&user.avatar)
    .bind(&user.bio)
    .bind(user.is_public_profile)
    .bind(serialize_social_links(&user.social_links))
    .bind(&user.rejection_reason)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_id() as i64;

    Ok(User {
        id,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_mysql(
    pool: &MySqlPool,
    status: Option<ApprovalStatus>,
    role: Option<UserRole>,
) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users{} ORDER BY created_at DESC",
        USER_COLUMNS,
        filter_clause(status, role)
    );

    let mut query = sqlx::query(&sql);
    if let Some(status) = status {
        query = query.bind(status.to_string());
    }
    if let Some(role) = role {
        query = query.bind(role.to_string());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user_mysql(&row)?);
    }

    Ok(users)
}

async fn update_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, password_hash = ?, role = ?, status = ?, avatar = ?,
            bio = ?, is_public_profile = ?, social_links = ?, rejection_reason = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.status.to_string())
    .bind(&user.avatar)
    .bind(&user.bio)
    .bind(user.is_public_profile)
    .bind(serialize_social_links(&user.social_links))
    .bind(&user.rejection_reason)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    Ok(User {
        updated_at: now,
        ..user.clone()
    })
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(result.rows_affected() > 0)
}

async fn count_mysql(
    pool: &MySqlPool,
    status: Option<ApprovalStatus>,
    role: Option<UserRole>,
) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) as count FROM users{}",
        filter_clause(status, role)
    );

    let mut query = sqlx::query(&sql);
    if let Some(status) = status {
        query = query.bind(status.to_string());
    }
    if let Some(role) = role {
        query = query.bind(role.to_string());
    }

    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role: String = row.get("role");
    let status: String = row.get("status");
    let social_links: String = row.get("social_links");

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: role.parse().context("Invalid role in database")?,
        status: status.parse().context("Invalid status in database")?,
        avatar: row.get("avatar"),
        bio: row.get("bio"),
        is_public_profile: row.get("is_public_profile"),
        social_links: serde_json::from_str(&social_links).unwrap_or_default(),
        rejection_reason: row.get("rejection_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
