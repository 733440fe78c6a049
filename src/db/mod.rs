//! Database layer
//!
//! This module provides database abstraction for the Devshare platform.
//! It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! The database layer uses a trait-based abstraction (`DatabasePool`) that
//! allows the application to work with either SQLite or MySQL without
//! knowing the specific backend. Uniqueness constraints declared in the
//! migrations (user email, tag name/slug, one favorite per user/item pair)
//! are the correctness backstop for concurrent mutations; the application
//! holds no in-process locks.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
