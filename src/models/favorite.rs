//! Favorite model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Favorite entity - a user-scoped bookmark on an item.
///
/// Pure presence/absence relation: at most one row per (user_id, item_id)
/// pair, enforced by a database unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub created_at: DateTime<Utc>,
}
