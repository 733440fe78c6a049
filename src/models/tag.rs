//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity
///
/// Name and slug are each globally unique. `usage_count` is denormalized and
/// always recomputed from the item association table, never incremented in
/// place, so partial failures cannot make it drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Canonical lowercase name (2-50 chars, validated at the boundary)
    pub name: String,
    /// URL-friendly slug derived from the name
    pub slug: String,
    /// Number of items currently associated with this tag
    pub usage_count: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(name: String, slug: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            name,
            slug,
            usage_count: 0,
            created_at: Utc::now(),
        }
    }
}
