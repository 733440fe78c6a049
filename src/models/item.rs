//! Item model
//!
//! An item is the unit of shared content: a code snippet, a downloadable
//! file, or a curated link. The three variants share common metadata and are
//! distinguished by a `type` discriminant; the variant payload is a tagged
//! enum so boundary code handles every shape exhaustively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Item entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub author_id: i64,
    /// Variant payload (snippet / file / link)
    #[serde(flatten)]
    pub kind: ItemKind,
    /// GitHub or other repository link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// External website link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// YouTube video link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Variant payload of an item, distinguished by the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    /// A code snippet with syntax language and source text
    Snippet { language: String, code: String },
    /// A downloadable file
    File {
        file_name: String,
        file_size: String,
        file_extension: String,
        download_url: String,
    },
    /// A curated external link
    Link { url: String },
}

impl ItemKind {
    /// The discriminant string stored in the `item_type` column
    pub fn type_name(&self) -> &'static str {
        match self {
            ItemKind::Snippet { .. } => "snippet",
            ItemKind::File { .. } => "file",
            ItemKind::Link { .. } => "link",
        }
    }
}

/// An item hydrated for display: author info, tags, and the comments the
/// viewer is allowed to see.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub author_name: String,
    pub author_avatar: String,
    pub tags: Vec<super::Tag>,
    pub comments: Vec<super::CommentView>,
}

/// Input for creating an item
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemInput {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(flatten)]
    pub kind: ItemKind,
    pub repository: Option<String>,
    pub website: Option<String>,
    pub youtube: Option<String>,
}

/// Input for updating an item; `None` fields are left unchanged.
///
/// Assembled by the API boundary rather than deserialized directly: the
/// variant payload is only parsed when the request carries a `type` tag.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub kind: Option<ItemKind>,
    pub repository: Option<String>,
    pub website: Option<String>,
    pub youtube: Option<String>,
}
