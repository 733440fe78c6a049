//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
///
/// A soft-deleted comment keeps its content in storage for audit, but the
/// content must never reach a viewer without delete-rights on it; use
/// [`CommentView::for_viewer`] when building responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub item_id: i64,
    pub user_id: i64,
    pub content: String,
    /// Screenshot URI or embedded base64 payload
    pub screenshot: Option<String>,
    /// Soft-delete flag set by a moderation delete
    pub is_deleted: bool,
    /// Mandatory reason recorded by the moderation delete
    pub deletion_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment enriched with author info for display
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub user_name: String,
    pub user_avatar: String,
}

/// A comment as rendered to a particular viewer.
///
/// An active comment renders in full for everyone. A soft-deleted comment
/// renders in full (plus the deletion reason) for viewers holding moderation
/// rights, and as a redacted placeholder carrying only the reason for
/// everyone else - the stored content must never reach them.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub item_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    /// Build the view of a comment for a viewer.
    ///
    /// `can_moderate` is whether the viewer holds moderation rights
    /// (MODERATOR/SUPERADMIN). For a soft-deleted comment it decides
    /// between the full audit view and the redacted placeholder.
    pub fn for_viewer(comment: CommentWithAuthor, can_moderate: bool) -> Self {
        let CommentWithAuthor {
            comment,
            user_name,
            user_avatar,
        } = comment;

        let redact = comment.is_deleted && !can_moderate;

        Self {
            id: comment.id,
            item_id: comment.item_id,
            user_id: comment.user_id,
            user_name,
            user_avatar,
            content: if redact { None } else { Some(comment.content) },
            screenshot: if redact { None } else { comment.screenshot },
            is_deleted: comment.is_deleted,
            deletion_reason: comment.deletion_reason,
            created_at: comment.created_at,
        }
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub item_id: i64,
    pub content: String,
    pub screenshot: Option<String>,
}
