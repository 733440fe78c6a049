//! Comment service
//!
//! Business logic for the comment lifecycle:
//!
//! ACTIVE --edit (author or privileged)--> ACTIVE
//! ACTIVE --remove (author)--> gone (hard delete, no reason)
//! ACTIVE --moderate (privileged non-author, reason required)--> SOFT_DELETED
//!
//! SOFT_DELETED is terminal: no edit, re-delete, or resurrection. The stored
//! content survives for audit and is only ever rendered to viewers holding
//! moderation rights; everyone else sees a redacted placeholder carrying the
//! reason.

use crate::db::repositories::{CommentRepository, ItemRepository};
use crate::models::{Comment, CommentView, CreateCommentInput, User};
use crate::services::access;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Comment or item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Actor is not allowed to perform this operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    item_repo: Arc<dyn ItemRepository>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(repo: Arc<dyn CommentRepository>, item_repo: Arc<dyn ItemRepository>) -> Self {
        Self { repo, item_repo }
    }

    /// Create a comment on an item.
    ///
    /// Requires an approved, non-guest actor and non-empty content.
    pub async fn create(
        &self,
        actor: &User,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        if !access::can_create_comment(Some(actor)) {
            return Err(denied_for_creation(actor));
        }

        if input.content.trim().is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment content cannot be empty".to_string(),
            ));
        }

        if self
            .item_repo
            .get_by_id(input.item_id)
            .await
            .context("Failed to check item")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound(format!(
                "Item {} not found",
                input.item_id
            )));
        }

        self.repo
            .create(actor.id, &input)
            .await
            .context("Failed to create comment")
            .map_err(Into::into)
    }

    /// Edit a comment's content and screenshot.
    ///
    /// Allowed for the author and for privileged roles; a soft-deleted
    /// comment is never editable.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        content: String,
        screenshot: Option<String>,
    ) -> Result<Comment, CommentServiceError> {
        let mut comment = self.get_existing(id).await?;

        if !access::can_edit_comment(Some(actor), &comment) {
            return Err(CommentServiceError::PermissionDenied(
                "You cannot edit this comment".to_string(),
            ));
        }

        if content.trim().is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment content cannot be empty".to_string(),
            ));
        }

        comment.content = content;
        comment.screenshot = screenshot;

        self.repo
            .update(&comment)
            .await
            .context("Failed to update comment")
            .map_err(Into::into)
    }

    /// Author self-delete: removes the comment outright. No reason needed
    /// for an author removing their own words.
    pub async fn remove(&self, actor: &User, id: i64) -> Result<(), CommentServiceError> {
        let comment = self.get_existing(id).await?;

        if !access::can_delete_comment(Some(actor), &comment) {
            return Err(CommentServiceError::PermissionDenied(
                "You cannot delete this comment".to_string(),
            ));
        }

        if actor.id != comment.user_id {
            // A privileged non-author must leave a visible trace instead
            return Err(CommentServiceError::ValidationError(
                "Deleting another member's comment requires a moderation reason".to_string(),
            ));
        }

        self.repo
            .delete(id)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    /// Moderation delete by a privileged non-author: soft-deletes with a
    /// mandatory non-empty reason so the audience sees that content was
    /// removed by authority, and why.
    pub async fn moderate(
        &self,
        actor: &User,
        id: i64,
        reason: &str,
    ) -> Result<Comment, CommentServiceError> {
        let mut comment = self.get_existing(id).await?;

        if !access::can_delete_comment(Some(actor), &comment) {
            return Err(CommentServiceError::PermissionDenied(
                "You cannot delete this comment".to_string(),
            ));
        }

        if !actor.is_privileged() || actor.id == comment.user_id {
            return Err(CommentServiceError::PermissionDenied(
                "Moderation delete is reserved for moderators acting on others' comments"
                    .to_string(),
            ));
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "A deletion reason is required".to_string(),
            ));
        }

        comment.is_deleted = true;
        comment.deletion_reason = Some(reason.to_string());

        self.repo
            .update(&comment)
            .await
            .context("Failed to soft-delete comment")
            .map_err(Into::into)
    }

    /// Comments on an item as the viewer is allowed to see them.
    ///
    /// Active comments render in full; soft-deleted ones render fully (with
    /// the reason) for privileged viewers and as redacted placeholders for
    /// everyone else.
    pub async fn list_for_viewer(
        &self,
        viewer: &User,
        item_id: i64,
    ) -> Result<Vec<CommentView>, CommentServiceError> {
        if !access::can_view_comments(Some(viewer)) {
            return Err(CommentServiceError::PermissionDenied(
                "You cannot view comments".to_string(),
            ));
        }

        let can_moderate = viewer.is_privileged();
        let comments = self
            .repo
            .list_by_item(item_id)
            .await
            .context("Failed to list comments")?;

        Ok(comments
            .into_iter()
            .map(|c| CommentView::for_viewer(c, can_moderate))
            .collect())
    }

    /// Get a comment by ID, including soft-deleted ones
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Comment>, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")
            .map_err(Into::into)
    }

    async fn get_existing(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("Comment {} not found", id)))
    }
}

/// A denial message specific enough to act on: a pending account learns it
/// is awaiting approval, everyone else gets the generic denial.
fn denied_for_creation(actor: &User) -> CommentServiceError {
    if !actor.is_approved() {
        CommentServiceError::PermissionDenied(
            "Your account is awaiting approval".to_string(),
        )
    } else {
        CommentServiceError::PermissionDenied("You cannot comment".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ItemRepository, SqlxCommentRepository, SqlxItemRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{ApprovalStatus, CreateItemInput, ItemKind, UserRole};

    struct Fixture {
        pool: DynDatabasePool,
        service: CommentService,
        author: User,
        moderator: User,
        other: User,
        item_id: i64,
    }

    async fn create_user(
        pool: &DynDatabasePool,
        name: &str,
        role: UserRole,
        status: ApprovalStatus,
    ) -> User {
        let repo = SqlxUserRepository::new(pool.clone());
        let mut user = User::new(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            "hash".to_string(),
            "".to_string(),
        );
        user.role = role;
        user.status = status;
        repo.create(&user).await.unwrap()
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = create_user(&pool, "Author", UserRole::User, ApprovalStatus::Approved).await;
        let moderator =
            create_user(&pool, "Mod", UserRole::Moderator, ApprovalStatus::Approved).await;
        let other = create_user(&pool, "Other", UserRole::User, ApprovalStatus::Approved).await;

        let item = SqlxItemRepository::new(pool.clone())
            .create(
                author.id,
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

        let service = CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxItemRepository::boxed(pool.clone()),
        );

        Fixture {
            pool,
            service,
            author,
            moderator,
            other,
            item_id: item.id,
        }
    }

    fn input(item_id: i64, content: &str) -> CreateCommentInput {
        CreateCommentInput {
            item_id,
            content: content.to_string(),
            screenshot: None,
        }
    }

    // ========================================================================
    // Creation tests
    // ========================================================================

    #[tokio::test]
    async fn test_create_comment() {
        let f = setup().await;

        let comment = f
            .service
            .create(&f.author, input(f.item_id, "works great"))
            .await
            .expect("Failed to create comment");

        assert_eq!(comment.content, "works great");
        assert!(!comment.is_deleted);
    }

    #[tokio::test]
    async fn test_pending_user_cannot_comment() {
        let f = setup().await;
        let pending =
            create_user(&f.pool, "Pending", UserRole::Guest, ApprovalStatus::Pending).await;

        let result = f.service.create(&pending, input(f.item_id, "hi")).await;

        match result {
            Err(CommentServiceError::PermissionDenied(msg)) => {
                assert!(msg.contains("awaiting approval"));
            }
            other => panic!("Expected PermissionDenied, got {:?}", other.map(|c| c.id)),
        }
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let f = setup().await;

        let result = f.service.create(&f.author, input(f.item_id, "   ")).await;
        assert!(matches!(result, Err(CommentServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_on_missing_item_not_found() {
        let f = setup().await;

        let result = f.service.create(&f.author, input(99999, "hi")).await;
        assert!(matches!(result, Err(CommentServiceError::NotFound(_))));
    }

    // ========================================================================
    // Edit tests
    // ========================================================================

    #[tokio::test]
    async fn test_author_edits_own_comment() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "v1"))
            .await
            .unwrap();

        let updated = f
            .service
            .update(&f.author, comment.id, "v2".to_string(), None)
            .await
            .expect("Failed to edit");

        assert_eq!(updated.content, "v2");
    }

    #[tokio::test]
    async fn test_moderator_edits_any_comment() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "v1"))
            .await
            .unwrap();

        let updated = f
            .service
            .update(&f.moderator, comment.id, "cleaned up".to_string(), None)
            .await
            .unwrap();

        assert_eq!(updated.content, "cleaned up");
    }

    #[tokio::test]
    async fn test_non_author_cannot_edit() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "mine"))
            .await
            .unwrap();

        let result = f
            .service
            .update(&f.other, comment.id, "hijacked".to_string(), None)
            .await;

        assert!(matches!(result, Err(CommentServiceError::PermissionDenied(_))));
    }

    // ========================================================================
    // Delete path tests
    // ========================================================================

    #[tokio::test]
    async fn test_author_self_delete_is_hard() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "regretted"))
            .await
            .unwrap();

        f.service
            .remove(&f.author, comment.id)
            .await
            .expect("Failed to remove");

        // Gone entirely, not soft-deleted
        assert!(f.service.get_by_id(comment.id).await.unwrap().is_none());

        let views = f
            .service
            .list_for_viewer(&f.moderator, f.item_id)
            .await
            .unwrap();
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn test_privileged_cannot_use_reasonless_delete_on_others() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "kept"))
            .await
            .unwrap();

        let result = f.service.remove(&f.moderator, comment.id).await;

        assert!(matches!(result, Err(CommentServiceError::ValidationError(_))));
        // Comment untouched
        let reloaded = f.service.get_by_id(comment.id).await.unwrap().unwrap();
        assert!(!reloaded.is_deleted);
    }

    #[tokio::test]
    async fn test_moderate_requires_reason() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "spammy"))
            .await
            .unwrap();

        let result = f.service.moderate(&f.moderator, comment.id, "   ").await;

        assert!(matches!(result, Err(CommentServiceError::ValidationError(_))));
        let reloaded = f.service.get_by_id(comment.id).await.unwrap().unwrap();
        assert!(!reloaded.is_deleted);
    }

    #[tokio::test]
    async fn test_moderate_soft_deletes_with_reason() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "spammy"))
            .await
            .unwrap();

        let moderated = f
            .service
            .moderate(&f.moderator, comment.id, "spam")
            .await
            .expect("Failed to moderate");

        assert!(moderated.is_deleted);
        assert_eq!(moderated.deletion_reason.as_deref(), Some("spam"));
        // Content retained internally for audit
        assert_eq!(moderated.content, "spammy");
    }

    #[tokio::test]
    async fn test_plain_user_cannot_moderate() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "fine"))
            .await
            .unwrap();

        let result = f.service.moderate(&f.other, comment.id, "because").await;
        assert!(matches!(result, Err(CommentServiceError::PermissionDenied(_))));
    }

    // ========================================================================
    // Terminality tests
    // ========================================================================

    #[tokio::test]
    async fn test_soft_deleted_is_terminal() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "original"))
            .await
            .unwrap();
        f.service
            .moderate(&f.moderator, comment.id, "spam")
            .await
            .unwrap();

        // No edit, by anyone
        let edit = f
            .service
            .update(&f.moderator, comment.id, "changed".to_string(), None)
            .await;
        assert!(matches!(edit, Err(CommentServiceError::PermissionDenied(_))));

        // No re-delete, by anyone
        let redelete = f.service.moderate(&f.moderator, comment.id, "again").await;
        assert!(matches!(redelete, Err(CommentServiceError::PermissionDenied(_))));
        let author_delete = f.service.remove(&f.author, comment.id).await;
        assert!(matches!(
            author_delete,
            Err(CommentServiceError::PermissionDenied(_))
        ));

        // Content and reason unchanged
        let reloaded = f.service.get_by_id(comment.id).await.unwrap().unwrap();
        assert_eq!(reloaded.content, "original");
        assert_eq!(reloaded.deletion_reason.as_deref(), Some("spam"));
    }

    // ========================================================================
    // Visibility tests
    // ========================================================================

    #[tokio::test]
    async fn test_redaction_per_viewer() {
        let f = setup().await;
        let comment = f
            .service
            .create(&f.author, input(f.item_id, "secret words"))
            .await
            .unwrap();
        f.service
            .moderate(&f.moderator, comment.id, "off-topic")
            .await
            .unwrap();

        // Non-privileged viewer (including the author) sees the placeholder
        for viewer in [&f.other, &f.author] {
            let views = f.service.list_for_viewer(viewer, f.item_id).await.unwrap();
            assert_eq!(views.len(), 1);
            assert!(views[0].is_deleted);
            assert!(views[0].content.is_none());
            assert_eq!(views[0].deletion_reason.as_deref(), Some("off-topic"));
        }

        // Privileged viewer sees content and reason
        let views = f
            .service
            .list_for_viewer(&f.moderator, f.item_id)
            .await
            .unwrap();
        assert_eq!(views[0].content.as_deref(), Some("secret words"));
        assert_eq!(views[0].deletion_reason.as_deref(), Some("off-topic"));
    }

    #[tokio::test]
    async fn test_guest_cannot_list_comments() {
        let f = setup().await;
        let guest = create_user(&f.pool, "Guest", UserRole::Guest, ApprovalStatus::Pending).await;

        let result = f.service.list_for_viewer(&guest, f.item_id).await;
        assert!(matches!(result, Err(CommentServiceError::PermissionDenied(_))));
    }
}
