//! Item service
//!
//! Business logic for shared items: creation by approved members, edit and
//! delete by owner or privileged roles, and hydrated reads (author, tags,
//! and the comments the viewer is allowed to see).

use crate::db::repositories::{CommentRepository, ItemRepository, TagRepository, UserRepository};
use crate::models::{
    CommentView, CreateItemInput, Item, ItemDetail, ItemKind, UpdateItemInput, User,
};
use crate::services::access;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Error types for item service operations
#[derive(Debug, thiserror::Error)]
pub enum ItemServiceError {
    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(i64),

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

/// Item service
pub struct ItemService {
    repo: Arc<dyn ItemRepository>,
    user_repo: Arc<dyn UserRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    tag_repo: Arc<dyn TagRepository>,
}

impl ItemService {
    /// Create a new item service
    pub fn new(
        repo: Arc<dyn ItemRepository>,
        user_repo: Arc<dyn UserRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        tag_repo: Arc<dyn TagRepository>,
    ) -> Self {
        Self {
            repo,
            user_repo,
            comment_repo,
            tag_repo,
        }
    }

    /// Create a new item. Requires an approved, non-guest actor.
    pub async fn create(
        &self,
        actor: &User,
        input: CreateItemInput,
    ) -> Result<Item, ItemServiceError> {
        if !access::can_create_item(Some(actor)) {
            return Err(if !actor.is_approved() {
                ItemServiceError::PermissionDenied(
                    "Your account is awaiting approval".to_string(),
                )
            } else {
                ItemServiceError::PermissionDenied("You cannot create items".to_string())
            });
        }

        validate_item_fields(&input.title, &input.description, &input.category, &input.kind)?;

        self.repo
            .create(actor.id, &input)
            .await
            .context("Failed to create item")
            .map_err(Into::into)
    }

    /// Update an item. Allowed for the owner and for privileged roles.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateItemInput,
    ) -> Result<Item, ItemServiceError> {
        let mut item = self.get_existing(id).await?;

        if !access::can_edit_item(Some(actor), item.author_id) {
            return Err(ItemServiceError::PermissionDenied(
                "You cannot edit this item".to_string(),
            ));
        }

        if let Some(title) = input.title {
            item.title = title;
        }
        if let Some(description) = input.description {
            item.description = description;
        }
        if let Some(category) = input.category {
            item.category = category;
        }
        if let Some(kind) = input.kind {
            item.kind = kind;
        }
        if let Some(repository) = input.repository {
            item.repository = Some(repository);
        }
        if let Some(website) = input.website {
            item.website = Some(website);
        }
        if let Some(youtube) = input.youtube {
            item.youtube = Some(youtube);
        }

        validate_item_fields(&item.title, &item.description, &item.category, &item.kind)?;

        self.repo
            .update(&item)
            .await
            .context("Failed to update item")
            .map_err(Into::into)
    }

    /// Delete an item. Allowed for the owner and for privileged roles.
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ItemServiceError> {
        let item = self.get_existing(id).await?;

        if !access::can_delete_item(Some(actor), item.author_id) {
            return Err(ItemServiceError::PermissionDenied(
                "You cannot delete this item".to_string(),
            ));
        }

        self.repo
            .delete(id)
            .await
            .context("Failed to delete item")?;
        Ok(())
    }

    /// List all items hydrated for the viewer, newest first. Open to
    /// everyone including anonymous visitors; comment visibility follows
    /// the viewer's rights.
    pub async fn list(&self, viewer: Option<&User>) -> Result<Vec<ItemDetail>, ItemServiceError> {
        let items = self.repo.list().await.context("Failed to list items")?;

        let mut details = Vec::with_capacity(items.len());
        for item in items {
            details.push(self.hydrate(viewer, item).await?);
        }
        Ok(details)
    }

    /// Get a single item hydrated for the viewer. Guests cannot open
    /// item details.
    pub async fn get_detail(
        &self,
        viewer: Option<&User>,
        id: i64,
    ) -> Result<ItemDetail, ItemServiceError> {
        if !access::can_view_item_detail(viewer) {
            return Err(ItemServiceError::PermissionDenied(
                "You cannot view item details".to_string(),
            ));
        }

        let item = self.get_existing(id).await?;
        self.hydrate(viewer, item).await
    }

    /// Get the raw item without hydration
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Item>, ItemServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get item")
            .map_err(Into::into)
    }

    /// Hydrate a set of already-loaded items (e.g. a favorites list)
    pub async fn hydrate_all(
        &self,
        viewer: Option<&User>,
        items: Vec<Item>,
    ) -> Result<Vec<ItemDetail>, ItemServiceError> {
        let mut details = Vec::with_capacity(items.len());
        for item in items {
            details.push(self.hydrate(viewer, item).await?);
        }
        Ok(details)
    }

    async fn hydrate(
        &self,
        viewer: Option<&User>,
        item: Item,
    ) -> Result<ItemDetail, ItemServiceError> {
        let author = self
            .user_repo
            .get_by_id(item.author_id)
            .await
            .context("Failed to load item author")?;
        let (author_name, author_avatar) = match author {
            Some(user) => (user.name, user.avatar),
            None => ("[deleted]".to_string(), String::new()),
        };

        let tags = self
            .tag_repo
            .get_by_item_id(item.id)
            .await
            .context("Failed to load item tags")?;

        let comments = if access::can_view_comments(viewer) {
            let can_moderate = viewer.map(|u| u.is_privileged()).unwrap_or(false);
            self.comment_repo
                .list_by_item(item.id)
                .await
                .context("Failed to load item comments")?
                .into_iter()
                .map(|c| CommentView::for_viewer(c, can_moderate))
                .collect()
        } else {
            Vec::new()
        };

        Ok(ItemDetail {
            item,
            author_name,
            author_avatar,
            tags,
            comments,
        })
    }

    async fn get_existing(&self, id: i64) -> Result<Item, ItemServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get item")?
            .ok_or(ItemServiceError::NotFound(id))
    }
}

fn validate_item_fields(
    title: &str,
    description: &str,
    category: &str,
    kind: &ItemKind,
) -> Result<(), ItemServiceError> {
    if title.trim().is_empty() {
        return Err(ItemServiceError::ValidationError(
            "Title cannot be empty".to_string(),
        ));
    }
    if description.trim().is_empty() {
        return Err(ItemServiceError::ValidationError(
            "Description cannot be empty".to_string(),
        ));
    }
    if category.trim().is_empty() {
        return Err(ItemServiceError::ValidationError(
            "Category cannot be empty".to_string(),
        ));
    }

    match kind {
        ItemKind::Snippet { language, code } => {
            if language.trim().is_empty() || code.trim().is_empty() {
                return Err(ItemServiceError::ValidationError(
                    "A snippet needs a language and source text".to_string(),
                ));
            }
        }
        ItemKind::File {
            file_name,
            download_url,
            ..
        } => {
            if file_name.trim().is_empty() || download_url.trim().is_empty() {
                return Err(ItemServiceError::ValidationError(
                    "A file needs a name and a download URL".to_string(),
                ));
            }
        }
        ItemKind::Link { url } => {
            if url.trim().is_empty() {
                return Err(ItemServiceError::ValidationError(
                    "A link needs a target URL".to_string(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCommentRepository, SqlxItemRepository, SqlxTagRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{ApprovalStatus, UserRole};

    struct Fixture {
        pool: DynDatabasePool,
        service: ItemService,
        member: User,
        moderator: User,
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

        let member = create_user(&pool, "Member", UserRole::User, ApprovalStatus::Approved).await;
        let moderator =
            create_user(&pool, "Mod", UserRole::Moderator, ApprovalStatus::Approved).await;

        let service = ItemService::new(
            SqlxItemRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
        );

        Fixture {
            pool,
            service,
            member,
            moderator,
        }
    }

    fn snippet(title: &str) -> CreateItemInput {
        CreateItemInput {
            title: title.to_string(),
            description: "Useful".to_string(),
            category: "Backend".to_string(),
            kind: ItemKind::Snippet {
                language: "rust".to_string(),
                code: "fn main() {}".to_string(),
            },
            repository: None,
            website: None,
            youtube: None,
        }
    }

    #[tokio::test]
    async fn test_member_creates_item() {
        let f = setup().await;

        let item = f
            .service
            .create(&f.member, snippet("Helper"))
            .await
            .expect("Failed to create item");

        assert_eq!(item.author_id, f.member.id);
    }

    #[tokio::test]
    async fn test_pending_account_cannot_create() {
        let f = setup().await;
        let pending =
            create_user(&f.pool, "Pending", UserRole::Guest, ApprovalStatus::Pending).await;

        let result = f.service.create(&pending, snippet("Nope")).await;
        assert!(matches!(result, Err(ItemServiceError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_snippet_needs_code() {
        let f = setup().await;
        let mut input = snippet("Empty");
        input.kind = ItemKind::Snippet {
            language: "rust".to_string(),
            code: "  ".to_string(),
        };

        let result = f.service.create(&f.member, input).await;
        assert!(matches!(result, Err(ItemServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_owner_updates_item() {
        let f = setup().await;
        let item = f.service.create(&f.member, snippet("V1")).await.unwrap();

        let updated = f
            .service
            .update(
                &f.member,
                item.id,
                UpdateItemInput {
                    title: Some("V2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to update");

        assert_eq!(updated.title, "V2");
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update() {
        let f = setup().await;
        let other = create_user(&f.pool, "Other", UserRole::User, ApprovalStatus::Approved).await;
        let item = f.service.create(&f.member, snippet("Mine")).await.unwrap();

        let result = f
            .service
            .update(
                &other,
                item.id,
                UpdateItemInput {
                    title: Some("Stolen".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(ItemServiceError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_moderator_deletes_any_item() {
        let f = setup().await;
        let item = f.service.create(&f.member, snippet("Gone")).await.unwrap();

        f.service
            .delete(&f.moderator, item.id)
            .await
            .expect("Failed to delete");

        assert!(f.service.get_by_id(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_item_not_found() {
        let f = setup().await;
        let result = f.service.delete(&f.member, 99999).await;
        assert!(matches!(result, Err(ItemServiceError::NotFound(99999))));
    }

    #[tokio::test]
    async fn test_list_is_public_and_hydrated() {
        let f = setup().await;
        f.service.create(&f.member, snippet("Listed")).await.unwrap();

        // Anonymous viewer can list
        let details = f.service.list(None).await.expect("Failed to list");

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].author_name, "Member");
        // No comment contents leak to anonymous viewers
        assert!(details[0].comments.is_empty());
    }

    #[tokio::test]
    async fn test_guest_cannot_open_detail() {
        let f = setup().await;
        let guest = create_user(&f.pool, "Guest", UserRole::Guest, ApprovalStatus::Pending).await;
        let item = f.service.create(&f.member, snippet("Hidden")).await.unwrap();

        assert!(matches!(
            f.service.get_detail(None, item.id).await,
            Err(ItemServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            f.service.get_detail(Some(&guest), item.id).await,
            Err(ItemServiceError::PermissionDenied(_))
        ));

        let detail = f.service.get_detail(Some(&f.member), item.id).await.unwrap();
        assert_eq!(detail.item.id, item.id);
    }
}
