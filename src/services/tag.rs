//! Tag service
//!
//! Implements business logic for tag management:
//! - Canonical find-or-create with slug de-duplication
//! - Replacing an item's tag set in one sync operation
//! - Popular tag listing and name search
//!
//! Callers enforce the 2-50 character tag name rule at the boundary before
//! any name reaches this service; the service does not re-validate length.

use crate::db::repositories::{ItemRepository, TagRepository};
use crate::models::{Item, Tag};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for managing tags and their item associations
pub struct TagService {
    repo: Arc<dyn TagRepository>,
    item_repo: Arc<dyn ItemRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>, item_repo: Arc<dyn ItemRepository>) -> Self {
        Self { repo, item_repo }
    }

    /// Find an existing tag by normalized name, creating it when absent.
    ///
    /// The input is lowercase-trimmed and the slug derived from it is the
    /// lookup key, so names differing only by case or whitespace resolve to
    /// the same row. When two concurrent calls race on a new name, the slug
    /// unique constraint lets exactly one insert win; the loser re-reads and
    /// returns the winning row.
    pub async fn find_or_create(&self, raw_name: &str) -> Result<Tag, TagServiceError> {
        let name = normalize_tag_name(raw_name);
        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(TagServiceError::ValidationError(format!(
                "Tag name has no usable characters: '{}'",
                raw_name
            )));
        }

        if let Some(existing) = self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to look up tag by slug")?
        {
            return Ok(existing);
        }

        match self.repo.create(&Tag::new(name, slug.clone())).await {
            Ok(created) => Ok(created),
            Err(err) => {
                // A concurrent call may have inserted the same slug between
                // our read and write; the winning row is the answer.
                if let Some(winner) = self
                    .repo
                    .get_by_slug(&slug)
                    .await
                    .context("Failed to re-read tag after insert conflict")?
                {
                    Ok(winner)
                } else {
                    Err(TagServiceError::InternalError(
                        err.context("Failed to create tag"),
                    ))
                }
            }
        }
    }

    /// Replace an item's tag set with the given raw names.
    ///
    /// The input list is normalized and de-duplicated, each name resolved
    /// via [`find_or_create`](Self::find_or_create), and the symmetric
    /// difference against the current associations applied: stale
    /// associations are removed, new ones added (adding an existing
    /// association is a no-op). Afterwards every tag's usage count is
    /// recomputed from the join table in full, so a partially applied
    /// earlier sync cannot leave drifted counts behind.
    pub async fn sync_item_tags(
        &self,
        item_id: i64,
        raw_names: &[String],
    ) -> Result<Vec<Tag>, TagServiceError> {
        // Normalize and de-duplicate, preserving first-seen order
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for raw in raw_names {
            let name = normalize_tag_name(raw);
            if name.is_empty() || !seen.insert(name.clone()) {
                continue;
            }
            tags.push(self.find_or_create(&name).await?);
        }

        let desired_ids: HashSet<i64> = tags.iter().map(|t| t.id).collect();
        let current_ids: HashSet<i64> = self
            .repo
            .get_by_item_id(item_id)
            .await
            .context("Failed to read current item tags")?
            .iter()
            .map(|t| t.id)
            .collect();

        for stale in current_ids.difference(&desired_ids) {
            self.repo
                .remove_from_item(*stale, item_id)
                .await
                .context("Failed to remove stale tag association")?;
        }
        for added in desired_ids.difference(&current_ids) {
            self.repo
                .add_to_item(*added, item_id)
                .await
                .context("Failed to add tag association")?;
        }

        self.repo
            .recount_usage()
            .await
            .context("Failed to recount tag usage")?;

        // Return tags with their fresh counts
        let mut result = Vec::with_capacity(tags.len());
        for tag in tags {
            let reloaded = self
                .repo
                .get_by_id(tag.id)
                .await
                .context("Failed to reload tag")?
                .unwrap_or(tag);
            result.push(reloaded);
        }
        Ok(result)
    }

    /// Tags currently in use (usage_count > 0), most used first
    pub async fn get_popular(&self, limit: usize) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .get_popular(limit)
            .await
            .context("Failed to get popular tags")
            .map_err(Into::into)
    }

    /// Case-insensitive substring search on tag names, most used first
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .search(&query.trim().to_lowercase(), limit)
            .await
            .context("Failed to search tags")
            .map_err(Into::into)
    }

    /// All tags, most used first, capped at limit
    pub async fn get_all(&self, limit: usize) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list(limit)
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// Tags associated with an item, ordered by name
    pub async fn get_item_tags(&self, item_id: i64) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .get_by_item_id(item_id)
            .await
            .context("Failed to get item tags")
            .map_err(Into::into)
    }

    /// The tag with the given slug and all items associated with it.
    ///
    /// Fails with `NotFound` when the slug does not resolve.
    pub async fn get_items_by_tag(&self, slug: &str) -> Result<(Tag, Vec<Item>), TagServiceError> {
        let tag = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to look up tag by slug")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag not found: {}", slug)))?;

        let item_ids = self
            .repo
            .get_item_ids_by_tag(tag.id)
            .await
            .context("Failed to get item IDs for tag")?;

        let items = self
            .item_repo
            .list_by_ids(&item_ids)
            .await
            .context("Failed to load items for tag")?;

        Ok((tag, items))
    }
}

/// Canonical form of a tag name: lowercase, surrounding whitespace trimmed
pub fn normalize_tag_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Derive a URL-safe slug from a normalized tag name.
///
/// Whitespace, underscore, and hyphen runs collapse to a single hyphen;
/// other non-alphanumeric characters are dropped; leading and trailing
/// hyphens never appear.
pub fn slugify(name: &str) -> String {
    let mut result = String::new();
    let mut pending_hyphen = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !result.is_empty() {
                result.push('-');
            }
            pending_hyphen = false;
            result.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_hyphen = true;
        }
        // Any other character is stripped
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxItemRepository, SqlxTagRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateItemInput, ItemKind, User};

    async fn setup_test_service() -> (DynDatabasePool, TagService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            SqlxItemRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    async fn create_test_item(pool: &DynDatabasePool, title: &str) -> i64 {
        let user_repo = SqlxUserRepository::new(pool.clone());
        let email = format!("{}@example.com", title.to_lowercase().replace(' ', "-"));
        let user = match user_repo.get_by_email(&email).await.unwrap() {
            Some(user) => user,
            None => user_repo
                .create(&User::new(
                    "Author".to_string(),
                    email,
                    "hash".to_string(),
                    "".to_string(),
                ))
                .await
                .unwrap(),
        };

        use crate::db::repositories::ItemRepository;
        SqlxItemRepository::new(pool.clone())
            .create(
                user.id,
                &CreateItemInput {
                    title: title.to_string(),
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
            .unwrap()
            .id
    }

    // ========================================================================
    // Slug derivation tests
    // ========================================================================

    #[test]
    fn test_slugify_simple() {
        assert_eq!(slugify("hello world"), "hello-world");
    }

    #[test]
    fn test_slugify_collapses_separator_runs() {
        assert_eq!(slugify("web   dev"), "web-dev");
        assert_eq!(slugify("web _- dev"), "web-dev");
    }

    #[test]
    fn test_slugify_strips_special_chars() {
        assert_eq!(slugify("c++"), "c");
        assert_eq!(slugify("node.js"), "nodejs");
        assert_eq!(slugify("ui/ux"), "uiux");
    }

    #[test]
    fn test_slugify_trims_edge_hyphens() {
        assert_eq!(slugify("  react  "), "react");
        assert_eq!(slugify("-react-"), "react");
        assert_eq!(slugify("_react_"), "react");
    }

    #[test]
    fn test_slugify_lowercases() {
        assert_eq!(slugify("TypeScript"), "typescript");
    }

    #[test]
    fn test_slugify_empty_for_symbol_only_input() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_normalize_tag_name() {
        assert_eq!(normalize_tag_name("  React "), "react");
        assert_eq!(normalize_tag_name("RUST"), "rust");
    }

    // ========================================================================
    // find_or_create tests
    // ========================================================================

    #[tokio::test]
    async fn test_find_or_create_creates_new_tag() {
        let (_pool, service) = setup_test_service().await;

        let tag = service
            .find_or_create("Rust Programming")
            .await
            .expect("Failed to create tag");

        assert!(tag.id > 0);
        assert_eq!(tag.name, "rust programming");
        assert_eq!(tag.slug, "rust-programming");
        assert_eq!(tag.usage_count, 0);
    }

    #[tokio::test]
    async fn test_find_or_create_case_whitespace_variants_resolve_same_row() {
        let (_pool, service) = setup_test_service().await;

        let a = service.find_or_create("  React ").await.unwrap();
        let b = service.find_or_create("react").await.unwrap();
        let c = service.find_or_create("REACT").await.unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(b.id, c.id);
        assert_eq!(a.slug, "react");
    }

    #[tokio::test]
    async fn test_find_or_create_symbol_only_name_fails() {
        let (_pool, service) = setup_test_service().await;

        let result = service.find_or_create("!!!").await;
        assert!(matches!(result, Err(TagServiceError::ValidationError(_))));
    }

    // ========================================================================
    // sync_item_tags tests
    // ========================================================================

    #[tokio::test]
    async fn test_sync_sets_tags_and_counts() {
        let (pool, service) = setup_test_service().await;
        let item_id = create_test_item(&pool, "Item One").await;

        let tags = service
            .sync_item_tags(item_id, &["Rust".to_string(), "CLI".to_string()])
            .await
            .expect("Failed to sync tags");

        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| t.usage_count == 1));

        let item_tags = service.get_item_tags(item_id).await.unwrap();
        assert_eq!(item_tags.len(), 2);
    }

    #[tokio::test]
    async fn test_sync_deduplicates_input() {
        let (pool, service) = setup_test_service().await;
        let item_id = create_test_item(&pool, "Item One").await;

        let tags = service
            .sync_item_tags(
                item_id,
                &["React".to_string(), " react ".to_string(), "REACT".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].usage_count, 1);
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let (pool, service) = setup_test_service().await;
        let item_id = create_test_item(&pool, "Item One").await;
        let names = vec!["rust".to_string(), "web".to_string()];

        let first = service.sync_item_tags(item_id, &names).await.unwrap();
        let second = service.sync_item_tags(item_id, &names).await.unwrap();

        let first_ids: Vec<i64> = first.iter().map(|t| t.id).collect();
        let second_ids: Vec<i64> = second.iter().map(|t| t.id).collect();
        assert_eq!(first_ids, second_ids);

        let first_counts: Vec<i64> = first.iter().map(|t| t.usage_count).collect();
        let second_counts: Vec<i64> = second.iter().map(|t| t.usage_count).collect();
        assert_eq!(first_counts, second_counts);
    }

    #[tokio::test]
    async fn test_sync_removes_stale_associations() {
        let (pool, service) = setup_test_service().await;
        let item_id = create_test_item(&pool, "Item One").await;

        service
            .sync_item_tags(item_id, &["old".to_string(), "kept".to_string()])
            .await
            .unwrap();
        service
            .sync_item_tags(item_id, &["kept".to_string(), "new".to_string()])
            .await
            .unwrap();

        let tags = service.get_item_tags(item_id).await.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["kept", "new"]);

        // The dropped tag survives with usage_count 0
        let (old_tag, items) = service.get_items_by_tag("old").await.unwrap();
        assert_eq!(old_tag.usage_count, 0);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_sync_with_empty_list_clears_tags() {
        let (pool, service) = setup_test_service().await;
        let item_id = create_test_item(&pool, "Item One").await;

        service.sync_item_tags(item_id, &["tag".to_string()]).await.unwrap();
        let tags = service.sync_item_tags(item_id, &[]).await.unwrap();

        assert!(tags.is_empty());
        assert!(service.get_item_tags(item_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shared_tag_counts_distinct_items() {
        let (pool, service) = setup_test_service().await;
        let item1 = create_test_item(&pool, "Item One").await;
        let item2 = create_test_item(&pool, "Item Two").await;

        service.sync_item_tags(item1, &["shared".to_string()]).await.unwrap();
        let tags = service.sync_item_tags(item2, &["shared".to_string()]).await.unwrap();

        assert_eq!(tags[0].usage_count, 2);
    }

    // ========================================================================
    // Popular / search / items-by-tag tests
    // ========================================================================

    #[tokio::test]
    async fn test_get_popular_orders_and_filters() {
        let (pool, service) = setup_test_service().await;
        let item1 = create_test_item(&pool, "Item One").await;
        let item2 = create_test_item(&pool, "Item Two").await;

        service
            .sync_item_tags(item1, &["hot".to_string(), "mild".to_string()])
            .await
            .unwrap();
        service.sync_item_tags(item2, &["hot".to_string()]).await.unwrap();
        // An orphan tag never associated with an item
        service.find_or_create("cold").await.unwrap();

        let popular = service.get_popular(10).await.unwrap();

        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].name, "hot");
        assert_eq!(popular[0].usage_count, 2);
        assert_eq!(popular[1].name, "mild");
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (_pool, service) = setup_test_service().await;
        service.find_or_create("javascript").await.unwrap();
        service.find_or_create("java").await.unwrap();

        let results = service.search("  JAVA ", 10).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_get_items_by_tag() {
        let (pool, service) = setup_test_service().await;
        let item1 = create_test_item(&pool, "Item One").await;
        let item2 = create_test_item(&pool, "Item Two").await;

        service.sync_item_tags(item1, &["docker".to_string()]).await.unwrap();
        service.sync_item_tags(item2, &["docker".to_string()]).await.unwrap();

        let (tag, items) = service.get_items_by_tag("docker").await.unwrap();

        assert_eq!(tag.slug, "docker");
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_get_items_by_unknown_slug_is_not_found() {
        let (_pool, service) = setup_test_service().await;

        let result = service.get_items_by_tag("missing").await;
        assert!(matches!(result, Err(TagServiceError::NotFound(_))));
    }

    // ========================================================================
    // Property-based tests
    // ========================================================================

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::sync::atomic::{AtomicU64, Ordering};

        static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

        fn unique_suffix() -> u64 {
            TEST_COUNTER.fetch_add(1, Ordering::SeqCst)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(30))]

            /// The slug never carries uppercase, separators beyond single
            /// hyphens, or edge hyphens, whatever the input.
            #[test]
            fn property_slug_shape(input in ".{0,60}") {
                let slug = slugify(&input);

                prop_assert!(!slug.starts_with('-'));
                prop_assert!(!slug.ends_with('-'));
                prop_assert!(!slug.contains("--"));
                prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase()
                    || c.is_ascii_digit()
                    || c == '-'));
            }

            /// Slugification is a projection: applying it twice equals
            /// applying it once.
            #[test]
            fn property_slug_projection(input in ".{0,60}") {
                let once = slugify(&input);
                prop_assert_eq!(slugify(&once), once.clone());
            }

            /// Case and surrounding whitespace never change the slug.
            #[test]
            fn property_slug_case_whitespace_invariant(base in "[a-z][a-z0-9 ]{1,20}") {
                let spaced = format!("  {}  ", base);
                let upper = base.to_uppercase();

                prop_assert_eq!(slugify(&spaced), slugify(&base));
                prop_assert_eq!(slugify(&upper), slugify(&base));
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(10))]

            /// Repeated find_or_create calls with case/whitespace variants of
            /// one name always resolve to a single row.
            #[test]
            fn property_find_or_create_single_row(
                base in "[a-z]{3,12}",
                repeats in 2..5usize
            ) {
                let rt = tokio::runtime::Runtime::new().unwrap();
                let result: Result<(), TestCaseError> = rt.block_on(async {
                    let (_pool, service) = setup_test_service().await;
                    let name = format!("{}{}", base, unique_suffix());

                    let first = service.find_or_create(&name).await
                        .expect("find_or_create should succeed");

                    for i in 0..repeats {
                        let variant = if i % 2 == 0 {
                            format!("  {}  ", name.to_uppercase())
                        } else {
                            name.clone()
                        };
                        let tag = service.find_or_create(&variant).await
                            .expect("find_or_create should succeed");
                        prop_assert_eq!(tag.id, first.id);
                        prop_assert_eq!(&tag.slug, &first.slug);
                    }
                    Ok(())
                });
                result?;
            }
        }
    }
}
