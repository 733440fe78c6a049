//! Tag API endpoints
//!
//! Public discovery surface:
//! - GET /api/tags - All tags, most used first
//! - GET /api/tags/popular - Tags in use, most used first
//! - GET /api/tags/search?q=... - Case-insensitive name search
//! - GET /api/tags/{slug}/items - Items carrying a tag

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{ItemDetail, Tag};

#[derive(Debug, Deserialize)]
pub struct ListTagsQuery {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_popular_limit")]
    pub limit: usize,
}

fn default_popular_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    50
}

/// Response for a tag's item listing
#[derive(Debug, Serialize)]
pub struct TagItemsResponse {
    pub tag: Tag,
    pub items: Vec<ItemDetail>,
    pub count: usize,
}

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/popular", get(popular_tags))
        .route("/search", get(search_tags))
        .route("/{slug}/items", get(get_tag_items))
}

/// GET /api/tags - All tags
async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<ListTagsQuery>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.tag_service.get_all(query.limit).await?;
    Ok(Json(tags))
}

/// GET /api/tags/popular - Tags in use, ordered by usage
async fn popular_tags(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.tag_service.get_popular(query.limit).await?;
    Ok(Json(tags))
}

/// GET /api/tags/search?q=... - Search tags by name
async fn search_tags(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.tag_service.search(&query.q, query.limit).await?;
    Ok(Json(tags))
}

/// GET /api/tags/{slug}/items - Items carrying the tag
async fn get_tag_items(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<TagItemsResponse>, ApiError> {
    let (tag, items) = state.tag_service.get_items_by_tag(&slug).await?;
    let items = state.item_service.hydrate_all(viewer.as_ref(), items).await?;

    Ok(Json(TagItemsResponse {
        count: items.len(),
        tag,
        items,
    }))
}
