//! Item API endpoints
//!
//! Handles HTTP requests for shared items:
//! - GET /api/items - List items (public, hydrated per viewer)
//! - GET /api/items/{id} - Item detail (members only)
//! - POST /api/items - Create (approved members)
//! - PUT/DELETE /api/items/{id} - Update/delete (owner or privileged)
//! - PUT /api/items/{id}/tags - Replace the item's tag set
//! - GET /api/items/{id}/comments - Comments as the viewer may see them

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{CommentView, CreateItemInput, ItemDetail, Tag, UpdateItemInput};
use crate::services::{access, normalize_tag_name};

/// Tag names must be 2-50 characters after normalization. This is the
/// boundary's contract with the tag service, which does not re-validate.
const TAG_NAME_MIN: usize = 2;
const TAG_NAME_MAX: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SyncTagsRequest {
    pub tags: Vec<String>,
}

/// GET /api/items - List all items
pub async fn list_items(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> Result<Json<Vec<ItemDetail>>, ApiError> {
    let items = state.item_service.list(viewer.as_ref()).await?;
    Ok(Json(items))
}

/// GET /api/items/{id} - Item detail
pub async fn get_item(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<ItemDetail>, ApiError> {
    let detail = state.item_service.get_detail(viewer.as_ref(), id).await?;
    Ok(Json(detail))
}

/// POST /api/items - Create an item
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.item_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/items/{id} - Update an item
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<crate::models::Item>, ApiError> {
    let input = parse_update_item(body)?;
    let item = state.item_service.update(&user.0, id, input).await?;
    Ok(Json(item))
}

/// Map an update request body into `UpdateItemInput`.
///
/// The variant payload (`type` plus its fields) is only parsed when the
/// request actually carries a `type` tag; a request touching only scalar
/// fields leaves the variant unchanged.
fn parse_update_item(body: serde_json::Value) -> Result<UpdateItemInput, ApiError> {
    #[derive(Deserialize)]
    struct ScalarFields {
        title: Option<String>,
        description: Option<String>,
        category: Option<String>,
        repository: Option<String>,
        website: Option<String>,
        youtube: Option<String>,
    }

    let kind = if body.get("type").is_some() {
        Some(
            serde_json::from_value(body.clone())
                .map_err(|e| ApiError::validation_error(format!("Invalid item payload: {}", e)))?,
        )
    } else {
        None
    };

    let fields: ScalarFields = serde_json::from_value(body)
        .map_err(|e| ApiError::validation_error(format!("Invalid item payload: {}", e)))?;

    Ok(UpdateItemInput {
        title: fields.title,
        description: fields.description,
        category: fields.category,
        kind,
        repository: fields.repository,
        website: fields.website,
        youtube: fields.youtube,
    })
}

/// DELETE /api/items/{id} - Delete an item
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.item_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/items/{id}/tags - Replace the item's tag set
///
/// Requires edit rights on the item. Tag name length is validated here,
/// before any name reaches the tag service.
pub async fn sync_item_tags(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<SyncTagsRequest>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let item = state
        .item_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Item {} not found", id)))?;

    if !access::can_edit_item(Some(&user.0), item.author_id) {
        return Err(ApiError::forbidden("You cannot edit this item's tags"));
    }

    for raw in &body.tags {
        let name = normalize_tag_name(raw);
        if name.chars().count() < TAG_NAME_MIN || name.chars().count() > TAG_NAME_MAX {
            return Err(ApiError::validation_error(format!(
                "Tag name must be {}-{} characters: '{}'",
                TAG_NAME_MIN, TAG_NAME_MAX, raw
            )));
        }
    }

    let tags = state.tag_service.sync_item_tags(id, &body.tags).await?;
    Ok(Json(tags))
}

/// GET /api/items/{id}/comments - Comments on an item
pub async fn get_item_comments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let comments = state.comment_service.list_for_viewer(&user.0, id).await?;
    Ok(Json(comments))
}
