//! Favorite API endpoints
//!
//! - POST /api/favorites/toggle - Toggle a favorite
//! - GET /api/favorites - Hydrated favorited items
//! - GET /api/favorites/ids - Cheap id projection for listings
//! - GET /api/favorites/check?item_id=... - Membership check
//!
//! All routes require authentication. Toggling additionally requires an
//! approved, non-guest account.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::ItemDetail;
use crate::services::access;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub item_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub is_favorited: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub item_id: i64,
}

/// Build the favorites router (layered behind `require_auth`)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/toggle", post(toggle))
        .route("/", get(list_favorites))
        .route("/ids", get(favorite_ids))
        .route("/check", get(check))
}

/// POST /api/favorites/toggle - Toggle the favorite state of an item
async fn toggle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, ApiError> {
    if !access::can_favorite_items(Some(&user.0)) {
        return Err(ApiError::forbidden("You cannot favorite items"));
    }

    let is_favorited = state
        .favorite_service
        .toggle(user.0.id, body.item_id)
        .await?;
    Ok(Json(ToggleResponse { is_favorited }))
}

/// GET /api/favorites - Hydrated favorited items, newest favorite first
async fn list_favorites(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ItemDetail>>, ApiError> {
    let items = state.favorite_service.get_user_favorites(user.0.id).await?;
    let items = state.item_service.hydrate_all(Some(&user.0), items).await?;
    Ok(Json(items))
}

/// GET /api/favorites/ids - Favorited item IDs
///
/// Never fails: a storage problem degrades to an empty list so listings
/// keep rendering.
async fn favorite_ids(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Json<Vec<i64>> {
    Json(state.favorite_service.get_user_favorite_ids(user.0.id).await)
}

/// GET /api/favorites/check?item_id=... - Membership check
///
/// Never fails: a storage problem degrades to false.
async fn check(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<CheckQuery>,
) -> Json<ToggleResponse> {
    Json(ToggleResponse {
        is_favorited: state.favorite_service.is_favorited(user.0.id, query.item_id).await,
    })
}
