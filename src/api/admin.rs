//! Admin API endpoints
//!
//! User management for moderators and superadmins:
//! - GET /api/admin/users[?status=..&role=..] - List users
//! - GET /api/admin/users/pending - Approval queue
//! - PUT /api/admin/users/{id}/approve - Approve a registration
//! - PUT /api/admin/users/{id}/reject - Reject a registration
//! - PUT /api/admin/users/{id}/role - Change a role (superadmin)
//! - PUT /api/admin/users/{id}/password - Reset a password
//! - PUT /api/admin/users/{id} - Edit profile fields
//! - DELETE /api/admin/users/{id} - Delete an account (superadmin)
//! - GET /api/admin/stats - Platform statistics
//!
//! All routes sit behind `require_auth` + `require_privileged`; the
//! services re-check the finer-grained rules (e.g. only a superadmin may
//! change roles, and never their own).

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::api::auth::UserResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{ApprovalStatus, UpdateProfileInput, UserRole};
use crate::services::PlatformStats;

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub status: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

/// Build the admin router (layered behind auth + privilege middleware)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/pending", get(list_pending_users))
        .route("/users/{id}/approve", put(approve_user))
        .route("/users/{id}/reject", put(reject_user))
        .route("/users/{id}/role", put(change_role))
        .route("/users/{id}/password", put(reset_password))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .route("/stats", get(stats))
}

/// GET /api/admin/users - List users with optional status/role filters
async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let status = parse_filter::<ApprovalStatus>(query.status.as_deref(), "status")?;
    let role = parse_filter::<UserRole>(query.role.as_deref(), "role")?;

    let users = state.user_service.list_users(&user.0, status, role).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// GET /api/admin/users/pending - The approval queue
async fn list_pending_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state
        .user_service
        .list_users(&user.0, Some(ApprovalStatus::Pending), None)
        .await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// PUT /api/admin/users/{id}/approve - Approve a pending registration
///
/// Approval and the GUEST -> USER promotion are one transition.
async fn approve_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let approved = state.user_service.approve(&user.0, id).await?;
    Ok(Json(approved.into()))
}

/// PUT /api/admin/users/{id}/reject - Reject a pending registration
async fn reject_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<UserResponse>, ApiError> {
    // The reason body is optional
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RejectRequest>(&body)
            .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e)))?
            .reason
    };

    let rejected = state.user_service.reject(&user.0, id, reason).await?;
    Ok(Json(rejected.into()))
}

/// PUT /api/admin/users/{id}/role - Change a user's role
async fn change_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<ChangeRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let role = UserRole::from_str(&body.role)
        .map_err(|_| ApiError::validation_error(format!("Invalid role: {}", body.role)))?;

    let updated = state.user_service.change_role(&user.0, id, role).await?;
    Ok(Json(updated.into()))
}

/// PUT /api/admin/users/{id}/password - Reset a user's password
async fn reset_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .user_service
        .admin_reset_password(&user.0, id, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/users/{id} - Edit a user's profile fields
async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AdminUpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let input = UpdateProfileInput {
        name: body.name,
        bio: body.bio,
        avatar: body.avatar,
        ..Default::default()
    };

    let updated = state.user_service.admin_update_user(&user.0, id, input).await?;
    Ok(Json(updated.into()))
}

/// DELETE /api/admin/users/{id} - Delete an account
async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.user_service.delete_account(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/stats - Platform statistics
async fn stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<PlatformStats>, ApiError> {
    let stats = state.user_service.stats(&user.0).await?;
    Ok(Json(stats))
}

fn parse_filter<T: FromStr>(value: Option<&str>, field: &str) -> Result<Option<T>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => T::from_str(raw)
            .map(Some)
            .map_err(|_| ApiError::validation_error(format!("Invalid {} filter: {}", field, raw))),
    }
}
