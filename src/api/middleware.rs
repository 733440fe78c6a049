//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session token validation)
//! - Authorization (privileged-route guard)
//!
//! Plus the shared application state and the JSON error envelope all
//! handlers return.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LimitsConfig;
use crate::models::User;
use crate::services::{
    CommentService, CommentServiceError, FavoriteService, FavoriteServiceError, ItemService,
    ItemServiceError, TagService, TagServiceError, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub item_service: Arc<ItemService>,
    pub comment_service: Arc<CommentService>,
    pub tag_service: Arc<TagService>,
    pub favorite_service: Arc<FavoriteService>,
    pub limits: Arc<LimitsConfig>,
}

/// Authenticated user extracted from the request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Possibly-anonymous viewer, for routes behind `optional_auth`
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|u| u.0.clone()),
        ))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" | "PENDING_APPROVAL" | "REGISTRATION_REJECTED" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "INVALID_STATE" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::PendingApproval => ApiError::new(
                "PENDING_APPROVAL",
                "Your registration is awaiting administrator approval",
            ),
            UserServiceError::Rejected(reason) => ApiError::new(
                "REGISTRATION_REJECTED",
                format!("Your registration was rejected: {}", reason),
            ),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::EmailTaken(email) => {
                ApiError::conflict(format!("Email already registered: {}", email))
            }
            UserServiceError::PermissionDenied(msg) => ApiError::forbidden(msg),
            UserServiceError::NotFound(id) => ApiError::not_found(format!("User {} not found", id)),
            UserServiceError::InvalidState(msg) => ApiError::new("INVALID_STATE", msg),
            UserServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<ItemServiceError> for ApiError {
    fn from(err: ItemServiceError) -> Self {
        match err {
            ItemServiceError::NotFound(id) => ApiError::not_found(format!("Item {} not found", id)),
            ItemServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ItemServiceError::PermissionDenied(msg) => ApiError::forbidden(msg),
            ItemServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound(msg) => ApiError::not_found(msg),
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::PermissionDenied(msg) => ApiError::forbidden(msg),
            CommentServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(msg) => ApiError::not_found(msg),
            TagServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            TagServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<FavoriteServiceError> for ApiError {
    fn from(err: FavoriteServiceError) -> Self {
        match err {
            FavoriteServiceError::NotFound(id) => {
                ApiError::not_found(format!("Item {} not found", id))
            }
            FavoriteServiceError::InternalError(e) => internal(e),
        }
    }
}

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Internal error: {:#}", e);
    ApiError::internal_error("Internal server error")
}

/// Extract session token from request headers
fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        if let Ok(Some(user)) = state.user_service.validate_session(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}

/// Privileged-route guard; layered after `require_auth` on admin routes
pub async fn require_privileged(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_privileged() {
        return Err(ApiError::forbidden("Moderator privileges required"));
    }

    Ok(next.run(request).await)
}
