//! Authentication API endpoints
//!
//! Handles HTTP requests for account management:
//! - POST /api/auth/register - Register (account starts PENDING)
//! - POST /api/auth/login - Login
//! - POST /api/auth/reapply - Re-enter the approval queue after rejection
//! - POST /api/auth/logout - Logout
//! - GET /api/auth/me - Current user
//! - PUT /api/auth/profile - Update own profile
//! - PUT /api/auth/password - Change own password

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{UpdateProfileInput, User};
use crate::services::{LoginInput, RegisterInput};

/// Session cookie lifetime in seconds (matches the session expiry)
const SESSION_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

/// Request body for login and reapply
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Request body for updating the own profile
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub is_public_profile: Option<bool>,
    pub social_links: Option<BTreeMap<String, String>>,
}

/// Request body for changing the own password
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub is_public_profile: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub social_links: BTreeMap<String, String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.to_string(),
            status: user.status.to_string(),
            avatar: user.avatar,
            bio: user.bio,
            is_public_profile: user.is_public_profile,
            social_links: user.social_links,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/reapply", post(reapply))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
        .route("/profile", put(update_profile))
        .route("/password", put(change_password))
}

/// POST /api/auth/register - User registration
///
/// The account starts PENDING with the GUEST role and must be approved by
/// an administrator before it can contribute.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = RegisterInput {
        name: body.name,
        email: body.email,
        password: body.password,
        bio: body.bio,
        avatar: body.avatar,
    };

    let user = state.user_service.register(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Registration received. An administrator will review it shortly.",
            "user": UserResponse::from(user),
        })),
    ))
}

/// POST /api/auth/login - User login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, user) = state
        .user_service
        .login(LoginInput::new(body.email, body.password))
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&session.id, SESSION_COOKIE_MAX_AGE),
    );

    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/auth/reapply - Re-enter the approval queue
///
/// A rejected account holds no live session, so this endpoint takes the
/// credentials instead of a token. Calling it while already PENDING is a
/// no-op; an APPROVED account is told so.
async fn reapply(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state
        .user_service
        .reapply_with_credentials(LoginInput::new(body.email, body.password))
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Your registration is back in the approval queue.",
        "user": UserResponse::from(user),
    })))
}

/// POST /api/auth/logout - User logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            s.split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix("session="))
        })
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, session_cookie("", 0));

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/auth/me - Get current user
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// PUT /api/auth/profile - Update current user's profile
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let input = UpdateProfileInput {
        name: body.name,
        bio: body.bio,
        avatar: body.avatar,
        is_public_profile: body.is_public_profile,
        social_links: body.social_links,
    };

    let updated = state.user_service.update_profile(&user.0, input).await?;
    Ok(Json(updated.into()))
}

/// PUT /api/auth/password - Change current user's password
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .user_service
        .change_password(&user.0, &body.current_password, &body.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Build the httpOnly session cookie header value
fn session_cookie(token: &str, max_age: i64) -> HeaderValue {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age
    );
    HeaderValue::from_str(&cookie).expect("session cookie is always valid ASCII")
}
