//! Comment API endpoints
//!
//! - POST /api/comments - Add a comment
//! - PUT /api/comments/{id} - Edit a comment
//! - DELETE /api/comments/{id} - Delete a comment
//!
//! The delete route dispatches on authorship: an author removing their own
//! comment is a hard delete and needs no reason; a moderator removing
//! someone else's must supply a non-empty `reason`, producing a soft delete
//! with a visible trace.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Comment, CreateCommentInput};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub item_id: i64,
    pub content: String,
    pub screenshot: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
    pub screenshot: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteCommentRequest {
    pub reason: Option<String>,
}

/// POST /api/comments - Create a comment
pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_screenshot_size(&state, body.screenshot.as_deref())?;

    let input = CreateCommentInput {
        item_id: body.item_id,
        content: body.content,
        screenshot: body.screenshot,
    };

    let comment = state.comment_service.create(&user.0, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/comments/{id} - Edit a comment
pub async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    check_screenshot_size(&state, body.screenshot.as_deref())?;

    let comment = state
        .comment_service
        .update(&user.0, id, body.content, body.screenshot)
        .await?;
    Ok(Json(comment))
}

/// DELETE /api/comments/{id} - Delete a comment
///
/// Author: hard delete, no reason. Privileged non-author: moderation soft
/// delete, `reason` required - an empty reason is a validation failure and
/// leaves the comment untouched.
pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // The delete body is optional: the author's own delete carries none
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<DeleteCommentRequest>(&body)
            .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e)))?
            .reason
    };

    let comment = state
        .comment_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Comment {} not found", id)))?;

    if comment.user_id == user.0.id {
        state.comment_service.remove(&user.0, id).await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let reason = reason.unwrap_or_default();
    let moderated = state.comment_service.moderate(&user.0, id, &reason).await?;
    Ok(Json(moderated).into_response())
}

/// Reject screenshots larger than the configured maximum
fn check_screenshot_size(state: &AppState, screenshot: Option<&str>) -> Result<(), ApiError> {
    if let Some(data) = screenshot {
        if data.len() > state.limits.max_screenshot_size {
            return Err(ApiError::new(
                "PAYLOAD_TOO_LARGE",
                format!(
                    "Screenshot exceeds the {} byte limit",
                    state.limits.max_screenshot_size
                ),
            ));
        }
    }
    Ok(())
}
