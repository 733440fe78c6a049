//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the Devshare platform:
//! - Auth endpoints (register, login, reapply, profile)
//! - Item endpoints (snippets, files, links)
//! - Comment endpoints (including the moderation delete path)
//! - Tag endpoints (discovery surface)
//! - Favorite endpoints
//! - Admin endpoints (approval queue, user management, stats)

pub mod admin;
pub mod auth;
pub mod comments;
pub mod favorites;
pub mod items;
pub mod middleware;
pub mod tags;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (privileged roles only)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_privileged))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not privilege)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/favorites", favorites::router())
        .route("/items", post(items::create_item))
        .route(
            "/items/{id}",
            put(items::update_item).delete(items::delete_item),
        )
        .route("/items/{id}/tags", put(items::sync_item_tags))
        .route("/items/{id}/comments", get(items::get_item_comments))
        .route("/comments", post(comments::create_comment))
        .route(
            "/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes (anonymous allowed; a session is honored when present)
    Router::new()
        .route("/items", get(items::list_items))
        .route("/items/{id}", get(items::get_item))
        .nest("/tags", tags::router())
        .nest("/auth", auth::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
