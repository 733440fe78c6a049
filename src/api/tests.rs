//! HTTP-level tests for the API surface
//!
//! These drive the full router over an in-memory database, exercising the
//! approval workflow, the moderation delete paths, tag syncing, and the
//! favorite toggle exactly as a client would.

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{build_router, AppState};
use crate::config::LimitsConfig;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxFavoriteRepository, SqlxItemRepository, SqlxSessionRepository,
    SqlxTagRepository, SqlxUserRepository, UserRepository,
};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::{ApprovalStatus, UserRole};
use crate::services::{CommentService, FavoriteService, ItemService, TagService, UserService};

struct TestApp {
    server: TestServer,
    pool: DynDatabasePool,
}

async fn spawn_app() -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let item_repo = SqlxItemRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let favorite_repo = SqlxFavoriteRepository::boxed(pool.clone());

    let state = AppState {
        pool: pool.clone(),
        user_service: Arc::new(UserService::new(
            user_repo.clone(),
            session_repo,
            item_repo.clone(),
            comment_repo.clone(),
        )),
        item_service: Arc::new(ItemService::new(
            item_repo.clone(),
            user_repo,
            comment_repo.clone(),
            tag_repo.clone(),
        )),
        comment_service: Arc::new(CommentService::new(comment_repo, item_repo.clone())),
        tag_service: Arc::new(TagService::new(tag_repo, item_repo.clone())),
        favorite_service: Arc::new(FavoriteService::new(favorite_repo, item_repo)),
        limits: Arc::new(LimitsConfig::default()),
    };

    let app = build_router(state, "http://localhost:3000");
    let server = TestServer::new(app).expect("Failed to start test server");

    TestApp { server, pool }
}

impl TestApp {
    /// Register an account via the API (it starts PENDING/GUEST)
    async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({ "name": name, "email": email, "password": password }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }

    /// Login, returning the bearer token
    async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Register and promote directly in storage (test seeding only)
    async fn seed_user(&self, name: &str, email: &str, role: UserRole) -> (i64, String) {
        self.register(name, email, "secret123").await;

        let repo = SqlxUserRepository::new(self.pool.clone());
        let mut user = repo.get_by_email(email).await.unwrap().unwrap();
        user.role = role;
        user.status = ApprovalStatus::Approved;
        repo.update(&user).await.unwrap();

        let token = self.login(email, "secret123").await;
        (user.id, token)
    }

    fn auth(&self, token: &str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
    }
}

// ============================================================================
// Registration and approval workflow
// ============================================================================

#[tokio::test]
async fn test_registration_approval_flow() {
    let app = spawn_app().await;
    let (_admin_id, admin_token) = app
        .seed_user("Admin", "admin@example.com", UserRole::Superadmin)
        .await;

    // Register: account is PENDING/GUEST
    let body = app.register("Ana", "ana@example.com", "secret123").await;
    assert_eq!(body["user"]["status"], "PENDING");
    assert_eq!(body["user"]["role"], "GUEST");
    let ana_id = body["user"]["id"].as_i64().unwrap();

    // Login is refused with the pending-specific message
    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ana@example.com", "password": "secret123" }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"]["code"], "PENDING_APPROVAL");

    // Wrong password gets the generic message, not the account state
    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ana@example.com", "password": "wrongpass" }))
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"]["code"], "UNAUTHORIZED");

    // Admin approves: status and role move together
    let (name, value) = app.auth(&admin_token);
    let response = app
        .server
        .put(&format!("/api/admin/users/{}/approve", ana_id))
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let approved = response.json::<Value>();
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["role"], "USER");

    // Ana can now log in and create an item
    let ana_token = app.login("ana@example.com", "secret123").await;
    let (name, value) = app.auth(&ana_token);
    let response = app
        .server
        .post("/api/items")
        .add_header(name, value)
        .json(&json!({
            "title": "Rust snippet",
            "description": "Useful helper",
            "category": "Backend",
            "type": "snippet",
            "language": "rust",
            "code": "fn main() {}"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
}

#[tokio::test]
async fn test_reject_and_reapply_flow() {
    let app = spawn_app().await;
    let (_admin_id, admin_token) = app
        .seed_user("Admin", "admin@example.com", UserRole::Superadmin)
        .await;

    let body = app.register("Bob", "bob@example.com", "secret123").await;
    let bob_id = body["user"]["id"].as_i64().unwrap();

    // Reject with a reason
    let (name, value) = app.auth(&admin_token);
    let response = app
        .server
        .put(&format!("/api/admin/users/{}/reject", bob_id))
        .add_header(name, value)
        .json(&json!({ "reason": "profile incomplete" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "REJECTED");

    // Login reveals the rejection only because the password matched
    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "bob@example.com", "password": "secret123" }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "REGISTRATION_REJECTED"
    );

    // Reapply puts the account back in the queue
    let response = app
        .server
        .post("/api/auth/reapply")
        .json(&json!({ "email": "bob@example.com", "password": "secret123" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["user"]["status"], "PENDING");

    // Reapplying while PENDING is a harmless no-op
    let response = app
        .server
        .post("/api/auth/reapply")
        .json(&json!({ "email": "bob@example.com", "password": "secret123" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["user"]["status"], "PENDING");
}

// ============================================================================
// Item visibility
// ============================================================================

#[tokio::test]
async fn test_item_list_public_detail_members_only() {
    let app = spawn_app().await;
    let (_id, token) = app
        .seed_user("Member", "member@example.com", UserRole::User)
        .await;

    let (name, value) = app.auth(&token);
    let response = app
        .server
        .post("/api/items")
        .add_header(name, value)
        .json(&json!({
            "title": "A link",
            "description": "Worth reading",
            "category": "Learning",
            "type": "link",
            "url": "https://example.com"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let item_id = response.json::<Value>()["id"].as_i64().unwrap();

    // Anonymous list works
    let response = app.server.get("/api/items").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 1);

    // Anonymous detail is denied
    let response = app.server.get(&format!("/api/items/{}", item_id)).await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);

    // Member detail works
    let (name, value) = app.auth(&token);
    let response = app
        .server
        .get(&format!("/api/items/{}", item_id))
        .add_header(name, value)
        .await;
    response.assert_status_ok();
}

// ============================================================================
// Comment moderation
// ============================================================================

async fn create_item_and_comment(app: &TestApp, author_token: &str) -> (i64, i64) {
    let (name, value) = app.auth(author_token);
    let response = app
        .server
        .post("/api/items")
        .add_header(name, value)
        .json(&json!({
            "title": "Discussed",
            "description": "Item with comments",
            "category": "Utility",
            "type": "link",
            "url": "https://example.com"
        }))
        .await;
    let item_id = response.json::<Value>()["id"].as_i64().unwrap();

    let (name, value) = app.auth(author_token);
    let response = app
        .server
        .post("/api/comments")
        .add_header(name, value)
        .json(&json!({ "item_id": item_id, "content": "my original words" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let comment_id = response.json::<Value>()["id"].as_i64().unwrap();

    (item_id, comment_id)
}

#[tokio::test]
async fn test_author_self_delete_removes_comment_entirely() {
    let app = spawn_app().await;
    let (_id, token) = app
        .seed_user("Author", "author@example.com", UserRole::User)
        .await;
    let (item_id, comment_id) = create_item_and_comment(&app, &token).await;

    let (name, value) = app.auth(&token);
    let response = app
        .server
        .delete(&format!("/api/comments/{}", comment_id))
        .add_header(name, value)
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);

    let (name, value) = app.auth(&token);
    let response = app
        .server
        .get(&format!("/api/items/{}/comments", item_id))
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    assert!(response.json::<Value>().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_moderation_delete_requires_reason_and_redacts() {
    let app = spawn_app().await;
    let (_author_id, author_token) = app
        .seed_user("Author", "author@example.com", UserRole::User)
        .await;
    let (_mod_id, mod_token) = app
        .seed_user("Mod", "mod@example.com", UserRole::Moderator)
        .await;
    let (_other_id, other_token) = app
        .seed_user("Other", "other@example.com", UserRole::User)
        .await;
    let (item_id, comment_id) = create_item_and_comment(&app, &author_token).await;

    // Empty reason is a validation failure; the comment is untouched
    let (name, value) = app.auth(&mod_token);
    let response = app
        .server
        .delete(&format!("/api/comments/{}", comment_id))
        .add_header(name, value)
        .json(&json!({ "reason": "  " }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    let (name, value) = app.auth(&other_token);
    let response = app
        .server
        .get(&format!("/api/items/{}/comments", item_id))
        .add_header(name, value)
        .await;
    let comments = response.json::<Value>();
    assert_eq!(comments[0]["content"], "my original words");

    // With a reason the comment becomes soft-deleted
    let (name, value) = app.auth(&mod_token);
    let response = app
        .server
        .delete(&format!("/api/comments/{}", comment_id))
        .add_header(name, value)
        .json(&json!({ "reason": "spam" }))
        .await;
    response.assert_status_ok();

    // Non-privileged viewers get a redacted placeholder: reason only
    let (name, value) = app.auth(&other_token);
    let response = app
        .server
        .get(&format!("/api/items/{}/comments", item_id))
        .add_header(name, value)
        .await;
    let comments = response.json::<Value>();
    assert_eq!(comments[0]["is_deleted"], true);
    assert_eq!(comments[0]["deletion_reason"], "spam");
    assert!(comments[0].get("content").is_none());
    let raw = serde_json::to_string(&comments).unwrap();
    assert!(!raw.contains("my original words"));

    // Privileged viewers see the audit view: content plus reason
    let (name, value) = app.auth(&mod_token);
    let response = app
        .server
        .get(&format!("/api/items/{}/comments", item_id))
        .add_header(name, value)
        .await;
    let comments = response.json::<Value>();
    assert_eq!(comments[0]["content"], "my original words");
    assert_eq!(comments[0]["deletion_reason"], "spam");
}

#[tokio::test]
async fn test_soft_deleted_comment_cannot_be_edited() {
    let app = spawn_app().await;
    let (_author_id, author_token) = app
        .seed_user("Author", "author@example.com", UserRole::User)
        .await;
    let (_mod_id, mod_token) = app
        .seed_user("Mod", "mod@example.com", UserRole::Moderator)
        .await;
    let (_item_id, comment_id) = create_item_and_comment(&app, &author_token).await;

    let (name, value) = app.auth(&mod_token);
    app.server
        .delete(&format!("/api/comments/{}", comment_id))
        .add_header(name, value)
        .json(&json!({ "reason": "spam" }))
        .await
        .assert_status_ok();

    // Neither the author nor the moderator can edit it afterwards
    for token in [&author_token, &mod_token] {
        let (name, value) = app.auth(token);
        let response = app
            .server
            .put(&format!("/api/comments/{}", comment_id))
            .add_header(name, value)
            .json(&json!({ "content": "rewritten" }))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }
}

// ============================================================================
// Tags
// ============================================================================

#[tokio::test]
async fn test_tag_sync_and_popular() {
    let app = spawn_app().await;
    let (_id, token) = app
        .seed_user("Member", "member@example.com", UserRole::User)
        .await;

    let (name, value) = app.auth(&token);
    let response = app
        .server
        .post("/api/items")
        .add_header(name, value)
        .json(&json!({
            "title": "Tagged",
            "description": "Has tags",
            "category": "Frontend",
            "type": "link",
            "url": "https://example.com"
        }))
        .await;
    let item_id = response.json::<Value>()["id"].as_i64().unwrap();

    // A too-short tag name is rejected at the boundary
    let (name, value) = app.auth(&token);
    let response = app
        .server
        .put(&format!("/api/items/{}/tags", item_id))
        .add_header(name, value)
        .json(&json!({ "tags": ["x"] }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    // Case/whitespace variants collapse to one tag
    let (name, value) = app.auth(&token);
    let response = app
        .server
        .put(&format!("/api/items/{}/tags", item_id))
        .add_header(name, value)
        .json(&json!({ "tags": ["  React ", "react", "TypeScript"] }))
        .await;
    response.assert_status_ok();
    let tags = response.json::<Value>();
    assert_eq!(tags.as_array().unwrap().len(), 2);

    // Popular listing reflects usage
    let response = app.server.get("/api/tags/popular").await;
    response.assert_status_ok();
    let popular = response.json::<Value>();
    assert_eq!(popular.as_array().unwrap().len(), 2);
    assert_eq!(popular[0]["usage_count"], 1);

    // Items by tag resolves by slug, 404 on unknown slug
    let response = app.server.get("/api/tags/react/items").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["count"], 1);

    let response = app.server.get("/api/tags/missing/items").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

// ============================================================================
// Favorites
// ============================================================================

#[tokio::test]
async fn test_favorite_toggle_roundtrip() {
    let app = spawn_app().await;
    let (_ana_id, ana_token) = app
        .seed_user("Ana", "ana@example.com", UserRole::User)
        .await;
    let (_bob_id, bob_token) = app
        .seed_user("Bob", "bob@example.com", UserRole::User)
        .await;

    let (name, value) = app.auth(&ana_token);
    let response = app
        .server
        .post("/api/items")
        .add_header(name, value)
        .json(&json!({
            "title": "Favored",
            "description": "Toggle target",
            "category": "Utility",
            "type": "link",
            "url": "https://example.com"
        }))
        .await;
    let item_id = response.json::<Value>()["id"].as_i64().unwrap();

    // Ana favorites
    let (name, value) = app.auth(&ana_token);
    let response = app
        .server
        .post("/api/favorites/toggle")
        .add_header(name, value)
        .json(&json!({ "item_id": item_id }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["is_favorited"], true);

    // Membership is per user
    let (name, value) = app.auth(&ana_token);
    let response = app
        .server
        .get(&format!("/api/favorites/check?item_id={}", item_id))
        .add_header(name, value)
        .await;
    assert_eq!(response.json::<Value>()["is_favorited"], true);

    let (name, value) = app.auth(&bob_token);
    let response = app
        .server
        .get(&format!("/api/favorites/check?item_id={}", item_id))
        .add_header(name, value)
        .await;
    assert_eq!(response.json::<Value>()["is_favorited"], false);

    // Toggle back off: the id list no longer carries the item
    let (name, value) = app.auth(&ana_token);
    let response = app
        .server
        .post("/api/favorites/toggle")
        .add_header(name, value)
        .json(&json!({ "item_id": item_id }))
        .await;
    assert_eq!(response.json::<Value>()["is_favorited"], false);

    let (name, value) = app.auth(&ana_token);
    let response = app
        .server
        .get("/api/favorites/ids")
        .add_header(name, value)
        .await;
    assert!(response.json::<Value>().as_array().unwrap().is_empty());
}

// ============================================================================
// Admin guard
// ============================================================================

#[tokio::test]
async fn test_admin_routes_are_guarded() {
    let app = spawn_app().await;
    let (_id, member_token) = app
        .seed_user("Member", "member@example.com", UserRole::User)
        .await;

    // Anonymous
    let response = app.server.get("/api/admin/users").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

    // Plain member
    let (name, value) = app.auth(&member_token);
    let response = app
        .server
        .get("/api/admin/users")
        .add_header(name, value)
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);

    // Moderator passes
    let (_mod_id, mod_token) = app
        .seed_user("Mod", "mod@example.com", UserRole::Moderator)
        .await;
    let (name, value) = app.auth(&mod_token);
    let response = app
        .server
        .get("/api/admin/users")
        .add_header(name, value)
        .await;
    response.assert_status_ok();

    // But role changes stay superadmin-only
    let (name, value) = app.auth(&mod_token);
    let response = app
        .server
        .put("/api/admin/users/1/role")
        .add_header(name, value)
        .json(&json!({ "role": "MODERATOR" }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let app = spawn_app().await;
    let (_admin_id, admin_token) = app
        .seed_user("Admin", "admin@example.com", UserRole::Superadmin)
        .await;
    app.register("P1", "p1@example.com", "secret123").await;
    app.register("P2", "p2@example.com", "secret123").await;

    let (name, value) = app.auth(&admin_token);
    let response = app
        .server
        .get("/api/admin/stats")
        .add_header(name, value)
        .await;
    response.assert_status_ok();

    let stats = response.json::<Value>();
    assert_eq!(stats["total_users"], 3);
    assert_eq!(stats["pending_users"], 2);
    assert_eq!(stats["superadmins"], 1);
}
