//! Devshare - a community code and resource sharing platform

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devshare::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCommentRepository, SqlxFavoriteRepository, SqlxItemRepository,
            SqlxSessionRepository, SqlxTagRepository, SqlxUserRepository,
        },
    },
    services::{CommentService, FavoriteService, ItemService, TagService, UserService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devshare=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Devshare...");

    // Load configuration
    let config = Config::load(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let item_repo = SqlxItemRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let favorite_repo = SqlxFavoriteRepository::boxed(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        session_repo,
        item_repo.clone(),
        comment_repo.clone(),
    ));
    let item_service = Arc::new(ItemService::new(
        item_repo.clone(),
        user_repo.clone(),
        comment_repo.clone(),
        tag_repo.clone(),
    ));
    let comment_service = Arc::new(CommentService::new(comment_repo, item_repo.clone()));
    let tag_service = Arc::new(TagService::new(tag_repo, item_repo.clone()));
    let favorite_service = Arc::new(FavoriteService::new(favorite_repo, item_repo));

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        user_service: user_service.clone(),
        item_service,
        comment_service,
        tag_service,
        favorite_service,
        limits: Arc::new(config.limits.clone()),
    };

    // Periodic expired-session cleanup
    {
        let user_service = user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Removed {} expired session(s)", n),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
