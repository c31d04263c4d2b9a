use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use crate::{
    controllers::{favorites::FavoritesController, health, narration::NarrationController},
    infrastructure::auth::{auth_middleware, request_id_middleware},
};

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    narration_controller: Arc<NarrationController>,
    favorites_controller: Arc<FavoritesController>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Narration routes (require authentication)
    let narration_routes = Router::new()
        .route(
            "/api/stories/:story_id/narration",
            get(NarrationController::get_narration)
                .post(NarrationController::listen)
                .delete(NarrationController::delete_narration),
        )
        .route(
            "/api/stories/:story_id/narration/prefetch",
            axum::routing::post(NarrationController::prefetch),
        )
        .with_state(narration_controller.clone())
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth_middleware,
        ));

    // Favorites routes (require authentication)
    let favorites_routes = Router::new()
        .route(
            "/api/stories/:story_id/favorite",
            axum::routing::delete(FavoritesController::remove_favorite),
        )
        .with_state(favorites_controller.clone())
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth_middleware,
        ));

    // Build application routes
    let app = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool.clone())
        .merge(narration_routes)
        .merge(favorites_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
