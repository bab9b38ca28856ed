//! Router configuration for the HTTP API.
//!
//! Sets up all routes and middleware (CORS, compression, tracing) and
//! returns the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the API router with versioned endpoints
    let api_v1 = Router::new()
        // Schedule CRUD
        .route("/schedules", get(handlers::list_schedules))
        .route("/schedules", post(handlers::create_schedule))
        .route("/schedules/{reference}", get(handlers::get_schedule))
        .route("/schedules/{reference}", put(handlers::update_schedule))
        .route("/schedules/{reference}", delete(handlers::delete_schedule))
        // Lifecycle and derived views
        .route("/schedules/{reference}/status", put(handlers::change_status))
        .route("/schedules/{reference}/stops", get(handlers::get_stop_times))
        // Driver views
        .route(
            "/drivers/{driver_id}/schedules",
            get(handlers::list_driver_schedules),
        )
        .route(
            "/drivers/{driver_id}/schedules/{reference}",
            get(handlers::get_driver_schedule),
        );

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo =
            Arc::new(LocalRepository::new()) as Arc<dyn crate::db::repository::FullRepository>;
        let state = AppState::new(repo);
        let _router = create_router(state);
        // If we got here, router was created successfully
    }
}
