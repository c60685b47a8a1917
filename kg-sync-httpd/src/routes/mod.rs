//! HTTP route handlers and router configuration

mod admin;
mod indexing;
mod resources;

use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the main application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(admin::health))
        // Batch synchronization; POST rebuilds, PUT updates in place
        .route(
            "/indexing",
            post(indexing::full_replacement).put(indexing::incremental_update),
        )
        .route(
            "/indexing/categories/:type",
            post(indexing::full_replacement_for_type).put(indexing::incremental_update_for_type),
        )
        .route(
            "/indexing/autorelease",
            post(indexing::full_replacement_auto_release)
                .put(indexing::incremental_update_auto_release),
        )
        .route("/indexing/queries", post(indexing::upload_queries))
        .route(
            "/indexing/resources/:id",
            get(resources::get)
                .put(resources::upsert)
                .delete(resources::delete),
        )
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    if state.config.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}
