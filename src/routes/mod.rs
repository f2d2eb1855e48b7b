// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Router assembly and middleware stack
// - health.rs: Health check and metrics endpoints
// - messages.rs: Threads, message history, sending, seen flag
// - device_tokens.rs: Push token registration and removal
// - catalog.rs: Providers and reviews
// - extractors.rs: JSON body extractor with uniform error bodies
// - middleware.rs: Request logging
//
// ============================================================================

mod catalog;
mod device_tokens;
mod extractors;
mod health;
mod messages;
mod middleware;

pub use extractors::ApiJson;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Messaging
        .route("/api/messages/thread", post(messages::get_or_create_thread))
        .route(
            "/api/messages/thread/:thread_id",
            get(messages::list_messages),
        )
        .route("/api/messages/send", post(messages::send_message))
        .route("/api/messages/:message_id/seen", patch(messages::mark_seen))
        // Device tokens
        .route(
            "/api/device-tokens/register",
            post(device_tokens::register_token),
        )
        .route("/api/device-tokens/remove", post(device_tokens::remove_token))
        .route(
            "/api/notifications/refresh-token",
            post(device_tokens::refresh_token),
        )
        // Catalog
        .route("/api/providers", get(catalog::list_providers))
        .route("/api/providers/:provider_id", get(catalog::get_provider))
        .route("/api/reviews", post(catalog::create_review))
        .route(
            "/api/reviews/service/:service_id",
            get(catalog::reviews_for_service),
        )
        // Apply middleware (last added runs first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .into_inner(),
        )
        .with_state(app_context)
}
