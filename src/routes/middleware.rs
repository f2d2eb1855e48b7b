// ============================================================================
// Axum Middleware
// ============================================================================
//
// - request_logging: one log line and one metrics sample per request
//
// ============================================================================

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics;

// Label for requests that matched no route
const UNMATCHED_ROUTE: &str = "unmatched";

/// Request logging middleware
///
/// Labels use the route template (`/api/messages/thread/:thread_id`), never
/// the raw path, so ids stay out of metric labels.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

    tracing::debug!(method = %method, route = %route, "Incoming request");

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[route.as_str(), method.as_str(), status.as_str()])
        .inc();
    metrics::HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[route.as_str()])
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        tracing::warn!(
            method = %method,
            route = %route,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "Request failed"
        );
    } else {
        tracing::info!(
            method = %method,
            route = %route,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "Request completed"
        );
    }

    response
}
