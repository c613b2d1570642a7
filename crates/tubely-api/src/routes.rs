//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    create_video, get_thumbnail, get_video, health, list_videos, ready, upload_thumbnail,
    upload_video,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, json_payload_too_large, request_id, request_logging, security_headers,
};
use crate::state::AppState;

/// Allowance for multipart framing around a thumbnail.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let max_upload = usize::try_from(state.config.max_upload_bytes).unwrap_or(usize::MAX);

    // Video uploads stream to disk; the ceiling applies to the whole request
    let upload_routes = Router::new()
        .route("/video_upload/:video_id", post(upload_video))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(middleware::map_response(json_payload_too_large));

    let thumbnail_upload_routes = Router::new()
        .route("/thumbnail_upload/:video_id", post(upload_thumbnail))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            state.config.max_thumbnail_bytes + FORM_OVERHEAD_BYTES,
        ))
        .layer(middleware::map_response(json_payload_too_large));

    let video_routes = Router::new()
        .route("/videos", post(create_video).get(list_videos))
        .route("/videos/:video_id", get(get_video))
        // Public, like the URLs handed out in thumbnail_url
        .route("/thumbnails/:video_id", get(get_thumbnail))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::map_response(json_payload_too_large));

    let api_routes = Router::new()
        .merge(upload_routes)
        .merge(thumbnail_upload_routes)
        .merge(video_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
