//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video upload ingestion (stage, classify, fast-start remux, store, sign)
//! - Thumbnail upload and serving
//! - Video metadata endpoints behind HS256 bearer tokens
//! - Prometheus metrics and a background orphaned-object sweeper

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{AuthUser, JwtKeys};
pub use config::{ApiConfig, StorageBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{IngestError, IngestOutcome, IngestPipeline, IngestSettings, OrphanSweeper};
pub use state::AppState;
