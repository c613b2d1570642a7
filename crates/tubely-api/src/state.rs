//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use tubely_media::{FfmpegRemuxer, FfprobeProber, MediaProber, Remuxer};
use tubely_metadata::{InMemoryVideoRepository, VideoRepository};
use tubely_storage::{InMemoryObjectStore, ObjectStore, S3Client};

use crate::auth::JwtKeys;
use crate::config::{ApiConfig, StorageBackend};
use crate::services::{IngestPipeline, IngestSettings};

/// Bucket name used by the in-memory backend when `S3_BUCKET` is unset.
const LOCAL_BUCKET: &str = "tubely-local";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<dyn ObjectStore>,
    pub videos: Arc<dyn VideoRepository>,
    pub ingest: Arc<IngestPipeline>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Create new application state with the configured backends and the
    /// ffprobe/ffmpeg media tools.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let (storage, bucket): (Arc<dyn ObjectStore>, String) = match config.storage_backend {
            StorageBackend::S3 => {
                let client = S3Client::from_env().await?;
                let bucket = client.bucket().to_string();
                (Arc::new(client), bucket)
            }
            StorageBackend::Memory => {
                warn!("Using in-memory object store; uploads are lost on restart");
                let bucket =
                    std::env::var("S3_BUCKET").unwrap_or_else(|_| LOCAL_BUCKET.to_string());
                (Arc::new(InMemoryObjectStore::new()), bucket)
            }
        };

        let videos: Arc<dyn VideoRepository> = Arc::new(InMemoryVideoRepository::new());
        let prober = Arc::new(FfprobeProber::new().with_timeout(config.media_tool_timeout));
        let remuxer = Arc::new(FfmpegRemuxer::new().with_timeout(config.media_tool_timeout));

        info!(bucket = %bucket, backend = ?config.storage_backend, "Storage configured");

        Ok(Self::from_parts(config, storage, videos, prober, remuxer, bucket))
    }

    /// Assemble state from explicit collaborators.
    pub fn from_parts(
        config: ApiConfig,
        storage: Arc<dyn ObjectStore>,
        videos: Arc<dyn VideoRepository>,
        prober: Arc<dyn MediaProber>,
        remuxer: Arc<dyn Remuxer>,
        bucket: impl Into<String>,
    ) -> Self {
        let settings = IngestSettings::from_config(&config, bucket);
        let ingest = IngestPipeline::new(
            Arc::clone(&storage),
            Arc::clone(&videos),
            prober,
            remuxer,
            settings,
        );
        let jwt = JwtKeys::new(config.jwt_secret.as_bytes());

        Self {
            config,
            storage,
            videos,
            ingest: Arc::new(ingest),
            jwt: Arc::new(jwt),
        }
    }
}
