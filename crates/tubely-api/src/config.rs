//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use tubely_media::command::DEFAULT_TOOL_TIMEOUT_SECS;
use tubely_storage::KeyStrategy;

/// Largest accepted video upload (1 GiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1 << 30;

/// Largest accepted thumbnail (10 MiB).
pub const DEFAULT_MAX_THUMBNAIL_BYTES: usize = 10 << 20;

/// Where processed assets are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: String,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// Base URL used when building thumbnail URLs
    pub public_base_url: String,
    /// Max video upload size in bytes
    pub max_upload_bytes: u64,
    /// Max thumbnail size in bytes
    pub max_thumbnail_bytes: usize,
    /// Max request body size for JSON routes
    pub max_body_size: usize,
    /// Accepted video content types (normalized, lower-case)
    pub allowed_video_types: Vec<String>,
    /// Token part of asset keys
    pub key_strategy: KeyStrategy,
    /// Directory for staged uploads
    pub upload_tmp_dir: PathBuf,
    /// Upper bound for one ffprobe/ffmpeg run
    pub media_tool_timeout: Duration,
    /// Object store backend
    pub storage_backend: StorageBackend,
    /// Run the orphaned-object sweeper
    pub orphan_sweep_enabled: bool,
    /// Interval between sweeps
    pub orphan_sweep_interval: Duration,
    /// Objects younger than this are never swept
    pub orphan_sweep_grace: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8091,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            jwt_secret: String::new(),
            public_base_url: "http://localhost:8091".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_thumbnail_bytes: DEFAULT_MAX_THUMBNAIL_BYTES,
            max_body_size: 1024 * 1024, // 1MB
            allowed_video_types: vec!["video/mp4".to_string()],
            key_strategy: KeyStrategy::Random,
            upload_tmp_dir: std::env::temp_dir(),
            media_tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            storage_backend: StorageBackend::S3,
            orphan_sweep_enabled: false,
            orphan_sweep_interval: Duration::from_secs(3600),
            orphan_sweep_grace: Duration::from_secs(3600),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET not set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET is empty");
        }

        let port = parsed("API_PORT", defaults.port);

        let key_strategy = match std::env::var("ASSET_KEY_STRATEGY") {
            Ok(v) => v.parse().map_err(anyhow::Error::msg)?,
            Err(_) => defaults.key_strategy,
        };

        let storage_backend = match std::env::var("STORAGE_BACKEND") {
            Ok(v) => v.parse().map_err(anyhow::Error::msg)?,
            Err(_) => defaults.storage_backend,
        };

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port,
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors_origins),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            jwt_secret,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            max_thumbnail_bytes: parsed("MAX_THUMBNAIL_BYTES", defaults.max_thumbnail_bytes),
            max_body_size: parsed("MAX_BODY_SIZE", defaults.max_body_size),
            allowed_video_types: std::env::var("ALLOWED_VIDEO_TYPES")
                .map(|s| split_list(&s).into_iter().map(|t| t.to_lowercase()).collect())
                .unwrap_or(defaults.allowed_video_types),
            key_strategy,
            upload_tmp_dir: std::env::var("UPLOAD_TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_tmp_dir),
            media_tool_timeout: Duration::from_secs(parsed(
                "MEDIA_TOOL_TIMEOUT_SECS",
                DEFAULT_TOOL_TIMEOUT_SECS,
            )),
            storage_backend,
            orphan_sweep_enabled: std::env::var("ORPHAN_SWEEP_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.orphan_sweep_enabled),
            orphan_sweep_interval: Duration::from_secs(parsed("ORPHAN_SWEEP_INTERVAL_SECS", 3600)),
            orphan_sweep_grace: Duration::from_secs(parsed("ORPHAN_SWEEP_GRACE_SECS", 3600)),
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.max_upload_bytes, 1_073_741_824);
        assert_eq!(config.max_thumbnail_bytes, 10 * 1024 * 1024);
        assert_eq!(config.allowed_video_types, vec!["video/mp4"]);
        assert_eq!(config.key_strategy, KeyStrategy::Random);
        assert!(!config.orphan_sweep_enabled);
        assert!(!config.is_production());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" video/mp4 , video/quicktime,,"),
            vec!["video/mp4", "video/quicktime"]
        );
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("gcs".parse::<StorageBackend>().is_err());
    }
}
