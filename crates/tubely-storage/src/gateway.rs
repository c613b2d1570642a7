//! Object store capability and reference signing.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use tubely_models::StoredLocation;

use crate::error::{StorageError, StorageResult};

/// Lifetime of every signed playback URL.
pub const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(300);

/// Information about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp (milliseconds since epoch)
    pub last_modified: Option<u64>,
}

/// Object store operations used by the upload pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file as a single object.
    ///
    /// Succeeds only once the store acknowledged the write; a failed upload
    /// leaves no object behind.
    async fn put_file(
        &self,
        container: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Produce a time-limited URL granting anonymous read of one object.
    async fn presign_get(
        &self,
        container: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// List objects under a prefix.
    async fn list_objects(&self, container: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Delete one object.
    async fn delete_object(&self, container: &str, key: &str) -> StorageResult<()>;

    /// Check connectivity to a container.
    async fn check_connectivity(&self, container: &str) -> StorageResult<()>;
}

/// Turn a persisted reference into a signed URL.
///
/// Returns `Ok(None)` when there is no reference. A reference without a
/// delimiter is passed through unchanged. Malformed references are rejected.
pub async fn sign_location(
    store: &dyn ObjectStore,
    reference: Option<&str>,
) -> StorageResult<Option<String>> {
    let location = StoredLocation::parse_optional(reference)
        .map_err(|e| StorageError::InvalidKey(e.to_string()))?;

    let Some(location) = location else {
        return Ok(reference.map(str::to_string));
    };

    debug!(container = %location.container, key = %location.key, "Signing stored location");
    let url = store
        .presign_get(&location.container, &location.key, SIGNED_URL_EXPIRY)
        .await?;
    Ok(Some(url))
}
