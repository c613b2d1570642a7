//! In-memory object store.
//!
//! Used as the `memory` storage backend for local development and as the
//! object store in tests. Presigned URLs use a `memory://` scheme and carry
//! the same expiry query parameters as S3 presigned URLs.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::gateway::{ObjectInfo, ObjectStore};

/// A stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// Object store keeping every object in process memory.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, with an explicit modification time.
    pub async fn insert(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        last_modified: DateTime<Utc>,
    ) {
        self.objects.write().await.insert(
            (container.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                last_modified,
            },
        );
    }

    /// Fetch a copy of an object.
    pub async fn object(&self, container: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of stored objects across all containers.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_file(
        &self,
        container: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        debug!("Storing {} bytes at {}/{}", data.len(), container, key);
        self.insert(container, key, data, content_type, Utc::now()).await;
        Ok(())
    }

    async fn presign_get(
        &self,
        container: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if key.is_empty() {
            return Err(StorageError::PresignFailed("empty key".to_string()));
        }
        Ok(format!(
            "memory://{}/{}?X-Amz-Date={}&X-Amz-Expires={}",
            container,
            key,
            Utc::now().format("%Y%m%dT%H%M%SZ"),
            expires_in.as_secs()
        ))
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let objects = self.objects.read().await;
        let mut listed: Vec<ObjectInfo> = objects
            .iter()
            .filter(|((c, k), _)| c == container && k.starts_with(prefix))
            .map(|((_, k), obj)| ObjectInfo {
                key: k.clone(),
                size: obj.data.len() as u64,
                last_modified: u64::try_from(obj.last_modified.timestamp_millis()).ok(),
            })
            .collect();
        listed.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listed)
    }

    async fn delete_object(&self, container: &str, key: &str) -> StorageResult<()> {
        self.objects
            .write()
            .await
            .remove(&(container.to_string(), key.to_string()));
        Ok(())
    }

    async fn check_connectivity(&self, _container: &str) -> StorageResult<()> {
        Ok(())
    }
}
