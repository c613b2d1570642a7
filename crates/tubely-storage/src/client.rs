//! S3 client implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::SdkConfig;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::gateway::{ObjectInfo, ObjectStore};

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket holding processed video assets
    pub bucket_name: String,
    /// Region
    pub region: String,
    /// Custom endpoint (MinIO, R2, localstack); AWS when unset
    pub endpoint_url: Option<String>,
    /// Static access key ID; the default provider chain is used when unset
    pub access_key_id: Option<String>,
    /// Static secret access key
    pub secret_access_key: Option<String>,
    /// Path-style addressing (required by most S3-compatible servers)
    pub force_path_style: bool,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            bucket_name: std::env::var("S3_BUCKET")
                .map_err(|_| StorageError::config_error("S3_BUCKET not set"))?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: non_empty_var("S3_ENDPOINT_URL"),
            access_key_id: non_empty_var("S3_ACCESS_KEY_ID"),
            secret_access_key: non_empty_var("S3_SECRET_ACCESS_KEY"),
            force_path_style: std::env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }

    fn static_credentials(&self) -> StorageResult<Option<Credentials>> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Ok(Some(Credentials::new(id, secret, None, None, "env"))),
            (None, None) => Ok(None),
            _ => Err(StorageError::config_error(
                "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together",
            )),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// S3 storage client.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let region = Region::new(config.region.clone());

        let builder = match config.static_credentials()? {
            Some(credentials) => Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(credentials),
            None => {
                let shared: SdkConfig = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                Builder::from(&shared)
            }
        };

        let builder = match &config.endpoint_url {
            Some(endpoint) => builder.endpoint_url(endpoint),
            None => builder,
        };

        let client = Client::from_conf(builder.force_path_style(config.force_path_style).build());

        info!(
            bucket = %config.bucket_name,
            region = %config.region,
            endpoint = config.endpoint_url.as_deref().unwrap_or("aws"),
            "S3 client configured"
        );

        Ok(Self {
            client,
            bucket: config.bucket_name,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    /// Bucket this client was configured for.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_file(
        &self,
        container: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} to {}/{}", path.display(), container, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}/{}", path.display(), container, key);
        Ok(())
    }

    async fn presign_get(
        &self,
        container: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        debug!("Listing {} with prefix: {}", container, prefix);

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(container)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            for obj in response.contents() {
                objects.push(ObjectInfo {
                    key: obj.key().unwrap_or_default().to_string(),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    last_modified: obj
                        .last_modified()
                        .and_then(|t| t.to_millis().ok())
                        .map(|ms| ms as u64),
                });
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn delete_object(&self, container: &str, key: &str) -> StorageResult<()> {
        debug!("Deleting {}/{}", container, key);

        self.client
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    async fn check_connectivity(&self, container: &str) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(container)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("S3 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: Option<&str>, secret: Option<&str>) -> S3Config {
        S3Config {
            bucket_name: "tubely".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: id.map(str::to_string),
            secret_access_key: secret.map(str::to_string),
            force_path_style: false,
        }
    }

    #[test]
    fn test_static_credentials_pairing() {
        assert!(config(None, None).static_credentials().unwrap().is_none());
        assert!(config(Some("id"), Some("secret"))
            .static_credentials()
            .unwrap()
            .is_some());
        assert!(matches!(
            config(Some("id"), None).static_credentials(),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_presign_without_network() {
        let client = S3Client::new(S3Config {
            endpoint_url: Some("http://localhost:9000".to_string()),
            force_path_style: true,
            ..config(Some("id"), Some("secret"))
        })
        .await
        .unwrap();
        assert_eq!(client.bucket(), "tubely");

        let url = client
            .presign_get("tubely", "landscape/abc.mp4", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:9000/tubely/landscape/abc.mp4?"));
        assert!(url.contains("X-Amz-Expires=300"));
    }
}
