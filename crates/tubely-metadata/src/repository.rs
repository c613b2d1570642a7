//! Video repository capability.

use async_trait::async_trait;

use tubely_models::{UserId, VideoId, VideoRecord};

use crate::error::MetadataResult;

/// Persistence of video records.
///
/// Every call is atomic with respect to a single record: `update` either
/// replaces the whole record or leaves it untouched.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert a new record. Fails with `AlreadyExists` on an ID collision.
    async fn create(&self, video: &VideoRecord) -> MetadataResult<()>;

    /// Get a video by ID.
    async fn get(&self, video_id: &VideoId) -> MetadataResult<Option<VideoRecord>>;

    /// Replace an existing record. Fails with `NotFound` if it was never created.
    async fn update(&self, video: &VideoRecord) -> MetadataResult<()>;

    /// All records owned by a user, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> MetadataResult<Vec<VideoRecord>>;

    /// Every persisted stored-location reference (`video_url`) across all users.
    async fn referenced_locations(&self) -> MetadataResult<Vec<String>>;
}
