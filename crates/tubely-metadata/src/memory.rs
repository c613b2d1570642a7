//! In-process video repository.

use std::collections::HashMap;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, info};

use tubely_models::{UserId, VideoId, VideoRecord};

use crate::error::{MetadataError, MetadataResult};
use crate::repository::VideoRepository;

/// Video repository keeping records in a lock-protected map.
#[derive(Debug, Default)]
pub struct InMemoryVideoRepository {
    videos: RwLock<HashMap<VideoId, VideoRecord>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.videos.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn create(&self, video: &VideoRecord) -> MetadataResult<()> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&video.id) {
            return Err(MetadataError::AlreadyExists(video.id.to_string()));
        }
        videos.insert(video.id, video.clone());
        counter!("tubely_metadata_writes_total", "operation" => "create").increment(1);
        info!(video_id = %video.id, user_id = %video.user_id, "Created video record");
        Ok(())
    }

    async fn get(&self, video_id: &VideoId) -> MetadataResult<Option<VideoRecord>> {
        Ok(self.videos.read().await.get(video_id).cloned())
    }

    async fn update(&self, video: &VideoRecord) -> MetadataResult<()> {
        let mut videos = self.videos.write().await;
        let Some(existing) = videos.get_mut(&video.id) else {
            return Err(MetadataError::not_found(video.id));
        };
        *existing = video.clone();
        counter!("tubely_metadata_writes_total", "operation" => "update").increment(1);
        debug!(video_id = %video.id, "Updated video record");
        Ok(())
    }

    async fn list_for_user(&self, user_id: &UserId) -> MetadataResult<Vec<VideoRecord>> {
        let videos = self.videos.read().await;
        let mut owned: Vec<VideoRecord> = videos
            .values()
            .filter(|v| v.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn referenced_locations(&self) -> MetadataResult<Vec<String>> {
        Ok(self
            .videos
            .read()
            .await
            .values()
            .filter_map(|v| v.video_url.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId(Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryVideoRepository::new();
        let video = VideoRecord::new(user(), "Boots", "a video about boots");
        repo.create(&video).await.unwrap();

        let fetched = repo.get(&video.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Boots");
        assert!(repo.get(&VideoId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let repo = InMemoryVideoRepository::new();
        let video = VideoRecord::new(user(), "t", "d");
        repo.create(&video).await.unwrap();
        assert!(matches!(
            repo.create(&video).await,
            Err(MetadataError::AlreadyExists(_))
        ));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_replaces_whole_record() {
        let repo = InMemoryVideoRepository::new();
        let mut video = VideoRecord::new(user(), "t", "d");
        repo.create(&video).await.unwrap();

        video.video_url = Some("tubely,landscape/abc.mp4".to_string());
        video.touch();
        repo.update(&video).await.unwrap();

        let fetched = repo.get(&video.id).await.unwrap().unwrap();
        assert_eq!(fetched.video_url.as_deref(), Some("tubely,landscape/abc.mp4"));
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let repo = InMemoryVideoRepository::new();
        let video = VideoRecord::new(user(), "t", "d");
        assert!(matches!(
            repo.update(&video).await,
            Err(MetadataError::NotFound(_))
        ));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first() {
        let repo = InMemoryVideoRepository::new();
        let owner = user();

        let mut older = VideoRecord::new(owner, "older", "");
        older.created_at = older.created_at - Duration::minutes(5);
        let newer = VideoRecord::new(owner, "newer", "");
        let foreign = VideoRecord::new(user(), "foreign", "");

        for v in [&older, &newer, &foreign] {
            repo.create(v).await.unwrap();
        }

        let titles: Vec<String> = repo
            .list_for_user(&owner)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_referenced_locations() {
        let repo = InMemoryVideoRepository::new();
        let mut with_video = VideoRecord::new(user(), "a", "");
        with_video.video_url = Some("tubely,portrait/x.mp4".to_string());
        let draft = VideoRecord::new(user(), "b", "");
        repo.create(&with_video).await.unwrap();
        repo.create(&draft).await.unwrap();

        assert_eq!(
            repo.referenced_locations().await.unwrap(),
            vec!["tubely,portrait/x.mp4".to_string()]
        );
    }
}
