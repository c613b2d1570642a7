//! Video record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub Uuid);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VideoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for VideoId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identifier of the user owning a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Thumbnail image owned by a video record.
///
/// The blob lives on the record itself, so it is written and discarded by the
/// same record update that sets `thumbnail_url`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Raw image bytes
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Declared media type (e.g. "image/png")
    pub media_type: String,
}

impl Thumbnail {
    pub fn new(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            data,
            media_type: media_type.into(),
        }
    }
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("len", &self.data.len())
            .field("media_type", &self.media_type)
            .finish()
    }
}

/// Video record as held by the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Unique video ID
    pub id: VideoId,

    /// Owning user
    pub user_id: UserId,

    /// Video title
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Public URL of the thumbnail endpoint, once a thumbnail was uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Persisted stored-location reference (`"<container>,<key>"`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Owned thumbnail blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
}

impl VideoRecord {
    /// Create a new record with no attached media.
    pub fn new(user_id: UserId, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: VideoId::new(),
            user_id,
            title: title.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
            thumbnail_url: None,
            video_url: None,
            thumbnail: None,
        }
    }

    /// Check whether the given user owns this record.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_parse() {
        let id = VideoId::new();
        let parsed: VideoId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<VideoId>().is_err());
    }

    #[test]
    fn test_new_record_has_no_media() {
        let user = UserId(Uuid::new_v4());
        let record = VideoRecord::new(user, "Boots", "a video");
        assert!(record.video_url.is_none());
        assert!(record.thumbnail_url.is_none());
        assert!(record.thumbnail.is_none());
        assert!(record.is_owned_by(&user));
        assert!(!record.is_owned_by(&UserId(Uuid::new_v4())));
    }

    #[test]
    fn test_thumbnail_serializes_as_base64() {
        let mut record = VideoRecord::new(UserId(Uuid::new_v4()), "t", "");
        record.thumbnail = Some(Thumbnail::new(vec![0xde, 0xad, 0xbe, 0xef], "image/png"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["thumbnail"]["data"], "3q2+7w==");

        let back: VideoRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
