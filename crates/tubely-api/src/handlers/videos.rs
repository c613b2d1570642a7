//! Video API handlers.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;
use tracing::info;

use tubely_models::{UserId, VideoId, VideoRecord};
use tubely_storage::sign_location;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::BodyLimitExceeded;
use crate::state::AppState;

/// Multipart field carrying the video file.
pub const VIDEO_FIELD: &str = "video";

/// Video response, with `video_url` freshly signed.
#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub id: VideoId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
}

impl VideoResponse {
    fn new(record: VideoRecord, signed_url: Option<String>) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            description: record.description,
            created_at: record.created_at,
            updated_at: record.updated_at,
            thumbnail_url: record.thumbnail_url,
            video_url: signed_url,
        }
    }

    /// Build a response, signing the record's stored location.
    pub async fn signed(state: &AppState, record: VideoRecord) -> ApiResult<Self> {
        let signed_url = sign_location(state.storage.as_ref(), record.video_url.as_deref()).await?;
        Ok(Self::new(record, signed_url))
    }
}

/// Create video request.
#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Load a video and check the caller owns it.
pub async fn load_owned_video(
    state: &AppState,
    user: &AuthUser,
    video_id: &str,
) -> ApiResult<VideoRecord> {
    let video_id: VideoId = video_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid ID"))?;

    let video = state
        .videos
        .get(&video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Couldn't find video"))?;

    if !video.is_owned_by(&user.user_id) {
        return Err(ApiError::forbidden("Not authorized to update this video"));
    }

    Ok(video)
}

/// Create a draft video record.
pub async fn create_video(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateVideoRequest>,
) -> ApiResult<(StatusCode, Json<VideoResponse>)> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let video = VideoRecord::new(user.user_id, title, request.description);
    state.videos.create(&video).await?;

    Ok((StatusCode::CREATED, Json(VideoResponse::new(video, None))))
}

/// List the caller's videos.
pub async fn list_videos(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<VideoResponse>>> {
    let videos = state.videos.list_for_user(&user.user_id).await?;

    let mut response = Vec::with_capacity(videos.len());
    for video in videos {
        response.push(VideoResponse::signed(&state, video).await?);
    }

    Ok(Json(response))
}

/// Get one of the caller's videos.
pub async fn get_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let video = load_owned_video(&state, &user, &video_id).await?;
    Ok(Json(VideoResponse::signed(&state, video).await?))
}

/// Upload the video file for a record.
///
/// The `video` field is streamed straight into the ingestion pipeline.
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoResponse>> {
    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let video = load_owned_video(&state, &user, &video_id).await?;

    info!(video_id = %video.id, user_id = %user.user_id, "Uploading video");

    while let Some(field) = multipart.next_field().await.map_err(ApiError::multipart)? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let body = Box::pin(StreamReader::new(field.map_err(multipart_io_error)));

        let outcome = state
            .ingest
            .ingest(video, content_type.as_deref(), declared_len, body)
            .await?;

        return Ok(Json(VideoResponse::new(outcome.record, outcome.signed_url)));
    }

    Err(ApiError::bad_request(format!(
        "Unable to parse form file: missing '{}' field",
        VIDEO_FIELD
    )))
}

fn multipart_io_error(err: MultipartError) -> std::io::Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BodyLimitExceeded.into_io_error()
    } else {
        std::io::Error::new(std::io::ErrorKind::Other, err)
    }
}
