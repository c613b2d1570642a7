//! Thumbnail handlers.
//!
//! Thumbnails are stored on the video record itself and served back from
//! `/api/thumbnails/:video_id`.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

use tubely_models::{Thumbnail, VideoId};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::videos::{load_owned_video, VideoResponse};
use crate::state::AppState;

/// Multipart field carrying the thumbnail image.
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Upload a thumbnail for a video.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoResponse>> {
    let mut video = load_owned_video(&state, &user, &video_id).await?;
    let limit = state.config.max_thumbnail_bytes;

    while let Some(mut field) = multipart.next_field().await.map_err(ApiError::multipart)? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let media_type = field
            .content_type()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("Missing Content-Type for thumbnail"))?;

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(ApiError::multipart)? {
            if data.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge(format!(
                    "Thumbnail exceeds {} bytes",
                    limit
                )));
            }
            data.extend_from_slice(&chunk);
        }

        info!(
            video_id = %video.id,
            user_id = %user.user_id,
            bytes = data.len(),
            media_type = %media_type,
            "Uploading thumbnail"
        );

        video.thumbnail_url = Some(format!(
            "{}/api/thumbnails/{}",
            state.config.public_base_url, video.id
        ));
        video.thumbnail = Some(Thumbnail::new(data, media_type));
        video.touch();

        // Single write: the blob and its URL land together or not at all.
        state.videos.update(&video).await?;

        return Ok(Json(VideoResponse::signed(&state, video).await?));
    }

    Err(ApiError::bad_request(format!(
        "Unable to parse form file: missing '{}' field",
        THUMBNAIL_FIELD
    )))
}

/// Serve a video's thumbnail.
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Response> {
    let video_id: VideoId = video_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid video ID"))?;

    let thumbnail = state
        .videos
        .get(&video_id)
        .await?
        .and_then(|v| v.thumbnail)
        .ok_or_else(|| ApiError::not_found("Thumbnail not found"))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, thumbnail.media_type)],
        thumbnail.data,
    )
        .into_response())
}
