//! Video ingestion pipeline.
//!
//! Runs one upload through the stages
//! `RECEIVING -> VALIDATING -> STAGED -> CLASSIFYING -> REMUXING -> UPLOADING -> FINALIZING -> DONE`.
//!
//! The raw upload and the remuxed copy live in temp files owned by
//! [`TempPath`] guards, so both are removed on every exit path. The stored
//! location is written to the record only after the object store acknowledged
//! the upload. If that metadata write fails the object stays in the bucket
//! unreferenced; it is logged, counted and left for the orphan sweeper.

use std::future::Future;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempPath;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, info_span, warn, Instrument};

use tubely_media::{classify, fast_start_output_path, MediaError, MediaProber, Remuxer};
use tubely_metadata::{MetadataError, VideoRepository};
use tubely_models::{AspectClass, StoredLocation, VideoRecord};
use tubely_storage::{sign_location, AssetKey, KeyStrategy, ObjectStore, StorageError};

use crate::config::ApiConfig;
use crate::metrics;

/// Stages of a single ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Receiving,
    Validating,
    Staged,
    Classifying,
    Remuxing,
    Uploading,
    Finalizing,
    Done,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Receiving => "receiving",
            IngestStage::Validating => "validating",
            IngestStage::Staged => "staged",
            IngestStage::Classifying => "classifying",
            IngestStage::Remuxing => "remuxing",
            IngestStage::Uploading => "uploading",
            IngestStage::Finalizing => "finalizing",
            IngestStage::Done => "done",
        }
    }
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad failure category, used for status mapping and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestErrorKind {
    /// Rejected request; nothing was written.
    Input,
    /// ffprobe or ffmpeg failed.
    ExternalTool,
    /// Object store or metadata store failed.
    Storage,
    /// Local temp file I/O failed.
    Staging,
}

impl IngestErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestErrorKind::Input => "input",
            IngestErrorKind::ExternalTool => "external_tool",
            IngestErrorKind::Storage => "storage",
            IngestErrorKind::Staging => "staging",
        }
    }
}

/// Errors produced by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Video is too big: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Missing Content-Type for video")]
    MissingContentType,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Couldn't stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error("Couldn't get video aspect ratio: {0}")]
    Classification(#[source] MediaError),

    #[error("Couldn't create fast-start video: {0}")]
    Remux(#[source] MediaError),

    #[error("Couldn't put object in bucket: {0}")]
    Upload(#[source] StorageError),

    #[error("Couldn't update video: {0}")]
    Finalize(#[source] MetadataError),

    #[error("Couldn't sign video URL: {0}")]
    Signing(#[source] StorageError),
}

impl IngestError {
    pub fn kind(&self) -> IngestErrorKind {
        match self {
            IngestError::PayloadTooLarge { .. }
            | IngestError::MissingContentType
            | IngestError::UnsupportedMediaType(_) => IngestErrorKind::Input,
            IngestError::Staging(_) => IngestErrorKind::Staging,
            IngestError::Classification(_) | IngestError::Remux(_) => {
                IngestErrorKind::ExternalTool
            }
            IngestError::Upload(_) | IngestError::Finalize(_) | IngestError::Signing(_) => {
                IngestErrorKind::Storage
            }
        }
    }

    /// Stage at which the pipeline stopped.
    pub fn stage(&self) -> IngestStage {
        match self {
            IngestError::PayloadTooLarge { .. } => IngestStage::Receiving,
            IngestError::MissingContentType | IngestError::UnsupportedMediaType(_) => {
                IngestStage::Validating
            }
            IngestError::Staging(_) => IngestStage::Staged,
            IngestError::Classification(_) => IngestStage::Classifying,
            IngestError::Remux(_) => IngestStage::Remuxing,
            IngestError::Upload(_) => IngestStage::Uploading,
            IngestError::Finalize(_) => IngestStage::Finalizing,
            IngestError::Signing(_) => IngestStage::Done,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::PayloadTooLarge { .. } => "payload_too_large",
            IngestError::MissingContentType => "missing_content_type",
            IngestError::UnsupportedMediaType(_) => "unsupported_media_type",
            other => other.kind().as_str(),
        }
    }
}

/// Raised inside an [`std::io::Error`] by body readers that hit the request
/// size limit, so staging reports it as [`IngestError::PayloadTooLarge`].
#[derive(Debug, Error)]
#[error("request body exceeded the upload limit")]
pub struct BodyLimitExceeded;

impl BodyLimitExceeded {
    pub fn into_io_error(self) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::Other, self)
    }

    fn is_cause_of(err: &std::io::Error) -> bool {
        err.get_ref()
            .map(|inner| inner.is::<BodyLimitExceeded>())
            .unwrap_or(false)
    }
}

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Container processed assets are written to
    pub bucket: String,
    /// Size ceiling for one upload
    pub max_upload_bytes: u64,
    /// Accepted content types (normalized)
    pub allowed_types: Vec<String>,
    /// Token part of asset keys
    pub key_strategy: KeyStrategy,
    /// Directory for staged files
    pub tmp_dir: PathBuf,
}

impl IngestSettings {
    pub fn from_config(config: &ApiConfig, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            max_upload_bytes: config.max_upload_bytes,
            allowed_types: config.allowed_video_types.clone(),
            key_strategy: config.key_strategy,
            tmp_dir: config.upload_tmp_dir.clone(),
        }
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Record as persisted, with `video_url` holding the stored location
    pub record: VideoRecord,
    /// Freshly signed playback URL
    pub signed_url: Option<String>,
    pub location: StoredLocation,
    pub aspect: AspectClass,
}

/// Reject a declared body length above the ceiling before anything is staged.
pub fn check_declared_length(declared: Option<u64>, limit: u64) -> Result<(), IngestError> {
    match declared {
        Some(len) if len > limit => Err(IngestError::PayloadTooLarge { limit }),
        _ => Ok(()),
    }
}

/// Strip MIME parameters, trim and lower-case a content type.
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_ascii_lowercase()
}

/// Validate a declared content type against an allow-list.
///
/// Returns the normalized type.
pub fn validate_content_type(raw: Option<&str>, allowed: &[String]) -> Result<String, IngestError> {
    let normalized = raw.map(normalize_content_type).unwrap_or_default();
    if normalized.is_empty() {
        return Err(IngestError::MissingContentType);
    }

    if !allowed.iter().any(|t| t.eq_ignore_ascii_case(&normalized)) {
        return Err(IngestError::UnsupportedMediaType(normalized));
    }

    Ok(normalized)
}

/// Record the duration of one stage.
async fn timed<T, F>(stage: IngestStage, fut: F) -> Result<T, IngestError>
where
    F: Future<Output = Result<T, IngestError>>,
{
    let start = Instant::now();
    let result = fut.await;
    metrics::record_stage_duration(stage.as_str(), start.elapsed().as_secs_f64());
    result
}

/// Video ingestion pipeline.
pub struct IngestPipeline {
    store: Arc<dyn ObjectStore>,
    videos: Arc<dyn VideoRepository>,
    prober: Arc<dyn MediaProber>,
    remuxer: Arc<dyn Remuxer>,
    settings: IngestSettings,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        videos: Arc<dyn VideoRepository>,
        prober: Arc<dyn MediaProber>,
        remuxer: Arc<dyn Remuxer>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            store,
            videos,
            prober,
            remuxer,
            settings,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    /// Ingest one upload for an already-authorized video record.
    ///
    /// `declared_len` is the request's `Content-Length`, if any. `body` yields
    /// the raw file bytes.
    pub async fn ingest<R>(
        &self,
        video: VideoRecord,
        content_type: Option<&str>,
        declared_len: Option<u64>,
        body: R,
    ) -> Result<IngestOutcome, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let span = info_span!("ingest", video_id = %video.id, user_id = %video.user_id);

        async move {
            let result = self.run(video, content_type, declared_len, body).await;
            if let Err(e) = &result {
                metrics::record_ingest_failure(e.stage().as_str(), e.kind().as_str());
                warn!(stage = %e.stage(), kind = e.kind().as_str(), "Video ingestion failed: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run<R>(
        &self,
        video: VideoRecord,
        content_type: Option<&str>,
        declared_len: Option<u64>,
        body: R,
    ) -> Result<IngestOutcome, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        check_declared_length(declared_len, self.settings.max_upload_bytes)?;

        let content_type = validate_content_type(content_type, &self.settings.allowed_types)?;

        let (staged, size) = timed(IngestStage::Staged, self.stage(body)).await?;

        let aspect = timed(IngestStage::Classifying, async {
            classify(self.prober.as_ref(), &staged)
                .await
                .map_err(IngestError::Classification)
        })
        .await?;

        // Guard the output before the tool runs so a partial file is removed too.
        let processed = TempPath::from_path(fast_start_output_path(&staged));
        timed(IngestStage::Remuxing, async {
            self.remuxer
                .remux_fast_start(&staged, &processed)
                .await
                .map_err(IngestError::Remux)
        })
        .await?;

        let key = AssetKey::derive(
            self.settings.key_strategy,
            &video.id,
            Some(aspect),
            &content_type,
        );
        timed(IngestStage::Uploading, async {
            self.store
                .put_file(&self.settings.bucket, key.as_str(), &processed, &content_type)
                .await
                .map_err(IngestError::Upload)
        })
        .await?;

        let location = StoredLocation::new(self.settings.bucket.clone(), key.into_string());

        let mut record = video;
        record.video_url = Some(location.to_string());
        record.touch();

        if let Err(e) = timed(IngestStage::Finalizing, async {
            self.videos.update(&record).await.map_err(IngestError::Finalize)
        })
        .await
        {
            metrics::record_orphaned_object();
            warn!(
                container = %location.container,
                key = %location.key,
                "Uploaded object is not referenced by any video record"
            );
            return Err(e);
        }

        let signed_url = sign_location(self.store.as_ref(), record.video_url.as_deref())
            .await
            .map_err(IngestError::Signing)?;

        metrics::record_ingest_completed(aspect.as_str(), size);
        info!(key = %location.key, aspect = %aspect, bytes = size, "Video ingested");

        Ok(IngestOutcome {
            record,
            signed_url,
            location,
            aspect,
        })
    }

    /// Copy the body into a fresh temp file, enforcing the size ceiling.
    async fn stage<R>(&self, body: R) -> Result<(TempPath, u64), IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let limit = self.settings.max_upload_bytes;

        let staged = tempfile::Builder::new()
            .prefix("tubely-upload")
            .suffix(".mp4")
            .tempfile_in(&self.settings.tmp_dir)
            .map_err(IngestError::Staging)?;
        let (file, path) = staged.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut limited = body.take(limit.saturating_add(1));
        let written = tokio::io::copy(&mut limited, &mut file)
            .await
            .map_err(|e| {
                if BodyLimitExceeded::is_cause_of(&e) {
                    IngestError::PayloadTooLarge { limit }
                } else {
                    IngestError::Staging(e)
                }
            })?;

        if written > limit {
            return Err(IngestError::PayloadTooLarge { limit });
        }

        file.flush().await.map_err(IngestError::Staging)?;
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(IngestError::Staging)?;

        debug!(bytes = written, path = %path.display(), "Staged upload");
        Ok((path, written))
    }
}
