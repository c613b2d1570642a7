//! Fast-start remuxing.
//!
//! Rewrites an MP4 so the `moov` atom precedes the media data, letting players
//! start before the whole file is downloaded. Streams are copied, never
//! re-encoded.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Suffix appended to the input path to name the remuxed output.
pub const PROCESSING_SUFFIX: &str = ".processing";

/// Output path used for a remux of `input`: the input path plus [`PROCESSING_SUFFIX`].
pub fn fast_start_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(PROCESSING_SUFFIX);
    PathBuf::from(name)
}

/// Capability that produces a fast-start copy of a video file.
///
/// Implementations create exactly one file at `output` and never delete
/// `input`; the caller owns both files afterwards.
#[async_trait]
pub trait Remuxer: Send + Sync {
    async fn remux_fast_start(&self, input: &Path, output: &Path) -> MediaResult<()>;
}

/// [`Remuxer`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRemuxer {
    runner: FfmpegRunner,
}

impl FfmpegRemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    fn command(input: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .stream_copy()
            .movflags("faststart")
            .format("mp4")
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux_fast_start(&self, input: &Path, output: &Path) -> MediaResult<()> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        debug!("Remuxing {} for fast start", input.display());
        self.runner.run(&Self::command(input, output)).await?;

        ensure_non_empty(output).await?;

        info!("Created fast-start copy at {}", output.display());
        Ok(())
    }
}

/// Treat a missing or empty output as a failed remux, whatever the tool reported.
async fn ensure_non_empty(output: &Path) -> MediaResult<()> {
    let meta = tokio::fs::metadata(output).await.map_err(|e| {
        MediaError::invalid_video(format!(
            "couldn't stat processed file {}: {}",
            output.display(),
            e
        ))
    })?;

    if meta.len() == 0 {
        return Err(MediaError::invalid_video("processed file is empty"));
    }

    Ok(())
}
