//! FFmpeg CLI wrappers for the upload pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a bounded runner
//! - Aspect-ratio classification from FFprobe stream dimensions
//! - Fast-start remuxing (stream copy, `-movflags faststart`)
//!
//! Both external tools sit behind the [`MediaProber`] and [`Remuxer`] traits so
//! the pipeline can run against in-process fakes.

pub mod command;
pub mod error;
pub mod faststart;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use faststart::{fast_start_output_path, FfmpegRemuxer, Remuxer, PROCESSING_SUFFIX};
pub use probe::{
    classify, classify_dimensions, within_tolerance, Dimensions, FfprobeProber, MediaProber,
    ASPECT_TOLERANCE,
};
