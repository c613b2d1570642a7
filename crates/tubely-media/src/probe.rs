//! FFprobe stream dimensions and aspect-ratio classification.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use tubely_models::AspectClass;

use crate::command::{check_ffprobe, DEFAULT_TOOL_TIMEOUT_SECS};
use crate::error::{MediaError, MediaResult};

/// Relative tolerance used when matching a ratio against a reference.
pub const ASPECT_TOLERANCE: f64 = 1e-2;

const LANDSCAPE: f64 = 16.0 / 9.0;
const PORTRAIT: f64 = 9.0 / 16.0;

/// Pixel dimensions of the primary video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_class(&self) -> AspectClass {
        classify_dimensions(self.width, self.height)
    }
}

/// Source of stream dimensions for a local video file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe_dimensions(&self, path: &Path) -> MediaResult<Dimensions>;
}

/// Compare `a` to `b` with relative tolerance `epsilon`.
///
/// Exact equality short-circuits; a zero reference falls back to an absolute
/// comparison.
pub fn within_tolerance(a: f64, b: f64, epsilon: f64) -> bool {
    if a == b {
        return true;
    }

    let diff = (a - b).abs();

    if b == 0.0 {
        return diff < epsilon;
    }

    diff / b.abs() < epsilon
}

/// Classify a width/height pair as landscape, portrait or other.
pub fn classify_dimensions(width: u32, height: u32) -> AspectClass {
    let ratio = width as f64 / height as f64;

    if within_tolerance(ratio, LANDSCAPE, ASPECT_TOLERANCE) {
        AspectClass::Landscape
    } else if within_tolerance(ratio, PORTRAIT, ASPECT_TOLERANCE) {
        AspectClass::Portrait
    } else {
        AspectClass::Other
    }
}

/// Probe a file and classify its primary stream.
pub async fn classify(prober: &dyn MediaProber, path: &Path) -> MediaResult<AspectClass> {
    let dims = prober.probe_dimensions(path).await?;
    let class = dims.aspect_class();
    debug!(
        width = dims.width,
        height = dims.height,
        class = %class,
        "Classified video"
    );
    Ok(class)
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Extract the first stream's dimensions from `ffprobe -show_streams` JSON.
fn parse_dimensions(stdout: &[u8]) -> MediaResult<Dimensions> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let first = probe
        .streams
        .first()
        .ok_or_else(|| MediaError::invalid_video("No video streams found"))?;

    // Streams without dimensions (e.g. audio first) read as 0x0 and classify as other.
    Ok(Dimensions::new(
        first.width.unwrap_or(0),
        first.height.unwrap_or(0),
    ))
}

/// [`MediaProber`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Duration,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new()
    }
}

impl FfprobeProber {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffprobe"),
            timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe_dimensions(&self, path: &Path) -> MediaResult<Dimensions> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        check_ffprobe()?;

        let child = Command::new(&self.program)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("FFprobe timed out after {:?}", self.timeout);
                return Err(MediaError::Timeout(self.timeout.as_secs()));
            }
        };

        if !output.status.success() {
            return Err(MediaError::FfprobeFailed {
                message: format!("FFprobe exited with {}", output.status),
                stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
            });
        }

        parse_dimensions(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_ratios() {
        assert_eq!(classify_dimensions(1920, 1080), AspectClass::Landscape);
        assert_eq!(classify_dimensions(1280, 720), AspectClass::Landscape);
        assert_eq!(classify_dimensions(1080, 1920), AspectClass::Portrait);
        assert_eq!(classify_dimensions(720, 1280), AspectClass::Portrait);
        assert_eq!(classify_dimensions(1000, 1000), AspectClass::Other);
        assert_eq!(classify_dimensions(640, 480), AspectClass::Other);
    }

    #[test]
    fn test_tolerance_band() {
        // 1% either side of 16/9 (~1.7778)
        assert_eq!(classify_dimensions(1780, 1000), AspectClass::Landscape);
        assert_eq!(classify_dimensions(1795, 1000), AspectClass::Landscape);
        assert_eq!(classify_dimensions(1762, 1000), AspectClass::Landscape);
        assert_eq!(classify_dimensions(1800, 1000), AspectClass::Other);
        assert_eq!(classify_dimensions(1750, 1000), AspectClass::Other);

        // 9/16 = 0.5625
        assert_eq!(classify_dimensions(565, 1000), AspectClass::Portrait);
        assert_eq!(classify_dimensions(558, 1000), AspectClass::Portrait);
        assert_eq!(classify_dimensions(570, 1000), AspectClass::Other);
    }

    #[test]
    fn test_degenerate_dimensions() {
        assert_eq!(classify_dimensions(0, 0), AspectClass::Other);
        assert_eq!(classify_dimensions(1920, 0), AspectClass::Other);
        assert_eq!(classify_dimensions(0, 1080), AspectClass::Other);
    }

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(1.5, 1.5, 0.0));
        assert!(within_tolerance(1.0, 1.005, 0.01));
        assert!(!within_tolerance(1.0, 1.02, 0.01));
        // Zero reference uses an absolute comparison.
        assert!(within_tolerance(0.005, 0.0, 0.01));
        assert!(!within_tolerance(0.02, 0.0, 0.01));
    }

    #[test]
    fn test_parse_dimensions() {
        let json = br#"{"streams":[{"index":0,"codec_type":"video","width":1280,"height":720},{"index":1,"codec_type":"audio"}]}"#;
        assert_eq!(parse_dimensions(json).unwrap(), Dimensions::new(1280, 720));
    }

    #[test]
    fn test_parse_dimensions_uses_first_stream_only() {
        let json = br#"{"streams":[{"codec_type":"audio"},{"codec_type":"video","width":1280,"height":720}]}"#;
        let dims = parse_dimensions(json).unwrap();
        assert_eq!(dims, Dimensions::new(0, 0));
        assert_eq!(dims.aspect_class(), AspectClass::Other);
    }

    #[test]
    fn test_parse_dimensions_errors() {
        assert!(matches!(
            parse_dimensions(br#"{"streams":[]}"#),
            Err(MediaError::InvalidVideo(_))
        ));
        assert!(matches!(
            parse_dimensions(br#"{}"#),
            Err(MediaError::InvalidVideo(_))
        ));
        assert!(matches!(
            parse_dimensions(b"not json"),
            Err(MediaError::JsonParse(_))
        ));
    }

    struct FixedProber(Dimensions);

    #[async_trait]
    impl MediaProber for FixedProber {
        async fn probe_dimensions(&self, _path: &Path) -> MediaResult<Dimensions> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_classify_with_prober() {
        let prober = FixedProber(Dimensions::new(720, 1280));
        let class = classify(&prober, Path::new("unused.mp4")).await.unwrap();
        assert_eq!(class, AspectClass::Portrait);
    }

    #[tokio::test]
    async fn test_ffprobe_missing_file() {
        let prober = FfprobeProber::new();
        let result = prober
            .probe_dimensions(Path::new("/nonexistent/tubely/upload.mp4"))
            .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
