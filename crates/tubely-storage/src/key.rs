//! Asset key derivation.
//!
//! Keys have the shape `<prefix><token><ext>`: the classification prefix
//! (`landscape/`, `portrait/`, `other/` or empty), an opaque token and an
//! extension taken from the declared content type.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use tubely_models::{AspectClass, VideoId};

/// Number of random bytes in a random-strategy token.
const TOKEN_BYTES: usize = 32;

/// Map a content type to a file extension.
///
/// `"video/mp4"` becomes `".mp4"`. Anything that does not split into
/// exactly two parts on `/` becomes `".bin"`.
pub fn media_type_to_ext(media_type: &str) -> String {
    let parts: Vec<&str> = media_type.split('/').collect();
    if parts.len() != 2 {
        return ".bin".to_string();
    }
    format!(".{}", parts[1])
}

/// 32 bytes from the OS-seeded CSPRNG, URL-safe base64 without padding.
///
/// The alphabet (`A-Z a-z 0-9 - _`) is safe in object keys and file names.
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// How the token part of an asset key is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Fresh random token per upload. Re-uploads never overwrite.
    #[default]
    Random,
    /// The video's UUID. Re-uploads with the same class overwrite in place.
    VideoId,
}

impl KeyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStrategy::Random => "random",
            KeyStrategy::VideoId => "video_id",
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(KeyStrategy::Random),
            "video_id" | "videoid" => Ok(KeyStrategy::VideoId),
            other => Err(format!("unknown asset key strategy: {}", other)),
        }
    }
}

impl fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object key of a stored video asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn derive(
        strategy: KeyStrategy,
        video_id: &VideoId,
        class: Option<AspectClass>,
        content_type: &str,
    ) -> Self {
        let prefix = class.map(|c| c.prefix()).unwrap_or("");
        let token = match strategy {
            KeyStrategy::Random => random_token(),
            KeyStrategy::VideoId => video_id.to_string(),
        };
        Self(format!(
            "{}{}{}",
            prefix,
            token,
            media_type_to_ext(content_type)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
