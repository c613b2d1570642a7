//! Aspect-ratio classes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete aspect-ratio category of an uploaded video.
///
/// Only used to pick the storage path prefix of the asset key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectClass {
    /// 16:9
    Landscape,
    /// 9:16
    Portrait,
    /// Anything else
    Other,
}

impl AspectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }

    /// Storage path prefix for assets of this class.
    pub fn prefix(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape/",
            AspectClass::Portrait => "portrait/",
            AspectClass::Other => "other/",
        }
    }

    /// All classes, in classification order.
    pub fn all() -> [AspectClass; 3] {
        [AspectClass::Landscape, AspectClass::Portrait, AspectClass::Other]
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
