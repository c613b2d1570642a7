//! Stored-location references.
//!
//! A stored asset is addressed by a `(container, key)` pair which is persisted
//! on the video record as a single string: `"<container>,<key>"`. A `,` or `\`
//! inside either part is escaped with a backslash so that any pair survives a
//! format/parse round-trip.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator between container and key.
pub const LOCATION_DELIMITER: char = ',';

const ESCAPE: char = '\\';

/// Errors returned when parsing a persisted reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// No delimiter at all: nothing has been attached yet.
    #[error("reference has no object key")]
    MissingKey,

    #[error("reference has an empty {0}")]
    EmptyPart(&'static str),

    #[error("reference has {0} parts, expected 2")]
    TooManyParts(usize),

    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),

    #[error("reference ends with a dangling escape")]
    DanglingEscape,
}

/// Location of a single object in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredLocation {
    /// Bucket / container name
    pub container: String,
    /// Object key within the container
    pub key: String,
}

impl StoredLocation {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Parse an optional persisted reference.
    ///
    /// `None`, and references without a delimiter, mean no object is attached
    /// and yield `Ok(None)`. Any other malformed reference is an error.
    pub fn parse_optional(reference: Option<&str>) -> Result<Option<Self>, LocationError> {
        match reference.map(str::parse::<Self>) {
            None | Some(Err(LocationError::MissingKey)) => Ok(None),
            Some(Ok(location)) => Ok(Some(location)),
            Some(Err(e)) => Err(e),
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        if c == LOCATION_DELIMITER || c == ESCAPE {
            write!(f, "{}", ESCAPE)?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

impl fmt::Display for StoredLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.container)?;
        write!(f, "{}", LOCATION_DELIMITER)?;
        write_escaped(f, &self.key)
    }
}

impl FromStr for StoredLocation {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::with_capacity(2);
        let mut current = String::new();
        let mut chars = s.chars();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some(next) if next == LOCATION_DELIMITER || next == ESCAPE => current.push(next),
                    Some(other) => return Err(LocationError::InvalidEscape(other)),
                    None => return Err(LocationError::DanglingEscape),
                },
                LOCATION_DELIMITER => parts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        parts.push(current);

        match parts.len() {
            1 => Err(LocationError::MissingKey),
            2 => {
                let key = parts.pop().unwrap_or_default();
                let container = parts.pop().unwrap_or_default();
                if container.is_empty() {
                    return Err(LocationError::EmptyPart("container"));
                }
                if key.is_empty() {
                    return Err(LocationError::EmptyPart("key"));
                }
                Ok(Self { container, key })
            }
            n => Err(LocationError::TooManyParts(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_plain() {
        let loc = StoredLocation::new("tubely-bucket", "landscape/abc.mp4");
        assert_eq!(loc.to_string(), "tubely-bucket,landscape/abc.mp4");
    }

    #[test]
    fn test_round_trip() {
        let pairs = [
            ("tubely-bucket", "landscape/abc.mp4"),
            ("b", "portrait/x_-Y.mp4"),
            ("with,comma", "key,with,commas"),
            ("back\\slash", "trailing\\"),
            ("mixed\\,", ",\\,"),
        ];
        for (container, key) in pairs {
            let loc = StoredLocation::new(container, key);
            let parsed: StoredLocation = loc.to_string().parse().unwrap();
            assert_eq!(parsed, loc, "round trip failed for {:?}", loc);
        }
    }

    #[test]
    fn test_missing_key() {
        assert_eq!("".parse::<StoredLocation>(), Err(LocationError::MissingKey));
        assert_eq!(
            "https://example.com/video.mp4".parse::<StoredLocation>(),
            Err(LocationError::MissingKey)
        );
        assert_eq!("a\\,b".parse::<StoredLocation>(), Err(LocationError::MissingKey));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!("a,b,c".parse::<StoredLocation>(), Err(LocationError::TooManyParts(3)));
        assert_eq!(",key".parse::<StoredLocation>(), Err(LocationError::EmptyPart("container")));
        assert_eq!("bucket,".parse::<StoredLocation>(), Err(LocationError::EmptyPart("key")));
        assert_eq!("bu\\cket,k".parse::<StoredLocation>(), Err(LocationError::InvalidEscape('c')));
        assert_eq!("bucket,k\\".parse::<StoredLocation>(), Err(LocationError::DanglingEscape));
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(StoredLocation::parse_optional(None), Ok(None));
        assert_eq!(StoredLocation::parse_optional(Some("no-delimiter")), Ok(None));
        assert_eq!(
            StoredLocation::parse_optional(Some("b,k")),
            Ok(Some(StoredLocation::new("b", "k")))
        );
        assert!(StoredLocation::parse_optional(Some("a,b,c")).is_err());
    }
}
