//! Shared data models for the Tubely backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and their owned thumbnails
//! - Stored-location references into the object store
//! - Aspect-ratio classes used to lay out stored assets

pub mod aspect;
pub mod location;
pub mod video;

// Re-export common types
pub use aspect::AspectClass;
pub use location::{LocationError, StoredLocation, LOCATION_DELIMITER};
pub use video::{Thumbnail, UserId, VideoId, VideoRecord};
