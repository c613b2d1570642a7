//! Video metadata store.
//!
//! This crate provides:
//! - The [`VideoRepository`] capability used by the API and the upload pipeline
//! - An in-process implementation backed by a lock-protected map

pub mod error;
pub mod memory;
pub mod repository;

pub use error::{MetadataError, MetadataResult};
pub use memory::InMemoryVideoRepository;
pub use repository::VideoRepository;
