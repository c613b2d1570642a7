//! Object store gateway for processed video assets.
//!
//! This crate provides:
//! - The [`ObjectStore`] capability (single-PUT upload, presigned GET, listing, deletion)
//! - An S3 implementation and an in-memory implementation
//! - Asset key derivation (classification prefix + token + extension)
//! - Signing of persisted stored-location references

pub mod client;
pub mod error;
pub mod gateway;
pub mod key;
pub mod memory;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use gateway::{sign_location, ObjectInfo, ObjectStore, SIGNED_URL_EXPIRY};
pub use key::{media_type_to_ext, random_token, AssetKey, KeyStrategy};
pub use memory::InMemoryObjectStore;
