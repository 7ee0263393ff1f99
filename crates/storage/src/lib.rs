//! Object storage client for the EO product store.
//!
//! Wraps an S3-compatible backend (MinIO, AWS, CloudFerro) behind a
//! small async API, and defines the key layout shared by all product
//! artifacts.

pub mod object_store;
pub mod paths;

pub use self::object_store::{ProductStore, StorageConfig, StoredLocation};
pub use paths::{ProductKey, TEST_PREFIX};
