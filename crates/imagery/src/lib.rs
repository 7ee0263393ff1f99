//! Sentinel-Hub imagery fetch and store.
//!
//! A request capability (the [`ImageryRequest`] trait) produces one
//! fetched product per call; [`FetchAndStore`] drives it, validates the
//! imagery, derives object names from the request document and uploads
//! both the imagery and the request sidecar to the product store.

pub mod fetch;
pub mod naming;
pub mod request;
pub mod sentinel_hub;
pub mod validate;

pub use fetch::{FetchAndStore, FetchPolicy, StorageRun};
pub use naming::Frequency;
pub use request::{FetchedProduct, ImageryRequest};
pub use sentinel_hub::{ProcessRequest, SentinelHubClient, SentinelHubRequest};
