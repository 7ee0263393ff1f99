//! Shared types for the EO product store.
//!
//! This crate contains the domain types used across the workspace:
//! error taxonomy, bounding boxes, coordinate reference systems,
//! in-memory datasets, product metadata and configuration loading.

pub mod bbox;
pub mod crs;
pub mod dataset;
pub mod error;
pub mod metadata;
pub mod settings;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::Crs;
pub use dataset::{Dataset, Dimension, GeoReference, GeoTransform, Variable};
pub use error::{EoError, EoResult};
pub use metadata::ProductMetadata;
pub use settings::{SentinelHubSettings, Settings, StorageSection};
