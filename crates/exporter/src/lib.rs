//! Dataset export to object storage.
//!
//! Turns an in-memory [`eo_common::Dataset`] into stored artifacts:
//! a GeoTIFF raster, a JSON metadata sidecar and a Zarr store, each
//! under a deterministic key derived from the processing chain and the
//! product metadata.

pub mod exporter;
pub mod geotiff;
pub mod json;
pub mod zarr;

pub use exporter::DatasetExporter;
pub use geotiff::{DecodedGeoTiff, GeoTiffOptions};
pub use zarr::ZarrOptions;
