//! Dataset export facade.
//!
//! Binds one dataset, a processing-chain name and its product metadata
//! to a base object key, and exposes the three independent export
//! methods. Each method serializes locally, uploads, and reports the
//! stored location; a failure in one artifact leaves the others
//! untouched.

use bytes::Bytes;
use tracing::{info, instrument};

use eo_common::{Dataset, EoResult, ProductMetadata};
use storage::{ProductKey, ProductStore, StoredLocation};

use crate::geotiff::{self, GeoTiffOptions};
use crate::json;
use crate::zarr::{self, ZarrOptions};

pub struct DatasetExporter<'a> {
    store: ProductStore,
    dataset: &'a Dataset,
    chain: String,
    metadata: ProductMetadata,
    base_key: String,
    tiff_options: GeoTiffOptions,
    zarr_options: ZarrOptions,
}

impl<'a> DatasetExporter<'a> {
    /// Bind an exporter to one dataset and processing chain.
    ///
    /// The base key is the chain name under the provenance prefix when
    /// the metadata carries full provenance, the chain name alone
    /// otherwise.
    pub fn new(
        store: ProductStore,
        dataset: &'a Dataset,
        chain: &str,
        metadata: ProductMetadata,
    ) -> EoResult<Self> {
        let base_key = metadata.base_key(chain)?;
        Ok(Self {
            store,
            dataset,
            chain: chain.to_string(),
            metadata,
            base_key,
            tiff_options: GeoTiffOptions::default(),
            zarr_options: ZarrOptions::default(),
        })
    }

    pub fn with_tiff_options(mut self, options: GeoTiffOptions) -> Self {
        self.tiff_options = options;
        self
    }

    pub fn with_zarr_options(mut self, options: ZarrOptions) -> Self {
        self.zarr_options = options;
        self
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn base_key(&self) -> &str {
        &self.base_key
    }

    /// Encode the raster bands as GeoTIFF and upload to `<base>.tif`.
    #[instrument(skip(self), fields(chain = %self.chain))]
    pub async fn to_tiff(&self) -> EoResult<StoredLocation> {
        let bytes = geotiff::encode(self.dataset, &self.tiff_options)?;
        let key = ProductKey::geotiff(&self.base_key);
        let location = self.store.put(&key, Bytes::from(bytes)).await?;
        info!("s3-location: {}", location);
        Ok(location)
    }

    /// Serialize the metadata sidecar and upload to `<base>_metadata.json`.
    #[instrument(skip(self), fields(chain = %self.chain))]
    pub async fn metadata_to_json(&self) -> EoResult<StoredLocation> {
        let bytes = json::encode(&self.metadata, self.dataset)?;
        let key = ProductKey::metadata_json(&self.base_key);
        let location = self.store.put(&key, Bytes::from(bytes)).await?;
        info!("s3-location: {}", location);
        Ok(location)
    }

    /// Encode the full dataset to Zarr and upload under `<base>.zarr/`,
    /// appending along time when the store already holds data.
    #[instrument(skip(self), fields(chain = %self.chain))]
    pub async fn to_zarr(&self) -> EoResult<StoredLocation> {
        let key = ProductKey::zarr_root(&self.base_key);
        let location =
            zarr::write_zarr(&self.store, self.dataset, &key, &self.zarr_options).await?;
        info!("s3-location: {}", location);
        Ok(location)
    }

    /// Reopen this exporter's Zarr store, `None` when nothing is stored.
    pub async fn read_zarr(&self) -> EoResult<Option<Dataset>> {
        let key = ProductKey::zarr_root(&self.base_key);
        zarr::read_zarr(&self.store, &key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eo_common::{BoundingBox, Crs, Dimension, EoError, GeoReference, GeoTransform};
    use serde_json::{json, Value};

    fn dataset(height: usize, width: usize) -> Dataset {
        let mut ds = Dataset::new(vec![
            Dimension::new("time", 1),
            Dimension::new("y", height),
            Dimension::new("x", width),
        ]);
        ds.set_coord("time", vec![1_647_339_630.0]).unwrap();
        let n = height * width;
        ds.add_variable("ndvi", (0..n).map(|i| i as f32 / n as f32).collect())
            .unwrap();
        let bbox = BoundingBox::new(-6.21, 53.23, -6.14, 53.27);
        ds.set_georef(GeoReference {
            crs: Crs::WGS84,
            transform: GeoTransform::from_bbox(&bbox, width, height),
        });
        ds
    }

    #[tokio::test]
    async fn test_to_tiff_uses_chain_key() {
        let store = ProductStore::in_memory();
        let ds = dataset(100, 100);
        let exporter =
            DatasetExporter::new(store.clone(), &ds, "test-chain", ProductMetadata::default())
                .unwrap();

        let location = exporter.to_tiff().await.unwrap();
        assert_eq!(location.key, "test-chain.tif");
        assert!(store.exists("test-chain.tif").await.unwrap());

        let decoded = geotiff::decode(&store.get("test-chain.tif").await.unwrap()).unwrap();
        assert_eq!((decoded.height, decoded.width), (100, 100));
        assert_eq!(decoded.bands, 1);
        assert_eq!(decoded.epsg, Some(4326));
    }

    #[tokio::test]
    async fn test_metadata_to_json_round_trips() {
        let store = ProductStore::in_memory();
        let ds = dataset(2, 2);
        let metadata = ProductMetadata {
            platform: Some("S2A".into()),
            ..Default::default()
        };
        let exporter = DatasetExporter::new(store.clone(), &ds, "test-chain", metadata).unwrap();

        let location = exporter.metadata_to_json().await.unwrap();
        assert_eq!(location.key, "test-chain_metadata.json");

        let body = store.get("test-chain_metadata.json").await.unwrap();
        let doc: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(doc["platform"], json!("S2A"));
        assert_eq!(doc["dataset"]["shape"], json!([1, 2, 2]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_to_zarr_and_read_back() {
        let store = ProductStore::in_memory();
        let ds = dataset(3, 4);
        let exporter =
            DatasetExporter::new(store.clone(), &ds, "test-chain", ProductMetadata::default())
                .unwrap();

        assert!(exporter.read_zarr().await.unwrap().is_none());

        let location = exporter.to_zarr().await.unwrap();
        assert_eq!(location.key, "test-chain.zarr");

        let back = exporter.read_zarr().await.unwrap().unwrap();
        assert_eq!(back.shape(), ds.shape());
        assert_eq!(back.variable("ndvi").unwrap(), ds.variable("ndvi").unwrap());
    }

    #[tokio::test]
    async fn test_provenance_prefix_flows_into_keys() {
        let store = ProductStore::in_memory();
        let ds = dataset(2, 2);
        let metadata = ProductMetadata {
            top_level_directory: Some("products".into()),
            platform: Some("S2A".into()),
            instrument: Some("MSI".into()),
            processing_level: Some("L2A".into()),
            start_time: Some("2022-03-15T10:20:30.123Z".into()),
            id: Some("granule-1".into()),
            ..Default::default()
        };
        let exporter = DatasetExporter::new(store.clone(), &ds, "ndvi", metadata).unwrap();

        let location = exporter.to_tiff().await.unwrap();
        assert_eq!(
            location.key,
            "products/S2A/MSI/L2A/2022/03/granule-1/20220315/ndvi.tif"
        );
    }

    #[tokio::test]
    async fn test_tiff_failure_leaves_json_export_working() {
        let store = ProductStore::in_memory();
        let mut ds = Dataset::new(vec![Dimension::new("y", 2), Dimension::new("x", 2)]);
        ds.add_variable("v", vec![0.0; 4]).unwrap();
        // no georeference: to_tiff must fail, metadata_to_json must not
        let exporter =
            DatasetExporter::new(store.clone(), &ds, "chain", ProductMetadata::default()).unwrap();

        let err = exporter.to_tiff().await.unwrap_err();
        assert!(matches!(err, EoError::Encoding(_)));
        assert!(!store.exists("chain.tif").await.unwrap());

        exporter.metadata_to_json().await.unwrap();
        assert!(store.exists("chain_metadata.json").await.unwrap());
    }
}
