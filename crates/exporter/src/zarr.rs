//! Zarr encoding, decoding and time-append for datasets.
//!
//! Datasets are written as a Zarr V3 group: one array per variable and
//! one per coordinate, Blosc zstd compressed, with the group attributes
//! carrying the dataset attributes plus a structure record listing
//! dimensions, variables and coordinates so a store can be reopened
//! without listing it. Writes serialize into a temporary directory with
//! a filesystem store and upload the tree file-by-file; reads go either
//! through an S3-backed sync adapter or back through a local tree.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::{Group, GroupBuilder};
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};

use eo_common::{Dataset, Dimension, EoError, EoResult};
use storage::{ProductStore, StorageConfig, StoredLocation};

/// Group attribute recording dimensions, variables and coordinates.
const STRUCTURE_ATTR: &str = "dataset_structure";

/// A `crs` variable is a georeferencing artifact of upstream tooling
/// and is not carried into the Zarr rendition.
const CRS_VARIABLE: &str = "crs";

/// Options for Zarr encoding.
#[derive(Debug, Clone)]
pub struct ZarrOptions {
    /// Blosc zstd compression level; 0 disables compression.
    pub compression_level: u32,
    /// Byte shuffle before compression.
    pub shuffle: bool,
}

impl Default for ZarrOptions {
    fn default() -> Self {
        Self {
            compression_level: 3,
            shuffle: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DimSpec {
    name: String,
    len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct Structure {
    dims: Vec<DimSpec>,
    data_vars: Vec<String>,
    coords: Vec<String>,
}

impl Structure {
    fn of(dataset: &Dataset) -> Self {
        Self {
            dims: dataset
                .dims()
                .iter()
                .map(|d| DimSpec {
                    name: d.name.clone(),
                    len: d.len,
                })
                .collect(),
            data_vars: dataset
                .variables()
                .iter()
                .map(|v| v.name.clone())
                .filter(|n| n != CRS_VARIABLE)
                .collect(),
            coords: dataset
                .dims()
                .iter()
                .filter(|d| dataset.coord(&d.name).is_some())
                .map(|d| d.name.clone())
                .collect(),
        }
    }
}

/// Keep only attribute values a Zarr store can represent faithfully:
/// strings, numbers, booleans and arrays.
fn json_safe_attrs(attrs: &Map<String, Value>) -> Map<String, Value> {
    attrs
        .iter()
        .filter(|(_, v)| {
            matches!(
                v,
                Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Array(_)
            )
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn blosc_codec(
    level: u32,
    shuffle: bool,
    typesize: usize,
) -> EoResult<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
    let level = u8::try_from(level)
        .ok()
        .and_then(|l| BloscCompressionLevel::try_from(l).ok())
        .ok_or_else(|| EoError::encoding(format!("Invalid Blosc compression level: {}", level)))?;
    let shuffle_mode = if shuffle {
        BloscShuffleMode::Shuffle
    } else {
        BloscShuffleMode::NoShuffle
    };
    // typesize is required when shuffle is enabled
    let typesize = if shuffle { Some(typesize) } else { None };
    let codec = BloscCodec::new(BloscCompressor::Zstd, level, None, shuffle_mode, typesize)
        .map_err(|e| EoError::encoding(format!("Blosc codec: {}", e)))?;
    Ok(Arc::new(codec))
}

fn child_path(name: &str) -> String {
    format!("/{}", name)
}

#[allow(clippy::too_many_arguments)]
fn build_array<S, T>(
    storage: Arc<S>,
    name: &str,
    shape: Vec<u64>,
    data_type: DataType,
    fill_value: FillValue,
    dimension_names: &[String],
    elements: &[T],
    options: &ZarrOptions,
) -> EoResult<()>
where
    S: ReadableStorageTraits + WritableStorageTraits + 'static,
    T: zarrs::array::Element + Copy,
{
    let element_size = std::mem::size_of::<T>();
    let chunk_grid: zarrs::array::ChunkGrid = shape
        .clone()
        .try_into()
        .map_err(|e| EoError::encoding(format!("Chunk grid for {}: {:?}", name, e)))?;

    let mut attrs = Map::new();
    attrs.insert(
        "dimension_names".to_string(),
        Value::Array(
            dimension_names
                .iter()
                .map(|n| Value::String(n.clone()))
                .collect(),
        ),
    );

    let mut binding = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value);
    let mut builder = binding.attributes(attrs);
    if options.compression_level > 0 {
        let codec = blosc_codec(options.compression_level, options.shuffle, element_size)?;
        builder = builder.bytes_to_bytes_codecs(vec![codec]);
    }
    let array = builder
        .build(storage, &child_path(name))
        .map_err(|e| EoError::encoding(format!("Array {}: {}", name, e)))?;

    array
        .store_metadata()
        .map_err(|e| EoError::encoding(format!("Array {} metadata: {}", name, e)))?;

    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
        .map_err(|e| EoError::encoding(format!("Array {} subset: {}", name, e)))?;
    array
        .store_array_subset_elements(&subset, elements)
        .map_err(|e| EoError::encoding(format!("Array {} data: {}", name, e)))?;
    Ok(())
}

/// Write a dataset to a Zarr storage backend at the root path.
pub fn write_to_storage<S>(
    storage: Arc<S>,
    dataset: &Dataset,
    options: &ZarrOptions,
) -> EoResult<()>
where
    S: ReadableStorageTraits + WritableStorageTraits + 'static,
{
    if dataset.is_empty() {
        return Err(EoError::encoding(
            "The dataset is empty and cannot be stored",
        ));
    }

    let structure = Structure::of(dataset);
    let mut group_attrs = json_safe_attrs(dataset.attrs());
    group_attrs.insert(STRUCTURE_ATTR.to_string(), serde_json::to_value(&structure)?);

    let mut binding = GroupBuilder::new();
    let builder = binding.attributes(group_attrs);
    let group = builder
        .build(storage.clone(), "/")
        .map_err(|e| EoError::encoding(format!("Zarr group: {}", e)))?;
    group
        .store_metadata()
        .map_err(|e| EoError::encoding(format!("Zarr group metadata: {}", e)))?;

    let shape: Vec<u64> = dataset.dims().iter().map(|d| d.len as u64).collect();
    let dim_names: Vec<String> = dataset.dims().iter().map(|d| d.name.clone()).collect();

    for variable in dataset.variables() {
        if variable.name == CRS_VARIABLE {
            debug!("Dropping crs variable from Zarr store");
            continue;
        }
        build_array(
            storage.clone(),
            &variable.name,
            shape.clone(),
            DataType::Float32,
            FillValue::from(f32::NAN),
            &dim_names,
            &variable.values,
            options,
        )?;
    }

    for dim in dataset.dims() {
        let Some(values) = dataset.coord(&dim.name) else {
            continue;
        };
        // Time coordinates are whole epochs in the store.
        let values: Vec<f64> = if dim.name == "time" {
            values.iter().map(|v| v.trunc()).collect()
        } else {
            values.to_vec()
        };
        build_array(
            storage.clone(),
            &dim.name,
            vec![dim.len as u64],
            DataType::Float64,
            FillValue::from(f64::NAN),
            std::slice::from_ref(&dim.name),
            &values,
            options,
        )?;
    }

    Ok(())
}

/// Reconstruct a dataset from a Zarr storage backend.
pub fn read_from_storage<S>(storage: Arc<S>) -> EoResult<Dataset>
where
    S: ReadableStorageTraits + 'static,
{
    let group = Group::open(storage.clone(), "/")
        .map_err(|e| EoError::encoding(format!("Zarr group: {}", e)))?;
    let mut attrs = group.attributes().clone();
    let structure: Structure = attrs
        .remove(STRUCTURE_ATTR)
        .map(serde_json::from_value)
        .transpose()?
        .ok_or_else(|| EoError::encoding("Zarr store has no dataset structure record"))?;

    let dims: Vec<Dimension> = structure
        .dims
        .iter()
        .map(|d| Dimension::new(&d.name, d.len))
        .collect();
    let mut dataset = Dataset::new(dims);
    for (key, value) in attrs {
        dataset.set_attr(key, value);
    }

    for name in &structure.coords {
        let values: Vec<f64> = read_elements(storage.clone(), name)?;
        dataset.set_coord(name, values)?;
    }
    for name in &structure.data_vars {
        let values: Vec<f32> = read_elements(storage.clone(), name)?;
        dataset.add_variable(name, values)?;
    }

    Ok(dataset)
}

fn read_elements<S, T>(storage: Arc<S>, name: &str) -> EoResult<Vec<T>>
where
    S: ReadableStorageTraits + 'static,
    T: zarrs::array::ElementOwned,
{
    let array = Array::open(storage, &child_path(name))
        .map_err(|e| EoError::encoding(format!("Array {}: {}", name, e)))?;
    let shape = array.shape().to_vec();
    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
        .map_err(|e| EoError::encoding(format!("Array {} subset: {}", name, e)))?;
    array
        .retrieve_array_subset_elements(&subset)
        .map_err(|e| EoError::encoding(format!("Array {} data: {}", name, e)))
}

/// Blocking executor that works from within a tokio runtime.
///
/// `block_in_place` moves the current task off the async worker thread
/// so the runtime handle can drive the future without nesting runtimes.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// S3-backed storage for direct Zarr access, scoped to one key prefix.
pub type S3Storage = AsyncToSyncStorageAdapter<
    AsyncObjectStore<object_store::prefix::PrefixStore<object_store::aws::AmazonS3>>,
    TokioBlockOn,
>;

/// Open an S3 storage backend rooted at `key` for the zarrs sync API.
pub fn s3_storage(config: &StorageConfig, key: &str) -> EoResult<Arc<S3Storage>> {
    let s3 = object_store::aws::AmazonS3Builder::new()
        .with_endpoint(&config.endpoint)
        .with_bucket_name(&config.bucket)
        .with_access_key_id(&config.access_key_id)
        .with_secret_access_key(&config.secret_access_key)
        .with_region(&config.region)
        .with_allow_http(config.allow_http)
        .build()
        .map_err(|e| EoError::storage(format!("Failed to create S3 client: {}", e)))?;
    let prefixed = object_store::prefix::PrefixStore::new(s3, key);
    let async_store = Arc::new(AsyncObjectStore::new(prefixed));
    Ok(Arc::new(AsyncToSyncStorageAdapter::new(
        async_store,
        TokioBlockOn,
    )))
}

/// Upload a local Zarr tree under `prefix`, returning total bytes.
pub async fn upload_directory(
    store: &ProductStore,
    local: &Path,
    prefix: &str,
) -> EoResult<u64> {
    let mut total = 0u64;
    for entry in walkdir::WalkDir::new(local) {
        let entry = entry.map_err(|e| EoError::storage(format!("Walking Zarr tree: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(local)
            .map_err(|e| EoError::storage(format!("Zarr tree path: {}", e)))?;
        let key = format!("{}/{}", prefix, relative.display());
        let data = tokio::fs::read(entry.path()).await?;
        total += data.len() as u64;
        store.put(&key, Bytes::from(data)).await?;
        debug!(key = %key, "Uploaded Zarr file");
    }
    Ok(total)
}

/// Fetch every object under `prefix` into a local directory.
pub async fn download_directory(
    store: &ProductStore,
    prefix: &str,
    local: &Path,
) -> EoResult<usize> {
    let keys = store.list(prefix).await?;
    for key in &keys {
        let relative = key
            .strip_prefix(prefix)
            .map(|r| r.trim_start_matches('/'))
            .ok_or_else(|| EoError::storage(format!("Key {} outside prefix {}", key, prefix)))?;
        let path = local.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = store.get(key).await?;
        tokio::fs::write(&path, &data).await?;
    }
    Ok(keys.len())
}

/// Open a stored Zarr hierarchy, `None` when nothing sits under the key.
///
/// S3-configured stores are opened in place through the sync adapter;
/// in-memory stores round-trip through a local tree.
pub async fn read_zarr(store: &ProductStore, zarr_key: &str) -> EoResult<Option<Dataset>> {
    if !store.exists_prefix(zarr_key).await? {
        return Ok(None);
    }
    if let Some(config) = store.config() {
        let storage = s3_storage(config, zarr_key)?;
        return Ok(Some(read_from_storage(storage)?));
    }
    let dir = tempfile::tempdir()?;
    download_directory(store, zarr_key, dir.path()).await?;
    let fs = Arc::new(
        FilesystemStore::new(dir.path())
            .map_err(|e| EoError::storage(format!("Filesystem store: {}", e)))?,
    );
    Ok(Some(read_from_storage(fs)?))
}

/// Write a dataset under `zarr_key`, appending along `time` when the
/// store already holds data.
pub async fn write_zarr(
    store: &ProductStore,
    dataset: &Dataset,
    zarr_key: &str,
    options: &ZarrOptions,
) -> EoResult<StoredLocation> {
    let merged;
    let to_write = match read_zarr(store, zarr_key).await? {
        Some(existing) => {
            merged = append_time(&existing, dataset)?;
            &merged
        }
        None => dataset,
    };

    let dir = tempfile::tempdir()?;
    let fs = Arc::new(
        FilesystemStore::new(dir.path())
            .map_err(|e| EoError::storage(format!("Filesystem store: {}", e)))?,
    );
    write_to_storage(fs, to_write, options)?;
    upload_directory(store, dir.path(), zarr_key).await?;
    Ok(store.location(zarr_key))
}

/// Concatenate `incoming` onto `existing` along the time dimension.
///
/// Both datasets must carry `time` as their leading dimension, agree on
/// every other dimension and hold the same variables; anything else is
/// an encoding error rather than a silently corrupted store.
pub fn append_time(existing: &Dataset, incoming: &Dataset) -> EoResult<Dataset> {
    for (label, ds) in [("stored", existing), ("incoming", incoming)] {
        match ds.dims().first() {
            Some(dim) if dim.name == "time" => {}
            _ => {
                return Err(EoError::encoding(format!(
                    "Appending requires a leading time dimension on the {} dataset",
                    label
                )))
            }
        }
    }
    if existing.dims().len() != incoming.dims().len()
        || existing.dims()[1..]
            .iter()
            .zip(&incoming.dims()[1..])
            .any(|(a, b)| a != b)
    {
        return Err(EoError::encoding(format!(
            "Appending needs matching non-time dimensions: stored {:?}, incoming {:?}",
            existing.shape(),
            incoming.shape()
        )));
    }

    let mut stored_vars: Vec<&str> = existing.variables().iter().map(|v| v.name.as_str()).collect();
    let mut incoming_vars: Vec<&str> = incoming
        .variables()
        .iter()
        .map(|v| v.name.as_str())
        .filter(|n| *n != CRS_VARIABLE)
        .collect();
    stored_vars.sort_unstable();
    incoming_vars.sort_unstable();
    if stored_vars != incoming_vars {
        return Err(EoError::encoding(format!(
            "Appending needs matching variables: stored {:?}, incoming {:?}",
            stored_vars, incoming_vars
        )));
    }

    let time_len = existing.dims()[0].len + incoming.dims()[0].len;
    let mut dims = vec![Dimension::new("time", time_len)];
    dims.extend_from_slice(&existing.dims()[1..]);
    let mut merged = Dataset::new(dims);

    let (old_time, new_time) = match (existing.coord("time"), incoming.coord("time")) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(EoError::encoding(
                "Appending requires a time coordinate on both datasets",
            ))
        }
    };
    let mut time: Vec<f64> = old_time.to_vec();
    time.extend_from_slice(new_time);
    merged.set_coord("time", time)?;
    for dim in &existing.dims()[1..] {
        if let Some(values) = existing.coord(&dim.name) {
            merged.set_coord(&dim.name, values.to_vec())?;
        }
    }

    for variable in existing.variables() {
        let addition = incoming
            .variable(&variable.name)
            .ok_or_else(|| EoError::encoding(format!("Missing variable: {}", variable.name)))?;
        let mut values = variable.values.clone();
        values.extend_from_slice(&addition.values);
        merged.add_variable(&variable.name, values)?;
    }

    for (key, value) in existing.attrs() {
        merged.set_attr(key.clone(), value.clone());
    }
    for (key, value) in incoming.attrs() {
        merged.set_attr(key.clone(), value.clone());
    }
    if let Some(georef) = incoming.georef().or(existing.georef()) {
        merged.set_georef(*georef);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eo_common::Dimension;
    use serde_json::json;

    fn sample(time_len: usize, base: f64) -> Dataset {
        let mut ds = Dataset::new(vec![
            Dimension::new("time", time_len),
            Dimension::new("y", 2),
            Dimension::new("x", 3),
        ]);
        let times: Vec<f64> = (0..time_len).map(|i| base + i as f64).collect();
        ds.set_coord("time", times).unwrap();
        ds.set_coord("y", vec![53.0, 52.0]).unwrap();
        ds.set_coord("x", vec![-6.0, -5.0, -4.0]).unwrap();
        let n = time_len * 6;
        ds.add_variable("ndvi", (0..n).map(|i| i as f32).collect())
            .unwrap();
        ds.add_variable("cloud_mask", vec![1.0; n]).unwrap();
        ds.set_attr("source", json!("sentinel-2"));
        ds
    }

    fn filesystem_round_trip(ds: &Dataset, options: &ZarrOptions) -> Dataset {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FilesystemStore::new(dir.path()).unwrap());
        write_to_storage(store.clone(), ds, options).unwrap();
        read_from_storage(store).unwrap()
    }

    #[test]
    fn test_round_trip_filesystem() {
        let ds = sample(2, 1_600_000_000.0);
        let back = filesystem_round_trip(&ds, &ZarrOptions::default());

        assert_eq!(back.shape(), ds.shape());
        assert_eq!(
            back.variables().iter().map(|v| &v.name).collect::<Vec<_>>(),
            vec!["ndvi", "cloud_mask"]
        );
        assert_eq!(back.variable("ndvi").unwrap(), ds.variable("ndvi").unwrap());
        assert_eq!(back.coord("x").unwrap(), ds.coord("x").unwrap());
        assert_eq!(back.attrs().get("source"), Some(&json!("sentinel-2")));
    }

    #[test]
    fn test_round_trip_uncompressed() {
        let ds = sample(1, 0.0);
        let options = ZarrOptions {
            compression_level: 0,
            shuffle: false,
        };
        let back = filesystem_round_trip(&ds, &options);
        assert_eq!(back.variable("ndvi").unwrap(), ds.variable("ndvi").unwrap());
    }

    #[test]
    fn test_time_truncated_to_whole_epochs() {
        let mut ds = sample(1, 0.0);
        ds.set_coord("time", vec![1_600_000_000.75]).unwrap();
        let back = filesystem_round_trip(&ds, &ZarrOptions::default());
        assert_eq!(back.coord("time").unwrap(), &[1_600_000_000.0]);
    }

    #[test]
    fn test_crs_variable_dropped() {
        let mut ds = sample(1, 0.0);
        ds.add_variable("crs", vec![0.0; 6]).unwrap();
        let back = filesystem_round_trip(&ds, &ZarrOptions::default());
        assert!(back.variable("crs").is_none());
        assert!(back.variable("ndvi").is_some());
    }

    #[test]
    fn test_non_representable_attrs_filtered() {
        let mut ds = sample(1, 0.0);
        ds.set_attr("nested", json!({"a": 1}));
        ds.set_attr("missing", Value::Null);
        ds.set_attr("count", json!(7));
        let back = filesystem_round_trip(&ds, &ZarrOptions::default());
        assert!(back.attrs().get("nested").is_none());
        assert!(back.attrs().get("missing").is_none());
        assert_eq!(back.attrs().get("count"), Some(&json!(7)));
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let ds = Dataset::new(vec![Dimension::new("y", 2), Dimension::new("x", 2)]);
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FilesystemStore::new(dir.path()).unwrap());
        let err = write_to_storage(store, &ds, &ZarrOptions::default()).unwrap_err();
        assert!(matches!(err, EoError::Encoding(_)));
    }

    #[test]
    fn test_append_time_merges() {
        let first = sample(2, 100.0);
        let second = sample(1, 200.0);
        let merged = append_time(&first, &second).unwrap();

        assert_eq!(merged.shape(), vec![3, 2, 3]);
        assert_eq!(merged.coord("time").unwrap(), &[100.0, 101.0, 200.0]);
        let ndvi = merged.variable("ndvi").unwrap();
        assert_eq!(ndvi.values.len(), 18);
        assert_eq!(&ndvi.values[..12], &first.variable("ndvi").unwrap().values[..]);
        assert_eq!(&ndvi.values[12..], &second.variable("ndvi").unwrap().values[..]);
    }

    #[test]
    fn test_append_time_rejects_shape_mismatch() {
        let first = sample(1, 0.0);
        let mut second = Dataset::new(vec![
            Dimension::new("time", 1),
            Dimension::new("y", 4),
            Dimension::new("x", 3),
        ]);
        second.set_coord("time", vec![1.0]).unwrap();
        second.add_variable("ndvi", vec![0.0; 12]).unwrap();
        second.add_variable("cloud_mask", vec![0.0; 12]).unwrap();
        assert!(append_time(&first, &second).is_err());
    }

    #[test]
    fn test_append_time_rejects_variable_mismatch() {
        let first = sample(1, 0.0);
        let mut second = sample(1, 1.0);
        second.add_variable("extra", vec![0.0; 6]).unwrap();
        assert!(append_time(&first, &second).is_err());
    }

    #[test]
    fn test_append_time_rejects_missing_time_dim() {
        let mut no_time = Dataset::new(vec![Dimension::new("y", 2), Dimension::new("x", 3)]);
        no_time.add_variable("ndvi", vec![0.0; 6]).unwrap();
        no_time.add_variable("cloud_mask", vec![0.0; 6]).unwrap();
        assert!(append_time(&sample(1, 0.0), &no_time).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_write_and_read_through_object_store() {
        let store = ProductStore::in_memory();
        let ds = sample(1, 1_600_000_000.0);

        let location = write_zarr(&store, &ds, "chains/demo.zarr", &ZarrOptions::default())
            .await
            .unwrap();
        assert_eq!(location.key, "chains/demo.zarr");
        assert!(store.exists_prefix("chains/demo.zarr").await.unwrap());

        let back = read_zarr(&store, "chains/demo.zarr")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(back.shape(), ds.shape());
        assert_eq!(back.variable("ndvi").unwrap(), ds.variable("ndvi").unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_write_appends_along_time() {
        let store = ProductStore::in_memory();
        let ds = sample(1, 1_600_000_000.0);

        write_zarr(&store, &ds, "demo.zarr", &ZarrOptions::default())
            .await
            .unwrap();
        write_zarr(&store, &ds, "demo.zarr", &ZarrOptions::default())
            .await
            .unwrap();

        let back = read_zarr(&store, "demo.zarr").await.unwrap().unwrap();
        assert_eq!(back.dim("time").unwrap().len, 2);
        assert_eq!(back.dim("y").unwrap().len, 2);
        assert_eq!(back.variable("ndvi").unwrap().values.len(), 12);
    }

    #[tokio::test]
    async fn test_read_missing_store_is_none() {
        let store = ProductStore::in_memory();
        assert!(read_zarr(&store, "absent.zarr").await.unwrap().is_none());
    }
}
