//! Object storage client for product artifacts (MinIO/S3 compatible).

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{aws::AmazonS3Builder, memory::InMemory, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use eo_common::{EoError, EoResult, StorageSection};

/// Configuration for object storage connection.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            bucket: "eo-products".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

impl StorageConfig {
    /// Build from the YAML storage section, then apply `EO_STORE_*`
    /// environment overrides. Overrides win over file values.
    pub fn from_settings(section: &StorageSection) -> Self {
        let mut config = Self {
            endpoint: section.endpoint_url_local.clone(),
            bucket: section.bucket.clone(),
            access_key_id: section.aws_access_key_id.clone(),
            secret_access_key: section.aws_secret_access_key.clone(),
            region: section.region_name.clone(),
            allow_http: section.endpoint_url_local.starts_with("http://"),
        };
        config.apply_env_overrides();
        config
    }

    /// Environment-only configuration with local MinIO defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("EO_STORE_ENDPOINT") {
            self.allow_http = v.starts_with("http://");
            self.endpoint = v;
        }
        if let Ok(v) = std::env::var("EO_STORE_BUCKET") {
            self.bucket = v;
        }
        if let Ok(v) = std::env::var("EO_STORE_ACCESS_KEY") {
            self.access_key_id = v;
        }
        if let Ok(v) = std::env::var("EO_STORE_SECRET_KEY") {
            self.secret_access_key = v;
        }
        if let Ok(v) = std::env::var("EO_STORE_REGION") {
            self.region = v;
        }
        if let Ok(v) = std::env::var("EO_STORE_ALLOW_HTTP") {
            self.allow_http = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }
}

/// Bucket and key of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLocation {
    /// Bucket name
    pub bucket: String,
    /// Object key within the bucket
    pub key: String,
}

impl StoredLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for StoredLocation {
    /// `<bucket> <key>`, the form reported in `s3-location` log lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.bucket, self.key)
    }
}

/// Async client for the product bucket.
#[derive(Clone)]
pub struct ProductStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    config: Option<StorageConfig>,
}

impl ProductStore {
    /// Create a new client from config.
    pub fn new(config: &StorageConfig) -> EoResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| EoError::storage(format!("Failed to create S3 client: {}", e)))?;

        info!(
            endpoint = %config.endpoint,
            bucket = %config.bucket,
            "Connected to object storage"
        );

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
            config: Some(config.clone()),
        })
    }

    /// In-memory store for tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            bucket: "eo-test".to_string(),
            config: None,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// S3 connection settings, absent for the in-memory store.
    pub fn config(&self) -> Option<&StorageConfig> {
        self.config.as_ref()
    }

    /// Location of `key` in this bucket.
    pub fn location(&self, key: &str) -> StoredLocation {
        StoredLocation::new(self.bucket.clone(), key)
    }

    /// Write bytes under a key in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %key))]
    pub async fn put(&self, key: &str, data: Bytes) -> EoResult<StoredLocation> {
        let location = Path::from(key);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| classify_error(key, e))?;

        Ok(self.location(key))
    }

    /// Read bytes from a key.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %key))]
    pub async fn get(&self, key: &str) -> EoResult<Bytes> {
        let location = Path::from(key);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| classify_error(key, e))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| classify_error(key, e))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> EoResult<bool> {
        let location = Path::from(key);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(classify_error(key, e)),
        }
    }

    /// Check whether any object sits under `prefix`. Directory-like
    /// artifacts such as Zarr stores are detected this way.
    pub async fn exists_prefix(&self, prefix: &str) -> EoResult<bool> {
        let prefix_path = Path::from(prefix);
        let mut stream = self.store.list(Some(&prefix_path));

        match stream.try_next().await {
            Ok(entry) => Ok(entry.is_some()),
            Err(e) => Err(classify_error(prefix, e)),
        }
    }

    /// List objects with a given prefix.
    pub async fn list(&self, prefix: &str) -> EoResult<Vec<String>> {
        let prefix_path = Path::from(prefix);
        let mut keys = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| classify_error(prefix, e))?
        {
            keys.push(meta.location.to_string());
        }

        Ok(keys)
    }

    /// Delete an object.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %key))]
    pub async fn delete(&self, key: &str) -> EoResult<()> {
        let location = Path::from(key);

        self.store
            .delete(&location)
            .await
            .map_err(|e| classify_error(key, e))?;

        Ok(())
    }

    /// Delete every object under `prefix`, returning the count.
    #[instrument(skip(self), fields(bucket = %self.bucket, prefix = %prefix))]
    pub async fn delete_prefix(&self, prefix: &str) -> EoResult<usize> {
        let keys = self.list(prefix).await?;
        for key in &keys {
            self.delete(key).await?;
        }
        if !keys.is_empty() {
            info!(count = keys.len(), "Deleted objects under prefix");
        }
        Ok(keys.len())
    }

    /// Upload a local file under `key`.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %key))]
    pub async fn upload_file(&self, local: &std::path::Path, key: &str) -> EoResult<StoredLocation> {
        let data = tokio::fs::read(local).await?;
        self.put(key, Bytes::from(data)).await
    }
}

/// Map backend failures onto the shared error taxonomy.
///
/// The AWS client folds HTTP status into opaque error strings, so
/// authentication and transient cases are recognised from the message.
fn classify_error(key: &str, err: object_store::Error) -> EoError {
    match err {
        object_store::Error::NotFound { .. } => EoError::not_found(key),
        other => {
            let message = other.to_string();
            let lower = message.to_lowercase();
            if lower.contains("401")
                || lower.contains("403")
                || lower.contains("forbidden")
                || lower.contains("access denied")
                || lower.contains("credential")
                || lower.contains("signature")
            {
                EoError::authentication(format!("{}: {}", key, message))
            } else if lower.contains("timed out")
                || lower.contains("timeout")
                || lower.contains("connect")
                || lower.contains("reset")
                || lower.contains("503")
                || lower.contains("too many requests")
            {
                EoError::transient(format!("{}: {}", key, message))
            } else {
                EoError::storage(format!("{}: {}", key, message))
            }
        }
    }
}
