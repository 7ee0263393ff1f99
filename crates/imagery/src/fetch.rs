//! The fetch-and-store sequence.
//!
//! Each step invokes the request capability once, validates the
//! imagery, uploads it together with its request sidecar and yields
//! the imagery's stored location. Fetch failures follow the configured
//! policy; upload and encoding failures always end the run.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use eo_common::{EoError, EoResult};
use exporter::geotiff;
use storage::{ProductStore, StoredLocation};

use crate::naming::{self, Frequency};
use crate::request::{FetchedProduct, ImageryRequest};
use crate::validate;

/// Constant-band products are skipped silently; if the upstream keeps
/// returning them the run gives up rather than spinning on the API.
const MAX_CONSECUTIVE_SKIPS: u32 = 5;

/// What a run does when the request capability fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Yield the error once; the run is finished afterwards.
    #[default]
    Abort,
    /// Log and move on to the next fetch, giving up only after this
    /// many failures in a row.
    Skip { max_consecutive_failures: u32 },
}

/// Fetch-and-store component bound to one processing module.
pub struct FetchAndStore {
    store: ProductStore,
    module: String,
    frequency: Frequency,
    request: Arc<dyn ImageryRequest>,
    testing: bool,
    policy: FetchPolicy,
}

impl FetchAndStore {
    pub fn new(
        store: ProductStore,
        module: &str,
        frequency: Frequency,
        request: Arc<dyn ImageryRequest>,
        testing: bool,
    ) -> Self {
        Self {
            store,
            module: module.to_string(),
            frequency,
            request,
            testing,
            policy: FetchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Start a lazy sequence of fetch-and-upload steps. Each call
    /// returns a fresh run.
    pub fn to_storage(&self) -> StorageRun<'_> {
        StorageRun {
            inner: self,
            finished: false,
            consecutive_failures: 0,
        }
    }

    /// Fetch, validate and upload one product.
    ///
    /// `None` means the product was skipped as constant-band; under
    /// testing that is surfaced as a fetch error instead so test runs
    /// never pass vacuously.
    async fn store_product(&self, product: &FetchedProduct) -> EoResult<Option<StoredLocation>> {
        let decoded = geotiff::decode(&product.imagery)?;
        if validate::all_bands_constant(&decoded) {
            if self.testing {
                return Err(EoError::fetch("All the bands hold a single value"));
            }
            warn!(
                module = %self.module,
                "Skipping product, all the bands hold a single value"
            );
            return Ok(None);
        }

        let tiff_key = naming::object_name(
            &product.request,
            &self.module,
            self.frequency,
            "response.tiff",
            self.testing,
        )?;
        let json_key = naming::object_name(
            &product.request,
            &self.module,
            self.frequency,
            "request.json",
            self.testing,
        )?;

        let document = serde_json::to_vec_pretty(&product.request)?;
        self.store.put(&json_key, Bytes::from(document)).await?;
        let location = self.store.put(&tiff_key, product.imagery.clone()).await?;
        info!("s3-location: {}", location);
        Ok(Some(location))
    }
}

/// One lazy pass over the fetch-and-store sequence.
pub struct StorageRun<'a> {
    inner: &'a FetchAndStore,
    finished: bool,
    consecutive_failures: u32,
}

impl StorageRun<'_> {
    /// Advance the sequence by one stored product.
    ///
    /// `None` once the run is finished; a yielded error finishes the
    /// run except for fetch failures under the skip policy.
    pub async fn next(&mut self) -> Option<EoResult<StoredLocation>> {
        if self.finished {
            return None;
        }
        let mut skips = 0u32;
        loop {
            let product = match self.inner.request.execute().await {
                Ok(product) => product,
                Err(err) => match self.inner.policy {
                    FetchPolicy::Abort => {
                        self.finished = true;
                        return Some(Err(err));
                    }
                    FetchPolicy::Skip {
                        max_consecutive_failures,
                    } => {
                        self.consecutive_failures += 1;
                        if self.consecutive_failures >= max_consecutive_failures {
                            self.finished = true;
                            return Some(Err(err));
                        }
                        warn!(
                            module = %self.inner.module,
                            failures = self.consecutive_failures,
                            error = %err,
                            "Fetch failed, continuing"
                        );
                        continue;
                    }
                },
            };
            self.consecutive_failures = 0;

            match self.inner.store_product(&product).await {
                Ok(Some(location)) => return Some(Ok(location)),
                Ok(None) => {
                    skips += 1;
                    if skips >= MAX_CONSECUTIVE_SKIPS {
                        self.finished = true;
                        return Some(Err(EoError::fetch(
                            "Upstream keeps returning constant imagery",
                        )));
                    }
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
