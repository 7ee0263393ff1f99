//! The request capability interface.

use async_trait::async_trait;
use bytes::Bytes;

use eo_common::EoResult;

use crate::sentinel_hub::ProcessRequest;

/// One product returned by a request capability: the imagery bytes and
/// the request document that produced them. The document is uploaded
/// next to the imagery and drives object naming.
#[derive(Debug, Clone)]
pub struct FetchedProduct {
    /// GeoTIFF imagery bytes
    pub imagery: Bytes,
    /// The process request that produced the imagery
    pub request: ProcessRequest,
}

/// A capability that fetches one imagery product per call.
///
/// The fetch-and-store sequence invokes it and reads its output,
/// nothing more; failures surface as `EoError::Fetch`.
#[async_trait]
pub trait ImageryRequest: Send + Sync {
    async fn execute(&self) -> EoResult<FetchedProduct>;
}
