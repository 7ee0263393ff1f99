//! Sentinel-Hub Process API client.
//!
//! Authenticates via OAuth2 client credentials and POSTs a typed
//! process request, returning GeoTIFF imagery bytes. The payload
//! structs mirror the Process API JSON shape and double as the request
//! document stored next to each product.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use eo_common::{EoError, EoResult, SentinelHubSettings};

use crate::request::{FetchedProduct, ImageryRequest};

const TOKEN_URL: &str = "https://services.sentinel-hub.com/oauth/token";
const PROCESS_URL: &str = "https://services.sentinel-hub.com/api/v1/process";

/// Process API request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub input: ProcessInput,
    pub output: ProcessOutput,
    pub evalscript: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInput {
    pub bounds: Bounds,
    pub data: Vec<InputData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub bbox: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BoundsProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsProperties {
    pub crs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(rename = "dataFilter")]
    pub data_filter: DataFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFilter {
    #[serde(rename = "timeRange")]
    pub time_range: TimeRange,
    #[serde(
        default,
        rename = "mosaickingOrder",
        skip_serializing_if = "Option::is_none"
    )]
    pub mosaicking_order: Option<String>,
}

/// `from`/`to` timestamps formatted `%Y-%m-%dT%H:%M:%SZ`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub width: u32,
    pub height: u32,
    pub responses: Vec<ResponseSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub identifier: String,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub mime: String,
}

impl ProcessRequest {
    /// The first input data block, which names the instrument and time
    /// range that object naming is derived from.
    pub fn primary_input(&self) -> EoResult<&InputData> {
        self.input
            .data
            .first()
            .ok_or_else(|| EoError::encoding("Process request has no input data"))
    }
}

impl ResponseSpec {
    pub fn tiff(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            format: ResponseFormat {
                mime: "image/tiff".to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// HTTP client for the Process API.
#[derive(Clone)]
pub struct SentinelHubClient {
    http: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    process_url: String,
}

impl SentinelHubClient {
    pub fn new(settings: &SentinelHubSettings, timeout: Duration) -> EoResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EoError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            client_id: settings.sh_client_id.clone(),
            client_secret: settings.sh_client_secret.clone(),
            token_url: TOKEN_URL.to_string(),
            process_url: PROCESS_URL.to_string(),
        })
    }

    /// Point the client at a different deployment or a test server.
    pub fn with_endpoints(mut self, token_url: &str, process_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.process_url = process_url.to_string();
        self
    }

    async fn access_token(&self) -> EoResult<String> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(classify_transport)?;

        match response.status() {
            StatusCode::OK => {
                let token: TokenResponse = response.json().await.map_err(classify_transport)?;
                Ok(token.access_token)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EoError::authentication(
                format!("Token request rejected: {}", response.status()),
            )),
            status => Err(EoError::fetch(format!(
                "Token request failed: {}",
                status
            ))),
        }
    }

    /// Execute a process request, returning the imagery bytes.
    #[instrument(skip(self, request))]
    pub async fn process(&self, request: &ProcessRequest) -> EoResult<Bytes> {
        let token = self.access_token().await?;
        debug!(url = %self.process_url, "Sending process request");

        let response = self
            .http
            .post(&self.process_url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "image/tiff")
            .json(request)
            .send()
            .await
            .map_err(classify_transport)?;

        match response.status() {
            StatusCode::OK => response.bytes().await.map_err(classify_transport),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EoError::authentication(
                format!("Process request rejected: {}", response.status()),
            )),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(EoError::fetch(format!(
                    "Process request failed: {} {}",
                    status, body
                )))
            }
        }
    }
}

fn classify_transport(err: reqwest::Error) -> EoError {
    if err.is_timeout() || err.is_connect() {
        EoError::transient(err.to_string())
    } else {
        EoError::fetch(err.to_string())
    }
}

/// Request capability backed by one fixed process request.
pub struct SentinelHubRequest {
    client: SentinelHubClient,
    request: ProcessRequest,
}

impl SentinelHubRequest {
    pub fn new(client: SentinelHubClient, request: ProcessRequest) -> Self {
        Self { client, request }
    }
}

#[async_trait]
impl ImageryRequest for SentinelHubRequest {
    async fn execute(&self) -> EoResult<FetchedProduct> {
        let imagery = self.client.process(&self.request).await?;
        Ok(FetchedProduct {
            imagery,
            request: self.request.clone(),
        })
    }
}
