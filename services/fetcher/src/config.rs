//! Fetch job configuration.
//!
//! A YAML file lists the processing modules to run: their output
//! frequency, bounding box, input data type, evalscript and optional
//! mosaicking order. Each job turns into one process request per cycle,
//! with the time range reaching back over the frequency's window.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use eo_common::{time, BoundingBox, EoResult};
use imagery::sentinel_hub::{
    Bounds, DataFilter, InputData, ProcessInput, ProcessOutput, ProcessRequest, ResponseSpec,
    TimeRange,
};
use imagery::Frequency;

fn default_data_type() -> String {
    "sentinel-2-l2a".to_string()
}

fn default_size() -> u32 {
    512
}

fn default_enabled() -> bool {
    true
}

/// One scheduled fetch job.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchJob {
    /// Processing module name, part of every derived object key
    pub module: String,
    pub frequency: Frequency,
    /// `[min_x, min_y, max_x, max_y]`
    pub bbox: [f64; 4],
    #[serde(default = "default_data_type")]
    pub data_type: String,
    pub evalscript: String,
    #[serde(default)]
    pub mosaicking_order: Option<String>,
    #[serde(default = "default_size")]
    pub width: u32,
    #[serde(default = "default_size")]
    pub height: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl FetchJob {
    /// Build the process request for a cycle ending at `now`.
    pub fn process_request(&self, now: DateTime<Utc>) -> EoResult<ProcessRequest> {
        let bbox = BoundingBox::from_slice(&self.bbox)?;
        let start = now - self.frequency.lookback();
        Ok(ProcessRequest {
            input: ProcessInput {
                bounds: Bounds {
                    bbox: bbox.to_array(),
                    properties: None,
                },
                data: vec![InputData {
                    data_type: self.data_type.clone(),
                    data_filter: DataFilter {
                        time_range: TimeRange {
                            from: time::format_request(&start),
                            to: time::format_request(&now),
                        },
                        mosaicking_order: self.mosaicking_order.clone(),
                    },
                }],
            },
            output: ProcessOutput {
                width: self.width,
                height: self.height,
                responses: vec![ResponseSpec::tiff("default")],
            },
            evalscript: self.evalscript.clone(),
        })
    }
}

/// Root of the fetcher configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    pub jobs: Vec<FetchJob>,
}

impl FetcherConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: FetcherConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        for job in &config.jobs {
            debug!(module = %job.module, frequency = %job.frequency, "Loaded fetch job");
        }
        info!(count = config.jobs.len(), "Loaded fetch jobs");
        Ok(config)
    }

    /// Enabled jobs, optionally narrowed to one module.
    pub fn enabled_jobs(&self, module: Option<&str>) -> Vec<&FetchJob> {
        self.jobs
            .iter()
            .filter(|j| j.enabled)
            .filter(|j| module.map_or(true, |m| j.module == m))
            .collect()
    }
}
