//! Scheduled fetch runs.
//!
//! Maps each job's output frequency to a poll interval and drives a
//! fetch-and-store run per cycle, once or forever.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use eo_common::Settings;
use imagery::sentinel_hub::{SentinelHubClient, SentinelHubRequest};
use imagery::{FetchAndStore, FetchPolicy};
use storage::{ProductStore, StorageConfig};

use crate::config::{FetchJob, FetcherConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct FetchScheduler {
    config: FetcherConfig,
    store: ProductStore,
    client: SentinelHubClient,
    testing: bool,
    policy: FetchPolicy,
}

impl FetchScheduler {
    pub fn new(settings: &Settings, config: FetcherConfig, testing: bool) -> Result<Self> {
        let storage_config = StorageConfig::from_settings(&settings.storage);
        let store = ProductStore::new(&storage_config).context("Failed to open product store")?;
        let sentinel_hub = settings
            .sentinel_hub
            .as_ref()
            .context("Configuration has no sentinel-hub section")?;
        let client = SentinelHubClient::new(sentinel_hub, REQUEST_TIMEOUT)
            .context("Failed to create Sentinel Hub client")?;
        Ok(Self {
            config,
            store,
            client,
            testing,
            policy: FetchPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one cycle for every enabled job, optionally narrowed to one
    /// module. A failing job does not stop the others.
    pub async fn run_once(&self, module: Option<&str>) -> Result<()> {
        let jobs = self.config.enabled_jobs(module);
        if jobs.is_empty() {
            warn!(module = ?module, "No enabled fetch jobs matched");
            return Ok(());
        }
        for job in jobs {
            if let Err(e) = self.run_job(job).await {
                error!(module = %job.module, error = %e, "Fetch job failed");
            }
        }
        Ok(())
    }

    /// Poll each job on its frequency interval until shutdown.
    pub async fn run_forever(&self, shutdown: &broadcast::Sender<()>) -> Result<()> {
        let jobs = self.config.enabled_jobs(None);
        if jobs.is_empty() {
            warn!("No enabled fetch jobs configured");
            return Ok(());
        }

        let loops = jobs.into_iter().map(|job| {
            let mut shutdown = shutdown.subscribe();
            async move {
                let mut interval = tokio::time::interval(job.frequency.poll_interval());
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = self.run_job(job).await {
                                error!(module = %job.module, error = %e, "Fetch job failed");
                            }
                        }
                        _ = shutdown.recv() => {
                            info!(module = %job.module, "Stopping fetch loop");
                            break;
                        }
                    }
                }
            }
        });
        futures::future::join_all(loops).await;
        Ok(())
    }

    #[instrument(skip(self, job), fields(module = %job.module, frequency = %job.frequency))]
    async fn run_job(&self, job: &FetchJob) -> Result<()> {
        info!("Starting fetch cycle");
        let request = job.process_request(Utc::now())?;
        let capability = Arc::new(SentinelHubRequest::new(self.client.clone(), request));
        let fetch = FetchAndStore::new(
            self.store.clone(),
            &job.module,
            job.frequency,
            capability,
            self.testing,
        )
        .with_policy(self.policy);

        let mut run = fetch.to_storage();
        match run.next().await {
            Some(Ok(location)) => {
                info!(location = %location, "Fetch cycle stored a product");
                Ok(())
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(()),
        }
    }
}
