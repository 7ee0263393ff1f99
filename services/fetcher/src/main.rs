//! Sentinel-Hub imagery fetcher service.
//!
//! Loads the job list and storage settings, then runs every enabled
//! fetch job once or polls them forever on their frequency intervals.

mod config;
mod scheduler;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::FetcherConfig;
use eo_common::Settings;
use imagery::FetchPolicy;
use scheduler::FetchScheduler;

#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(about = "Scheduled Sentinel-Hub imagery fetch and store")]
struct Args {
    /// Fetch job configuration file
    #[arg(long, env = "FETCHER_CONFIG", default_value = "config/fetcher.yml")]
    config: PathBuf,

    /// Run one cycle and exit (vs continuous polling)
    #[arg(long)]
    once: bool,

    /// Specific module to run (default: all enabled)
    #[arg(short, long)]
    module: Option<String>,

    /// Upload under the test prefix instead of production keys
    #[arg(long)]
    testing: bool,

    /// Continue past fetch failures, giving up after this many in a row
    #[arg(long)]
    skip_failures: Option<u32>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting imagery fetcher");

    let settings = Settings::load()?;
    info!(platform = %settings.platform, bucket = %settings.storage.bucket, "Loaded settings");

    let config = FetcherConfig::load(&args.config)?;

    let policy = match args.skip_failures {
        Some(max_consecutive_failures) => FetchPolicy::Skip {
            max_consecutive_failures,
        },
        None => FetchPolicy::Abort,
    };
    let scheduler = FetchScheduler::new(&settings, config, args.testing)?.with_policy(policy);

    if args.once {
        info!("Running single fetch cycle");
        scheduler.run_once(args.module.as_deref()).await?;
    } else {
        info!("Starting continuous polling");
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown.send(()).ok();
        });

        scheduler.run_forever(&shutdown_tx).await?;
    }

    info!("Fetcher finished");
    Ok(())
}
