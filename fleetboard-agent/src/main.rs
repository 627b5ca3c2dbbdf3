//! Fleetboard Agent - device-side telemetry reporter
//!
//! This agent feeds the Fleetboard kernel:
//! - Samples system metrics and derives the rolling-window features
//! - POSTs a report every interval to /send_metrics
//! - Polls /files/check and downloads every pending file
//! - Keeps running through transient kernel/network failures

mod metrics;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// Agent configuration, environment-driven.
#[derive(Debug, Clone)]
struct AgentConfig {
    kernel_url: String,
    device_id: String,
    report_interval_secs: u64,
    download_dir: PathBuf,
    simulate: bool,
}

impl AgentConfig {
    fn from_env() -> Self {
        let kernel_url = std::env::var("FLEETBOARD_KERNEL_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let device_id =
            std::env::var("FLEETBOARD_DEVICE_ID").unwrap_or_else(|_| default_device_id());
        let report_interval_secs = std::env::var("FLEETBOARD_REPORT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let download_dir = std::env::var("FLEETBOARD_DOWNLOAD_DIR")
            .unwrap_or_else(|_| "downloads".to_string())
            .into();
        let simulate = std::env::var("FLEETBOARD_SIMULATE").is_ok();

        Self {
            kernel_url,
            device_id,
            report_interval_secs,
            download_dir,
            simulate,
        }
    }
}

fn default_device_id() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| format!("device-{}", uuid::Uuid::new_v4()))
}

/// Metrics report (matches the kernel's /send_metrics contract).
#[derive(Debug, Serialize)]
struct MetricsReport<'a> {
    device_id: &'a str,
    cpu_usage: f64,
    memory_usage: f64,
    disk_usage: f64,
    net_io: f64,
    cpu_mean_5: f64,
    cpu_std_5: f64,
    mem_mean_5: f64,
    net_rate: f64,
}

#[derive(Debug, Deserialize)]
struct ReportAck {
    status: String,
    failure_risk: f64,
}

#[derive(Debug, Deserialize)]
struct PendingFiles {
    files_to_download: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = AgentConfig::from_env();
    info!(
        device_id = %config.device_id,
        kernel = %config.kernel_url,
        interval_secs = config.report_interval_secs,
        simulate = config.simulate,
        "starting fleetboard agent"
    );

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .context("create download dir")?;

    let client = Client::new();
    let mut collector = metrics::MetricsCollector::new(config.simulate);
    let mut ticker = interval(Duration::from_secs(config.report_interval_secs));

    loop {
        ticker.tick().await;

        let sample = collector.sample();
        if let Err(e) = send_report(&client, &config, &sample).await {
            warn!("failed to send metrics report: {e:#}");
        }

        if let Err(e) = sync_files(&client, &config).await {
            warn!("file sync failed: {e:#}");
        }
    }
}

async fn send_report(
    client: &Client,
    config: &AgentConfig,
    sample: &metrics::Sample,
) -> Result<()> {
    let report = MetricsReport {
        device_id: &config.device_id,
        cpu_usage: sample.cpu_usage,
        memory_usage: sample.memory_usage,
        disk_usage: sample.disk_usage,
        net_io: sample.net_io,
        cpu_mean_5: sample.cpu_mean_5,
        cpu_std_5: sample.cpu_std_5,
        mem_mean_5: sample.mem_mean_5,
        net_rate: sample.net_rate,
    };

    let ack: ReportAck = client
        .post(format!("{}/send_metrics", config.kernel_url))
        .json(&report)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    debug!(status = %ack.status, failure_risk = ack.failure_risk, "report acknowledged");
    Ok(())
}

/// Poll the pending-file hint list and download each entry. A downloaded
/// filename drops out of the list on the kernel side (first-download dequeue).
async fn sync_files(client: &Client, config: &AgentConfig) -> Result<()> {
    let pending: PendingFiles = client
        .get(format!(
            "{}/files/check/{}",
            config.kernel_url, config.device_id
        ))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    for filename in pending.files_to_download {
        match download_file(client, config, &filename).await {
            Ok(size) => info!(filename = %filename, size, "downloaded file from kernel"),
            Err(e) => error!(filename = %filename, "download failed: {e:#}"),
        }
    }
    Ok(())
}

async fn download_file(client: &Client, config: &AgentConfig, filename: &str) -> Result<usize> {
    let url = format!(
        "{}/files/download/{}/{}",
        config.kernel_url, config.device_id, filename
    );
    let bytes = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let target = config.download_dir.join(filename);
    tokio::fs::write(&target, &bytes)
        .await
        .with_context(|| format!("write {}", target.display()))?;
    Ok(bytes.len())
}
