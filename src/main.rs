use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axewatch::report;
use axewatch::settings::{DeviceConfig, Settings};
use axewatch_sdk::{Coordinator, Registry};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "axewatch")]
#[command(about = "Poll BitAxe miners and report their telemetry")]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device to poll, as IP or ID=IP (repeatable; adds to the config file)
    #[arg(short, long = "device", value_name = "[ID=]IP")]
    devices: Vec<DeviceConfig>,

    /// Refresh interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Per-fetch timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// What to show after a failed fetch: retain the last values or clear them
    #[arg(long, value_parser = ["retain", "clear"], ignore_case = true)]
    stale_policy: Option<String>,

    /// Also print metrics without a display name
    #[arg(short, long)]
    all: bool,

    /// Print JSON lines instead of text
    #[arg(long)]
    json: bool,

    /// Fetch once, print, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.devices.extend(args.devices.iter().cloned());
    if let Some(interval) = args.interval {
        settings.interval_secs = interval;
    }
    if let Some(timeout) = args.timeout {
        settings.timeout_secs = timeout;
    }
    if let Some(ref policy) = args.stale_policy {
        settings.stale_policy = policy.clone();
    }

    let registry = Registry::new(settings.coordinator_config()?);
    for device in settings.validated_devices()? {
        registry
            .register(device.device_id(), &device.ip_address)
            .await
            .with_context(|| format!("failed to set up device '{}'", device.device_id()))?;
    }

    for (device_id, coordinator) in registry.entries() {
        print_device(&device_id, &coordinator, &args)?;
    }

    if args.once {
        registry.stop_all();
        return Ok(());
    }

    // Print each device again whenever its coordinator commits a fetch
    let args = Arc::new(args);
    let mut watchers = Vec::new();
    for (device_id, coordinator) in registry.entries() {
        let args = args.clone();
        watchers.push(tokio::spawn(async move {
            let mut updates = coordinator.subscribe();
            while updates.changed().await.is_ok() {
                if let Err(e) = print_device(&device_id, &coordinator, &args) {
                    tracing::warn!(device = %device_id, error = %e, "Failed to print device state");
                }
            }
        }));
    }

    info!(devices = registry.len(), "Watching devices, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    registry.stop_all();
    for watcher in watchers {
        watcher.abort();
    }

    Ok(())
}

fn print_device(device_id: &str, coordinator: &Coordinator, args: &Args) -> Result<()> {
    if args.json {
        let value = report::render_json(device_id, coordinator);
        println!("{}", serde_json::to_string(&value)?);
    } else {
        for line in report::render_lines(device_id, coordinator, args.all) {
            println!("{}", line);
        }
    }
    Ok(())
}
