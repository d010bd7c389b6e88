//! # axewatch-sdk
//!
//! Polling coordinator for BitAxe telemetry.
//!
//! A [`Coordinator`] owns the refresh schedule for one device. It wraps a
//! [`Fetcher`] with in-flight deduplication and failure tracking, caches the
//! last good [`Snapshot`], and serves named metrics to any number of
//! readers without ever making them wait on the network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axewatch_sdk::{CoordinatorConfig, Registry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One coordinator per device, polled every 30 seconds
//!     let registry = Registry::new(CoordinatorConfig::default());
//!     let coordinator = registry.register("miner-1", "192.168.1.42").await?;
//!
//!     // Hand readers to whatever displays the values
//!     for metric in coordinator.known_metrics("miner-1") {
//!         println!("{} = {:?}", metric.name(), metric.value());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Bounded rate**: one fetch per interval, at most one in flight
//! - **Coalescing**: manual refreshes fold into a running fetch
//! - **Graceful staleness**: failed fetches keep the last snapshot by default
//! - **Notifications**: subscribe to a counter bumped on every commit
//! - **Thread-safe**: read from any thread or async task

mod coordinator;
mod handle;
mod registry;
mod state;

#[cfg(test)]
mod testing;

pub use coordinator::{
    Coordinator, CoordinatorBuilder, CoordinatorConfig, DEFAULT_FETCH_TIMEOUT, DEFAULT_INTERVAL,
};
pub use handle::MetricHandle;
pub use registry::Registry;
pub use state::{RefreshOutcome, RefreshState, StalePolicy};

// Re-export types for convenience
pub use axewatch_adapters::{BitaxeAdapter, FetchError, Fetcher};
pub use axewatch_types::{display_name, label, MetricValue, Snapshot, KNOWN_METRICS};
