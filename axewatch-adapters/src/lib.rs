//! # axewatch-adapters
//!
//! Fetchers that poll a device's status endpoint and decode the response
//! into an axewatch [`Snapshot`].
//!
//! A fetcher performs exactly one network round-trip per call. It does not
//! retry and does not cache; scheduling and failure tracking belong to the
//! coordinator in `axewatch-sdk`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axewatch_adapters::{BitaxeAdapter, Fetcher};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = BitaxeAdapter::builder()
//!         .endpoint("192.168.1.42")
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     let snapshot = adapter.fetch().await?;
//!     println!("Fetched {} metrics", snapshot.len());
//!     Ok(())
//! }
//! ```

use std::fmt::Debug;

use async_trait::async_trait;

pub mod bitaxe;
pub mod error;

pub use bitaxe::{decode_snapshot, BitaxeAdapter, BitaxeAdapterBuilder};
pub use error::FetchError;

// Re-export types for convenience
pub use axewatch_types::{MetricValue, Snapshot};

/// Performs one fetch of a device's telemetry.
///
/// Implementations must be cheap to call repeatedly and must never panic on
/// network or decode failures; every failure is reported as a
/// [`FetchError`].
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    /// Fetch and decode the device's current telemetry.
    async fn fetch(&self) -> Result<Snapshot, FetchError>;

    /// The device endpoint this fetcher polls.
    fn endpoint(&self) -> &str;
}
