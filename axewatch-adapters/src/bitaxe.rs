//! BitAxe adapter using the device's HTTP system info API.
//!
//! Every BitAxe (AxeOS firmware) serves its live telemetry as a flat JSON
//! object on `GET /api/system/info`, without authentication.
//!
//! ## Metrics Collected
//!
//! Every scalar key in the response is kept. The ones with display names
//! are `power`, `temp`, `hashRate`, `bestDiff`, `bestSessionDiff`,
//! `sharesAccepted`, `sharesRejected`, `fanspeed`, `fanrpm` and
//! `uptimeSeconds`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use axewatch_adapters::{BitaxeAdapter, Fetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = BitaxeAdapter::new("192.168.1.42")?;
//!
//!     let snapshot = adapter.fetch().await?;
//!     if let Some(power) = snapshot.get("power") {
//!         println!("Power: {} W", power);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use axewatch_types::{MetricValue, Snapshot};

use crate::{FetchError, Fetcher};

/// Path of the telemetry endpoint on the device.
pub const SYSTEM_INFO_PATH: &str = "/api/system/info";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// BitAxe adapter for fetching device telemetry.
#[derive(Debug, Clone)]
pub struct BitaxeAdapter {
    client: Client,
    endpoint: String,
    url: String,
}

impl BitaxeAdapter {
    /// Create an adapter for `endpoint` with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FetchError> {
        Self::builder().endpoint(endpoint).build()
    }

    /// Create a new builder for configuring the adapter.
    pub fn builder() -> BitaxeAdapterBuilder {
        BitaxeAdapterBuilder::default()
    }

    /// The full URL this adapter requests.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Fetcher for BitaxeAdapter {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        let snapshot = snapshot_from_value(body)?;

        debug!(
            endpoint = %self.endpoint,
            metrics = snapshot.len(),
            "Fetched data"
        );

        Ok(snapshot)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Builder for BitaxeAdapter.
#[derive(Debug, Default)]
pub struct BitaxeAdapterBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl BitaxeAdapterBuilder {
    /// Set the device address (e.g., "192.168.1.42" or "bitaxe.local:8080").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<BitaxeAdapter, FetchError> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| FetchError::Client("endpoint is required".to_string()))?;
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let url = format!("http://{}{}", endpoint, SYSTEM_INFO_PATH);

        Ok(BitaxeAdapter {
            client,
            endpoint,
            url,
        })
    }
}

/// Decode a response body into a snapshot.
///
/// The body must be a JSON object. Scalar values become metrics with their
/// JSON type preserved; `null`, arrays and nested objects are skipped.
pub fn decode_snapshot(body: &[u8]) -> Result<Snapshot, FetchError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    snapshot_from_value(value)
}

fn snapshot_from_value(value: Value) -> Result<Snapshot, FetchError> {
    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(FetchError::Decode(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            )))
        }
    };

    let mut metrics = BTreeMap::new();
    for (key, value) in object {
        match to_metric(&value) {
            Some(metric) => {
                metrics.insert(key, metric);
            }
            None => debug!(key = %key, kind = json_type(&value), "Skipping non-scalar value"),
        }
    }

    Ok(Snapshot::from_metrics(metrics))
}

fn to_metric(value: &Value) -> Option<MetricValue> {
    match value {
        Value::Bool(b) => Some(MetricValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Some(MetricValue::UInt(v))
            } else if let Some(v) = n.as_i64() {
                Some(MetricValue::Int(v))
            } else {
                n.as_f64().map(MetricValue::Float)
            }
        }
        Value::String(s) => Some(MetricValue::Text(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
