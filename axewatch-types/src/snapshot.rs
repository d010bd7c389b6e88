//! Snapshot - the decoded payload of one successful device poll.

use std::collections::BTreeMap;

use crate::MetricValue;

/// A point-in-time view of a device's telemetry.
///
/// A snapshot is produced whole by a single successful fetch and is never
/// partially updated afterwards. Keys are the device's own JSON keys
/// (`power`, `temp`, `hashRate`, ...), including ones this crate has no
/// display name for.
///
/// # Example
///
/// ```rust
/// use axewatch_types::{MetricValue, Snapshot};
///
/// let snapshot = Snapshot::builder()
///     .timestamp_ms(1703160000000)
///     .metric("temp", 55u64)
///     .metric("bestDiff", "4.29G")
///     .build();
///
/// assert_eq!(snapshot.get("temp"), Some(&MetricValue::UInt(55)));
/// assert!(snapshot.get("voltage").is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    /// Metric values keyed by the device's JSON key.
    pub metrics: BTreeMap<String, MetricValue>,
}

impl Snapshot {
    /// Create an empty snapshot with the current timestamp.
    pub fn new() -> Self {
        Self::with_timestamp(current_timestamp_ms())
    }

    /// Create an empty snapshot with a specific timestamp.
    pub fn with_timestamp(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            metrics: BTreeMap::new(),
        }
    }

    /// Create a snapshot from already decoded metrics, stamped now.
    pub fn from_metrics(metrics: BTreeMap<String, MetricValue>) -> Self {
        Self {
            timestamp_ms: current_timestamp_ms(),
            metrics,
        }
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Get the value for a metric key.
    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.get(key)
    }

    /// Check whether a metric key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.metrics.contains_key(key)
    }

    /// Check if the snapshot holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Number of metrics in the snapshot.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Iterate over all metrics in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetricValue)> {
        self.metrics.iter()
    }

    /// Iterate over metric keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    timestamp_ms: Option<u64>,
    metrics: BTreeMap<String, MetricValue>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Add a metric value.
    pub fn metric(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            metrics: self.metrics,
        }
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(1703160000000)
            .metric("power", 12.3)
            .metric("temp", 55u64)
            .metric("bestDiff", "4.29G")
            .build();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.timestamp_ms, 1703160000000);
        assert_eq!(snapshot.get("power"), Some(&MetricValue::Float(12.3)));
        assert_eq!(snapshot.get("temp"), Some(&MetricValue::UInt(55)));
        assert_eq!(snapshot.get("bestDiff").and_then(|v| v.as_str()), Some("4.29G"));
    }

    #[test]
    fn missing_key_is_none() {
        let snapshot = Snapshot::builder().metric("power", 12.3).build();
        assert!(snapshot.get("nonexistent_key").is_none());
        assert!(!snapshot.contains("nonexistent_key"));
    }

    #[test]
    fn keys_are_ordered() {
        let snapshot = Snapshot::builder()
            .metric("temp", 55u64)
            .metric("fanrpm", 4100u64)
            .metric("power", 12.3)
            .build();

        let keys: Vec<&str> = snapshot.keys().collect();
        assert_eq!(keys, vec!["fanrpm", "power", "temp"]);
    }

    #[test]
    fn empty_snapshot_is_stamped() {
        let before = current_timestamp_ms();
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.timestamp_ms >= before);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(1703160000000)
            .metric("power", 12.3)
            .metric("sharesRejected", 3u64)
            .build();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, parsed);
    }
}
