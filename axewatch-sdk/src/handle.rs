//! Metric handle for reading one named value of a device.

use std::sync::Arc;

use axewatch_types::{label, MetricValue};
use tokio::sync::watch;

use crate::state::Shared;

/// A reader bound to a single metric of a single device.
///
/// This is what a hosting layer hands to each of its sensor entities.
/// Obtain one with [`Coordinator::metric`](crate::Coordinator::metric).
/// Reads never touch the network; they see whatever the coordinator last
/// committed.
///
/// # Example
///
/// ```rust,no_run
/// # use axewatch_adapters::BitaxeAdapter;
/// # use axewatch_sdk::Coordinator;
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # let adapter = Arc::new(BitaxeAdapter::new("192.168.1.42").unwrap());
/// let coordinator = Coordinator::new(adapter, Duration::from_secs(30));
/// let power = coordinator.metric("miner-1", "power");
///
/// assert_eq!(power.unique_id(), "miner-1_power");
/// assert_eq!(power.name(), "Power Consumption (miner-1)");
/// if power.is_available() {
///     println!("{:?}", power.value());
/// }
/// ```
#[derive(Clone)]
pub struct MetricHandle {
    shared: Arc<Shared>,
    key: String,
    unique_id: String,
    name: String,
}

impl MetricHandle {
    pub(crate) fn new(shared: Arc<Shared>, device_id: &str, key: &str) -> Self {
        Self {
            shared,
            key: key.to_string(),
            unique_id: format!("{}_{}", device_id, key),
            name: format!("{} ({})", label(key), device_id),
        }
    }

    /// The metric key in the device's payload.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stable identifier: `{device_id}_{key}`.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Display name: `{label} ({device_id})`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value, or `None` if there is no snapshot or no such key.
    pub fn value(&self) -> Option<MetricValue> {
        self.shared.get_metric(&self.key)
    }

    /// Whether the device's last fetch succeeded.
    pub fn is_available(&self) -> bool {
        self.shared.is_available()
    }

    /// Ask the coordinator for a refresh without waiting for it.
    ///
    /// Coalesced into any fetch already in flight. Must be called from
    /// within a Tokio runtime.
    pub fn request_update(&self) -> bool {
        self.shared.trigger()
    }

    /// Subscribe to the coordinator's state changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.subscribe()
    }
}

impl std::fmt::Debug for MetricHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricHandle")
            .field("unique_id", &self.unique_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFetcher;
    use crate::{Coordinator, RefreshOutcome};
    use axewatch_adapters::FetchError;
    use std::time::Duration;

    #[test]
    fn test_names() {
        let coordinator = Coordinator::new(FakeFetcher::new(), Duration::from_secs(30));

        let temp = coordinator.metric("192.168.1.42", "temp");
        assert_eq!(temp.key(), "temp");
        assert_eq!(temp.unique_id(), "192.168.1.42_temp");
        assert_eq!(temp.name(), "Temperature (192.168.1.42)");

        let unknown = coordinator.metric("miner-1", "coreVoltage");
        assert_eq!(unknown.name(), "coreVoltage (miner-1)");
    }

    #[tokio::test]
    async fn test_value_follows_coordinator() {
        let fetcher = FakeFetcher::new();
        fetcher.push_ok(&[("sharesAccepted", 1042u64.into())]);
        fetcher.push_err(FetchError::Timeout);
        let coordinator = Coordinator::new(fetcher, Duration::from_secs(30));
        let shares = coordinator.metric("miner-1", "sharesAccepted");

        assert!(!shares.is_available());
        assert_eq!(shares.value(), None);

        coordinator.initial_refresh().await.unwrap();
        assert!(shares.is_available());
        assert_eq!(shares.value(), Some(MetricValue::UInt(1042)));

        coordinator.refresh().await;
        assert!(!shares.is_available());
        assert_eq!(shares.value(), Some(MetricValue::UInt(1042)));
    }

    #[tokio::test(start_paused = true)]
    async fn request_update_is_coalesced() {
        let fetcher = FakeFetcher::new();
        fetcher.set_delay(Duration::from_secs(1));
        fetcher.set_fallback(Ok(FakeFetcher::snapshot(&[("fanrpm", 4100u64.into())])));
        let coordinator = Coordinator::new(fetcher.clone(), Duration::from_secs(30));

        let fan = coordinator.metric("miner-1", "fanrpm");
        let temp = coordinator.metric("miner-1", "temp");

        assert!(fan.request_update());
        assert!(!temp.request_update());
        assert_eq!(coordinator.refresh().await, RefreshOutcome::Coalesced);

        let mut updates = fan.subscribe();
        updates.changed().await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(fan.value(), Some(MetricValue::UInt(4100)));
        assert_eq!(temp.value(), None);
    }
}
