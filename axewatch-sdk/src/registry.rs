//! Owned collection of coordinators, one per configured device.

use std::collections::BTreeMap;
use std::sync::Arc;

use axewatch_adapters::{BitaxeAdapter, FetchError, Fetcher};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::coordinator::{Coordinator, CoordinatorConfig};

/// Coordinators keyed by device id.
///
/// Each device gets its own independent coordinator; nothing is shared
/// between them. Whoever manages the device lifecycle owns the registry.
///
/// # Example
///
/// ```rust,no_run
/// use axewatch_sdk::{CoordinatorConfig, Registry};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = Registry::new(CoordinatorConfig::default());
///
///     let coordinator = registry.register("miner-1", "192.168.1.42").await?;
///     println!("available: {}", coordinator.is_available());
///
///     registry.unregister("miner-1");
///     Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    config: CoordinatorConfig,
    coordinators: RwLock<BTreeMap<String, Arc<Coordinator>>>,
}

impl Registry {
    /// Create an empty registry whose coordinators use `config`.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            coordinators: RwLock::new(BTreeMap::new()),
        }
    }

    /// The configuration applied to new coordinators.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Register a BitAxe at `endpoint` under `device_id`.
    ///
    /// Fails only if the HTTP client cannot be built; an unreachable device
    /// is registered anyway and reported unavailable.
    pub async fn register(
        &self,
        device_id: &str,
        endpoint: &str,
    ) -> Result<Arc<Coordinator>, FetchError> {
        let adapter = BitaxeAdapter::builder()
            .endpoint(endpoint)
            .timeout(self.config.fetch_timeout)
            .build()?;

        Ok(self.register_with(device_id, Arc::new(adapter)).await)
    }

    /// Register a device polled through any fetcher.
    ///
    /// Runs the initial refresh, arms the periodic timer and stores the
    /// coordinator. A coordinator already registered under `device_id` is
    /// stopped and replaced.
    pub async fn register_with(&self, device_id: &str, fetcher: Arc<dyn Fetcher>) -> Arc<Coordinator> {
        let coordinator = Arc::new(
            Coordinator::builder()
                .config(self.config)
                .name(format!("BitAxe Sensor Data ({})", device_id))
                .build(fetcher),
        );

        if let Err(e) = coordinator.initial_refresh().await {
            warn!(
                device = %device_id,
                endpoint = %coordinator.endpoint(),
                error = %e,
                "Initial refresh failed, device starts unavailable"
            );
        }
        coordinator.start_periodic();

        let previous = self
            .coordinators
            .write()
            .insert(device_id.to_string(), coordinator.clone());

        if let Some(previous) = previous {
            previous.stop();
            info!(device = %device_id, "Replaced existing coordinator");
        } else {
            info!(device = %device_id, endpoint = %coordinator.endpoint(), "Registered device");
        }

        coordinator
    }

    /// Stop and remove a device's coordinator.
    ///
    /// Returns `true` if the device was registered.
    pub fn unregister(&self, device_id: &str) -> bool {
        let removed = self.coordinators.write().remove(device_id);
        match removed {
            Some(coordinator) => {
                coordinator.stop();
                info!(device = %device_id, "Unregistered device");
                true
            }
            None => false,
        }
    }

    /// Get a device's coordinator.
    pub fn get(&self, device_id: &str) -> Option<Arc<Coordinator>> {
        self.coordinators.read().get(device_id).cloned()
    }

    /// Registered device ids in order.
    pub fn device_ids(&self) -> Vec<String> {
        self.coordinators.read().keys().cloned().collect()
    }

    /// All registered coordinators with their device ids.
    pub fn entries(&self) -> Vec<(String, Arc<Coordinator>)> {
        self.coordinators
            .read()
            .iter()
            .map(|(id, c)| (id.clone(), c.clone()))
            .collect()
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.coordinators.read().len()
    }

    /// Whether no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.coordinators.read().is_empty()
    }

    /// Stop every coordinator's timer and clear the registry.
    pub fn stop_all(&self) {
        let coordinators = std::mem::take(&mut *self.coordinators.write());
        for coordinator in coordinators.values() {
            coordinator.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFetcher;
    use axewatch_types::MetricValue;
    use std::time::Duration;

    fn registry() -> Registry {
        Registry::new(CoordinatorConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn register_runs_initial_refresh_and_starts_timer() {
        let fetcher = FakeFetcher::new();
        fetcher.set_fallback(Ok(FakeFetcher::snapshot(&[("power", 12.3f64.into())])));
        let registry = registry();

        let coordinator = registry.register_with("miner-1", fetcher.clone()).await;

        assert_eq!(fetcher.calls(), 1);
        assert!(coordinator.is_available());
        assert!(coordinator.is_periodic());
        assert_eq!(coordinator.name(), "BitAxe Sensor Data (miner-1)");
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("miner-1").and_then(|c| c.get_metric("power")),
            Some(MetricValue::Float(12.3))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn register_keeps_unreachable_device() {
        let fetcher = FakeFetcher::new();
        let registry = registry();

        let coordinator = registry.register_with("miner-1", fetcher.clone()).await;

        assert!(!coordinator.is_available());
        assert!(coordinator.is_periodic());
        assert!(registry.get("miner-1").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reregister_replaces_and_stops_previous() {
        let first = FakeFetcher::new();
        first.set_fallback(Ok(FakeFetcher::snapshot(&[("temp", 55u64.into())])));
        let second = FakeFetcher::new();
        second.set_fallback(Ok(FakeFetcher::snapshot(&[("temp", 60u64.into())])));
        let registry = registry();

        let old = registry.register_with("miner-1", first.clone()).await;
        registry.register_with("miner-1", second.clone()).await;

        assert_eq!(registry.len(), 1);
        assert!(!old.is_periodic());

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 4);
        assert_eq!(
            registry.get("miner-1").and_then(|c| c.get_metric("temp")),
            Some(MetricValue::UInt(60))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unregister_stops_polling() {
        let fetcher = FakeFetcher::new();
        fetcher.set_fallback(Ok(FakeFetcher::snapshot(&[("temp", 55u64.into())])));
        let registry = registry();

        let coordinator = registry.register_with("miner-1", fetcher.clone()).await;
        assert!(registry.unregister("miner-1"));
        assert!(!registry.unregister("miner-1"));
        assert!(registry.is_empty());
        assert!(!coordinator.is_periodic());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn devices_are_independent() {
        let healthy = FakeFetcher::new();
        healthy.set_fallback(Ok(FakeFetcher::snapshot(&[("power", 12.3f64.into())])));
        let broken = FakeFetcher::new();
        let registry = registry();

        registry.register_with("miner-b", broken).await;
        registry.register_with("miner-a", healthy).await;

        assert_eq!(registry.device_ids(), vec!["miner-a", "miner-b"]);
        assert!(registry.get("miner-a").is_some_and(|c| c.is_available()));
        assert!(registry.get("miner-b").is_some_and(|c| !c.is_available()));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_clears_registry() {
        let fetcher = FakeFetcher::new();
        let registry = registry();

        let a = registry.register_with("miner-a", fetcher.clone()).await;
        let b = registry.register_with("miner-b", fetcher.clone()).await;
        registry.stop_all();

        assert!(registry.is_empty());
        assert!(!a.is_periodic());
        assert!(!b.is_periodic());
    }

    #[tokio::test]
    async fn register_builds_bitaxe_adapter() {
        let registry = registry();
        let coordinator = registry.register("miner-1", "127.0.0.1:1").await.unwrap();

        assert_eq!(coordinator.endpoint(), "127.0.0.1:1");
        assert!(!coordinator.is_available());
        registry.stop_all();
    }
}
