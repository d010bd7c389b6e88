//! The Coordinator: refresh scheduling and cached state for one device.

use std::sync::Arc;
use std::time::Duration;

use axewatch_adapters::{FetchError, Fetcher};
use axewatch_types::{MetricValue, Snapshot, KNOWN_METRICS};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::handle::MetricHandle;
use crate::state::{RefreshOutcome, RefreshState, Shared, StalePolicy};

/// Default refresh interval, matching the device's telemetry cadence.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Default upper bound on a single fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by every coordinator a [`Registry`](crate::Registry) creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Time between scheduled refreshes.
    pub interval: Duration,
    /// Upper bound on one fetch, enforced by the coordinator.
    pub fetch_timeout: Duration,
    /// What to do with the last good snapshot when a fetch fails.
    pub stale_policy: StalePolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            stale_policy: StalePolicy::default(),
        }
    }
}

/// Polls one device on a fixed interval and serves its latest telemetry.
///
/// At most one fetch is in flight at any time: a refresh requested while
/// another is running is coalesced into it. State is replaced only when a
/// fetch completes, under a single write lock, so readers never observe a
/// half-updated state and never wait on the network.
///
/// # Example
///
/// ```rust,no_run
/// use axewatch_adapters::BitaxeAdapter;
/// use axewatch_sdk::Coordinator;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let adapter = Arc::new(BitaxeAdapter::new("192.168.1.42")?);
///     let coordinator = Coordinator::new(adapter, Duration::from_secs(30));
///
///     // A failed first fetch leaves the coordinator unavailable, not broken
///     if let Err(e) = coordinator.initial_refresh().await {
///         eprintln!("device not reachable yet: {}", e);
///     }
///     coordinator.start_periodic();
///
///     println!("power = {:?}", coordinator.get_metric("power"));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Coordinator {
    shared: Arc<Shared>,
    interval: Duration,
    timer: Mutex<Option<PeriodicHandle>>,
}

impl Coordinator {
    /// Create a coordinator with the given refresh interval and defaults
    /// for everything else.
    pub fn new(fetcher: Arc<dyn Fetcher>, interval: Duration) -> Self {
        Self::builder().interval(interval).build(fetcher)
    }

    /// Create a builder for configuring a coordinator.
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    /// Name used in log lines.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The device endpoint this coordinator polls.
    pub fn endpoint(&self) -> &str {
        self.shared.fetcher.endpoint()
    }

    /// The refresh interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Perform the first fetch before the coordinator is put to use.
    ///
    /// The failure is returned to the caller, but the coordinator stays
    /// valid: it is simply unavailable until a later refresh succeeds. If a
    /// fetch is already in flight, waits for it and reports its outcome; if
    /// that fetch is cancelled before committing, fetches again.
    pub async fn initial_refresh(&self) -> Result<(), FetchError> {
        let mut updates = self.shared.subscribe();

        loop {
            let completed = self.shared.state.read().completed();

            match self.shared.refresh().await {
                RefreshOutcome::Refreshed => return Ok(()),
                RefreshOutcome::Failed(e) => return Err(e),
                RefreshOutcome::Coalesced => {
                    // The sender lives in `shared`, so this returns once the
                    // in-flight guard is released
                    let _ = updates.changed().await;

                    let state = self.shared.state.read();
                    if state.completed() == completed {
                        debug!(coordinator = %self.shared.name, "In-flight refresh abandoned, retrying");
                        continue;
                    }
                    return match (&state.last_error, state.last_success) {
                        (Some(e), false) => Err(e.clone()),
                        _ => Ok(()),
                    };
                }
            }
        }
    }

    /// Fetch and commit in the calling task.
    ///
    /// Returns [`RefreshOutcome::Coalesced`] without fetching if another
    /// fetch is in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.shared.refresh().await
    }

    /// Request a refresh without waiting for it.
    ///
    /// Returns `true` if a fetch was started on the Tokio runtime, `false`
    /// if one was already in flight and this request was coalesced into it.
    /// Must be called from within a Tokio runtime.
    pub fn request_refresh(&self) -> bool {
        self.shared.trigger()
    }

    /// Arm the recurring refresh timer.
    ///
    /// The first tick fires one interval from now. Calling this while the
    /// timer is running does nothing.
    pub fn start_periodic(&self) {
        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(|t| !t.task.is_finished()) {
            debug!(coordinator = %self.shared.name, "Periodic refresh already running");
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let shared = self.shared.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        shared.trigger();
                    }
                    // Fires on stop() and when the sender is dropped
                    _ = stop_rx.changed() => break,
                }
            }

            debug!(coordinator = %shared.name, "Periodic refresh stopped");
        });

        debug!(
            coordinator = %self.shared.name,
            interval_ms = interval.as_millis() as u64,
            "Periodic refresh started"
        );
        *timer = Some(PeriodicHandle { stop_tx, task });
    }

    /// Cancel the refresh timer.
    ///
    /// A fetch already in flight still completes and commits. Manual
    /// refreshes remain possible.
    pub fn stop(&self) {
        if let Some(handle) = self.timer.lock().take() {
            let _ = handle.stop_tx.send(true);
        }
    }

    /// Whether the refresh timer is armed.
    pub fn is_periodic(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|t| !t.task.is_finished())
    }

    /// Value of `key` in the last snapshot, if any.
    ///
    /// Never fetches.
    pub fn get_metric(&self, key: &str) -> Option<MetricValue> {
        self.shared.get_metric(key)
    }

    /// Whether the most recent fetch succeeded.
    pub fn is_available(&self) -> bool {
        self.shared.is_available()
    }

    /// Whether a fetch is running right now.
    pub fn is_refreshing(&self) -> bool {
        self.shared.is_in_flight()
    }

    /// The last successfully decoded snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.shared.state.read().last_snapshot.clone()
    }

    /// The error from the most recent failed fetch.
    pub fn last_error(&self) -> Option<FetchError> {
        self.shared.state.read().last_error.clone()
    }

    /// A consistent copy of the full refresh state.
    pub fn state(&self) -> RefreshState {
        self.shared.view()
    }

    /// Subscribe to state changes.
    ///
    /// The value is a counter bumped after every completed fetch, successful
    /// or not.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.subscribe()
    }

    /// A reader for one metric of this device.
    pub fn metric(&self, device_id: &str, key: &str) -> MetricHandle {
        MetricHandle::new(self.shared.clone(), device_id, key)
    }

    /// Readers for every metric that has a display name.
    pub fn known_metrics(&self, device_id: &str) -> Vec<MetricHandle> {
        KNOWN_METRICS
            .iter()
            .map(|(key, _)| self.metric(device_id, key))
            .collect()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for configuring a Coordinator.
#[derive(Debug, Default)]
pub struct CoordinatorBuilder {
    name: Option<String>,
    interval: Option<Duration>,
    fetch_timeout: Option<Duration>,
    stale_policy: Option<StalePolicy>,
}

impl CoordinatorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every field of a shared configuration.
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.interval = Some(config.interval);
        self.fetch_timeout = Some(config.fetch_timeout);
        self.stale_policy = Some(config.stale_policy);
        self
    }

    /// Set the name used in log lines.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the refresh interval.
    ///
    /// Defaults to 30 seconds if not specified.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the upper bound on a single fetch (default: 10 seconds).
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Set the stale data policy (default: retain).
    pub fn stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = Some(policy);
        self
    }

    /// Build the coordinator. It does not fetch until asked to.
    pub fn build(self, fetcher: Arc<dyn Fetcher>) -> Coordinator {
        let name = self
            .name
            .unwrap_or_else(|| format!("BitAxe Sensor Data ({})", fetcher.endpoint()));

        let interval = match self.interval {
            Some(interval) if interval.is_zero() => {
                warn!(coordinator = %name, "Zero refresh interval, using default");
                DEFAULT_INTERVAL
            }
            Some(interval) => interval,
            None => DEFAULT_INTERVAL,
        };

        let shared = Shared::new(
            name,
            fetcher,
            self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT),
            self.stale_policy.unwrap_or_default(),
        );

        Coordinator {
            shared: Arc::new(shared),
            interval,
            timer: Mutex::new(None),
        }
    }
}

/// Running refresh timer.
#[derive(Debug)]
struct PeriodicHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}
