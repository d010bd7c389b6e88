//! Refresh state shared between a coordinator, its timer and its readers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axewatch_adapters::{FetchError, Fetcher};
use axewatch_types::{MetricValue, Snapshot};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// What happens to the last good snapshot when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Keep serving the last good snapshot; readers see stale values.
    #[default]
    Retain,
    /// Drop the snapshot; readers see no values until the next success.
    Clear,
}

impl std::str::FromStr for StalePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retain" => Ok(StalePolicy::Retain),
            "clear" => Ok(StalePolicy::Clear),
            other => Err(format!(
                "unknown stale policy '{}', expected 'retain' or 'clear'",
                other
            )),
        }
    }
}

/// Result of an awaited refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The fetch succeeded and the snapshot was replaced.
    Refreshed,
    /// The fetch failed; the error was recorded.
    Failed(FetchError),
    /// Another fetch was already in flight, so nothing was started.
    Coalesced,
}

/// Read-only view of a coordinator's refresh state.
#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    /// Whether the most recent completed fetch succeeded.
    pub last_success: bool,
    /// The most recent successfully decoded snapshot.
    pub last_snapshot: Option<Arc<Snapshot>>,
    /// The error from the most recent failed fetch, cleared on success.
    pub last_error: Option<FetchError>,
    /// Whether a fetch is running right now.
    pub in_flight: bool,
    /// When the most recent fetch completed.
    pub last_attempt: Option<Instant>,
    /// Failed fetches since the last success.
    pub consecutive_failures: u32,
    pub total_successes: u64,
    pub total_failures: u64,
}

impl RefreshState {
    /// True when a snapshot is present but the last fetch failed.
    pub fn is_stale(&self) -> bool {
        !self.last_success && self.last_snapshot.is_some()
    }

    /// Time since the most recent completed fetch.
    pub fn since_last_attempt(&self) -> Option<Duration> {
        self.last_attempt.map(|t| t.elapsed())
    }

    /// Number of fetches that ran to completion, successful or not.
    pub(crate) fn completed(&self) -> u64 {
        self.total_successes + self.total_failures
    }

    fn record_success(&mut self, snapshot: Snapshot) {
        self.last_success = true;
        self.last_snapshot = Some(Arc::new(snapshot));
        self.last_error = None;
        self.last_attempt = Some(Instant::now());
        self.consecutive_failures = 0;
        self.total_successes += 1;
    }

    fn record_failure(&mut self, error: FetchError, policy: StalePolicy) {
        self.last_success = false;
        self.last_error = Some(error);
        self.last_attempt = Some(Instant::now());
        self.consecutive_failures += 1;
        self.total_failures += 1;

        if policy == StalePolicy::Clear {
            self.last_snapshot = None;
        }
    }
}

/// State shared by a coordinator, its timer task, spawned fetches and
/// metric handles.
#[derive(Debug)]
pub(crate) struct Shared {
    pub name: String,
    pub fetcher: Arc<dyn Fetcher>,
    pub fetch_timeout: Duration,
    pub stale_policy: StalePolicy,
    pub state: RwLock<RefreshState>,
    in_flight: AtomicBool,
    generation: watch::Sender<u64>,
}

impl Shared {
    pub fn new(
        name: String,
        fetcher: Arc<dyn Fetcher>,
        fetch_timeout: Duration,
        stale_policy: StalePolicy,
    ) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            name,
            fetcher,
            fetch_timeout,
            stale_policy,
            state: RwLock::new(RefreshState::default()),
            in_flight: AtomicBool::new(false),
            generation,
        }
    }

    /// Claim the in-flight slot, or `None` if a fetch is already running.
    pub fn try_begin(self: &Arc<Self>) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                shared: self.clone(),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch, commit and notify. Fetches in the calling task.
    pub async fn refresh(self: &Arc<Self>) -> RefreshOutcome {
        match self.try_begin() {
            Some(guard) => self.run(guard).await,
            None => {
                debug!(coordinator = %self.name, "Refresh already in flight, coalescing");
                RefreshOutcome::Coalesced
            }
        }
    }

    /// Start a fetch on the runtime unless one is already in flight.
    pub fn trigger(self: &Arc<Self>) -> bool {
        let Some(guard) = self.try_begin() else {
            debug!(coordinator = %self.name, "Refresh already in flight, coalescing");
            return false;
        };

        let shared = self.clone();
        tokio::spawn(async move {
            shared.run(guard).await;
        });
        true
    }

    async fn run(&self, guard: InFlightGuard) -> RefreshOutcome {
        let result = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        let outcome = self.commit(result);

        // Release only after the commit so the next fetch sees this one's state
        drop(guard);

        outcome
    }

    fn commit(&self, result: Result<Snapshot, FetchError>) -> RefreshOutcome {
        let mut state = self.state.write();
        let was_failing = state.consecutive_failures > 0;

        match result {
            Ok(snapshot) => {
                if was_failing {
                    info!(
                        coordinator = %self.name,
                        failures = state.consecutive_failures,
                        "Fetching data recovered"
                    );
                }
                debug!(coordinator = %self.name, metrics = snapshot.len(), "Refresh succeeded");
                state.record_success(snapshot);
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                if was_failing {
                    debug!(coordinator = %self.name, error = %e, "Fetch still failing");
                } else {
                    error!(coordinator = %self.name, kind = e.kind(), error = %e, "Error fetching data");
                }
                state.record_failure(e.clone(), self.stale_policy);
                RefreshOutcome::Failed(e)
            }
        }
    }

    pub fn get_metric(&self, key: &str) -> Option<MetricValue> {
        self.state
            .read()
            .last_snapshot
            .as_ref()
            .and_then(|s| s.get(key).cloned())
    }

    pub fn is_available(&self) -> bool {
        self.state.read().last_success
    }

    pub fn view(&self) -> RefreshState {
        let mut state = self.state.read().clone();
        state.in_flight = self.is_in_flight();
        state
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

/// Holds the in-flight slot; releases it and notifies subscribers when
/// dropped.
///
/// The notification also fires when the fetch holding the guard is
/// cancelled before it commits, so anyone waiting on it can try again.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    shared: Arc<Shared>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.shared.in_flight.store(false, Ordering::Release);
        self.shared.generation.send_modify(|g| *g = g.wrapping_add(1));
    }
}
