//! Scripted fetcher for exercising coordinators without a device.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axewatch_adapters::{FetchError, Fetcher};
use axewatch_types::{MetricValue, Snapshot};
use parking_lot::Mutex;

/// Returns queued results in order, then repeats the fallback.
#[derive(Debug)]
pub(crate) struct FakeFetcher {
    results: Mutex<VecDeque<Result<Snapshot, FetchError>>>,
    fallback: Mutex<Result<Snapshot, FetchError>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Err(FetchError::Connect("no scripted result".into()))),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    pub fn snapshot(metrics: &[(&str, MetricValue)]) -> Snapshot {
        metrics
            .iter()
            .fold(Snapshot::builder(), |b, (k, v)| b.metric(*k, v.clone()))
            .build()
    }

    pub fn push_ok(&self, metrics: &[(&str, MetricValue)]) {
        self.results.lock().push_back(Ok(Self::snapshot(metrics)));
    }

    pub fn push_err(&self, error: FetchError) {
        self.results.lock().push_back(Err(error));
    }

    pub fn set_fallback(&self, result: Result<Snapshot, FetchError>) {
        *self.fallback.lock() = result;
    }

    /// Make every fetch take `delay` (in tokio time).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        // Decrements even when the fetch is dropped mid-delay
        let _active = ActiveGuard(&self.active);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.results.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.lock().clone())
    }

    fn endpoint(&self) -> &str {
        "fake-device"
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
