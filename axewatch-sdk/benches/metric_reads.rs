use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axewatch_sdk::{Coordinator, FetchError, Fetcher, MetricValue, Snapshot};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Fetcher that always returns a full device payload.
#[derive(Debug)]
struct StaticFetcher(Snapshot);

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        Ok(self.0.clone())
    }

    fn endpoint(&self) -> &str {
        "bench-device"
    }
}

fn device_snapshot() -> Snapshot {
    Snapshot::builder()
        .metric("power", 12.3)
        .metric("temp", 55u64)
        .metric("hashRate", 512.7)
        .metric("bestDiff", "4.29G")
        .metric("bestSessionDiff", "1.2M")
        .metric("sharesAccepted", 1042u64)
        .metric("sharesRejected", 3u64)
        .metric("fanspeed", 100u64)
        .metric("fanrpm", 4100u64)
        .metric("uptimeSeconds", 86400u64)
        .build()
}

fn ready_coordinator(rt: &tokio::runtime::Runtime) -> Coordinator {
    let coordinator = Coordinator::new(
        Arc::new(StaticFetcher(device_snapshot())),
        Duration::from_secs(30),
    );
    rt.block_on(coordinator.initial_refresh())
        .expect("static fetcher never fails");
    coordinator
}

/// Benchmark get_metric latency (hot path for readers)
fn bench_get_metric(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = ready_coordinator(&rt);

    c.bench_function("get_metric", |b| {
        b.iter(|| {
            let value: Option<MetricValue> = coordinator.get_metric(black_box("hashRate"));
            value
        });
    });
}

/// Benchmark reads of a key the device does not report
fn bench_get_missing_metric(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = ready_coordinator(&rt);

    c.bench_function("get_missing_metric", |b| {
        b.iter(|| coordinator.get_metric(black_box("nonexistent_key")));
    });
}

/// Benchmark a reader handle walking every known metric
fn bench_known_metrics_scan(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = ready_coordinator(&rt);
    let handles = coordinator.known_metrics("bench-device");

    c.bench_function("known_metrics_scan", |b| {
        b.iter(|| {
            for handle in &handles {
                black_box(handle.value());
                black_box(handle.is_available());
            }
        });
    });
}

/// Benchmark a full refresh cycle against an instant fetcher
fn bench_refresh_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = ready_coordinator(&rt);

    c.bench_function("refresh_cycle", |b| {
        b.iter(|| rt.block_on(coordinator.refresh()));
    });
}

criterion_group!(
    benches,
    bench_get_metric,
    bench_get_missing_metric,
    bench_known_metrics_scan,
    bench_refresh_cycle,
);
criterion_main!(benches);
