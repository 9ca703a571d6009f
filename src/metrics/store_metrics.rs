//! Store metrics tracking using OpenTelemetry.

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Running totals of everything a [`StoreMetrics`] has recorded.
///
/// Kept in process alongside the OpenTelemetry instruments so the numbers
/// can be inspected without an exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Poll cycles started.
    pub polls: u64,
    /// Poll cycles whose query failed.
    pub poll_failures: u64,
    /// Versions added to the cache.
    pub versions_merged: u64,
    /// Rows skipped during merges.
    pub decode_failures: u64,
    /// Newest cached version after the last successful poll.
    pub latest_version: Option<i64>,
    /// Successful publishes.
    pub publishes: u64,
    /// Publishes rejected as duplicates.
    pub publish_duplicates: u64,
    /// Publishes that failed otherwise.
    pub publish_failures: u64,
}

/// Metrics collector for polling and publishing.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_store::metrics::StoreMetrics;
/// use opentelemetry::global;
///
/// let metrics = StoreMetrics::new(global::meter("hotswap-store"));
///
/// let timer = metrics.start_poll();
/// // ... query the table ...
/// metrics.record_poll_success(timer, 1, 0, 42);
/// ```
#[derive(Clone)]
pub struct StoreMetrics {
    poll_attempts: Counter<u64>,
    poll_failures: Counter<u64>,
    poll_duration: Histogram<f64>,
    versions_merged: Counter<u64>,
    decode_failures: Counter<u64>,
    latest_version: Gauge<i64>,
    publish_success: Counter<u64>,
    publish_duplicates: Counter<u64>,
    publish_failures: Counter<u64>,
    totals: Arc<Mutex<MetricsSnapshot>>,
}

impl StoreMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        Self {
            poll_attempts: meter
                .u64_counter("hotswap_store.poll.attempts")
                .with_description("Total number of poll cycles")
                .build(),
            poll_failures: meter
                .u64_counter("hotswap_store.poll.failures")
                .with_description("Number of poll cycles whose query failed")
                .build(),
            poll_duration: meter
                .f64_histogram("hotswap_store.poll.duration")
                .with_description("Duration of poll cycles in seconds")
                .with_unit("s")
                .build(),
            versions_merged: meter
                .u64_counter("hotswap_store.versions.merged")
                .with_description("Configuration versions added to the cache")
                .build(),
            decode_failures: meter
                .u64_counter("hotswap_store.decode.failures")
                .with_description("Rows skipped because their payload failed to decode")
                .build(),
            latest_version: meter
                .i64_gauge("hotswap_store.version.latest")
                .with_description("Newest cached configuration version")
                .build(),
            publish_success: meter
                .u64_counter("hotswap_store.publish.success")
                .with_description("Configuration versions published")
                .build(),
            publish_duplicates: meter
                .u64_counter("hotswap_store.publish.duplicates")
                .with_description("Publishes rejected because the version already exists")
                .build(),
            publish_failures: meter
                .u64_counter("hotswap_store.publish.failures")
                .with_description("Publishes that failed for any other reason")
                .build(),
            totals: Arc::new(Mutex::new(MetricsSnapshot::default())),
        }
    }

    /// Start a poll timer.
    pub fn start_poll(&self) -> Instant {
        self.poll_attempts.add(1, &[]);
        self.totals.lock().polls += 1;
        Instant::now()
    }

    /// Record a poll whose query succeeded.
    pub fn record_poll_success(&self, start: Instant, merged: usize, skipped: usize, latest: i64) {
        self.poll_duration.record(start.elapsed().as_secs_f64(), &[]);
        self.versions_merged.add(merged as u64, &[]);
        self.decode_failures.add(skipped as u64, &[]);
        self.latest_version.record(latest, &[]);

        let mut totals = self.totals.lock();
        totals.versions_merged += merged as u64;
        totals.decode_failures += skipped as u64;
        if latest >= 0 {
            totals.latest_version = Some(latest);
        }
    }

    /// Record a poll whose query failed.
    pub fn record_poll_failure(&self, start: Instant) {
        self.poll_duration.record(start.elapsed().as_secs_f64(), &[]);
        self.poll_failures.add(1, &[]);
        self.totals.lock().poll_failures += 1;
    }

    /// Record a successful publish.
    pub fn record_publish_success(&self) {
        self.publish_success.add(1, &[]);
        self.totals.lock().publishes += 1;
    }

    /// Record a publish rejected as a duplicate version.
    pub fn record_publish_duplicate(&self) {
        self.publish_duplicates.add(1, &[]);
        self.totals.lock().publish_duplicates += 1;
    }

    /// Record a publish that failed for another reason.
    pub fn record_publish_failure(&self) {
        self.publish_failures.add(1, &[]);
        self.totals.lock().publish_failures += 1;
    }

    /// Totals recorded so far, shared by every clone of this collector.
    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.totals.lock()
    }
}
