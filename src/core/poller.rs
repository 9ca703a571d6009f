//! Background polling of the configuration table.

use crate::core::cache::{MergeReport, VersionedCache};
use crate::core::codec::ConfigCodec;
use crate::error::Result;
use crate::notify::ChangeNotifier;
use crate::storage::ConfigStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::StoreMetrics;

/// Reconciles the cache against the backing table.
pub(crate) struct Poller<T, C> {
    cache: Arc<VersionedCache<T>>,
    storage: Arc<dyn ConfigStorage>,
    codec: Arc<C>,
    interval: Duration,
    #[cfg(feature = "metrics")]
    metrics: Option<StoreMetrics>,
}

impl<T, C> Poller<T, C>
where
    T: Send + Sync + 'static,
    C: ConfigCodec<T>,
{
    pub(crate) fn new(
        cache: Arc<VersionedCache<T>>,
        storage: Arc<dyn ConfigStorage>,
        codec: Arc<C>,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            storage,
            codec,
            interval,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn with_metrics(mut self, metrics: Option<StoreMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Fetch every row newer than the cached latest version and merge it.
    ///
    /// The query runs without any cache lock held.
    pub(crate) async fn pull(&self) -> Result<MergeReport> {
        let since = self.cache.latest_version();

        #[cfg(feature = "metrics")]
        let timer = self.metrics.as_ref().map(|m| m.start_poll());

        let rows = match self.storage.fetch_since(since).await {
            Ok(rows) => rows,
            Err(e) => {
                #[cfg(feature = "metrics")]
                {
                    if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
                        metrics.record_poll_failure(timer);
                    }
                }
                return Err(e.into());
            }
        };

        let report = if rows.is_empty() {
            MergeReport::default()
        } else {
            let codec = &self.codec;
            self.cache.merge(rows, |bytes| codec.decode(bytes))
        };

        if report.changed() {
            debug!(
                latest_version = self.cache.latest_version(),
                merged = report.merged,
                skipped = report.skipped,
                "Merged new configuration versions"
            );
        }

        #[cfg(feature = "metrics")]
        {
            if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
                metrics.record_poll_success(
                    timer,
                    report.merged,
                    report.skipped,
                    self.cache.latest_version(),
                );
            }
        }

        Ok(report)
    }

    /// Start the polling loop on the current runtime.
    ///
    /// The notifier moves into the task and is dropped when the loop exits,
    /// which closes the change channel.
    pub(crate) fn spawn(self, notifier: ChangeNotifier) -> PollerHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(notifier, stop_rx));
        PollerHandle {
            stop: Some(stop_tx),
            task,
        }
    }

    async fn run(self, notifier: ChangeNotifier, mut stop: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    match self.pull().await {
                        Ok(report) if report.changed() => {
                            // A watcher that never drains must not block shutdown
                            tokio::select! {
                                _ = &mut stop => break,
                                _ = notifier.notify() => {}
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Failed to fetch configuration updates"),
                    }
                }
            }
        }

        info!("Received shutdown signal, configuration poller stopped");
        drop(notifier);
    }
}

/// Owner's side of the stop handshake with a running poller.
///
/// Dropping the handle also stops the poller, since the stop channel closes.
pub(crate) struct PollerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask the poller to stop and wait until its task has exited.
    pub(crate) async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Configuration poller task ended abnormally");
        }
    }
}
