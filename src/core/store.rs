//! The main store handle: cached reads, publishing, change watching and shutdown.

use crate::core::cache::{EMPTY_VERSION, VersionedCache};
use crate::core::codec::{ConfigCodec, JsonCodec, Versioned};
use crate::core::poller::PollerHandle;
use crate::core::VersionedStoreBuilder;
use crate::error::{Result, StorageError, StoreError};
use crate::notify::ChangeWatcher;
use crate::storage::{ConfigRow, ConfigStorage, Connector};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::StoreMetrics;

/// Lifecycle state of a [`VersionedStore`].
///
/// Construction happens entirely inside the builder, so a store value is
/// always observed in `Running` or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Poller active; reads and publishes available.
    Running,
    /// `close` is waiting for the poller to exit.
    ShuttingDown,
    /// Terminal state.
    Closed,
}

/// A versioned configuration store backed by an external table.
///
/// The store keeps an append-only cache of every configuration version it has
/// seen, polls the table in the background for newer versions and signals
/// [`ChangeWatcher`]s when the cache advances.
///
/// Publishing through [`persist_and_notify`](Self::persist_and_notify) does
/// not touch the cache: the new version becomes readable once the next poll
/// picks it up, so readers and writers are consistent within one polling
/// interval.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_store::prelude::*;
/// use hotswap_store::storage::MemoryStorage;
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct RateLimits {
///     version: i64,
///     requests_per_second: u32,
/// }
///
/// impl Versioned for RateLimits {
///     fn version(&self) -> i64 {
///         self.version
///     }
/// }
///
/// # async fn example() -> Result<()> {
/// let storage = MemoryStorage::new();
/// let store = VersionedStore::<RateLimits>::new(&storage, Duration::from_secs(1)).await?;
///
/// store
///     .persist_and_notify("admin", &RateLimits { version: 1, requests_per_second: 100 })
///     .await?;
///
/// let watcher = store.change_watcher();
/// watcher.changed().await;
/// println!("now serving {:?}", store.read_persisted_config()?);
///
/// store.close().await;
/// # Ok(())
/// # }
/// ```
pub struct VersionedStore<T, C = JsonCodec> {
    cache: Arc<VersionedCache<T>>,
    storage: Arc<dyn ConfigStorage>,
    codec: Arc<C>,
    watcher: ChangeWatcher,
    poller: Mutex<Option<PollerHandle>>,
    state: Arc<Mutex<StoreState>>,
    shutdown: Mutex<Option<watch::Receiver<bool>>>,
    #[cfg(feature = "metrics")]
    metrics: Option<StoreMetrics>,
}

impl<T> VersionedStore<T, JsonCodec>
where
    T: Versioned + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Connect, load every persisted version and start polling.
    ///
    /// Uses the JSON codec. For other codecs or metrics use
    /// [`VersionedStore::builder`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The connection cannot be established
    /// - The configuration table is not reachable
    /// - The initial pull fails
    /// - `polling_interval` is zero
    pub async fn new<K>(connector: &K, polling_interval: Duration) -> Result<Self>
    where
        K: Connector + ?Sized,
    {
        VersionedStoreBuilder::new()
            .with_polling_interval(polling_interval)
            .build(connector)
            .await
    }
}

impl<T, C> VersionedStore<T, C>
where
    T: Versioned + Send + Sync + 'static,
    C: ConfigCodec<T>,
{
    pub(crate) fn from_parts(
        cache: Arc<VersionedCache<T>>,
        storage: Arc<dyn ConfigStorage>,
        codec: Arc<C>,
        watcher: ChangeWatcher,
        poller: PollerHandle,
    ) -> Self {
        Self {
            cache,
            storage,
            codec,
            watcher,
            poller: Mutex::new(Some(poller)),
            state: Arc::new(Mutex::new(StoreState::Running)),
            shutdown: Mutex::new(None),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn with_metrics(mut self, metrics: Option<StoreMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Publish a configuration version that has never been published before.
    ///
    /// The label identifies the publisher for logging only. Success means the
    /// row is stored; the cache picks it up on the next poll.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`StoreError::DuplicateVersion`] if the version already exists
    /// - [`StoreError::InvalidVersion`] for a negative version
    /// - [`StoreError::Closed`] after [`close`](Self::close)
    /// - Serialization and storage errors unchanged
    pub async fn persist_and_notify(&self, label: &str, config: &T) -> Result<()> {
        if self.state() != StoreState::Running {
            return Err(StoreError::Closed);
        }

        let version = config.version();
        if version < 0 {
            return Err(StoreError::InvalidVersion(version));
        }

        let result = self.publish(version, config).await;

        #[cfg(feature = "metrics")]
        self.record_publish(&result);

        match &result {
            Ok(()) => debug!(version, label, "Published configuration version"),
            Err(StoreError::DuplicateVersion(_)) => {
                debug!(version, label, "Configuration version already published")
            }
            Err(e) => warn!(version, label, error = %e, "Failed to publish configuration"),
        }

        result
    }

    async fn publish(&self, version: i64, config: &T) -> Result<()> {
        let bytes = self.codec.encode(config)?;
        match self.storage.insert(ConfigRow::new(version, bytes)).await {
            Ok(()) => Ok(()),
            Err(StorageError::UniqueViolation(_)) => Err(StoreError::DuplicateVersion(version)),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(feature = "metrics")]
    fn record_publish(&self, result: &Result<()>) {
        if let Some(metrics) = &self.metrics {
            match result {
                Ok(()) => metrics.record_publish_success(),
                Err(StoreError::DuplicateVersion(_)) => metrics.record_publish_duplicate(),
                Err(_) => metrics.record_publish_failure(),
            }
        }
    }

    /// Get a receive-only handle that is signalled whenever the poller
    /// caches a new version.
    ///
    /// The channel holds one pending notification; the poller waits for it
    /// to be drained before sending the next, so watchers should drain
    /// promptly. [`ChangeWatcher::changed`] returns `None` after
    /// [`close`](Self::close).
    pub fn change_watcher(&self) -> ChangeWatcher {
        self.watcher.clone()
    }

    /// Get the newest cached configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoConfig`] if no version has been cached yet.
    pub fn read_persisted_config(&self) -> Result<Arc<T>> {
        self.cache.latest()
    }

    /// Get every cached configuration in ascending version order.
    pub fn read_historical_configs(&self) -> Vec<Arc<T>> {
        self.cache.list_all()
    }

    /// Get one cached version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionNotFound`] if the version is not cached.
    pub fn read_config_version(&self, version: i64) -> Result<Arc<T>> {
        self.cache
            .get(version)
            .ok_or(StoreError::VersionNotFound(version))
    }

    /// The newest cached version, if any.
    pub fn latest_version(&self) -> Option<i64> {
        match self.cache.latest_version() {
            EMPTY_VERSION => None,
            version => Some(version),
        }
    }

    /// The metrics collector supplied through the builder, if any.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<&StoreMetrics> {
        self.metrics.as_ref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StoreState {
        *self.state.lock()
    }

    /// Stop polling and release the connection.
    ///
    /// Returns only after the poller task has exited; an in-flight query is
    /// awaited, not cancelled. The change channel is closed and the storage
    /// connection released afterwards. Close errors are logged, not returned.
    ///
    /// The shutdown runs on its own task: concurrent callers all wait for
    /// the same shutdown, and dropping a pending `close` future does not
    /// interrupt it. Calling `close` on a closed store returns immediately.
    pub async fn close(&self) {
        let mut closed = self.begin_shutdown();
        // Err only if the shutdown task ended without signalling
        let _ = closed.wait_for(|closed| *closed).await;
    }

    fn begin_shutdown(&self) -> watch::Receiver<bool> {
        let mut shutdown = self.shutdown.lock();
        if let Some(closed) = shutdown.as_ref() {
            return closed.clone();
        }

        *self.state.lock() = StoreState::ShuttingDown;
        info!(table = %self.storage.name(), "Shutting down versioned store");

        let (done_tx, done_rx) = watch::channel(false);
        let poller = self.poller.lock().take();
        let storage = Arc::clone(&self.storage);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            if let Some(poller) = poller {
                poller.shutdown().await;
            }

            match storage.close().await {
                Ok(()) => info!("Versioned store shut down"),
                Err(e) => warn!(error = %e, "Could not close configuration storage"),
            }

            *state.lock() = StoreState::Closed;
            let _ = done_tx.send(true);
        });

        *shutdown = Some(done_rx.clone());
        done_rx
    }
}

impl VersionedStore<()> {
    /// Create a new builder for constructing a store.
    pub fn builder() -> VersionedStoreBuilder {
        VersionedStoreBuilder::new()
    }
}
