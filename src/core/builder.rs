//! Builder for constructing VersionedStore instances.

use crate::core::codec::{ConfigCodec, JsonCodec, Versioned};
use crate::core::poller::Poller;
use crate::core::settings::{DEFAULT_POLLING_INTERVAL, StoreSettings};
use crate::core::{VersionedCache, VersionedStore};
use crate::error::{Result, StoreError};
use crate::notify;
use crate::storage::{ConfigStorage, Connector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::StoreMetrics;

/// Builder for constructing a `VersionedStore` instance.
///
/// `build` connects, verifies the table, performs one synchronous pull and
/// only then starts the background poller. Any failure aborts construction
/// and no store is returned.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_store::prelude::*;
/// use hotswap_store::storage::SqliteConnector;
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct AppConfig {
///     version: i64,
///     port: u16,
/// }
///
/// impl Versioned for AppConfig {
///     fn version(&self) -> i64 {
///         self.version
///     }
/// }
///
/// # async fn example() -> Result<()> {
/// let connector = SqliteConnector::new("sqlite://config.db").with_table("app_config")?;
///
/// let store = VersionedStore::builder()
///     .with_polling_interval(Duration::from_millis(500))
///     .build::<AppConfig, _>(&connector)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct VersionedStoreBuilder<C = JsonCodec> {
    polling_interval: Duration,
    codec: C,
    #[cfg(feature = "metrics")]
    metrics: Option<StoreMetrics>,
}

impl VersionedStoreBuilder<JsonCodec> {
    /// Create a new builder using the JSON codec and the default polling interval.
    pub fn new() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            codec: JsonCodec,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }
}

impl Default for VersionedStoreBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> VersionedStoreBuilder<C> {
    /// Set the time between polls of the configuration table.
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Apply loaded settings.
    ///
    /// Only the polling interval applies here; the table and connection
    /// settings belong to the connector.
    pub fn with_settings(self, settings: &StoreSettings) -> Self {
        self.with_polling_interval(settings.polling_interval())
    }

    /// Use a custom payload codec.
    pub fn with_codec<C2>(self, codec: C2) -> VersionedStoreBuilder<C2> {
        VersionedStoreBuilder {
            polling_interval: self.polling_interval,
            codec,
            #[cfg(feature = "metrics")]
            metrics: self.metrics,
        }
    }

    /// Record poll and publish metrics with the given meter.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(StoreMetrics::new(meter));
        self
    }

    /// Connect, load every persisted version and start polling.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The polling interval is zero ([`StoreError::InvalidSettings`])
    /// - The connection fails ([`StoreError::ConnectionError`])
    /// - The table is not reachable ([`StoreError::SchemaMissing`])
    /// - The initial pull fails
    pub async fn build<T, K>(self, connector: &K) -> Result<VersionedStore<T, C>>
    where
        T: Versioned + Send + Sync + 'static,
        C: ConfigCodec<T>,
        K: Connector + ?Sized,
    {
        if self.polling_interval.is_zero() {
            return Err(StoreError::InvalidSettings(
                "polling interval must be greater than zero".to_string(),
            ));
        }

        debug!("Initializing versioned store");
        let storage = connector
            .connect()
            .await
            .map_err(StoreError::ConnectionError)?;

        if let Err(e) = storage.verify_schema().await {
            let table = storage.name();
            warn!(table = %table, error = %e, "Configuration table is not reachable");
            close_quietly(storage.as_ref()).await;
            return Err(StoreError::SchemaMissing(table));
        }

        let cache = Arc::new(VersionedCache::new());
        let codec = Arc::new(self.codec);
        let poller = Poller::new(
            Arc::clone(&cache),
            Arc::clone(&storage),
            Arc::clone(&codec),
            self.polling_interval,
        );
        #[cfg(feature = "metrics")]
        let poller = poller.with_metrics(self.metrics.clone());

        if let Err(e) = poller.pull().await {
            close_quietly(storage.as_ref()).await;
            return Err(e);
        }

        info!(
            table = %storage.name(),
            versions = cache.len(),
            latest_version = cache.latest_version(),
            "Loaded persisted configurations"
        );

        let (notifier, watcher) = notify::channel();
        let handle = poller.spawn(notifier);

        let store = VersionedStore::from_parts(cache, storage, codec, watcher, handle);
        #[cfg(feature = "metrics")]
        let store = store.with_metrics(self.metrics);

        Ok(store)
    }
}

async fn close_quietly(storage: &dyn ConfigStorage) {
    if let Err(e) = storage.close().await {
        warn!(error = %e, "Could not close configuration storage");
    }
}
