//! Concurrency-safe cache of decoded configuration versions.

use crate::error::{Result, StoreError};
use crate::storage::ConfigRow;
use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Marker for "no version cached yet"; lower than any legal version.
pub const EMPTY_VERSION: i64 = -1;

struct CacheInner<T> {
    configs: BTreeMap<i64, Arc<T>>,
    latest_version: i64,
}

/// Outcome of merging a batch of rows into the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Rows decoded and inserted as new versions.
    pub merged: usize,
    /// Rows skipped because of a negative version or an undecodable payload.
    pub skipped: usize,
}

impl MergeReport {
    /// Whether at least one new version entered the cache.
    pub fn changed(&self) -> bool {
        self.merged > 0
    }
}

/// Append-only mapping from version number to decoded configuration.
///
/// Entries are never removed or replaced. The latest version always equals
/// the greatest cached key, or [`EMPTY_VERSION`] while the cache is empty.
/// Readers receive `Arc` handles to immutable entries, never references into
/// the live map.
///
/// The newest configuration is additionally published through an `ArcSwap`
/// so [`latest`](Self::latest) never takes the lock.
///
/// # Examples
///
/// ```rust
/// use hotswap_store::core::VersionedCache;
/// use hotswap_store::storage::ConfigRow;
/// use hotswap_store::error::StoreError;
///
/// let cache: VersionedCache<String> = VersionedCache::new();
/// let report = cache.merge(vec![ConfigRow::new(1, b"one".to_vec())], |bytes| {
///     String::from_utf8(bytes.to_vec())
///         .map_err(|e| StoreError::DeserializationError(e.to_string()))
/// });
///
/// assert!(report.changed());
/// assert_eq!(*cache.latest().unwrap(), "one");
/// ```
pub struct VersionedCache<T> {
    inner: RwLock<CacheInner<T>>,
    latest: ArcSwapOption<T>,
}

impl<T> VersionedCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                configs: BTreeMap::new(),
                latest_version: EMPTY_VERSION,
            }),
            latest: ArcSwapOption::empty(),
        }
    }

    /// Get a specific version, if cached.
    pub fn get(&self, version: i64) -> Option<Arc<T>> {
        self.inner.read().configs.get(&version).cloned()
    }

    /// Get the newest cached configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoConfig`] while the cache is empty.
    pub fn latest(&self) -> Result<Arc<T>> {
        self.latest.load_full().ok_or(StoreError::NoConfig)
    }

    /// The newest cached version, or [`EMPTY_VERSION`].
    pub fn latest_version(&self) -> i64 {
        self.inner.read().latest_version
    }

    /// All cached configurations in ascending version order.
    pub fn list_all(&self) -> Vec<Arc<T>> {
        self.inner.read().configs.values().cloned().collect()
    }

    /// All cached version numbers in ascending order.
    pub fn versions(&self) -> Vec<i64> {
        self.inner.read().configs.keys().copied().collect()
    }

    /// Number of cached versions.
    pub fn len(&self) -> usize {
        self.inner.read().configs.len()
    }

    /// Whether no version has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode `rows` and add the new versions to the cache.
    ///
    /// Rows with a negative version or a payload that fails to decode are
    /// logged and skipped; they never move the latest version. Rows whose version is already cached are ignored.
    /// Decoding happens before the write lock is taken.
    pub fn merge<F>(&self, rows: Vec<ConfigRow>, decode: F) -> MergeReport
    where
        F: Fn(&[u8]) -> Result<T>,
    {
        let mut report = MergeReport::default();
        let mut decoded = Vec::with_capacity(rows.len());

        for row in rows {
            if row.version < 0 {
                report.skipped += 1;
                warn!(version = row.version, "Negative configuration version, skipping");
                continue;
            }
            match decode(&row.config) {
                Ok(config) => decoded.push((row.version, Arc::new(config))),
                Err(e) => {
                    report.skipped += 1;
                    warn!(version = row.version, error = %e, "Could not decode configuration, skipping");
                }
            }
        }

        if decoded.is_empty() {
            return report;
        }

        let mut inner = self.inner.write();
        for (version, config) in decoded {
            match inner.configs.entry(version) {
                Entry::Vacant(slot) => {
                    slot.insert(config);
                    report.merged += 1;
                }
                Entry::Occupied(_) => {
                    debug!(version, "Configuration version already cached, ignoring");
                }
            }
        }

        let newest = inner
            .configs
            .last_key_value()
            .map(|(version, config)| (*version, Arc::clone(config)));
        if let Some((version, config)) = newest {
            if version > inner.latest_version {
                inner.latest_version = version;
                self.latest.store(Some(config));
            }
        }

        report
    }
}

impl<T> Default for VersionedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
