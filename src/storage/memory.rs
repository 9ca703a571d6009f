//! In-process configuration table.

use super::{ConfigRow, ConfigStorage, Connector, DEFAULT_TABLE};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

struct MemoryTable {
    rows: BTreeMap<i64, Vec<u8>>,
    schema_present: bool,
    pending_fetch_failures: usize,
    fetch_count: usize,
    closed: bool,
}

/// An in-memory configuration table with the same uniqueness semantics as the
/// SQL backends.
///
/// Cloning yields another handle to the same table, so a test can keep one
/// handle to seed rows while the store polls through another. It also acts as
/// its own [`Connector`]; reconnecting after `close` reopens the table.
///
/// # Examples
///
/// ```rust
/// use hotswap_store::storage::{ConfigRow, MemoryStorage};
///
/// let storage = MemoryStorage::new();
/// storage.insert_raw(ConfigRow::new(1, b"{\"version\":1}".to_vec()));
/// assert_eq!(storage.len(), 1);
/// ```
#[derive(Clone)]
pub struct MemoryStorage {
    table: String,
    inner: Arc<Mutex<MemoryTable>>,
}

impl MemoryStorage {
    /// Create an empty table named [`DEFAULT_TABLE`].
    pub fn new() -> Self {
        Self::with_table(DEFAULT_TABLE)
    }

    /// Create an empty table with a custom name.
    pub fn with_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            inner: Arc::new(Mutex::new(MemoryTable {
                rows: BTreeMap::new(),
                schema_present: true,
                pending_fetch_failures: 0,
                fetch_count: 0,
                closed: false,
            })),
        }
    }

    /// Create a storage whose table has not been provisioned.
    pub fn without_schema() -> Self {
        let storage = Self::new();
        storage.inner.lock().schema_present = false;
        storage
    }

    /// Write a row directly, bypassing uniqueness checks.
    ///
    /// Useful to simulate another process publishing, or to plant payloads
    /// that will not decode.
    pub fn insert_raw(&self, row: ConfigRow) {
        self.inner.lock().rows.insert(row.version, row.config);
    }

    /// Make the next `count` fetches fail.
    pub fn fail_next_fetches(&self, count: usize) {
        self.inner.lock().pending_fetch_failures = count;
    }

    /// Stored payload for a version, if any.
    pub fn row(&self, version: i64) -> Option<Vec<u8>> {
        self.inner.lock().rows.get(&version).cloned()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fetches served (including injected failures).
    pub fn fetch_count(&self) -> usize {
        self.inner.lock().fetch_count
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryStorage {
    async fn connect(&self) -> StorageResult<Arc<dyn ConfigStorage>> {
        self.inner.lock().closed = false;
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl ConfigStorage for MemoryStorage {
    fn name(&self) -> String {
        self.table.clone()
    }

    async fn verify_schema(&self) -> StorageResult<()> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(StorageError::Closed);
        }
        if !inner.schema_present {
            return Err(StorageError::SchemaMissing(self.table.clone()));
        }
        Ok(())
    }

    async fn fetch_since(&self, version: i64) -> StorageResult<Vec<ConfigRow>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(StorageError::Closed);
        }
        inner.fetch_count += 1;
        if inner.pending_fetch_failures > 0 {
            inner.pending_fetch_failures -= 1;
            return Err(StorageError::backend("injected fetch failure"));
        }

        Ok(inner
            .rows
            .range(version.saturating_add(1)..)
            .map(|(v, bytes)| ConfigRow::new(*v, bytes.clone()))
            .collect())
    }

    async fn insert(&self, row: ConfigRow) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(StorageError::Closed);
        }
        if inner.rows.contains_key(&row.version) {
            return Err(StorageError::UniqueViolation(row.version));
        }
        inner.rows.insert(row.version, row.config);
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_since_is_exclusive_and_ordered() {
        let storage = MemoryStorage::new();
        storage.insert_raw(ConfigRow::new(3, b"c".to_vec()));
        storage.insert_raw(ConfigRow::new(1, b"a".to_vec()));
        storage.insert_raw(ConfigRow::new(2, b"b".to_vec()));

        let rows = storage.fetch_since(1).await.unwrap();
        let versions: Vec<i64> = rows.iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![2, 3]);

        let rows = storage.fetch_since(-1).await.unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_insert_duplicate_keeps_first_row() {
        let storage = MemoryStorage::new();
        storage.insert(ConfigRow::new(1, b"first".to_vec())).await.unwrap();

        let result = storage.insert(ConfigRow::new(1, b"second".to_vec())).await;
        assert!(matches!(result, Err(StorageError::UniqueViolation(1))));
        assert_eq!(storage.row(1).unwrap(), b"first".to_vec());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let storage = MemoryStorage::new();
        storage.fail_next_fetches(2);

        assert!(storage.fetch_since(-1).await.is_err());
        assert!(storage.fetch_since(-1).await.is_err());
        assert!(storage.fetch_since(-1).await.is_ok());
        assert_eq!(storage.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_schema() {
        let storage = MemoryStorage::without_schema();
        assert!(matches!(
            storage.verify_schema().await,
            Err(StorageError::SchemaMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_storage_rejects_queries() {
        let storage = MemoryStorage::new();
        storage.close().await.unwrap();
        assert!(storage.is_closed());
        assert!(matches!(
            storage.fetch_since(-1).await,
            Err(StorageError::Closed)
        ));

        let conn = storage.connect().await.unwrap();
        assert!(conn.fetch_since(-1).await.is_ok());
    }
}
