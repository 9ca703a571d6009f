//! Storage gateway for the backing configuration table.
//!
//! The store never opens connections itself. A [`Connector`] hands out a
//! shared [`ConfigStorage`] handle which is used by the initial pull, every
//! poll cycle and every publish, possibly concurrently.

mod memory;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(any(feature = "sqlite", feature = "mysql"))]
mod sql;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStorage;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlConnector, MySqlStorage};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnector, SqliteStorage};

use crate::error::{Result, StorageResult, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

/// Table name used when none is configured.
pub const DEFAULT_TABLE: &str = "config_versions";

/// One persisted configuration version as stored in the backing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRow {
    /// Unique version number (the table's uniqueness key).
    pub version: i64,
    /// Encoded configuration payload.
    pub config: Vec<u8>,
}

impl ConfigRow {
    /// Create a row from a version and its encoded payload.
    pub fn new(version: i64, config: impl Into<Vec<u8>>) -> Self {
        Self {
            version,
            config: config.into(),
        }
    }
}

/// Opens connections to the backing store.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection that may be shared across tasks.
    async fn connect(&self) -> StorageResult<Arc<dyn ConfigStorage>>;
}

/// A live, shareable connection to the configuration table.
#[async_trait]
pub trait ConfigStorage: Send + Sync {
    /// Human-readable name of the table (for logging and errors).
    fn name(&self) -> String;

    /// Check that the configuration table is reachable.
    async fn verify_schema(&self) -> StorageResult<()>;

    /// Fetch every row with a version strictly greater than `version`,
    /// ordered by ascending version.
    async fn fetch_since(&self, version: i64) -> StorageResult<Vec<ConfigRow>>;

    /// Insert a new row.
    ///
    /// Returns [`StorageError::UniqueViolation`](crate::error::StorageError::UniqueViolation)
    /// when a row with the same version already exists.
    async fn insert(&self, row: ConfigRow) -> StorageResult<()>;

    /// Release the connection.
    async fn close(&self) -> StorageResult<()>;
}

/// Reject table names that are not plain SQL identifiers.
///
/// The table name is interpolated into query text, so only
/// `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSettings(format!(
            "'{}' is not a valid table name",
            table
        )))
    }
}
