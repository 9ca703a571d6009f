//! Error types for hotswap-store.

/// Result type alias for hotswap-store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Result type alias for storage gateway operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Boxed error produced by a storage driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the versioned store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connecting to the backing store failed during construction.
    #[error("Failed to connect to configuration storage: {0}")]
    ConnectionError(#[source] StorageError),

    /// The configuration table is not reachable.
    #[error("Table {0} does not exist")]
    SchemaMissing(String),

    /// A configuration with this version has already been published.
    #[error("Config with version {0} already exists")]
    DuplicateVersion(i64),

    /// The cache holds no configuration yet.
    #[error("No configuration has been persisted yet")]
    NoConfig,

    /// The requested version is not cached.
    #[error("Configuration version {0} not found")]
    VersionNotFound(i64),

    /// Versions must be non-negative.
    #[error("Invalid configuration version {0}: versions must be non-negative")]
    InvalidVersion(i64),

    /// Failed to encode a configuration payload.
    #[error("Failed to serialize configuration: {0}")]
    SerializationError(String),

    /// Failed to decode a configuration payload.
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),

    /// Store settings are invalid or could not be loaded.
    #[error("Invalid store settings: {0}")]
    InvalidSettings(String),

    /// The store has been closed.
    #[error("Store is closed")]
    Closed,

    /// Any other storage failure, passed through unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors reported by a [`ConfigStorage`](crate::storage::ConfigStorage) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A connection could not be established.
    #[error("Connection failed: {0}")]
    Connection(#[source] BoxError),

    /// The probed table does not exist.
    #[error("Table {0} does not exist")]
    SchemaMissing(String),

    /// An insert hit the uniqueness constraint on `Version`.
    #[error("Row with version {0} already exists")]
    UniqueViolation(i64),

    /// The connection has been closed.
    #[error("Storage connection is closed")]
    Closed,

    /// Driver-level failure.
    #[error("Storage backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StorageError {
    /// Wrap an arbitrary driver error.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }
}

#[cfg(any(feature = "sqlite", feature = "mysql"))]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Backend(Box::new(err))
    }
}

impl From<config::ConfigError> for StoreError {
    fn from(err: config::ConfigError) -> Self {
        StoreError::InvalidSettings(err.to_string())
    }
}
