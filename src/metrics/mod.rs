//! Built-in metrics for store operations.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Poll attempts/failures and duration
//! - Versions merged and rows skipped on decode failure
//! - Latest cached version
//! - Publish outcomes (success, duplicate version, other failure)
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotswap_store::prelude::*;
//! use hotswap_store::storage::MemoryStorage;
//! use opentelemetry::global;
//!
//! # async fn example() -> Result<()> {
//! let storage = MemoryStorage::new();
//! let store = VersionedStore::builder()
//!     .with_metrics(global::meter("my-app"))
//!     .build::<AppConfig, _>(&storage)
//!     .await?;
//! # Ok(())
//! # }
//! # #[derive(serde::Serialize, serde::Deserialize, Clone)] struct AppConfig { version: i64 }
//! # impl Versioned for AppConfig { fn version(&self) -> i64 { self.version } }
//! ```

mod store_metrics;

pub use store_metrics::{MetricsSnapshot, StoreMetrics};
