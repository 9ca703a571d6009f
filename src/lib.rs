//! # hotswap-store
//!
//! Versioned, hot-reloadable configuration backed by a relational table.
//!
//! ## Overview
//!
//! `hotswap-store` keeps every published configuration version in a table
//! with a unique `Version` column and serves them to the process from an
//! in-memory cache:
//! - An append-only, concurrency-safe cache of decoded versions
//! - Background polling for versions newer than the latest cached one
//! - A single-slot change channel that wakes consumers when the cache advances
//! - Publishing that reports "version already exists" as a distinct error
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hotswap_store::prelude::*;
//! use hotswap_store::storage::SqliteConnector;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct QuotaConfig {
//!     version: i64,
//!     max_tokens: u64,
//! }
//!
//! impl Versioned for QuotaConfig {
//!     fn version(&self) -> i64 {
//!         self.version
//!     }
//! }
//!
//! # async fn example() -> hotswap_store::error::Result<()> {
//! let connector = SqliteConnector::new("sqlite://quota.db");
//! let store = VersionedStore::<QuotaConfig>::new(&connector, Duration::from_secs(5)).await?;
//!
//! // Publish a new version; other instances pick it up on their next poll
//! match store
//!     .persist_and_notify("deploy", &QuotaConfig { version: 8, max_tokens: 500 })
//!     .await
//! {
//!     Err(StoreError::DuplicateVersion(v)) => println!("version {} already published", v),
//!     other => other?,
//! }
//!
//! // React to new versions
//! let watcher = store.change_watcher();
//! while watcher.changed().await.is_some() {
//!     let cfg = store.read_persisted_config()?;
//!     println!("Now at version {}", cfg.version);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `sqlite` (default): SQLite backend via `sqlx`
//! - `mysql`: MySQL backend via `sqlx`
//! - `metrics`: OpenTelemetry poll and publish metrics

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod storage;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ConfigCodec, JsonCodec, StoreState, Versioned, VersionedStore};
    pub use crate::error::{Result, StorageError, StoreError};
    pub use crate::notify::ChangeWatcher;
    pub use crate::storage::{ConfigRow, ConfigStorage, Connector};
}
