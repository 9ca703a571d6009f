//! Integration tests for the SQLite backend.

#![cfg(feature = "sqlite")]

use hotswap_store::core::StoreSettings;
use hotswap_store::prelude::*;
use hotswap_store::storage::SqliteConnector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct FeatureFlags {
    version: i64,
    enable_caching: bool,
}

impl Versioned for FeatureFlags {
    fn version(&self) -> i64 {
        self.version
    }
}

fn flags(version: i64) -> FeatureFlags {
    FeatureFlags {
        version,
        enable_caching: version % 2 == 0,
    }
}

fn connector(dir: &TempDir) -> SqliteConnector {
    SqliteConnector::new(format!("sqlite://{}", dir.path().join("config.db").display()))
}

async fn provision(dir: &TempDir) {
    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(dir.path().join("config.db"))
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await.unwrap();
    sqlx::query("CREATE TABLE config_versions (Version INTEGER PRIMARY KEY, Config BLOB NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;
}

#[tokio::test]
async fn test_missing_table_fails_construction() {
    let dir = TempDir::new().unwrap();
    let result = VersionedStore::<FeatureFlags>::new(&connector(&dir), Duration::from_secs(60)).await;
    assert!(matches!(result, Err(StoreError::SchemaMissing(ref t)) if t == "config_versions"));
}

#[tokio::test]
async fn test_publish_poll_and_duplicate() {
    let dir = TempDir::new().unwrap();
    provision(&dir).await;
    let connector = connector(&dir);

    let store = VersionedStore::<FeatureFlags>::new(&connector, Duration::from_millis(20))
        .await
        .unwrap();
    assert!(matches!(store.read_persisted_config(), Err(StoreError::NoConfig)));

    let watcher = store.change_watcher();
    store.persist_and_notify("test", &flags(1)).await.unwrap();
    store.persist_and_notify("test", &flags(2)).await.unwrap();

    let result = store.persist_and_notify("test", &flags(2)).await;
    assert!(matches!(result, Err(StoreError::DuplicateVersion(2))));

    timeout(Duration::from_secs(5), async {
        while store.latest_version() != Some(2) {
            watcher.changed().await;
        }
    })
    .await
    .unwrap();

    let history: Vec<i64> = store
        .read_historical_configs()
        .iter()
        .map(|c| c.version)
        .collect();
    assert_eq!(history, vec![1, 2]);
    assert_eq!(*store.read_persisted_config().unwrap(), flags(2));

    store.close().await;
    assert_eq!(store.state(), StoreState::Closed);
}

#[tokio::test]
async fn test_initial_pull_reads_existing_rows() {
    let dir = TempDir::new().unwrap();
    provision(&dir).await;
    let connector = connector(&dir);

    let first = VersionedStore::<FeatureFlags>::new(&connector, Duration::from_secs(60))
        .await
        .unwrap();
    for version in [3, 1, 2] {
        first.persist_and_notify("seed", &flags(version)).await.unwrap();
    }
    first.close().await;

    let second = VersionedStore::<FeatureFlags>::new(&connector, Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(second.latest_version(), Some(3));
    assert_eq!(second.read_historical_configs().len(), 3);
    second.close().await;
}

#[tokio::test]
async fn test_connector_from_settings() {
    let settings = StoreSettings {
        table: "bad table".to_string(),
        url: Some("sqlite://unused.db".to_string()),
        ..StoreSettings::default()
    };
    assert!(matches!(
        SqliteConnector::from_settings(&settings),
        Err(StoreError::InvalidSettings(_))
    ));

    let settings = StoreSettings::default();
    assert!(SqliteConnector::from_settings(&settings).is_err());

    let settings = StoreSettings {
        url: Some("sqlite://unused.db".to_string()),
        ..StoreSettings::default()
    };
    assert!(SqliteConnector::from_settings(&settings).is_ok());
}
