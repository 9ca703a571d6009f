//! MySQL-backed configuration table.

use super::sql::{self, SqlStatements, SqlTarget};
use super::{ConfigRow, ConfigStorage, Connector};
use crate::core::StoreSettings;
use crate::error::{Result, StorageResult};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, Pool};
use std::str::FromStr;
use std::sync::Arc;

/// Opens a pooled MySQL connection to the configuration table.
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE config_versions (
///     Version BIGINT NOT NULL PRIMARY KEY,
///     Config  LONGBLOB NOT NULL
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    target: SqlTarget,
}

impl MySqlConnector {
    /// Create a connector for the given `mysql://` URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            target: SqlTarget::new(url.into(), 10),
        }
    }

    /// Build a connector from loaded store settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured or the table name is invalid.
    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        Ok(Self {
            target: SqlTarget::from_settings(settings)?,
        })
    }

    /// Use a custom table name.
    ///
    /// # Errors
    ///
    /// Returns an error if `table` is not a plain SQL identifier.
    pub fn with_table(mut self, table: impl Into<String>) -> Result<Self> {
        self.target.set_table(table.into())?;
        Ok(self)
    }

    /// Set the maximum pool size (minimum 1).
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.target.set_max_connections(max_connections);
        self
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self) -> StorageResult<Arc<dyn ConfigStorage>> {
        let opts = MySqlConnectOptions::from_str(&self.target.url).map_err(sql::connect_error)?;

        let pool = MySqlPoolOptions::new()
            .max_connections(self.target.max_connections)
            .connect_with(opts)
            .await
            .map_err(sql::connect_error)?;

        Ok(Arc::new(MySqlStorage {
            pool,
            statements: SqlStatements::for_table(self.target.table.clone()),
        }))
    }
}

/// A pooled MySQL connection to the configuration table.
pub struct MySqlStorage {
    pool: Pool<MySql>,
    statements: SqlStatements,
}

impl MySqlStorage {
    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<MySql> {
        &self.pool
    }
}

#[async_trait]
impl ConfigStorage for MySqlStorage {
    fn name(&self) -> String {
        self.statements.table.clone()
    }

    async fn verify_schema(&self) -> StorageResult<()> {
        sqlx::query(&self.statements.probe)
            .execute(&self.pool)
            .await
            .map_err(|e| self.statements.probe_error(e))?;
        Ok(())
    }

    async fn fetch_since(&self, version: i64) -> StorageResult<Vec<ConfigRow>> {
        let rows = sqlx::query_as::<_, (i64, Vec<u8>)>(&self.statements.select_since)
            .bind(version)
            .fetch_all(&self.pool)
            .await?;
        Ok(sql::into_rows(rows))
    }

    async fn insert(&self, row: ConfigRow) -> StorageResult<()> {
        let version = row.version;
        sqlx::query(&self.statements.insert)
            .bind(version)
            .bind(row.config)
            .execute(&self.pool)
            .await
            .map_err(|e| sql::insert_error(e, version))?;
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
