//! Pieces shared by the sqlx-backed tables.

use super::{ConfigRow, DEFAULT_TABLE, validate_table_name};
use crate::core::StoreSettings;
use crate::error::{Result, StorageError};

/// Where a SQL connector points: URL, table and pool size.
#[derive(Debug, Clone)]
pub(crate) struct SqlTarget {
    pub(crate) url: String,
    pub(crate) table: String,
    pub(crate) max_connections: u32,
}

impl SqlTarget {
    pub(crate) fn new(url: String, max_connections: u32) -> Self {
        Self {
            url,
            table: DEFAULT_TABLE.to_string(),
            max_connections,
        }
    }

    pub(crate) fn from_settings(settings: &StoreSettings) -> Result<Self> {
        let mut target = Self::new(settings.require_url()?.to_string(), 1);
        target.set_table(settings.table.clone())?;
        target.set_max_connections(settings.max_connections);
        Ok(target)
    }

    pub(crate) fn set_table(&mut self, table: String) -> Result<()> {
        validate_table_name(&table)?;
        self.table = table;
        Ok(())
    }

    pub(crate) fn set_max_connections(&mut self, max_connections: u32) {
        self.max_connections = max_connections.max(1);
    }
}

/// Query text for one configuration table. Both drivers use `?` placeholders.
#[derive(Debug)]
pub(crate) struct SqlStatements {
    pub(crate) table: String,
    pub(crate) probe: String,
    pub(crate) select_since: String,
    pub(crate) insert: String,
}

impl SqlStatements {
    pub(crate) fn for_table(table: String) -> Self {
        Self {
            probe: format!("SELECT 1 FROM {} LIMIT 1", table),
            select_since: format!(
                "SELECT Version, Config FROM {} WHERE Version > ? ORDER BY Version ASC",
                table
            ),
            insert: format!("INSERT INTO {} (Version, Config) VALUES (?, ?)", table),
            table,
        }
    }

    /// Any database-level error from the probe means the table is unusable.
    pub(crate) fn probe_error(&self, err: sqlx::Error) -> StorageError {
        match err {
            sqlx::Error::Database(_) => StorageError::SchemaMissing(self.table.clone()),
            e => e.into(),
        }
    }
}

pub(crate) fn connect_error(err: sqlx::Error) -> StorageError {
    StorageError::Connection(Box::new(err))
}

/// MySQL ER_DUP_ENTRY (1062) and SQLite UNIQUE/PRIMARY KEY constraint
/// failures both surface as unique violations.
pub(crate) fn insert_error(err: sqlx::Error, version: i64) -> StorageError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StorageError::UniqueViolation(version)
        }
        e => e.into(),
    }
}

pub(crate) fn into_rows(rows: Vec<(i64, Vec<u8>)>) -> Vec<ConfigRow> {
    rows.into_iter()
        .map(|(version, config)| ConfigRow { version, config })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_use_table_name() {
        let statements = SqlStatements::for_table("quotaservice".to_string());
        assert_eq!(statements.probe, "SELECT 1 FROM quotaservice LIMIT 1");
        assert_eq!(
            statements.select_since,
            "SELECT Version, Config FROM quotaservice WHERE Version > ? ORDER BY Version ASC"
        );
        assert_eq!(
            statements.insert,
            "INSERT INTO quotaservice (Version, Config) VALUES (?, ?)"
        );
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let statements = SqlStatements::for_table("t".to_string());
        assert!(matches!(
            statements.probe_error(sqlx::Error::PoolTimedOut),
            StorageError::Backend(_)
        ));
        assert!(matches!(
            insert_error(sqlx::Error::PoolClosed, 3),
            StorageError::Backend(_)
        ));
    }

    #[test]
    fn test_target_from_settings() {
        let settings = StoreSettings {
            url: Some("sqlite://config.db".to_string()),
            table: "service_config".to_string(),
            max_connections: 0,
            ..StoreSettings::default()
        };
        let target = SqlTarget::from_settings(&settings).unwrap();
        assert_eq!(target.table, "service_config");
        assert_eq!(target.max_connections, 1);

        let mut target = SqlTarget::new("sqlite://config.db".to_string(), 4);
        assert!(target.set_table("bad name".to_string()).is_err());
        assert_eq!(target.table, DEFAULT_TABLE);
    }
}
