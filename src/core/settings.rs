//! Store settings loaded from files and environment variables.

use crate::error::{Result, StoreError};
use crate::storage::{DEFAULT_TABLE, validate_table_name};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default time between polls of the backing table.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5);

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_polling_interval_ms() -> u64 {
    DEFAULT_POLLING_INTERVAL.as_millis() as u64
}

fn default_max_connections() -> u32 {
    4
}

/// Settings for connecting to and polling the configuration table.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_store::core::StoreSettings;
///
/// # fn example() -> hotswap_store::error::Result<()> {
/// // APP_STORE__POLLING_INTERVAL_MS=1000 overrides the file value
/// let settings = StoreSettings::load(Some("config/store.yaml"), "APP_STORE")?;
/// println!("polling every {:?}", settings.polling_interval());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreSettings {
    /// Name of the configuration table.
    #[serde(default = "default_table")]
    pub table: String,

    /// Milliseconds between polls.
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    /// Connection URL for SQL backends.
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum number of pooled connections for SQL backends.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl StoreSettings {
    /// Load settings from an optional file, overridden by environment variables.
    ///
    /// Environment variables use `prefix` and a `__` separator, e.g.
    /// `APP_STORE__TABLE`. The file format is detected from its extension
    /// (YAML, TOML or JSON).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a value has the wrong
    /// type, or the resulting settings are invalid.
    pub fn load(file: Option<impl AsRef<Path>>, prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path.as_ref()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("__")
                .separator("__"),
        );

        let settings: StoreSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid table name or a zero polling interval.
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.table)?;
        if self.polling_interval_ms == 0 {
            return Err(StoreError::InvalidSettings(
                "polling_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The polling interval as a `Duration`.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// The connection URL, which SQL backends require.
    #[cfg_attr(not(any(feature = "sqlite", feature = "mysql")), allow(dead_code))]
    pub(crate) fn require_url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .ok_or_else(|| StoreError::InvalidSettings("url is required".to_string()))
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            table: default_table(),
            polling_interval_ms: default_polling_interval_ms(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}
