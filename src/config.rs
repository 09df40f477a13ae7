//! Configuration for the buffered table logger

use crate::error::ConfigError;
use crate::schema::RowShape;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rows buffered before an automatic flush when nothing else is configured
pub const DEFAULT_MAX_BUFFER: usize = 500;

pub const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Name of the table (sheet) rows are appended to
    #[serde(default)]
    pub table: String,

    /// IANA time zone used to format row timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Identifies the backing workbook when the store holds several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,

    #[serde(default = "default_max_buffer")]
    pub max_buffer: usize,

    /// Pins the row shape up front instead of taking it from the first entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<RowShape>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            timezone: default_timezone(),
            store_id: None,
            max_buffer: default_max_buffer(),
            shape: None,
        }
    }
}

impl LoggerConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_store_id(mut self, store_id: impl Into<String>) -> Self {
        self.store_id = Some(store_id.into());
        self
    }

    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    pub fn with_shape(mut self, shape: RowShape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// Non-integer or negative `max_buffer` values fail here, zero fails in
    /// [`validate`](Self::validate).
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(table) = std::env::var("SHEET_LOGGER_TABLE") {
            config.table = table;
        }

        if let Ok(tz) = std::env::var("SHEET_LOGGER_TIMEZONE") {
            config.timezone = tz;
        }

        if let Ok(id) = std::env::var("SHEET_LOGGER_STORE_ID") {
            if !id.is_empty() {
                config.store_id = Some(id);
            }
        }

        if let Ok(value) = std::env::var("SHEET_LOGGER_MAX_BUFFER") {
            config.max_buffer = value.trim().parse().map_err(|_| ConfigError::Env {
                var: "SHEET_LOGGER_MAX_BUFFER",
                value,
            })?;
        }

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Check every construction-time requirement and resolve the time zone
    pub fn validate(&self) -> Result<Tz, ConfigError> {
        if self.table.trim().is_empty() {
            return Err(ConfigError::MissingTable);
        }
        if self.max_buffer == 0 {
            return Err(ConfigError::InvalidMaxBuffer(self.max_buffer.to_string()));
        }
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_max_buffer() -> usize {
    DEFAULT_MAX_BUFFER
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::new("Logs");
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.max_buffer, 500);
        assert_eq!(config.store_id, None);
        assert_eq!(config.validate().unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn test_missing_table() {
        assert!(matches!(
            LoggerConfig::default().validate(),
            Err(ConfigError::MissingTable)
        ));
        assert!(matches!(
            LoggerConfig::new("   ").validate(),
            Err(ConfigError::MissingTable)
        ));
    }

    #[test]
    fn test_zero_max_buffer() {
        let config = LoggerConfig::new("Logs").with_max_buffer(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxBuffer(_))));
    }

    #[test]
    fn test_non_integer_max_buffer_rejected_at_parse() {
        let err = LoggerConfig::from_toml_str("table = \"Logs\"\nmax_buffer = 2.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = LoggerConfig::from_toml_str("table = \"Logs\"\nmax_buffer = -3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_timezone() {
        let config = LoggerConfig::new("Logs").with_timezone("Mars/Olympus_Mons");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimezone(_))));

        let config = LoggerConfig::new("Logs").with_timezone("Asia/Tokyo");
        assert_eq!(config.validate().unwrap(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_toml_defaults() {
        let config = LoggerConfig::from_toml_str("table = \"Audit\"\n").unwrap();
        assert_eq!(config, LoggerConfig::new("Audit"));
    }

    #[test]
    fn test_save_and_load_config() {
        let config = LoggerConfig::new("Audit")
            .with_timezone("Europe/Berlin")
            .with_store_id("workbook-1")
            .with_max_buffer(25)
            .with_shape(RowShape::Leveled);
        let temp_file = NamedTempFile::new().unwrap();

        config.save(temp_file.path()).unwrap();
        let loaded = LoggerConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("SHEET_LOGGER_TABLE", "EnvTable");
        std::env::set_var("SHEET_LOGGER_MAX_BUFFER", "42");
        let config = LoggerConfig::from_env().unwrap();
        std::env::remove_var("SHEET_LOGGER_TABLE");
        std::env::remove_var("SHEET_LOGGER_MAX_BUFFER");

        assert_eq!(config.table, "EnvTable");
        assert_eq!(config.max_buffer, 42);
        assert_eq!(config.timezone, "UTC");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_max_buffer() {
        std::env::set_var("SHEET_LOGGER_MAX_BUFFER", "2.5");
        let result = LoggerConfig::from_env();
        std::env::remove_var("SHEET_LOGGER_MAX_BUFFER");

        assert!(matches!(
            result,
            Err(ConfigError::Env { var: "SHEET_LOGGER_MAX_BUFFER", .. })
        ));
    }
}
