//! Client configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! database = "analytics.duckdb"
//! stream_chunk_size = 1024
//!
//! [table_mappings]
//! users = "read_parquet('users/*.parquet')"
//! "archive.users" = "read_parquet('archive/users.parquet')"
//! ```

use std::path::Path;

use duckql_sql::TableMapping;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// DuckDB's standard vector size.
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 2048;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Database file path, or `:memory:`.
    #[serde(default = "default_database")]
    pub database: String,

    /// Rows requested per chunk when streaming.
    #[serde(default = "default_stream_chunk_size")]
    pub stream_chunk_size: usize,

    /// Application name for identification.
    #[serde(default)]
    pub application_name: Option<String>,

    /// Table mappings applied by the dialect.
    #[serde(default)]
    pub table_mappings: TableMapping,
}

fn default_database() -> String {
    ":memory:".to_string()
}

fn default_stream_chunk_size() -> usize {
    DEFAULT_STREAM_CHUNK_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            stream_chunk_size: default_stream_chunk_size(),
            application_name: Some("duckql".to_string()),
            table_mappings: TableMapping::new(),
        }
    }
}

impl ClientConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database path.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the streaming chunk size.
    pub fn stream_chunk_size(mut self, size: usize) -> Self {
        self.stream_chunk_size = size;
        self
    }

    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Adds a table mapping entry.
    pub fn map_table(mut self, key: impl Into<String>, expression: impl Into<String>) -> Self {
        self.table_mappings = self.table_mappings.with(key, expression);
        self
    }

    /// Sets the whole table mapping.
    pub fn table_mappings(mut self, mappings: TableMapping) -> Self {
        self.table_mappings = mappings;
        self
    }

    /// Returns true for an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database == ":memory:"
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(content: &str) -> ClientResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            mappings = config.table_mappings.len(),
            "loaded client configuration"
        );
        Ok(config)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml_string(&self) -> ClientResult<String> {
        toml::to_string_pretty(self).map_err(|e| ClientError::InvalidConfig(e.to_string()))
    }

    /// Checks the configuration for invalid values.
    pub fn validate(&self) -> ClientResult<()> {
        if self.database.is_empty() {
            return Err(ClientError::InvalidConfig("database must not be empty".to_string()));
        }
        if self.stream_chunk_size == 0 {
            return Err(ClientError::InvalidConfig(
                "stream_chunk_size must be positive".to_string(),
            ));
        }
        for (key, expression) in self.table_mappings.iter() {
            if key.is_empty() {
                return Err(ClientError::InvalidConfig(
                    "table mapping key must not be empty".to_string(),
                ));
            }
            if expression.trim().is_empty() {
                return Err(ClientError::InvalidConfig(format!(
                    "table mapping '{}' has an empty expression",
                    key
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.is_in_memory());
        assert_eq!(config.stream_chunk_size, 2048);
        assert!(config.table_mappings.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new()
            .database("a.duckdb")
            .stream_chunk_size(16)
            .map_table("users", "read_parquet('u.parquet')");
        assert!(!config.is_in_memory());
        assert_eq!(config.table_mappings.get("users"), Some("read_parquet('u.parquet')"));
    }

    #[test]
    fn test_from_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
            database = "analytics.duckdb"
            stream_chunk_size = 512

            [table_mappings]
            users = "read_parquet('a.parquet')"
            "archive.users" = "read_parquet('b.parquet')"
            "#,
        )
        .unwrap();

        assert_eq!(config.database, "analytics.duckdb");
        assert_eq!(config.stream_chunk_size, 512);
        assert_eq!(config.table_mappings.len(), 2);
        assert_eq!(
            config.table_mappings.get("archive.users"),
            Some("read_parquet('b.parquet')")
        );
    }

    #[test]
    fn test_from_toml_fills_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.stream_chunk_size, DEFAULT_STREAM_CHUNK_SIZE);
        assert_eq!(config.application_name, None);
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::new().stream_chunk_size(0).validate().is_err());
        assert!(ClientConfig::new().map_table("", "x").validate().is_err());
        assert!(ClientConfig::new().map_table("t", "  ").validate().is_err());
        assert!(matches!(
            ClientConfig::from_toml_str("stream_chunk_size = 0"),
            Err(ClientError::InvalidConfig(_))
        ));
        assert!(ClientConfig::from_toml_str("stream_chunk_size = \"x\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database = \"file.duckdb\"").unwrap();
        writeln!(file, "[table_mappings]").unwrap();
        writeln!(file, "t = \"read_csv('t.csv')\"").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.database, "file.duckdb");
        assert_eq!(config.table_mappings.get("t"), Some("read_csv('t.csv')"));

        assert!(ClientConfig::load(file.path().with_extension("missing")).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ClientConfig::new().map_table("users", "read_parquet('a.parquet')");
        let text = config.to_toml_string().unwrap();
        assert_eq!(ClientConfig::from_toml_str(&text).unwrap(), config);
    }
}
