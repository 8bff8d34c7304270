//! Engine configuration
//!
//! Settings are read from an optional JSON file and then overridden by
//! `SHOWDB_*` environment variables.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::ROOT_USER;
use crate::error::Result;

/// Default budget for materialized result rows (64 MiB)
pub const DEFAULT_MAX_RESULT_MEMORY: usize = 64 << 20;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database selected when a session starts; empty for none
    pub default_database: String,
    /// Principal the session authenticates as
    pub user: String,
    /// Where the catalog is loaded from and saved to
    pub catalog_path: Option<String>,
    /// Byte budget shared by the result containers of one engine
    pub max_result_memory: usize,
    pub time_zone: String,
    pub search_path: Vec<String>,
    /// Isolation level for new transactions
    pub default_isolation: String,
    /// `tracing-subscriber` filter directive
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_database: String::new(),
            user: ROOT_USER.to_string(),
            catalog_path: None,
            max_result_memory: DEFAULT_MAX_RESULT_MEMORY,
            time_zone: "UTC".to_string(),
            search_path: vec!["pg_catalog".to_string()],
            default_isolation: "SERIALIZABLE".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` if it exists, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let json = fs::read_to_string(path)?;
            serde_json::from_str(&json)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        Ok(config.with_overrides(std::env::vars()))
    }

    /// Apply `SHOWDB_*` overrides from `vars`
    pub fn with_overrides<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "SHOWDB_DATABASE" => self.default_database = value,
                "SHOWDB_USER" => self.user = value,
                "SHOWDB_CATALOG" => self.catalog_path = Some(value),
                "SHOWDB_LOG" => self.log_filter = value,
                _ => continue,
            }
            debug!(%key, "config override from environment");
        }
        self
    }

    /// Set the database selected at session start
    pub fn default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = database.into();
        self
    }

    /// Set the session user
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the catalog file
    pub fn catalog_path(mut self, path: impl Into<String>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Set the result memory budget in bytes
    pub fn max_result_memory(mut self, bytes: usize) -> Self {
        self.max_result_memory = bytes;
        self
    }

    pub fn time_zone(mut self, zone: impl Into<String>) -> Self {
        self.time_zone = zone.into();
        self
    }

    pub fn default_isolation(mut self, level: impl Into<String>) -> Self {
        self.default_isolation = level.into();
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config.user, "root");
        assert_eq!(config.max_result_memory, DEFAULT_MAX_RESULT_MEMORY);
        assert_eq!(config.search_path, vec!["pg_catalog"]);
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"default_database": "shop", "max_result_memory": 4096}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.default_database, "shop");
        assert_eq!(config.max_result_memory, 4096);
        assert_eq!(config.time_zone, "UTC");
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::new().user("alice").with_overrides(vec![
            ("SHOWDB_DATABASE".to_string(), "db".to_string()),
            ("SHOWDB_CATALOG".to_string(), "/tmp/cat.json".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);
        assert_eq!(config.default_database, "db");
        assert_eq!(config.user, "alice");
        assert_eq!(config.catalog_path.as_deref(), Some("/tmp/cat.json"));
    }
}
