//! TOML configuration for the `setaside` binary.
//!
//! ```toml
//! [database]
//! backend = "sqlite"            # sqlite | json | memory
//! connection_string = "setaside.db"
//!
//! [logging]
//! level = "info"                # any EnvFilter directive
//! file = "setaside.log"         # optional
//! ```
//!
//! Every key is optional. A missing file yields [`AppConfig::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use setaside_core::db::DbConfig;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "setaside.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "setaside.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    /// Applies command-line overrides on top of the file values.
    pub fn with_overrides(
        mut self,
        backend: Option<String>,
        connection_string: Option<String>,
        log_level: Option<String>,
    ) -> Self {
        if let Some(backend) = backend {
            self.database.backend = backend;
        }
        if let Some(connection_string) = connection_string {
            self.database.connection_string = connection_string;
        }
        if let Some(level) = log_level {
            self.logging.level = level;
        }
        self
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            backend: self.database.backend.clone(),
            connection_string: self.database.connection_string.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::parse(
            r#"
            [database]
            backend = "json"

            [logging]
            file = "/tmp/setaside.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.backend, "json");
        assert_eq!(config.database.connection_string, "setaside.db");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/setaside.log")));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = AppConfig::default().with_overrides(
            Some("memory".to_string()),
            None,
            Some("debug".to_string()),
        );

        assert_eq!(
            config.db_config(),
            DbConfig {
                backend: "memory".to_string(),
                connection_string: "setaside.db".to_string(),
            }
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_reports_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[database\nbackend = 1").unwrap();

        let err = AppConfig::load(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
