use std::collections::HashMap;

use async_trait::async_trait;

use tracing::{info, warn};

use super::repository::{LedgerRepository, RepositoryError};

/// Backend-agnostic connection configuration.
///
/// `backend` must match the [`RepositoryFactory::backend_name`] of a
/// registered factory. `connection_string` is passed through to that
/// factory unchanged and means something different to each backend.
///
/// | backend  | connection_string examples                  |
/// |----------|---------------------------------------------|
/// | `sqlite` | `sqlite:setaside.db?mode=rwc`, `sqlite::memory:` |
/// | `json`   | `ledger.json`                               |
/// | `memory` | ignored                                     |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Lowercase identifier matching a registered factory (e.g. `"sqlite"`).
    pub backend: String,
    /// Opaque value forwarded to the factory's `create` method.
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "sqlite:setaside.db?mode=rwc".to_string(),
        }
    }
}

/// One implementation per storage backend. Each backend exports a unit
/// struct implementing this trait, registered with a
/// [`RepositoryRegistry`] at startup.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    /// Open (or create) the store and return a ready-to-use repository.
    /// Implementations may run migrations or load files here.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError>;
}

/// Backends available to a binary, looked up by name.
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Adds `factory`. A later factory with the same name wins.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        let name = factory.backend_name();
        if self.factories.insert(name, factory).is_some() {
            warn!(backend = name, "Replaced previously registered backend");
        }
    }

    /// Registered backend names in alphabetical order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens the backend named by `config.backend`. Surrounding whitespace
    /// and letter case in the name are ignored.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Configuration`] for an unregistered name, otherwise
    /// whatever the backend's factory reports.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError> {
        let requested = config.backend.trim().to_ascii_lowercase();
        let Some(factory) = self.factories.get(requested.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown backend '{}'; choose one of: {}",
                config.backend,
                self.available_backends().join(", ")
            )));
        };

        info!(backend = %requested, "Opening ledger");
        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
