use async_trait::async_trait;

use setaside_core::db::{DbConfig, RepositoryFactory};
use setaside_core::{LedgerRepository, RepositoryError};

use crate::repository::SqliteRepository;

/// Turn a connection string into a sqlx URL.
///
/// * `sqlite:...` URLs pass through untouched.
/// * `":memory:"` becomes an ephemeral in-memory database.
/// * Anything else is treated as a file path, created if missing.
pub fn connection_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else if trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{}?mode=rwc", trimmed)
    }
}

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`setaside_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use setaside_core::db::RepositoryRegistry;
/// use setaside_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and bring
    /// its schema up to date.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&connection_url(&config.connection_string)).await?;
        repo.run_migrations().await?;
        Ok(Box::new(repo))
    }
}
