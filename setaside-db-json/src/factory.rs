use async_trait::async_trait;

use setaside_core::db::{DbConfig, RepositoryFactory};
use setaside_core::{LedgerRepository, RepositoryError};

use crate::repository::JsonFileRepository;

/// [`RepositoryFactory`] for the `"json"` backend.
///
/// The connection string is the path of the ledger file. It is created on
/// the first write.
pub struct JsonRepositoryFactory;

#[async_trait]
impl RepositoryFactory for JsonRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError> {
        let path = config.connection_string.trim();
        if path.is_empty() {
            return Err(RepositoryError::Configuration(
                "json backend needs a file path as its connection string".to_string(),
            ));
        }
        let repo = JsonFileRepository::open(path).await?;
        Ok(Box::new(repo))
    }
}
