//! In-process backend holding the whole ledger in a [`LedgerSnapshot`].

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{LedgerRepository, RepositoryError};
use crate::models::{
    BracketSchedule, FilingStatusCode, IncomeRecord, LedgerSnapshot, TaxBracket,
    TaxPaymentRecord, TaxProfile,
};

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<LedgerSnapshot>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(mut snapshot: LedgerSnapshot) -> Self {
        snapshot.normalize();
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl LedgerRepository for MemoryRepository {
    async fn load_profile(&self) -> Result<TaxProfile, RepositoryError> {
        Ok(self.state.lock().await.profile.clone())
    }

    async fn save_profile(&self, profile: &TaxProfile) -> Result<(), RepositoryError> {
        self.state.lock().await.profile = profile.clone();
        Ok(())
    }

    async fn list_income_records(&self) -> Result<Vec<IncomeRecord>, RepositoryError> {
        Ok(self.state.lock().await.income_records.clone())
    }

    async fn get_income_record(&self, id: Uuid) -> Result<IncomeRecord, RepositoryError> {
        self.state
            .lock()
            .await
            .income_record(id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_income_record(&self, record: &IncomeRecord) -> Result<(), RepositoryError> {
        self.state.lock().await.upsert_income_record(record.clone());
        Ok(())
    }

    async fn save_income_records(
        &self,
        records: &[IncomeRecord],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        for record in records {
            state.upsert_income_record(record.clone());
        }
        Ok(())
    }

    async fn delete_income_record(&self, id: Uuid) -> Result<(), RepositoryError> {
        if self.state.lock().await.remove_income_record(id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn replace_income_records(
        &self,
        records: &[IncomeRecord],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.income_records = records.to_vec();
        state.normalize();
        Ok(())
    }

    async fn list_tax_records(&self) -> Result<Vec<TaxPaymentRecord>, RepositoryError> {
        Ok(self.state.lock().await.tax_records.clone())
    }

    async fn replace_tax_records(
        &self,
        records: &[TaxPaymentRecord],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.tax_records = records.to_vec();
        state.normalize();
        Ok(())
    }

    async fn update_tax_record(&self, record: &TaxPaymentRecord) -> Result<(), RepositoryError> {
        if self.state.lock().await.update_tax_record(record.clone()) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn delete_tax_record(&self, id: Uuid) -> Result<(), RepositoryError> {
        if self.state.lock().await.remove_tax_record(id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn get_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        Ok(self.state.lock().await.brackets_for(tax_year, filing_status))
    }

    async fn replace_tax_brackets(
        &self,
        schedule: &BracketSchedule,
    ) -> Result<(), RepositoryError> {
        self.state.lock().await.replace_bracket_schedule(schedule.clone());
        Ok(())
    }

    async fn list_bracket_schedules(&self) -> Result<Vec<BracketSchedule>, RepositoryError> {
        Ok(self.state.lock().await.bracket_schedules.clone())
    }

    async fn replace_ledger(&self, snapshot: &LedgerSnapshot) -> Result<(), RepositoryError> {
        self.state.lock().await.replace_with(snapshot);
        Ok(())
    }
}

/// Factory for the `memory` backend. The connection string is ignored.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError> {
        Ok(Box::new(MemoryRepository::new()))
    }
}
