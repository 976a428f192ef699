use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    BracketSchedule, FilingStatusCode, IncomeRecord, LedgerSnapshot, TaxBracket, TaxPaymentRecord,
    TaxProfile,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported schema version {found}; this build reads up to {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// Persistence port for the ledger.
///
/// Income records are returned newest date first, tax records newest
/// period first.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    // Profile
    /// Stored profile, or [`TaxProfile::default`] when none was saved.
    async fn load_profile(&self) -> Result<TaxProfile, RepositoryError>;
    async fn save_profile(&self, profile: &TaxProfile) -> Result<(), RepositoryError>;

    // Income records
    async fn list_income_records(&self) -> Result<Vec<IncomeRecord>, RepositoryError>;
    async fn get_income_record(&self, id: Uuid) -> Result<IncomeRecord, RepositoryError>;
    /// Inserts or replaces by id.
    async fn save_income_record(&self, record: &IncomeRecord) -> Result<(), RepositoryError>;
    /// Inserts or replaces each record by id, all or nothing.
    async fn save_income_records(
        &self,
        records: &[IncomeRecord],
    ) -> Result<(), RepositoryError>;
    async fn delete_income_record(&self, id: Uuid) -> Result<(), RepositoryError>;
    async fn replace_income_records(
        &self,
        records: &[IncomeRecord],
    ) -> Result<(), RepositoryError>;

    // Tax payment records
    async fn list_tax_records(&self) -> Result<Vec<TaxPaymentRecord>, RepositoryError>;
    async fn replace_tax_records(
        &self,
        records: &[TaxPaymentRecord],
    ) -> Result<(), RepositoryError>;
    async fn update_tax_record(&self, record: &TaxPaymentRecord) -> Result<(), RepositoryError>;
    async fn delete_tax_record(&self, id: Uuid) -> Result<(), RepositoryError>;

    // Tax brackets
    /// Brackets ordered by lower bound; empty when none are stored.
    async fn get_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<Vec<TaxBracket>, RepositoryError>;
    async fn replace_tax_brackets(
        &self,
        schedule: &BracketSchedule,
    ) -> Result<(), RepositoryError>;
    async fn list_bracket_schedules(&self) -> Result<Vec<BracketSchedule>, RepositoryError>;

    // Whole ledger
    /// Replaces the profile, income and tax records with the snapshot's and
    /// replaces each of its bracket schedules. Either everything is written
    /// or nothing is.
    async fn replace_ledger(&self, snapshot: &LedgerSnapshot) -> Result<(), RepositoryError>;
}
