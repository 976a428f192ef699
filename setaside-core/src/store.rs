//! Command and query service over a [`LedgerRepository`].
//!
//! Every command reads what it needs from the repository, applies the
//! change, and writes the result back. Commands that touch income, the
//! profile or the whole ledger finish by regenerating the monthly tax
//! records.
//!
//! # Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use setaside_core::NewIncomeRecord;
//! use setaside_core::db::MemoryRepository;
//! use setaside_core::store::LedgerStore;
//!
//! let store = LedgerStore::with_system_minter(Box::new(MemoryRepository::new()));
//! store
//!     .add_income(NewIncomeRecord {
//!         date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
//!         client_name: "Acme".to_string(),
//!         amount: dec!(1000),
//!         is_paid: true,
//!         note: String::new(),
//!     })
//!     .await
//!     .unwrap();
//!
//! let overview = store.tax_overview().await.unwrap();
//! // 1,000 × (25% + 3%)
//! assert_eq!(overview.next_amount_due, dec!(280));
//! # }
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calculations::common::{MAX_AMOUNT, MAX_RATE, clamp_rate};
use crate::calculations::{
    BracketTable, BracketTableError, Minter, PeriodFilter, SystemMinter, regenerate_tax_records,
};
use crate::db::{LedgerRepository, RepositoryError};
use crate::models::{
    FilingStatusCode, IncomeRecord, LEDGER_SCHEMA_VERSION, LedgerSnapshot, NewIncomeRecord,
    TaxPaymentRecord, TaxProfile, next_amount_due, split_by_paid,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// No income or tax record has this id.
    #[error("no record with id {0}")]
    UnknownRecord(Uuid),

    /// No bracket table is stored for this year and filing status.
    #[error("no tax brackets stored for {tax_year} ({filing_status:?})")]
    NoBrackets {
        tax_year: i32,
        filing_status: FilingStatusCode,
    },

    #[error("stored tax brackets are invalid: {0}")]
    InvalidBrackets(#[from] BracketTableError),

    /// Income must be positive and at most [`MAX_AMOUNT`].
    #[error(
        "income amount {amount} must be greater than zero and at most {max}",
        max = MAX_AMOUNT
    )]
    InvalidAmount { amount: Decimal },

    /// A snapshot failed validation; nothing was imported.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Tax records split by payment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxOverview {
    pub unpaid: Vec<TaxPaymentRecord>,
    pub paid: Vec<TaxPaymentRecord>,
    /// Amount due on the newest unpaid record.
    pub next_amount_due: Decimal,
}

pub struct LedgerStore {
    repo: Box<dyn LedgerRepository>,
    minter: Arc<dyn Minter>,
}

impl LedgerStore {
    pub fn new(repo: Box<dyn LedgerRepository>, minter: Arc<dyn Minter>) -> Self {
        Self { repo, minter }
    }

    pub fn with_system_minter(repo: Box<dyn LedgerRepository>) -> Self {
        Self::new(repo, Arc::new(SystemMinter))
    }

    pub fn repository(&self) -> &dyn LedgerRepository {
        self.repo.as_ref()
    }

    // Profile

    pub async fn profile(&self) -> Result<TaxProfile, StoreError> {
        Ok(self.repo.load_profile().await?)
    }

    /// Saves `profile` and regenerates tax records with its rates.
    pub async fn update_profile(
        &self,
        mut profile: TaxProfile,
    ) -> Result<Vec<TaxPaymentRecord>, StoreError> {
        profile.default_tax_rate = clamp_rate(profile.default_tax_rate);
        profile.default_reserve_extra_rate = clamp_rate(profile.default_reserve_extra_rate);
        profile.reminder = profile.reminder.clamped();

        self.repo.save_profile(&profile).await?;
        info!(
            tax_rate = %profile.default_tax_rate,
            reserve_rate = %profile.default_reserve_extra_rate,
            "Profile updated"
        );
        self.regenerate().await
    }

    // Income

    /// Income in `filter` as seen from `today`, newest first.
    pub async fn income(
        &self,
        filter: PeriodFilter,
        today: NaiveDate,
    ) -> Result<Vec<IncomeRecord>, StoreError> {
        let records = self.repo.list_income_records().await?;
        Ok(records
            .into_iter()
            .filter(|r| filter.matches(r.date, today))
            .collect())
    }

    /// Total income (paid or not) in `filter` as seen from `today`.
    pub async fn gross_for(
        &self,
        filter: PeriodFilter,
        today: NaiveDate,
    ) -> Result<Decimal, StoreError> {
        Ok(self
            .income(filter, today)
            .await?
            .iter()
            .fold(Decimal::ZERO, |total, r| total.saturating_add(r.amount)))
    }

    /// # Errors
    ///
    /// [`StoreError::InvalidAmount`] unless `0 < amount <= MAX_AMOUNT`.
    pub async fn add_income(&self, new: NewIncomeRecord) -> Result<IncomeRecord, StoreError> {
        validate_amount(new.amount)?;
        let record = new.into_record(self.minter.next_id());

        self.repo.save_income_record(&record).await?;
        info!(
            id = %record.id,
            amount = %record.amount,
            client = %record.client_name,
            "Income added"
        );
        self.regenerate().await?;
        Ok(record)
    }

    /// Adds every record in one write and regenerates once.
    ///
    /// Amounts are checked before anything is written, so one bad record
    /// rejects the whole batch.
    pub async fn add_incomes(
        &self,
        batch: Vec<NewIncomeRecord>,
    ) -> Result<Vec<IncomeRecord>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        for new in &batch {
            validate_amount(new.amount)?;
        }
        let records: Vec<IncomeRecord> = batch
            .into_iter()
            .map(|new| new.into_record(self.minter.next_id()))
            .collect();

        self.repo.save_income_records(&records).await?;
        info!(count = records.len(), "Income batch added");
        self.regenerate().await?;
        Ok(records)
    }

    pub async fn toggle_income_paid(&self, id: Uuid) -> Result<IncomeRecord, StoreError> {
        let mut record = self
            .repo
            .get_income_record(id)
            .await
            .map_err(|e| not_found_as_unknown(e, id))?;
        record.is_paid = !record.is_paid;

        self.repo.save_income_record(&record).await?;
        info!(id = %id, is_paid = record.is_paid, "Income payment toggled");
        self.regenerate().await?;
        Ok(record)
    }

    pub async fn remove_income(&self, id: Uuid) -> Result<(), StoreError> {
        self.repo
            .delete_income_record(id)
            .await
            .map_err(|e| not_found_as_unknown(e, id))?;
        info!(id = %id, "Income removed");
        self.regenerate().await?;
        Ok(())
    }

    // Tax records

    pub async fn tax_records(&self) -> Result<Vec<TaxPaymentRecord>, StoreError> {
        Ok(self.repo.list_tax_records().await?)
    }

    pub async fn tax_overview(&self) -> Result<TaxOverview, StoreError> {
        let records = self.repo.list_tax_records().await?;
        let (unpaid, paid) = split_by_paid(&records);

        Ok(TaxOverview {
            unpaid: unpaid.into_iter().cloned().collect(),
            paid: paid.into_iter().cloned().collect(),
            next_amount_due: next_amount_due(&records),
        })
    }

    pub async fn mark_tax_paid(&self, id: Uuid) -> Result<TaxPaymentRecord, StoreError> {
        let mut record = self.find_tax_record(id).await?;
        record.mark_paid(self.minter.now());

        self.repo.update_tax_record(&record).await?;
        info!(id = %id, period = %record.period_label, "Tax record marked paid");
        Ok(record)
    }

    pub async fn toggle_tax_paid(&self, id: Uuid) -> Result<TaxPaymentRecord, StoreError> {
        let mut record = self.find_tax_record(id).await?;
        record.toggle_paid(self.minter.now());

        self.repo.update_tax_record(&record).await?;
        info!(id = %id, is_paid = record.is_paid, "Tax record payment toggled");
        Ok(record)
    }

    /// Removes a tax record. It reappears on the next regeneration while
    /// its month still has paid income.
    pub async fn remove_tax_record(&self, id: Uuid) -> Result<(), StoreError> {
        self.repo
            .delete_tax_record(id)
            .await
            .map_err(|e| not_found_as_unknown(e, id))?;
        info!(id = %id, "Tax record removed");
        Ok(())
    }

    /// Rebuilds and stores the monthly tax records.
    pub async fn regenerate(&self) -> Result<Vec<TaxPaymentRecord>, StoreError> {
        let profile = self.repo.load_profile().await?;
        let income = self.repo.list_income_records().await?;
        let existing = self.repo.list_tax_records().await?;

        let records =
            regenerate_tax_records(&income, &existing, &profile, self.minter.as_ref());
        self.repo.replace_tax_records(&records).await?;
        debug!(records = records.len(), "Stored regenerated tax records");
        Ok(records)
    }

    // Brackets

    /// Bracket table for `tax_year` and `filing_status`.
    ///
    /// Lookup order: the exact stored schedule, then the newest stored
    /// schedule of an earlier year for the same status, then the built-in
    /// 2023 table for single filers. Both fallbacks log a warning.
    pub async fn bracket_table(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<BracketTable, StoreError> {
        let brackets = self.repo.get_tax_brackets(tax_year, filing_status).await?;
        if !brackets.is_empty() {
            return Ok(BracketTable::new(brackets)?);
        }

        let earlier = self
            .repo
            .list_bracket_schedules()
            .await?
            .into_iter()
            .filter(|s| s.filing_status == filing_status && s.tax_year < tax_year)
            .max_by_key(|s| s.tax_year);
        if let Some(schedule) = earlier {
            warn!(
                tax_year,
                used_year = schedule.tax_year,
                status = filing_status.as_str(),
                "No brackets stored for year, using an earlier year"
            );
            return Ok(BracketTable::new(schedule.brackets)?);
        }

        if filing_status == FilingStatusCode::Single {
            if tax_year != 2023 {
                warn!(tax_year, "No brackets stored for year, using built-in 2023 table");
            }
            return Ok(BracketTable::us_single_2023());
        }
        Err(StoreError::NoBrackets {
            tax_year,
            filing_status,
        })
    }

    // Snapshots

    pub async fn export_snapshot(&self) -> Result<LedgerSnapshot, StoreError> {
        Ok(LedgerSnapshot {
            schema_version: LEDGER_SCHEMA_VERSION,
            profile: self.repo.load_profile().await?,
            income_records: self.repo.list_income_records().await?,
            tax_records: self.repo.list_tax_records().await?,
            bracket_schedules: self.repo.list_bracket_schedules().await?,
        })
    }

    /// Replaces the profile, income and tax records with the snapshot's
    /// contents, merges in its bracket schedules, then regenerates.
    ///
    /// The snapshot is checked in full before anything is written and the
    /// write itself is all or nothing.
    ///
    /// # Errors
    ///
    /// * [`RepositoryError::UnsupportedSchema`] when the snapshot was
    ///   written by a newer build.
    /// * [`StoreError::InvalidSnapshot`] or [`StoreError::InvalidBrackets`]
    ///   when its contents are inconsistent.
    pub async fn import_snapshot(&self, snapshot: LedgerSnapshot) -> Result<(), StoreError> {
        if !snapshot.is_supported() {
            return Err(RepositoryError::UnsupportedSchema {
                found: snapshot.schema_version,
                supported: LEDGER_SCHEMA_VERSION,
            }
            .into());
        }
        validate_snapshot(&snapshot)?;

        self.repo.replace_ledger(&snapshot).await?;
        self.regenerate().await?;
        info!(
            income = snapshot.income_records.len(),
            tax_records = snapshot.tax_records.len(),
            schedules = snapshot.bracket_schedules.len(),
            "Snapshot imported"
        );
        Ok(())
    }

    async fn find_tax_record(&self, id: Uuid) -> Result<TaxPaymentRecord, StoreError> {
        self.repo
            .list_tax_records()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::UnknownRecord(id))
    }
}

fn validate_amount(amount: Decimal) -> Result<(), StoreError> {
    if amount <= Decimal::ZERO || amount > MAX_AMOUNT {
        warn!(amount = %amount, "Income amount rejected");
        return Err(StoreError::InvalidAmount { amount });
    }
    Ok(())
}

fn within(value: Decimal, max: Decimal) -> bool {
    value >= Decimal::ZERO && value <= max
}

fn validate_snapshot(snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
    let profile = &snapshot.profile;
    if !within(profile.default_tax_rate, MAX_RATE)
        || !within(profile.default_reserve_extra_rate, MAX_RATE)
    {
        return Err(StoreError::InvalidSnapshot(format!(
            "profile rates must be between 0 and {}",
            MAX_RATE
        )));
    }

    if let Some(record) = snapshot
        .income_records
        .iter()
        .find(|r| !within(r.amount, MAX_AMOUNT))
    {
        return Err(StoreError::InvalidSnapshot(format!(
            "income {} has amount {} outside 0..={}",
            record.id, record.amount, MAX_AMOUNT
        )));
    }

    for record in &snapshot.tax_records {
        if !record.is_consistent() {
            return Err(StoreError::InvalidSnapshot(format!(
                "tax record {} has is_paid = {} but paid_at = {:?}",
                record.id, record.is_paid, record.paid_at
            )));
        }
        if !within(record.taxable_income, MAX_AMOUNT) || !within(record.amount_due, MAX_AMOUNT) {
            return Err(StoreError::InvalidSnapshot(format!(
                "tax record {} has amounts outside 0..={}",
                record.id, MAX_AMOUNT
            )));
        }
    }

    for schedule in &snapshot.bracket_schedules {
        BracketTable::new(schedule.brackets.clone())?;
    }
    Ok(())
}

fn not_found_as_unknown(error: RepositoryError, id: Uuid) -> StoreError {
    match error {
        RepositoryError::NotFound => StoreError::UnknownRecord(id),
        other => StoreError::Repository(other),
    }
}
