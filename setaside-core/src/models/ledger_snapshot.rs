use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    BracketSchedule, FilingStatusCode, IncomeRecord, TaxBracket, TaxPaymentRecord, TaxProfile,
};

/// Schema version written by this build.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// Everything the store persists, as one versioned document.
///
/// Income is kept newest date first and tax records newest period first,
/// matching what the repositories return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub schema_version: u32,
    pub profile: TaxProfile,
    #[serde(default)]
    pub income_records: Vec<IncomeRecord>,
    #[serde(default)]
    pub tax_records: Vec<TaxPaymentRecord>,
    #[serde(default)]
    pub bracket_schedules: Vec<BracketSchedule>,
}

impl LedgerSnapshot {
    pub fn is_supported(&self) -> bool {
        self.schema_version <= LEDGER_SCHEMA_VERSION
    }

    /// Restores the canonical ordering of every collection.
    pub fn normalize(&mut self) {
        self.income_records
            .sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        self.tax_records
            .sort_by(|a, b| b.period_start.cmp(&a.period_start).then_with(|| a.id.cmp(&b.id)));
        self.bracket_schedules
            .sort_by_key(|s| (s.tax_year, s.filing_status));
    }

    pub fn income_record(&self, id: Uuid) -> Option<&IncomeRecord> {
        self.income_records.iter().find(|r| r.id == id)
    }

    /// Inserts `record` or replaces the record with the same id.
    pub fn upsert_income_record(&mut self, record: IncomeRecord) {
        match self.income_records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.income_records.push(record),
        }
        self.normalize();
    }

    /// Returns false when no record had `id`.
    pub fn remove_income_record(&mut self, id: Uuid) -> bool {
        let before = self.income_records.len();
        self.income_records.retain(|r| r.id != id);
        self.income_records.len() != before
    }

    /// Replaces the stored record with the same id; false when absent.
    pub fn update_tax_record(&mut self, record: TaxPaymentRecord) -> bool {
        match self.tax_records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record;
                self.normalize();
                true
            }
            None => false,
        }
    }

    pub fn remove_tax_record(&mut self, id: Uuid) -> bool {
        let before = self.tax_records.len();
        self.tax_records.retain(|r| r.id != id);
        self.tax_records.len() != before
    }

    pub fn brackets_for(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Vec<TaxBracket> {
        self.bracket_schedules
            .iter()
            .find(|s| s.tax_year == tax_year && s.filing_status == filing_status)
            .map(|s| s.brackets.clone())
            .unwrap_or_default()
    }

    /// Replaces the schedule for the same year and filing status.
    pub fn replace_bracket_schedule(&mut self, schedule: BracketSchedule) {
        self.bracket_schedules.retain(|s| {
            !(s.tax_year == schedule.tax_year && s.filing_status == schedule.filing_status)
        });
        self.bracket_schedules.push(schedule);
        self.normalize();
    }

    /// Takes profile, income and tax records from `incoming` and merges its
    /// bracket schedules over the stored ones.
    pub fn replace_with(&mut self, incoming: &LedgerSnapshot) {
        self.profile = incoming.profile.clone();
        self.income_records = incoming.income_records.clone();
        self.tax_records = incoming.tax_records.clone();
        for schedule in &incoming.bracket_schedules {
            self.bracket_schedules.retain(|s| {
                !(s.tax_year == schedule.tax_year && s.filing_status == schedule.filing_status)
            });
            self.bracket_schedules.push(schedule.clone());
        }
        self.normalize();
    }
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            profile: TaxProfile::default(),
            income_records: Vec::new(),
            tax_records: Vec::new(),
            bracket_schedules: Vec::new(),
        }
    }
}
