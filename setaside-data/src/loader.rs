use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use setaside_core::calculations::{BracketTable, BracketTableError};
use setaside_core::input::{ParseDecimalError, parse_decimal};
use setaside_core::{
    BracketSchedule, FilingStatusCode, IncomeRecord, LedgerRepository, LedgerStore,
    NewIncomeRecord, RepositoryError, StoreError, TaxBracket,
};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading CSV data into a ledger.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Brackets for {tax_year} schedule {schedule} are invalid: {source}")]
    InvalidBrackets {
        tax_year: i32,
        schedule: String,
        #[source]
        source: BracketTableError,
    },

    #[error("Row {row}: invalid amount")]
    InvalidAmount {
        row: usize,
        #[source]
        source: ParseDecimalError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<csv::Error> for LoaderError {
    fn from(err: csv::Error) -> Self {
        LoaderError::CsvParse(err.to_string())
    }
}

/// Maps IRS schedule codes to filing statuses.
///
/// - Schedule X → Single
/// - Schedule Y-1 → Married Filing Jointly and Qualifying Surviving Spouse
/// - Schedule Y-2 → Married Filing Separately
/// - Schedule Z → Head of Household
fn schedule_to_filing_statuses(schedule: &str) -> Result<Vec<FilingStatusCode>, LoaderError> {
    match schedule {
        "X" => Ok(vec![FilingStatusCode::Single]),
        "Y-1" => Ok(vec![
            FilingStatusCode::MarriedFilingJointly,
            FilingStatusCode::QualifyingSurvivingSpouse,
        ]),
        "Y-2" => Ok(vec![FilingStatusCode::MarriedFilingSeparately]),
        "Z" => Ok(vec![FilingStatusCode::HeadOfHousehold]),
        _ => Err(LoaderError::InvalidSchedule(schedule.to_string())),
    }
}

/// A single row from the tax brackets CSV file.
///
/// - `tax_year`: the tax year (e.g., 2023)
/// - `schedule`: the IRS schedule code (X, Y-1, Y-2, Z)
/// - `lower_bound`: start of the bracket
/// - `upper_bound`: end of the bracket (empty for the open top bracket)
/// - `rate`: the marginal rate as a decimal (e.g., 0.10 for 10%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub tax_year: i32,
    pub schedule: String,
    pub lower_bound: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for bracket schedules from CSV files.
///
/// Works against any [`LedgerRepository`]. Each (tax_year, schedule) group
/// replaces whatever schedule was stored for the matching filing statuses,
/// so loading the same file twice gives the same result.
pub struct BracketScheduleLoader;

impl BracketScheduleLoader {
    /// Parse bracket rows from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<BracketRecord>, LoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: BracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Group rows into validated schedules, one per filing status.
    ///
    /// Rows keep their file order within a group. Schedule Y-1 yields two
    /// schedules with identical brackets.
    pub fn schedules(records: &[BracketRecord]) -> Result<Vec<BracketSchedule>, LoaderError> {
        let mut groups: BTreeMap<(i32, &str), Vec<TaxBracket>> = BTreeMap::new();
        for record in records {
            groups
                .entry((record.tax_year, record.schedule.as_str()))
                .or_default()
                .push(TaxBracket::new(record.lower_bound, record.upper_bound, record.rate));
        }

        let mut schedules = Vec::new();
        for ((tax_year, schedule), brackets) in groups {
            let statuses = schedule_to_filing_statuses(schedule)?;
            BracketTable::new(brackets.clone()).map_err(|source| LoaderError::InvalidBrackets {
                tax_year,
                schedule: schedule.to_string(),
                source,
            })?;
            for filing_status in statuses {
                schedules.push(BracketSchedule {
                    tax_year,
                    filing_status,
                    brackets: brackets.clone(),
                });
            }
        }

        Ok(schedules)
    }

    /// Store every schedule found in `records`; returns the number of
    /// brackets written.
    ///
    /// Nothing is written if any group fails validation.
    pub async fn load(
        repo: &dyn LedgerRepository,
        records: &[BracketRecord],
    ) -> Result<usize, LoaderError> {
        let schedules = Self::schedules(records)?;
        let mut inserted = 0;

        for schedule in &schedules {
            repo.replace_tax_brackets(schedule).await?;
            debug!(
                tax_year = schedule.tax_year,
                filing_status = schedule.filing_status.as_str(),
                brackets = schedule.brackets.len(),
                "Bracket schedule replaced"
            );
            inserted += schedule.brackets.len();
        }

        info!(schedules = schedules.len(), brackets = inserted, "Bracket schedules loaded");
        Ok(inserted)
    }
}

/// A single row from an income CSV file.
///
/// `amount` accepts the same loose formats as interactive input
/// (`1,234.50`, `99,5`). `is_paid` and `note` may be omitted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IncomeCsvRecord {
    pub date: NaiveDate,
    pub client_name: String,
    pub amount: String,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub note: String,
}

/// Loader for income history exported from invoicing tools.
pub struct IncomeCsvLoader;

impl IncomeCsvLoader {
    /// Parse and validate income rows.
    ///
    /// Unlike interactive input, an unparseable amount is an error here;
    /// silently importing a zero would hide a broken file.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<NewIncomeRecord>, LoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for (index, result) in csv_reader.deserialize().enumerate() {
            let row: IncomeCsvRecord = result?;
            let amount = parse_decimal(&row.amount).map_err(|source| LoaderError::InvalidAmount {
                row: index + 1,
                source,
            })?;
            records.push(NewIncomeRecord {
                date: row.date,
                client_name: row.client_name.trim().to_string(),
                amount,
                is_paid: row.is_paid,
                note: row.note,
            });
        }

        Ok(records)
    }

    /// Add every record through the store in one batch; tax records are
    /// regenerated once at the end.
    pub async fn load(
        store: &LedgerStore,
        records: Vec<NewIncomeRecord>,
    ) -> Result<Vec<IncomeRecord>, LoaderError> {
        let added = store.add_incomes(records).await?;
        info!(records = added.len(), "Income imported");
        Ok(added)
    }
}
