//! Set-aside and advisory tax calculations.
//!
//! Everything here is synchronous and pure. The only fallible constructors
//! are [`BracketTable::new`] and [`SelfEmploymentTaxCalculator::new`], which
//! reject malformed configuration.

mod brackets;
pub mod common;
mod deductions;
mod estimate;
mod penalty;
mod period;
pub mod regenerate;
mod safe_harbor;
mod schedule;
mod self_employment;
mod summary;

pub use brackets::{BracketTable, BracketTableError};
pub use deductions::{DeductionCatalog, DeductionLine};
pub use estimate::{TaxResult, estimate};
pub use penalty::{ANNUALIZATION_FACTORS, PenaltyEstimator};
pub use period::{PaymentFilter, PeriodFilter};
pub use regenerate::{Minter, SequentialMinter, SystemMinter, regenerate_tax_records};
pub use safe_harbor::SafeHarborRule;
pub use schedule::{DueDate, MonthlyReminder, PaymentSchedule};
pub use self_employment::{
    SelfEmploymentConfig, SelfEmploymentConfigError, SelfEmploymentTaxCalculator,
    SelfEmploymentTaxResult,
};
pub use summary::{
    IncomeProjection, PriorYear, TaxYearSummary, TaxYearSummaryCalculator, WithholdingAdjustment,
};
