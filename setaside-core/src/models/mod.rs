mod deduction_category;
mod filing_status;
mod income_record;
mod ledger_snapshot;
mod tax_bracket;
mod tax_payment_record;
mod tax_profile;
mod tax_year_config;

pub use deduction_category::DeductionCategory;
pub use filing_status::FilingStatusCode;
pub use income_record::{IncomeRecord, NewIncomeRecord};
pub use ledger_snapshot::{LEDGER_SCHEMA_VERSION, LedgerSnapshot};
pub use tax_bracket::{BracketSchedule, TaxBracket};
pub use tax_payment_record::{TaxPaymentRecord, next_amount_due, split_by_paid};
pub use tax_profile::{ReminderSettings, TaxProfile, TaxationMode};
pub use tax_year_config::TaxYearConfig;
