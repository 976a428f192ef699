use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::FilingStatusCode;

/// A contiguous income range taxed at a single marginal rate.
///
/// `upper_bound` is `None` for the top bracket, which extends to infinity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn new(lower_bound: Decimal, upper_bound: Option<Decimal>, rate: Decimal) -> Self {
        Self {
            lower_bound,
            upper_bound,
            rate,
        }
    }
}

/// The full bracket table for one tax year and filing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSchedule {
    pub tax_year: i32,
    pub filing_status: FilingStatusCode,
    pub brackets: Vec<TaxBracket>,
}
