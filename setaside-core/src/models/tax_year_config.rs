use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-year constants for self-employment tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearConfig {
    pub tax_year: i32,
    pub ss_wage_max: Decimal,
    pub ss_tax_rate: Decimal,
    pub medicare_tax_rate: Decimal,
    pub net_earnings_factor: Decimal,
    pub additional_medicare_threshold: Decimal,
    pub additional_medicare_rate: Decimal,
    pub deduction_factor: Decimal,
    pub standard_deduction: Decimal,
}

impl TaxYearConfig {
    /// US figures for tax year 2023, single filer.
    pub fn us_2023() -> Self {
        Self {
            tax_year: 2023,
            ss_wage_max: Decimal::new(160_200, 0),
            ss_tax_rate: Decimal::new(124, 3),
            medicare_tax_rate: Decimal::new(29, 3),
            net_earnings_factor: Decimal::new(9235, 4),
            additional_medicare_threshold: Decimal::new(200_000, 0),
            additional_medicare_rate: Decimal::new(9, 3),
            deduction_factor: Decimal::new(50, 2),
            standard_deduction: Decimal::new(13_850, 0),
        }
    }
}
