//! Flat-rate set-aside estimate.
//!
//! | Line | Description |
//! |------|-------------|
//! | 1    | Taxable income: max(0, gross − deductions) |
//! | 2    | Estimated tax: line 1 × tax rate |
//! | 3    | Reserve extra: line 1 × extra reserve rate |
//! | 4    | Total set-aside: line 2 + line 3 |
//!
//! Amounts are clamped into `[0, MAX_AMOUNT]` and rates into `[0, MAX_RATE]`.
//! No intermediate rounding is applied; callers round for display.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use setaside_core::calculations::estimate;
//!
//! let result = estimate(dec!(5000), dec!(1000), dec!(0.25), dec!(0.03));
//!
//! assert_eq!(result.taxable_income, dec!(4000));
//! assert_eq!(result.estimated_tax, dec!(1000));
//! assert_eq!(result.reserve_extra, dec!(120));
//! assert_eq!(result.total_set_aside, dec!(1120));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::common::{
    MAX_AMOUNT, MAX_RATE, clamp_amount, clamp_rate, non_negative,
};

/// Result of [`estimate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxResult {
    pub taxable_income: Decimal,
    pub estimated_tax: Decimal,
    pub reserve_extra: Decimal,
    /// `estimated_tax + reserve_extra`.
    pub total_set_aside: Decimal,
}

/// Estimates how much of `gross_income` to set aside.
pub fn estimate(
    gross_income: Decimal,
    deductions: Decimal,
    tax_rate: Decimal,
    extra_reserve_rate: Decimal,
) -> TaxResult {
    if gross_income < Decimal::ZERO || deductions < Decimal::ZERO {
        warn!(
            gross_income = %gross_income,
            deductions = %deductions,
            "Negative amount passed to estimate; clamping to zero"
        );
    }

    if gross_income > MAX_AMOUNT || tax_rate > MAX_RATE || extra_reserve_rate > MAX_RATE {
        warn!(
            gross_income = %gross_income,
            tax_rate = %tax_rate,
            extra_reserve_rate = %extra_reserve_rate,
            "Input above calculator limits; clamping"
        );
    }

    let gross_income = clamp_amount(gross_income);
    let deductions = clamp_amount(deductions);
    let tax_rate = clamp_rate(tax_rate);
    let extra_reserve_rate = clamp_rate(extra_reserve_rate);

    let taxable_income = non_negative(gross_income - deductions);
    let estimated_tax = taxable_income * tax_rate;
    let reserve_extra = taxable_income * extra_reserve_rate;

    TaxResult {
        taxable_income,
        estimated_tax,
        reserve_extra,
        total_set_aside: estimated_tax + reserve_extra,
    }
}
