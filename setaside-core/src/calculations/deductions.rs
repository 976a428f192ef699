//! Deduction estimates from a catalog of categories.
//!
//! Each [`DeductionCategory`] is either a flat amount or a percentage of
//! income with an optional cap. Categories never interact: the total is the
//! plain sum of each category's applicable amount.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use setaside_core::DeductionCategory;
//! use setaside_core::calculations::DeductionCatalog;
//!
//! let catalog = DeductionCatalog::new(vec![
//!     DeductionCategory::flat("Home office", dec!(1500)),
//!     DeductionCategory::percent("Retirement", dec!(0.20), Some(dec!(10000))),
//! ]);
//!
//! // 1,500 + min(80,000 × 20%, 10,000)
//! assert_eq!(catalog.total_for(dec!(80000)), dec!(11500));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::DeductionCategory;

/// One line of a deduction breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionLine {
    pub name: String,
    pub amount: Decimal,
}

/// A fixed list of deduction categories.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeductionCatalog {
    categories: Vec<DeductionCategory>,
}

impl DeductionCatalog {
    pub fn new(categories: Vec<DeductionCategory>) -> Self {
        Self { categories }
    }

    /// Common deductions for a US freelancer.
    ///
    /// | Category | Rule |
    /// |----------|------|
    /// | Home office (simplified) | flat 1,500 |
    /// | Retirement (SEP-IRA) | 20% of income, capped at 66,000 |
    /// | Equipment and software | 5% of income |
    /// | Health insurance | flat 6,000 |
    pub fn freelancer_default() -> Self {
        Self::new(vec![
            DeductionCategory::flat("Home office (simplified)", Decimal::from(1_500)),
            DeductionCategory::percent(
                "Retirement (SEP-IRA)",
                Decimal::new(20, 2),
                Some(Decimal::from(66_000)),
            ),
            DeductionCategory::percent("Equipment and software", Decimal::new(5, 2), None),
            DeductionCategory::flat("Health insurance", Decimal::from(6_000)),
        ])
    }

    pub fn categories(&self) -> &[DeductionCategory] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Sum of every category's applicable amount for `income`.
    pub fn total_for(
        &self,
        income: Decimal,
    ) -> Decimal {
        self.categories
            .iter()
            .map(|category| category.applicable_amount(income))
            .sum()
    }

    /// Per-category amounts for `income`, in catalog order.
    pub fn breakdown(
        &self,
        income: Decimal,
    ) -> Vec<DeductionLine> {
        self.categories
            .iter()
            .map(|category| DeductionLine {
                name: category.name.clone(),
                amount: category.applicable_amount(income),
            })
            .collect()
    }
}
