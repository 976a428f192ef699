use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One deductible expense category.
///
/// Percent-based categories scale with income and are optionally capped by
/// `max_amount`; flat categories contribute `max_amount` (or nothing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionCategory {
    pub name: String,
    pub max_amount: Option<Decimal>,
    pub is_percent_based: bool,
    pub percent_of_income: Decimal,
}

impl DeductionCategory {
    pub fn flat(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            max_amount: Some(amount),
            is_percent_based: false,
            percent_of_income: Decimal::ZERO,
        }
    }

    pub fn percent(
        name: impl Into<String>,
        percent_of_income: Decimal,
        cap: Option<Decimal>,
    ) -> Self {
        Self {
            name: name.into(),
            max_amount: cap,
            is_percent_based: true,
            percent_of_income,
        }
    }

    /// Amount this category contributes for `income`.
    pub fn applicable_amount(&self, income: Decimal) -> Decimal {
        if self.is_percent_based {
            let scaled = income.max(Decimal::ZERO) * self.percent_of_income;
            match self.max_amount {
                Some(cap) => scaled.min(cap),
                None => scaled,
            }
        } else {
            self.max_amount.unwrap_or(Decimal::ZERO)
        }
    }
}
