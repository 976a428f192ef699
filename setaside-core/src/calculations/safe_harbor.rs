//! Safe-harbor minimum for estimated tax payments.
//!
//! Paying the lesser of 90% of this year's tax or 100% of last year's tax
//! (110% when last year's AGI exceeded 150,000) avoids an underpayment
//! penalty.
//!
//! ```
//! use rust_decimal_macros::dec;
//! use setaside_core::calculations::SafeHarborRule;
//!
//! let rule = SafeHarborRule::new(dec!(90000), dec!(12000), dec!(20000));
//!
//! assert_eq!(rule.minimum_payment(), dec!(12000.00));
//! assert_eq!(rule.quarterly_minimum(), dec!(3000.00));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{non_negative, round_half_up};

const HIGH_INCOME_AGI: Decimal = Decimal::from_parts(150_000, 0, 0, false, 0);
const HIGH_INCOME_THRESHOLD: Decimal = Decimal::from_parts(110, 0, 0, false, 2);
const CURRENT_YEAR_SHARE: Decimal = Decimal::from_parts(90, 0, 0, false, 2);
const QUARTERS: Decimal = Decimal::from_parts(4, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeHarborRule {
    pub prior_year_agi: Decimal,
    pub prior_year_tax: Decimal,
    pub current_year_estimated_tax: Decimal,
}

impl SafeHarborRule {
    pub fn new(
        prior_year_agi: Decimal,
        prior_year_tax: Decimal,
        current_year_estimated_tax: Decimal,
    ) -> Self {
        Self {
            prior_year_agi: non_negative(prior_year_agi),
            prior_year_tax: non_negative(prior_year_tax),
            current_year_estimated_tax: non_negative(current_year_estimated_tax),
        }
    }

    /// Multiplier on prior-year tax: 1.10 above 150,000 AGI, else 1.00.
    pub fn threshold(&self) -> Decimal {
        if self.prior_year_agi > HIGH_INCOME_AGI {
            HIGH_INCOME_THRESHOLD
        } else {
            Decimal::ONE
        }
    }

    pub fn minimum_payment(&self) -> Decimal {
        let current = self.current_year_estimated_tax * CURRENT_YEAR_SHARE;
        let prior = self.prior_year_tax * self.threshold();
        round_half_up(current.min(prior))
    }

    pub fn quarterly_minimum(&self) -> Decimal {
        round_half_up(self.minimum_payment() / QUARTERS)
    }

    /// True when `paid_so_far` is behind the quarterly pace.
    pub fn penalty_risk(
        &self,
        paid_so_far: Decimal,
        quarters_elapsed: u32,
    ) -> bool {
        paid_so_far < self.quarterly_minimum() * Decimal::from(quarters_elapsed)
    }
}
