//! Underpayment penalty estimates.

use rust_decimal::Decimal;
use tracing::warn;

use crate::calculations::BracketTable;
use crate::calculations::common::{clamp_amount, clamp_rate, round_half_up};

/// Annualization factors for cumulative income through Q1..Q4.
pub const ANNUALIZATION_FACTORS: [Decimal; 4] = [
    Decimal::from_parts(4, 0, 0, false, 0),
    Decimal::from_parts(24, 0, 0, false, 1),
    Decimal::from_parts(15, 0, 0, false, 1),
    Decimal::from_parts(1, 0, 0, false, 0),
];

/// Delays beyond a century are priced as a century.
const MAX_DAYS_LATE: i64 = 36_500;

const DAYS_PER_YEAR: Decimal = Decimal::from_parts(365, 0, 0, false, 0);

/// Interest-style penalty on late estimated payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyEstimator {
    annual_rate: Decimal,
}

impl PenaltyEstimator {
    pub fn new(annual_rate: Decimal) -> Self {
        Self {
            annual_rate: clamp_rate(annual_rate),
        }
    }

    pub fn annual_rate(&self) -> Decimal {
        self.annual_rate
    }

    /// `shortfall × annual_rate × days_late / 365`, rounded to cents.
    ///
    /// Zero when either the shortfall or the delay is not positive.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use setaside_core::calculations::PenaltyEstimator;
    ///
    /// let estimator = PenaltyEstimator::default();
    ///
    /// assert_eq!(estimator.estimate_penalty(dec!(1000), 30), dec!(6.58));
    /// assert_eq!(estimator.estimate_penalty(dec!(1000), 0), dec!(0));
    /// ```
    pub fn estimate_penalty(
        &self,
        shortfall: Decimal,
        days_late: i64,
    ) -> Decimal {
        if shortfall <= Decimal::ZERO || days_late <= 0 {
            return Decimal::ZERO;
        }
        let days = Decimal::from(days_late.min(MAX_DAYS_LATE));
        round_half_up(clamp_amount(shortfall) * self.annual_rate * days / DAYS_PER_YEAR)
    }

    /// Required tax per quarter under the annualized income method.
    ///
    /// Each quarter's income is scaled to a full year, taxed with `table`,
    /// then scaled back down by the same factor. Quarters beyond the fourth
    /// are ignored.
    pub fn annualized_income_method(
        &self,
        table: &BracketTable,
        income_by_quarter: &[Decimal],
    ) -> Vec<Decimal> {
        if income_by_quarter.len() > ANNUALIZATION_FACTORS.len() {
            warn!(
                quarters = income_by_quarter.len(),
                "More than four quarters supplied; extra quarters ignored"
            );
        }

        income_by_quarter
            .iter()
            .zip(ANNUALIZATION_FACTORS)
            .map(|(&income, factor)| {
                let annualized = clamp_amount(income) * factor;
                round_half_up(table.tax_for(annualized) / factor)
            })
            .collect()
    }
}

impl Default for PenaltyEstimator {
    /// 8% annual rate.
    fn default() -> Self {
        Self::new(Decimal::new(8, 2))
    }
}
