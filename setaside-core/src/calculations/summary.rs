//! Year-level advisory numbers built from the primitive calculators.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Deductions from the catalog |
//! | 2    | Net earnings: max(0, gross − deductions) |
//! | 3    | Self-employment tax on net earnings |
//! | 4    | AGI: max(0, net − deductible half of SE tax) |
//! | 5    | Taxable income: max(0, AGI − standard deduction) |
//! | 6    | Federal income tax from the bracket table |
//! | 7    | Total tax: federal + SE |
//! | 8    | Safe-harbor minimum and quarterly installment |

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{clamp_amount, non_negative, ratio_or_zero, round_half_up};
use crate::calculations::{
    BracketTable, DeductionCatalog, PenaltyEstimator, SafeHarborRule, SelfEmploymentConfig,
    SelfEmploymentConfigError, SelfEmploymentTaxCalculator, SelfEmploymentTaxResult,
};
use crate::{IncomeRecord, TaxYearConfig};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const QUARTERS_PER_YEAR: u32 = 4;

/// Paid income so far this year, scaled to a full year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeProjection {
    pub ytd_income: Decimal,
    pub months_elapsed: u32,
    pub projected_annual_income: Decimal,
}

impl IncomeProjection {
    /// `ytd / months × 12`; with no months elapsed the projection is `ytd`.
    pub fn new(
        ytd_income: Decimal,
        months_elapsed: u32,
    ) -> Self {
        let ytd_income = clamp_amount(ytd_income);
        let projected_annual_income = if months_elapsed == 0 {
            ytd_income
        } else {
            round_half_up(ytd_income / Decimal::from(months_elapsed) * MONTHS_PER_YEAR)
        };

        Self {
            ytd_income,
            months_elapsed,
            projected_annual_income,
        }
    }

    /// Paid income dated from January 1 through `as_of`, counting the
    /// current month as elapsed.
    pub fn from_income(
        income: &[IncomeRecord],
        as_of: NaiveDate,
    ) -> Self {
        let ytd_income = income
            .iter()
            .filter(|r| r.is_paid && r.date.year() == as_of.year() && r.date <= as_of)
            .fold(Decimal::ZERO, |total, r| total.saturating_add(r.amount));

        Self::new(ytd_income, as_of.month())
    }
}

/// Last year's figures used for the safe-harbor minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorYear {
    pub agi: Decimal,
    pub tax: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearSummary {
    pub tax_year: i32,
    pub gross_income: Decimal,
    pub deductions: Decimal,
    pub net_earnings: Decimal,
    pub self_employment: SelfEmploymentTaxResult,
    pub adjusted_gross_income: Decimal,
    pub taxable_income: Decimal,
    pub federal_income_tax: Decimal,
    pub total_tax: Decimal,
    /// Total tax over gross income, four decimal places.
    pub effective_rate: Decimal,
    pub safe_harbor_minimum: Decimal,
    pub quarterly_installment: Decimal,
}

/// Produces a [`TaxYearSummary`] from gross income.
#[derive(Debug, Clone)]
pub struct TaxYearSummaryCalculator {
    config: TaxYearConfig,
    brackets: BracketTable,
    deductions: DeductionCatalog,
    self_employment: SelfEmploymentTaxCalculator,
}

impl TaxYearSummaryCalculator {
    /// # Errors
    ///
    /// Returns [`SelfEmploymentConfigError`] if `config` holds invalid rates.
    pub fn new(
        config: TaxYearConfig,
        brackets: BracketTable,
        deductions: DeductionCatalog,
    ) -> Result<Self, SelfEmploymentConfigError> {
        let self_employment =
            SelfEmploymentTaxCalculator::new(SelfEmploymentConfig::from_tax_year_config(&config))?;

        Ok(Self {
            config,
            brackets,
            deductions,
            self_employment,
        })
    }

    /// Summarizes `gross_income`.
    ///
    /// Without `prior_year`, this year's own figures stand in for last
    /// year's, so the minimum falls to 90% of this year's tax.
    pub fn summarize(
        &self,
        gross_income: Decimal,
        prior_year: Option<PriorYear>,
    ) -> TaxYearSummary {
        let gross_income = clamp_amount(gross_income);
        let deductions = round_half_up(self.deductions.total_for(gross_income));
        let net_earnings = non_negative(gross_income - deductions);
        let self_employment = self.self_employment.compute(net_earnings);
        let adjusted_gross_income = non_negative(net_earnings - self_employment.deductible_half);
        let taxable_income =
            non_negative(adjusted_gross_income - self.config.standard_deduction);
        let federal_income_tax = self.brackets.tax_for(taxable_income);
        let total_tax = federal_income_tax + self_employment.total;
        let effective_rate = ratio_or_zero(total_tax, gross_income).round_dp(4);

        let prior = prior_year.unwrap_or(PriorYear {
            agi: adjusted_gross_income,
            tax: total_tax,
        });
        let safe_harbor = SafeHarborRule::new(
            clamp_amount(prior.agi),
            clamp_amount(prior.tax),
            total_tax,
        );

        TaxYearSummary {
            tax_year: self.config.tax_year,
            gross_income,
            deductions,
            net_earnings,
            self_employment,
            adjusted_gross_income,
            taxable_income,
            federal_income_tax,
            total_tax,
            effective_rate,
            safe_harbor_minimum: safe_harbor.minimum_payment(),
            quarterly_installment: safe_harbor.quarterly_minimum(),
        }
    }
}

/// How far behind the safe-harbor pace the user is, and what to pay next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithholdingAdjustment {
    pub required_payment: Decimal,
    pub paid_so_far: Decimal,
    pub quarters_elapsed: u32,
    pub shortfall: Decimal,
    pub penalty_risk: bool,
    pub estimated_penalty: Decimal,
    pub remaining_balance: Decimal,
    pub recommended_per_quarter: Decimal,
}

impl WithholdingAdjustment {
    pub fn compute(
        required_payment: Decimal,
        paid_so_far: Decimal,
        quarters_elapsed: u32,
        days_late: i64,
        estimator: &PenaltyEstimator,
    ) -> Self {
        let required_payment = clamp_amount(required_payment);
        let paid_so_far = clamp_amount(paid_so_far);
        let quarters_elapsed = quarters_elapsed.min(QUARTERS_PER_YEAR);

        let quarterly = round_half_up(required_payment / Decimal::from(QUARTERS_PER_YEAR));
        let required_to_date = quarterly * Decimal::from(quarters_elapsed);
        let shortfall = non_negative(required_to_date - paid_so_far);
        let estimated_penalty = estimator.estimate_penalty(shortfall, days_late);

        let remaining_balance = non_negative(required_payment - paid_so_far);
        let remaining_quarters = QUARTERS_PER_YEAR - quarters_elapsed;
        let recommended_per_quarter = if remaining_quarters == 0 {
            remaining_balance
        } else {
            round_half_up(remaining_balance / Decimal::from(remaining_quarters))
        };

        Self {
            required_payment,
            paid_so_far,
            quarters_elapsed,
            shortfall,
            penalty_risk: paid_so_far < required_to_date,
            estimated_penalty,
            remaining_balance,
            recommended_per_quarter,
        }
    }

    /// Uses the summary's safe-harbor minimum as the required payment.
    pub fn for_summary(
        summary: &TaxYearSummary,
        paid_so_far: Decimal,
        quarters_elapsed: u32,
        days_late: i64,
        estimator: &PenaltyEstimator,
    ) -> Self {
        Self::compute(
            summary.safe_harbor_minimum,
            paid_so_far,
            quarters_elapsed,
            days_late,
            estimator,
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn paid(on: NaiveDate, amount: Decimal) -> IncomeRecord {
        IncomeRecord {
            id: Uuid::new_v4(),
            date: on,
            client_name: "Acme".to_string(),
            amount,
            is_paid: true,
            note: String::new(),
        }
    }

    fn calculator(deductions: DeductionCatalog) -> TaxYearSummaryCalculator {
        TaxYearSummaryCalculator::new(
            TaxYearConfig::us_2023(),
            BracketTable::us_single_2023(),
            deductions,
        )
        .unwrap()
    }

    // =========================================================================
    // IncomeProjection tests
    // =========================================================================

    #[test]
    fn projection_scales_to_twelve_months() {
        let projection = IncomeProjection::new(dec!(30000), 3);

        assert_eq!(projection.projected_annual_income, dec!(120000));
    }

    #[test]
    fn projection_with_no_months_is_ytd() {
        let projection = IncomeProjection::new(dec!(1234.56), 0);

        assert_eq!(projection.projected_annual_income, dec!(1234.56));
    }

    #[test]
    fn projection_from_income_counts_paid_ytd_only() {
        let mut unpaid = paid(date(2024, 2, 1), dec!(9999));
        unpaid.is_paid = false;
        let income = vec![
            paid(date(2023, 12, 31), dec!(5000)),
            paid(date(2024, 1, 15), dec!(2000)),
            paid(date(2024, 2, 10), dec!(1000)),
            paid(date(2024, 2, 20), dec!(7000)),
            unpaid,
        ];

        let projection = IncomeProjection::from_income(&income, date(2024, 2, 15));

        assert_eq!(projection.ytd_income, dec!(3000));
        assert_eq!(projection.months_elapsed, 2);
        assert_eq!(projection.projected_annual_income, dec!(18000));
    }

    // =========================================================================
    // TaxYearSummaryCalculator tests
    // =========================================================================

    #[test]
    fn summarize_hundred_thousand_without_deductions() {
        let summary = calculator(DeductionCatalog::default()).summarize(dec!(100000), None);

        assert_eq!(summary.net_earnings, dec!(100000));
        assert_eq!(summary.self_employment.total, dec!(14129.55));
        // 100,000 − 7,064.78
        assert_eq!(summary.adjusted_gross_income, dec!(92935.22));
        // 92,935.22 − 13,850
        assert_eq!(summary.taxable_income, dec!(79085.22));
        // 1,100 + 4,047 + 34,360.22 × 22%
        assert_eq!(summary.federal_income_tax, dec!(12706.25));
        assert_eq!(summary.total_tax, dec!(26835.80));
        assert_eq!(summary.effective_rate, dec!(0.2684));
        // 26,835.80 × 90%
        assert_eq!(summary.safe_harbor_minimum, dec!(24152.22));
        assert_eq!(summary.quarterly_installment, dec!(6038.06));
    }

    #[test]
    fn summarize_uses_prior_year_when_lower() {
        let prior = PriorYear {
            agi: dec!(80000),
            tax: dec!(10000),
        };

        let summary = calculator(DeductionCatalog::default()).summarize(dec!(100000), Some(prior));

        assert_eq!(summary.safe_harbor_minimum, dec!(10000));
        assert_eq!(summary.quarterly_installment, dec!(2500));
    }

    #[test]
    fn summarize_applies_catalog_deductions() {
        let catalog =
            DeductionCatalog::new(vec![crate::DeductionCategory::flat("Office", dec!(10000))]);

        let summary = calculator(catalog).summarize(dec!(60000), None);

        assert_eq!(summary.deductions, dec!(10000));
        assert_eq!(summary.net_earnings, dec!(50000));
    }

    #[test]
    fn summarize_zero_income_is_all_zero() {
        let summary = calculator(DeductionCatalog::freelancer_default()).summarize(dec!(0), None);

        assert_eq!(summary.total_tax, dec!(0));
        assert_eq!(summary.effective_rate, dec!(0));
        assert_eq!(summary.quarterly_installment, dec!(0));
    }

    #[test]
    fn summarize_caps_oversized_income() {
        let capped = calculator(DeductionCatalog::freelancer_default())
            .summarize(crate::calculations::common::MAX_AMOUNT, None);

        let summary =
            calculator(DeductionCatalog::freelancer_default()).summarize(Decimal::MAX, None);

        assert_eq!(summary, capped);
    }

    #[test]
    fn projection_from_income_saturates_instead_of_overflowing() {
        let income = vec![
            paid(date(2024, 1, 5), Decimal::MAX),
            paid(date(2024, 1, 6), Decimal::MAX),
        ];

        let projection = IncomeProjection::from_income(&income, date(2024, 1, 31));

        assert_eq!(projection.ytd_income, crate::calculations::common::MAX_AMOUNT);
    }

    #[test]
    fn summarize_below_standard_deduction_owes_only_se_tax() {
        let summary = calculator(DeductionCatalog::default()).summarize(dec!(10000), None);

        assert_eq!(summary.taxable_income, dec!(0));
        assert_eq!(summary.federal_income_tax, dec!(0));
        assert_eq!(summary.total_tax, summary.self_employment.total);
    }

    // =========================================================================
    // WithholdingAdjustment tests
    // =========================================================================

    #[test]
    fn adjustment_behind_pace() {
        let adjustment = WithholdingAdjustment::compute(
            dec!(24152.22),
            dec!(5000),
            2,
            30,
            &PenaltyEstimator::default(),
        );

        // 6,038.06 × 2 − 5,000
        assert_eq!(adjustment.shortfall, dec!(7076.12));
        assert!(adjustment.penalty_risk);
        assert_eq!(adjustment.estimated_penalty, dec!(46.53));
        assert_eq!(adjustment.remaining_balance, dec!(19152.22));
        assert_eq!(adjustment.recommended_per_quarter, dec!(9576.11));
    }

    #[test]
    fn adjustment_on_pace_has_no_penalty() {
        let adjustment = WithholdingAdjustment::compute(
            dec!(8000),
            dec!(4000),
            2,
            30,
            &PenaltyEstimator::default(),
        );

        assert_eq!(adjustment.shortfall, dec!(0));
        assert!(!adjustment.penalty_risk);
        assert_eq!(adjustment.estimated_penalty, dec!(0));
        assert_eq!(adjustment.recommended_per_quarter, dec!(2000));
    }

    #[test]
    fn adjustment_after_final_quarter_recommends_full_balance() {
        let adjustment = WithholdingAdjustment::compute(
            dec!(8000),
            dec!(5000),
            4,
            0,
            &PenaltyEstimator::default(),
        );

        assert_eq!(adjustment.remaining_balance, dec!(3000));
        assert_eq!(adjustment.recommended_per_quarter, dec!(3000));
    }

    #[test]
    fn adjustment_for_summary_uses_safe_harbor_minimum() {
        let summary = calculator(DeductionCatalog::default()).summarize(dec!(100000), None);

        let adjustment = WithholdingAdjustment::for_summary(
            &summary,
            dec!(0),
            0,
            0,
            &PenaltyEstimator::default(),
        );

        assert_eq!(adjustment.required_payment, summary.safe_harbor_minimum);
        assert_eq!(adjustment.recommended_per_quarter, dec!(6038.06));
    }
}
