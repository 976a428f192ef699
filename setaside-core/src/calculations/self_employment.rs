//! Self-employment tax: Social Security plus Medicare on net earnings.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Adjusted earnings: net earnings × 92.35% |
//! | 2    | Social Security: min(adjusted, wage cap) × 12.4% |
//! | 3    | Medicare: adjusted × 2.9% |
//! | 4    | Additional Medicare: (adjusted − 200,000) × 0.9% above the threshold |
//! | 5    | Total: Social Security + Medicare (including step 4) |
//! | 6    | Deductible half: total × 50% |
//!
//! Every step rounds half-up to cents.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use setaside_core::TaxYearConfig;
//! use setaside_core::calculations::{SelfEmploymentConfig, SelfEmploymentTaxCalculator};
//!
//! let config = SelfEmploymentConfig::from_tax_year_config(&TaxYearConfig::us_2023());
//! let calculator = SelfEmploymentTaxCalculator::new(config).unwrap();
//!
//! let result = calculator.compute(dec!(100000.00));
//!
//! assert_eq!(result.total, dec!(14129.55));
//! assert_eq!(result.deductible_half, dec!(7064.78));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::TaxYearConfig;
use crate::calculations::common::round_half_up;

/// Errors raised by an invalid [`SelfEmploymentConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelfEmploymentConfigError {
    /// The net earnings factor must be in (0, 1].
    #[error("net earnings factor must be between 0 and 1, got {0}")]
    InvalidNetEarningsFactor(Decimal),

    /// A tax rate or the deduction factor is outside [0, 1].
    #[error("{name} must be between 0 and 1, got {value}")]
    InvalidRate { name: &'static str, value: Decimal },

    /// The Social Security wage cap must be positive.
    #[error("social security wage cap must be positive, got {0}")]
    InvalidWageCap(Decimal),

    /// The additional Medicare threshold must be non-negative.
    #[error("additional medicare threshold must be non-negative, got {0}")]
    InvalidThreshold(Decimal),
}

/// Rates and limits for one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfEmploymentConfig {
    /// Maximum adjusted earnings subject to Social Security tax.
    pub wage_cap: Decimal,

    /// Combined employer + employee Social Security rate, typically 12.4%.
    pub ss_tax_rate: Decimal,

    /// Combined employer + employee Medicare rate, typically 2.9%.
    pub medicare_tax_rate: Decimal,

    /// Share of net earnings subject to SE tax, typically 92.35%.
    pub net_earnings_factor: Decimal,

    /// Adjusted earnings above which the Medicare surtax applies.
    pub additional_medicare_threshold: Decimal,

    /// Medicare surtax rate, typically 0.9%.
    pub additional_medicare_rate: Decimal,

    /// Deductible share of the total, typically 50%.
    pub deduction_factor: Decimal,
}

impl SelfEmploymentConfig {
    pub fn from_tax_year_config(config: &TaxYearConfig) -> Self {
        Self {
            wage_cap: config.ss_wage_max,
            ss_tax_rate: config.ss_tax_rate,
            medicare_tax_rate: config.medicare_tax_rate,
            net_earnings_factor: config.net_earnings_factor,
            additional_medicare_threshold: config.additional_medicare_threshold,
            additional_medicare_rate: config.additional_medicare_rate,
            deduction_factor: config.deduction_factor,
        }
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns the first [`SelfEmploymentConfigError`] found.
    pub fn validate(&self) -> Result<(), SelfEmploymentConfigError> {
        if self.net_earnings_factor <= Decimal::ZERO || self.net_earnings_factor > Decimal::ONE {
            return Err(SelfEmploymentConfigError::InvalidNetEarningsFactor(
                self.net_earnings_factor,
            ));
        }
        let rates = [
            ("social security tax rate", self.ss_tax_rate),
            ("medicare tax rate", self.medicare_tax_rate),
            ("additional medicare rate", self.additional_medicare_rate),
            ("deduction factor", self.deduction_factor),
        ];
        for (name, value) in rates {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(SelfEmploymentConfigError::InvalidRate { name, value });
            }
        }
        if self.wage_cap <= Decimal::ZERO {
            return Err(SelfEmploymentConfigError::InvalidWageCap(self.wage_cap));
        }
        if self.additional_medicare_threshold < Decimal::ZERO {
            return Err(SelfEmploymentConfigError::InvalidThreshold(
                self.additional_medicare_threshold,
            ));
        }
        Ok(())
    }
}

impl Default for SelfEmploymentConfig {
    fn default() -> Self {
        Self::from_tax_year_config(&TaxYearConfig::us_2023())
    }
}

/// Self-employment tax breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfEmploymentTaxResult {
    /// Net earnings × net earnings factor.
    pub adjusted_earnings: Decimal,

    /// Social Security share, capped at the wage base.
    pub social_security_tax: Decimal,

    /// Medicare share, including the additional Medicare surtax.
    pub medicare_tax: Decimal,

    /// The surtax portion of `medicare_tax`.
    pub additional_medicare_tax: Decimal,

    /// `social_security_tax + medicare_tax`.
    pub total: Decimal,

    /// Portion of `total` deductible from income.
    pub deductible_half: Decimal,
}

impl SelfEmploymentTaxResult {
    fn zero() -> Self {
        Self {
            adjusted_earnings: Decimal::ZERO,
            social_security_tax: Decimal::ZERO,
            medicare_tax: Decimal::ZERO,
            additional_medicare_tax: Decimal::ZERO,
            total: Decimal::ZERO,
            deductible_half: Decimal::ZERO,
        }
    }
}

/// Computes self-employment tax from net earnings.
#[derive(Debug, Clone)]
pub struct SelfEmploymentTaxCalculator {
    config: SelfEmploymentConfig,
}

impl SelfEmploymentTaxCalculator {
    /// # Errors
    ///
    /// Returns [`SelfEmploymentConfigError`] if the configuration is invalid.
    pub fn new(config: SelfEmploymentConfig) -> Result<Self, SelfEmploymentConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SelfEmploymentConfig {
        &self.config
    }

    /// Computes the full breakdown for `net_earnings`.
    ///
    /// Zero or negative earnings produce an all-zero result.
    pub fn compute(
        &self,
        net_earnings: Decimal,
    ) -> SelfEmploymentTaxResult {
        if net_earnings <= Decimal::ZERO {
            if net_earnings < Decimal::ZERO {
                warn!(
                    net_earnings = %net_earnings,
                    "Net earnings are negative; no self-employment tax applies"
                );
            }
            return SelfEmploymentTaxResult::zero();
        }

        let adjusted_earnings = self.adjusted_earnings(net_earnings);
        let social_security_tax = self.social_security_tax(adjusted_earnings);
        let additional_medicare_tax = self.additional_medicare_tax(adjusted_earnings);
        let medicare_tax =
            round_half_up(self.base_medicare_tax(adjusted_earnings) + additional_medicare_tax);
        let total = round_half_up(social_security_tax + medicare_tax);
        let deductible_half = round_half_up(total * self.config.deduction_factor);

        SelfEmploymentTaxResult {
            adjusted_earnings,
            social_security_tax,
            medicare_tax,
            additional_medicare_tax,
            total,
            deductible_half,
        }
    }

    fn adjusted_earnings(
        &self,
        net_earnings: Decimal,
    ) -> Decimal {
        round_half_up(net_earnings * self.config.net_earnings_factor)
    }

    fn social_security_tax(
        &self,
        adjusted_earnings: Decimal,
    ) -> Decimal {
        let taxable = adjusted_earnings.min(self.config.wage_cap);
        if taxable < adjusted_earnings {
            warn!(
                adjusted_earnings = %adjusted_earnings,
                wage_cap = %self.config.wage_cap,
                "Adjusted earnings exceed the social security wage cap"
            );
        }
        round_half_up(taxable * self.config.ss_tax_rate)
    }

    fn base_medicare_tax(
        &self,
        adjusted_earnings: Decimal,
    ) -> Decimal {
        round_half_up(adjusted_earnings * self.config.medicare_tax_rate)
    }

    fn additional_medicare_tax(
        &self,
        adjusted_earnings: Decimal,
    ) -> Decimal {
        let excess = adjusted_earnings - self.config.additional_medicare_threshold;
        if excess <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        round_half_up(excess * self.config.additional_medicare_rate)
    }
}

impl Default for SelfEmploymentTaxCalculator {
    fn default() -> Self {
        Self {
            config: SelfEmploymentConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tracing_subscriber::fmt::format::FmtSpan;

    use super::*;

    fn test_config() -> SelfEmploymentConfig {
        SelfEmploymentConfig {
            wage_cap: dec!(160200.00),
            ss_tax_rate: dec!(0.124),
            medicare_tax_rate: dec!(0.029),
            net_earnings_factor: dec!(0.9235),
            additional_medicare_threshold: dec!(200000.00),
            additional_medicare_rate: dec!(0.009),
            deduction_factor: dec!(0.50),
        }
    }

    fn calculator() -> SelfEmploymentTaxCalculator {
        SelfEmploymentTaxCalculator::new(test_config()).unwrap()
    }

    /// Initializes tracing subscriber for tests that hit warning paths.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_span_events(FmtSpan::NONE)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    // =========================================================================
    // SelfEmploymentConfig::validate tests
    // =========================================================================

    #[test]
    fn validate_accepts_2023_config() {
        assert_eq!(test_config().validate(), Ok(()));
        assert_eq!(SelfEmploymentConfig::default(), test_config());
    }

    #[test]
    fn validate_rejects_zero_net_earnings_factor() {
        let config = SelfEmploymentConfig {
            net_earnings_factor: dec!(0),
            ..test_config()
        };

        assert_eq!(
            config.validate(),
            Err(SelfEmploymentConfigError::InvalidNetEarningsFactor(dec!(0)))
        );
    }

    #[test]
    fn validate_rejects_rate_above_one() {
        let config = SelfEmploymentConfig {
            medicare_tax_rate: dec!(1.2),
            ..test_config()
        };

        assert_eq!(
            config.validate(),
            Err(SelfEmploymentConfigError::InvalidRate {
                name: "medicare tax rate",
                value: dec!(1.2),
            })
        );
    }

    #[test]
    fn validate_rejects_non_positive_wage_cap() {
        let config = SelfEmploymentConfig {
            wage_cap: dec!(0),
            ..test_config()
        };

        assert_eq!(
            config.validate(),
            Err(SelfEmploymentConfigError::InvalidWageCap(dec!(0)))
        );
    }

    #[test]
    fn validate_rejects_negative_threshold() {
        let config = SelfEmploymentConfig {
            additional_medicare_threshold: dec!(-1),
            ..test_config()
        };

        assert_eq!(
            config.validate(),
            Err(SelfEmploymentConfigError::InvalidThreshold(dec!(-1)))
        );
    }

    #[test]
    fn new_propagates_validation_error() {
        let config = SelfEmploymentConfig {
            deduction_factor: dec!(-0.5),
            ..test_config()
        };

        assert!(SelfEmploymentTaxCalculator::new(config).is_err());
    }

    // =========================================================================
    // compute tests
    // =========================================================================

    #[test]
    fn compute_standard_case() {
        let result = calculator().compute(dec!(100000.00));

        // 100,000 × 0.9235
        assert_eq!(result.adjusted_earnings, dec!(92350.00));
        // 92,350 × 12.4%
        assert_eq!(result.social_security_tax, dec!(11451.40));
        // 92,350 × 2.9%
        assert_eq!(result.medicare_tax, dec!(2678.15));
        assert_eq!(result.additional_medicare_tax, dec!(0));
        assert_eq!(result.total, dec!(14129.55));
        // 14,129.55 / 2 = 7,064.775
        assert_eq!(result.deductible_half, dec!(7064.78));
    }

    #[test]
    fn compute_caps_social_security_at_wage_base() {
        let _guard = init_test_tracing();

        let result = calculator().compute(dec!(160200) / dec!(0.9235));

        assert_eq!(result.adjusted_earnings, dec!(160200.00));
        // 160,200 × 12.4%
        assert_eq!(result.social_security_tax, dec!(19864.80));
    }

    #[test]
    fn compute_above_cap_keeps_social_security_flat() {
        let _guard = init_test_tracing();

        let at_cap = calculator().compute(dec!(173470.50));
        let above_cap = calculator().compute(dec!(190000.00));

        assert_eq!(at_cap.social_security_tax, dec!(19864.80));
        assert_eq!(above_cap.social_security_tax, dec!(19864.80));
        assert!(above_cap.medicare_tax > at_cap.medicare_tax);
    }

    #[test]
    fn compute_applies_additional_medicare_above_threshold() {
        let _guard = init_test_tracing();

        let result = calculator().compute(dec!(300000.00));

        // 300,000 × 0.9235
        assert_eq!(result.adjusted_earnings, dec!(277050.00));
        assert_eq!(result.social_security_tax, dec!(19864.80));
        // (277,050 − 200,000) × 0.9%
        assert_eq!(result.additional_medicare_tax, dec!(693.45));
        // 277,050 × 2.9% + 693.45
        assert_eq!(result.medicare_tax, dec!(8727.90));
        assert_eq!(result.total, dec!(28592.70));
        assert_eq!(result.deductible_half, dec!(14296.35));
    }

    #[test]
    fn compute_zero_earnings_is_zero() {
        let result = calculator().compute(dec!(0));

        assert_eq!(result, SelfEmploymentTaxResult::zero());
    }

    #[test]
    fn compute_negative_earnings_is_zero() {
        let _guard = init_test_tracing();

        let result = calculator().compute(dec!(-2500));

        assert_eq!(result.total, dec!(0));
        assert_eq!(result.deductible_half, dec!(0));
    }

    #[test]
    fn compute_total_is_sum_of_components() {
        let result = calculator().compute(dec!(54321.09));

        assert_eq!(
            result.total,
            result.social_security_tax + result.medicare_tax
        );
    }
}
