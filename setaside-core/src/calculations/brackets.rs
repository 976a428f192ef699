//! Progressive bracket tax.
//!
//! A [`BracketTable`] holds an ordered, contiguous list of [`TaxBracket`]s
//! covering `[0, ∞)`. Tax on an income is the sum, over every bracket the
//! income reaches, of the slice of income inside that bracket times the
//! bracket's rate.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use setaside_core::calculations::BracketTable;
//!
//! let table = BracketTable::us_single_2023();
//!
//! // 11,000 × 10% + 33,725 × 12% + 5,275 × 22%
//! assert_eq!(table.tax_for(dec!(50000)), dec!(6307.50));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use crate::TaxBracket;
use crate::calculations::common::{ratio_or_zero, round_half_up};

/// Errors raised when a bracket table is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketTableError {
    /// No brackets were provided.
    #[error("no tax brackets provided")]
    Empty,

    /// The first bracket does not start at zero.
    #[error("first bracket must start at 0, got {0}")]
    FirstBracketNotZero(Decimal),

    /// A bracket's upper bound does not exceed its lower bound.
    #[error("bracket {index} has lower bound {lower} not below upper bound {upper}")]
    InvertedBounds {
        index: usize,
        lower: Decimal,
        upper: Decimal,
    },

    /// A bracket does not start where the previous one ended.
    #[error("bracket {index} starts at {lower}, expected {expected}")]
    Gap {
        index: usize,
        lower: Decimal,
        expected: Decimal,
    },

    /// A bracket other than the last one is unbounded, or the last one is bounded.
    #[error("only the last bracket may be unbounded (bracket {0})")]
    Unbounded(usize),

    /// A rate outside `[0, 1]`.
    #[error("bracket {index} has rate {rate} outside [0, 1]")]
    InvalidRate { index: usize, rate: Decimal },
}

/// An ordered, validated set of tax brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    /// Validates and wraps `brackets`.
    ///
    /// Brackets must be ascending, contiguous, start at zero and end with a
    /// single unbounded bracket.
    ///
    /// # Errors
    ///
    /// Returns [`BracketTableError`] describing the first violation found.
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, BracketTableError> {
        let first = brackets.first().ok_or(BracketTableError::Empty)?;
        if !first.lower_bound.is_zero() {
            return Err(BracketTableError::FirstBracketNotZero(first.lower_bound));
        }

        let last_index = brackets.len() - 1;
        let mut expected_lower = Decimal::ZERO;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(BracketTableError::InvalidRate {
                    index,
                    rate: bracket.rate,
                });
            }
            if bracket.lower_bound != expected_lower {
                return Err(BracketTableError::Gap {
                    index,
                    lower: bracket.lower_bound,
                    expected: expected_lower,
                });
            }
            match bracket.upper_bound {
                Some(_) if index == last_index => return Err(BracketTableError::Unbounded(index)),
                Some(upper) => {
                    if upper <= bracket.lower_bound {
                        return Err(BracketTableError::InvertedBounds {
                            index,
                            lower: bracket.lower_bound,
                            upper,
                        });
                    }
                    expected_lower = upper;
                }
                None if index != last_index => return Err(BracketTableError::Unbounded(index)),
                None => {}
            }
        }

        Ok(Self { brackets })
    }

    /// 2023 US federal brackets for a single filer.
    pub fn us_single_2023() -> Self {
        let rows: [(i64, Option<i64>, i64); 7] = [
            (0, Some(11_000), 10),
            (11_000, Some(44_725), 12),
            (44_725, Some(95_375), 22),
            (95_375, Some(182_100), 24),
            (182_100, Some(231_250), 32),
            (231_250, Some(578_125), 35),
            (578_125, None, 37),
        ];
        let brackets = rows
            .iter()
            .map(|&(lower, upper, pct)| {
                TaxBracket::new(
                    Decimal::from(lower),
                    upper.map(Decimal::from),
                    Decimal::new(pct, 2),
                )
            })
            .collect();

        Self { brackets }
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Tax owed on `income`, rounded to cents. Zero for income ≤ 0.
    pub fn tax_for(
        &self,
        income: Decimal,
    ) -> Decimal {
        if income <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let tax: Decimal = self
            .brackets
            .iter()
            .filter(|b| income > b.lower_bound)
            .map(|b| {
                let top = b.upper_bound.map_or(income, |upper| income.min(upper));
                (top - b.lower_bound) * b.rate
            })
            .sum();

        round_half_up(tax)
    }

    /// Rate applied to the last dollar of `income`.
    pub fn marginal_rate(
        &self,
        income: Decimal,
    ) -> Decimal {
        self.brackets
            .iter()
            .rev()
            .find(|b| income > b.lower_bound)
            .or_else(|| self.brackets.first())
            .map(|b| b.rate)
            .unwrap_or(Decimal::ZERO)
    }

    /// Total tax divided by income; zero when income is zero.
    pub fn effective_rate(
        &self,
        income: Decimal,
    ) -> Decimal {
        if income <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ratio_or_zero(self.tax_for(income), income)
    }
}
