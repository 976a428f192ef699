//! Parsing of user-typed amounts and percentages.
//!
//! Input is trimmed and a decimal comma is accepted (`"12,5"` is 12.5).
//! When both separators appear, commas are thousands separators
//! (`"1,234.56"`).

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::{MAX_AMOUNT, clamp_amount, clamp_rate};

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Error returned when a string cannot be parsed as a [`Decimal`].
#[derive(Debug, Error)]
#[error("invalid decimal '{input}': {source}")]
pub struct ParseDecimalError {
    input: String,
    #[source]
    source: rust_decimal::Error,
}

fn normalize_decimal_input(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.contains('.') {
        trimmed.replace(',', "")
    } else {
        trimmed.replace(',', ".")
    }
}

/// Parses a string into a [`Decimal`].
///
/// Empty or whitespace-only input is treated as 0.
pub fn parse_decimal(s: &str) -> Result<Decimal, ParseDecimalError> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    normalized.parse().map_err(|e| ParseDecimalError {
        input: s.to_string(),
        source: e,
    })
}

/// Lenient amount parsing: unparseable input is 0, negatives clamp to 0 and
/// amounts above [`MAX_AMOUNT`] clamp to it.
///
/// ```
/// use rust_decimal_macros::dec;
/// use setaside_core::input::parse_amount;
///
/// assert_eq!(parse_amount(" 1250,50 "), dec!(1250.50));
/// assert_eq!(parse_amount("-40"), dec!(0));
/// assert_eq!(parse_amount("lots"), dec!(0));
/// ```
pub fn parse_amount(s: &str) -> Decimal {
    let value = parse_decimal(s).unwrap_or_else(|e| {
        warn!(input = %s, "Unparseable amount treated as zero: {}", e);
        Decimal::ZERO
    });
    if value < Decimal::ZERO {
        warn!(input = %s, "Negative amount clamped to zero");
    } else if value > MAX_AMOUNT {
        warn!(input = %s, max = %MAX_AMOUNT, "Amount clamped to maximum");
    }
    clamp_amount(value)
}

/// A percentage typed as `25` or `25,5`, returned as a fraction of at most
/// 10 (1000%).
pub fn parse_percent(s: &str) -> Decimal {
    clamp_rate(parse_amount(s) / HUNDRED)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // parse_decimal tests
    // =========================================================================

    #[test]
    fn parse_decimal_accepts_comma_thousands_separator() {
        assert_eq!(parse_decimal("1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("1,234,567.89").unwrap(), dec!(1234567.89));
    }

    #[test]
    fn parse_decimal_accepts_decimal_comma() {
        assert_eq!(parse_decimal("12,5").unwrap(), dec!(12.5));
    }

    #[test]
    fn parse_decimal_trims_whitespace() {
        assert_eq!(parse_decimal("  123.45  ").unwrap(), dec!(123.45));
    }

    #[test]
    fn parse_decimal_empty_treated_as_zero() {
        assert_eq!(parse_decimal("").unwrap(), Decimal::ZERO);
        assert_eq!(parse_decimal("   ").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn parse_decimal_invalid_returns_error() {
        assert!(parse_decimal("abc").is_err());
    }

    // =========================================================================
    // parse_amount / parse_percent tests
    // =========================================================================

    #[test]
    fn parse_amount_clamps_negative() {
        assert_eq!(parse_amount("-12.50"), dec!(0));
    }

    #[test]
    fn parse_amount_invalid_is_zero() {
        assert_eq!(parse_amount("12..5"), dec!(0));
    }

    #[test]
    fn parse_amount_caps_oversized_input() {
        assert_eq!(parse_amount("50000000000000000000000000000"), MAX_AMOUNT);
        assert_eq!(parse_amount("79228162514264337593543950335"), MAX_AMOUNT);
    }

    #[test]
    fn parse_percent_caps_oversized_input() {
        assert_eq!(parse_percent("250000"), dec!(10));
    }

    #[test]
    fn parse_percent_divides_by_hundred() {
        assert_eq!(parse_percent("25"), dec!(0.25));
        assert_eq!(parse_percent("2,5"), dec!(0.025));
        assert_eq!(parse_percent("-3"), dec!(0));
    }
}
