//! Rounding and clamping helpers shared by the calculators.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use setaside_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps a value to zero from below.
///
/// Every monetary input and rate entering the calculators passes through
/// this; negative amounts never produce negative tax.
///
/// ```
/// use rust_decimal_macros::dec;
/// use setaside_core::calculations::common::non_negative;
///
/// assert_eq!(non_negative(dec!(-5)), dec!(0));
/// assert_eq!(non_negative(dec!(5)), dec!(5));
/// ```
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Largest single amount the calculators accept (one trillion).
///
/// Keeps every product and sum the calculators form well inside the range
/// of [`Decimal`].
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Largest rate the calculators accept (1000%).
pub const MAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Clamps an amount into `[0, MAX_AMOUNT]`.
///
/// ```
/// use rust_decimal_macros::dec;
/// use setaside_core::calculations::common::{MAX_AMOUNT, clamp_amount};
///
/// assert_eq!(clamp_amount(dec!(-1)), dec!(0));
/// assert_eq!(clamp_amount(dec!(1e20)), MAX_AMOUNT);
/// ```
pub fn clamp_amount(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, MAX_AMOUNT)
}

/// Clamps a rate into `[0, MAX_RATE]`.
pub fn clamp_rate(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, MAX_RATE)
}

/// Divides `numerator` by `denominator`, returning zero instead of failing
/// when the denominator is zero.
pub fn ratio_or_zero(
    numerator: Decimal,
    denominator: Decimal,
) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}
