use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use setaside_core::calculations::common::round_half_up;

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Formats a money amount with thousands separators and two decimals,
/// followed by the currency code: `1,234.50 USD`.
pub fn format_money(
    amount: Decimal,
    currency: &str,
) -> String {
    let rounded = round_half_up(amount);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((&text, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{cents} {currency}")
}

/// Formats a fractional rate as a percentage: `0.25` → `25%`.
pub fn format_percent(rate: Decimal) -> String {
    format!("{}%", (rate * HUNDRED).normalize())
}

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s.trim()))
}

/// Parses a record id as printed by the list commands.
pub fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).with_context(|| format!("invalid record id '{}'", s.trim()))
}

/// Formats an optional date for display, using "-" when `None`.
pub fn opt_date_display(d: Option<NaiveDate>) -> String {
    d.map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}
