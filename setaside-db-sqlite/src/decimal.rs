//! Money and rate columns are stored as exact decimal text.

use rust_decimal::Decimal;
use setaside_core::RepositoryError;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// Reads the text of a decimal column, `None` when it holds NULL.
fn decimal_text(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<String>, RepositoryError> {
    let value_ref = row.try_get_raw(column).map_err(|e| {
        RepositoryError::Database(format!("No column '{}' in ledger row: {}", column, e))
    })?;
    if value_ref.is_null() {
        return Ok(None);
    }

    let type_name = value_ref.type_info().name().to_string();
    if type_name != "TEXT" {
        return Err(RepositoryError::Database(format!(
            "Unexpected type '{}' in decimal column '{}'",
            type_name, column
        )));
    }

    row.try_get::<String, _>(column)
        .map(Some)
        .map_err(|e| RepositoryError::Database(format!("Unreadable '{}': {}", column, e)))
}

fn parse_decimal(
    column: &str,
    text: &str,
) -> Result<Decimal, RepositoryError> {
    text.trim().parse().map_err(|e| {
        RepositoryError::Database(format!(
            "'{}' in '{}' is not a decimal: {}",
            text, column, e
        ))
    })
}

/// Reads a required decimal column. NULL is an error.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    match decimal_text(row, column)? {
        Some(text) => parse_decimal(column, &text),
        None => Err(RepositoryError::Database(format!(
            "NULL in required decimal column '{}'",
            column
        ))),
    }
}

/// Reads a nullable decimal column such as an open-ended bracket bound.
pub fn get_optional_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    decimal_text(row, column)?
        .map(|text| parse_decimal(column, &text))
        .transpose()
}

/// Text form written to decimal columns. Scale is preserved.
pub fn decimal_to_text(d: Decimal) -> String {
    d.to_string()
}
