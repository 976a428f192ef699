use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tax owed for one calendar month of paid income.
///
/// `paid_at` is set exactly when `is_paid` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxPaymentRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub period_start: NaiveDate,
    pub period_label: String,
    pub taxable_income: Decimal,
    pub amount_due: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

impl TaxPaymentRecord {
    pub fn mark_paid(&mut self, at: DateTime<Utc>) {
        self.is_paid = true;
        self.paid_at = Some(at);
    }

    pub fn toggle_paid(&mut self, at: DateTime<Utc>) {
        self.is_paid = !self.is_paid;
        self.paid_at = self.is_paid.then_some(at);
    }

    /// True when `paid_at` is set exactly when `is_paid` is.
    pub fn is_consistent(&self) -> bool {
        self.is_paid == self.paid_at.is_some()
    }
}

/// Splits records into (unpaid, paid), keeping the input order.
pub fn split_by_paid(
    records: &[TaxPaymentRecord],
) -> (Vec<&TaxPaymentRecord>, Vec<&TaxPaymentRecord>) {
    records.iter().partition(|r| !r.is_paid)
}

/// Amount due on the first unpaid record, or zero when everything is paid.
pub fn next_amount_due(records: &[TaxPaymentRecord]) -> Decimal {
    records
        .iter()
        .find(|r| !r.is_paid)
        .map(|r| r.amount_due)
        .unwrap_or(Decimal::ZERO)
}
