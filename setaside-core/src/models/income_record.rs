use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single payment received (or expected) from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub client_name: String,
    pub amount: Decimal,
    pub is_paid: bool,
    #[serde(default)]
    pub note: String,
}

/// For creating new income records (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIncomeRecord {
    pub date: NaiveDate,
    pub client_name: String,
    pub amount: Decimal,
    pub is_paid: bool,
    pub note: String,
}

impl NewIncomeRecord {
    pub fn into_record(self, id: Uuid) -> IncomeRecord {
        IncomeRecord {
            id,
            date: self.date,
            client_name: self.client_name,
            amount: self.amount,
            is_paid: self.is_paid,
            note: self.note,
        }
    }
}
