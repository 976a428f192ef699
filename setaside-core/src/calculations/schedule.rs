//! Estimated payment due dates and monthly reminders.
//!
//! | Quarter | Due        |
//! |---------|------------|
//! | Q1      | April 15   |
//! | Q2      | June 15    |
//! | Q3      | September 15 |
//! | Q4      | January 15 of the following year |
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use setaside_core::calculations::PaymentSchedule;
//!
//! let from = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
//! let next = PaymentSchedule::us_federal().next_due_date(from).unwrap();
//!
//! assert_eq!(next.date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
//! assert_eq!(next.label, "Q2");
//! ```

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ReminderSettings;

/// One quarterly installment in the fixed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Installment {
    month: u32,
    day: u32,
    label: &'static str,
    /// Due in the calendar year after the tax year.
    following_year: bool,
}

const US_FEDERAL: [Installment; 4] = [
    Installment { month: 4, day: 15, label: "Q1", following_year: false },
    Installment { month: 6, day: 15, label: "Q2", following_year: false },
    Installment { month: 9, day: 15, label: "Q3", following_year: false },
    Installment { month: 1, day: 15, label: "Q4", following_year: true },
];

/// A concrete due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDate {
    pub date: NaiveDate,
    pub label: String,
    /// Tax year the installment belongs to.
    pub tax_year: i32,
}

/// Fixed quarterly due-date table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSchedule {
    installments: &'static [Installment],
}

impl PaymentSchedule {
    pub fn us_federal() -> Self {
        Self {
            installments: &US_FEDERAL,
        }
    }

    /// All due dates belonging to `tax_year`, in calendar order.
    pub fn due_dates(
        &self,
        tax_year: i32,
    ) -> Vec<DueDate> {
        let mut dates: Vec<DueDate> = self
            .installments
            .iter()
            .filter_map(|installment| {
                let year = if installment.following_year { tax_year + 1 } else { tax_year };
                let date = NaiveDate::from_ymd_opt(year, installment.month, installment.day)?;
                Some(DueDate {
                    date,
                    label: installment.label.to_string(),
                    tax_year,
                })
            })
            .collect();
        dates.sort_by_key(|due| due.date);
        dates
    }

    /// First due date strictly after `from`.
    ///
    /// Early January still owes the previous tax year's Q4; after
    /// September 15 the answer wraps to next January's Q4.
    pub fn next_due_date(
        &self,
        from: NaiveDate,
    ) -> Option<DueDate> {
        let year = from.year();
        self.due_dates(year - 1)
            .into_iter()
            .chain(self.due_dates(year))
            .find(|due| due.date > from)
    }

    /// Whole days from `from` to the next due date.
    pub fn days_until_next_payment(
        &self,
        from: NaiveDate,
    ) -> Option<i64> {
        self.next_due_date(from)
            .map(|due| (due.date - from).num_days())
    }
}

impl Default for PaymentSchedule {
    fn default() -> Self {
        Self::us_federal()
    }
}

/// Monthly set-aside reminder at a fixed day and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyReminder {
    settings: ReminderSettings,
}

impl MonthlyReminder {
    pub fn new(settings: ReminderSettings) -> Self {
        Self {
            settings: settings.clamped(),
        }
    }

    pub fn settings(&self) -> ReminderSettings {
        self.settings
    }

    /// Next reminder instant strictly after `after`.
    pub fn next_fire(
        &self,
        after: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        let time = NaiveTime::from_hms_opt(self.settings.hour, self.settings.minute, 0)?;
        let this_month = NaiveDate::from_ymd_opt(after.year(), after.month(), self.settings.day)?
            .and_time(time);
        if this_month > after {
            return Some(this_month);
        }
        this_month.checked_add_months(Months::new(1))
    }
}
