//! Reporting periods and payment states for filtering income history.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calculations::regenerate::month_start;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodFilter {
    ThisMonth,
    /// The current month and the two before it.
    Last3Months,
    ThisYear,
    #[default]
    AllTime,
}

impl PeriodFilter {
    pub const ALL: [PeriodFilter; 4] = [
        PeriodFilter::ThisMonth,
        PeriodFilter::Last3Months,
        PeriodFilter::ThisYear,
        PeriodFilter::AllTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThisMonth => "this_month",
            Self::Last3Months => "last_3_months",
            Self::ThisYear => "this_year",
            Self::AllTime => "all_time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.as_str() == s)
    }

    /// Whether `date` falls in the period as seen from `today`.
    ///
    /// Periods are open-ended towards the future.
    pub fn matches(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> bool {
        match self {
            Self::ThisMonth => date.year() == today.year() && date.month() == today.month(),
            Self::Last3Months => month_start(today)
                .checked_sub_months(Months::new(2))
                .is_none_or(|start| date >= start),
            Self::ThisYear => date.year() == today.year(),
            Self::AllTime => true,
        }
    }
}

/// Payment state filter for income listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFilter {
    #[default]
    All,
    Paid,
    Unpaid,
}

impl PaymentFilter {
    pub const ALL: [PaymentFilter; 3] = [
        PaymentFilter::All,
        PaymentFilter::Paid,
        PaymentFilter::Unpaid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.as_str() == s)
    }

    pub fn matches(&self, is_paid: bool) -> bool {
        match self {
            Self::All => true,
            Self::Paid => is_paid,
            Self::Unpaid => !is_paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn this_month_matches_same_calendar_month() {
        let today = date(2024, 3, 15);

        assert!(PeriodFilter::ThisMonth.matches(date(2024, 3, 1), today));
        assert!(!PeriodFilter::ThisMonth.matches(date(2024, 2, 29), today));
        assert!(!PeriodFilter::ThisMonth.matches(date(2023, 3, 15), today));
    }

    #[test]
    fn last_3_months_starts_two_months_back() {
        let today = date(2024, 3, 15);

        assert!(PeriodFilter::Last3Months.matches(date(2024, 1, 1), today));
        assert!(!PeriodFilter::Last3Months.matches(date(2023, 12, 31), today));
    }

    #[test]
    fn last_3_months_crosses_year_boundary() {
        let today = date(2024, 1, 10);

        assert!(PeriodFilter::Last3Months.matches(date(2023, 11, 1), today));
        assert!(!PeriodFilter::Last3Months.matches(date(2023, 10, 31), today));
    }

    #[test]
    fn this_year_and_all_time() {
        let today = date(2024, 6, 1);

        assert!(PeriodFilter::ThisYear.matches(date(2024, 12, 31), today));
        assert!(!PeriodFilter::ThisYear.matches(date(2023, 12, 31), today));
        assert!(PeriodFilter::AllTime.matches(date(1999, 1, 1), today));
    }

    #[test]
    fn parse_round_trips_names() {
        for filter in PeriodFilter::ALL {
            assert_eq!(PeriodFilter::parse(filter.as_str()), Some(filter));
        }
        assert_eq!(PeriodFilter::parse("decade"), None);
    }

    #[test]
    fn payment_filter_selects_by_paid_flag() {
        assert!(PaymentFilter::All.matches(true) && PaymentFilter::All.matches(false));
        assert!(PaymentFilter::Paid.matches(true));
        assert!(!PaymentFilter::Paid.matches(false));
        assert!(PaymentFilter::Unpaid.matches(false));
        assert!(!PaymentFilter::Unpaid.matches(true));
    }

    #[test]
    fn payment_filter_parses_names() {
        for filter in PaymentFilter::ALL {
            assert_eq!(PaymentFilter::parse(filter.as_str()), Some(filter));
        }
        assert_eq!(PaymentFilter::parse("overdue"), None);
    }
}
