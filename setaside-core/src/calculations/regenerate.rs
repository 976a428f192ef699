//! Monthly tax-due records rebuilt from paid income.
//!
//! 1. Keep only paid income.
//! 2. Group by the first day of each record's month.
//! 3. Estimate each month with the profile's rates and no deductions.
//! 4. Reuse id, creation time and payment state from an existing record for
//!    the same month (latest `created_at` wins among duplicates); otherwise
//!    mint a new id and creation time.
//! 5. Order newest month first.
//!
//! Identifiers and timestamps come from a [`Minter`], so the output is fully
//! determined by the inputs and the minter. Feeding the output back in as
//! `existing` reproduces it exactly.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::calculations::estimate;
use crate::{IncomeRecord, TaxPaymentRecord, TaxProfile};

/// Label format for a period, e.g. `Mar 1, 2024`.
pub const PERIOD_LABEL_FORMAT: &str = "%b %-d, %Y";

/// Source of fresh identifiers and the current time.
pub trait Minter: Send + Sync {
    fn next_id(&self) -> Uuid;
    fn now(&self) -> DateTime<Utc>;
}

/// Random v4 ids and the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMinter;

impl Minter for SystemMinter {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Counter-based ids and a frozen clock.
#[derive(Debug)]
pub struct SequentialMinter {
    counter: AtomicU64,
    now: DateTime<Utc>,
}

impl SequentialMinter {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            counter: AtomicU64::new(1),
            now,
        }
    }
}

impl Minter for SequentialMinter {
    fn next_id(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.counter.fetch_add(1, Ordering::Relaxed)))
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn period_label(period_start: NaiveDate) -> String {
    period_start.format(PERIOD_LABEL_FORMAT).to_string()
}

/// Rebuilds the full list of tax records from `income`.
pub fn regenerate_tax_records(
    income: &[IncomeRecord],
    existing: &[TaxPaymentRecord],
    profile: &TaxProfile,
    minter: &dyn Minter,
) -> Vec<TaxPaymentRecord> {
    let mut existing_by_month: HashMap<NaiveDate, &TaxPaymentRecord> = HashMap::new();
    for record in existing {
        let key = month_start(record.period_start);
        match existing_by_month.get(&key) {
            Some(current) if current.created_at >= record.created_at => {}
            _ => {
                existing_by_month.insert(key, record);
            }
        }
    }

    let mut gross_by_month: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for record in income.iter().filter(|r| r.is_paid) {
        let gross = gross_by_month.entry(month_start(record.date)).or_default();
        *gross = gross.saturating_add(record.amount);
    }

    let generated: Vec<TaxPaymentRecord> = gross_by_month
        .into_iter()
        .rev()
        .map(|(start, gross)| {
            let result = estimate(
                gross,
                Decimal::ZERO,
                profile.default_tax_rate,
                profile.default_reserve_extra_rate,
            );
            let previous = existing_by_month.get(&start);

            TaxPaymentRecord {
                id: previous.map_or_else(|| minter.next_id(), |r| r.id),
                created_at: previous.map_or_else(|| minter.now(), |r| r.created_at),
                period_start: start,
                period_label: period_label(start),
                taxable_income: result.taxable_income,
                amount_due: result.total_set_aside,
                is_paid: previous.is_some_and(|r| r.is_paid),
                paid_at: previous.and_then(|r| r.paid_at),
            }
        })
        .collect();

    debug!(
        income = income.len(),
        existing = existing.len(),
        generated = generated.len(),
        "Regenerated tax records"
    );

    generated
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn instant(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
    }

    fn income(id: u128, on: NaiveDate, amount: Decimal, is_paid: bool) -> IncomeRecord {
        IncomeRecord {
            id: Uuid::from_u128(id),
            date: on,
            client_name: format!("Client {id}"),
            amount,
            is_paid,
            note: String::new(),
        }
    }

    fn existing_record(
        id: u128,
        period_start: NaiveDate,
        created_at: DateTime<Utc>,
        is_paid: bool,
    ) -> TaxPaymentRecord {
        TaxPaymentRecord {
            id: Uuid::from_u128(id),
            created_at,
            period_start,
            period_label: period_label(period_start),
            taxable_income: dec!(0),
            amount_due: dec!(0),
            is_paid,
            paid_at: is_paid.then_some(created_at),
        }
    }

    // =========================================================================
    // helper tests
    // =========================================================================

    #[test]
    fn month_start_truncates_to_first() {
        assert_eq!(month_start(date(2024, 2, 29)), date(2024, 2, 1));
    }

    #[test]
    fn period_label_uses_medium_date() {
        assert_eq!(period_label(date(2024, 3, 1)), "Mar 1, 2024");
    }

    #[test]
    fn sequential_minter_counts_up() {
        let minter = SequentialMinter::new(instant(1));

        assert_eq!(minter.next_id(), Uuid::from_u128(1));
        assert_eq!(minter.next_id(), Uuid::from_u128(2));
        assert_eq!(minter.now(), instant(1));
    }

    // =========================================================================
    // regenerate_tax_records tests
    // =========================================================================

    #[test]
    fn same_month_income_merges_and_preserves_existing_state() {
        let minter = SequentialMinter::new(instant(20));
        let profile = TaxProfile::default();
        let records = vec![
            income(1, date(2024, 3, 5), dec!(1000), true),
            income(2, date(2024, 3, 20), dec!(500), true),
        ];
        let existing = vec![existing_record(99, date(2024, 3, 1), instant(1), true)];

        let generated = regenerate_tax_records(&records, &existing, &profile, &minter);

        assert_eq!(generated.len(), 1);
        let record = &generated[0];
        assert_eq!(record.id, Uuid::from_u128(99));
        assert_eq!(record.created_at, instant(1));
        assert!(record.is_paid);
        assert_eq!(record.paid_at, Some(instant(1)));
        assert_eq!(record.taxable_income, dec!(1500));
        // 1,500 × (25% + 3%)
        assert_eq!(record.amount_due, dec!(420.00));
        assert_eq!(record.period_label, "Mar 1, 2024");
    }

    #[test]
    fn unpaid_income_is_ignored() {
        let minter = SequentialMinter::new(instant(20));
        let records = vec![
            income(1, date(2024, 3, 5), dec!(1000), false),
            income(2, date(2024, 4, 5), dec!(200), true),
        ];

        let generated = regenerate_tax_records(&records, &[], &TaxProfile::default(), &minter);

        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].period_start, date(2024, 4, 1));
        assert_eq!(generated[0].taxable_income, dec!(200));
    }

    #[test]
    fn new_months_get_minted_ids_and_are_unpaid() {
        let minter = SequentialMinter::new(instant(20));
        let records = vec![income(1, date(2024, 5, 5), dec!(100), true)];

        let generated = regenerate_tax_records(&records, &[], &TaxProfile::default(), &minter);

        assert_eq!(generated[0].id, Uuid::from_u128(1));
        assert_eq!(generated[0].created_at, instant(20));
        assert!(!generated[0].is_paid);
        assert_eq!(generated[0].paid_at, None);
    }

    #[test]
    fn output_is_ordered_newest_first() {
        let minter = SequentialMinter::new(instant(20));
        let records = vec![
            income(1, date(2024, 1, 5), dec!(100), true),
            income(2, date(2024, 3, 5), dec!(100), true),
            income(3, date(2023, 12, 31), dec!(100), true),
        ];

        let starts: Vec<NaiveDate> =
            regenerate_tax_records(&records, &[], &TaxProfile::default(), &minter)
                .into_iter()
                .map(|r| r.period_start)
                .collect();

        assert_eq!(starts, vec![date(2024, 3, 1), date(2024, 1, 1), date(2023, 12, 1)]);
    }

    #[test]
    fn duplicate_existing_records_prefer_latest_created_at() {
        let minter = SequentialMinter::new(instant(20));
        let records = vec![income(1, date(2024, 3, 5), dec!(100), true)];
        let existing = vec![
            existing_record(10, date(2024, 3, 1), instant(2), false),
            existing_record(11, date(2024, 3, 1), instant(5), true),
            existing_record(12, date(2024, 3, 1), instant(3), false),
        ];

        let generated =
            regenerate_tax_records(&records, &existing, &TaxProfile::default(), &minter);

        assert_eq!(generated[0].id, Uuid::from_u128(11));
        assert!(generated[0].is_paid);
    }

    #[test]
    fn months_without_paid_income_are_dropped() {
        let minter = SequentialMinter::new(instant(20));
        let existing = vec![existing_record(10, date(2024, 2, 1), instant(2), true)];

        let generated = regenerate_tax_records(&[], &existing, &TaxProfile::default(), &minter);

        assert!(generated.is_empty());
    }

    #[test]
    fn oversized_month_is_capped_instead_of_overflowing() {
        let minter = SequentialMinter::new(instant(20));
        let records = vec![
            income(1, date(2024, 3, 5), Decimal::MAX, true),
            income(2, date(2024, 3, 6), Decimal::MAX, true),
        ];

        let generated = regenerate_tax_records(&records, &[], &TaxProfile::default(), &minter);

        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].taxable_income, crate::calculations::common::MAX_AMOUNT);
    }

    #[test]
    fn regeneration_is_idempotent() {
        let minter = SequentialMinter::new(instant(20));
        let profile = TaxProfile::default();
        let records = vec![
            income(1, date(2024, 1, 5), dec!(1200.50), true),
            income(2, date(2024, 2, 5), dec!(300), true),
            income(3, date(2024, 2, 9), dec!(99.99), true),
        ];

        let first = regenerate_tax_records(&records, &[], &profile, &minter);
        let second = regenerate_tax_records(&records, &first, &profile, &minter);

        assert_eq!(first, second);
    }
}
