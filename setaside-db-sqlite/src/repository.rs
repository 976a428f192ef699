use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use setaside_core::{
    BracketSchedule, FilingStatusCode, IncomeRecord, LedgerRepository, LedgerSnapshot,
    ReminderSettings, RepositoryError, TaxBracket, TaxPaymentRecord, TaxProfile, TaxationMode,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url` (e.g. `sqlite:setaside.db?mode=rwc`).
    ///
    /// In-memory URLs get a single-connection pool so every query sees the
    /// same database.
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                RepositoryError::Connection(format!(
                    "Failed to connect to database '{}': {}",
                    database_url, e
                ))
            })?;
        debug!(database_url, max_connections, "Connected to SQLite");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::Database(format!("Failed to run ledger migrations: {}", e))
            })?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'_, Sqlite>, RepositoryError> {
        self.pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }
}

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, RepositoryError> {
    let raw: String = row
        .try_get(column)
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    Uuid::parse_str(&raw).map_err(|e| {
        RepositoryError::Database(format!("Invalid uuid '{}' in '{}': {}", raw, column, e))
    })
}

fn row_to_income_record(row: &SqliteRow) -> Result<IncomeRecord, RepositoryError> {
    Ok(IncomeRecord {
        id: get_uuid(row, "id")?,
        date: row
            .try_get::<NaiveDate, _>("date")
            .map_err(|e| RepositoryError::Database(format!("Failed to get date: {}", e)))?,
        client_name: row
            .try_get("client_name")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        amount: get_decimal(row, "amount")?,
        is_paid: row
            .try_get("is_paid")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        note: row
            .try_get("note")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
    })
}

fn row_to_tax_record(row: &SqliteRow) -> Result<TaxPaymentRecord, RepositoryError> {
    Ok(TaxPaymentRecord {
        id: get_uuid(row, "id")?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| {
                RepositoryError::Database(format!("Failed to get created_at: {}", e))
            })?,
        period_start: row
            .try_get::<NaiveDate, _>("period_start")
            .map_err(|e| {
                RepositoryError::Database(format!("Failed to get period_start: {}", e))
            })?,
        period_label: row
            .try_get("period_label")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        taxable_income: get_decimal(row, "taxable_income")?,
        amount_due: get_decimal(row, "amount_due")?,
        is_paid: row
            .try_get("is_paid")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        paid_at: row
            .try_get::<Option<DateTime<Utc>>, _>("paid_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get paid_at: {}", e)))?,
    })
}

fn row_to_tax_bracket(row: &SqliteRow) -> Result<TaxBracket, RepositoryError> {
    Ok(TaxBracket {
        lower_bound: get_decimal(row, "lower_bound")?,
        upper_bound: get_optional_decimal(row, "upper_bound")?,
        rate: get_decimal(row, "rate")?,
    })
}

fn parse_filing_status(code: &str) -> Result<FilingStatusCode, RepositoryError> {
    FilingStatusCode::parse(code)
        .ok_or_else(|| RepositoryError::Database(format!("Unknown filing status '{}'", code)))
}

const INCOME_COLUMNS: &str = "id, date, client_name, amount, is_paid, note";
const TAX_RECORD_COLUMNS: &str =
    "id, created_at, period_start, period_label, taxable_income, amount_due, is_paid, paid_at";

async fn insert_income_record(
    tx: &mut Transaction<'_, Sqlite>,
    record: &IncomeRecord,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO income_records (id, date, client_name, amount, is_paid, note)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            date = excluded.date,
            client_name = excluded.client_name,
            amount = excluded.amount,
            is_paid = excluded.is_paid,
            note = excluded.note",
    )
    .bind(record.id.to_string())
    .bind(record.date)
    .bind(&record.client_name)
    .bind(decimal_to_text(record.amount))
    .bind(record.is_paid)
    .bind(&record.note)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::Database(e.to_string()))?;
    Ok(())
}

async fn insert_tax_record(
    tx: &mut Transaction<'_, Sqlite>,
    record: &TaxPaymentRecord,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO tax_records (id, created_at, period_start, period_label,
                                  taxable_income, amount_due, is_paid, paid_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.id.to_string())
    .bind(record.created_at)
    .bind(record.period_start)
    .bind(&record.period_label)
    .bind(decimal_to_text(record.taxable_income))
    .bind(decimal_to_text(record.amount_due))
    .bind(record.is_paid)
    .bind(record.paid_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::Database(e.to_string()))?;
    Ok(())
}

async fn upsert_profile(
    tx: &mut Transaction<'_, Sqlite>,
    profile: &TaxProfile,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO profile (id, country_code, taxation_mode, default_tax_rate,
                              default_reserve_extra_rate, currency_code,
                              reminder_day, reminder_hour, reminder_minute)
         VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            country_code = excluded.country_code,
            taxation_mode = excluded.taxation_mode,
            default_tax_rate = excluded.default_tax_rate,
            default_reserve_extra_rate = excluded.default_reserve_extra_rate,
            currency_code = excluded.currency_code,
            reminder_day = excluded.reminder_day,
            reminder_hour = excluded.reminder_hour,
            reminder_minute = excluded.reminder_minute",
    )
    .bind(&profile.country_code)
    .bind(profile.taxation_mode.as_str())
    .bind(decimal_to_text(profile.default_tax_rate))
    .bind(decimal_to_text(profile.default_reserve_extra_rate))
    .bind(&profile.currency_code)
    .bind(profile.reminder.day)
    .bind(profile.reminder.hour)
    .bind(profile.reminder.minute)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::Database(e.to_string()))?;
    Ok(())
}

async fn clear_table(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!("DELETE FROM {}", table))
        .execute(&mut **tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    Ok(())
}

/// Rewrites one (year, status) schedule, keeping bracket order in `position`.
async fn write_bracket_schedule(
    tx: &mut Transaction<'_, Sqlite>,
    schedule: &BracketSchedule,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM tax_brackets WHERE tax_year = ? AND filing_status = ?")
        .bind(schedule.tax_year)
        .bind(schedule.filing_status.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

    for (position, bracket) in schedule.brackets.iter().enumerate() {
        sqlx::query(
            "INSERT INTO tax_brackets (tax_year, filing_status, position,
                                       lower_bound, upper_bound, rate)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(schedule.tax_year)
        .bind(schedule.filing_status.as_str())
        .bind(position as i64)
        .bind(decimal_to_text(bracket.lower_bound))
        .bind(bracket.upper_bound.map(decimal_to_text))
        .bind(decimal_to_text(bracket.rate))
        .execute(&mut **tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    }
    Ok(())
}

async fn commit(tx: Transaction<'_, Sqlite>) -> Result<(), RepositoryError> {
    tx.commit()
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))
}

#[async_trait]
impl LedgerRepository for SqliteRepository {
    async fn load_profile(&self) -> Result<TaxProfile, RepositoryError> {
        let row = sqlx::query(
            "SELECT country_code, taxation_mode, default_tax_rate, default_reserve_extra_rate,
                    currency_code, reminder_day, reminder_hour, reminder_minute
             FROM profile WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(TaxProfile::default());
        };

        let mode: String = row
            .try_get("taxation_mode")
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let reminder_part = |column: &str| -> Result<u32, RepositoryError> {
            row.try_get::<u32, _>(column)
                .map_err(|e| RepositoryError::Database(e.to_string()))
        };

        Ok(TaxProfile {
            country_code: row
                .try_get("country_code")
                .map_err(|e| RepositoryError::Database(e.to_string()))?,
            taxation_mode: TaxationMode::parse(&mode).ok_or_else(|| {
                RepositoryError::Database(format!("Unknown taxation mode '{}'", mode))
            })?,
            default_tax_rate: get_decimal(&row, "default_tax_rate")?,
            default_reserve_extra_rate: get_decimal(&row, "default_reserve_extra_rate")?,
            currency_code: row
                .try_get("currency_code")
                .map_err(|e| RepositoryError::Database(e.to_string()))?,
            reminder: ReminderSettings::new(
                reminder_part("reminder_day")?,
                reminder_part("reminder_hour")?,
                reminder_part("reminder_minute")?,
            ),
        })
    }

    async fn save_profile(&self, profile: &TaxProfile) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        upsert_profile(&mut tx, profile).await?;
        commit(tx).await
    }

    async fn list_income_records(&self) -> Result<Vec<IncomeRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM income_records ORDER BY date DESC, id",
            INCOME_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_income_record).collect()
    }

    async fn get_income_record(&self, id: Uuid) -> Result<IncomeRecord, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM income_records WHERE id = ?",
            INCOME_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_income_record(&row)
    }

    async fn save_income_record(&self, record: &IncomeRecord) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        insert_income_record(&mut tx, record).await?;
        commit(tx).await
    }

    async fn save_income_records(
        &self,
        records: &[IncomeRecord],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        for record in records {
            insert_income_record(&mut tx, record).await?;
        }
        commit(tx).await
    }

    async fn delete_income_record(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM income_records WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn replace_income_records(
        &self,
        records: &[IncomeRecord],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        clear_table(&mut tx, "income_records").await?;
        for record in records {
            insert_income_record(&mut tx, record).await?;
        }
        commit(tx).await
    }

    async fn list_tax_records(&self) -> Result<Vec<TaxPaymentRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tax_records ORDER BY period_start DESC, id",
            TAX_RECORD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_tax_record).collect()
    }

    async fn replace_tax_records(
        &self,
        records: &[TaxPaymentRecord],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        clear_table(&mut tx, "tax_records").await?;
        for record in records {
            insert_tax_record(&mut tx, record).await?;
        }
        commit(tx).await
    }

    async fn update_tax_record(&self, record: &TaxPaymentRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tax_records SET
                created_at = ?,
                period_start = ?,
                period_label = ?,
                taxable_income = ?,
                amount_due = ?,
                is_paid = ?,
                paid_at = ?
             WHERE id = ?",
        )
        .bind(record.created_at)
        .bind(record.period_start)
        .bind(&record.period_label)
        .bind(decimal_to_text(record.taxable_income))
        .bind(decimal_to_text(record.amount_due))
        .bind(record.is_paid)
        .bind(record.paid_at)
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_tax_record(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_records WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT lower_bound, upper_bound, rate
             FROM tax_brackets
             WHERE tax_year = ? AND filing_status = ?
             ORDER BY position",
        )
        .bind(tax_year)
        .bind(filing_status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_tax_bracket).collect()
    }

    async fn replace_tax_brackets(
        &self,
        schedule: &BracketSchedule,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        write_bracket_schedule(&mut tx, schedule).await?;
        commit(tx).await
    }

    async fn list_bracket_schedules(&self) -> Result<Vec<BracketSchedule>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT tax_year, filing_status, lower_bound, upper_bound, rate
             FROM tax_brackets
             ORDER BY tax_year, filing_status, position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut schedules: Vec<BracketSchedule> = Vec::new();
        for row in &rows {
            let tax_year: i32 = row
                .try_get("tax_year")
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
            let code: String = row
                .try_get("filing_status")
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
            let filing_status = parse_filing_status(&code)?;
            let bracket = row_to_tax_bracket(row)?;

            match schedules.last_mut() {
                Some(last)
                    if last.tax_year == tax_year && last.filing_status == filing_status =>
                {
                    last.brackets.push(bracket);
                }
                _ => schedules.push(BracketSchedule {
                    tax_year,
                    filing_status,
                    brackets: vec![bracket],
                }),
            }
        }

        schedules.sort_by_key(|s| (s.tax_year, s.filing_status));
        Ok(schedules)
    }

    async fn replace_ledger(&self, snapshot: &LedgerSnapshot) -> Result<(), RepositoryError> {
        let mut tx = self.begin().await?;
        upsert_profile(&mut tx, &snapshot.profile).await?;
        clear_table(&mut tx, "income_records").await?;
        for record in &snapshot.income_records {
            insert_income_record(&mut tx, record).await?;
        }
        clear_table(&mut tx, "tax_records").await?;
        for record in &snapshot.tax_records {
            insert_tax_record(&mut tx, record).await?;
        }
        for schedule in &snapshot.bracket_schedules {
            write_bracket_schedule(&mut tx, schedule).await?;
        }
        commit(tx).await?;
        debug!(
            income = snapshot.income_records.len(),
            tax_records = snapshot.tax_records.len(),
            "Replaced ledger"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let repo = SqliteRepository::new("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn income(id: u128, on: NaiveDate, amount: rust_decimal::Decimal) -> IncomeRecord {
        IncomeRecord {
            id: Uuid::from_u128(id),
            date: on,
            client_name: "Umbrella".to_string(),
            amount,
            is_paid: true,
            note: "invoice 7".to_string(),
        }
    }

    fn tax_record(id: u128, period_start: NaiveDate, is_paid: bool) -> TaxPaymentRecord {
        let created_at = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        TaxPaymentRecord {
            id: Uuid::from_u128(id),
            created_at,
            period_start,
            period_label: "Mar 1, 2024".to_string(),
            taxable_income: dec!(1500.00),
            amount_due: dec!(420.00),
            is_paid,
            paid_at: is_paid.then_some(created_at),
        }
    }

    // =========================================================================
    // profile tests
    // =========================================================================

    #[tokio::test]
    async fn test_load_profile_defaults_when_empty() {
        let repo = setup_test_db().await;

        let profile = repo.load_profile().await.expect("Should load profile");

        assert_eq!(profile, TaxProfile::default());
    }

    #[tokio::test]
    async fn test_save_profile_round_trip_and_overwrite() {
        let repo = setup_test_db().await;
        let mut profile = TaxProfile {
            country_code: "CA".to_string(),
            taxation_mode: TaxationMode::Contractor,
            default_tax_rate: dec!(0.30),
            default_reserve_extra_rate: dec!(0.05),
            currency_code: "CAD".to_string(),
            reminder: ReminderSettings::new(1, 8, 15),
        };
        repo.save_profile(&profile).await.expect("Should save profile");
        profile.default_tax_rate = dec!(0.32);
        repo.save_profile(&profile).await.expect("Should overwrite profile");

        let loaded = repo.load_profile().await.expect("Should load profile");

        assert_eq!(loaded, profile);
    }

    // =========================================================================
    // income record tests
    // =========================================================================

    #[tokio::test]
    async fn test_income_records_round_trip_newest_first() {
        let repo = setup_test_db().await;
        let older = income(1, date(2024, 3, 1), dec!(1000.50));
        let newer = income(2, date(2024, 3, 20), dec!(250));
        repo.save_income_record(&older).await.unwrap();
        repo.save_income_record(&newer).await.unwrap();

        let listed = repo.list_income_records().await.unwrap();

        assert_eq!(listed, vec![newer, older]);
    }

    #[tokio::test]
    async fn test_save_income_record_upserts() {
        let repo = setup_test_db().await;
        let mut record = income(1, date(2024, 3, 1), dec!(1000));
        repo.save_income_record(&record).await.unwrap();
        record.is_paid = false;
        record.amount = dec!(1200);
        repo.save_income_record(&record).await.unwrap();

        let loaded = repo.get_income_record(record.id).await.unwrap();

        assert_eq!(loaded, record);
        assert_eq!(repo.list_income_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_income_record_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(
            repo.get_income_record(Uuid::from_u128(9)).await,
            Err(RepositoryError::NotFound)
        );
        assert_eq!(
            repo.delete_income_record(Uuid::from_u128(9)).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_replace_income_records() {
        let repo = setup_test_db().await;
        repo.save_income_record(&income(1, date(2024, 1, 1), dec!(1)))
            .await
            .unwrap();

        let replacement = vec![income(2, date(2024, 2, 1), dec!(2))];
        repo.replace_income_records(&replacement).await.unwrap();

        assert_eq!(repo.list_income_records().await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_save_income_records_batch_upserts() {
        let repo = setup_test_db().await;
        let mut first = income(1, date(2024, 3, 1), dec!(100));
        repo.save_income_record(&first).await.unwrap();
        first.amount = dec!(150);
        let second = income(2, date(2024, 3, 5), dec!(200));

        repo.save_income_records(&[first.clone(), second.clone()])
            .await
            .unwrap();

        assert_eq!(repo.list_income_records().await.unwrap(), vec![second, first]);
    }

    // =========================================================================
    // tax record tests
    // =========================================================================

    #[tokio::test]
    async fn test_replace_and_list_tax_records() {
        let repo = setup_test_db().await;
        let records = vec![
            tax_record(1, date(2024, 2, 1), false),
            tax_record(2, date(2024, 3, 1), true),
        ];

        repo.replace_tax_records(&records).await.unwrap();
        let listed = repo.list_tax_records().await.unwrap();

        assert_eq!(listed, vec![records[1].clone(), records[0].clone()]);
    }

    #[tokio::test]
    async fn test_update_tax_record_marks_paid() {
        let repo = setup_test_db().await;
        let mut record = tax_record(1, date(2024, 2, 1), false);
        repo.replace_tax_records(std::slice::from_ref(&record)).await.unwrap();

        record.mark_paid(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        repo.update_tax_record(&record).await.unwrap();

        assert_eq!(repo.list_tax_records().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_tax_record() {
        let repo = setup_test_db().await;
        let record = tax_record(1, date(2024, 2, 1), false);

        assert_eq!(
            repo.update_tax_record(&record).await,
            Err(RepositoryError::NotFound)
        );
        assert_eq!(
            repo.delete_tax_record(record.id).await,
            Err(RepositoryError::NotFound)
        );
    }

    // =========================================================================
    // tax bracket tests
    // =========================================================================

    fn schedule(tax_year: i32, filing_status: FilingStatusCode) -> BracketSchedule {
        BracketSchedule {
            tax_year,
            filing_status,
            brackets: vec![
                TaxBracket::new(dec!(0), Some(dec!(11000)), dec!(0.10)),
                TaxBracket::new(dec!(11000), Some(dec!(44725)), dec!(0.12)),
                TaxBracket::new(dec!(44725), None, dec!(0.22)),
            ],
        }
    }

    #[tokio::test]
    async fn test_brackets_keep_position_order() {
        let repo = setup_test_db().await;
        let expected = schedule(2023, FilingStatusCode::Single);
        repo.replace_tax_brackets(&expected).await.unwrap();

        let brackets = repo
            .get_tax_brackets(2023, FilingStatusCode::Single)
            .await
            .unwrap();

        assert_eq!(brackets, expected.brackets);
    }

    #[tokio::test]
    async fn test_replace_tax_brackets_overwrites_only_matching_schedule() {
        let repo = setup_test_db().await;
        repo.replace_tax_brackets(&schedule(2023, FilingStatusCode::Single))
            .await
            .unwrap();
        repo.replace_tax_brackets(&schedule(2023, FilingStatusCode::HeadOfHousehold))
            .await
            .unwrap();
        let replacement = BracketSchedule {
            tax_year: 2023,
            filing_status: FilingStatusCode::Single,
            brackets: vec![TaxBracket::new(dec!(0), None, dec!(0.15))],
        };

        repo.replace_tax_brackets(&replacement).await.unwrap();
        let schedules = repo.list_bracket_schedules().await.unwrap();

        assert_eq!(
            schedules,
            vec![replacement, schedule(2023, FilingStatusCode::HeadOfHousehold)]
        );
    }

    #[tokio::test]
    async fn test_get_tax_brackets_empty_for_unknown_year() {
        let repo = setup_test_db().await;

        let brackets = repo
            .get_tax_brackets(1999, FilingStatusCode::Single)
            .await
            .unwrap();

        assert!(brackets.is_empty());
    }

    // =========================================================================
    // replace_ledger tests
    // =========================================================================

    fn snapshot_with(tax_records: Vec<TaxPaymentRecord>) -> LedgerSnapshot {
        LedgerSnapshot {
            profile: TaxProfile {
                default_tax_rate: dec!(0.25),
                ..TaxProfile::default()
            },
            income_records: vec![income(7, date(2024, 6, 1), dec!(900))],
            tax_records,
            bracket_schedules: vec![schedule(2024, FilingStatusCode::Single)],
            ..LedgerSnapshot::default()
        }
    }

    #[tokio::test]
    async fn test_replace_ledger_swaps_everything() {
        let repo = setup_test_db().await;
        repo.save_income_record(&income(1, date(2024, 1, 1), dec!(1)))
            .await
            .unwrap();
        let snapshot = snapshot_with(vec![tax_record(3, date(2024, 6, 1), true)]);

        repo.replace_ledger(&snapshot).await.unwrap();

        assert_eq!(repo.load_profile().await.unwrap(), snapshot.profile);
        assert_eq!(repo.list_income_records().await.unwrap(), snapshot.income_records);
        assert_eq!(repo.list_tax_records().await.unwrap(), snapshot.tax_records);
        assert_eq!(
            repo.get_tax_brackets(2024, FilingStatusCode::Single)
                .await
                .unwrap(),
            snapshot.bracket_schedules[0].brackets
        );
    }

    #[tokio::test]
    async fn test_replace_ledger_rolls_back_on_rejected_row() {
        let repo = setup_test_db().await;
        let before = income(1, date(2024, 1, 1), dec!(1));
        repo.save_income_record(&before).await.unwrap();
        let mut broken = tax_record(3, date(2024, 6, 1), true);
        broken.paid_at = None;

        let result = repo.replace_ledger(&snapshot_with(vec![broken])).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
        assert_eq!(repo.load_profile().await.unwrap(), TaxProfile::default());
        assert_eq!(repo.list_income_records().await.unwrap(), vec![before]);
        assert!(repo.list_tax_records().await.unwrap().is_empty());
        assert!(repo.list_bracket_schedules().await.unwrap().is_empty());
    }
}
