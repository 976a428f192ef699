use std::path::{Path, PathBuf};

use async_trait::async_trait;
use setaside_core::{
    BracketSchedule, FilingStatusCode, IncomeRecord, LEDGER_SCHEMA_VERSION, LedgerRepository,
    LedgerSnapshot, RepositoryError, TaxBracket, TaxPaymentRecord, TaxProfile,
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

const TMP_SUFFIX: &str = "tmp";

/// Ledger stored as one pretty-printed JSON document.
///
/// The file is read once on [`open`](Self::open); afterwards the in-memory
/// copy is authoritative and every mutation is written through.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    state: Mutex<LedgerSnapshot>,
}

impl JsonFileRepository {
    /// Opens `path`, starting from an empty ledger when the file is missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(data) => parse_snapshot(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Ledger file not found, starting empty");
                LedgerSnapshot::default()
            }
            Err(e) => {
                return Err(RepositoryError::Connection(format!(
                    "Failed to read '{}': {}",
                    path.display(),
                    e
                )));
            }
        };
        Ok(Self {
            path,
            state: Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the ledger, persists it, then swaps it
    /// in. A failed write leaves both the file and memory untouched.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut LedgerSnapshot) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let out = change(&mut next)?;
        next.normalize();
        save_snapshot(&self.path, &next).await?;
        *state = next;
        Ok(out)
    }
}

fn parse_snapshot(data: &str) -> Result<LedgerSnapshot, RepositoryError> {
    let mut snapshot: LedgerSnapshot =
        serde_json::from_str(data).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    if !snapshot.is_supported() {
        return Err(RepositoryError::UnsupportedSchema {
            found: snapshot.schema_version,
            supported: LEDGER_SCHEMA_VERSION,
        });
    }
    snapshot.schema_version = LEDGER_SCHEMA_VERSION;
    snapshot.normalize();
    Ok(snapshot)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

async fn save_snapshot(
    path: &Path,
    snapshot: &LedgerSnapshot,
) -> Result<(), RepositoryError> {
    let data = serde_json::to_string_pretty(snapshot)
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    let io_err = |e: std::io::Error| {
        RepositoryError::Database(format!("Failed to write '{}': {}", path.display(), e))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, data.as_bytes()).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    debug!(path = %path.display(), bytes = data.len(), "Ledger written");
    Ok(())
}

#[async_trait]
impl LedgerRepository for JsonFileRepository {
    async fn load_profile(&self) -> Result<TaxProfile, RepositoryError> {
        Ok(self.state.lock().await.profile.clone())
    }

    async fn save_profile(&self, profile: &TaxProfile) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            s.profile = profile.clone();
            Ok(())
        })
        .await
    }

    async fn list_income_records(&self) -> Result<Vec<IncomeRecord>, RepositoryError> {
        Ok(self.state.lock().await.income_records.clone())
    }

    async fn get_income_record(&self, id: Uuid) -> Result<IncomeRecord, RepositoryError> {
        self.state
            .lock()
            .await
            .income_record(id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_income_record(&self, record: &IncomeRecord) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            s.upsert_income_record(record.clone());
            Ok(())
        })
        .await
    }

    async fn save_income_records(
        &self,
        records: &[IncomeRecord],
    ) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            for record in records {
                s.upsert_income_record(record.clone());
            }
            Ok(())
        })
        .await
    }

    async fn delete_income_record(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            if s.remove_income_record(id) {
                Ok(())
            } else {
                Err(RepositoryError::NotFound)
            }
        })
        .await
    }

    async fn replace_income_records(
        &self,
        records: &[IncomeRecord],
    ) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            s.income_records = records.to_vec();
            Ok(())
        })
        .await
    }

    async fn list_tax_records(&self) -> Result<Vec<TaxPaymentRecord>, RepositoryError> {
        Ok(self.state.lock().await.tax_records.clone())
    }

    async fn replace_tax_records(
        &self,
        records: &[TaxPaymentRecord],
    ) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            s.tax_records = records.to_vec();
            Ok(())
        })
        .await
    }

    async fn update_tax_record(&self, record: &TaxPaymentRecord) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            if s.update_tax_record(record.clone()) {
                Ok(())
            } else {
                Err(RepositoryError::NotFound)
            }
        })
        .await
    }

    async fn delete_tax_record(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            if s.remove_tax_record(id) {
                Ok(())
            } else {
                Err(RepositoryError::NotFound)
            }
        })
        .await
    }

    async fn get_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        Ok(self.state.lock().await.brackets_for(tax_year, filing_status))
    }

    async fn replace_tax_brackets(
        &self,
        schedule: &BracketSchedule,
    ) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            s.replace_bracket_schedule(schedule.clone());
            Ok(())
        })
        .await
    }

    async fn list_bracket_schedules(&self) -> Result<Vec<BracketSchedule>, RepositoryError> {
        Ok(self.state.lock().await.bracket_schedules.clone())
    }

    async fn replace_ledger(&self, snapshot: &LedgerSnapshot) -> Result<(), RepositoryError> {
        self.mutate(|s| {
            s.replace_with(snapshot);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn income(id: u128, day: u32) -> IncomeRecord {
        IncomeRecord {
            id: Uuid::from_u128(id),
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            client_name: "Globex".to_string(),
            amount: dec!(800.00),
            is_paid: false,
            note: String::new(),
        }
    }

    // =========================================================================
    // open tests
    // =========================================================================

    #[tokio::test]
    async fn open_missing_file_starts_empty_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let repo = JsonFileRepository::open(&path).await.unwrap();

        assert_eq!(repo.list_income_records().await, Ok(Vec::new()));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn open_rejects_newer_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut snapshot = LedgerSnapshot::default();
        snapshot.schema_version = LEDGER_SCHEMA_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let result = JsonFileRepository::open(&path).await;

        assert_eq!(
            result.err(),
            Some(RepositoryError::UnsupportedSchema {
                found: LEDGER_SCHEMA_VERSION + 1,
                supported: LEDGER_SCHEMA_VERSION,
            })
        );
    }

    #[tokio::test]
    async fn open_reports_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileRepository::open(&path).await;

        assert!(matches!(result, Err(RepositoryError::Serialization(_))));
    }

    // =========================================================================
    // write-through tests
    // =========================================================================

    #[tokio::test]
    async fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let repo = JsonFileRepository::open(&path).await.unwrap();
        repo.save_income_record(&income(1, 3)).await.unwrap();
        repo.save_income_record(&income(2, 9)).await.unwrap();
        repo.delete_income_record(Uuid::from_u128(1)).await.unwrap();

        let reopened = JsonFileRepository::open(&path).await.unwrap();

        assert_eq!(reopened.list_income_records().await, Ok(vec![income(2, 9)]));
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn failed_mutation_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::open(dir.path().join("ledger.json"))
            .await
            .unwrap();
        repo.save_income_record(&income(1, 3)).await.unwrap();

        let result = repo.delete_income_record(Uuid::from_u128(7)).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
        assert_eq!(repo.list_income_records().await, Ok(vec![income(1, 3)]));
    }

    #[tokio::test]
    async fn save_income_records_writes_batch_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let repo = JsonFileRepository::open(&path).await.unwrap();

        repo.save_income_records(&[income(1, 3), income(2, 9)])
            .await
            .unwrap();
        let reopened = JsonFileRepository::open(&path).await.unwrap();

        assert_eq!(
            reopened.list_income_records().await,
            Ok(vec![income(2, 9), income(1, 3)])
        );
    }

    #[tokio::test]
    async fn replace_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let repo = JsonFileRepository::open(&path).await.unwrap();
        repo.save_income_record(&income(1, 3)).await.unwrap();
        let mut snapshot = LedgerSnapshot::default();
        snapshot.profile.currency_code = "EUR".to_string();
        snapshot.income_records = vec![income(5, 20)];

        repo.replace_ledger(&snapshot).await.unwrap();
        let reopened = JsonFileRepository::open(&path).await.unwrap();

        assert_eq!(
            reopened.load_profile().await.map(|p| p.currency_code),
            Ok("EUR".to_string())
        );
        assert_eq!(reopened.list_income_records().await, Ok(vec![income(5, 20)]));
    }

    #[tokio::test]
    async fn bracket_schedules_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let repo = JsonFileRepository::open(&path).await.unwrap();
        let schedule = BracketSchedule {
            tax_year: 2024,
            filing_status: FilingStatusCode::Single,
            brackets: vec![
                TaxBracket::new(dec!(0), Some(dec!(11600)), dec!(0.10)),
                TaxBracket::new(dec!(11600), None, dec!(0.12)),
            ],
        };
        repo.replace_tax_brackets(&schedule).await.unwrap();

        let reopened = JsonFileRepository::open(&path).await.unwrap();

        assert_eq!(
            reopened
                .get_tax_brackets(2024, FilingStatusCode::Single)
                .await,
            Ok(schedule.brackets)
        );
    }

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("/data/ledger.json")),
            PathBuf::from("/data/ledger.json.tmp")
        );
        assert_eq!(tmp_path(Path::new("ledger")), PathBuf::from("ledger.tmp"));
    }
}
