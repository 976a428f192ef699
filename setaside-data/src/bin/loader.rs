use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use setaside_core::LedgerStore;
use setaside_data::{BracketScheduleLoader, IncomeCsvLoader};
use setaside_db_sqlite::{SqliteRepository, connection_url};
use tracing_subscriber::EnvFilter;

/// Load bracket schedules and/or income history from CSV into a ledger.
///
/// Bracket CSV columns: tax_year, schedule (X, Y-1, Y-2, Z), lower_bound,
/// upper_bound (empty for the top bracket), rate.
///
/// Income CSV columns: date (YYYY-MM-DD), client_name, amount, and the
/// optional is_paid and note.
#[derive(Parser, Debug)]
#[command(name = "setaside-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV file with bracket schedules
    #[arg(short, long)]
    brackets: Option<PathBuf>,

    /// CSV file with income records
    #[arg(short, long)]
    income: Option<PathBuf>,

    /// SQLite database URL or file path
    #[arg(short, long, default_value = "sqlite:setaside.db?mode=rwc")]
    database: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    if args.brackets.is_none() && args.income.is_none() {
        bail!("nothing to load: pass --brackets and/or --income");
    }

    let repo = SqliteRepository::new(&connection_url(&args.database))
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;
    repo.run_migrations()
        .await
        .context("Failed to run migrations")?;
    let store = LedgerStore::with_system_minter(Box::new(repo));

    if let Some(path) = &args.brackets {
        println!("Loading bracket schedules from: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = BracketScheduleLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        let inserted = BracketScheduleLoader::load(store.repository(), &records)
            .await
            .context("Failed to load bracket schedules")?;
        println!("Loaded {} brackets from {} rows.", inserted, records.len());
    }

    if let Some(path) = &args.income {
        println!("Loading income from: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = IncomeCsvLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        let added = IncomeCsvLoader::load(&store, records)
            .await
            .context("Failed to import income")?;
        let tax_records = store.tax_records().await?;
        println!(
            "Imported {} income records; {} monthly tax records now on file.",
            added.len(),
            tax_records.len()
        );
    }

    Ok(())
}
