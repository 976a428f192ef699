use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use tracing::debug;

use setaside_cli::app::{self, Command};
use setaside_cli::config::{AppConfig, DEFAULT_CONFIG_FILE};
use setaside_cli::logging;
use setaside_core::LedgerStore;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Track freelance income and how much of it to set aside for taxes.
///
/// Settings come from a TOML file; `--backend`, `--db` and `--log-level`
/// override it for a single run.
#[derive(Debug, Parser)]
#[command(name = "setaside", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Database backend: sqlite, json or memory.
    #[arg(long)]
    backend: Option<String>,

    /// Connection string: a SQLite file or URL, or a JSON file path.
    #[arg(long)]
    db: Option<String>,

    /// Log level or EnvFilter directive.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)?.with_overrides(cli.backend, cli.db, cli.log_level);
    logging::init_logging(&config.logging.level, config.logging.file.as_deref())?;

    let db_config = config.db_config();
    debug!("connecting to {} backend", db_config.backend);
    let registry = app::build_registry();
    let repo = registry.create(&db_config).await?;
    let store = LedgerStore::with_system_minter(repo);

    let mut stdout = std::io::stdout().lock();
    app::run(&store, cli.command, Local::now().naive_local(), &mut stdout).await
}
