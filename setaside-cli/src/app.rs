//! Command handlers for the `setaside` binary.
//!
//! Handlers write human-readable output to any [`Write`] so they can be
//! exercised in tests without a terminal.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use setaside_core::calculations::{
    DeductionCatalog, IncomeProjection, MonthlyReminder, PaymentFilter, PaymentSchedule,
    PenaltyEstimator, PeriodFilter, PriorYear, TaxYearSummaryCalculator, WithholdingAdjustment,
    estimate,
};
use setaside_core::db::{MemoryRepositoryFactory, RepositoryRegistry};
use setaside_core::input::{parse_amount, parse_percent};
use setaside_core::{
    FilingStatusCode, LedgerSnapshot, LedgerStore, NewIncomeRecord, TaxYearConfig, TaxationMode,
};
use setaside_db_json::JsonRepositoryFactory;
use setaside_db_sqlite::SqliteRepositoryFactory;

use crate::utils::{format_money, format_percent, opt_date_display, parse_date, parse_id};

/// Registry with every backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(JsonRepositoryFactory));
    registry.register(Box::new(MemoryRepositoryFactory));
    registry
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Quick set-aside estimate; does not touch the ledger.
    Estimate(EstimateArgs),

    /// Record and review income.
    #[command(subcommand)]
    Income(IncomeCommand),

    /// Monthly tax records derived from paid income.
    #[command(subcommand)]
    Taxes(TaxCommand),

    /// Default rates, currency and reminder.
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Next estimated-payment due date and monthly reminder.
    Due {
        /// Reference date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        from: Option<String>,
    },

    /// Full-year projection with self-employment tax and safe harbor.
    Summary(SummaryArgs),

    /// Write the whole ledger to a JSON file.
    Export { path: PathBuf },

    /// Replace the ledger with a JSON file written by `export`.
    Import { path: PathBuf },
}

#[derive(Debug, Args)]
pub struct EstimateArgs {
    /// Gross income for the period; defaults to all income recorded this
    /// month.
    #[arg(long)]
    pub gross: Option<String>,

    /// Deductible expenses.
    #[arg(long, default_value = "0")]
    pub deductions: String,

    /// Income tax rate in percent; defaults to the profile rate.
    #[arg(long)]
    pub tax_rate: Option<String>,

    /// Social contribution rate in percent, added to the tax rate.
    #[arg(long, default_value = "0")]
    pub social_rate: String,

    /// Extra reserve rate in percent; defaults to the profile rate.
    #[arg(long)]
    pub extra: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum IncomeCommand {
    /// Add an income record and regenerate tax records.
    Add {
        #[arg(long)]
        client: String,
        #[arg(long)]
        amount: String,
        /// YYYY-MM-DD; defaults to today.
        #[arg(long)]
        date: Option<String>,
        /// The invoice has not been paid yet.
        #[arg(long)]
        unpaid: bool,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// List income, newest first.
    List {
        /// this_month, last_3_months, this_year or all_time.
        #[arg(long, default_value = "all_time")]
        period: String,
        /// all, paid or unpaid.
        #[arg(long, default_value = "all")]
        status: String,
    },
    /// Flip the paid flag of an income record.
    Toggle { id: String },
    /// Delete an income record.
    Remove { id: String },
}

#[derive(Debug, Subcommand)]
pub enum TaxCommand {
    /// List tax records, newest period first.
    List,
    /// Mark a tax record as paid.
    Pay { id: String },
    /// Flip the paid flag of a tax record.
    Toggle { id: String },
    /// Delete a tax record until the next regeneration.
    Remove { id: String },
    /// Rebuild tax records from income.
    Regenerate,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    Show,
    Set(ProfileArgs),
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub country: Option<String>,
    /// freelancer, self_employed or contractor.
    #[arg(long)]
    pub mode: Option<String>,
    /// Percent.
    #[arg(long)]
    pub tax_rate: Option<String>,
    /// Percent.
    #[arg(long)]
    pub reserve_rate: Option<String>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long)]
    pub reminder_day: Option<u32>,
    #[arg(long)]
    pub reminder_hour: Option<u32>,
    #[arg(long)]
    pub reminder_minute: Option<u32>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Annual gross income; projected from this year's paid income when
    /// omitted.
    #[arg(long)]
    pub gross: Option<String>,
    #[arg(long)]
    pub year: Option<i32>,
    /// S, MFJ, MFS, HOH or QSS.
    #[arg(long, default_value = "S")]
    pub status: String,
    #[arg(long)]
    pub prior_agi: Option<String>,
    #[arg(long)]
    pub prior_tax: Option<String>,
    /// Estimated tax paid so far; defaults to paid tax records for the year.
    #[arg(long)]
    pub paid: Option<String>,
    /// Installments already due; defaults to those on or before today.
    #[arg(long)]
    pub quarters: Option<u32>,
    #[arg(long, default_value_t = 0)]
    pub days_late: i64,
}

/// Runs `command` against `store` as of `now`.
pub async fn run<W: Write>(
    store: &LedgerStore,
    command: Command,
    now: NaiveDateTime,
    out: &mut W,
) -> Result<()> {
    let today = now.date();
    debug!(?command, %today, "Running command");
    match command {
        Command::Estimate(args) => run_estimate(store, args, today, out).await,
        Command::Income(cmd) => run_income(store, cmd, today, out).await,
        Command::Taxes(cmd) => run_taxes(store, cmd, out).await,
        Command::Profile(cmd) => run_profile(store, cmd, out).await,
        Command::Due { from } => run_due(store, from, now, out).await,
        Command::Summary(args) => run_summary(store, args, today, out).await,
        Command::Export { path } => {
            let snapshot = store.export_snapshot().await?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(&path, json)
                .with_context(|| format!("cannot write '{}'", path.display()))?;
            writeln!(
                out,
                "Exported {} income and {} tax records to {}",
                snapshot.income_records.len(),
                snapshot.tax_records.len(),
                path.display()
            )?;
            Ok(())
        }
        Command::Import { path } => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read '{}'", path.display()))?;
            let snapshot: LedgerSnapshot = serde_json::from_str(&data)
                .with_context(|| format!("'{}' is not a ledger export", path.display()))?;
            let (income, taxes) = (snapshot.income_records.len(), snapshot.tax_records.len());
            store.import_snapshot(snapshot).await?;
            writeln!(out, "Imported {income} income and {taxes} tax records")?;
            Ok(())
        }
    }
}

async fn run_estimate<W: Write>(
    store: &LedgerStore,
    args: EstimateArgs,
    today: NaiveDate,
    out: &mut W,
) -> Result<()> {
    let profile = store.profile().await?;
    let gross = match args.gross.as_deref() {
        Some(gross) => parse_amount(gross),
        None => {
            let count = store.income(PeriodFilter::ThisMonth, today).await?.len();
            writeln!(out, "From {count} records this month")?;
            store.gross_for(PeriodFilter::ThisMonth, today).await?
        }
    };
    let tax_rate = args
        .tax_rate
        .as_deref()
        .map_or(profile.default_tax_rate, parse_percent)
        + parse_percent(&args.social_rate);
    let extra = args
        .extra
        .as_deref()
        .map_or(profile.default_reserve_extra_rate, parse_percent);

    let result = estimate(
        gross,
        parse_amount(&args.deductions),
        tax_rate,
        extra,
    );

    let currency = profile.currency_code.as_str();
    writeln!(
        out,
        "Taxable income:  {}",
        format_money(result.taxable_income, currency)
    )?;
    writeln!(
        out,
        "Estimated tax:   {} ({})",
        format_money(result.estimated_tax, currency),
        format_percent(tax_rate)
    )?;
    writeln!(
        out,
        "Extra reserve:   {} ({})",
        format_money(result.reserve_extra, currency),
        format_percent(extra)
    )?;
    writeln!(
        out,
        "Set aside:       {}",
        format_money(result.total_set_aside, currency)
    )?;
    Ok(())
}

async fn run_income<W: Write>(
    store: &LedgerStore,
    command: IncomeCommand,
    today: NaiveDate,
    out: &mut W,
) -> Result<()> {
    let currency = store.profile().await?.currency_code;
    match command {
        IncomeCommand::Add {
            client,
            amount,
            date,
            unpaid,
            note,
        } => {
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let record = store
                .add_income(NewIncomeRecord {
                    date,
                    client_name: client.trim().to_string(),
                    amount: parse_amount(&amount),
                    is_paid: !unpaid,
                    note,
                })
                .await?;
            writeln!(
                out,
                "Added {} from {} on {} ({})",
                format_money(record.amount, &currency),
                record.client_name,
                record.date,
                record.id
            )?;
        }
        IncomeCommand::List { period, status } => {
            let filter = PeriodFilter::parse(&period)
                .ok_or_else(|| anyhow!("unknown period '{period}'"))?;
            let payment = PaymentFilter::parse(status.trim())
                .ok_or_else(|| anyhow!("unknown payment status '{status}'"))?;
            let records: Vec<_> = store
                .income(filter, today)
                .await?
                .into_iter()
                .filter(|r| payment.matches(r.is_paid))
                .collect();
            for r in &records {
                writeln!(
                    out,
                    "{}  {}  {:<20}  {:>18}  {:<6}  {}",
                    r.id,
                    r.date,
                    r.client_name,
                    format_money(r.amount, &currency),
                    if r.is_paid { "paid" } else { "unpaid" },
                    r.note
                )?;
            }
            let gross = records
                .iter()
                .fold(Decimal::ZERO, |total, r| total.saturating_add(r.amount));
            writeln!(
                out,
                "{} records, total {}",
                records.len(),
                format_money(gross, &currency)
            )?;
        }
        IncomeCommand::Toggle { id } => {
            let record = store.toggle_income_paid(parse_id(&id)?).await?;
            let state = if record.is_paid { "paid" } else { "unpaid" };
            writeln!(out, "Income {} is now {}", record.id, state)?;
        }
        IncomeCommand::Remove { id } => {
            let id = parse_id(&id)?;
            store.remove_income(id).await?;
            writeln!(out, "Removed income {id}")?;
        }
    }
    Ok(())
}

async fn run_taxes<W: Write>(
    store: &LedgerStore,
    command: TaxCommand,
    out: &mut W,
) -> Result<()> {
    let currency = store.profile().await?.currency_code;
    match command {
        TaxCommand::List => {
            let overview = store.tax_overview().await?;
            for r in overview.unpaid.iter().chain(&overview.paid) {
                writeln!(
                    out,
                    "{}  {:<14}  taxable {:>18}  due {:>18}  {}",
                    r.id,
                    r.period_label,
                    format_money(r.taxable_income, &currency),
                    format_money(r.amount_due, &currency),
                    if r.is_paid {
                        let paid_on = r.paid_at.map(|t| t.date_naive());
                        format!("paid {}", opt_date_display(paid_on))
                    } else {
                        "unpaid".to_string()
                    }
                )?;
            }
            writeln!(
                out,
                "Next amount due: {}",
                format_money(overview.next_amount_due, &currency)
            )?;
        }
        TaxCommand::Pay { id } => {
            let record = store.mark_tax_paid(parse_id(&id)?).await?;
            writeln!(
                out,
                "Marked {} paid ({})",
                record.period_label,
                format_money(record.amount_due, &currency)
            )?;
        }
        TaxCommand::Toggle { id } => {
            let record = store.toggle_tax_paid(parse_id(&id)?).await?;
            let state = if record.is_paid { "paid" } else { "unpaid" };
            writeln!(out, "{} is now {}", record.period_label, state)?;
        }
        TaxCommand::Remove { id } => {
            let id = parse_id(&id)?;
            store.remove_tax_record(id).await?;
            writeln!(out, "Removed tax record {id}")?;
        }
        TaxCommand::Regenerate => {
            let records = store.regenerate().await?;
            writeln!(out, "{} tax records on file", records.len())?;
        }
    }
    Ok(())
}

async fn run_profile<W: Write>(
    store: &LedgerStore,
    command: ProfileCommand,
    out: &mut W,
) -> Result<()> {
    let mut profile = store.profile().await?;
    if let ProfileCommand::Set(args) = command {
        if let Some(country) = args.country {
            profile.country_code = country.trim().to_uppercase();
        }
        if let Some(mode) = args.mode {
            profile.taxation_mode = TaxationMode::parse(mode.trim())
                .ok_or_else(|| anyhow!("unknown taxation mode '{mode}'"))?;
        }
        if let Some(rate) = args.tax_rate {
            profile.default_tax_rate = parse_percent(&rate);
        }
        if let Some(rate) = args.reserve_rate {
            profile.default_reserve_extra_rate = parse_percent(&rate);
        }
        if let Some(currency) = args.currency {
            profile.currency_code = currency.trim().to_uppercase();
        }
        if let Some(day) = args.reminder_day {
            profile.reminder.day = day;
        }
        if let Some(hour) = args.reminder_hour {
            profile.reminder.hour = hour;
        }
        if let Some(minute) = args.reminder_minute {
            profile.reminder.minute = minute;
        }
        let records = store.update_profile(profile).await?;
        writeln!(out, "Profile saved; {} tax records recalculated", records.len())?;
        profile = store.profile().await?;
    }

    writeln!(out, "Country:        {}", profile.country_code)?;
    writeln!(out, "Mode:           {}", profile.taxation_mode.as_str())?;
    writeln!(out, "Tax rate:       {}", format_percent(profile.default_tax_rate))?;
    writeln!(
        out,
        "Extra reserve:  {}",
        format_percent(profile.default_reserve_extra_rate)
    )?;
    writeln!(out, "Currency:       {}", profile.currency_code)?;
    writeln!(
        out,
        "Reminder:       day {} at {:02}:{:02}",
        profile.reminder.day, profile.reminder.hour, profile.reminder.minute
    )?;
    Ok(())
}

async fn run_due<W: Write>(
    store: &LedgerStore,
    from: Option<String>,
    now: NaiveDateTime,
    out: &mut W,
) -> Result<()> {
    let from = from.as_deref().map(parse_date).transpose()?.unwrap_or(now.date());
    let schedule = PaymentSchedule::us_federal();

    match schedule.next_due_date(from) {
        Some(due) => writeln!(
            out,
            "Next payment: {} {} due {} (in {} days)",
            due.tax_year,
            due.label,
            due.date,
            (due.date - from).num_days()
        )?,
        None => writeln!(out, "No upcoming payment date")?,
    }

    let profile = store.profile().await?;
    let reminder = MonthlyReminder::new(profile.reminder);
    let after = if from == now.date() { now } else { from.and_time(NaiveTime::MIN) };
    match reminder.next_fire(after) {
        Some(at) => writeln!(out, "Next reminder: {}", at.format("%Y-%m-%d %H:%M"))?,
        None => writeln!(out, "No reminder scheduled")?,
    }
    Ok(())
}

async fn run_summary<W: Write>(
    store: &LedgerStore,
    args: SummaryArgs,
    today: NaiveDate,
    out: &mut W,
) -> Result<()> {
    let year = args.year.unwrap_or(today.year());
    let currency = store.profile().await?.currency_code;
    let filing_status = FilingStatusCode::parse(&args.status.trim().to_uppercase())
        .ok_or_else(|| anyhow!("unknown filing status '{}'", args.status))?;

    let mut config = TaxYearConfig::us_2023();
    if year != config.tax_year {
        warn!(year, "No self-employment parameters for this year; using 2023 values");
        config.tax_year = year;
    }

    let gross = match args.gross.as_deref() {
        Some(gross) => parse_amount(gross),
        None => {
            let as_of = if year == today.year() {
                today
            } else {
                NaiveDate::from_ymd_opt(year, 12, 31)
                    .ok_or_else(|| anyhow!("year {year} out of range"))?
            };
            let income = store.income(PeriodFilter::AllTime, today).await?;
            let projection = IncomeProjection::from_income(&income, as_of);
            writeln!(
                out,
                "Projected from {} over {} months",
                format_money(projection.ytd_income, &currency),
                projection.months_elapsed
            )?;
            projection.projected_annual_income
        }
    };

    let prior_year = match (args.prior_agi.as_deref(), args.prior_tax.as_deref()) {
        (Some(agi), Some(tax)) => Some(PriorYear {
            agi: parse_amount(agi),
            tax: parse_amount(tax),
        }),
        (None, None) => None,
        _ => bail!("--prior-agi and --prior-tax must be given together"),
    };

    let brackets = store.bracket_table(year, filing_status).await?;
    let calculator = TaxYearSummaryCalculator::new(
        config,
        brackets,
        DeductionCatalog::freelancer_default(),
    )?;
    let summary = calculator.summarize(gross, prior_year);

    let paid = match args.paid.as_deref() {
        Some(paid) => parse_amount(paid),
        None => store
            .tax_records()
            .await?
            .iter()
            .filter(|r| r.is_paid && r.period_start.year() == year)
            .map(|r| r.amount_due)
            .sum::<Decimal>(),
    };
    let quarters = args.quarters.unwrap_or_else(|| {
        PaymentSchedule::us_federal()
            .due_dates(year)
            .iter()
            .filter(|due| due.date <= today)
            .count() as u32
    });
    let adjustment = WithholdingAdjustment::for_summary(
        &summary,
        paid,
        quarters,
        args.days_late,
        &PenaltyEstimator::default(),
    );

    let m = |d: Decimal| format_money(d, &currency);
    writeln!(out, "Tax year {} ({})", summary.tax_year, filing_status.label())?;
    writeln!(out, "Gross income:            {}", m(summary.gross_income))?;
    writeln!(out, "Deductions:              {}", m(summary.deductions))?;
    writeln!(out, "Net earnings:            {}", m(summary.net_earnings))?;
    writeln!(out, "Self-employment tax:     {}", m(summary.self_employment.total))?;
    writeln!(
        out,
        "Adjusted gross income:   {}",
        m(summary.adjusted_gross_income)
    )?;
    writeln!(out, "Taxable income:          {}", m(summary.taxable_income))?;
    writeln!(out, "Federal income tax:      {}", m(summary.federal_income_tax))?;
    writeln!(out, "Total tax:               {}", m(summary.total_tax))?;
    writeln!(
        out,
        "Effective rate:          {}",
        format_percent(summary.effective_rate)
    )?;
    writeln!(out, "Safe-harbor minimum:     {}", m(summary.safe_harbor_minimum))?;
    writeln!(out, "Quarterly installment:   {}", m(summary.quarterly_installment))?;
    writeln!(out, "Paid so far:             {}", m(adjustment.paid_so_far))?;
    writeln!(out, "Remaining balance:       {}", m(adjustment.remaining_balance))?;
    writeln!(out, "Per remaining quarter:   {}", m(adjustment.recommended_per_quarter))?;
    if adjustment.penalty_risk {
        writeln!(
            out,
            "Underpayment risk: short {} after {} installments, est. penalty {}",
            m(adjustment.shortfall),
            adjustment.quarters_elapsed,
            m(adjustment.estimated_penalty)
        )?;
    }
    Ok(())
}
