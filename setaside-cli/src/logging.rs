use anyhow::{Context, Result};
use chrono::Local;
use std::{
    fs::File,
    io::{self, IsTerminal},
    path::Path,
    sync::Mutex,
};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Local-time timestamp, padded level and `file:line`, then the fields.
struct LocalFmt;

impl<S, N> FormatEvent<S, N> for LocalFmt
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
        if ansi {
            write!(writer, "\x1b[2m{timestamp}\x1b[0m ")?;
        } else {
            write!(writer, "{timestamp} ")?;
        }

        let color = match *meta.level() {
            Level::ERROR => "\x1b[1;31m",
            Level::WARN => "\x1b[1;33m",
            Level::INFO => "\x1b[1;32m",
            Level::DEBUG => "\x1b[1;34m",
            Level::TRACE => "\x1b[1;35m",
        };
        if ansi {
            write!(writer, "{color}{:>5}\x1b[0m ", meta.level())?;
        } else {
            write!(writer, "{:>5} ", meta.level())?;
        }

        if let (Some(target), Some(line)) = (meta.module_path(), meta.line()) {
            write!(writer, "{target}:{line} ")?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Builds the filter from `RUST_LOG`, else from `level`.
fn make_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{level}'")),
    }
}

/// Initializes logging. Call once at startup.
///
/// - Stderr: colored when attached to a terminal. Stdout is left to
///   command output.
/// - File: appended to when `file` is given.
/// - Level: `RUST_LOG` when set, otherwise `level`.
pub fn init_logging(
    level: &str,
    file: Option<&Path>,
) -> Result<()> {
    let filter = make_filter(level)?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(LocalFmt)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr);

    let file_layer = match file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file '{}'", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .event_format(LocalFmt)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("logging already initialized")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_filter_rejects_bad_directive() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(make_filter("info").is_ok());
        assert!(make_filter("setaside=loud").is_err());
    }
}
