//! Logging setup for programs embedding the executor.
//!
//! The library itself only emits `tracing` events. Binaries call
//! [`init_logging`] once at startup to get:
//! - a log file, truncated at the start of each session
//! - the same events on stdout
//! - filtering through `RUST_LOG` (default `info`)

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize logging.
///
/// Creates `log_dir` if needed, clears the previous `log_file` and installs
/// the global subscriber.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the log file cannot
/// be cleared, or a global subscriber is already installed.
pub fn init_logging(log_dir: &Path, log_file: &str) -> Result<LoggingGuard, io::Error> {
    let (non_blocking_file, file_guard) = prepare_log_file(log_dir, log_file)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Initialize logging from the `[logging]` config section.
pub fn init_from_settings(settings: &LoggingSettings) -> Result<LoggingGuard, io::Error> {
    init_logging(&settings.directory, &settings.file)
}

/// Creates the directory, truncates the file and opens a non-blocking writer.
fn prepare_log_file(
    log_dir: &Path,
    log_file: &str,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    Ok(tracing_appender::non_blocking(file_appender))
}
