//! File logging for the REPL.
//!
//! Output goes to a daily rolling file so log lines never interleave with
//! the conversation on the terminal.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "cogniverse=info,warn";

/// Installs the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(logs_dir: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(logs_dir, "cogniverse.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // RUST_LOG overrides the default filter.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .init();

    tracing::info!(target: "cogniverse", "Logging to {}", logs_dir.display());
    guard
}
