//! Subscriber setup for the `persona-digest` binary.
//!
//! Collection progress and per-collection failures print to stdout. Setting `DIGEST_LOG_FILE`
//! also appends every event to that file, which keeps a record of long batch runs.
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILE_VAR: &str = "DIGEST_LOG_FILE";

const DEFAULT_FILTER: &str = "info";

// Dropping the guard stops the appender thread, so it lives for the whole process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = fmt::layer().with_target(false).compact();
    let file = std::env::var(LOG_FILE_VAR)
        .ok()
        .and_then(|path| open_log_file(Path::new(&path)))
        .map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact()
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
}

fn open_log_file(path: &Path) -> Option<NonBlocking> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Cannot create log directory {}: {err}", parent.display());
            return None;
        }
    }
    let file = match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Cannot open log file {}: {err}", path.display());
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = FILE_GUARD.set(guard);
    Some(writer)
}
