//! Logging initialisation for the vmstage binary.
//!
//! Events go to stderr, filtered by `RUST_LOG` (default `info`). When
//! `VMSTAGE_LOG_DIR` is set, the same events are also written to
//! `vmstage.log` in that directory. A log directory that cannot be
//! created or written falls back to stderr only.
//!
//! Keep the returned guard alive for the duration of the process so that
//! buffered log lines are flushed on exit.

use crate::constants::env;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE: &str = "vmstage.log";

pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialise the global tracing subscriber. Call once from `main`.
pub fn init() -> LogGuard {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (appender, file_error) = match log_dir().map(|dir| file_appender(&dir)) {
        Some(Ok(appender)) => (Some(appender), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    let file_guard = match appender {
        Some(file_appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();

            None
        }
    };

    if let Some(e) = file_error {
        tracing::warn!(error = %e, "File logging disabled, logging to stderr only");
    }

    LogGuard {
        _file_guard: file_guard,
    }
}

fn log_dir() -> Option<PathBuf> {
    std::env::var_os(env::LOG_DIR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create log directory {}: {}", dir.display(), e))?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(dir)
        .map_err(|e| format!("cannot open log file in {}: {}", dir.display(), e))
}
