use std::path::Path;

use anyhow::Context;
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, EnvFilter, Layer,
};

pub const LOG_ENV: &str = "PROPBOOK_LOG";
pub const LOG_FILE_NAME: &str = "propbook.log";
const DEFAULT_FILTER: &str = "propbook=info";
const MAX_LOG_BYTES: usize = 5 * 1024 * 1024;
const MAX_ROTATED_FILES: usize = 3;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(unix)]
fn rotating_file(path: &Path) -> FileRotate<AppendCount> {
    FileRotate::new(
        path,
        AppendCount::new(MAX_ROTATED_FILES),
        ContentLimit::Bytes(MAX_LOG_BYTES),
        Compression::None,
        None,
    )
}

#[cfg(not(unix))]
fn rotating_file(path: &Path) -> FileRotate<AppendCount> {
    FileRotate::new(
        path,
        AppendCount::new(MAX_ROTATED_FILES),
        ContentLimit::Bytes(MAX_LOG_BYTES),
        Compression::None,
    )
}

/// Stderr-only logging for contexts without a data directory.
pub fn init_stderr() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        let _ = tracing_log::LogTracer::init();
    }
}

/// Installs the JSON file sink under `logs_dir` plus warnings on stderr.
///
/// The file sink is non-blocking: keep the returned guard alive until exit,
/// dropping it flushes buffered lines.
pub fn init(logs_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("create log directory {}", logs_dir.display()))?;

    let sink = rotating_file(&logs_dir.join(LOG_FILE_NAME));
    let (writer, guard) = tracing_appender::non_blocking(sink);

    let file_layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(env_filter());
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer);
    tracing::subscriber::set_global_default(subscriber).context("install tracing subscriber")?;
    // Another logger may already own the `log` facade; tracing events still flow.
    let _ = tracing_log::LogTracer::init();
    Ok(guard)
}
