use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingSettings;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::builder()
        .parse_lossy(std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| level.to_string()))
}

/// Install the global subscriber: a compact stderr layer and, when
/// `settings.file` is set, a plain-text file layer.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole run.
pub fn init_logging(settings: &LoggingSettings) -> Option<WorkerGuard> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(&settings.level));

    let Some(file) = &settings.file else {
        tracing_subscriber::registry().with(stderr_layer).init();
        return None;
    };

    let directory = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if let Err(e) = std::fs::create_dir_all(directory) {
        eprintln!("Warning: Failed to create log directory {directory:?}: {e}");
    }
    let file_name = file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "release-helper.log".into());

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(env_filter(&settings.level));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Some(guard)
}
