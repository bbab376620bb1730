use crate::config::LoggingConfig;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber: JSON lines into a daily file under `config.dir`, plus
/// human-readable console output when `config.console` is set.
///
/// Keep the returned guard alive for the life of the process; dropping it flushes and
/// stops the file writer.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    if let Err(e) = fs::create_dir_all(&config.dir) {
        eprintln!("could not create log directory {}: {}", config.dir, e);
    }

    let file_appender = tracing_appender::rolling::daily(&config.dir, &config.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(writer);

    let console_layer = config
        .console
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stdout));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
