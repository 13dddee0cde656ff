//! Tracing subscriber initialisation shared by all services

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence. Otherwise the configured level applies to
/// everything, with `extra_directives` (e.g. `"tower_http=debug"`) appended.
/// When `config.file` is set, events are also appended to that file without
/// ANSI colours by a background writer; keep the returned guard alive until
/// shutdown so buffered lines are flushed.
pub fn init_tracing(
    config: &LoggingConfig,
    extra_directives: &str,
) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        let directives = if extra_directives.is_empty() {
            config.level.clone()
        } else {
            format!("{},{}", config.level, extra_directives)
        };
        EnvFilter::try_new(directives)
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", config.level, e)))
    })?;

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Internal(format!("Tracing already initialised: {}", e)))?;

    Ok(guard)
}
