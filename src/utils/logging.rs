//! Logging initialisation
//!
//! Structured JSON logging to stdout, optionally mirrored into a daily rolling
//! file when `WATCHER_LOG_DIR` is set.

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,status_watcher=debug";
const LOG_FILE_PREFIX: &str = "status-watcher.log";

/// Initialise the global tracing subscriber.
///
/// The level filter comes from `RUST_LOG` and defaults to `info,status_watcher=debug`.
/// When `WATCHER_LOG_DIR` is set, events are also written to
/// `<dir>/status-watcher.log.YYYY-MM-DD` through a non-blocking writer.
///
/// The returned guard must be held by `main` so buffered file output is
/// flushed on exit.
pub fn init_logging() -> Option<WorkerGuard> {
    let (file_writer, guard) = match std::env::var("WATCHER_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let file_appender = rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            (Some(writer), Some(guard))
        }
        _ => (None, None),
    };

    let stdout_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false);

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_current_span(true)
            .flatten_event(false)
            .with_ansi(false)
            .with_writer(writer)
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .or_else(|err| {
            use std::error::Error;
            if err
                .source()
                .and_then(|s| s.downcast_ref::<tracing::dispatcher::SetGlobalDefaultError>())
                .is_some()
            {
                // Already initialised (tests)
                return Ok(());
            }
            eprintln!("Failed to initialize tracing: {}", err);
            Err(err)
        })
        .ok();

    guard
}
