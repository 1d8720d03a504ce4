use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// until the job finishes.
pub fn init_logging() -> WorkerGuard {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    // Daily-rotated JSON log file
    let file_appender = tracing_appender::rolling::daily("logs", "ride_duration.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    // Respect RUST_LOG if set; otherwise info for our crate
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ride_duration=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
