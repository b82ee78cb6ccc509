use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File-only logging; the terminal belongs to the UI.
///
/// The returned guard flushes pending lines on drop and must be held for the
/// lifetime of the program.
pub fn init_logger(log_dir: &Path) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let log_level =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,crm_tui=debug".to_string());
    let filter = EnvFilter::try_new(&log_level)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "crm-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_ansi(false),
        )
        .try_init()?;

    Ok(guard)
}
