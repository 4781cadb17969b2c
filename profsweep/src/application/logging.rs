use std::path::Path;

use profsweep_core::error::{ProfileError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "profsweep=info,profsweep_core=info";
pub const LOG_FILE: &str = "profsweep.log";

/// Log to stderr and append to `<dir>/profsweep.log`.
///
/// Keep the returned guard alive for the whole run; dropping it stops the
/// background writer.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let file_appender = RollingFileAppender::new(Rotation::NEVER, dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::builder()
        .parse_lossy(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_owned()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(non_blocking),
        )
        .try_init()
        .map_err(|e| ProfileError::Unrecoverable(format!("logging setup: {e}")))?;
    Ok(guard)
}
