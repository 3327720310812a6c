use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize tracing.
///
/// Without a log file only errors reach stderr so the progress panel stays
/// intact; `RUST_LOG` overrides the level either way. The returned guard must
/// live until exit to flush the file writer.
pub fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if log_file.is_some() { "rangedl=debug,warn" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().context("log file path has no file name")?;
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory: {:?}", dir))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false).with_target(true))
                .try_init()
                .context("Failed to initialize logging")?;
            Ok(Some(guard))
        }
        None => {
            registry
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .try_init()
                .context("Failed to initialize logging")?;
            Ok(None)
        }
    }
}
