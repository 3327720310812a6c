use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use rangedl::cli::{self, DEFAULT_THREADS, MAX_THREADS, MIN_THREADS};
use rangedl::commands::{self, RunOptions};
use rangedl::logging;
use rangedl::panel::DrawTarget;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "rangedl [OPTIONS] <URL> <FILE> [<URL> <FILE>...]")]
struct Args {
    /// URL and destination file name pairs
    #[arg(value_name = "URL FILE", required = true, num_args = 2..)]
    pairs: Vec<String>,

    /// Directory to save downloaded files (defaults to the current directory)
    #[arg(short = 'd', long = "dir")]
    dir: Option<PathBuf>,

    /// Number of range workers per download
    #[arg(
        short = 't',
        long,
        default_value_t = DEFAULT_THREADS,
        value_parser = clap::value_parser!(u8).range(MIN_THREADS as i64..=MAX_THREADS as i64)
    )]
    threads: u8,

    /// Progress panel refresh interval in milliseconds
    #[arg(long = "refresh-ms", default_value_t = 200)]
    refresh_ms: u64,

    /// Write logs to this file instead of stderr
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let _log_guard = logging::init_logging(args.log_file.as_deref())?;

    let items = cli::parse_items(&args.pairs)?;
    let output = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let options = RunOptions {
        output,
        threads: usize::from(args.threads),
        refresh: Duration::from_millis(args.refresh_ms),
        draw_target: DrawTarget::stdout_or_hidden(),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let results = rt.block_on(commands::run_downloads(items, options))?;

    if commands::report_errors(&results) > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
