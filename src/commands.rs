use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::cli::DownloadItem;
use crate::downloader::MultiDownloader;
use crate::manager::DownloadManager;
use crate::panel::DrawTarget;
use crate::state::Progress;
use crate::task::TaskHandle;

pub struct RunOptions {
    pub output: PathBuf,
    pub threads: usize,
    pub refresh: Duration,
    pub draw_target: DrawTarget,
}

/// Downloads every item into `options.output` and returns the final progress
/// of each task, in input order.
pub async fn run_downloads(items: Vec<DownloadItem>, options: RunOptions) -> Result<Vec<Progress>> {
    if !options.output.exists() {
        fs::create_dir_all(&options.output)
            .await
            .with_context(|| format!("Failed to create download directory: {:?}", options.output))?;
    }

    let mut manager = DownloadManager::new()
        .with_draw_target(options.draw_target)
        .with_refresh(options.refresh);

    for item in &items {
        let destination = item.destination(&options.output);
        info!(url = %item.url, destination = ?destination, threads = options.threads, "queued download");
        let task: TaskHandle = Arc::new(MultiDownloader::new(item.url.clone(), destination, options.threads));
        manager.add_task(task);
    }

    manager.start().await;
    Ok(manager.progress())
}

/// Prints one line per failed task. Returns the number of failures.
pub fn report_errors(results: &[Progress]) -> usize {
    let mut failures = 0;
    for progress in results.iter().filter(|p| p.has_error) {
        eprintln!("Download failed: {} -> {}", progress.url, progress.error_message);
        failures += 1;
    }
    failures
}
