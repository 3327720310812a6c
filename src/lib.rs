//! Multi-connection HTTP downloader.
//!
//! Each [`MultiDownloader`] probes its URL, splits the body into byte ranges
//! fetched by parallel workers and writes them straight into a preallocated
//! destination file. A [`DownloadManager`] runs many of them at once and keeps
//! a progress panel redrawn in place on the terminal.

pub mod cli;
pub mod commands;
pub mod downloader;
pub mod logging;
pub mod manager;
pub mod panel;
pub mod state;
pub mod task;
pub mod transport;
pub mod utils;

pub use downloader::{DownloadError, MultiDownloader};
pub use manager::DownloadManager;
pub use state::Progress;
pub use task::{DownloadTask, TaskHandle};
pub use transport::{HttpRangeClient, RangeClient, RemoteMetadata, TransportError};
