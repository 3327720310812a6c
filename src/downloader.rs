use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tracing::{debug, warn};

use crate::state::{Progress, TaskState};
use crate::task::DownloadTask;
use crate::transport::{ByteRange, HttpRangeClient, RangeClient, RemoteMetadata, TransportError};
use crate::utils::{Chunk, split_chunks};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Cannot create destination file: {0}")]
    Open(#[source] io::Error),
    #[error("Cannot resize destination file: {0}")]
    Resize(#[source] io::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Failed to write output file: {0}")]
    Write(#[source] io::Error),
    #[error("Destination file is closed")]
    FileClosed,
    #[error("Range download incomplete ({written}/{expected} bytes)")]
    Incomplete { expected: u64, written: u64 },
    #[error("Range download exceeded {expected} bytes")]
    Overflow { expected: u64 },
    #[error("Range worker failed: {0}")]
    Worker(String),
}

impl DownloadError {
    /// Setup failures end the whole task at once.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DownloadError::Open(_) | DownloadError::Resize(_))
    }
}

/// State shared between the task and its range workers.
struct Shared {
    url: String,
    destination: PathBuf,
    client: Arc<dyn RangeClient>,
    state: Mutex<TaskState>,
    file: tokio::sync::Mutex<Option<File>>,
}

/// Downloads one URL, splitting it across range workers when the server
/// allows it.
pub struct MultiDownloader {
    shared: Arc<Shared>,
    workers: usize,
    run_lock: tokio::sync::Mutex<()>,
}

impl MultiDownloader {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>, workers: usize) -> Self {
        Self::with_client(url, destination, workers, Arc::new(HttpRangeClient::shared()))
    }

    pub fn with_client(
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        workers: usize,
        client: Arc<dyn RangeClient>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                destination: destination.into(),
                client,
                state: Mutex::new(TaskState::default()),
                file: tokio::sync::Mutex::new(None),
            }),
            workers: workers.max(1),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    async fn run(&self) {
        let shared = &self.shared;
        shared.state.lock().reset_running();

        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&shared.destination)
            .await;
        match opened {
            Ok(file) => *shared.file.lock().await = Some(file),
            Err(e) => {
                shared.record(DownloadError::Open(e));
                return;
            }
        }

        let meta = match shared.client.probe(&shared.url).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!(url = %shared.url, error = %e, "probe failed, falling back to a single stream");
                RemoteMetadata::default()
            }
        };

        if !meta.supports_range || meta.content_length == 0 {
            self.download_single_stream().await;
        } else if !self.download_ranges(meta.content_length).await {
            return;
        }

        shared.close_file().await;
        shared.state.lock().is_running = false;
        debug!(url = %shared.url, progress = ?shared.snapshot(), "download finished");
    }

    async fn download_single_stream(&self) {
        let shared = &self.shared;
        debug!(url = %shared.url, "downloading without ranges");

        if let Err(e) = shared.fetch_into(0, None, None).await {
            shared.record(e);
        }

        let mut state = shared.state.lock();
        if state.total_bytes == 0 {
            state.total_bytes = state.downloaded_bytes;
        }
    }

    /// Returns false when the file could not be prepared; the task is then
    /// already stopped and the file closed.
    async fn download_ranges(&self, total_size: u64) -> bool {
        let shared = &self.shared;
        {
            let mut state = shared.state.lock();
            state.total_bytes = total_size;
            state.downloaded_bytes = 0;
        }

        let resized = {
            let guard = shared.file.lock().await;
            match guard.as_ref() {
                Some(file) => file.set_len(total_size).await,
                None => Err(io::Error::new(io::ErrorKind::NotFound, "destination file is not open")),
            }
        };
        if let Err(e) = resized {
            shared.file.lock().await.take();
            shared.record(DownloadError::Resize(e));
            return false;
        }

        let chunks = split_chunks(total_size, self.workers);
        debug!(url = %shared.url, total_size, workers = chunks.len(), "starting range workers");

        let handles: Vec<_> = chunks
            .into_iter()
            .map(|chunk| {
                let shared = Arc::clone(shared);
                tokio::spawn(async move { shared.download_chunk(chunk).await })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                shared.record(DownloadError::Worker(e.to_string()));
            }
        }
        true
    }
}

impl Shared {
    async fn download_chunk(&self, chunk: Chunk) {
        let range = ByteRange::from_half_open(chunk.start, chunk.end);
        match self.fetch_into(chunk.start, Some(range), Some(chunk.size())).await {
            Ok(written) => debug!(url = %self.url, index = chunk.index, written, "range complete"),
            Err(e) => self.record(e),
        }
    }

    /// Streams the response into the file starting at `offset`. With an
    /// `expected` length, bytes past it are dropped and a short or overlong
    /// body is reported.
    async fn fetch_into(
        &self,
        offset: u64,
        range: Option<ByteRange>,
        expected: Option<u64>,
    ) -> Result<u64, DownloadError> {
        let mut stream = self.client.fetch(&self.url, range).await?;
        let mut written: u64 = 0;

        while let Some(item) = stream.next().await {
            let block = item?;
            let mut data = &block[..];

            let mut overflow = false;
            if let Some(expected) = expected {
                let remaining = expected - written;
                if data.len() as u64 > remaining {
                    data = &data[..remaining as usize];
                    overflow = true;
                }
            }

            if !data.is_empty() {
                self.write_at(offset + written, data).await?;
                written += data.len() as u64;
                self.state.lock().downloaded_bytes += data.len() as u64;
            }

            if overflow {
                return Err(DownloadError::Overflow {
                    expected: expected.unwrap_or(written),
                });
            }
        }

        match expected {
            Some(expected) if written != expected => Err(DownloadError::Incomplete { expected, written }),
            _ => Ok(written),
        }
    }

    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), DownloadError> {
        let mut guard = self.file.lock().await;
        let file = guard.as_mut().ok_or(DownloadError::FileClosed)?;
        file.seek(SeekFrom::Start(offset)).await.map_err(DownloadError::Write)?;
        file.write_all(data).await.map_err(DownloadError::Write)?;
        Ok(())
    }

    async fn close_file(&self) {
        let file = self.file.lock().await.take();
        if let Some(mut file) = file {
            if let Err(e) = file.flush().await {
                self.record(DownloadError::Write(e));
            }
        }
    }

    fn record(&self, error: DownloadError) {
        warn!(url = %self.url, fatal = error.is_fatal(), "{}", error);
        self.state.lock().record_error(error.to_string(), error.is_fatal());
    }

    fn snapshot(&self) -> Progress {
        self.state.lock().snapshot(&self.url, &self.destination)
    }
}

#[async_trait]
impl DownloadTask for MultiDownloader {
    async fn start(&self) {
        let _run = self.run_lock.lock().await;
        self.run().await;
    }

    fn progress(&self) -> Progress {
        self.shared.snapshot()
    }

    fn is_running(&self) -> bool {
        self.shared.state.lock().is_running
    }

    fn has_error(&self) -> bool {
        self.shared.state.lock().has_error
    }
}
