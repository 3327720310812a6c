use async_trait::async_trait;
use std::sync::Arc;

use crate::state::Progress;

/// One URL to destination transfer.
///
/// The queries are synchronous and may be called from any thread while
/// `start` is in flight.
#[async_trait]
pub trait DownloadTask: Send + Sync {
    /// Runs the transfer to completion or failure. Calling it again restarts
    /// from scratch.
    async fn start(&self);

    fn progress(&self) -> Progress;

    fn is_running(&self) -> bool;

    fn has_error(&self) -> bool;
}

pub type TaskHandle = Arc<dyn DownloadTask>;
