use std::path::{Path, PathBuf};

/// Point-in-time copy of a task's counters and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub url: String,
    pub filename: PathBuf,
    /// 0 while the size is not known.
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub is_running: bool,
    pub has_error: bool,
    /// First recorded error, empty if none.
    pub error_message: String,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        !self.has_error && !self.is_running && self.total_bytes > 0 && self.downloaded_bytes >= self.total_bytes
    }
}

/// Mutable counters behind a task's state lock.
#[derive(Debug, Default)]
pub(crate) struct TaskState {
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub is_running: bool,
    pub has_error: bool,
    pub error_message: String,
}

impl TaskState {
    /// Back to the values of a freshly constructed task, marked as running.
    pub fn reset_running(&mut self) {
        *self = TaskState {
            is_running: true,
            ..TaskState::default()
        };
    }

    /// Latches the first error; later messages only keep the flag set.
    pub fn record_error(&mut self, message: String, stop_immediately: bool) {
        self.has_error = true;
        if self.error_message.is_empty() {
            self.error_message = message;
        }
        if stop_immediately {
            self.is_running = false;
        }
    }

    pub fn snapshot(&self, url: &str, filename: &Path) -> Progress {
        Progress {
            url: url.to_string(),
            filename: filename.to_path_buf(),
            total_bytes: self.total_bytes,
            downloaded_bytes: self.downloaded_bytes,
            is_running: self.is_running,
            has_error: self.has_error,
            error_message: self.error_message.clone(),
        }
    }
}
