use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::panel::{DrawTarget, build_panel};
use crate::state::Progress;
use crate::task::TaskHandle;

pub const DEFAULT_REFRESH: Duration = Duration::from_millis(200);

/// Runs a set of tasks concurrently and keeps a live panel of their progress.
pub struct DownloadManager {
    tasks: Vec<TaskHandle>,
    handles: Vec<JoinHandle<()>>,
    draw_target: DrawTarget,
    refresh: Duration,
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadManager {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            handles: Vec::new(),
            draw_target: DrawTarget::stdout_or_hidden(),
            refresh: DEFAULT_REFRESH,
        }
    }

    pub fn with_draw_target(mut self, target: DrawTarget) -> Self {
        self.draw_target = target;
        self
    }

    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn add_task(&mut self, task: TaskHandle) {
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[TaskHandle] {
        &self.tasks
    }

    pub fn progress(&self) -> Vec<Progress> {
        self.tasks.iter().map(|t| t.progress()).collect()
    }

    /// Starts every task, renders until none is active, then waits for all
    /// of them to finish.
    pub async fn start(&mut self) {
        for task in &self.tasks {
            let task = task.clone();
            self.handles.push(tokio::spawn(async move { task.start().await }));
        }
        debug!(tasks = self.tasks.len(), "download tasks launched");

        let lines = self.render_loop().await;

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("download task panicked: {}", e);
            }
        }

        // Executions may outlive the loop when a task errored with workers
        // still in flight.
        self.draw(lines);
    }

    async fn render_loop(&self) -> usize {
        let mut lines = 0;
        loop {
            lines = self.draw(lines);
            if !self.has_active_tasks() {
                return lines;
            }
            tokio::time::sleep(self.refresh).await;
        }
    }

    fn draw(&self, previous_lines: usize) -> usize {
        let panel = build_panel(&self.progress());
        match self.draw_target.redraw(&panel, previous_lines) {
            Ok(lines) => lines,
            Err(e) => {
                warn!("failed to draw progress panel: {}", e);
                previous_lines
            }
        }
    }

    fn has_active_tasks(&self) -> bool {
        self.tasks.iter().enumerate().any(|(i, task)| {
            let finished = self.handles.get(i).map_or(true, |h| h.is_finished());
            is_active(&task.progress(), finished)
        })
    }
}

/// A task keeps the panel alive while it runs, or while its execution is
/// launched but has not reported anything yet. Errored tasks never do.
pub fn is_active(progress: &Progress, finished: bool) -> bool {
    if progress.has_error {
        return false;
    }
    progress.is_running || !finished
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DownloadTask;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// Pretends to download `total` bytes over `duration`.
    struct ScriptedTask {
        name: &'static str,
        total: u64,
        duration: Duration,
        fail: bool,
        state: Mutex<Progress>,
    }

    impl ScriptedTask {
        fn build(name: &'static str, total: u64, duration: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                total,
                duration,
                fail,
                state: Mutex::new(Progress {
                    url: format!("http://example.com/{}", name),
                    filename: PathBuf::from(name),
                    ..Progress::default()
                }),
            })
        }

        fn new(name: &'static str, total: u64, duration: Duration) -> Arc<Self> {
            Self::build(name, total, duration, false)
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Self::build(name, 100, Duration::from_millis(50), true)
        }
    }

    #[async_trait]
    impl DownloadTask for ScriptedTask {
        async fn start(&self) {
            {
                let mut state = self.state.lock();
                state.is_running = true;
                state.total_bytes = self.total;
                state.downloaded_bytes = 0;
            }
            let steps = 5;
            for _ in 0..steps {
                tokio::time::sleep(self.duration / steps).await;
                let mut state = self.state.lock();
                state.downloaded_bytes = (state.downloaded_bytes + self.total / steps as u64).min(self.total);
            }
            let mut state = self.state.lock();
            if self.fail {
                state.has_error = true;
                state.error_message = format!("{} failed", self.name);
            } else {
                state.downloaded_bytes = self.total;
            }
            state.is_running = false;
        }

        fn progress(&self) -> Progress {
            self.state.lock().clone()
        }

        fn is_running(&self) -> bool {
            self.state.lock().is_running
        }

        fn has_error(&self) -> bool {
            self.state.lock().has_error
        }
    }

    #[test]
    fn activity_predicate() {
        let mut p = Progress::default();
        assert!(!is_active(&p, true));
        assert!(is_active(&p, false));

        p.is_running = true;
        assert!(is_active(&p, true));

        p.has_error = true;
        assert!(!is_active(&p, false));

        let stalled = Progress {
            total_bytes: 100,
            downloaded_bytes: 10,
            ..Progress::default()
        };
        assert!(!is_active(&stalled, true));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn loop_waits_for_slow_tasks() {
        let target = DrawTarget::capture();
        let mut manager = DownloadManager::new()
            .with_draw_target(target.clone())
            .with_refresh(Duration::from_millis(20));

        let quick = ScriptedTask::new("quick.bin", 0, Duration::ZERO);
        let slow_a = ScriptedTask::new("slow_a.bin", 1000, Duration::from_millis(300));
        let slow_b = ScriptedTask::new("slow_b.bin", 2000, Duration::from_millis(400));
        manager.add_task(quick.clone());
        manager.add_task(slow_a.clone());
        manager.add_task(slow_b.clone());

        manager.start().await;

        for task in manager.tasks() {
            assert!(!task.is_running());
        }
        assert_eq!(slow_a.progress().downloaded_bytes, 1000);
        assert_eq!(slow_b.progress().downloaded_bytes, 2000);

        let frames = target.frames();
        assert!(frames.len() >= 5, "only {} frames drawn", frames.len());
        let saw_running = frames
            .iter()
            .any(|f| f.lines().any(|l| l.starts_with("slow_b.bin") && !l.contains("Done")));
        assert!(saw_running);

        let last = frames.last().unwrap();
        assert!(last.contains("Download Manager (3 tasks)"));
        assert!(last.contains("Overall: 100%"));
        assert_eq!(last.matches("✅ Done").count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panel_keeps_insertion_order_and_reports_errors() {
        let target = DrawTarget::capture();
        let mut manager = DownloadManager::new()
            .with_draw_target(target.clone())
            .with_refresh(Duration::from_millis(10));

        manager.add_task(ScriptedTask::new("first.bin", 10, Duration::from_millis(30)));
        manager.add_task(ScriptedTask::failing("second.bin"));
        manager.add_task(ScriptedTask::new("third.bin", 10, Duration::from_millis(30)));
        manager.start().await;

        let progress = manager.progress();
        assert!(progress[1].has_error);
        assert!(!progress[0].has_error && !progress[2].has_error);

        let last = target.frames().pop().unwrap();
        let first = last.find("first.bin").unwrap();
        let second = last.find("second.bin").unwrap();
        let third = last.find("third.bin").unwrap();
        assert!(first < second && second < third);
        assert!(last.contains("❌ second.bin failed"));
    }

    #[tokio::test]
    async fn empty_manager_returns_immediately() {
        let target = DrawTarget::capture();
        let mut manager = DownloadManager::new().with_draw_target(target.clone());
        manager.start().await;

        let frames = target.frames();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains("Download Manager (0 tasks)"));
    }
}
