//! Text layout of the progress panel and the in-place redraw primitive.

use console::{Term, measure_text_width, truncate_str};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

use crate::state::Progress;
use crate::utils::{display_name, format_size};

const RULE_HEAVY: &str = "==================================================";
const RULE_LIGHT: &str = "--------------------------------------------------";
const NAME_WIDTH: usize = 20;
const BAR_WIDTH: usize = 30;
const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';

/// Builds the full panel for `tasks` in the given order. Every line,
/// including the last, ends with a newline.
pub fn build_panel(tasks: &[Progress]) -> String {
    let mut panel = String::with_capacity(tasks.len() * 128 + 256);
    panel.push_str(RULE_HEAVY);
    panel.push('\n');
    panel.push_str(&format!("Download Manager ({} tasks)\n", tasks.len()));
    panel.push_str(RULE_LIGHT);
    panel.push('\n');

    let mut total_all: u64 = 0;
    let mut downloaded_all: u64 = 0;
    for progress in tasks {
        panel.push_str(&format_task_line(progress));
        panel.push('\n');
        total_all = total_all.saturating_add(progress.total_bytes);
        downloaded_all = downloaded_all.saturating_add(progress.downloaded_bytes);
    }

    panel.push_str(RULE_LIGHT);
    panel.push('\n');
    if total_all > 0 {
        panel.push_str(&format!("Overall: {:>3}%\n", percent(downloaded_all, total_all)));
    } else {
        panel.push_str("Overall: N/A\n");
    }
    panel.push_str(RULE_HEAVY);
    panel.push('\n');
    panel
}

pub fn format_task_line(progress: &Progress) -> String {
    let name = display_name(&progress.filename, NAME_WIDTH);

    if progress.total_bytes == 0 {
        return format!("{:<width$} [Initializing...]", name, width = NAME_WIDTH);
    }

    let filled = ((progress.downloaded_bytes as f64 / progress.total_bytes as f64) * BAR_WIDTH as f64) as usize;
    let bar: String = (0..BAR_WIDTH)
        .map(|i| if i < filled { BAR_FILLED } else { BAR_EMPTY })
        .collect();

    let mut line = format!(
        "{:<width$} [{}] {:>3}% ({}/{})",
        name,
        bar,
        percent(progress.downloaded_bytes, progress.total_bytes),
        format_size(progress.downloaded_bytes),
        format_size(progress.total_bytes),
        width = NAME_WIDTH,
    );

    if progress.has_error {
        line.push_str(&format!("  ❌ {}", progress.error_message));
    } else if !progress.is_running {
        line.push_str("  ✅ Done");
    }
    line
}

fn percent(done: u64, total: u64) -> u64 {
    ((done as f64 / total as f64) * 100.0) as u64
}

/// Where the panel goes.
#[derive(Clone)]
pub enum DrawTarget {
    Term(Term),
    /// Keeps every drawn frame.
    Capture(Arc<Mutex<Vec<String>>>),
    /// Draws nothing; picked when stdout is not a terminal.
    Hidden,
}

impl DrawTarget {
    /// Terminal output when stdout is a terminal, nothing otherwise.
    pub fn stdout_or_hidden() -> Self {
        let term = Term::stdout();
        if term.is_term() {
            DrawTarget::Term(term)
        } else {
            DrawTarget::Hidden
        }
    }

    pub fn hidden() -> Self {
        DrawTarget::Hidden
    }

    pub fn capture() -> Self {
        DrawTarget::Capture(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn frames(&self) -> Vec<String> {
        match self {
            DrawTarget::Capture(frames) => frames.lock().clone(),
            _ => Vec::new(),
        }
    }

    /// Erases the `previous_lines` lines drawn last time and prints `panel`.
    /// Returns the number of lines now on screen.
    pub fn redraw(&self, panel: &str, previous_lines: usize) -> io::Result<usize> {
        let lines = panel.matches('\n').count();
        match self {
            DrawTarget::Term(term) => {
                if previous_lines > 0 {
                    term.clear_last_lines(previous_lines)?;
                }
                // Wrapped lines would break the erase count.
                let fitted = match term.size_checked() {
                    Some((_, cols)) => fit_to_width(panel, usize::from(cols)),
                    None => panel.to_string(),
                };
                term.write_str(&fitted)?;
                term.flush()?;
            }
            DrawTarget::Capture(frames) => frames.lock().push(panel.to_string()),
            DrawTarget::Hidden => {}
        }
        Ok(lines)
    }
}

/// Cuts every line of `panel` to `width` display columns.
pub fn fit_to_width(panel: &str, width: usize) -> String {
    let mut fitted = String::with_capacity(panel.len());
    for line in panel.split_inclusive('\n') {
        let (text, newline) = match line.strip_suffix('\n') {
            Some(text) => (text, "\n"),
            None => (line, ""),
        };
        fitted.push_str(&truncate_str(text, width, ""));
        fitted.push_str(newline);
    }
    fitted
}
