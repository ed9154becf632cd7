//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: a single indicatif bar counting verified files.
//! Non-TTY mode: hidden bars, log lines are the only progress output.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

fn files_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:<8.cyan.bold} {bar:30.green/dim} {pos:>5}/{len:5} {elapsed:>4} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    /// Context that never draws (tests, piped output).
    pub fn hidden() -> Self {
        Self::with_tty(false)
    }

    fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Bar over `total` files. Hidden off a TTY.
    ///
    /// Workers call `inc(1)` per finished file and `set_message` with the
    /// file currently being verified.
    pub fn files_bar(&self, label: &str, total: usize) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(files_style());
        pb.set_prefix(label.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Shorten a path for a progress message, keeping the tail (the file name).
pub fn tail(path: &str, max_chars: usize) -> &str {
    let count = path.chars().count();
    if count <= max_chars {
        return path;
    }
    let skip = count - max_chars;
    let start = path
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(path.len());
    &path[start..]
}
