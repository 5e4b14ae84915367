//! Terminal progress for a running load.
//!
//! On a TTY the load gets one spinner line with the statement count, rate
//! and in-flight batches. Elsewhere the bar is hidden and the per-batch log
//! lines are the progress report.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const LOAD_TEMPLATE: &str =
    "{spinner:.green} {prefix:.cyan.bold} {human_pos} statements ({per_sec}) {elapsed:>4} {wide_msg}";

/// Owns the `MultiProgress` that bars and the log bridge share
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Detect whether stderr is a terminal.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    pub fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Spinner for a load into `target`.
    ///
    /// The loader advances the position with the statements it has seen;
    /// the message carries batch state. Hidden outside a TTY.
    pub fn load_line(&self, target: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template(LOAD_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let pb = self
            .multi
            .add(ProgressBar::new_spinner().with_style(style).with_prefix(target.to_string()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Handle for [`init_logging`](crate::logging::init_logging)
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedProgress = Arc<ProgressContext>;

/// `1234567` → `"1,234,567"`
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.char_indices() {
        if i > 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
