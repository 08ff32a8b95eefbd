//! Progress bar for archive rewrites.

use indicatif::{ProgressBar, ProgressStyle};
use zipcull::progress::ProgressReporter;

/// Byte-based progress display for a rewrite
pub struct RewriteProgress {
    bar: ProgressBar,
    quiet: bool,
}

impl RewriteProgress {
    /// Creates a new progress display
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {wide_msg}",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        };
        Self { bar, quiet }
    }

    /// Returns a handle to the underlying bar
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }
}

impl ProgressReporter for RewriteProgress {
    fn on_total(&mut self, _entries: usize, total_bytes: u64) {
        self.bar.set_length(total_bytes);
    }

    fn on_entry_start(&mut self, entry_name: &str, _size: u64) {
        if self.quiet {
            return;
        }

        // Truncate long names on a character boundary
        let count = entry_name.chars().count();
        let display_name = if count > 40 {
            let tail: String = entry_name.chars().skip(count - 37).collect();
            format!("...{}", tail)
        } else {
            entry_name.to_string()
        };
        self.bar.set_message(display_name);
    }

    fn on_progress(&mut self, bytes_processed: u64, _total_bytes: u64) {
        self.bar.set_position(bytes_processed);
    }
}
