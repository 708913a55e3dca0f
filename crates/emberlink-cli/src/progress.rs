//! Transfer progress display with progress bars.

use emberlink_link::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal progress bar for uploads and downloads.
///
/// Uploads know their unit total up front; downloads do not, so the bar
/// starts as a spinner and adopts a length the first time a nonzero
/// total is reported.
pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    /// Create a progress bar for a transfer of `total` units; pass 0
    /// when the total is unknown
    #[must_use]
    pub fn new(total: usize, title: &str) -> Self {
        let bar = if total > 0 {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} units")
                    .expect("Invalid progress bar template")
                    .progress_chars("#>-"),
            );
            bar
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{msg}\n{spinner:.green} [{elapsed_precise}] {pos} units")
                    .expect("Invalid progress bar template"),
            );
            bar
        };
        bar.set_message(title.to_string());
        Self { bar }
    }

    /// Finish with a closing message
    pub fn finish_with_message(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    /// Abandon the progress bar (for errors)
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl ProgressSink for TransferProgress {
    fn report(&self, done: usize, total: usize, label: &str) {
        if total > 0 && self.bar.length() != Some(total as u64) {
            self.bar.set_length(total as u64);
        }
        self.bar.set_position(done as u64);
        self.bar.set_message(label.to_string());
    }

    fn message(&self, line: &str) {
        self.bar.println(line);
    }
}
