//! Batch progress snapshots.
//!
//! The engine publishes a `BatchProgress` on a watch channel after every
//! job completion; consumers (the CLI progress bar) render the latest
//! snapshot without ever blocking the download path.

/// Point-in-time progress of a download batch.
///
/// The default value (`total == 0`) means "no batch in flight" and is
/// published when a batch finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    /// Jobs finished, successfully or not.
    pub completed: usize,
    /// Jobs that produced a file on disk.
    pub succeeded: usize,
    /// Jobs in the batch.
    pub total: usize,
}

impl BatchProgress {
    /// Completed fraction in `[0, 1]`. An empty batch reports `0.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Human-readable status line, e.g. `3 of 10 downloaded`.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{} of {} downloaded", self.succeeded, self.total)
    }

    /// True once every job in the batch has finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}
