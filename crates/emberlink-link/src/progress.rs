//! Progress reporting for upload and download sessions.

/// Receives unit-level progress and free-text diagnostics from a session.
///
/// `total` is 0 when the session cannot know the unit count up front
/// (downloads: the endpoint does not announce one).
pub trait ProgressSink: Send + Sync {
    /// One unit of progress: units done, units expected, current label
    fn report(&self, done: usize, total: usize, label: &str);

    /// A free-text diagnostic line
    fn message(&self, line: &str) {
        let _ = line;
    }
}

/// Discards all progress
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _done: usize, _total: usize, _label: &str) {}
}
