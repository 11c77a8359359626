//! Progress reporting for running imports.

use tokio::sync::mpsc::UnboundedSender;

use crate::model::ImportProgress;

/// Receives progress events from an import.
///
/// Events are advisory; a sink that drops them does not affect the import.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: ImportProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(ImportProgress) + Send + Sync,
{
    fn report(&self, progress: ImportProgress) {
        self(progress)
    }
}

impl ProgressSink for UnboundedSender<ImportProgress> {
    fn report(&self, progress: ImportProgress) {
        // Receiver gone means nobody is listening any more.
        let _ = self.send(progress);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _progress: ImportProgress) {}
}

/// Wraps a sink so reported percentages never go backwards.
pub(crate) struct Monotonic<'a> {
    sink: &'a dyn ProgressSink,
    last: std::sync::atomic::AtomicU8,
}

impl<'a> Monotonic<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            last: std::sync::atomic::AtomicU8::new(0),
        }
    }
}

impl ProgressSink for Monotonic<'_> {
    fn report(&self, mut progress: ImportProgress) {
        use std::sync::atomic::Ordering;

        let previous = self.last.fetch_max(progress.progress, Ordering::SeqCst);
        progress.progress = progress.progress.max(previous);
        self.sink.report(progress);
    }
}
