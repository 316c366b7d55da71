//! Observer for a running summarization: progress notices and streamed
//! partial results. Passed into the engine per request.

use chrono::{DateTime, Utc};

/// One merged batch, delivered as soon as it is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSummary {
    /// 1-based batch number.
    pub part: usize,
    pub total: usize,
    /// Merged text as returned by the backend.
    pub text: String,
    /// `text` with the human-readable part header.
    pub rendered: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub message_count: usize,
}

/// Best-effort callbacks. Implementations must not block for long; the
/// engine calls them inline between backend calls.
pub trait SummarySink: Send + Sync {
    fn on_progress(&self, _message: &str) {}

    /// Called once per completed batch, in batch order.
    fn on_partial_result(&self, _partial: &PartialSummary) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl SummarySink for NoopSink {}

type ProgressFn = Box<dyn Fn(&str) + Send + Sync>;
type PartialFn = Box<dyn Fn(&PartialSummary) + Send + Sync>;

/// Closure-backed sink.
#[derive(Default)]
pub struct CallbackSink {
    progress: Option<ProgressFn>,
    partial: Option<PartialFn>,
}

impl CallbackSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_partial<F>(mut self, f: F) -> Self
    where
        F: Fn(&PartialSummary) + Send + Sync + 'static,
    {
        self.partial = Some(Box::new(f));
        self
    }
}

impl SummarySink for CallbackSink {
    fn on_progress(&self, message: &str) {
        if let Some(f) = &self.progress {
            f(message);
        }
    }

    fn on_partial_result(&self, partial: &PartialSummary) {
        if let Some(f) = &self.partial {
            f(partial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_callback_sink_forwards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let progress = Arc::clone(&seen);
        let sink = CallbackSink::new().with_progress(move |m| progress.lock().unwrap().push(m.to_string()));

        sink.on_progress("📦 batch 1/1");
        let ts = Utc::now();
        sink.on_partial_result(&PartialSummary {
            part: 1,
            total: 1,
            text: "t".into(),
            rendered: "t".into(),
            period_start: ts,
            period_end: ts,
            message_count: 1,
        });

        assert_eq!(*seen.lock().unwrap(), vec!["📦 batch 1/1".to_string()]);
    }
}
