//! Best-effort progress reporting.
//!
//! A [`ProgressSink`] stands in for the ongoing notification and the UI
//! countdown label. Nothing a sink does can abort a countdown: errors from
//! [`ProgressSink::publish`] are logged and dropped by the worker.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::workflow::WorkflowState;

/// Why a progress sample could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    /// Host refused to show the indicator (e.g. notifications not permitted)
    #[error("progress display denied: {0}")]
    Denied(String),

    /// The display went away (e.g. stdout closed by the reader)
    #[error("progress receiver closed")]
    Closed,
}

/// Receives remaining-time samples from a running countdown.
pub trait ProgressSink: Send + Sync {
    /// Show the remaining time.
    fn publish(&self, remaining_ms: u64) -> Result<(), ProgressError>;

    /// Remove any visible indicator. Called on every exit path.
    fn clear(&self) {}

    /// Called once with the terminal state.
    fn finish(&self, _state: &WorkflowState) {}
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn publish(&self, remaining_ms: u64) -> Result<(), ProgressError> {
        (**self).publish(remaining_ms)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn finish(&self, state: &WorkflowState) {
        (**self).finish(state)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn publish(&self, _remaining_ms: u64) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// Latest observation exposed through [`WatchProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressSnapshot {
    /// No countdown visible.
    #[default]
    Idle,
    /// A countdown is running with this much time left.
    Remaining(u64),
    /// The last countdown ended in this state.
    Finished(WorkflowState),
}

impl ProgressSnapshot {
    pub fn remaining_ms(&self) -> Option<u64> {
        match self {
            ProgressSnapshot::Remaining(ms) => Some(*ms),
            _ => None,
        }
    }
}

/// Read side of a [`WatchProgress`].
pub type ProgressReceiver = watch::Receiver<ProgressSnapshot>;

/// Publishes into a tokio `watch` channel; UI layers hold receivers and
/// render whatever the latest value is.
#[derive(Debug, Clone)]
pub struct WatchProgress {
    tx: Arc<watch::Sender<ProgressSnapshot>>,
}

impl WatchProgress {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ProgressReceiver {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ProgressSnapshot {
        *self.tx.borrow()
    }
}

impl Default for WatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for WatchProgress {
    fn publish(&self, remaining_ms: u64) -> Result<(), ProgressError> {
        // send_replace keeps the value current even with no receivers
        self.tx.send_replace(ProgressSnapshot::Remaining(remaining_ms));
        Ok(())
    }

    fn clear(&self) {
        self.tx.send_if_modified(|snapshot| {
            if matches!(snapshot, ProgressSnapshot::Remaining(_)) {
                *snapshot = ProgressSnapshot::Idle;
                true
            } else {
                false
            }
        });
    }

    fn finish(&self, state: &WorkflowState) {
        self.tx.send_replace(ProgressSnapshot::Finished(*state));
    }
}

/// Forwards to several sinks. A failing sink does not stop the others; the
/// first error is returned.
#[derive(Clone, Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ProgressSink for FanOut {
    fn publish(&self, remaining_ms: u64) -> Result<(), ProgressError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(remaining_ms) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn clear(&self) {
        for sink in &self.sinks {
            sink.clear();
        }
    }

    fn finish(&self, state: &WorkflowState) {
        for sink in &self.sinks {
            sink.finish(state);
        }
    }
}
