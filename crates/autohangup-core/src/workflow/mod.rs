//! Countdown-and-terminate workflow.
//!
//! ## State Transitions
//!
//! ```text
//! Running -> CancelledExternally
//!         -> ExpiredActionSucceeded | ExpiredActionFailed | ExpiredNoTargetFound
//! (no deadline) -> NoTargetFound
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let worker = HangupWorker::new(Some(deadline), context);
//! let state = worker.run(cancel_token).await;
//! ```

mod state;
mod worker;

pub use state::{Deadline, WorkflowState};
pub use worker::{HangupWorker, WorkerContext, DEFAULT_TICK};
