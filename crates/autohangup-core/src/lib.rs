//! # Auto Hangup Core Library
//!
//! Arms a countdown after which the active phone call is ended. The CLI is a
//! thin layer over this crate; anything that touches the host (telephony,
//! permissions, progress display) sits behind a trait so the countdown logic
//! runs and tests without one.
//!
//! ## Architecture
//!
//! - **Workflow**: a single-use async worker that ticks once per second
//!   towards a monotonic deadline, honours cancellation at every suspension
//!   point and fires the hangup at most once
//! - **Scheduler**: background work keyed by name with replace-on-conflict
//! - **Telephony**: call-state/hangup controller gated by a permission check
//! - **Progress**: best-effort sinks for the remaining time
//! - **Storage**: TOML configuration
//!
//! ## Key Components
//!
//! - [`HangupWorker`]: countdown state machine
//! - [`WorkScheduler`]: unique-name background runner
//! - [`HangupService`]: session facade used by front ends
//! - [`Config`]: application configuration

pub mod clock;
pub mod duration;
pub mod error;
pub mod events;
pub mod progress;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod telephony;
pub mod workflow;

pub use clock::{Clock, MonotonicClock};
pub use duration::{format_remaining, to_hr_min_sec, to_ms, HrMinSec};
pub use error::{ConfigError, CoreError, SchedulerError, TelephonyError, ValidationError};
pub use events::Event;
pub use progress::{ProgressError, ProgressReceiver, ProgressSink, ProgressSnapshot, WatchProgress};
pub use scheduler::{WorkHandle, WorkScheduler, WorkStatus};
pub use service::{Armed, HangupService, Toggled};
pub use storage::Config;
pub use telephony::{
    Capability, CommandTelephony, GatedTelephony, PermissionGate, SimulatedTelephony,
    StaticPermissionGate, TelephonyController,
};
pub use workflow::{Deadline, HangupWorker, WorkerContext, WorkflowState};
