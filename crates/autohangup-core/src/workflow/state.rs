use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Lifecycle of one countdown instance.
///
/// `Running` is the only non-terminal state. Every instance leaves it exactly
/// once and never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Running,
    /// Stopped from outside before the deadline.
    CancelledExternally,
    /// Deadline reached, a call was in progress and it was ended.
    ExpiredActionSucceeded,
    /// Deadline reached but the query or the hangup was denied or failed.
    ExpiredActionFailed,
    /// Deadline reached and no call was in progress.
    ExpiredNoTargetFound,
    /// Started without a usable deadline; nothing was counted down.
    NoTargetFound,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowState::Running)
    }

    /// Whether the countdown ran all the way to its deadline.
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            WorkflowState::ExpiredActionSucceeded
                | WorkflowState::ExpiredActionFailed
                | WorkflowState::ExpiredNoTargetFound
        )
    }

    /// One-line user-facing summary.
    pub fn message(&self) -> &'static str {
        match self {
            WorkflowState::Running => "Countdown running.",
            WorkflowState::CancelledExternally => "Countdown stopped.",
            WorkflowState::ExpiredActionSucceeded => "Call terminated.",
            WorkflowState::ExpiredActionFailed => "Could not end the call.",
            WorkflowState::ExpiredNoTargetFound => "No call running.",
            WorkflowState::NoTargetFound => "No countdown target set.",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Running => "running",
            WorkflowState::CancelledExternally => "cancelled_externally",
            WorkflowState::ExpiredActionSucceeded => "expired_action_succeeded",
            WorkflowState::ExpiredActionFailed => "expired_action_failed",
            WorkflowState::ExpiredNoTargetFound => "expired_no_target_found",
            WorkflowState::NoTargetFound => "no_target_found",
        };
        f.write_str(s)
    }
}

/// Absolute expiry time on a monotonic [`Clock`], in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Deadline(u64);

impl Deadline {
    pub fn at(monotonic_ms: u64) -> Self {
        Self(monotonic_ms)
    }

    /// Accepts a raw, possibly missing, millisecond value. Negative values
    /// (including the `-1` "unset" sentinel) are rejected.
    pub fn from_raw(raw: Option<i64>) -> Option<Self> {
        raw.and_then(|ms| u64::try_from(ms).ok()).map(Self)
    }

    /// `duration_ms` from now on `clock`.
    pub fn after(clock: &dyn Clock, duration_ms: u64) -> Self {
        Self(clock.now_ms().saturating_add(duration_ms))
    }

    pub fn as_ms(&self) -> u64 {
        self.0
    }

    /// Time left at `now_ms`, zero once passed.
    pub fn remaining(&self, now_ms: u64) -> u64 {
        self.0.saturating_sub(now_ms)
    }
}
