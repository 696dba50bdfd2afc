use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::{to_hr_min_sec, HrMinSec};
use crate::workflow::WorkflowState;

/// Every externally visible change in a session produces an Event.
/// The CLI prints them as JSON; UIs may subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CountdownArmed {
        work_id: Uuid,
        duration_ms: u64,
        deadline_ms: u64,
        at: DateTime<Utc>,
    },
    /// A running countdown was stopped to make room for a new one.
    CountdownReplaced {
        previous_work_id: Uuid,
        at: DateTime<Utc>,
    },
    Progress {
        remaining_ms: u64,
        remaining: HrMinSec,
        at: DateTime<Utc>,
    },
    CountdownFinished {
        work_id: Uuid,
        outcome: WorkflowState,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn progress(remaining_ms: u64) -> Self {
        Event::Progress {
            remaining_ms,
            remaining: to_hr_min_sec(remaining_ms.min(i64::MAX as u64) as i64),
            at: Utc::now(),
        }
    }

    pub fn finished(work_id: Uuid, outcome: WorkflowState) -> Self {
        Event::CountdownFinished {
            work_id,
            outcome,
            message: format!("Auto Hangup: {}", outcome.message()),
            at: Utc::now(),
        }
    }
}
