//! Session-level facade: one countdown at a time, armed and disarmed by the
//! user.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::events::Event;
use crate::progress::{FanOut, ProgressReceiver, ProgressSink, ProgressSnapshot, WatchProgress};
use crate::scheduler::{WorkHandle, WorkScheduler, WorkStatus};
use crate::storage::Config;
use crate::telephony::{Capability, GatedTelephony, PermissionGate, TelephonyController};
use crate::workflow::{Deadline, HangupWorker, WorkerContext, WorkflowState};

/// Result of [`HangupService::arm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Armed {
    pub handle: WorkHandle,
    pub duration_ms: u64,
    pub deadline: Deadline,
    /// Work that was running under the same name and got cancelled.
    pub replaced: Option<Uuid>,
}

impl Armed {
    pub fn events(&self) -> Vec<Event> {
        let now = Utc::now();
        let mut events = Vec::with_capacity(2);
        if let Some(previous_work_id) = self.replaced {
            events.push(Event::CountdownReplaced {
                previous_work_id,
                at: now,
            });
        }
        events.push(Event::CountdownArmed {
            work_id: self.handle.id,
            duration_ms: self.duration_ms,
            deadline_ms: self.deadline.as_ms(),
            at: now,
        });
        events
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggled {
    Armed(Armed),
    Disarmed,
}

/// Owns the scheduler and the collaborators of one session.
pub struct HangupService {
    scheduler: WorkScheduler,
    ctx: WorkerContext,
    progress: WatchProgress,
    work_name: String,
}

impl HangupService {
    /// Progress published by workers goes to `ctx.progress` and to an
    /// internal watch channel readable through [`HangupService::progress`].
    pub fn new(ctx: WorkerContext, work_name: impl Into<String>) -> Self {
        let progress = WatchProgress::new();
        let fan_out = FanOut::new()
            .with(Arc::new(progress.clone()))
            .with(ctx.progress.clone());
        let ctx = ctx.with_progress(Arc::new(fan_out));
        Self {
            scheduler: WorkScheduler::new(),
            ctx,
            progress,
            work_name: work_name.into(),
        }
    }

    /// Wire a service from config: telephony is gated by the configured
    /// permissions, and `display` only receives progress when notifications
    /// are enabled and permitted.
    pub fn from_config<T>(config: &Config, telephony: T, display: Arc<dyn ProgressSink>) -> Self
    where
        T: TelephonyController + 'static,
    {
        let gate = config.permission_gate();
        let missing = gate.missing_required();
        if !missing.is_empty() {
            tracing::warn!(?missing, "required permissions not granted");
        }

        let show_progress =
            config.notifications.enabled && gate.is_granted(Capability::PostNotifications);
        let display: Arc<dyn ProgressSink> = if show_progress {
            display
        } else {
            Arc::new(crate::progress::NullProgress)
        };

        let ctx = WorkerContext::new(Arc::new(GatedTelephony::new(telephony, gate)))
            .with_tick(config.tick())
            .with_progress(display);
        Self::new(ctx, config.countdown.work_name.clone())
    }

    pub fn work_name(&self) -> &str {
        &self.work_name
    }

    /// Start a countdown of `duration_ms`, stopping any running one first.
    pub async fn arm(&self, duration_ms: u64) -> Armed {
        let replaced = match self.scheduler.current(&self.work_name).await {
            Some(handle) if self.scheduler.status(&handle).await == Some(WorkStatus::Running) => {
                Some(handle.id)
            }
            _ => None,
        };

        let deadline = Deadline::after(self.ctx.clock.as_ref(), duration_ms);
        let ctx = self.ctx.clone();
        let handle = self
            .scheduler
            .enqueue_unique(&self.work_name, move |cancel| {
                HangupWorker::new(Some(deadline), ctx).run(cancel)
            })
            .await;

        tracing::info!(id = %handle.id, duration_ms, "countdown armed");
        Armed {
            handle,
            duration_ms,
            deadline,
            replaced,
        }
    }

    /// Stop the running countdown, if any.
    pub async fn disarm(&self) -> bool {
        self.scheduler.cancel_unique(&self.work_name).await
    }

    /// Arm when idle, disarm when running.
    pub async fn toggle(&self, duration_ms: u64) -> Toggled {
        if self.is_active().await {
            self.disarm().await;
            Toggled::Disarmed
        } else {
            Toggled::Armed(self.arm(duration_ms).await)
        }
    }

    pub async fn is_active(&self) -> bool {
        match self.scheduler.current(&self.work_name).await {
            Some(handle) => self.scheduler.status(&handle).await == Some(WorkStatus::Running),
            None => false,
        }
    }

    pub fn progress(&self) -> ProgressReceiver {
        self.progress.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.current()
    }

    /// Wait for the current countdown to finish.
    pub async fn wait(&self) -> Result<(WorkHandle, WorkflowState), SchedulerError> {
        let handle = self
            .scheduler
            .current(&self.work_name)
            .await
            .ok_or_else(|| SchedulerError::NoWork(self.work_name.clone()))?;
        let state = self.scheduler.join(&handle).await?;
        Ok((handle, state))
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
