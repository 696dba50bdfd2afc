//! Background work scheduler with at-most-one-instance-per-name semantics.
//!
//! [`WorkScheduler::enqueue_unique`] replaces any running work of the same
//! name: the old instance is cancelled and awaited before the new one is
//! spawned, so two countdowns of one session never tick at the same time and
//! can never race each other to the hangup.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::workflow::WorkflowState;

/// Opaque reference to one scheduled instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkHandle {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    Running,
    Finished,
}

#[derive(Debug)]
struct ManagedWork {
    id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<WorkflowState>,
}

/// Runs workflows on the ambient tokio runtime.
///
/// Spawned work is owned by the scheduler, not by whoever enqueued it, so it
/// keeps running after the caller goes away.
#[derive(Debug, Default)]
pub struct WorkScheduler {
    works: Mutex<HashMap<String, ManagedWork>>,
    shutdown: CancellationToken,
}

impl WorkScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `task` under `name`, replacing whatever runs under that name.
    ///
    /// `task` receives the token it must honour for cancellation.
    pub async fn enqueue_unique<F, Fut>(&self, name: &str, task: F) -> WorkHandle
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = WorkflowState> + Send + 'static,
    {
        // held across the await so concurrent enqueues are serialized
        let mut works = self.works.lock().await;

        // the previous instance stays registered until it has stopped; if
        // this future is dropped mid-wait it is still tracked, just cancelled
        if let Some(previous) = works.get_mut(name) {
            if !previous.handle.is_finished() {
                tracing::info!(%name, id = %previous.id, "replacing running work");
            }
            previous.cancel.cancel();
            match (&mut previous.handle).await {
                Ok(state) => tracing::debug!(%name, id = %previous.id, %state, "previous work stopped"),
                Err(e) => tracing::warn!(%name, id = %previous.id, error = %e, "previous work did not stop cleanly"),
            }
        }

        let id = Uuid::new_v4();
        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(task(cancel.clone()));
        works.insert(
            name.to_string(),
            ManagedWork {
                id,
                cancel,
                handle,
            },
        );

        tracing::debug!(%name, %id, "work enqueued");
        WorkHandle {
            id,
            name: name.to_string(),
        }
    }

    /// Request cancellation. Returns whether `handle` was still the current
    /// instance for its name and had not finished yet. Never fails.
    pub async fn cancel(&self, handle: &WorkHandle) -> bool {
        let works = self.works.lock().await;
        match works.get(&handle.name) {
            Some(work) if work.id == handle.id && !work.handle.is_finished() => {
                tracing::info!(name = %handle.name, id = %handle.id, "cancelling work");
                work.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever runs under `name`.
    pub async fn cancel_unique(&self, name: &str) -> bool {
        let works = self.works.lock().await;
        match works.get(name) {
            Some(work) if !work.handle.is_finished() => {
                work.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// `None` once the handle has been replaced or joined.
    pub async fn status(&self, handle: &WorkHandle) -> Option<WorkStatus> {
        let works = self.works.lock().await;
        works
            .get(&handle.name)
            .filter(|work| work.id == handle.id)
            .map(|work| {
                if work.handle.is_finished() {
                    WorkStatus::Finished
                } else {
                    WorkStatus::Running
                }
            })
    }

    /// Handle of the instance currently registered under `name`.
    pub async fn current(&self, name: &str) -> Option<WorkHandle> {
        let works = self.works.lock().await;
        works.get(name).map(|work| WorkHandle {
            id: work.id,
            name: name.to_string(),
        })
    }

    /// Wait for the work to reach its terminal state and forget it.
    pub async fn join(&self, handle: &WorkHandle) -> Result<WorkflowState, SchedulerError> {
        let work = {
            let mut works = self.works.lock().await;
            let current = works.get(&handle.name).map(|work| work.id);
            if current == Some(handle.id) {
                works.remove(&handle.name)
            } else {
                None
            }
        };
        let work = work.ok_or(SchedulerError::UnknownWork(handle.id))?;

        work.handle.await.map_err(|e| SchedulerError::JoinFailed {
            id: handle.id,
            message: e.to_string(),
        })
    }

    /// Cancel all work and wait for it to stop. Work enqueued afterwards
    /// starts out cancelled.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let works: Vec<ManagedWork> = {
            let mut works = self.works.lock().await;
            works.drain().map(|(_, work)| work).collect()
        };
        for work in works {
            if let Err(e) = work.handle.await {
                tracing::warn!(id = %work.id, error = %e, "work did not stop cleanly");
            }
        }
    }
}
