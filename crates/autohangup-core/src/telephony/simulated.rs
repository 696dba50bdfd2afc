//! In-memory telephony used for dry runs and tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{Capability, TelephonyController};
use crate::error::TelephonyError;

#[derive(Debug, Default)]
struct Inner {
    call_active: AtomicBool,
    deny: AtomicBool,
    decline_end: AtomicBool,
    queries: AtomicUsize,
    ends: AtomicUsize,
}

/// A fake phone. Clones share state, so a test can keep one handle and give
/// another to the workflow.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTelephony {
    inner: Arc<Inner>,
}

impl SimulatedTelephony {
    /// No call in progress.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_active_call() -> Self {
        let phone = Self::default();
        phone.set_call_active(true);
        phone
    }

    pub fn set_call_active(&self, active: bool) {
        self.inner.call_active.store(active, Ordering::SeqCst);
    }

    /// Make every operation fail as if the host had revoked permissions.
    pub fn deny_all(&self) {
        self.inner.deny.store(true, Ordering::SeqCst);
    }

    /// Report `Ok(false)` from `end_active_call` and leave the call up.
    pub fn decline_end(&self) {
        self.inner.decline_end.store(true, Ordering::SeqCst);
    }

    pub fn call_active(&self) -> bool {
        self.inner.call_active.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.inner.queries.load(Ordering::SeqCst)
    }

    pub fn end_count(&self) -> usize {
        self.inner.ends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelephonyController for SimulatedTelephony {
    async fn is_call_active(&self) -> Result<bool, TelephonyError> {
        self.inner.queries.fetch_add(1, Ordering::SeqCst);
        if self.inner.deny.load(Ordering::SeqCst) {
            return Err(TelephonyError::Unauthorized(Capability::ReadPhoneState));
        }
        Ok(self.call_active())
    }

    async fn end_active_call(&self) -> Result<bool, TelephonyError> {
        self.inner.ends.fetch_add(1, Ordering::SeqCst);
        if self.inner.deny.load(Ordering::SeqCst) {
            return Err(TelephonyError::Unauthorized(Capability::AnswerPhoneCalls));
        }
        if self.inner.decline_end.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.inner.call_active.swap(false, Ordering::SeqCst))
    }
}
