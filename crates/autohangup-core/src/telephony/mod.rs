//! Host telephony and permission seams.
//!
//! The workflow only ever talks to a [`TelephonyController`]. Permission
//! checks live in [`GatedTelephony`], which wraps any controller and refuses
//! to call through when the [`PermissionGate`] says the capability is missing.

mod command;
mod gate;
mod simulated;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use command::{CommandSpec, CommandTelephony};
pub use gate::{AllowAll, StaticPermissionGate};
pub use simulated::SimulatedTelephony;

use crate::error::TelephonyError;

/// Named host capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Needed to end a call.
    AnswerPhoneCalls,
    /// Needed to ask whether a call is in progress.
    ReadPhoneState,
    /// Optional; progress is simply not shown without it.
    PostNotifications,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::AnswerPhoneCalls,
        Capability::ReadPhoneState,
        Capability::PostNotifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::AnswerPhoneCalls => "answer_phone_calls",
            Capability::ReadPhoneState => "read_phone_state",
            Capability::PostNotifications => "post_notifications",
        }
    }

    /// Capabilities without which the app cannot do its job.
    pub fn is_required(&self) -> bool {
        !matches!(self, Capability::PostNotifications)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean check per named capability.
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self, capability: Capability) -> bool;

    /// Required capabilities that are not granted.
    fn missing_required(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| c.is_required() && !self.is_granted(*c))
            .collect()
    }
}

/// Call-state query and termination.
///
/// Implementations must not block the calling thread.
#[async_trait]
pub trait TelephonyController: Send + Sync {
    /// Whether a call is currently in progress.
    async fn is_call_active(&self) -> Result<bool, TelephonyError>;

    /// Attempt to end the active call. `Ok(false)` means the host declined.
    async fn end_active_call(&self) -> Result<bool, TelephonyError>;
}

#[async_trait]
impl<T: TelephonyController + ?Sized> TelephonyController for std::sync::Arc<T> {
    async fn is_call_active(&self) -> Result<bool, TelephonyError> {
        (**self).is_call_active().await
    }

    async fn end_active_call(&self) -> Result<bool, TelephonyError> {
        (**self).end_active_call().await
    }
}

/// Consults a [`PermissionGate`] before delegating to the inner controller.
#[derive(Debug, Clone)]
pub struct GatedTelephony<T, G> {
    inner: T,
    gate: G,
}

impl<T, G> GatedTelephony<T, G>
where
    T: TelephonyController,
    G: PermissionGate,
{
    pub fn new(inner: T, gate: G) -> Self {
        Self { inner, gate }
    }

    fn require(&self, capability: Capability) -> Result<(), TelephonyError> {
        if self.gate.is_granted(capability) {
            Ok(())
        } else {
            tracing::warn!(%capability, "telephony call refused, permission not granted");
            Err(TelephonyError::Unauthorized(capability))
        }
    }
}

#[async_trait]
impl<T, G> TelephonyController for GatedTelephony<T, G>
where
    T: TelephonyController,
    G: PermissionGate,
{
    async fn is_call_active(&self) -> Result<bool, TelephonyError> {
        self.require(Capability::ReadPhoneState)?;
        self.inner.is_call_active().await
    }

    async fn end_active_call(&self) -> Result<bool, TelephonyError> {
        self.require(Capability::AnswerPhoneCalls)?;
        self.inner.end_active_call().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gate_blocks_query_without_read_phone_state() {
        let phone = SimulatedTelephony::with_active_call();
        let gate = StaticPermissionGate::new([Capability::AnswerPhoneCalls]);
        let gated = GatedTelephony::new(phone.clone(), gate);

        assert_eq!(
            gated.is_call_active().await,
            Err(TelephonyError::Unauthorized(Capability::ReadPhoneState))
        );
        assert_eq!(phone.query_count(), 0);
    }

    #[tokio::test]
    async fn gate_blocks_termination_without_answer_phone_calls() {
        let phone = SimulatedTelephony::with_active_call();
        let gate = StaticPermissionGate::new([Capability::ReadPhoneState]);
        let gated = GatedTelephony::new(phone.clone(), gate);

        assert_eq!(gated.is_call_active().await, Ok(true));
        assert_eq!(
            gated.end_active_call().await,
            Err(TelephonyError::Unauthorized(Capability::AnswerPhoneCalls))
        );
        assert_eq!(phone.end_count(), 0);
        assert!(phone.call_active());
    }

    #[tokio::test]
    async fn gate_passes_through_when_granted() {
        let phone = SimulatedTelephony::with_active_call();
        let gated = GatedTelephony::new(phone.clone(), AllowAll);

        assert_eq!(gated.end_active_call().await, Ok(true));
        assert!(!phone.call_active());
    }

    #[test]
    fn missing_required_ignores_optional_capabilities() {
        let gate = StaticPermissionGate::new([
            Capability::AnswerPhoneCalls,
            Capability::ReadPhoneState,
        ]);
        assert!(gate.missing_required().is_empty());

        let gate = StaticPermissionGate::new([Capability::PostNotifications]);
        assert_eq!(
            gate.missing_required(),
            vec![Capability::AnswerPhoneCalls, Capability::ReadPhoneState]
        );
    }
}
