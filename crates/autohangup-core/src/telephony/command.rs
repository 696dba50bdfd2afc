//! Telephony through external commands.
//!
//! Lets the CLI drive whatever actually owns the modem: `adb shell`, an
//! `mmcli` wrapper, a vendor tool. A command answers `true` by exiting with
//! status 0 and `false` with any other status. Commands that outlive the
//! timeout are killed and reported as unavailable.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::{Capability, TelephonyController};
use crate::error::TelephonyError;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Program plus arguments, stored in config as a TOML array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandSpec(pub Vec<String>);

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(argv.into_iter().map(Into::into).collect())
    }

    async fn run(&self, capability: Capability, timeout: Duration) -> Result<bool, TelephonyError> {
        let (program, args) = self
            .0
            .split_first()
            .ok_or_else(|| TelephonyError::Unavailable("empty command".into()))?;

        // kill_on_drop reaps the child when the timeout or a cancelled caller
        // drops the future
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        let status = tokio::time::timeout(timeout, status)
            .await
            .map_err(|_| {
                tracing::warn!(%program, timeout_ms = timeout.as_millis() as u64, "telephony command timed out");
                TelephonyError::Unavailable(format!(
                    "{program}: no answer within {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => TelephonyError::Unauthorized(capability),
                _ => TelephonyError::Unavailable(format!("{program}: {e}")),
            })?;

        tracing::debug!(%program, code = ?status.code(), "telephony command finished");
        Ok(status.success())
    }
}

/// [`TelephonyController`] that shells out to configured commands.
#[derive(Debug, Clone)]
pub struct CommandTelephony {
    status: Option<CommandSpec>,
    hangup: Option<CommandSpec>,
    timeout: Duration,
}

impl Default for CommandTelephony {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl CommandTelephony {
    pub fn new(status: Option<CommandSpec>, hangup: Option<CommandSpec>) -> Self {
        Self {
            status,
            hangup,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_configured(&self) -> bool {
        self.status.is_some() && self.hangup.is_some()
    }
}

#[async_trait]
impl TelephonyController for CommandTelephony {
    async fn is_call_active(&self) -> Result<bool, TelephonyError> {
        self.status
            .as_ref()
            .ok_or_else(|| TelephonyError::Unavailable("no status command configured".into()))?
            .run(Capability::ReadPhoneState, self.timeout)
            .await
    }

    async fn end_active_call(&self) -> Result<bool, TelephonyError> {
        self.hangup
            .as_ref()
            .ok_or_else(|| TelephonyError::Unavailable("no hangup command configured".into()))?
            .run(Capability::AnswerPhoneCalls, self.timeout)
            .await
    }
}
