use std::sync::Arc;

use clap::{Args, ValueEnum};

use autohangup_core::progress::{NullProgress, ProgressSink};
use autohangup_core::{
    Config, Event, HangupService, HrMinSec, PermissionGate, ProgressSnapshot, SimulatedTelephony,
    TelephonyController,
};

use crate::display::{JsonLines, StatusLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Simulate {
    /// Pretend a call is in progress
    Active,
    /// Pretend there is no call
    Idle,
    /// Pretend every telephony request is refused
    Denied,
}

#[derive(Args)]
pub struct StartArgs {
    /// Countdown as H:M:S, M:S or S
    duration: Option<HrMinSec>,

    #[arg(long, default_value_t = 0)]
    hours: u32,
    #[arg(long, default_value_t = 0)]
    minutes: u32,
    #[arg(long, default_value_t = 0)]
    seconds: u32,

    /// Use a simulated phone instead of the configured commands
    #[arg(long, value_enum)]
    simulate: Option<Simulate>,

    /// Start even if required permissions are not granted in config
    #[arg(long)]
    allow_missing_permissions: bool,

    /// Print events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Don't show the remaining time
    #[arg(long, short)]
    quiet: bool,
}

impl StartArgs {
    fn duration(&self) -> HrMinSec {
        self.duration
            .unwrap_or_else(|| HrMinSec::new(self.hours, self.minutes, self.seconds))
    }
}

fn telephony(
    config: &Config,
    simulate: Option<Simulate>,
) -> Result<Arc<dyn TelephonyController>, Box<dyn std::error::Error>> {
    Ok(match simulate {
        Some(Simulate::Active) => Arc::new(SimulatedTelephony::with_active_call()),
        Some(Simulate::Idle) => Arc::new(SimulatedTelephony::idle()),
        Some(Simulate::Denied) => {
            let phone = SimulatedTelephony::with_active_call();
            phone.deny_all();
            Arc::new(phone)
        }
        None => {
            let phone = config.command_telephony();
            if !phone.is_configured() {
                return Err("telephony is not configured: set telephony.status_command and \
                            telephony.hangup_command, or pass --simulate"
                    .into());
            }
            Arc::new(phone)
        }
    })
}

fn emit(event: &Event, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        Event::CountdownArmed {
            work_id,
            duration_ms,
            ..
        } => println!(
            "Countdown armed for {} (work {work_id})",
            autohangup_core::to_hr_min_sec(*duration_ms as i64)
        ),
        Event::CountdownReplaced {
            previous_work_id, ..
        } => println!("Replaced running countdown {previous_work_id}"),
        Event::CountdownFinished { message, .. } => println!("{message}"),
        Event::Progress { .. } => {}
    }
    Ok(())
}

pub fn run(args: StartArgs) -> Result<(), Box<dyn std::error::Error>> {
    let duration = args.duration();
    let config = Config::load()?;

    let missing = config.permission_gate().missing_required();
    if !missing.is_empty() && !args.allow_missing_permissions {
        let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
        return Err(format!(
            "cannot use Auto Hangup with insufficient permissions (missing: {})",
            names.join(", ")
        )
        .into());
    }

    let phone = telephony(&config, args.simulate)?;
    let display: Arc<dyn ProgressSink> = match (args.quiet, args.json) {
        (true, _) => Arc::new(NullProgress),
        (false, true) => Arc::new(JsonLines),
        (false, false) => Arc::new(StatusLine),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let service = HangupService::from_config(&config, phone, display);
        let armed = service.arm(duration.to_ms()).await;
        for event in armed.events() {
            emit(&event, args.json)?;
        }

        let mut progress = service.progress();
        tokio::select! {
            finished = progress.wait_for(|s| matches!(s, ProgressSnapshot::Finished(_))) => {
                finished?;
            }
            interrupted = tokio::signal::ctrl_c() => {
                interrupted?;
                tracing::info!("interrupted, stopping countdown");
                service.disarm().await;
            }
        }

        let (handle, state) = service.wait().await?;
        emit(&Event::finished(handle.id, state), args.json)?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_duration_wins_over_flags() {
        let args = StartArgs {
            duration: Some(HrMinSec::new(0, 1, 0)),
            hours: 2,
            minutes: 0,
            seconds: 0,
            simulate: None,
            allow_missing_permissions: false,
            json: false,
            quiet: false,
        };
        assert_eq!(args.duration().to_ms(), 60_000);
    }

    #[test]
    fn unconfigured_commands_are_rejected() {
        let config = Config::default();
        assert!(telephony(&config, None).is_err());
        assert!(telephony(&config, Some(Simulate::Idle)).is_ok());
    }
}
