use clap::Args;

use autohangup_core::{to_hr_min_sec, HrMinSec};

#[derive(Args)]
pub struct ConvertArgs {
    /// Duration as H:M:S, M:S or S
    #[arg(conflicts_with = "ms", required_unless_present = "ms")]
    duration: Option<HrMinSec>,

    /// Milliseconds to split into HH:MM:SS (negatives clamp to zero)
    #[arg(long, allow_negative_numbers = true)]
    ms: Option<i64>,

    /// Print JSON instead of plain text
    #[arg(long)]
    json: bool,
}

pub fn run(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (hms, ms) = match (args.duration, args.ms) {
        (Some(hms), _) => (hms, hms.to_ms()),
        (None, Some(ms)) => (to_hr_min_sec(ms), ms.max(0) as u64),
        (None, None) => return Err("nothing to convert".into()),
    };

    if args.json {
        let value = serde_json::json!({
            "ms": ms,
            "hours": hms.hours,
            "minutes": hms.minutes,
            "seconds": hms.seconds,
            "display": hms.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if args.duration.is_some() {
        println!("{ms}");
    } else {
        println!("{hms}");
    }
    Ok(())
}
