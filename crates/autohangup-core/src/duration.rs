//! Hours/minutes/seconds conversions.
//!
//! Countdowns are entered as `HH:MM:SS` and handled internally as plain
//! milliseconds. The inverse conversion clamps negatives to zero and drops
//! sub-second remainders, which is what a countdown display wants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MS_PER_SECOND: u64 = 1_000;
pub const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
pub const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Converts hours, minutes and seconds into a relative amount in milliseconds.
pub fn to_ms(hours: u32, minutes: u32, seconds: u32) -> u64 {
    hours as u64 * MS_PER_HOUR + minutes as u64 * MS_PER_MINUTE + seconds as u64 * MS_PER_SECOND
}

/// Converts a relative amount in milliseconds to hours, minutes and seconds.
pub fn to_hr_min_sec(ms: i64) -> HrMinSec {
    let secs = ms.max(0) as u64 / MS_PER_SECOND;
    HrMinSec {
        hours: (secs / 3600) as u32,
        minutes: ((secs % 3600) / 60) as u32,
        seconds: (secs % 60) as u32,
    }
}

/// Text shown next to a running countdown.
pub fn format_remaining(remaining_ms: u64) -> String {
    let hms = to_hr_min_sec(remaining_ms.min(i64::MAX as u64) as i64);
    format!("{hms} remaining")
}

/// A duration split into whole hours, minutes and seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrMinSec {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl HrMinSec {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub fn to_ms(self) -> u64 {
        to_ms(self.hours, self.minutes, self.seconds)
    }
}

impl fmt::Display for HrMinSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

impl FromStr for HrMinSec {
    type Err = ValidationError;

    /// Accepts `H:M:S`, `M:S` or `S`. Minutes and seconds must be below 60
    /// unless they are the leading field.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ValidationError::InvalidDuration {
            input: s.to_string(),
            message: message.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty duration"));
        }

        let mut fields = Vec::with_capacity(3);
        for part in trimmed.split(':') {
            let value = part
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid("expected non-negative integers separated by ':'"))?;
            fields.push(value);
        }

        let (hours, minutes, seconds) = match fields.as_slice() {
            [s] => (0, 0, *s),
            [m, s] => (0, *m, *s),
            [h, m, s] => (*h, *m, *s),
            _ => return Err(invalid("too many ':' separated fields")),
        };

        if fields.len() >= 2 && seconds >= 60 {
            return Err(invalid("seconds must be below 60"));
        }
        if fields.len() == 3 && minutes >= 60 {
            return Err(invalid("minutes must be below 60"));
        }

        Ok(Self::new(hours, minutes, seconds))
    }
}
