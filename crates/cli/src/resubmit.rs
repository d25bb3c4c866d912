//! `--resubmit [N | "YYYY-MM-DD HH:MM:SS"]` handling.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const MAX_RESUBMITS: i32 = 128;

/// When a finished glidein should be submitted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resubmit {
    /// Until the user removes it.
    Forever,
    Times(i32),
    Until(DateTime<Utc>),
}

impl Resubmit {
    /// Parse the option value. Dates are local time and must be in the future.
    pub fn parse(value: Option<&str>, now: DateTime<Local>) -> anyhow::Result<Self> {
        let Some(value) = value.map(str::trim) else {
            return Ok(Resubmit::Forever);
        };

        if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
            let times: i32 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("Resubmits must be between 0 and {MAX_RESUBMITS}"))?;
            if times <= 0 || times > MAX_RESUBMITS {
                anyhow::bail!("Resubmits must be between 0 and {MAX_RESUBMITS}");
            }
            return Ok(Resubmit::Times(times));
        }

        let until = NaiveDateTime::parse_from_str(value, DATE_FORMAT)
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .ok_or_else(|| anyhow::anyhow!("Invalid resubmit option: {value}"))?;
        if until < now {
            anyhow::bail!("Resubmit date should be in the future");
        }
        Ok(Resubmit::Until(until.with_timezone(&Utc)))
    }

    /// Seconds of credential lifetime the glidein will use.
    pub fn required_secs(&self, wall_time_minutes: i32, now: DateTime<Utc>) -> i64 {
        let wall = i64::from(wall_time_minutes) * 60;
        match self {
            Resubmit::Forever => wall,
            Resubmit::Times(times) => i64::from(*times) * wall,
            Resubmit::Until(until) => (*until - now).num_seconds(),
        }
    }

    /// Fields for the create request: `(resubmits, until)`.
    pub fn limits(&self) -> (Option<i32>, Option<DateTime<Utc>>) {
        match self {
            Resubmit::Forever => (None, None),
            Resubmit::Times(times) => (Some(*times), None),
            Resubmit::Until(until) => (None, Some(*until)),
        }
    }
}
