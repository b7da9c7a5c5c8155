//! Parsing helpers for user-supplied schedule times

use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Chat timestamp markup, e.g. `<t:1700000000:F>` (the style suffix is optional)
const HAMMERTIME_PATTERN: &str = r"^<t:([0-9]+):?.*>";

/// Relative duration, e.g. `2d1h5m0s`; every unit is optional but order is fixed
const DURATION_PATTERN: &str =
    r"^(?:(?P<days>\d+)d)?(?:(?P<hours>\d+)h)?(?:(?P<minutes>\d+)m)?(?:(?P<seconds>\d+)s)?$";

static HAMMERTIME: OnceLock<Regex> = OnceLock::new();
static DURATION: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex> {
    if let Some(regex) = cell.get() {
        return Ok(regex);
    }
    let regex = Regex::new(pattern)
        .map_err(|e| Error::Other(format!("invalid time pattern {pattern}: {e}")))?;
    Ok(cell.get_or_init(|| regex))
}

/// Parse a schedule time argument into an absolute instant
///
/// Accepts either a chat timestamp (`<t:EPOCH>` or `<t:EPOCH:STYLE>`), taken
/// as UTC epoch seconds, or a relative duration such as `2d1h5m0s` added to
/// `now`. A duration that matches nothing or adds up to zero is rejected.
///
/// # Examples
///
/// ```
/// use chrono::{TimeDelta, Utc};
/// use stream_dl::utils::parse_schedule_time;
///
/// let now = Utc::now();
/// let at = parse_schedule_time("1h30m", now).unwrap();
/// assert_eq!(at - now, TimeDelta::minutes(90));
///
/// let at = parse_schedule_time("<t:1700000000:F>", now).unwrap();
/// assert_eq!(at.timestamp(), 1_700_000_000);
/// ```
pub fn parse_schedule_time(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Some(captures) = compiled(&HAMMERTIME, HAMMERTIME_PATTERN)?.captures(input) {
        let epoch: i64 = captures[1]
            .parse()
            .map_err(|_| invalid_time(input, "timestamp out of range"))?;
        return DateTime::from_timestamp(epoch, 0)
            .ok_or_else(|| invalid_time(input, "timestamp out of range"));
    }

    let captures = compiled(&DURATION, DURATION_PATTERN)?
        .captures(input)
        .ok_or_else(|| invalid_time(input, "expected <t:EPOCH> or a duration like 2d1h5m0s"))?;

    let mut total = TimeDelta::zero();
    for (unit, seconds_per_unit) in [("days", 86_400), ("hours", 3_600), ("minutes", 60), ("seconds", 1)]
    {
        if let Some(value) = captures.name(unit) {
            let part = value
                .as_str()
                .parse::<i64>()
                .ok()
                .and_then(|n| n.checked_mul(seconds_per_unit))
                .and_then(TimeDelta::try_seconds)
                .ok_or_else(|| invalid_time(input, "duration too large"))?;
            total = total
                .checked_add(&part)
                .ok_or_else(|| invalid_time(input, "duration too large"))?;
        }
    }

    if total.is_zero() {
        return Err(invalid_time(input, "duration must be greater than zero"));
    }

    now.checked_add_signed(total)
        .ok_or_else(|| invalid_time(input, "duration too large"))
}

fn invalid_time(input: &str, reason: &str) -> Error {
    Error::Config {
        message: format!("cannot parse time {input:?}: {reason}"),
        key: None,
    }
}
