//! User-facing time formatting
//!
//! Reminder instants are stored and scheduled in UTC. These helpers turn them
//! into strings the user reads in their own offset.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};

/// Format an instant as wall-clock time in the user's offset, e.g. `03:25, 30 October`
pub fn format_local(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant
        .with_timezone(&offset)
        .format("%H:%M, %-d %B")
        .to_string()
}

/// Describe how far away an instant is, e.g. `in 2 hours 5 minutes`
///
/// Anything already due (or due within the next second) reads as `right away`.
pub fn format_relative(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = instant.signed_duration_since(now).num_seconds();
    if seconds <= 0 {
        "right away".to_string()
    } else {
        format!("in {}", format_duration(seconds))
    }
}

/// Format a duration in seconds into a human-readable string
pub fn format_duration(seconds: i64) -> String {
    fn unit(value: i64, name: &str) -> String {
        format!("{} {}{}", value, name, if value == 1 { "" } else { "s" })
    }

    if seconds < 60 {
        unit(seconds, "second")
    } else if seconds < 3600 {
        unit(seconds / 60, "minute")
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!("{} {}", unit(hours, "hour"), unit(mins, "minute"))
        } else {
            unit(hours, "hour")
        }
    } else {
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        if hours > 0 {
            format!("{} {}", unit(days, "day"), unit(hours, "hour"))
        } else {
            unit(days, "day")
        }
    }
}

/// Parse a UTC offset such as `+05:00`, `-03:30`, `+5` or `Z`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow::anyhow!("Invalid UTC offset"));
    }

    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => return Err(anyhow::anyhow!("UTC offset must start with + or -: {}", value)),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid hours in UTC offset: {}", value))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid minutes in UTC offset: {}", value))?;

    if hours > 14 || minutes >= 60 {
        return Err(anyhow::anyhow!("UTC offset out of range: {}", value));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow::anyhow!("UTC offset out of range: {}", value))
}
