//! Clock and day labels for conversation history.
//!
//! The `_in` variants take an explicit time zone so tests can pin UTC; the
//! plain variants use the local zone.

use chrono::{DateTime, Local, TimeZone, Timelike};

pub const MISSING_CLOCK: &str = "--:--";

/// "09:05AM" style 12-hour clock, or `--:--` when there is no timestamp.
pub fn format_clock(unix_seconds: i64) -> String {
    format_clock_in(unix_seconds, &Local)
}

pub fn format_clock_in<Tz: TimeZone>(unix_seconds: i64, tz: &Tz) -> String {
    let Some(local) = to_zone(unix_seconds, tz) else {
        return MISSING_CLOCK.to_string();
    };
    let hour = local.hour();
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = match hour % 12 {
        0 => 12,
        other => other,
    };
    format!("{hour12:02}:{:02}{suffix}", local.minute())
}

/// Calendar day in `YYYY-MM-DD`, used to detect day boundaries.
pub fn day_key_in<Tz: TimeZone>(unix_seconds: i64, tz: &Tz) -> Option<String> {
    to_zone(unix_seconds, tz).map(|local| local.date_naive().format("%Y-%m-%d").to_string())
}

/// "Sun, Oct 18, 2026"
pub fn day_label_in<Tz: TimeZone>(unix_seconds: i64, tz: &Tz) -> Option<String> {
    to_zone(unix_seconds, tz).map(|local| local.date_naive().format("%a, %b %-d, %Y").to_string())
}

fn to_zone<Tz: TimeZone>(unix_seconds: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    if unix_seconds == 0 {
        return None;
    }
    DateTime::from_timestamp(unix_seconds, 0).map(|utc| utc.with_timezone(tz))
}
