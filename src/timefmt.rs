//! Timestamp parsing and display helpers.
//!
//! Query parameters accept a handful of human date formats; anything
//! unparseable is treated as absent rather than an error, so stale or
//! malformed links degrade to "no filter".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Try each accepted format in turn; dates without a time component are
/// taken as midnight UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            return nd.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
        }
    }
    None
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// "3d ago" style rendering relative to `now`. Future timestamps and
/// anything under a minute read as "just now".
pub fn relative_time(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - dt;
    let secs = diff.num_seconds();
    if secs < 60 {
        return "just now".to_string();
    }
    let days = diff.num_days();
    if days > 0 {
        return format!("{days}d ago");
    }
    let hours = diff.num_hours();
    if hours > 0 {
        return format!("{hours}h ago");
    }
    format!("{}m ago", diff.num_minutes())
}
