use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;

use fitlog_core::Storage;
use fitlog_core::models::User;

/// Parse a point in time for a workout, measurement, or deadline.
///
/// Accepts `now`/`today`/`yesterday`/`tomorrow` (relative to the current
/// instant), RFC 3339 timestamps, and `YYYY-MM-DD` (local midnight).
pub(crate) fn parse_instant(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match s {
        "now" | "today" => Ok(now),
        "yesterday" => Ok(now - Duration::days(1)),
        "tomorrow" => Ok(now + Duration::days(1)),
        _ => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Ok(ts.with_timezone(&Utc));
            }
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| {
                format!(
                    "Invalid date '{s}'. Use YYYY-MM-DD, an RFC 3339 timestamp, or today/yesterday/tomorrow"
                )
            })?;
            let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
            Ok(midnight
                .and_local_timezone(Local)
                .earliest()
                .map_or_else(|| midnight.and_utc(), |t| t.with_timezone(&Utc)))
        }
    }
}

pub(crate) fn parse_date(date_str: Option<&str>) -> Result<DateTime<Utc>> {
    let now = Utc::now();
    date_str.map_or(Ok(now), |s| parse_instant(s, now))
}

/// Like [`parse_date`], but `none` means "no deadline".
pub(crate) fn parse_deadline(s: &str) -> Result<Option<DateTime<Utc>>> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_date(Some(s)).map(Some)
}

pub(crate) fn resolve_user(store: &dyn Storage, username: &str) -> Result<User> {
    store
        .get_user_by_username(username)?
        .with_context(|| {
            format!("No user named '{username}'. Run `fitlog seed` to create the demo user.")
        })
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}


pub(crate) fn format_date(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub(crate) fn format_opt(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}{unit}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
