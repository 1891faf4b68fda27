//! Shared utilities for CLI commands.

use std::io::Write;
use std::sync::LazyLock;

use afk_engine::ApiResponse;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;

/// Pre-compiled regex for relative instants.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(in)\s+)?(\d+)\s+(second|minute|hour|day)s?(?:\s+(ago))?$").unwrap()
});

/// Upper bound for relative offsets (~100 years in seconds).
const MAX_RELATIVE_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// Parses the `--at` instant relative to `now`.
///
/// Supports:
/// - "now"
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Past: "90 seconds ago", "2 hours ago"
/// - Future: "in 5 minutes"
pub fn parse_instant(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid instant: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z), 'N minutes ago' or 'in N minutes'"
        );
    };
    let future = caps.get(1).is_some();
    let past = caps.get(4).is_some();
    if future == past {
        anyhow::bail!("Invalid instant: {s}. Say either 'in N units' or 'N units ago'");
    }

    let n: i64 = caps[2]
        .parse()
        .context("failed to parse number in relative time")?;
    let seconds_per_unit = match &caps[3] {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        "day" => 24 * 60 * 60,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };
    if n > MAX_RELATIVE_SECONDS / seconds_per_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[3]);
    }

    let offset = Duration::seconds(n * seconds_per_unit);
    Ok(if future { now + offset } else { now - offset })
}

/// Prints `response` as pretty JSON and reports whether it succeeded.
pub fn print_response<W: Write, T: Serialize>(
    writer: &mut W,
    response: &ApiResponse<T>,
) -> anyhow::Result<bool> {
    serde_json::to_writer_pretty(&mut *writer, response).context("failed to encode response")?;
    writeln!(writer)?;
    Ok(response.success)
}

/// Renders seconds as `1h 2m 3s`, omitting leading zero units.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_absolute_and_now() {
        assert_eq!(parse_instant("now", now()).unwrap(), now());
        assert_eq!(
            parse_instant("2026-03-01T13:00:00+01:00", now()).unwrap(),
            now()
        );
    }

    #[test]
    fn parses_relative_offsets() {
        assert_eq!(
            parse_instant("90 seconds ago", now()).unwrap(),
            now() - Duration::seconds(90)
        );
        assert_eq!(
            parse_instant("in 2 minutes", now()).unwrap(),
            now() + Duration::minutes(2)
        );
        assert_eq!(
            parse_instant("1 day ago", now()).unwrap(),
            now() - Duration::days(1)
        );
    }

    #[test]
    fn rejects_ambiguous_or_garbage() {
        assert!(parse_instant("5 minutes", now()).is_err());
        assert!(parse_instant("in 5 minutes ago", now()).is_err());
        assert!(parse_instant("yesterday", now()).is_err());
        assert!(parse_instant("99999999999 days ago", now()).is_err());
    }

    #[test]
    fn duration_rendering() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3723), "1h 2m 3s");
    }
}
