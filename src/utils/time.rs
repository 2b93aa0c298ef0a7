// src/utils/time.rs

//! Time input parsing and human-readable formatting.

use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::error::{AppError, Result};

/// Epoch-second inputs below this are rejected as accidental integers.
const EPOCH_SANITY_FLOOR: i64 = 10_000_000;

fn relative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(\d+)([a-zA-Z])$").expect("valid regex"))
}

/// Parse a caller-supplied time input.
///
/// Accepted forms:
/// - absolute timestamps (RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]`),
/// - relative offsets like `1h`, `-2d`, `30m` (units `s m h d w y`),
///   resolving to `now - value`,
/// - Unix epoch seconds.
pub fn parse_time(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::validation("empty time input"));
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Utc.from_utc_datetime(&t));
        }
    }
    if let Some(t) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&t));
    }

    if let Some(caps) = relative_re().captures(input) {
        let value: i64 = caps[1]
            .parse()
            .map_err(|_| AppError::validation(format!("relative time value too large: {input}")))?;
        let offset = match &caps[2] {
            "s" => chrono::Duration::seconds(value),
            "m" => chrono::Duration::minutes(value),
            "h" => chrono::Duration::hours(value),
            "d" => chrono::Duration::days(value),
            "w" => chrono::Duration::weeks(value),
            "y" => chrono::Duration::days(value * 365),
            unit => {
                return Err(AppError::validation(format!("unknown time unit `{unit}`")));
            }
        };
        return Ok(Utc::now() - offset);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        if seconds < EPOCH_SANITY_FLOOR {
            return Err(AppError::validation(format!(
                "epoch seconds below sanity floor: {seconds}"
            )));
        }
        return DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| AppError::validation(format!("epoch seconds out of range: {seconds}")));
    }

    Err(AppError::validation(format!(
        "unparsable time input: {input}"
    )))
}

/// Format a duration for status strings, e.g. `42.00 seconds`,
/// `4.50 minutes`, `1.25 hours`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs <= 60.0 {
        format!("{secs:.2} seconds")
    } else if secs <= 3600.0 {
        format!("{:.2} minutes", secs / 60.0)
    } else {
        format!("{:.2} hours", secs / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_hour_resolves_against_now() {
        let parsed = parse_time("1h").expect("parse");
        let expected = Utc::now() - chrono::Duration::hours(1);
        let drift = (parsed - expected).num_seconds().abs();
        assert!(drift <= 2, "drift was {drift}s");
    }

    #[test]
    fn leading_minus_is_accepted() {
        let plain = parse_time("2d").expect("parse");
        let negated = parse_time("-2d").expect("parse");
        let drift = (plain - negated).num_seconds().abs();
        assert!(drift <= 2);
    }

    #[test]
    fn all_units_parse() {
        for input in ["10s", "5m", "3h", "2d", "1w", "1y"] {
            assert!(parse_time(input).is_ok(), "failed on {input}");
        }
    }

    #[test]
    fn bogus_input_is_rejected() {
        assert!(parse_time("bogus").is_err());
        assert!(parse_time("").is_err());
        assert!(parse_time("12x3h").is_err());
        assert!(parse_time("5q").is_err());
    }

    #[test]
    fn epoch_seconds_parse_above_floor() {
        let parsed = parse_time("1500000000").expect("parse");
        assert_eq!(parsed.timestamp(), 1_500_000_000);
    }

    #[test]
    fn small_integers_are_not_epoch_times() {
        assert!(parse_time("12345").is_err());
    }

    #[test]
    fn absolute_timestamps_parse() {
        assert!(parse_time("2026-01-15T10:30:00Z").is_ok());
        assert!(parse_time("2026-01-15 10:30:00").is_ok());
        assert!(parse_time("2026-01-15").is_ok());
    }

    #[test]
    fn durations_format_by_magnitude() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42.00 seconds");
        assert_eq!(format_duration(Duration::from_secs(270)), "4.50 minutes");
        assert_eq!(format_duration(Duration::from_secs(4500)), "1.25 hours");
    }
}
