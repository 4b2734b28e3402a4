// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing for .NET `TimeSpan` strings, the format used by TRX `duration` attributes.

use crate::errors::DurationParseError;
use std::time::Duration;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

// TimeSpan has a resolution of 100ns ticks, so at most 7 fractional digits are meaningful.
const MAX_FRACTION_DIGITS: usize = 7;

/// The largest duration a `TimeSpan` can hold: `i64::MAX` ticks, or `10675199.02:48:05.4775807`.
pub const MAX_TIMESPAN: Duration = Duration::new(922_337_203_685, 477_580_700);

/// Parses a duration in the .NET `TimeSpan` text format.
///
/// Accepted forms are a bare day count (`d`) and `[d.]hh:mm[:ss[.fraction]]`, with optional
/// surrounding whitespace. Negative durations and durations above [`MAX_TIMESPAN`] are rejected.
///
/// # Examples
///
/// ```
/// use quick_trx::parse_timespan;
/// use std::time::Duration;
///
/// assert_eq!(parse_timespan("00:00:01.5").unwrap(), Duration::from_millis(1500));
/// assert_eq!(parse_timespan("1.00:00:00").unwrap(), Duration::from_secs(86_400));
/// ```
pub fn parse_timespan(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::new(input, "input is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(DurationParseError::new(
            input,
            "negative durations are not supported",
        ));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let duration = match parts.as_slice() {
        [days] => {
            let days = parse_number(input, days, u64::MAX / SECS_PER_DAY, "invalid day count")?;
            Duration::from_secs(days * SECS_PER_DAY)
        }
        [days_hours, minutes] => {
            let secs = parse_days_hours(input, days_hours)? + parse_minutes(input, minutes)?;
            Duration::from_secs(secs)
        }
        [days_hours, minutes, seconds] => {
            let secs = parse_days_hours(input, days_hours)? + parse_minutes(input, minutes)?;
            let (seconds, nanos) = match seconds.split_once('.') {
                Some((seconds, fraction)) => (seconds, parse_fraction(input, fraction)?),
                None => (*seconds, 0),
            };
            let seconds = parse_number(input, seconds, SECS_PER_MINUTE - 1, "invalid seconds")?;
            Duration::new(secs + seconds, nanos)
        }
        _ => return Err(DurationParseError::new(input, "too many `:` separators")),
    };

    if duration > MAX_TIMESPAN {
        return Err(DurationParseError::new(input, "exceeds TimeSpan.MaxValue"));
    }
    Ok(duration)
}

fn parse_days_hours(input: &str, component: &str) -> Result<u64, DurationParseError> {
    let (days, hours) = match component.split_once('.') {
        Some((days, hours)) => (
            parse_number(input, days, u64::MAX / SECS_PER_DAY - 1, "invalid day count")?,
            hours,
        ),
        None => (0, component),
    };
    let hours = parse_number(input, hours, 23, "invalid hours")?;
    Ok(days * SECS_PER_DAY + hours * SECS_PER_HOUR)
}

fn parse_minutes(input: &str, component: &str) -> Result<u64, DurationParseError> {
    Ok(parse_number(input, component, SECS_PER_MINUTE - 1, "invalid minutes")? * SECS_PER_MINUTE)
}

fn parse_fraction(input: &str, fraction: &str) -> Result<u32, DurationParseError> {
    if fraction.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(DurationParseError::new(
            input,
            "fraction must be 1 to 7 digits",
        ));
    }
    // Right-pad to nanosecond precision: "5" is 500ms, "0000001" is one 100ns tick.
    let padded = format!("{fraction:0<9}");
    padded
        .parse()
        .map_err(|_| DurationParseError::new(input, "fraction must be 1 to 7 digits"))
}

fn parse_number(
    input: &str,
    component: &str,
    max: u64,
    reason: &'static str,
) -> Result<u64, DurationParseError> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DurationParseError::new(input, reason));
    }
    match component.parse::<u64>() {
        Ok(value) if value <= max => Ok(value),
        _ => Err(DurationParseError::new(input, reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("00:00:10", Duration::from_secs(10) ; "seconds")]
    #[test_case("00:00:00.0000001", Duration::from_nanos(100) ; "one tick")]
    #[test_case("00:00:01.5", Duration::from_millis(1500) ; "short fraction")]
    #[test_case("01:02:03.0450000", Duration::new(3723, 45_000_000) ; "full precision")]
    #[test_case("12:30", Duration::from_secs(12 * 3600 + 30 * 60) ; "hours and minutes")]
    #[test_case("2", Duration::from_secs(2 * 86_400) ; "days only")]
    #[test_case("1.02:00:00", Duration::from_secs(86_400 + 2 * 3600) ; "days and hours")]
    #[test_case("  00:00:05  ", Duration::from_secs(5) ; "surrounding whitespace")]
    #[test_case("10675199.02:48:05.4775807", MAX_TIMESPAN ; "largest timespan")]
    fn parse_valid(input: &str, expected: Duration) {
        assert_eq!(parse_timespan(input).expect("input is valid"), expected);
    }

    #[test_case("", "input is empty" ; "empty")]
    #[test_case("-00:00:01", "negative durations are not supported" ; "negative")]
    #[test_case("00:60:00", "invalid minutes" ; "minutes out of range")]
    #[test_case("00:00:60", "invalid seconds" ; "seconds out of range")]
    #[test_case("24:00:00", "invalid hours" ; "hours out of range")]
    #[test_case("00:00:01.12345678", "fraction must be 1 to 7 digits" ; "fraction too long")]
    #[test_case("00:00:01.", "fraction must be 1 to 7 digits" ; "empty fraction")]
    #[test_case("00:00:00:00", "too many `:` separators" ; "too many parts")]
    #[test_case("ab:cd", "invalid hours" ; "not a number")]
    #[test_case("+1", "invalid day count" ; "explicit sign")]
    #[test_case("10675199.02:48:05.4775808", "exceeds TimeSpan.MaxValue" ; "one tick too long")]
    #[test_case("10675200", "exceeds TimeSpan.MaxValue" ; "too many days")]
    #[test_case("200000000000000.00:00:00", "exceeds TimeSpan.MaxValue" ; "far too many days")]
    fn parse_invalid(input: &str, reason: &str) {
        let err = parse_timespan(input).expect_err("input is invalid");
        assert_eq!(err.reason(), reason);
        assert_eq!(err.input(), input);
    }
}
