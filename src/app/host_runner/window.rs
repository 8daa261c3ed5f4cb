//! Time window resolution from human duration strings.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static DURATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)([smhd])$").expect("duration pattern is valid"));

/// Parse `<n>s`, `<n>m`, `<n>h` or `<n>d`
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    let Some(captures) = DURATION_PATTERN.captures(input) else {
        bail!(
            "Invalid duration '{}'. Use s/m/h/d (e.g. 1h, 5m).",
            input
        );
    };

    let amount: u64 = captures[1]
        .parse()
        .with_context(|| format!("Duration '{}' is too large", input))?;
    let unit_seconds = match &captures[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => 86_400,
    };

    let seconds = amount
        .checked_mul(unit_seconds)
        .with_context(|| format!("Duration '{}' is too large", input))?;
    if seconds == 0 {
        bail!("Duration '{}' must be greater than zero", input);
    }

    Ok(Duration::from_secs(seconds))
}

/// Parse an optional bound where "none" (or "off") disables it
pub fn parse_optional_duration(input: &str) -> Result<Option<Duration>> {
    match input.trim().to_ascii_lowercase().as_str() {
        "none" | "off" => Ok(None),
        _ => parse_duration(input).map(Some),
    }
}

/// Query window in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// Window of `length` ending at `now`
    pub fn ending_at(now: i64, length: Duration) -> Result<Self> {
        let length = i64::try_from(length.as_secs()).context("Time window is too large")?;
        let start = now.checked_sub(length).unwrap_or(i64::MIN);
        if start < 0 {
            bail!("Time window of {}s reaches before the epoch", length);
        }
        Ok(Self { start, end: now })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in ["", "h", "1", "1w", "1.5h", "-1h", "1 h", "0m"] {
            assert!(parse_duration(input).is_err(), "'{}' should be rejected", input);
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse_duration("99999999999999999999d").is_err());
        assert!(parse_duration("999999999999999999d").is_err());
    }

    #[test]
    fn test_optional_duration() {
        assert_eq!(parse_optional_duration("none").unwrap(), None);
        assert_eq!(parse_optional_duration("OFF").unwrap(), None);
        assert_eq!(
            parse_optional_duration("15m").unwrap(),
            Some(Duration::from_secs(900))
        );
    }

    #[test]
    fn test_window_ending_at() {
        let window = TimeWindow::ending_at(10_000, Duration::from_secs(3600)).unwrap();
        assert_eq!(window, TimeWindow { start: 6_400, end: 10_000 });
    }

    #[test]
    fn test_window_before_epoch_is_rejected() {
        let now = 1_700_000_000;
        let err = TimeWindow::ending_at(now, parse_duration("30000d").unwrap()).unwrap_err();
        assert!(err.to_string().contains("before the epoch"));

        let window = TimeWindow::ending_at(now, Duration::from_secs(now as u64)).unwrap();
        assert_eq!(window.start, 0);
    }
}
