// src/config/duration.rs

use std::time::Duration;

/// Upper bound for delays and intervals; anything longer is almost certainly
/// a typo and would overflow timer arithmetic.
pub const MAX_DURATION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit (ms, s, m or h)"))?;
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid duration number '{digits}': {e}"))?;

    let (millis_per_unit, unit) = match unit.trim().to_lowercase().as_str() {
        "ms" => (1, "ms"),
        "s" => (1_000, "s"),
        "m" => (60_000, "m"),
        "h" => (3_600_000, "h"),
        other => {
            return Err(format!(
                "unsupported duration unit '{other}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{value}{unit}' is too large"))
}

/// Like [`parse_duration`] but only accepts `0 < d <= MAX_DURATION`; used
/// for periods and quiet windows.
pub fn parse_positive_duration(s: &str) -> Result<Duration, String> {
    let d = parse_duration(s)?;
    if d.is_zero() {
        return Err(format!("duration '{}' must be greater than zero", s.trim()));
    }
    if d > MAX_DURATION {
        return Err(format!(
            "duration '{}' is too large; the maximum is {}h",
            s.trim(),
            MAX_DURATION.as_secs() / 3600
        ));
    }
    Ok(d)
}
