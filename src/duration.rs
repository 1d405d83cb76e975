// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Duration parsing for Go-style duration strings.
//!
//! Supports parsing duration strings in Go format (e.g., "30s", "5m", "1h30m", "1.5h")
//! into Rust `std::time::Duration`. Used for the TTL service tag and for the
//! worker intervals in the config file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Longest fraction we keep; anything finer than a nanosecond is dropped.
const MAX_FRACTION_DIGITS: usize = 9;

/// Parse a Go-style duration string into a Rust `Duration`.
///
/// A duration is a sequence of decimal numbers, each with an optional
/// fraction and a mandatory unit suffix. The bare string `"0"` is accepted.
///
/// Supported units:
/// - `ns` (nanoseconds)
/// - `us`, `µs`, `μs` (microseconds)
/// - `ms` (milliseconds)
/// - `s` (seconds)
/// - `m` (minutes)
/// - `h` (hours)
///
/// # Examples
///
/// ```
/// use nomad_external_dns::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
///
/// // Invalid formats return errors
/// assert!(parse_duration("").is_err());
/// assert!(parse_duration("10").is_err());  // Missing unit
/// assert!(parse_duration("10x").is_err()); // Invalid unit
/// ```
///
/// # Errors
///
/// Returns an error if:
/// - The string is empty or negative
/// - A number is missing its unit, or a unit is unknown
/// - The total overflows 64-bit nanoseconds
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let input = duration_str.trim();

    if input.is_empty() {
        bail!("Duration string cannot be empty");
    }
    if input.starts_with('-') {
        bail!("Duration '{input}' must not be negative");
    }

    let body = input.strip_prefix('+').unwrap_or(input);
    if body == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = body;
    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        // Leading number (digits with an optional fraction)
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .with_context(|| format!("Duration '{input}' is missing a unit"))?;
        let (number, after_number) = rest.split_at(number_end);

        // Unit runs until the next number starts
        let unit_end = after_number
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_number.len());
        let (unit, remaining) = after_number.split_at(unit_end);

        let unit_nanos = unit_in_nanos(unit).with_context(|| {
            format!("Unsupported duration unit '{unit}' in '{input}'. Use ns, us, ms, s, m or h")
        })?;

        let component = component_nanos(number, unit_nanos)
            .with_context(|| format!("Invalid number '{number}' in duration '{input}'"))?;

        total_nanos = total_nanos
            .checked_add(component)
            .context("Duration value too large (overflow)")?;
        rest = remaining;
    }

    let nanos = u64::try_from(total_nanos).context("Duration value too large (overflow)")?;
    Ok(Duration::from_nanos(nanos))
}

/// Serde adapter for config fields holding a Go-style duration string.
///
/// # Errors
///
/// Returns a deserialization error if the string is not a valid duration.
pub fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(|e| serde::de::Error::custom(format!("{e:#}")))
}

fn unit_in_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Converts `"<int>[.<frac>]"` in the given unit to nanoseconds.
fn component_nanos(number: &str, unit_nanos: u128) -> Result<u128> {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (number, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        bail!("expected digits");
    }
    if frac_part.contains('.') {
        bail!("more than one decimal point");
    }

    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().context("integer part is not a number")?
    };

    let mut nanos = whole
        .checked_mul(unit_nanos)
        .context("Duration value too large (overflow)")?;

    let frac_digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
    if !frac_digits.is_empty() {
        let frac: u128 = frac_digits.parse().context("fraction is not a number")?;
        let scale = 10u128.pow(u32::try_from(frac_digits.len()).unwrap_or(0));
        nanos = nanos
            .checked_add(frac * unit_nanos / scale)
            .context("Duration value too large (overflow)")?;
    }

    Ok(nanos)
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod duration_tests;
