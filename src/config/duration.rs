// src/config/duration.rs

//! Duration literals used by `restartAfter`, `startAfter` and `duration`.
//!
//! Accepted forms are a sequence of `<number><unit>` pairs such as `"500ms"`,
//! `"5s"`, `"1h30m"` or `"1.5s"`. Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`.
//! A bare `"0"` is allowed. A leading `-` is accepted and yields zero, which
//! every caller treats as "disabled". Surrounding whitespace is rejected, and
//! so is anything larger than [`Duration::MAX`].

use std::time::Duration;

/// Parse a duration literal.
///
/// The empty string is *not* handled here; callers treat an absent/empty
/// field as "disabled" before calling this.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (negative, body) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    if body == "0" {
        return Ok(Duration::ZERO);
    }
    if body.is_empty() {
        return Err("missing number".to_string());
    }

    let mut total_nanos: u128 = 0;
    let mut rest = body;

    while !rest.is_empty() {
        let num_end = rest
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (num_part, after_num) = rest.split_at(num_end);
        if num_part.is_empty() || num_part == "." {
            return Err(format!("expected a number before '{after_num}'"));
        }

        let unit_end = after_num
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map(|(i, _)| i)
            .unwrap_or(after_num.len());
        let (unit, next) = after_num.split_at(unit_end);
        if unit.is_empty() {
            return Err(format!("missing unit after '{num_part}'"));
        }

        let unit_nanos = unit_in_nanos(unit)?;
        total_nanos = total_nanos
            .checked_add(scale(num_part, unit_nanos)?)
            .ok_or_else(|| "duration overflows".to_string())?;
        rest = next;
    }

    if negative {
        return Ok(Duration::ZERO);
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000)
        .map_err(|_| "duration overflows".to_string())?;
    let nanos = (total_nanos % 1_000_000_000) as u32;
    Ok(Duration::new(secs, nanos))
}

fn unit_in_nanos(unit: &str) -> Result<u128, String> {
    match unit {
        "ns" => Ok(1),
        "us" | "µs" | "μs" => Ok(1_000),
        "ms" => Ok(1_000_000),
        "s" => Ok(1_000_000_000),
        "m" => Ok(60 * 1_000_000_000),
        "h" => Ok(60 * 60 * 1_000_000_000),
        other => Err(format!(
            "unknown unit '{other}'; expected ns, us, ms, s, m or h"
        )),
    }
}

/// Multiply a decimal literal by a unit without going through floats.
fn scale(num: &str, unit_nanos: u128) -> Result<u128, String> {
    let (int_part, frac_part) = match num.split_once('.') {
        Some((i, f)) => (i, f),
        None => (num, ""),
    };
    if frac_part.contains('.') {
        return Err(format!("invalid number '{num}'"));
    }

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|e| format!("invalid number '{num}': {e}"))?
    };
    let mut total = int_value
        .checked_mul(unit_nanos)
        .ok_or_else(|| "duration overflows".to_string())?;

    let mut divisor = 1u128;
    for digit in frac_part.chars().take(18) {
        divisor *= 10;
        let d = u128::from(digit.to_digit(10).ok_or_else(|| format!("invalid number '{num}'"))?);
        total = d
            .checked_mul(unit_nanos)
            .map(|n| n / divisor)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| "duration overflows".to_string())?;
    }

    Ok(total)
}
