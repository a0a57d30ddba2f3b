//! Relative period tokens such as `24h`, `7d`, `2w` or `1.5m`.
//!
//! A token is a (possibly fractional) number followed by a single unit:
//! hours, days, 7-day weeks or 30-day months. Months are a fixed-length
//! approximation, not calendar months. Cutoffs are always computed in UTC.

use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, AppResult};

/// Token that disables the cutoff entirely
pub const ALL_PERIOD: &str = "all";

const HOUR_SECS: f64 = 3_600.0;
const DAY_SECS: f64 = 86_400.0;
const WEEK_SECS: f64 = 604_800.0;
const MONTH_SECS: f64 = 2_592_000.0;

fn unit_seconds(unit: char) -> Option<f64> {
    match unit {
        'h' => Some(HOUR_SECS),
        'd' => Some(DAY_SECS),
        'w' => Some(WEEK_SECS),
        'm' => Some(MONTH_SECS),
        _ => None,
    }
}

/// Convert a period token into the absolute instant `now - period`.
pub fn parse_period(token: &str, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    let invalid = || AppError::InvalidPeriod(token.to_string());

    if token.chars().count() < 2 {
        return Err(invalid());
    }

    let (unit_idx, unit) = token.char_indices().last().ok_or_else(invalid)?;
    let unit_secs = unit_seconds(unit).ok_or_else(invalid)?;

    let amount: f64 = token[..unit_idx].parse().map_err(|_| invalid())?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid());
    }

    let millis = (amount * unit_secs * 1_000.0).round();
    if millis >= i64::MAX as f64 {
        return Err(invalid());
    }

    let span = Duration::try_milliseconds(millis as i64).ok_or_else(invalid)?;
    now.checked_sub_signed(span).ok_or_else(invalid)
}

/// Resolve the optional `period` parameter of a request.
///
/// A missing or blank token falls back to `default_period`. Either one may be
/// `all`, which yields no cutoff (everything is included).
pub fn resolve_cutoff(
    token: Option<&str>,
    default_period: &str,
    now: DateTime<Utc>,
) -> AppResult<Option<DateTime<Utc>>> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(default_period);

    if token.eq_ignore_ascii_case(ALL_PERIOD) {
        return Ok(None);
    }

    parse_period(token, now).map(Some)
}
