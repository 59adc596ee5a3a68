//! Schedule expressions.
//!
//! Supported forms:
//! - five-field cron (`min hour dom month dow`), minute granularity
//! - six/seven-field cron with a leading seconds field
//! - descriptors: `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
//!   `@midnight`, `@hourly`
//! - fixed intervals: `@every 30s`, `@every 1m30s`, `@every 250ms`
//!
//! All cron forms are evaluated in UTC.

use crate::error::SchedulerError;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::time::Duration;

/// A parsed schedule expression.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Calendar based schedule.
    Cron(Box<cron::Schedule>),
    /// Fixed interval between fires.
    Every(Duration),
}

impl Schedule {
    /// Returns the first fire time strictly after `now`.
    ///
    /// `None` means the schedule never fires again.
    #[must_use]
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Cron(schedule) => schedule.after(&now).next(),
            Self::Every(interval) => {
                let interval = chrono::Duration::from_std(*interval).ok()?;
                now.checked_add_signed(interval)
            }
        }
    }
}

impl FromStr for Schedule {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expr = s.trim();
        let invalid = |reason: String| SchedulerError::ScheduleInvalid {
            expr: s.to_string(),
            reason,
        };

        if expr.is_empty() {
            return Err(invalid("empty expression".to_string()));
        }

        if let Some(rest) = expr.strip_prefix("@every") {
            return parse_interval(rest.trim()).map(Self::Every).map_err(invalid);
        }

        let cron_expr = match expr {
            "@yearly" | "@annually" => "0 0 0 1 1 *".to_string(),
            "@monthly" => "0 0 0 1 * *".to_string(),
            "@weekly" => "0 0 0 * * Sun".to_string(),
            "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
            "@hourly" => "0 0 * * * *".to_string(),
            descriptor if descriptor.starts_with('@') => {
                return Err(invalid(format!("unknown descriptor {descriptor}")));
            }
            _ => expand_fields(expr).map_err(invalid)?,
        };

        cron::Schedule::from_str(&cron_expr)
            .map(|schedule| Self::Cron(Box::new(schedule)))
            .map_err(|e| invalid(e.to_string()))
    }
}

/// Turns a five-field expression into the seconds-first form understood by
/// the `cron` crate. Six and seven field expressions pass through.
fn expand_fields(expr: &str) -> Result<String, String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => {
            let dow = shift_day_of_week(fields[4]);
            Ok(format!(
                "0 {} {} {} {} {}",
                fields[0], fields[1], fields[2], fields[3], dow
            ))
        }
        6 | 7 => Ok(fields.join(" ")),
        n => Err(format!("expected 5 to 7 fields, found {n}")),
    }
}

/// Classic cron numbers weekdays 0-6 from Sunday (7 is Sunday too); the
/// `cron` crate numbers them 1-7 from Sunday.
fn shift_day_of_week(field: &str) -> String {
    field.split(',').map(shift_day_part).collect::<Vec<_>>().join(",")
}

fn shift_day_part(part: &str) -> String {
    let (range, step) = match part.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (part, None),
    };
    let with_step = |range: String| match step {
        Some(step) => format!("{range}/{step}"),
        None => range,
    };

    let Some((lo, hi)) = range.split_once('-') else {
        return match range.parse::<u8>() {
            Ok(0 | 7) => with_step("1".to_string()),
            Ok(n) => with_step(n.saturating_add(1).to_string()),
            Err(_) => part.to_string(),
        };
    };
    let (Ok(lo), Ok(hi)) = (lo.parse::<u8>(), hi.parse::<u8>()) else {
        return part.to_string();
    };

    if hi != 7 {
        return with_step(format!("{}-{}", lo.saturating_add(1), hi.saturating_add(1)));
    }
    if lo >= 7 {
        return "1".to_string();
    }

    // Sunday at the top of the range wraps around to the start of the week.
    let Ok(stride) = step.map_or(Ok(1), str::parse::<u8>) else {
        return part.to_string();
    };
    let shifted = with_step(format!("{}-7", lo + 1));
    if lo != 0 && stride != 0 && (7 - lo) % stride == 0 {
        format!("{shifted},1")
    } else {
        shifted
    }
}

/// Parses interval strings such as `30s`, `1m30s`, `1h` or `250ms`.
fn parse_interval(input: &str) -> Result<Duration, String> {
    if input.is_empty() {
        return Err("missing interval after @every".to_string());
    }

    let too_large = || format!("interval '{input}' is too large");
    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return Err(format!("expected a number in '{input}'"));
        }
        let amount: u64 = rest[..digits]
            .parse()
            .map_err(|e| format!("invalid number in '{input}': {e}"))?;
        rest = &rest[digits..];

        let unit_len = rest.chars().take_while(char::is_ascii_alphabetic).count();
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.checked_mul(60).ok_or_else(too_large)?),
            "h" => Duration::from_secs(amount.checked_mul(3600).ok_or_else(too_large)?),
            "" => return Err(format!("missing unit in '{input}'")),
            unit => return Err(format!("unknown unit '{unit}' in '{input}'")),
        };
        rest = &rest[unit_len..];
        total = total.checked_add(part).ok_or_else(too_large)?;
    }

    if total.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(total)
}
