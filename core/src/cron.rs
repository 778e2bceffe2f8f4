//! Cron expression handling for 5-field Unix schedules.
//!
//! Parsing and occurrence calculation go through the `cron` crate, which
//! expects 7 fields (with seconds and year) and numbers day-of-week 1-7 from
//! Sunday. Expressions are converted before parsing; callers only ever see
//! the 5-field form.
//!
//! When both day-of-month and day-of-week are restricted, a run fires on a
//! day matching either field (Unix semantics). The `cron` crate requires
//! both, so such expressions are split into two schedules whose occurrence
//! streams are merged.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::{CronlyticError, Result};

const FIELD: &str = "cron_expression";
const FIELD_NAMES: [&str; 5] = ["minute", "hour", "day", "month", "day-of-week"];

/// Validate a 5-field cron expression and return it trimmed.
pub fn validate_cron_expression(expression: &str) -> Result<String> {
    let expr = expression.trim();
    if expr.is_empty() {
        return Err(CronlyticError::validation(FIELD, "Cron expression cannot be empty", expr));
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(CronlyticError::validation(
            FIELD,
            "Cron expression must have exactly 5 fields (minute hour day month day-of-week)",
            expr,
        ));
    }

    for (name, field) in FIELD_NAMES.iter().zip(&fields) {
        if !field.chars().all(|c| c.is_ascii_digit() || matches!(c, '*' | ',' | '/' | '-')) {
            return Err(CronlyticError::validation(
                FIELD,
                format!("Invalid {name} field: '{field}'. Only numbers, *, -, /, and , are allowed"),
                expr,
            ));
        }
    }

    let schedule = parse(expr)
        .map_err(|e| CronlyticError::validation(FIELD, format!("Invalid cron expression: {e}"), expr))?;
    if schedule.after(&Utc::now()).next().is_none() {
        return Err(CronlyticError::validation(
            FIELD,
            "Invalid cron expression: Cannot compute next execution time",
            expr,
        ));
    }

    Ok(fields.join(" "))
}

/// Next `n` run times after now, as `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Display only: any failure yields an empty list.
pub fn next_n_execution_times(expression: &str, n: usize) -> Vec<String> {
    next_execution_times_after(expression, Utc::now(), n)
}

/// Next `n` run times strictly after `after`.
pub fn next_execution_times_after(expression: &str, after: DateTime<Utc>, n: usize) -> Vec<String> {
    match parse(expression) {
        Ok(schedule) => schedule.after(&after).take(n).map(|t| format_timestamp(&t)).collect(),
        Err(_) => Vec::new(),
    }
}

/// Human description for well-known schedules.
pub fn describe(expression: &str) -> &'static str {
    if parse(expression).is_err() {
        return "Custom cron schedule";
    }
    match expression.trim() {
        "* * * * *" => "Every minute",
        "*/5 * * * *" => "Every 5 minutes",
        "*/10 * * * *" => "Every 10 minutes",
        "*/15 * * * *" => "Every 15 minutes",
        "*/30 * * * *" => "Every 30 minutes",
        "0 * * * *" => "Every hour",
        "0 */2 * * *" => "Every 2 hours",
        "0 */6 * * *" => "Every 6 hours",
        "0 */12 * * *" => "Every 12 hours",
        "0 0 * * *" => "Daily at midnight",
        "0 9 * * *" => "Daily at 9:00 AM",
        "0 0 * * 0" => "Weekly on Sunday at midnight",
        "0 0 1 * *" => "Monthly on the 1st at midnight",
        "0 0 1 1 *" => "Yearly on January 1st at midnight",
        _ => "Custom schedule (next run calculated dynamically)",
    }
}

/// Format a UTC instant the way the API reports times.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// A parsed 5-field expression: one schedule, or a day-of-month and a
/// day-of-week schedule that fire on either.
struct UnixSchedule {
    schedules: Vec<Schedule>,
}

impl UnixSchedule {
    /// Occurrences strictly after `after`, ascending and deduplicated.
    fn after<'a>(&'a self, after: &DateTime<Utc>) -> impl Iterator<Item = DateTime<Utc>> + 'a {
        let mut streams: Vec<_> = self.schedules.iter().map(|s| s.after(after).peekable()).collect();
        std::iter::from_fn(move || {
            let next = streams.iter_mut().filter_map(|s| s.peek().copied()).min()?;
            for s in streams.iter_mut() {
                if s.peek() == Some(&next) {
                    s.next();
                }
            }
            Some(next)
        })
    }
}

fn parse(expression: &str) -> std::result::Result<UnixSchedule, String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let [minute, hour, dom, month, dow] = fields.as_slice() else {
        return Err(format!("expected 5 fields, got {}", fields.len()));
    };
    let dow = convert_day_of_week(dow)?;
    let build = |dom: &str, dow: &str| {
        Schedule::from_str(&format!("0 {minute} {hour} {dom} {month} {dow} *")).map_err(|e| e.to_string())
    };
    let schedules = if *dom != "*" && dow != "*" {
        vec![build(*dom, "*")?, build("*", dow.as_str())?]
    } else {
        vec![build(*dom, dow.as_str())?]
    };
    Ok(UnixSchedule { schedules })
}

/// Rewrite a Unix day-of-week field (0-7, Sunday = 0 or 7) to the `cron`
/// crate's numbering (1-7, Sunday = 1).
fn convert_day_of_week(field: &str) -> std::result::Result<String, String> {
    if field == "*" {
        return Ok("*".to_string());
    }

    let mut days = BTreeSet::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((r, s)) => {
                let step: u8 = s.parse().map_err(|_| format!("invalid step '{s}' in day-of-week"))?;
                if step == 0 {
                    return Err("day-of-week step cannot be zero".to_string());
                }
                (r, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = match range {
            "*" => (0, 6),
            r => match r.split_once('-') {
                Some((a, b)) => (day_number(a)?, day_number(b)?),
                None => {
                    let d = day_number(r)?;
                    (d, if step.is_some() { 6 } else { d })
                }
            },
        };
        if start > end {
            return Err(format!("invalid day-of-week range '{range}'"));
        }

        let step = step.unwrap_or(1) as usize;
        for d in (start..=end).step_by(step) {
            days.insert(d % 7);
        }
    }

    if days.len() == 7 {
        return Ok("*".to_string());
    }
    Ok(days.iter().map(|d| (d + 1).to_string()).collect::<Vec<_>>().join(","))
}

fn day_number(s: &str) -> std::result::Result<u8, String> {
    match s.parse::<u8>() {
        Ok(d) if d <= 7 => Ok(d),
        _ => Err(format!("invalid day-of-week value '{s}'")),
    }
}
