//! Five-field cron expressions.
//!
//! # Design
//! - Accepts the classic `minute hour day-of-month month day-of-week` form only.
//! - Expressions are normalised for the `cron` crate: a zero seconds field is prepended and
//!   numeric weekdays are shifted from `0-7` (Sunday = 0 or 7) to its `1-7` (Sunday = 1).
//! - Evaluation is timezone-agnostic; the scheduler feeds it local time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use cron::Schedule;

use crate::error::{CleanupError, CleanupResult};

/// A parsed cleanup schedule.
#[derive(Debug, Clone)]
pub struct CleanupSchedule {
    expression: String,
    schedule: Schedule,
}

impl CleanupSchedule {
    /// Parse a five-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError::InvalidSchedule`] for the wrong number of fields or an
    /// unusable weekday, and [`CleanupError::ScheduleParse`] when a field is malformed.
    pub fn parse(expression: &str) -> CleanupResult<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
            return Err(CleanupError::invalid(expression, "expected_five_fields"));
        };

        let day_of_week = translate_day_of_week(day_of_week)
            .ok_or_else(|| CleanupError::invalid(expression, "invalid_day_of_week"))?;
        let normalised = format!("0 {minute} {hour} {day_of_month} {month} {day_of_week}");
        let schedule =
            Schedule::from_str(&normalised).map_err(|source| CleanupError::ScheduleParse {
                expression: expression.to_string(),
                source,
            })?;

        Ok(Self {
            expression: fields.join(" "),
            schedule,
        })
    }

    /// Expression as configured, with whitespace collapsed.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First trigger strictly after `after`, in the same timezone.
    #[must_use]
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.schedule.after(after).next()
    }
}

impl FromStr for CleanupSchedule {
    type Err = CleanupError;

    fn from_str(expression: &str) -> CleanupResult<Self> {
        Self::parse(expression)
    }
}

impl fmt::Display for CleanupSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

fn translate_day_of_week(field: &str) -> Option<String> {
    field
        .split(',')
        .map(translate_item)
        .collect::<Option<Vec<_>>>()
        .map(|items| items.join(","))
}

fn translate_item(item: &str) -> Option<String> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };
    let translated = match range.split_once('-') {
        Some((start, "7")) => {
            // Sunday as a range end wraps to the start of the week.
            if step.is_some() {
                return None;
            }
            format!("{}-7,1", shift_day(start)?)
        }
        Some((start, end)) => format!("{}-{}", shift_day(start)?, shift_day(end)?),
        None => shift_day(range)?,
    };
    Some(match step {
        Some(step) => format!("{translated}/{step}"),
        None => translated,
    })
}

fn shift_day(value: &str) -> Option<String> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return (!value.is_empty()).then(|| value.to_string());
    }
    match value.parse::<u8>().ok()? {
        day @ 0..=6 => Some((day + 1).to_string()),
        7 => Some("1".to_string()),
        _ => None,
    }
}
