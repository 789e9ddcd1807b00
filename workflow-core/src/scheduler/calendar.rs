//! Calendar-expression text format (spec §3.3, §6.5): newline-separated
//! `key=value` lines, whitespace-tolerant, unknown keys ignored.

use chrono::{DateTime, Duration, Utc};

/// A parsed calendar expression. Field values are carried as their raw
/// text (e.g. `"*"`, `"0"`, `"MON-FRI"`) rather than a resolved cron AST —
/// no scenario in spec §8 requires range/list grammar, only the simplest
/// `"*"` repetition on one field (see DESIGN.md).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalendarExpression {
    pub second: Option<String>,
    pub minute: Option<String>,
    pub hour: Option<String>,
    pub day_of_week: Option<String>,
    pub day_of_month: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub timezone: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl CalendarExpression {
    pub fn parse(text: &str) -> Self {
        let mut expr = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key {
                "second" => expr.second = Some(value),
                "minute" => expr.minute = Some(value),
                "hour" => expr.hour = Some(value),
                "dayOfWeek" => expr.day_of_week = Some(value),
                "dayOfMonth" => expr.day_of_month = Some(value),
                "month" => expr.month = Some(value),
                "year" => expr.year = Some(value),
                "timezone" => expr.timezone = Some(value),
                "start" => expr.start = Some(value),
                "end" => expr.end = Some(value),
                _ => {} // unknown keys are ignored, per spec §6.5
            }
        }
        expr
    }

    /// The next firing instant after `from`, or `None` if the expression
    /// carries no field this implementation can resolve to a period.
    pub fn next_timeout_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.period().map(|period| from + period)
    }

    fn period(&self) -> Option<Duration> {
        if self.second.as_deref() == Some("*") {
            return Some(Duration::seconds(1));
        }
        if self.minute.as_deref() == Some("*") {
            return Some(Duration::minutes(1));
        }
        if self.hour.as_deref() == Some("*") {
            return Some(Duration::hours(1));
        }
        if self.day_of_month.as_deref() == Some("*") {
            return Some(Duration::days(1));
        }
        None
    }
}
