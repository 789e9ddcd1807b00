//! `<itemvalue>`/`<date>` template substitution (spec §4.6), used by the
//! mail/ACL/report plugins to resolve subject/body/query templates against
//! a workitem.

use crate::item::{ItemCollection, Value};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn date_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<date\b([^>]*?)/?>"#).unwrap())
}

fn itemvalue_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)<itemvalue\b([^>]*?)>(.*?)</itemvalue>"#).unwrap())
}

fn attr_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([A-Za-z_]+)\s*=\s*"([^"]*)""#).unwrap())
}

fn parse_attrs(raw: &str) -> HashMap<String, String> {
    attr_tag().captures_iter(raw).map(|c| (c[1].to_string(), c[2].to_string())).collect()
}

/// Resolves every `<date>` tag, then every `<itemvalue>` tag, against
/// `workitem` (spec §4.6: "`<date>` is pre-expanded ... before the
/// surrounding template is otherwise processed").
pub fn adapt_text(template: &str, workitem: &ItemCollection) -> String {
    let expanded_dates = expand_date_tags(template);
    expand_itemvalue_tags(&expanded_dates, workitem)
}

fn expand_date_tags(template: &str) -> String {
    date_tag()
        .replace_all(template, |c: &regex::Captures| {
            let attrs = parse_attrs(&c[1]);
            render_date(&attrs)
        })
        .into_owned()
}

fn attr_i64(attrs: &HashMap<String, String>, key: &str) -> Option<i64> {
    attrs.get(key).and_then(|v| v.parse::<i64>().ok())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.unwrap().signed_duration_since(NaiveDate::from_ymd_opt(year, month, 1).unwrap()).num_days() as u32
}

/// Renders a `<date>` directive to `yyyyMMdd`, evaluated relative to "now"
/// with the DAY_OF_MONTH/MONTH/YEAR overrides and a single `ADD="FIELD,OFFSET"`
/// adjustment (spec §4.6).
fn render_date(attrs: &HashMap<String, String>) -> String {
    let now = Utc::now();
    let mut year = attr_i64(attrs, "YEAR").map(|v| v as i32).unwrap_or(now.year());
    let mut month = attr_i64(attrs, "MONTH").map(|v| v as u32).unwrap_or(now.month());
    let mut day = now.day();

    if attrs.get("MONTH").map(String::as_str) == Some("ACTUAL_MAXIMUM") {
        month = 12;
    }
    if let Some(dom) = attrs.get("DAY_OF_MONTH") {
        day = if dom == "ACTUAL_MAXIMUM" { days_in_month(year, month) } else { dom.parse().unwrap_or(day) };
    }
    if let Some(doy) = attr_i64(attrs, "DAY_OF_YEAR") {
        let base = NaiveDate::from_ymd_opt(year, 1, 1).unwrap() + Duration::days(doy - 1);
        year = base.year();
        month = base.month();
        day = base.day();
    }

    day = day.min(days_in_month(year, month));
    let mut date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap());

    if let Some(add) = attrs.get("ADD") {
        if let Some((field, offset)) = add.split_once(',') {
            let offset: i64 = offset.trim().parse().unwrap_or(0);
            date = match field.trim() {
                "YEAR" => NaiveDate::from_ymd_opt(date.year() + offset as i32, date.month(), date.day()).unwrap_or(date),
                "MONTH" => add_months(date, offset),
                _ => date + Duration::days(offset),
            };
        }
    }

    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

fn add_months(date: NaiveDate, offset: i64) -> NaiveDate {
    let total = date.year() as i64 * 12 + date.month() as i64 - 1 + offset;
    let year = (total.div_euclid(12)) as i32;
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn expand_itemvalue_tags(template: &str, workitem: &ItemCollection) -> String {
    itemvalue_tag()
        .replace_all(template, |c: &regex::Captures| {
            let attrs = parse_attrs(&c[1]);
            let item_name = c[2].trim();
            render_itemvalue(&attrs, item_name, workitem)
        })
        .into_owned()
}

fn render_itemvalue(attrs: &HashMap<String, String>, item_name: &str, workitem: &ItemCollection) -> String {
    let values = workitem.get_item_value(item_name);
    let format = attrs.get("format").map(String::as_str);

    if let Some(separator) = attrs.get("separator") {
        return values.iter().map(|v| format_value(v, format)).collect::<Vec<_>>().join(separator);
    }

    let picked = if attrs.get("position").map(String::as_str) == Some("last") { values.last() } else { values.first() };
    picked.map(|v| format_value(v, format)).unwrap_or_default()
}

/// Spec §4.6: timestamps use `format` as a `chrono` date pattern; a
/// `format` containing `#` is treated as a numeric decimal pattern; else
/// the value's default `toString`.
fn format_value(value: &Value, format: Option<&str>) -> String {
    if let Value::Instant(dt) = value {
        return match format {
            Some(pattern) => dt.format(pattern).to_string(),
            None => value.to_display_string(),
        };
    }
    if let Some(pattern) = format {
        if pattern.contains('#') {
            if let Some(num) = value.as_f64() {
                let precision = pattern.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0);
                return format!("{num:.precision$}");
            }
        }
    }
    value.to_display_string()
}
