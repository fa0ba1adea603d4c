//! `date` filter and the shared date formatter.
//!
//! Patterns use the familiar day.js tokens:
//!
//! | Token | Output |
//! |---|---|
//! | `YY` / `YYYY` | 24 / 2024 |
//! | `M` / `MM` / `MMM` / `MMMM` | 1 / 01 / Jan / January |
//! | `D` / `DD` | 5 / 05 |
//! | `d` / `dd` / `ddd` / `dddd` | 0 / Su / Sun / Sunday |
//! | `H` / `HH`, `h` / `hh` | 24-hour / 12-hour |
//! | `m` / `mm`, `s` / `ss`, `SSS` | minutes, seconds, milliseconds |
//! | `A` / `a` | AM / am |
//! | `Z` / `ZZ` | +02:00 / +0200 |
//! | `LT`, `LTS`, `L`–`LLLL`, `l`–`llll` | localized (en) formats |
//!
//! Text inside `[brackets]` is copied verbatim.

use std::borrow::Cow;

use chrono::{
    DateTime, Datelike, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};

use super::ValidationError;
use super::args::{arg, check_arity, optional_strict_string};
use crate::template::value::Value;

const NAME: &str = "date";

/// Pattern used when no format is given.
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DDTHH:mm:ssZ";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub(super) fn date_filter(args: &[Value]) -> Result<Value, ValidationError> {
    check_arity(NAME, args, 2)?;

    let date = parse_date(arg(args, 0))
        .ok_or_else(|| ValidationError::new(NAME, 0, describe_invalid(arg(args, 0))))?;
    let pattern = optional_strict_string(NAME, 1, arg(args, 1))?;

    Ok(Value::String(format_date(&date, pattern)))
}

fn describe_invalid(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => "is a required field".to_string(),
        Value::String(s) => format!("'{s}' is not a valid date"),
        Value::Number(_) => "is not a valid date".to_string(),
        other => format!("expected a date, got {}", other.type_name()),
    }
}

/// Interpret a value as a local date.
///
/// Numbers are epoch milliseconds. Strings may be ISO-8601 like
/// (`2024-03-05`, `2024-03-05 14:30`, `2024-03-05T14:30:00.250`) and are read
/// as local time unless they carry an offset; RFC 2822 strings are accepted
/// too. Everything else is not a date.
pub fn parse_date(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::Date(date) => Some(date.with_timezone(&Local).fixed_offset()),
        Value::Number(millis) if millis.is_finite() => Local
            .timestamp_millis_opt(*millis as i64)
            .single()
            .map(|d| d.fixed_offset()),
        Value::String(text) => parse_date_text(text.trim()),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<FixedOffset>> {
    if text.is_empty() {
        return None;
    }
    if let Some(local) = parse_local_iso(text) {
        return Some(local);
    }
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .ok()
        .map(|d| d.with_timezone(&Local).fixed_offset())
}

/// Local date-time layouts, tried in order after separators are normalized.
const LOCAL_DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y%m%dT%H%M%S%.f",
];

const LOCAL_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

/// `YYYY[-/]M[-/]D[T ]H:m[:s[.SSS]]`, with month and day optional when no
/// time follows.
fn parse_local_iso(text: &str) -> Option<DateTime<FixedOffset>> {
    if !text.as_bytes().get(..4)?.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let normalized = normalize_separators(text);

    let naive = LOCAL_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .or_else(|| {
            ["", "-1", "-1-1"]
                .iter()
                .find_map(|missing| {
                    let padded = format!("{normalized}{missing}");
                    LOCAL_DATE_FORMATS
                        .iter()
                        .find_map(|format| NaiveDate::parse_from_str(&padded, format).ok())
                })
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(d) => Some(d.fixed_offset()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.fixed_offset()),
        LocalResult::None => None,
    }
}

/// `/` becomes `-`; runs of whitespace and `t` between date and time become `T`.
fn normalize_separators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for part in text
        .split(|c: char| c == 'T' || c == 't' || c.is_whitespace())
        .filter(|part| !part.is_empty())
    {
        if !out.is_empty() {
            out.push('T');
        }
        out.push_str(part);
    }
    out.replace('/', "-")
}

/// Format a date in local time. `None` uses [`DEFAULT_DATE_FORMAT`].
pub fn format_date(date: &DateTime<FixedOffset>, pattern: Option<&str>) -> String {
    let local = date.with_timezone(&Local);
    let pattern = expand_localized(pattern.unwrap_or(DEFAULT_DATE_FORMAT));
    format_tokens(&local, &pattern)
}

/// Expand `LT`, `LTS`, `L`..`LLLL` and `l`..`llll` to their English patterns.
fn expand_localized(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains(['L', 'l']) {
        return Cow::Borrowed(pattern);
    }

    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '['
            && let Some(close) = rest.find(']')
        {
            out.push_str(&rest[..=close]);
            rest = &rest[close + 1..];
            continue;
        }

        let expansion = [
            ("LTS", "h:mm:ss A"),
            ("LT", "h:mm A"),
            ("LLLL", "dddd, MMMM D, YYYY h:mm A"),
            ("LLL", "MMMM D, YYYY h:mm A"),
            ("LL", "MMMM D, YYYY"),
            ("L", "MM/DD/YYYY"),
            ("llll", "ddd, MMM D, YYYY h:mm A"),
            ("lll", "MMM D, YYYY h:mm A"),
            ("ll", "MMM D, YYYY"),
            ("l", "M/D/YYYY"),
        ]
        .into_iter()
        .find(|(token, _)| rest.starts_with(token));

        match expansion {
            Some((token, replacement)) => {
                out.push_str(replacement);
                rest = &rest[token.len()..];
            },
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            },
        }
    }

    Cow::Owned(out)
}

fn format_tokens(date: &DateTime<Local>, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '['
            && let Some(close) = rest.find(']')
        {
            out.push_str(&rest[1..close]);
            rest = &rest[close + 1..];
            continue;
        }

        let max_run = match c {
            'Y' | 'M' | 'd' => 4,
            'D' | 'H' | 'h' | 'm' | 's' | 'Z' => 2,
            'S' => 3,
            'A' | 'a' => 1,
            _ => 0,
        };
        if max_run == 0 {
            out.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        }

        let run = rest.bytes().take(max_run).take_while(|b| *b == c as u8).count();
        let token = &rest[..run];
        if !push_token(&mut out, date, token) {
            out.push_str(token);
        }
        rest = &rest[run..];
    }

    out
}

fn push_token(out: &mut String, date: &DateTime<Local>, token: &str) -> bool {
    let hour12 = match date.hour() % 12 {
        0 => 12,
        h => h,
    };
    let weekday = date.weekday().num_days_from_sunday() as usize;
    let month = date.month0() as usize;

    match token {
        "YY" => out.push_str(&format!("{:02}", date.year().rem_euclid(100))),
        "YYYY" => out.push_str(&format!("{:04}", date.year())),
        "M" => out.push_str(&date.month().to_string()),
        "MM" => out.push_str(&format!("{:02}", date.month())),
        "MMM" => out.push_str(&MONTHS[month][..3]),
        "MMMM" => out.push_str(MONTHS[month]),
        "D" => out.push_str(&date.day().to_string()),
        "DD" => out.push_str(&format!("{:02}", date.day())),
        "d" => out.push_str(&weekday.to_string()),
        "dd" => out.push_str(&WEEKDAYS[weekday][..2]),
        "ddd" => out.push_str(&WEEKDAYS[weekday][..3]),
        "dddd" => out.push_str(WEEKDAYS[weekday]),
        "H" => out.push_str(&date.hour().to_string()),
        "HH" => out.push_str(&format!("{:02}", date.hour())),
        "h" => out.push_str(&hour12.to_string()),
        "hh" => out.push_str(&format!("{hour12:02}")),
        "m" => out.push_str(&date.minute().to_string()),
        "mm" => out.push_str(&format!("{:02}", date.minute())),
        "s" => out.push_str(&date.second().to_string()),
        "ss" => out.push_str(&format!("{:02}", date.second())),
        "SSS" => out.push_str(&format!("{:03}", date.timestamp_subsec_millis().min(999))),
        "A" => out.push_str(if date.hour() < 12 { "AM" } else { "PM" }),
        "a" => out.push_str(if date.hour() < 12 { "am" } else { "pm" }),
        "Z" | "ZZ" => {
            let offset = date.offset().local_minus_utc();
            let sign = if offset < 0 { '-' } else { '+' };
            let minutes = offset.abs() / 60;
            let separator = if token == "Z" { ":" } else { "" };
            out.push_str(&format!("{sign}{:02}{separator}{:02}", minutes / 60, minutes % 60));
        },
        _ => return false,
    }
    true
}
