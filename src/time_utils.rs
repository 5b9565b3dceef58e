// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Convert an RFC3339 watermark into epoch seconds for Strava's `after` filter.
///
/// Empty input means "from the beginning" and yields `None`.
pub fn watermark_to_epoch(watermark: &str) -> Result<Option<i64>, chrono::ParseError> {
    let watermark = watermark.trim();
    if watermark.is_empty() {
        return Ok(None);
    }
    Ok(Some(DateTime::parse_from_rfc3339(watermark)?.timestamp()))
}

/// Date component of a Strava timestamp such as `2024-03-05T07:12:00Z`.
pub fn local_date(timestamp: &str) -> Option<NaiveDate> {
    let date = timestamp.split('T').next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Date tokens understood in folder templates, longest match first.
const DATE_TOKENS: [(&str, &str); 10] = [
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("dddd", "%A"),
    ("ddd", "%a"),
    ("DD", "%d"),
    ("D", "%-d"),
];

/// Day of month with an English ordinal suffix (`Do`).
const ORDINAL_DAY_TOKEN: &str = "Do";

/// Translate a `YYYY/MM/DD`-style template into a chrono format string.
///
/// Text inside `[...]` is copied literally. `Do` is resolved here against
/// `day` since chrono has no ordinal specifier. Returns the pattern and
/// whether any date token was found.
fn translate_date_format(template: &str, day: u32) -> (String, bool) {
    let mut pattern = String::with_capacity(template.len() + 8);
    let mut found = false;
    let mut rest = template;

    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            let end = rest.find(']').unwrap_or(rest.len());
            for lit in rest[1..end].chars() {
                push_literal(&mut pattern, lit);
            }
            rest = rest.get(end + 1..).unwrap_or("");
            continue;
        }

        if let Some(after) = rest.strip_prefix(ORDINAL_DAY_TOKEN) {
            pattern.push_str(&ordinal(day));
            found = true;
            rest = after;
            continue;
        }

        for (token, spec) in DATE_TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                pattern.push_str(spec);
                found = true;
                rest = after;
                continue 'outer;
            }
        }

        push_literal(&mut pattern, c);
        rest = &rest[c.len_utf8()..];
    }

    (pattern, found)
}

fn push_literal(pattern: &mut String, c: char) {
    if c == '%' {
        pattern.push_str("%%");
    } else {
        pattern.push(c);
    }
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", day, suffix)
}

/// Expand a folder template against a date, or `None` if it has no date token.
pub fn expand_date_format(template: &str, date: NaiveDate) -> Option<String> {
    let (pattern, found) = translate_date_format(template, date.day());
    found.then(|| date.format(&pattern).to_string())
}
