//! Value normalization shared by the condition builders.
//!
//! Lucene values arrive with their escape sequences intact. Turning one into
//! an SQL comparison happens in a fixed order: SQL wildcard characters that
//! are part of the literal are escaped first, then unescaped Lucene wildcards
//! (`*`, `?`) become SQL wildcards (`%`, `_`), and finally Lucene escapes are
//! resolved to the characters they protect. Values are processed in a single
//! left-to-right pass so that a character produced by one step is never
//! reinterpreted by a later one.

use crate::error::SearchError;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Comparison a Lucene value translates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MatchValue {
    /// No wildcards: compare with `=` against the unescaped literal.
    Exact(String),
    /// `LIKE` pattern using `\` as the escape character.
    Pattern(String),
}

/// True if `value` contains an unescaped `*` or `?`.
pub(crate) fn has_wildcards(value: &str) -> bool {
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

/// Resolves Lucene escape sequences (`\:` becomes `:`).
pub(crate) fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            result.push(chars.next().unwrap_or('\\'));
        } else {
            result.push(ch);
        }
    }
    result
}

/// Create a LIKE pattern from a Lucene value
pub(crate) fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 8);
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => push_literal(&mut pattern, chars.next().unwrap_or('\\')),
            '*' => pattern.push('%'),
            '?' => pattern.push('_'),
            other => push_literal(&mut pattern, other),
        }
    }
    pattern
}

fn push_literal(pattern: &mut String, ch: char) {
    if matches!(ch, '%' | '_' | '\\') {
        pattern.push('\\');
    }
    pattern.push(ch);
}

pub(crate) fn match_value(value: &str) -> MatchValue {
    if has_wildcards(value) {
        MatchValue::Pattern(like_pattern(value))
    } else {
        MatchValue::Exact(unescape(value))
    }
}

/// Range endpoint meaning "no bound".
pub(crate) fn is_unbounded(endpoint: &str) -> bool {
    endpoint == "*"
}

/// Parses an all-digits value for an integer column.
pub(crate) fn parse_integer(field: &str, value: &str) -> Result<i64, SearchError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SearchError::unsupported(format!(
            "Field '{}' accepts only numeric values, got '{}'",
            field, value
        )));
    }
    value.parse::<i64>().map_err(|_| {
        SearchError::unsupported(format!("Value '{}' is out of range for field '{}'", value, field))
    })
}

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:[ T](\d{2}):(\d{2})(?::(\d{2}))?)?$")
        .expect("datetime pattern is valid")
});

/// Parses `YYYY-MM-DD[ HH:MM[:SS]]` into the half-open interval covered by
/// the least significant unit written: a day, a minute or a second.
pub(crate) fn parse_datetime_window(
    field: &str,
    value: &str,
) -> Result<(NaiveDateTime, NaiveDateTime), SearchError> {
    let invalid = || {
        SearchError::unsupported(format!(
            "Field '{}' expects a date in YYYY-MM-DD[ HH:MM[:SS]] format, got '{}'",
            field, value
        ))
    };
    let caps = DATETIME_RE.captures(value).ok_or_else(invalid)?;
    let number = |idx: usize| -> Option<u32> { caps.get(idx).and_then(|m| m.as_str().parse().ok()) };

    let year = caps[1].parse::<i32>().map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(year, number(2).unwrap_or(0), number(3).unwrap_or(0))
        .ok_or_else(invalid)?;

    let (low, unit) = match (number(4), number(5), number(6)) {
        (None, _, _) => (date.and_hms_opt(0, 0, 0), Duration::days(1)),
        (Some(hour), Some(minute), None) => (date.and_hms_opt(hour, minute, 0), Duration::minutes(1)),
        (Some(hour), Some(minute), Some(second)) => {
            (date.and_hms_opt(hour, minute, second), Duration::seconds(1))
        }
        _ => (None, Duration::zero()),
    };
    let low = low.ok_or_else(invalid)?;
    let high = low.checked_add_signed(unit).ok_or_else(invalid)?;
    Ok((low, high))
}
