//! Text helpers shared by the tracker and the presentation layer.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde_json::Value;

/// Escapes the characters that are significant in HTML text content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Pretty-prints a JSON value with two-space indentation.
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Short relative label for a backend timestamp, as shown in the
/// conversation list.
///
/// Returns `None` when the timestamp cannot be parsed. Timestamps without an
/// offset are taken as UTC.
pub fn relative_time(timestamp: &str, now: DateTime<Utc>) -> Option<String> {
    let at = parse_timestamp(timestamp)?;
    let elapsed = now.signed_duration_since(at);

    let label = if elapsed.num_seconds() < 60 {
        "刚刚".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}分钟前", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}小时前", elapsed.num_hours())
    } else {
        format!("{}/{}/{}", at.year(), at.month(), at.day())
    };
    Some(label)
}

fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    let timestamp = timestamp.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(timestamp, fmt).ok())
        .map(|naive| naive.and_utc())
}
