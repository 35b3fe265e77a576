//! Pipeline action checks and the issue messages they produce.

use std::cmp::Ordering;

use chrono::SecondsFormat;

use crate::error::Issue;
use crate::path::FieldPath;
use crate::schema::Action;
use crate::value::{format_number, Value};

/// Builds an issue in the `Invalid {kind}: Expected {expected} but received
/// {received}` format, or `Invalid {kind}: Received {received}` when nothing
/// specific is expected. A custom message replaces the text entirely.
pub(crate) fn issue(
    path: &FieldPath,
    code: &str,
    kind: &str,
    expected: Option<String>,
    received: String,
    input: &Value,
    custom: Option<&str>,
) -> Issue {
    let message = match (custom, &expected) {
        (Some(custom), _) => custom.to_string(),
        (None, Some(expected)) => {
            format!("Invalid {}: Expected {} but received {}", kind, expected, received)
        }
        (None, None) => format!("Invalid {}: Received {}", kind, received),
    };
    let mut issue = Issue::new(path.clone(), message)
        .with_code(code)
        .with_input(input.clone())
        .with_received(received);
    issue.expected = expected;
    issue
}

/// Runs a synchronous validation action. Returns the issue if the check
/// failed. Actions that do not apply to the value's type pass.
pub(crate) fn check(action: &Action, value: &Value, path: &FieldPath) -> Option<Issue> {
    let fail = |kind: &str, expected: Option<String>, received: String, message: &Option<String>| {
        Some(issue(
            path,
            action.type_name(),
            kind,
            expected,
            received,
            value,
            message.as_deref(),
        ))
    };

    match action {
        Action::MinLength {
            requirement,
            message,
        } => {
            let length = length_of(value)?;
            if length >= *requirement {
                return None;
            }
            fail("length", Some(format!(">={}", requirement)), length.to_string(), message)
        }
        Action::MaxLength {
            requirement,
            message,
        } => {
            let length = length_of(value)?;
            if length <= *requirement {
                return None;
            }
            fail("length", Some(format!("<={}", requirement)), length.to_string(), message)
        }
        Action::MinValue {
            requirement,
            message,
        } => {
            if matches!(compare(value, requirement), Some(Ordering::Greater | Ordering::Equal)) {
                return None;
            }
            fail(
                "value",
                Some(format!(">={}", value_label(requirement))),
                value_label(value),
                message,
            )
        }
        Action::MaxValue {
            requirement,
            message,
        } => {
            if matches!(compare(value, requirement), Some(Ordering::Less | Ordering::Equal)) {
                return None;
            }
            fail(
                "value",
                Some(format!("<={}", value_label(requirement))),
                value_label(value),
                message,
            )
        }
        Action::MultipleOf {
            requirement,
            message,
        } => {
            let remainder = match value {
                Value::Number(n) => n % requirement,
                Value::BigInt(n) => (*n as f64) % requirement,
                _ => return None,
            };
            if remainder == 0.0 {
                return None;
            }
            fail(
                "multiple",
                Some(format!("%{}", format_number(*requirement))),
                value_label(value),
                message,
            )
        }
        Action::Regex { regex, message } => {
            let text = value.as_str()?;
            if regex.is_match(text) {
                return None;
            }
            fail(
                "format",
                Some(format!("/{}/", regex.as_str())),
                value.received(),
                message,
            )
        }
        Action::MimeType {
            requirement,
            message,
        } => {
            let mime_type = match value {
                Value::File(file) => &file.mime_type,
                _ => return None,
            };
            if requirement.iter().any(|r| r == mime_type) {
                return None;
            }
            let expected = requirement
                .iter()
                .map(|r| format!("\"{}\"", r))
                .collect::<Vec<_>>()
                .join(" | ");
            fail("MIME type", Some(expected), format!("\"{}\"", mime_type), message)
        }
        Action::Check { check, message } => {
            if check(value) {
                return None;
            }
            fail("input", None, value.received(), message)
        }
        Action::CheckAsync { .. } | Action::Transform { .. } => None,
    }
}

/// The issue reported when an asynchronous check returned false.
pub(crate) fn failed_async_check(value: &Value, path: &FieldPath, message: Option<&str>) -> Issue {
    issue(path, "check", "input", None, value.received(), value, message)
}

/// String lengths are counted in UTF-16 code units, as browsers count them
/// for `minlength`/`maxlength`.
fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.encode_utf16().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Orders two values of compatible types; numbers and big integers compare
/// with each other.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
        (Value::BigInt(a), Value::Number(b)) => (*a as f64).partial_cmp(b),
        (Value::Number(a), Value::BigInt(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// How value requirements and values are cited: bare numbers and ISO dates.
fn value_label(value: &Value) -> String {
    match value {
        Value::Date(date) => date.to_rfc3339_opts(SecondsFormat::Millis, true),
        other => other.received(),
    }
}
