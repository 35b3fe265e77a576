//! Value normalizers.
//!
//! Normalizers turn raw form values (strings, uploads, repeated fields) into
//! the shape a schema expects *before* validation runs. They never fail: a
//! value that cannot be converted either becomes [`Normalized::Absent`] or is
//! passed through unchanged so the validator reports a precise type issue.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::value::Value;

/// Outcome of normalizing a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Value(Value),
    /// The field is treated as missing.
    Absent,
}

impl Normalized {
    /// Converts into a value, mapping `Absent` to `Undefined`.
    pub fn into_value(self) -> Value {
        match self {
            Normalized::Value(value) => value,
            Normalized::Absent => Value::Undefined,
        }
    }
}

/// A text conversion that could not be performed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {input:?} to {target}")]
pub struct TransformError {
    pub target: &'static str,
    pub input: String,
}

/// Converts non-empty text into a typed value.
pub type TextTransform = fn(&str) -> Result<Value, TransformError>;

/// The pre-validation step of a coerced schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalizer {
    /// Empty text becomes absent, other text is kept.
    Text,
    /// Text is parsed like JavaScript's `Number(text)`.
    Number,
    /// `"on"` becomes `true`.
    Boolean,
    /// Text is parsed as a date when possible.
    Date,
    /// Text is parsed as a big integer; unparseable text becomes absent.
    BigInt,
    /// Empty text and empty uploads become absent.
    File,
    /// Any value becomes an array.
    Array,
}

impl Normalizer {
    /// Normalizes `raw`.
    pub fn apply(self, raw: Value) -> Value {
        let normalized = match self {
            Normalizer::Text => normalize_string(raw, None),
            Normalizer::Number => normalize_string(raw, Some(parse_number)),
            Normalizer::Boolean => normalize_string(raw, Some(parse_boolean)),
            Normalizer::Date => normalize_string(raw, Some(parse_date)),
            Normalizer::BigInt => normalize_string(raw, Some(parse_bigint)),
            Normalizer::File => match normalize_string(raw, None) {
                Normalized::Value(value) => normalize_file(value),
                Normalized::Absent => Normalized::Absent,
            },
            Normalizer::Array => Normalized::Value(normalize_array(raw)),
        };
        normalized.into_value()
    }

    /// Name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Normalizer::Text => "text",
            Normalizer::Number => "number",
            Normalizer::Boolean => "boolean",
            Normalizer::Date => "date",
            Normalizer::BigInt => "bigint",
            Normalizer::File => "file",
            Normalizer::Array => "array",
        }
    }
}

/// Normalizes a string value.
///
/// Non-string values pass through unchanged and the empty string becomes
/// absent. Other text goes through `transform` if given; a failed transform
/// also yields absent.
///
/// # Example
///
/// ```rust
/// use formcast::coercion::{normalize_string, Normalized};
/// use formcast::Value;
///
/// assert_eq!(normalize_string(Value::from(""), None), Normalized::Absent);
/// assert_eq!(
///     normalize_string(Value::from("abc"), None),
///     Normalized::Value(Value::from("abc"))
/// );
/// ```
pub fn normalize_string(raw: Value, transform: Option<TextTransform>) -> Normalized {
    let text = match raw {
        Value::String(text) => text,
        other => return Normalized::Value(other),
    };
    if text.is_empty() {
        return Normalized::Absent;
    }
    match transform {
        Some(transform) => match transform(&text) {
            Ok(value) => Normalized::Value(value),
            Err(_) => Normalized::Absent,
        },
        None => Normalized::Value(Value::String(text)),
    }
}

/// Treats an empty upload (no name, no content) as absent.
pub fn normalize_file(raw: Value) -> Normalized {
    match raw {
        Value::File(file) if file.is_empty_upload() => Normalized::Absent,
        other => Normalized::Value(other),
    }
}

/// Wraps a value into an array.
///
/// Arrays are kept, absent values (including empty text and empty uploads)
/// become `[]`, anything else becomes a one-element array.
pub fn normalize_array(raw: Value) -> Value {
    match raw {
        Value::Array(items) => Value::Array(items),
        Value::Undefined => Value::Array(Vec::new()),
        Value::String(ref text) if text.is_empty() => Value::Array(Vec::new()),
        Value::File(ref file) if file.is_empty_upload() => Value::Array(Vec::new()),
        other => Value::Array(vec![other]),
    }
}

/// Parses text the way JavaScript's `Number(text)` does. Unparseable text
/// becomes `NaN`, which the validator then rejects as a type mismatch.
pub fn parse_number(text: &str) -> Result<Value, TransformError> {
    Ok(Value::Number(js_number(text)))
}

fn js_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if let Some((radix, digits)) = radix_prefix(trimmed) {
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits.chars().try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN);
    }

    // Only digits, sign, dot and exponent are valid; this rules out the
    // `inf`/`nan` spellings the std parser accepts
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !valid {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Splits a `0x`, `0o` or `0b` prefix off `text`, returning the radix and
/// the remaining digits.
fn radix_prefix(text: &str) -> Option<(u32, &str)> {
    let radix = match text.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    Some((radix, &text[2..]))
}

/// Maps the checkbox value `"on"` to `true` and keeps any other text.
pub fn parse_boolean(text: &str) -> Result<Value, TransformError> {
    if text == "on" {
        Ok(Value::Bool(true))
    } else {
        Ok(Value::String(text.to_string()))
    }
}

/// Parses an ISO 8601 date, date-time or RFC 3339 timestamp. Zone-less
/// input is read as UTC. Unparseable text is kept as is.
pub fn parse_date(text: &str) -> Result<Value, TransformError> {
    Ok(match parse_timestamp(text.trim()) {
        Some(date) => Value::Date(date),
        None => Value::String(text.to_string()),
    })
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parses a big integer: an optionally signed run of decimal digits, or an
/// unsigned `0x`/`0o`/`0b` literal. Surrounding whitespace is ignored.
pub fn parse_bigint(text: &str) -> Result<Value, TransformError> {
    let trimmed = text.trim();
    let parsed = if trimmed.is_empty() {
        Some(0)
    } else if let Some((radix, digits)) = radix_prefix(trimmed) {
        // from_str_radix would also take a sign after the prefix
        if !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix)) {
            i128::from_str_radix(digits, radix).ok()
        } else {
            None
        }
    } else {
        trimmed.parse::<i128>().ok()
    };
    parsed.map(Value::BigInt).ok_or_else(|| TransformError {
        target: "bigint",
        input: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FileBlob;
    use chrono::Datelike;

    #[test]
    fn test_empty_string_is_absent_for_every_text_normalizer() {
        for normalizer in [
            Normalizer::Text,
            Normalizer::Number,
            Normalizer::Boolean,
            Normalizer::Date,
            Normalizer::BigInt,
            Normalizer::File,
        ] {
            assert_eq!(normalizer.apply(Value::from("")), Value::Undefined);
        }
    }

    #[test]
    fn test_non_strings_pass_through() {
        let file = Value::File(FileBlob::file("a.txt", "text/plain", b"x".to_vec()));
        assert_eq!(Normalizer::Number.apply(file.clone()), file);
        assert_eq!(Normalizer::Boolean.apply(Value::Null), Value::Null);
        assert_eq!(Normalizer::Date.apply(Value::Number(3.0)), Value::Number(3.0));
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_number("20").unwrap(), Value::Number(20.0));
        assert_eq!(parse_number(" 1.5 ").unwrap(), Value::Number(1.5));
        assert_eq!(parse_number("1e3").unwrap(), Value::Number(1000.0));
        assert_eq!(parse_number("0x1f").unwrap(), Value::Number(31.0));
        assert_eq!(parse_number("0b101").unwrap(), Value::Number(5.0));
        assert_eq!(parse_number("   ").unwrap(), Value::Number(0.0));
        assert_eq!(parse_number("-Infinity").unwrap(), Value::Number(f64::NEG_INFINITY));

        for text in ["abc", "inf", "nan", "1_000", "0x", "0xzz", "12px"] {
            let parsed = parse_number(text).unwrap();
            assert!(
                matches!(parsed, Value::Number(n) if n.is_nan()),
                "{text} should be NaN"
            );
        }
    }

    #[test]
    fn test_boolean_only_maps_on() {
        assert_eq!(Normalizer::Boolean.apply(Value::from("on")), Value::Bool(true));
        assert_eq!(Normalizer::Boolean.apply(Value::from("off")), Value::from("off"));
        assert_eq!(Normalizer::Boolean.apply(Value::from("true")), Value::from("true"));
    }

    #[test]
    fn test_date_parsing() {
        let date = Normalizer::Date.apply(Value::from("2024-03-15"));
        match date {
            Value::Date(date) => {
                assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 15));
            }
            other => panic!("expected a date, got {other:?}"),
        }

        assert!(matches!(
            Normalizer::Date.apply(Value::from("2024-03-15T10:30")),
            Value::Date(_)
        ));
        assert!(matches!(
            Normalizer::Date.apply(Value::from("2024-03-15T10:30:00+02:00")),
            Value::Date(_)
        ));
        assert_eq!(
            Normalizer::Date.apply(Value::from("yesterday")),
            Value::from("yesterday")
        );
    }

    #[test]
    fn test_bigint_failure_is_absent() {
        assert_eq!(Normalizer::BigInt.apply(Value::from("42")), Value::BigInt(42));
        assert_eq!(Normalizer::BigInt.apply(Value::from("-7")), Value::BigInt(-7));
        assert_eq!(Normalizer::BigInt.apply(Value::from("4.2")), Value::Undefined);
        assert_eq!(Normalizer::BigInt.apply(Value::from("abc")), Value::Undefined);
        assert!(parse_bigint("abc").is_err());
    }

    #[test]
    fn test_bigint_radix_literals() {
        assert_eq!(parse_bigint("0x10").unwrap(), Value::BigInt(16));
        assert_eq!(parse_bigint(" 0o17 ").unwrap(), Value::BigInt(15));
        assert_eq!(parse_bigint("0B101").unwrap(), Value::BigInt(5));
        assert!(parse_bigint("-0x10").is_err());
        assert!(parse_bigint("0x-1").is_err());
        assert!(parse_bigint("0x").is_err());
        assert!(parse_bigint("0b102").is_err());
    }

    #[test]
    fn test_empty_upload_is_absent() {
        let empty = Value::File(FileBlob::file("", "application/octet-stream", Vec::new()));
        let real = Value::File(FileBlob::file("a.png", "image/png", vec![1, 2, 3]));

        assert_eq!(Normalizer::File.apply(empty), Value::Undefined);
        assert_eq!(Normalizer::File.apply(real.clone()), real);
    }

    #[test]
    fn test_array_normalization() {
        assert_eq!(normalize_array(Value::Undefined), Value::Array(vec![]));
        assert_eq!(normalize_array(Value::from("")), Value::Array(vec![]));
        assert_eq!(
            normalize_array(Value::from("a")),
            Value::Array(vec![Value::from("a")])
        );
        let items = Value::Array(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(normalize_array(items.clone()), items);
        assert_eq!(
            normalize_array(Value::File(FileBlob::file("", "", Vec::new()))),
            Value::Array(vec![])
        );
    }
}
