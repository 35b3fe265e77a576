//! Dynamic values flowing through coercion and validation.
//!
//! Form submissions only ever carry strings and files, but the schemas they
//! are validated against expect numbers, booleans, dates and nested
//! structures. [`Value`] is the common currency: it can hold both the raw
//! submission and the typed output, including the `Undefined` marker used for
//! "field absent".

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::json;

/// An uploaded file or an anonymous blob.
///
/// Browsers submit an untouched `<input type="file">` as a file with an empty
/// name and no content; see [`FileBlob::is_empty_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    /// File name, `None` for a bare blob.
    pub name: Option<String>,
    /// MIME type, empty when unknown.
    pub mime_type: String,
    /// File content.
    pub data: Vec<u8>,
}

impl FileBlob {
    /// Creates a named file.
    pub fn file(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: Some(name.into()),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Creates an anonymous blob.
    pub fn blob(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: None,
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true for what a browser sends when no file was chosen.
    pub fn is_empty_upload(&self) -> bool {
        self.name.as_deref() == Some("") && self.data.is_empty()
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value at all. An empty form field normalizes to this.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    /// A double precision number. `NaN` is a legal, intentionally invalid value.
    Number(f64),
    BigInt(i128),
    String(String),
    Date(DateTime<Utc>),
    File(FileBlob),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Returns true if the value is `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if the value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a number value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the items if this is an array value.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is an object value.
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up an object entry by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|entries| entries.get(key))
    }

    /// Renders the value the way issue messages cite a received value.
    ///
    /// Strings are quoted, numbers use JavaScript notation (`NaN`,
    /// `Infinity`), and compound values are named by their type.
    ///
    /// ```rust
    /// use formcast::Value;
    ///
    /// assert_eq!(Value::from("abc").received(), "\"abc\"");
    /// assert_eq!(Value::Number(f64::NAN).received(), "NaN");
    /// assert_eq!(Value::Number(20.0).received(), "20");
    /// assert_eq!(Value::Undefined.received(), "undefined");
    /// ```
    pub fn received(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::BigInt(n) => n.to_string(),
            Value::String(s) => format!("\"{}\"", s),
            Value::Date(_) => "Date".to_string(),
            Value::File(file) if file.name.is_some() => "File".to_string(),
            Value::File(_) => "Blob".to_string(),
            Value::Array(_) => "Array".to_string(),
            Value::Object(_) => "Object".to_string(),
        }
    }

    /// Converts to JSON.
    ///
    /// Undefined object entries are dropped (undefined array items become
    /// `null`), non-finite numbers become `null`, dates are RFC 3339 strings
    /// and files are summarized as `{ name, type, size }`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::BigInt(n) => match i64::try_from(*n) {
                Ok(small) => json!(small),
                Err(_) => json!(n.to_string()),
            },
            Value::String(s) => json!(s),
            Value::Date(date) => json!(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::File(file) => json!({
                "name": file.name,
                "type": file.mime_type,
                "size": file.size(),
            }),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Formats a number using JavaScript's `Number#toString` conventions for the
/// cases that matter in messages.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return json!(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl From<FileBlob> for Value {
    fn from(file: FileBlob) -> Self {
        Value::File(file)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Object(entries)
    }
}
