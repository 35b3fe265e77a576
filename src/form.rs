//! Form submissions.
//!
//! A browser submits a form as a flat, ordered list of `name=value` pairs in
//! which a name may repeat. [`FormData`] holds that list and folds it into a
//! nested [`Value`] by interpreting each name as a [`FieldPath`].

use indexmap::IndexMap;

use crate::path::{FieldPath, PathSegment};
use crate::value::{FileBlob, Value};

/// The reserved field carrying the submission intent.
pub const INTENT: &str = "__intent__";

/// How far past the end of a list an indexed name may point.
///
/// Fields whose index lies further out are left out of the payload.
pub const MAX_INDEX_GAP: usize = 1024;

/// A single submitted value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEntry {
    Text(String),
    File(FileBlob),
}

impl FormEntry {
    /// Returns the text if this is a text entry.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormEntry::Text(text) => Some(text),
            FormEntry::File(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            FormEntry::Text(text) => Value::String(text.clone()),
            FormEntry::File(file) => Value::File(file.clone()),
        }
    }
}

impl From<&str> for FormEntry {
    fn from(text: &str) -> Self {
        FormEntry::Text(text.to_string())
    }
}

impl From<String> for FormEntry {
    fn from(text: String) -> Self {
        FormEntry::Text(text)
    }
}

impl From<FileBlob> for FormEntry {
    fn from(file: FileBlob) -> Self {
        FormEntry::File(file)
    }
}

/// An ordered multi-map of submitted fields.
///
/// # Example
///
/// ```rust
/// use formcast::FormData;
/// use serde_json::json;
///
/// let mut form = FormData::new();
/// form.append("title", "Hello");
/// form.append("tags", "a");
/// form.append("tags", "b");
/// form.append("author.name", "Ada");
/// form.append("__intent__", "publish");
///
/// assert_eq!(form.intent(), Some("publish"));
/// assert_eq!(
///     form.to_payload().to_json(),
///     json!({ "title": "Hello", "tags": ["a", "b"], "author": { "name": "Ada" } })
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    entries: Vec<(String, FormEntry)>,
}

impl FormData {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping existing fields of the same name.
    pub fn append(&mut self, name: impl Into<String>, entry: impl Into<FormEntry>) {
        self.entries.push((name.into(), entry.into()));
    }

    /// Replaces every field of that name with a single one.
    pub fn set(&mut self, name: impl Into<String>, entry: impl Into<FormEntry>) {
        let name = name.into();
        self.delete(&name);
        self.entries.push((name, entry.into()));
    }

    /// Removes every field of that name.
    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(key, _)| key != name);
    }

    /// The first value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&FormEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// Every value submitted under `name`, in submission order.
    pub fn get_all(&self, name: &str) -> Vec<&FormEntry> {
        self.entries
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, entry)| entry)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the fields in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// The submitted intent, if any.
    pub fn intent(&self) -> Option<&str> {
        self.get(INTENT).and_then(FormEntry::as_text)
    }

    /// Folds the fields into a nested object.
    ///
    /// Names are parsed as field paths: `a.b` nests objects, `a[0]` sets an
    /// index and `a[]` appends. A name that repeats collects its values into
    /// an array. The intent field is left out, as are fields whose name
    /// conflicts with the shape built so far and fields whose index lies
    /// more than [`MAX_INDEX_GAP`] items past the end of their list.
    pub fn to_payload(&self) -> Value {
        let mut payload = Value::Object(IndexMap::new());
        for (name, entry) in &self.entries {
            if name == INTENT {
                continue;
            }
            let path = FieldPath::parse(name);
            if path.is_root() {
                continue;
            }
            assign(&mut payload, path.as_slice(), entry.to_value());
        }
        payload
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<FormEntry>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormData::new();
        for (name, entry) in iter {
            form.append(name, entry);
        }
        form
    }
}

fn assign(target: &mut Value, segments: &[PathSegment], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    match head {
        PathSegment::Field(key) => {
            let fresh = target.is_undefined();
            if fresh {
                *target = Value::Object(IndexMap::new());
            }
            let Value::Object(entries) = target else {
                return;
            };
            descend(entries.entry(key.clone()).or_default(), rest, value);
            // A field dropped further down must not leave an empty slot
            if entries.get(key).is_some_and(Value::is_undefined) {
                entries.shift_remove(key);
            }
            if fresh && entries.is_empty() {
                *target = Value::Undefined;
            }
        }
        PathSegment::Index(index) => {
            let len = match target {
                Value::Undefined => 0,
                Value::Array(items) => items.len(),
                _ => return,
            };
            let Some(needed) = index.checked_add(1) else {
                return;
            };
            if needed > len.saturating_add(MAX_INDEX_GAP) {
                return;
            }
            let fresh = target.is_undefined();
            if fresh {
                *target = Value::Array(Vec::new());
            }
            let Value::Array(items) = target else {
                return;
            };
            if items.len() < needed {
                items.resize(needed, Value::Undefined);
            }
            descend(&mut items[*index], rest, value);
            if fresh && items.iter().all(Value::is_undefined) {
                *target = Value::Undefined;
            }
        }
        PathSegment::Template => {
            let fresh = target.is_undefined();
            if fresh {
                *target = Value::Array(Vec::new());
            }
            let Value::Array(items) = target else {
                return;
            };
            if rest.is_empty() {
                items.push(value);
                return;
            }
            // Fill the current item until the remaining path repeats
            let reuse = items
                .last()
                .is_some_and(|last| is_compound(last) && is_unset(last, rest));
            if !reuse {
                items.push(Value::Undefined);
            }
            if let Some(last) = items.last_mut() {
                assign(last, rest, value);
            }
            if items.last().is_some_and(Value::is_undefined) {
                items.pop();
            }
            if fresh && items.is_empty() {
                *target = Value::Undefined;
            }
        }
    }
}

fn descend(slot: &mut Value, rest: &[PathSegment], value: Value) {
    if rest.is_empty() {
        set_leaf(slot, value);
    } else {
        assign(slot, rest, value);
    }
}

fn set_leaf(slot: &mut Value, value: Value) {
    match slot {
        Value::Undefined => *slot = value,
        Value::Array(items) => items.push(value),
        _ => {
            let previous = std::mem::take(slot);
            *slot = Value::Array(vec![previous, value]);
        }
    }
}

fn is_compound(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn is_unset(value: &Value, path: &[PathSegment]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return value.is_undefined();
    };
    let child = match (head, value) {
        (_, Value::Undefined) => return true,
        (PathSegment::Template, Value::Array(_)) => return true,
        (PathSegment::Field(key), Value::Object(entries)) => entries.get(key),
        (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
        _ => return false,
    };
    child.map_or(true, |child| is_unset(child, rest))
}
