//! HTML constraint derivation.
//!
//! [`get_constraints`] flattens an object-shaped schema into per-field
//! constraint records (`required`, `minLength`, `pattern`, ...) that map
//! directly onto HTML input attributes, so a form can enforce the basic rules
//! in the browser before it is ever submitted.
//!
//! Field names follow the form naming convention: `address.city` for nested
//! objects, `tags[]` for the items of an array and `pair[0]` for tuple items.
//!
//! # Example
//!
//! ```rust
//! use formcast::{get_constraints, Schema, SchemaArena};
//!
//! let mut arena = SchemaArena::new();
//! let name = arena.add(Schema::string().min_length(2).max_length(20));
//! let age = arena.add(Schema::number().min_value(0));
//! let age = arena.add(Schema::optional(age));
//! let user = arena.add(Schema::object([("name", name), ("age", age)]));
//!
//! let constraints = get_constraints(&arena, user).unwrap();
//! assert!(constraints["name"].required);
//! assert_eq!(constraints["name"].min_length, Some(2));
//! assert!(!constraints["age"].required);
//! assert_eq!(constraints["age"].min, Some(0.0));
//! ```

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{json, Map};
use thiserror::Error;
use tracing::trace;

use crate::path::FieldPath;
use crate::schema::{Action, Literal, SchemaId, SchemaKind, SchemaStore, Wrapper};
use crate::value::{format_number, Value};

/// Errors from [`get_constraints`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// The root schema does not describe named fields.
    #[error("unsupported schema: constraints require an object-shaped root, got {kind}")]
    UnsupportedSchema { kind: &'static str },
}

/// The HTML validation attributes of one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraint {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub multiple: Option<bool>,
    pub pattern: Option<String>,
}

impl Constraint {
    /// A constraint that only requires presence.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    /// Renders the attributes as JSON with HTML attribute names, omitting
    /// unset ones.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = Map::new();
        map.insert("required".to_string(), json!(self.required));
        if let Some(min_length) = self.min_length {
            map.insert("minLength".to_string(), json!(min_length));
        }
        if let Some(max_length) = self.max_length {
            map.insert("maxLength".to_string(), json!(max_length));
        }
        if let Some(min) = self.min {
            map.insert("min".to_string(), Value::Number(min).to_json());
        }
        if let Some(max) = self.max {
            map.insert("max".to_string(), Value::Number(max).to_json());
        }
        if let Some(step) = self.step {
            map.insert("step".to_string(), Value::Number(step).to_json());
        }
        if let Some(multiple) = self.multiple {
            map.insert("multiple".to_string(), json!(multiple));
        }
        if let Some(pattern) = &self.pattern {
            map.insert("pattern".to_string(), json!(pattern));
        }
        serde_json::Value::Object(map)
    }

    /// Keeps only the attributes both records agree on.
    fn intersection(&self, other: &Self) -> Self {
        fn agreed<T: PartialEq + Clone>(a: &Option<T>, b: &Option<T>) -> Option<T> {
            match (a, b) {
                (Some(a), Some(b)) if a == b => Some(a.clone()),
                _ => None,
            }
        }
        Self {
            required: self.required && other.required,
            min_length: agreed(&self.min_length, &other.min_length),
            max_length: agreed(&self.max_length, &other.max_length),
            min: agreed(&self.min, &other.min),
            max: agreed(&self.max, &other.max),
            step: agreed(&self.step, &other.step),
            multiple: agreed(&self.multiple, &other.multiple),
            pattern: agreed(&self.pattern, &other.pattern),
        }
    }
}

/// Renders a constraint map as a JSON object keyed by field name.
pub fn constraints_to_json(constraints: &IndexMap<String, Constraint>) -> serde_json::Value {
    serde_json::Value::Object(
        constraints
            .iter()
            .map(|(name, constraint)| (name.clone(), constraint.to_json()))
            .collect(),
    )
}

/// Derives the constraints of every field of an object-shaped schema.
///
/// The root must be an object, or an intersect, union or variant of objects.
/// Coerced nodes are looked through, so the schema may already be coerced.
pub fn get_constraints<S: SchemaStore + ?Sized>(
    store: &S,
    id: SchemaId,
) -> Result<IndexMap<String, Constraint>, ConstraintError> {
    let mut walker = Walker {
        store,
        active: HashSet::new(),
    };
    let mut data = IndexMap::new();
    walker.update(id, &mut data, &FieldPath::root())?;
    Ok(data)
}

struct Walker<'a, S: SchemaStore + ?Sized> {
    store: &'a S,
    /// Nodes on the current descent, to stop at recursive references.
    active: HashSet<SchemaId>,
}

impl<S: SchemaStore + ?Sized> Walker<'_, S> {
    fn update(
        &mut self,
        id: SchemaId,
        data: &mut IndexMap<String, Constraint>,
        path: &FieldPath,
    ) -> Result<(), ConstraintError> {
        let name = path.to_string();
        if !path.is_root() && !data.contains_key(&name) {
            data.insert(name.clone(), Constraint::required());
        }

        if !self.active.insert(id) {
            trace!(field = %name, "recursive schema, stopping descent");
            return Ok(());
        }
        let result = self.update_kind(id, data, path, &name);
        self.active.remove(&id);
        result
    }

    fn update_kind(
        &mut self,
        id: SchemaId,
        data: &mut IndexMap<String, Constraint>,
        path: &FieldPath,
        name: &str,
    ) -> Result<(), ConstraintError> {
        let node = self.store.node(id);
        trace!(field = name, kind = node.kind.name(), "deriving constraints");

        match &node.kind {
            SchemaKind::Coerced { target, .. } => return self.update(*target, data, path),
            SchemaKind::Object { entries } | SchemaKind::ObjectWithRest { entries, .. } => {
                for (key, entry) in entries {
                    self.update(*entry, data, &path.push_field(key.as_str()))?;
                }
                return Ok(());
            }
            SchemaKind::Intersect { options } => {
                for option in options {
                    let mut result = IndexMap::new();
                    self.update(*option, &mut result, path)?;
                    data.extend(result);
                }
                return Ok(());
            }
            SchemaKind::Union { options } | SchemaKind::Variant { options, .. } => {
                let mut merged: Option<IndexMap<String, Constraint>> = None;
                for option in options {
                    let mut result = IndexMap::new();
                    self.update(*option, &mut result, path)?;
                    merged = Some(match merged {
                        Some(previous) => reduce(previous, result),
                        None => result,
                    });
                }
                data.extend(merged.unwrap_or_default());
                return Ok(());
            }
            kind if path.is_root() => {
                return Err(ConstraintError::UnsupportedSchema { kind: kind.name() });
            }
            _ => {}
        }

        match &node.kind {
            SchemaKind::Array { item } => {
                update_record(data, name, |c| c.multiple = Some(true));
                self.update(*item, data, &path.push_template())?;
            }
            SchemaKind::String => {
                let min_length = node.pipe.iter().find_map(|action| match action {
                    Action::MinLength { requirement, .. } => Some(*requirement),
                    _ => None,
                });
                let max_length = node.pipe.iter().find_map(|action| match action {
                    Action::MaxLength { requirement, .. } => Some(*requirement),
                    _ => None,
                });
                update_record(data, name, |c| {
                    if min_length.is_some() {
                        c.min_length = min_length;
                    }
                    if max_length.is_some() {
                        c.max_length = max_length;
                    }
                });
            }
            SchemaKind::Number => {
                let min = node.pipe.iter().find_map(|action| match action {
                    Action::MinValue { requirement, .. } => requirement.as_f64(),
                    _ => None,
                });
                let max = node.pipe.iter().find_map(|action| match action {
                    Action::MaxValue { requirement, .. } => requirement.as_f64(),
                    _ => None,
                });
                let step = node.pipe.iter().find_map(|action| match action {
                    Action::MultipleOf { requirement, .. } => Some(*requirement),
                    _ => None,
                });
                update_record(data, name, |c| {
                    if min.is_some() {
                        c.min = min;
                    }
                    if max.is_some() {
                        c.max = max;
                    }
                    if step.is_some() {
                        c.step = step;
                    }
                });
            }
            SchemaKind::Wrapped {
                wrapper: Wrapper::Optional | Wrapper::Undefinedable | Wrapper::Nullish,
                wrapped,
                ..
            } => {
                update_record(data, name, |c| c.required = false);
                self.update(*wrapped, data, path)?;
            }
            SchemaKind::Enum(options) => {
                let pattern = options
                    .iter()
                    .map(escape_option)
                    .collect::<Vec<_>>()
                    .join("|");
                update_record(data, name, |c| c.pattern = Some(pattern));
            }
            SchemaKind::Tuple { items } | SchemaKind::TupleWithRest { items, .. } => {
                for (index, item) in items.iter().enumerate() {
                    self.update(*item, data, &path.push_index(index))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn update_record(
    data: &mut IndexMap<String, Constraint>,
    name: &str,
    update: impl FnOnce(&mut Constraint),
) {
    if let Some(constraint) = data.get_mut(name) {
        update(constraint);
    }
}

/// Merges the constraints of two union alternatives.
///
/// Fields present in both keep the attributes both agree on; fields present
/// in only one become optional.
fn reduce(
    previous: IndexMap<String, Constraint>,
    next: IndexMap<String, Constraint>,
) -> IndexMap<String, Constraint> {
    let mut names: Vec<&String> = previous.keys().collect();
    names.extend(next.keys().filter(|name| !previous.contains_key(*name)));

    names
        .into_iter()
        .map(|name| {
            let merged = match (previous.get(name), next.get(name)) {
                (Some(a), Some(b)) => a.intersection(b),
                (Some(only), None) | (None, Some(only)) => Constraint {
                    required: false,
                    ..only.clone()
                },
                (None, None) => Constraint::default(),
            };
            (name.clone(), merged)
        })
        .collect()
}

/// Escapes an enum option for use in an HTML `pattern` attribute.
fn escape_option(option: &Literal) -> String {
    match option {
        Literal::String(text) => {
            let mut escaped = String::with_capacity(text.len());
            for c in text.chars() {
                match c {
                    '|' | '\\' | '{' | '}' | '(' | ')' | '[' | ']' | '^' | '$' | '+' | '*'
                    | '?' | '.' => {
                        escaped.push('\\');
                        escaped.push(c);
                    }
                    '-' => escaped.push_str("\\x2d"),
                    _ => escaped.push(c),
                }
            }
            escaped
        }
        Literal::Number(n) => format_number(*n),
        Literal::Bool(b) => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, SchemaArena};

    #[test]
    fn test_root_must_be_object_shaped() {
        let mut arena = SchemaArena::new();
        let string = arena.add(Schema::string());
        let list = arena.add(Schema::array(string));

        assert_eq!(
            get_constraints(&arena, string),
            Err(ConstraintError::UnsupportedSchema { kind: "string" })
        );
        assert!(get_constraints(&arena, list).is_err());
    }

    #[test]
    fn test_enum_pattern_is_escaped() {
        let mut arena = SchemaArena::new();
        let choice = arena.add(Schema::picklist(["a.b", "c-d", "(e)"]));
        let form = arena.add(Schema::object([("choice", choice)]));

        let constraints = get_constraints(&arena, form).unwrap();
        assert_eq!(
            constraints["choice"].pattern.as_deref(),
            Some(r"a\.b|c\x2dd|\(e\)")
        );
    }

    #[test]
    fn test_number_step_from_multiple_of() {
        let mut arena = SchemaArena::new();
        let amount = arena.add(Schema::number().min_value(1).max_value(100).multiple_of(0.5));
        let form = arena.add(Schema::object([("amount", amount)]));

        let constraints = get_constraints(&arena, form).unwrap();
        let amount = &constraints["amount"];
        assert_eq!((amount.min, amount.max, amount.step), (Some(1.0), Some(100.0), Some(0.5)));
    }

    #[test]
    fn test_to_json_uses_attribute_names() {
        let constraint = Constraint {
            required: true,
            min_length: Some(3),
            multiple: Some(true),
            ..Constraint::default()
        };
        assert_eq!(
            constraint.to_json(),
            json!({ "required": true, "minLength": 3, "multiple": true })
        );
    }

    #[test]
    fn test_reduce_keeps_agreed_attributes() {
        let mut previous = IndexMap::new();
        previous.insert(
            "a".to_string(),
            Constraint {
                min_length: Some(2),
                max_length: Some(5),
                ..Constraint::required()
            },
        );
        previous.insert("only".to_string(), Constraint::required());
        let mut next = IndexMap::new();
        next.insert(
            "a".to_string(),
            Constraint {
                min_length: Some(2),
                max_length: Some(9),
                ..Constraint::required()
            },
        );

        let merged = reduce(previous, next);
        assert_eq!(
            merged["a"],
            Constraint {
                min_length: Some(2),
                ..Constraint::required()
            }
        );
        assert!(!merged["only"].required);
    }
}
