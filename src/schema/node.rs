//! Schema nodes: the closed set of kinds plus their pipelines.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::coercion::Normalizer;
use crate::value::{format_number, Value};

use super::action::{Action, BoxFuture};
use super::SchemaId;

/// A literal value accepted by `literal` and `enum` schemas.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
}

impl Literal {
    /// Returns true if `value` is this literal.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Literal::String(a), Value::String(b)) => a == b,
            (Literal::Number(a), Value::Number(b)) => a == b,
            (Literal::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// Converts the literal into a value.
    pub fn to_value(&self) -> Value {
        match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Number(n) => Value::Number(*n),
            Literal::Bool(b) => Value::Bool(*b),
        }
    }

    /// The literal's raw text, without quotes.
    pub fn text(&self) -> String {
        match self {
            Literal::String(s) => s.clone(),
            Literal::Number(n) => format_number(*n),
            Literal::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{}\"", s),
            _ => write!(f, "{}", self.text()),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(n)
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Literal::Number(f64::from(n))
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

/// Optionality and nullability modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrapper {
    /// Accepts `undefined`, may substitute a default for it.
    Optional,
    /// Same as `Optional`.
    Undefinedable,
    /// Accepts `null`, may substitute a default for it.
    Nullable,
    /// Accepts `null` and `undefined`, may substitute a default for both.
    Nullish,
    /// Rejects `undefined`.
    NonOptional,
    /// Rejects `null`.
    NonNullable,
    /// Rejects `null` and `undefined`.
    NonNullish,
}

impl Wrapper {
    /// Returns true if this wrapper may carry a default value.
    pub fn accepts_default(self) -> bool {
        matches!(
            self,
            Wrapper::Optional | Wrapper::Undefinedable | Wrapper::Nullable | Wrapper::Nullish
        )
    }

    /// The kind name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Wrapper::Optional => "optional",
            Wrapper::Undefinedable => "undefinedable",
            Wrapper::Nullable => "nullable",
            Wrapper::Nullish => "nullish",
            Wrapper::NonOptional => "non_optional",
            Wrapper::NonNullable => "non_nullable",
            Wrapper::NonNullish => "non_nullish",
        }
    }
}

/// The default substituted by a default-bearing wrapper.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces the default.
    pub fn get(&self) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// The kind of a schema node, with its kind-specific children.
///
/// The variant fully determines which children exist.
#[derive(Debug, Clone)]
pub enum SchemaKind {
    Any,
    Unknown,
    String,
    Number,
    Boolean,
    BigInt,
    Date,
    Blob,
    File,
    Undefined,
    Null,
    Literal(Literal),
    Enum(Vec<Literal>),
    Array {
        item: SchemaId,
    },
    Tuple {
        items: Vec<SchemaId>,
    },
    TupleWithRest {
        items: Vec<SchemaId>,
        rest: SchemaId,
    },
    Object {
        entries: IndexMap<String, SchemaId>,
    },
    ObjectWithRest {
        entries: IndexMap<String, SchemaId>,
        rest: SchemaId,
    },
    Union {
        options: Vec<SchemaId>,
    },
    Intersect {
        options: Vec<SchemaId>,
    },
    /// A union of objects selected by the value of the `key` entry.
    Variant {
        key: String,
        options: Vec<SchemaId>,
    },
    Wrapped {
        wrapper: Wrapper,
        wrapped: SchemaId,
        default: Option<DefaultValue>,
    },
    /// Accepts anything, normalizes it, then validates with `target`.
    Coerced {
        normalizer: Normalizer,
        target: SchemaId,
    },
}

impl SchemaKind {
    /// The kind name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Any => "any",
            SchemaKind::Unknown => "unknown",
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::BigInt => "bigint",
            SchemaKind::Date => "date",
            SchemaKind::Blob => "blob",
            SchemaKind::File => "file",
            SchemaKind::Undefined => "undefined",
            SchemaKind::Null => "null",
            SchemaKind::Literal(_) => "literal",
            SchemaKind::Enum(_) => "enum",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Tuple { .. } => "tuple",
            SchemaKind::TupleWithRest { .. } => "tuple_with_rest",
            SchemaKind::Object { .. } => "object",
            SchemaKind::ObjectWithRest { .. } => "object_with_rest",
            SchemaKind::Union { .. } => "union",
            SchemaKind::Intersect { .. } => "intersect",
            SchemaKind::Variant { .. } => "variant",
            SchemaKind::Wrapped { wrapper, .. } => wrapper.name(),
            SchemaKind::Coerced { .. } => "coerced",
        }
    }

    /// Returns the ids of all direct children.
    pub fn children(&self) -> Vec<SchemaId> {
        match self {
            SchemaKind::Array { item } => vec![*item],
            SchemaKind::Tuple { items } => items.clone(),
            SchemaKind::TupleWithRest { items, rest } => {
                items.iter().copied().chain(std::iter::once(*rest)).collect()
            }
            SchemaKind::Object { entries } => entries.values().copied().collect(),
            SchemaKind::ObjectWithRest { entries, rest } => entries
                .values()
                .copied()
                .chain(std::iter::once(*rest))
                .collect(),
            SchemaKind::Union { options }
            | SchemaKind::Intersect { options }
            | SchemaKind::Variant { options, .. } => options.clone(),
            SchemaKind::Wrapped { wrapped, .. } => vec![*wrapped],
            SchemaKind::Coerced { target, .. } => vec![*target],
            _ => Vec::new(),
        }
    }
}

/// A schema node: a kind, an optional pipeline and an optional custom
/// type-error message.
///
/// Nodes are plain values built with the [`Schema`](super::Schema) factory
/// and the fluent methods below, then added to a
/// [`SchemaArena`](super::SchemaArena) which hands out a [`SchemaId`].
///
/// # Example
///
/// ```rust
/// use formcast::{Schema, SchemaArena};
///
/// let mut arena = SchemaArena::new();
/// let name = arena.add(Schema::string().min_length(1).error("name is required").max_length(50));
/// let root = arena.add(Schema::object([("name", name)]));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub pipe: Vec<Action>,
    pub message: Option<String>,
}

impl SchemaNode {
    /// Creates a node of the given kind with an empty pipeline.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            pipe: Vec::new(),
            message: None,
        }
    }

    /// Appends an action to the pipeline.
    pub fn pipe(mut self, action: Action) -> Self {
        self.pipe.push(action);
        self
    }

    /// Requires a length of at least `requirement`.
    pub fn min_length(self, requirement: usize) -> Self {
        self.pipe(Action::MinLength {
            requirement,
            message: None,
        })
    }

    /// Requires a length of at most `requirement`.
    pub fn max_length(self, requirement: usize) -> Self {
        self.pipe(Action::MaxLength {
            requirement,
            message: None,
        })
    }

    /// Requires a value of at least `requirement`.
    pub fn min_value(self, requirement: impl Into<Value>) -> Self {
        self.pipe(Action::MinValue {
            requirement: requirement.into(),
            message: None,
        })
    }

    /// Requires a value of at most `requirement`.
    pub fn max_value(self, requirement: impl Into<Value>) -> Self {
        self.pipe(Action::MaxValue {
            requirement: requirement.into(),
            message: None,
        })
    }

    /// Requires a multiple of `requirement`.
    pub fn multiple_of(self, requirement: f64) -> Self {
        self.pipe(Action::MultipleOf {
            requirement,
            message: None,
        })
    }

    /// Requires a match of the regular expression.
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn regex(self, pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(self.pipe(Action::Regex {
            regex,
            message: None,
        }))
    }

    /// Requires one of the given MIME types.
    pub fn mime_type<I, S>(self, requirement: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pipe(Action::MimeType {
            requirement: requirement.into_iter().map(Into::into).collect(),
            message: None,
        })
    }

    /// Adds a custom predicate.
    pub fn check<F>(self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.pipe(Action::Check {
            check: Arc::new(check),
            message: Some(message.into()),
        })
    }

    /// Adds an asynchronous predicate, making the schema asynchronous.
    pub fn check_async<F>(self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(Value) -> BoxFuture<bool> + Send + Sync + 'static,
    {
        self.pipe(Action::CheckAsync {
            check: Arc::new(check),
            message: Some(message.into()),
        })
    }

    /// Adds a value transformation.
    pub fn transform<F>(self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.pipe(Action::Transform {
            transform: Arc::new(transform),
        })
    }

    /// Sets a custom error message for the most recent action.
    ///
    /// If no message-bearing action has been added yet, this sets the type
    /// error message instead.
    pub fn error(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        let set = self
            .pipe
            .last_mut()
            .is_some_and(|action| action.set_message(message.clone()));
        if !set {
            self.message = Some(message);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_sets_last_action_message() {
        let node = SchemaNode::new(SchemaKind::String)
            .min_length(3)
            .error("Too short");

        match node.pipe.last() {
            Some(Action::MinLength { message, .. }) => {
                assert_eq!(message.as_deref(), Some("Too short"))
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(node.message.is_none());
    }

    #[test]
    fn test_error_without_actions_sets_type_message() {
        let node = SchemaNode::new(SchemaKind::Number).error("Age is required");
        assert_eq!(node.message.as_deref(), Some("Age is required"));
    }

    #[test]
    fn test_error_after_transform_sets_type_message() {
        let node = SchemaNode::new(SchemaKind::String)
            .transform(|v| v)
            .error("Not a string");
        assert_eq!(node.message.as_deref(), Some("Not a string"));
    }
}
