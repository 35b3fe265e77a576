//! Schema definitions.
//!
//! A schema is a tree (or graph, when recursive) of [`SchemaNode`]s stored in
//! a [`SchemaArena`]. Nodes are created with the [`Schema`] factory, refined
//! with pipeline builders, and added to the arena which returns their
//! [`SchemaId`]. Composite nodes refer to their children by id.
//!
//! # Example
//!
//! ```rust
//! use formcast::{Schema, SchemaArena};
//!
//! let mut arena = SchemaArena::new();
//! let email = arena.add(Schema::string().regex(r"@").unwrap().error("must contain @"));
//! let age = arena.add(Schema::number().min_value(18));
//! let age = arena.add(Schema::optional(age));
//! let signup = arena.add(Schema::object([("email", email), ("age", age)]));
//! ```

mod action;
mod node;
mod store;

pub use action::{Action, AsyncCheckFn, BoxFuture, CheckFn, TransformFn};
pub use node::{DefaultValue, Literal, SchemaKind, SchemaNode, Wrapper};
pub use store::{SchemaArena, SchemaOverlay, SchemaStore, SchemaStoreMut};

use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::Value;

/// Identifies a node within a schema store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u32);

impl SchemaId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// The position of the node in its store.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Entry point for creating schema nodes.
///
/// `Schema` provides one factory per node kind. Primitive nodes are
/// self-contained; composite nodes take the ids of their children.
pub struct Schema;

impl Schema {
    /// Accepts any value.
    pub fn any() -> SchemaNode {
        SchemaNode::new(SchemaKind::Any)
    }

    /// Accepts any value.
    pub fn unknown() -> SchemaNode {
        SchemaNode::new(SchemaKind::Unknown)
    }

    /// Accepts strings.
    ///
    /// # Example
    ///
    /// ```rust
    /// use formcast::{Schema, SchemaArena, Validator, ValidationConfig, Value};
    ///
    /// let mut arena = SchemaArena::new();
    /// let id = arena.add(Schema::string().min_length(3));
    ///
    /// let validator = Validator::new(&arena, ValidationConfig::default());
    /// assert!(validator.safe_parse(id, &Value::from("hello")).is_success());
    /// assert!(validator.safe_parse(id, &Value::from("hi")).is_failure());
    /// ```
    pub fn string() -> SchemaNode {
        SchemaNode::new(SchemaKind::String)
    }

    /// Accepts numbers other than `NaN`.
    pub fn number() -> SchemaNode {
        SchemaNode::new(SchemaKind::Number)
    }

    /// Accepts booleans.
    pub fn boolean() -> SchemaNode {
        SchemaNode::new(SchemaKind::Boolean)
    }

    /// Accepts big integers.
    pub fn bigint() -> SchemaNode {
        SchemaNode::new(SchemaKind::BigInt)
    }

    /// Accepts dates.
    pub fn date() -> SchemaNode {
        SchemaNode::new(SchemaKind::Date)
    }

    /// Accepts files and blobs.
    pub fn blob() -> SchemaNode {
        SchemaNode::new(SchemaKind::Blob)
    }

    /// Accepts named files.
    pub fn file() -> SchemaNode {
        SchemaNode::new(SchemaKind::File)
    }

    /// Accepts only `undefined`.
    pub fn undefined() -> SchemaNode {
        SchemaNode::new(SchemaKind::Undefined)
    }

    /// Accepts only `null`.
    pub fn null() -> SchemaNode {
        SchemaNode::new(SchemaKind::Null)
    }

    /// Accepts exactly one literal value.
    pub fn literal(literal: impl Into<Literal>) -> SchemaNode {
        SchemaNode::new(SchemaKind::Literal(literal.into()))
    }

    /// Accepts one of the listed values.
    pub fn enumeration<I, L>(options: I) -> SchemaNode
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        SchemaNode::new(SchemaKind::Enum(
            options.into_iter().map(Into::into).collect(),
        ))
    }

    /// Accepts one of the listed values. Alias of [`Schema::enumeration`].
    pub fn picklist<I, L>(options: I) -> SchemaNode
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Self::enumeration(options)
    }

    /// Accepts arrays whose items all match `item`.
    pub fn array(item: SchemaId) -> SchemaNode {
        SchemaNode::new(SchemaKind::Array { item })
    }

    /// Accepts arrays with positional items; extra items are dropped.
    pub fn tuple(items: impl IntoIterator<Item = SchemaId>) -> SchemaNode {
        SchemaNode::new(SchemaKind::Tuple {
            items: items.into_iter().collect(),
        })
    }

    /// Accepts arrays with positional items followed by any number of `rest` items.
    pub fn tuple_with_rest(items: impl IntoIterator<Item = SchemaId>, rest: SchemaId) -> SchemaNode {
        SchemaNode::new(SchemaKind::TupleWithRest {
            items: items.into_iter().collect(),
            rest,
        })
    }

    /// Accepts objects with the given entries; unknown keys are dropped.
    pub fn object<I, K>(entries: I) -> SchemaNode
    where
        I: IntoIterator<Item = (K, SchemaId)>,
        K: Into<String>,
    {
        SchemaNode::new(SchemaKind::Object {
            entries: collect_entries(entries),
        })
    }

    /// Accepts objects with the given entries; unknown keys must match `rest`.
    pub fn object_with_rest<I, K>(entries: I, rest: SchemaId) -> SchemaNode
    where
        I: IntoIterator<Item = (K, SchemaId)>,
        K: Into<String>,
    {
        SchemaNode::new(SchemaKind::ObjectWithRest {
            entries: collect_entries(entries),
            rest,
        })
    }

    /// Accepts values matching any of the options.
    pub fn union(options: impl IntoIterator<Item = SchemaId>) -> SchemaNode {
        SchemaNode::new(SchemaKind::Union {
            options: options.into_iter().collect(),
        })
    }

    /// Accepts values matching all of the options.
    pub fn intersect(options: impl IntoIterator<Item = SchemaId>) -> SchemaNode {
        SchemaNode::new(SchemaKind::Intersect {
            options: options.into_iter().collect(),
        })
    }

    /// Accepts objects matching the option selected by the `key` entry.
    pub fn variant(key: impl Into<String>, options: impl IntoIterator<Item = SchemaId>) -> SchemaNode {
        SchemaNode::new(SchemaKind::Variant {
            key: key.into(),
            options: options.into_iter().collect(),
        })
    }

    /// Accepts `undefined` in addition to `wrapped`.
    pub fn optional(wrapped: SchemaId) -> SchemaNode {
        wrap(Wrapper::Optional, wrapped, None)
    }

    /// Substitutes `default` for `undefined`.
    pub fn optional_with_default(wrapped: SchemaId, default: impl Into<Value>) -> SchemaNode {
        wrap(Wrapper::Optional, wrapped, Some(DefaultValue::Value(default.into())))
    }

    /// Accepts `undefined` in addition to `wrapped`. Alias of [`Schema::optional`].
    pub fn undefinedable(wrapped: SchemaId) -> SchemaNode {
        wrap(Wrapper::Undefinedable, wrapped, None)
    }

    /// Accepts `null` in addition to `wrapped`.
    pub fn nullable(wrapped: SchemaId) -> SchemaNode {
        wrap(Wrapper::Nullable, wrapped, None)
    }

    /// Substitutes `default` for `null`.
    pub fn nullable_with_default(wrapped: SchemaId, default: impl Into<Value>) -> SchemaNode {
        wrap(Wrapper::Nullable, wrapped, Some(DefaultValue::Value(default.into())))
    }

    /// Accepts `null` and `undefined` in addition to `wrapped`.
    pub fn nullish(wrapped: SchemaId) -> SchemaNode {
        wrap(Wrapper::Nullish, wrapped, None)
    }

    /// Substitutes `default` for `null` and `undefined`.
    pub fn nullish_with_default(wrapped: SchemaId, default: impl Into<Value>) -> SchemaNode {
        wrap(Wrapper::Nullish, wrapped, Some(DefaultValue::Value(default.into())))
    }

    /// Like the `*_with_default` factories, with a default computed on each use.
    ///
    /// Returns `None` if `wrapper` does not carry defaults.
    pub fn with_default_factory<F>(wrapper: Wrapper, wrapped: SchemaId, factory: F) -> Option<SchemaNode>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        if !wrapper.accepts_default() {
            return None;
        }
        Some(wrap(
            wrapper,
            wrapped,
            Some(DefaultValue::Factory(Arc::new(factory))),
        ))
    }

    /// Rejects `undefined`.
    pub fn non_optional(wrapped: SchemaId) -> SchemaNode {
        wrap(Wrapper::NonOptional, wrapped, None)
    }

    /// Rejects `null`.
    pub fn non_nullable(wrapped: SchemaId) -> SchemaNode {
        wrap(Wrapper::NonNullable, wrapped, None)
    }

    /// Rejects `null` and `undefined`.
    pub fn non_nullish(wrapped: SchemaId) -> SchemaNode {
        wrap(Wrapper::NonNullish, wrapped, None)
    }
}

fn wrap(wrapper: Wrapper, wrapped: SchemaId, default: Option<DefaultValue>) -> SchemaNode {
    SchemaNode::new(SchemaKind::Wrapped {
        wrapper,
        wrapped,
        default,
    })
}

fn collect_entries<I, K>(entries: I) -> IndexMap<String, SchemaId>
where
    I: IntoIterator<Item = (K, SchemaId)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
