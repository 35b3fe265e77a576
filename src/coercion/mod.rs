//! Schema-tree coercion.
//!
//! [`enable_type_coercion`] rewrites a schema so that it accepts raw form
//! values: every primitive node is replaced by a [`SchemaKind::Coerced`] node
//! that normalizes the raw value (empty text to absent, text to number,
//! single value to array, ...) before validating it with the original node.
//! Composite nodes are rebuilt around their coerced children and keep their
//! pipelines.
//!
//! The rewrite only adds nodes to the store; the original nodes are left
//! untouched and stay valid.
//!
//! # Example
//!
//! ```rust
//! use formcast::{enable_type_coercion, Schema, SchemaArena, ValidationConfig, Validator, Value};
//!
//! let mut arena = SchemaArena::new();
//! let age = arena.add(Schema::number());
//! let coerced = enable_type_coercion(&mut arena, age);
//!
//! let validator = Validator::new(&arena, ValidationConfig::default());
//! let result = validator.safe_parse(coerced, &Value::from("20"));
//! assert_eq!(result.into_result().unwrap(), Value::Number(20.0));
//! ```

mod normalize;

pub use normalize::{
    normalize_array, normalize_file, normalize_string, parse_bigint, parse_boolean, parse_date,
    parse_number, Normalized, Normalizer, TextTransform, TransformError,
};

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::trace;

use crate::schema::{SchemaId, SchemaKind, SchemaNode, SchemaStoreMut};

/// Coerces `id` with a fresh cache and returns the id of the coerced schema.
pub fn enable_type_coercion<S: SchemaStoreMut + ?Sized>(store: &mut S, id: SchemaId) -> SchemaId {
    TypeCoercion::new().coerce(store, id)
}

/// A coercion run with its memo cache.
///
/// The cache maps original ids to coerced ids, and coerced ids to themselves,
/// so shared subtrees are coerced once, cycles terminate, and coercing an
/// already coerced id is a no-op. Reuse one `TypeCoercion` to coerce several
/// roots that share nodes.
#[derive(Debug, Default)]
pub struct TypeCoercion {
    cache: HashMap<SchemaId, SchemaId>,
}

impl TypeCoercion {
    /// Creates a run with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached ids.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Coerces the schema rooted at `id`, adding the derived nodes to `store`.
    pub fn coerce<S: SchemaStoreMut + ?Sized>(&mut self, store: &mut S, id: SchemaId) -> SchemaId {
        if let Some(&cached) = self.cache.get(&id) {
            trace!(id = id.index(), coerced = cached.index(), "coercion cache hit");
            return cached;
        }

        let SchemaNode {
            kind,
            pipe,
            message,
        } = store.node(id).clone();
        trace!(id = id.index(), kind = kind.name(), "coercing schema node");

        if let Some(normalizer) = primitive_normalizer(&kind) {
            let coerced = store.insert(SchemaNode::new(SchemaKind::Coerced {
                normalizer,
                target: id,
            }));
            self.remember(id, coerced);
            return coerced;
        }

        if matches!(kind, SchemaKind::Coerced { .. }) {
            self.remember(id, id);
            return id;
        }

        // Composite: publish the slot before descending so cycles resolve to it
        let slot = store.reserve();
        self.remember(id, slot);

        let rebuilt = match kind {
            SchemaKind::Array { item } => {
                let item = self.coerce(store, item);
                let array = store.insert(SchemaNode {
                    kind: SchemaKind::Array { item },
                    pipe,
                    message,
                });
                self.remember(array, array);
                SchemaNode::new(SchemaKind::Coerced {
                    normalizer: Normalizer::Array,
                    target: array,
                })
            }
            SchemaKind::Wrapped {
                wrapper,
                wrapped,
                default,
            } => {
                let child = self.coerce(store, wrapped);
                let hoisted = match store.node(child).kind {
                    SchemaKind::Coerced { normalizer, target } => Some((normalizer, target)),
                    _ => None,
                };
                match hoisted {
                    Some((normalizer, target)) => {
                        // Normalize before the wrapper so "" reaches its default
                        let inner = store.insert(SchemaNode {
                            kind: SchemaKind::Wrapped {
                                wrapper,
                                wrapped: target,
                                default,
                            },
                            pipe,
                            message,
                        });
                        self.remember(inner, inner);
                        SchemaNode::new(SchemaKind::Coerced { normalizer, target: inner })
                    }
                    None => SchemaNode {
                        kind: SchemaKind::Wrapped {
                            wrapper,
                            wrapped: child,
                            default,
                        },
                        pipe,
                        message,
                    },
                }
            }
            kind => SchemaNode {
                kind: self.coerce_children(store, kind),
                pipe,
                message,
            },
        };

        store.replace(slot, rebuilt);
        slot
    }

    fn coerce_children<S: SchemaStoreMut + ?Sized>(
        &mut self,
        store: &mut S,
        kind: SchemaKind,
    ) -> SchemaKind {
        match kind {
            SchemaKind::Tuple { items } => SchemaKind::Tuple {
                items: self.coerce_all(store, items),
            },
            SchemaKind::TupleWithRest { items, rest } => SchemaKind::TupleWithRest {
                items: self.coerce_all(store, items),
                rest: self.coerce(store, rest),
            },
            SchemaKind::Object { entries } => SchemaKind::Object {
                entries: self.coerce_entries(store, entries),
            },
            SchemaKind::ObjectWithRest { entries, rest } => SchemaKind::ObjectWithRest {
                entries: self.coerce_entries(store, entries),
                rest: self.coerce(store, rest),
            },
            SchemaKind::Union { options } => SchemaKind::Union {
                options: self.coerce_all(store, options),
            },
            SchemaKind::Intersect { options } => SchemaKind::Intersect {
                options: self.coerce_all(store, options),
            },
            SchemaKind::Variant { key, options } => SchemaKind::Variant {
                key,
                options: self.coerce_all(store, options),
            },
            other => other,
        }
    }

    fn coerce_all<S: SchemaStoreMut + ?Sized>(
        &mut self,
        store: &mut S,
        ids: Vec<SchemaId>,
    ) -> Vec<SchemaId> {
        ids.into_iter().map(|id| self.coerce(store, id)).collect()
    }

    fn coerce_entries<S: SchemaStoreMut + ?Sized>(
        &mut self,
        store: &mut S,
        entries: IndexMap<String, SchemaId>,
    ) -> IndexMap<String, SchemaId> {
        entries
            .into_iter()
            .map(|(key, id)| (key, self.coerce(store, id)))
            .collect()
    }

    fn remember(&mut self, original: SchemaId, coerced: SchemaId) {
        self.cache.insert(original, coerced);
        self.cache.insert(coerced, coerced);
    }
}

/// The normalizer for kinds that are coerced as a whole, or `None` for
/// composite kinds.
fn primitive_normalizer(kind: &SchemaKind) -> Option<Normalizer> {
    match kind {
        SchemaKind::Number => Some(Normalizer::Number),
        SchemaKind::Boolean => Some(Normalizer::Boolean),
        SchemaKind::Date => Some(Normalizer::Date),
        SchemaKind::BigInt => Some(Normalizer::BigInt),
        SchemaKind::File | SchemaKind::Blob => Some(Normalizer::File),
        SchemaKind::String
        | SchemaKind::Literal(_)
        | SchemaKind::Enum(_)
        | SchemaKind::Undefined
        | SchemaKind::Null
        | SchemaKind::Any
        | SchemaKind::Unknown => Some(Normalizer::Text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, SchemaArena, SchemaStore, Wrapper};

    fn coerced_parts(arena: &SchemaArena, id: SchemaId) -> (Normalizer, SchemaId) {
        match arena.node(id).kind {
            SchemaKind::Coerced { normalizer, target } => (normalizer, target),
            ref other => panic!("expected a coerced node, got {}", other.name()),
        }
    }

    #[test]
    fn test_primitive_is_wrapped_with_its_normalizer() {
        let mut arena = SchemaArena::new();
        let number = arena.add(Schema::number().min_value(1));

        let coerced = enable_type_coercion(&mut arena, number);

        assert_eq!(coerced_parts(&arena, coerced), (Normalizer::Number, number));
        assert_eq!(arena.expects(coerced), "number");
    }

    #[test]
    fn test_object_entries_are_coerced_in_order() {
        let mut arena = SchemaArena::new();
        let name = arena.add(Schema::string());
        let age = arena.add(Schema::number());
        let user = arena.add(Schema::object([("name", name), ("age", age)]).check(|_| true, "ok"));

        let coerced = enable_type_coercion(&mut arena, user);

        let node = arena.node(coerced);
        assert_eq!(node.pipe.len(), 1);
        match &node.kind {
            SchemaKind::Object { entries } => {
                let keys: Vec<_> = entries.keys().cloned().collect();
                assert_eq!(keys, vec!["name", "age"]);
                assert_eq!(coerced_parts(&arena, entries["name"]).0, Normalizer::Text);
                assert_eq!(coerced_parts(&arena, entries["age"]).0, Normalizer::Number);
            }
            other => panic!("expected an object, got {}", other.name()),
        }
    }

    #[test]
    fn test_array_normalizes_before_its_pipeline() {
        let mut arena = SchemaArena::new();
        let item = arena.add(Schema::number());
        let list = arena.add(Schema::array(item).min_length(1));

        let coerced = enable_type_coercion(&mut arena, list);
        let (normalizer, array) = coerced_parts(&arena, coerced);

        assert_eq!(normalizer, Normalizer::Array);
        let node = arena.node(array);
        assert_eq!(node.pipe.len(), 1);
        match node.kind {
            SchemaKind::Array { item: coerced_item } => {
                assert_eq!(coerced_parts(&arena, coerced_item), (Normalizer::Number, item));
            }
            ref other => panic!("expected an array, got {}", other.name()),
        }
    }

    #[test]
    fn test_wrapper_hoists_primitive_normalizer() {
        let mut arena = SchemaArena::new();
        let number = arena.add(Schema::number());
        let optional = arena.add(Schema::optional_with_default(number, 5));

        let coerced = enable_type_coercion(&mut arena, optional);
        let (normalizer, wrapper) = coerced_parts(&arena, coerced);

        assert_eq!(normalizer, Normalizer::Number);
        match &arena.node(wrapper).kind {
            SchemaKind::Wrapped {
                wrapper,
                wrapped,
                default,
            } => {
                assert_eq!(*wrapper, Wrapper::Optional);
                assert_eq!(*wrapped, number);
                assert!(default.is_some());
            }
            other => panic!("expected a wrapper, got {}", other.name()),
        }
    }

    #[test]
    fn test_wrapper_around_composite_is_not_hoisted() {
        let mut arena = SchemaArena::new();
        let name = arena.add(Schema::string());
        let object = arena.add(Schema::object([("name", name)]));
        let nullable = arena.add(Schema::nullable(object));

        let coerced = enable_type_coercion(&mut arena, nullable);

        match &arena.node(coerced).kind {
            SchemaKind::Wrapped { wrapped, .. } => {
                assert!(matches!(arena.node(*wrapped).kind, SchemaKind::Object { .. }));
                assert_ne!(*wrapped, object);
            }
            other => panic!("expected a wrapper, got {}", other.name()),
        }
    }

    #[test]
    fn test_coercing_twice_returns_the_same_id() {
        let mut arena = SchemaArena::new();
        let name = arena.add(Schema::string());
        let root = arena.add(Schema::object([("name", name)]));

        let mut coercion = TypeCoercion::new();
        let first = coercion.coerce(&mut arena, root);
        let size = arena.len();
        let second = coercion.coerce(&mut arena, first);
        let third = coercion.coerce(&mut arena, root);

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(arena.len(), size);
    }

    #[test]
    fn test_already_coerced_node_is_left_alone() {
        let mut arena = SchemaArena::new();
        let number = arena.add(Schema::number());
        let coerced = enable_type_coercion(&mut arena, number);
        let size = arena.len();

        assert_eq!(enable_type_coercion(&mut arena, coerced), coerced);
        assert_eq!(arena.len(), size);
    }

    #[test]
    fn test_shared_subtree_is_coerced_once() {
        let mut arena = SchemaArena::new();
        let name = arena.add(Schema::string());
        let pair = arena.add(Schema::object([("first", name), ("second", name)]));

        let coerced = enable_type_coercion(&mut arena, pair);

        let entries = match &arena.node(coerced).kind {
            SchemaKind::Object { entries } => entries.clone(),
            other => panic!("expected an object, got {}", other.name()),
        };
        assert_eq!(entries["first"], entries["second"]);
    }

    #[test]
    fn test_cyclic_schema_terminates() {
        let mut arena = SchemaArena::new();
        let node = arena.declare();
        let name = arena.add(Schema::string());
        let children = arena.add(Schema::array(node));
        arena.define(node, Schema::object([("name", name), ("children", children)]));

        let coerced = enable_type_coercion(&mut arena, node);

        let entries = match &arena.node(coerced).kind {
            SchemaKind::Object { entries } => entries.clone(),
            other => panic!("expected an object, got {}", other.name()),
        };
        let (_, array) = coerced_parts(&arena, entries["children"]);
        match arena.node(array).kind {
            SchemaKind::Array { item } => assert_eq!(item, coerced),
            ref other => panic!("expected an array, got {}", other.name()),
        }
    }
}
