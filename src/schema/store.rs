//! Schema storage.
//!
//! Schema trees live in an arena and refer to each other by [`SchemaId`], so
//! recursive definitions are ordinary id cycles and coercion can memoize on
//! the id instead of on object identity.

use std::collections::{HashMap, HashSet};

use super::node::{SchemaKind, SchemaNode, Wrapper};
use super::SchemaId;

/// Labels deeper than this are reported as `unknown`.
const MAX_EXPECTS_DEPTH: usize = 32;

/// Read access to schema nodes.
///
/// # Panics
///
/// `node` panics when given an id that was not issued by this store (or the
/// store it layers over). Use [`SchemaStore::contains`] to check ids of
/// unknown origin.
pub trait SchemaStore {
    /// Returns the node for `id`.
    fn node(&self, id: SchemaId) -> &SchemaNode;

    /// Number of ids issued so far.
    fn len(&self) -> usize;

    /// Returns true if no node has been added.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `id` was issued by this store.
    fn contains(&self, id: SchemaId) -> bool {
        id.index() < self.len()
    }

    /// The human-readable label of what the schema expects, as cited by type
    /// issues (`number`, `Date`, `"a" | "b"`, `!undefined`, ...).
    fn expects(&self, id: SchemaId) -> String {
        expects_at(self, id, 0)
    }

    /// Returns true if any node reachable from `id` carries an asynchronous
    /// check.
    fn is_async(&self, id: SchemaId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let node = self.node(current);
            if node.pipe.iter().any(|action| action.is_async()) {
                return true;
            }
            stack.extend(node.kind.children());
        }
        false
    }
}

/// Write access to schema nodes.
pub trait SchemaStoreMut: SchemaStore {
    /// Issues a new id whose node is a placeholder until [`replace`](Self::replace)d.
    fn reserve(&mut self) -> SchemaId;

    /// Replaces the node stored under `id`.
    fn replace(&mut self, id: SchemaId, node: SchemaNode);

    /// Adds a node and returns its id.
    fn insert(&mut self, node: SchemaNode) -> SchemaId {
        let id = self.reserve();
        self.replace(id, node);
        id
    }
}

fn placeholder() -> SchemaNode {
    SchemaNode::new(SchemaKind::Unknown)
}

fn expects_at<S: SchemaStore + ?Sized>(store: &S, id: SchemaId, depth: usize) -> String {
    if depth > MAX_EXPECTS_DEPTH {
        return "unknown".to_string();
    }
    let nested = |child: SchemaId| expects_at(store, child, depth + 1);

    match &store.node(id).kind {
        SchemaKind::Any => "any".to_string(),
        SchemaKind::Unknown => "unknown".to_string(),
        SchemaKind::String => "string".to_string(),
        SchemaKind::Number => "number".to_string(),
        SchemaKind::Boolean => "boolean".to_string(),
        SchemaKind::BigInt => "bigint".to_string(),
        SchemaKind::Date => "Date".to_string(),
        SchemaKind::Blob => "Blob".to_string(),
        SchemaKind::File => "File".to_string(),
        SchemaKind::Undefined => "undefined".to_string(),
        SchemaKind::Null => "null".to_string(),
        SchemaKind::Literal(literal) => literal.to_string(),
        SchemaKind::Enum(options) => {
            join_expects(options.iter().map(ToString::to_string).collect(), "|")
        }
        SchemaKind::Array { .. } | SchemaKind::Tuple { .. } | SchemaKind::TupleWithRest { .. } => {
            "Array".to_string()
        }
        SchemaKind::Object { .. }
        | SchemaKind::ObjectWithRest { .. }
        | SchemaKind::Variant { .. } => "Object".to_string(),
        SchemaKind::Union { options } => {
            join_expects(options.iter().map(|o| nested(*o)).collect(), "|")
        }
        SchemaKind::Intersect { options } => {
            join_expects(options.iter().map(|o| nested(*o)).collect(), "&")
        }
        SchemaKind::Wrapped {
            wrapper, wrapped, ..
        } => match wrapper {
            Wrapper::Optional | Wrapper::Undefinedable => {
                join_expects(vec![nested(*wrapped), "undefined".to_string()], "|")
            }
            Wrapper::Nullable => join_expects(vec![nested(*wrapped), "null".to_string()], "|"),
            Wrapper::Nullish => join_expects(
                vec![
                    nested(*wrapped),
                    "null".to_string(),
                    "undefined".to_string(),
                ],
                "|",
            ),
            Wrapper::NonOptional => "!undefined".to_string(),
            Wrapper::NonNullable => "!null".to_string(),
            Wrapper::NonNullish => "!null & !undefined".to_string(),
        },
        SchemaKind::Coerced { target, .. } => nested(*target),
    }
}

/// Joins labels with ` | ` or ` & `, dropping duplicates.
fn join_expects(values: Vec<String>, separator: &str) -> String {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    if unique.is_empty() {
        return "never".to_string();
    }
    unique.join(&format!(" {} ", separator))
}

/// The owning store for schema nodes.
///
/// # Example
///
/// ```rust
/// use formcast::{Schema, SchemaArena, SchemaStore};
///
/// let mut arena = SchemaArena::new();
///
/// // A category holds a list of sub-categories of the same shape.
/// let category = arena.declare();
/// let name = arena.add(Schema::string());
/// let children = arena.add(Schema::array(category));
/// arena.define(category, Schema::object([("name", name), ("children", children)]));
///
/// assert_eq!(arena.expects(category), "Object");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
}

impl SchemaArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its id.
    pub fn add(&mut self, node: SchemaNode) -> SchemaId {
        self.insert(node)
    }

    /// Reserves an id for a node that is defined later with
    /// [`define`](Self::define). This is how recursive schemas are built.
    ///
    /// Until defined, the id behaves like an `unknown` schema.
    pub fn declare(&mut self) -> SchemaId {
        self.reserve()
    }

    /// Defines a node previously reserved with [`declare`](Self::declare).
    pub fn define(&mut self, id: SchemaId, node: SchemaNode) {
        self.replace(id, node);
    }
}

impl SchemaStore for SchemaArena {
    fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl SchemaStoreMut for SchemaArena {
    fn reserve(&mut self) -> SchemaId {
        self.nodes.push(placeholder());
        SchemaId::from_index(self.nodes.len() - 1)
    }

    fn replace(&mut self, id: SchemaId, node: SchemaNode) {
        self.nodes[id.index()] = node;
    }
}

/// A scratch layer over a borrowed store.
///
/// New nodes go into the overlay; the underlying store is never modified.
/// Parsing coerces into an overlay so the caller's arena stays untouched and
/// the derived nodes are dropped with the overlay.
pub struct SchemaOverlay<'a, S: SchemaStore + ?Sized> {
    base: &'a S,
    offset: usize,
    nodes: Vec<SchemaNode>,
    shadowed: HashMap<SchemaId, SchemaNode>,
}

impl<'a, S: SchemaStore + ?Sized> SchemaOverlay<'a, S> {
    /// Creates an empty overlay on top of `base`.
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            offset: base.len(),
            nodes: Vec::new(),
            shadowed: HashMap::new(),
        }
    }

    /// Number of nodes added on top of the base store.
    pub fn added(&self) -> usize {
        self.nodes.len()
    }
}

impl<S: SchemaStore + ?Sized> SchemaStore for SchemaOverlay<'_, S> {
    fn node(&self, id: SchemaId) -> &SchemaNode {
        let index = id.index();
        if index >= self.offset {
            return &self.nodes[index - self.offset];
        }
        self.shadowed.get(&id).unwrap_or_else(|| self.base.node(id))
    }

    fn len(&self) -> usize {
        self.offset + self.nodes.len()
    }
}

impl<S: SchemaStore + ?Sized> SchemaStoreMut for SchemaOverlay<'_, S> {
    fn reserve(&mut self) -> SchemaId {
        self.nodes.push(placeholder());
        SchemaId::from_index(self.offset + self.nodes.len() - 1)
    }

    fn replace(&mut self, id: SchemaId, node: SchemaNode) {
        let index = id.index();
        if index >= self.offset {
            self.nodes[index - self.offset] = node;
        } else {
            // Base nodes are shadowed, never written through
            self.shadowed.insert(id, node);
        }
    }
}
