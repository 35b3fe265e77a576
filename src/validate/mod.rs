//! The validation engine.
//!
//! [`Validator`] validates a [`Value`] against a schema stored in a
//! [`SchemaStore`]. Issues are accumulated rather than short-circuiting, so a
//! single pass reports every invalid field, and the outcome is a
//! `stillwater::Validation` carrying either the typed output or the
//! non-empty [`Issues`].
//!
//! # Example
//!
//! ```rust
//! use formcast::{Schema, SchemaArena, ValidationConfig, Validator, Value};
//! use serde_json::json;
//!
//! let mut arena = SchemaArena::new();
//! let name = arena.add(Schema::string().min_length(1));
//! let age = arena.add(Schema::number().min_value(0));
//! let user = arena.add(Schema::object([("name", name), ("age", age)]));
//!
//! let validator = Validator::new(&arena, ValidationConfig::default());
//! let result = validator.safe_parse(user, &Value::from(json!({ "name": "", "age": -1 })));
//!
//! let issues = result.into_result().unwrap_err();
//! assert_eq!(issues.len(), 2);
//! ```

mod pipe;

use indexmap::IndexMap;
use stillwater::Validation;
use tracing::trace;

use crate::error::{Issue, Issues};
use crate::path::FieldPath;
use crate::schema::{
    Action, AsyncCheckFn, DefaultValue, SchemaId, SchemaKind, SchemaNode, SchemaStore, Wrapper,
};
use crate::value::Value;

/// Validation options.
///
/// # Example
///
/// ```rust
/// use formcast::ValidationConfig;
///
/// let config = ValidationConfig::new().abort_pipe_early(true);
/// assert!(config.is_abort_pipe_early());
/// assert!(!config.is_abort_early());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationConfig {
    abort_early: bool,
    abort_pipe_early: bool,
    skip_pipe: bool,
}

impl ValidationConfig {
    /// Creates the default configuration: report every issue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop validating at the first issue.
    pub fn abort_early(mut self, enabled: bool) -> Self {
        self.abort_early = enabled;
        self
    }

    /// Stop a node's pipeline at its first issue.
    pub fn abort_pipe_early(mut self, enabled: bool) -> Self {
        self.abort_pipe_early = enabled;
        self
    }

    /// Only check types, skip every pipeline.
    pub fn skip_pipe(mut self, enabled: bool) -> Self {
        self.skip_pipe = enabled;
        self
    }

    pub fn is_abort_early(&self) -> bool {
        self.abort_early
    }

    pub fn is_abort_pipe_early(&self) -> bool {
        self.abort_pipe_early
    }

    pub fn is_skip_pipe(&self) -> bool {
        self.skip_pipe
    }
}

/// The intermediate result of validating one node.
#[derive(Debug)]
struct Dataset {
    value: Value,
    /// The value has the schema's output type. Pipeline issues keep a
    /// dataset typed; type issues do not.
    typed: bool,
    issues: Vec<Issue>,
}

impl Dataset {
    fn typed(value: Value) -> Self {
        Self {
            value,
            typed: true,
            issues: Vec::new(),
        }
    }

    fn failed(value: Value, issue: Issue) -> Self {
        Self {
            value,
            typed: false,
            issues: vec![issue],
        }
    }

    fn is_valid(&self) -> bool {
        self.typed && self.issues.is_empty()
    }
}

/// An asynchronous check found during the synchronous walk.
struct PendingCheck {
    check: AsyncCheckFn,
    value: Value,
    path: FieldPath,
    message: Option<String>,
}

/// Validates values against the schemas of a store.
pub struct Validator<'a, S: SchemaStore + ?Sized> {
    store: &'a S,
    config: ValidationConfig,
}

impl<'a, S: SchemaStore + ?Sized> Validator<'a, S> {
    pub fn new(store: &'a S, config: ValidationConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validates `input` against the schema `id`.
    ///
    /// Asynchronous checks cannot run here; each one that would have run is
    /// reported as an issue with code `async`. Use
    /// [`safe_parse_async`](Self::safe_parse_async) for such schemas.
    pub fn safe_parse(&self, id: SchemaId, input: &Value) -> Validation<Value, Issues> {
        let mut pending = Vec::new();
        let mut dataset = self.run(id, input, &FieldPath::root(), &mut pending);
        for check in pending {
            dataset.issues.push(pipe::issue(
                &check.path,
                "async",
                "input",
                None,
                check.value.received(),
                &check.value,
                Some("Asynchronous check requires async validation"),
            ));
        }
        finish(dataset)
    }

    /// Validates `input` against the schema `id`, awaiting asynchronous
    /// checks once the synchronous walk is complete.
    pub async fn safe_parse_async(&self, id: SchemaId, input: &Value) -> Validation<Value, Issues> {
        let mut pending = Vec::new();
        let mut dataset = self.run(id, input, &FieldPath::root(), &mut pending);
        trace!(checks = pending.len(), "awaiting asynchronous checks");

        for check in pending {
            if self.should_abort(&dataset.issues) {
                break;
            }
            if !(check.check)(check.value.clone()).await {
                dataset.issues.push(pipe::failed_async_check(
                    &check.value,
                    &check.path,
                    check.message.as_deref(),
                ));
            }
        }
        finish(dataset)
    }

    fn should_abort(&self, issues: &[Issue]) -> bool {
        self.config.abort_early && !issues.is_empty()
    }

    fn run(
        &self,
        id: SchemaId,
        input: &Value,
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let node = self.store.node(id);
        let mut dataset = self.run_kind(id, node, input, path, pending);
        if dataset.typed && !self.config.skip_pipe && !node.pipe.is_empty() {
            self.run_pipe(&node.pipe, &mut dataset, path, pending);
        }
        dataset
    }

    fn run_kind(
        &self,
        id: SchemaId,
        node: &SchemaNode,
        input: &Value,
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let accepted = match &node.kind {
            SchemaKind::Any | SchemaKind::Unknown => true,
            SchemaKind::String => matches!(input, Value::String(_)),
            SchemaKind::Number => matches!(input, Value::Number(n) if !n.is_nan()),
            SchemaKind::Boolean => matches!(input, Value::Bool(_)),
            SchemaKind::BigInt => matches!(input, Value::BigInt(_)),
            SchemaKind::Date => matches!(input, Value::Date(_)),
            SchemaKind::Blob => matches!(input, Value::File(_)),
            SchemaKind::File => matches!(input, Value::File(file) if file.name.is_some()),
            SchemaKind::Undefined => input.is_undefined(),
            SchemaKind::Null => input.is_null(),
            SchemaKind::Literal(literal) => literal.matches(input),
            SchemaKind::Enum(options) => options.iter().any(|option| option.matches(input)),

            SchemaKind::Array { item } => {
                return match input {
                    Value::Array(items) => self.run_items(*item, items, path, pending),
                    _ => self.type_failure(id, node, input, path),
                }
            }
            SchemaKind::Tuple { items } => {
                return match input {
                    Value::Array(values) => self.run_tuple(items, None, values, path, pending),
                    _ => self.type_failure(id, node, input, path),
                }
            }
            SchemaKind::TupleWithRest { items, rest } => {
                return match input {
                    Value::Array(values) => {
                        self.run_tuple(items, Some(*rest), values, path, pending)
                    }
                    _ => self.type_failure(id, node, input, path),
                }
            }
            SchemaKind::Object { entries } => {
                return match input {
                    Value::Object(values) => self.run_object(entries, None, values, path, pending),
                    _ => self.type_failure(id, node, input, path),
                }
            }
            SchemaKind::ObjectWithRest { entries, rest } => {
                return match input {
                    Value::Object(values) => {
                        self.run_object(entries, Some(*rest), values, path, pending)
                    }
                    _ => self.type_failure(id, node, input, path),
                }
            }
            SchemaKind::Union { options } => {
                return self.run_union(id, node, options, input, path, pending)
            }
            SchemaKind::Intersect { options } => {
                return self.run_intersect(id, node, options, input, path, pending)
            }
            SchemaKind::Variant { key, options } => {
                return self.run_variant(id, node, key, options, input, path, pending)
            }
            SchemaKind::Wrapped {
                wrapper,
                wrapped,
                default,
            } => {
                return self.run_wrapped(
                    *wrapper,
                    *wrapped,
                    default.as_ref(),
                    node.message.as_deref(),
                    input,
                    path,
                    pending,
                );
            }
            SchemaKind::Coerced { normalizer, target } => {
                let normalized = normalizer.apply(input.clone());
                return self.run(*target, &normalized, path, pending);
            }
        };

        if accepted {
            Dataset::typed(input.clone())
        } else {
            self.type_failure(id, node, input, path)
        }
    }

    fn type_failure(&self, id: SchemaId, node: &SchemaNode, input: &Value, path: &FieldPath) -> Dataset {
        let issue = pipe::issue(
            path,
            node.kind.name(),
            "type",
            Some(self.store.expects(id)),
            input.received(),
            input,
            node.message.as_deref(),
        );
        Dataset::failed(input.clone(), issue)
    }

    fn run_items(
        &self,
        item: SchemaId,
        items: &[Value],
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let mut dataset = Dataset::typed(Value::Undefined);
        let mut output = Vec::with_capacity(items.len());

        for (index, value) in items.iter().enumerate() {
            let result = self.run(item, value, &path.push_index(index), pending);
            absorb(&mut dataset, result, |value| output.push(value));
            if self.should_abort(&dataset.issues) {
                break;
            }
        }

        dataset.value = Value::Array(output);
        dataset
    }

    fn run_tuple(
        &self,
        items: &[SchemaId],
        rest: Option<SchemaId>,
        values: &[Value],
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let mut dataset = Dataset::typed(Value::Undefined);
        let mut output = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let value = values.get(index).cloned().unwrap_or_default();
            let result = self.run(*item, &value, &path.push_index(index), pending);
            absorb(&mut dataset, result, |value| output.push(value));
            if self.should_abort(&dataset.issues) {
                dataset.value = Value::Array(output);
                return dataset;
            }
        }

        if let Some(rest) = rest {
            for (index, value) in values.iter().enumerate().skip(items.len()) {
                let result = self.run(rest, value, &path.push_index(index), pending);
                absorb(&mut dataset, result, |value| output.push(value));
                if self.should_abort(&dataset.issues) {
                    break;
                }
            }
        }

        dataset.value = Value::Array(output);
        dataset
    }

    fn run_object(
        &self,
        entries: &IndexMap<String, SchemaId>,
        rest: Option<SchemaId>,
        values: &IndexMap<String, Value>,
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let mut dataset = Dataset::typed(Value::Undefined);
        let mut output = IndexMap::new();

        for (key, schema) in entries {
            let present = values.get(key);
            let value = present.cloned().unwrap_or_default();
            let result = self.run(*schema, &value, &path.push_field(key.as_str()), pending);
            absorb(&mut dataset, result, |value| {
                // A key stays when it was submitted or gained a value
                if present.is_some() || !value.is_undefined() {
                    output.insert(key.clone(), value);
                }
            });
            if self.should_abort(&dataset.issues) {
                dataset.value = Value::Object(output);
                return dataset;
            }
        }

        if let Some(rest) = rest {
            for (key, value) in values.iter().filter(|(key, _)| !entries.contains_key(*key)) {
                let result = self.run(rest, value, &path.push_field(key.as_str()), pending);
                absorb(&mut dataset, result, |value| {
                    output.insert(key.clone(), value);
                });
                if self.should_abort(&dataset.issues) {
                    break;
                }
            }
        }

        dataset.value = Value::Object(output);
        dataset
    }

    fn run_union(
        &self,
        id: SchemaId,
        node: &SchemaNode,
        options: &[SchemaId],
        input: &Value,
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let mut first_typed: Option<Dataset> = None;
        let mut untyped: Vec<Dataset> = Vec::new();

        for (index, option) in options.iter().enumerate() {
            let mut branch_pending = Vec::new();
            let result = self.run(*option, input, path, &mut branch_pending);
            if result.is_valid() {
                trace!(option = index, "union option matched");
                pending.append(&mut branch_pending);
                return result;
            }
            if result.typed {
                first_typed.get_or_insert(result);
            } else {
                untyped.push(result);
            }
        }

        if let Some(typed) = first_typed {
            return typed;
        }
        if untyped.len() == 1 {
            if let Some(only) = untyped.pop() {
                return only;
            }
        }
        self.type_failure(id, node, input, path)
    }

    fn run_intersect(
        &self,
        id: SchemaId,
        node: &SchemaNode,
        options: &[SchemaId],
        input: &Value,
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let mut dataset = Dataset::typed(input.clone());
        let mut outputs = Vec::with_capacity(options.len());

        for option in options {
            let result = self.run(*option, input, path, pending);
            absorb(&mut dataset, result, |value| outputs.push(value));
            if self.should_abort(&dataset.issues) {
                return dataset;
            }
        }
        if !dataset.typed {
            return dataset;
        }

        let mut outputs = outputs.into_iter();
        let Some(first) = outputs.next() else {
            return dataset;
        };
        let mut merged = Some(first);
        for output in outputs {
            merged = merged.and_then(|current| merge(current, output));
        }

        match merged {
            Some(value) => {
                dataset.value = value;
                dataset
            }
            None => {
                let failure = self.type_failure(id, node, input, path);
                dataset.issues.extend(failure.issues);
                dataset.typed = false;
                dataset
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_variant(
        &self,
        id: SchemaId,
        node: &SchemaNode,
        key: &str,
        options: &[SchemaId],
        input: &Value,
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let Value::Object(values) = input else {
            return self.type_failure(id, node, input, path);
        };
        let discriminator = values.get(key).cloned().unwrap_or_default();
        let key_path = path.push_field(key);

        let mut expected = Vec::new();
        for (index, option) in options.iter().enumerate() {
            let candidates = self.discriminators(*option, key);
            let selected = candidates.iter().any(|candidate| {
                let mut ignored = Vec::new();
                self.run(*candidate, &discriminator, &key_path, &mut ignored)
                    .is_valid()
            });
            if selected {
                trace!(option = index, key, "variant option selected");
                return self.run(*option, input, path, pending);
            }
            expected.extend(candidates.iter().map(|c| self.store.expects(*c)));
        }

        let mut unique: Vec<String> = Vec::new();
        for label in expected {
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        let expected = if unique.is_empty() {
            "never".to_string()
        } else {
            unique.join(" | ")
        };

        let issue = pipe::issue(
            &key_path,
            "variant",
            "type",
            Some(expected),
            discriminator.received(),
            &discriminator,
            node.message.as_deref(),
        );
        Dataset::failed(input.clone(), issue)
    }

    /// The schemas an option's `key` entry is validated with to select it.
    fn discriminators(&self, option: SchemaId, key: &str) -> Vec<SchemaId> {
        let mut found = Vec::new();
        let mut stack = vec![option];
        let mut visited = Vec::new();
        while let Some(current) = stack.pop() {
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            match &self.store.node(current).kind {
                SchemaKind::Object { entries } | SchemaKind::ObjectWithRest { entries, .. } => {
                    found.extend(entries.get(key).copied());
                }
                SchemaKind::Variant { options, .. } => {
                    stack.extend(options.iter().rev().copied());
                }
                SchemaKind::Coerced { target, .. } => stack.push(*target),
                _ => {}
            }
        }
        found
    }

    #[allow(clippy::too_many_arguments)]
    fn run_wrapped(
        &self,
        wrapper: Wrapper,
        wrapped: SchemaId,
        default: Option<&DefaultValue>,
        message: Option<&str>,
        input: &Value,
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) -> Dataset {
        let (accepts_undefined, accepts_null) = match wrapper {
            Wrapper::Optional | Wrapper::Undefinedable => (true, false),
            Wrapper::Nullable => (false, true),
            Wrapper::Nullish => (true, true),
            Wrapper::NonOptional | Wrapper::NonNullable | Wrapper::NonNullish => {
                let rejected = match wrapper {
                    Wrapper::NonOptional => input.is_undefined(),
                    Wrapper::NonNullable => input.is_null(),
                    _ => input.is_undefined() || input.is_null(),
                };
                if rejected {
                    let expected = match wrapper {
                        Wrapper::NonOptional => "!undefined",
                        Wrapper::NonNullable => "!null",
                        _ => "!null & !undefined",
                    };
                    let issue = pipe::issue(
                        path,
                        wrapper.name(),
                        "type",
                        Some(expected.to_string()),
                        input.received(),
                        input,
                        message,
                    );
                    return Dataset::failed(input.clone(), issue);
                }
                return self.run(wrapped, input, path, pending);
            }
        };

        let is_empty =
            (accepts_undefined && input.is_undefined()) || (accepts_null && input.is_null());
        if !is_empty {
            return self.run(wrapped, input, path, pending);
        }

        let value = default.map_or_else(|| input.clone(), DefaultValue::get);
        let still_empty =
            (accepts_undefined && value.is_undefined()) || (accepts_null && value.is_null());
        if still_empty {
            return Dataset::typed(value);
        }
        self.run(wrapped, &value, path, pending)
    }

    fn run_pipe(
        &self,
        actions: &[Action],
        dataset: &mut Dataset,
        path: &FieldPath,
        pending: &mut Vec<PendingCheck>,
    ) {
        for action in actions {
            if !dataset.issues.is_empty()
                && (self.config.abort_pipe_early || self.config.abort_early)
            {
                break;
            }
            match action {
                Action::Transform { transform } => {
                    if !dataset.issues.is_empty() {
                        dataset.typed = false;
                        break;
                    }
                    let value = std::mem::take(&mut dataset.value);
                    dataset.value = transform(value);
                }
                Action::CheckAsync { check, message } => pending.push(PendingCheck {
                    check: check.clone(),
                    value: dataset.value.clone(),
                    path: path.clone(),
                    message: message.clone(),
                }),
                action => {
                    if let Some(issue) = pipe::check(action, &dataset.value, path) {
                        dataset.issues.push(issue);
                    }
                }
            }
        }
    }
}

/// Folds a child result into its parent: issues accumulate, an untyped
/// child untypes the parent, the child's value goes to `store`.
fn absorb(parent: &mut Dataset, child: Dataset, mut store: impl FnMut(Value)) {
    if !child.typed {
        parent.typed = false;
    }
    parent.issues.extend(child.issues);
    store(child.value);
}

/// Merges intersect outputs: objects are merged key by key, other values
/// must be equal.
fn merge(a: Value, b: Value) -> Option<Value> {
    match (a, b) {
        (Value::Object(mut a), Value::Object(b)) => {
            for (key, value) in b {
                match a.get_mut(&key) {
                    Some(existing) => {
                        let current = std::mem::take(existing);
                        *existing = merge(current, value)?;
                    }
                    None => {
                        a.insert(key, value);
                    }
                }
            }
            Some(Value::Object(a))
        }
        (a, b) if a == b => Some(a),
        _ => None,
    }
}

fn finish(dataset: Dataset) -> Validation<Value, Issues> {
    match Issues::from_vec(dataset.issues) {
        Some(issues) => Validation::Failure(issues),
        None => Validation::Success(dataset.value),
    }
}
