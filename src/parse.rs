//! Parsing form submissions.
//!
//! [`parse`] ties the crate together: it resolves the schema for the
//! submitted intent, coerces it, validates the nested payload built from the
//! form and reduces any issues to a map from field name to messages, ready to
//! be rendered next to the inputs.
//!
//! # Example
//!
//! ```rust
//! use formcast::{parse, FormData, ParseConfig, Schema, SchemaArena};
//! use serde_json::json;
//!
//! let mut arena = SchemaArena::new();
//! let age = arena.add(Schema::number());
//! let form_schema = arena.add(Schema::object([("age", age)]));
//!
//! let form: FormData = [("age", "20")].into_iter().collect();
//! let submission = parse(&arena, &form, &ParseConfig::new(form_schema)).unwrap();
//! assert_eq!(submission.value().unwrap().to_json(), json!({ "age": 20 }));
//!
//! let form: FormData = [("age", "")].into_iter().collect();
//! let submission = parse(&arena, &form, &ParseConfig::new(form_schema)).unwrap();
//! assert_eq!(
//!     submission.error().unwrap()["age"],
//!     vec!["Invalid type: Expected number but received undefined"]
//! );
//! ```

use std::fmt;

use indexmap::IndexMap;
use stillwater::Validation;
use thiserror::Error;
use tracing::debug;

use crate::coercion::enable_type_coercion;
use crate::error::Issues;
use crate::form::FormData;
use crate::schema::{SchemaId, SchemaOverlay, SchemaStore};
use crate::validate::{ValidationConfig, Validator};
use crate::value::{format_number, Value};

/// Field name to messages, in reporting order.
pub type ErrorMap = IndexMap<String, Vec<String>>;

/// Errors that prevent a submission from being parsed at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("schema {0:?} is not part of the store")]
    UnknownSchema(SchemaId),

    #[error("schema contains asynchronous checks, use parse_async")]
    AsyncSchema,
}

/// Where the schema of a submission comes from.
pub enum SchemaSource {
    /// Always the same schema.
    Static(SchemaId),
    /// A schema chosen by the submitted intent.
    ByIntent(Box<dyn Fn(Option<&str>) -> SchemaId + Send + Sync>),
}

impl fmt::Debug for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::Static(id) => f.debug_tuple("Static").field(id).finish(),
            SchemaSource::ByIntent(_) => f.write_str("ByIntent"),
        }
    }
}

/// How a submission is parsed.
#[derive(Debug)]
pub struct ParseConfig {
    schema: SchemaSource,
    info: ValidationConfig,
}

impl ParseConfig {
    /// Parses every submission with `schema`.
    pub fn new(schema: SchemaId) -> Self {
        Self {
            schema: SchemaSource::Static(schema),
            info: ValidationConfig::default(),
        }
    }

    /// Picks the schema from the submitted intent.
    pub fn by_intent<F>(resolve: F) -> Self
    where
        F: Fn(Option<&str>) -> SchemaId + Send + Sync + 'static,
    {
        Self {
            schema: SchemaSource::ByIntent(Box::new(resolve)),
            info: ValidationConfig::default(),
        }
    }

    /// Sets the validation options.
    pub fn with_info(mut self, info: ValidationConfig) -> Self {
        self.info = info;
        self
    }

    pub fn info(&self) -> &ValidationConfig {
        &self.info
    }

    /// The schema for a submission with the given intent.
    pub fn resolve(&self, intent: Option<&str>) -> SchemaId {
        match &self.schema {
            SchemaSource::Static(id) => *id,
            SchemaSource::ByIntent(resolve) => resolve(intent),
        }
    }
}

/// The outcome of validating a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    Success { value: Value },
    Error { error: ErrorMap },
}

/// A parsed submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// The submitted intent, if any.
    pub intent: Option<String>,
    /// The nested payload before coercion.
    pub payload: Value,
    pub result: SubmissionResult,
}

impl Submission {
    pub fn is_success(&self) -> bool {
        matches!(self.result, SubmissionResult::Success { .. })
    }

    /// The validated value, if validation succeeded.
    pub fn value(&self) -> Option<&Value> {
        match &self.result {
            SubmissionResult::Success { value } => Some(value),
            SubmissionResult::Error { .. } => None,
        }
    }

    /// The error map, if validation failed.
    pub fn error(&self) -> Option<&ErrorMap> {
        match &self.result {
            SubmissionResult::Success { .. } => None,
            SubmissionResult::Error { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<Value, ErrorMap> {
        match self.result {
            SubmissionResult::Success { value } => Ok(value),
            SubmissionResult::Error { error } => Err(error),
        }
    }
}

/// Parses a submission with a schema free of asynchronous checks.
///
/// The caller's store is never modified: the coerced schema lives in a
/// [`SchemaOverlay`] dropped at the end of the call.
pub fn parse<S: SchemaStore + ?Sized>(
    store: &S,
    form: &FormData,
    config: &ParseConfig,
) -> Result<Submission, ParseError> {
    let intent = form.intent();
    let id = config.resolve(intent);
    if !store.contains(id) {
        return Err(ParseError::UnknownSchema(id));
    }

    let mut overlay = SchemaOverlay::new(store);
    let coerced = enable_type_coercion(&mut overlay, id);
    if overlay.is_async(coerced) {
        return Err(ParseError::AsyncSchema);
    }
    debug!(?intent, schema = id.index(), added = overlay.added(), "parsing submission");

    let payload = form.to_payload();
    let result = Validator::new(&overlay, config.info).safe_parse(coerced, &payload);
    Ok(submission(intent, payload, result))
}

/// Parses a submission, awaiting any asynchronous checks of the schema.
pub async fn parse_async<S: SchemaStore + ?Sized>(
    store: &S,
    form: &FormData,
    config: &ParseConfig,
) -> Result<Submission, ParseError> {
    let intent = form.intent();
    let id = config.resolve(intent);
    if !store.contains(id) {
        return Err(ParseError::UnknownSchema(id));
    }

    let mut overlay = SchemaOverlay::new(store);
    let coerced = enable_type_coercion(&mut overlay, id);
    debug!(?intent, schema = id.index(), added = overlay.added(), "parsing submission asynchronously");

    let payload = form.to_payload();
    let result = Validator::new(&overlay, config.info)
        .safe_parse_async(coerced, &payload)
        .await;
    Ok(submission(intent, payload, result))
}

fn submission(
    intent: Option<&str>,
    payload: Value,
    result: Validation<Value, Issues>,
) -> Submission {
    let result = match result {
        Validation::Success(value) => SubmissionResult::Success { value },
        Validation::Failure(issues) => {
            debug!(issues = issues.len(), "submission has issues");
            SubmissionResult::Error {
                error: error_map(&issues),
            }
        }
    };
    Submission {
        intent: intent.map(str::to_string),
        payload,
        result,
    }
}

/// Groups issue messages by field name.
///
/// Issues without a path are keyed by the offending input when it is a
/// string, number, boolean or big integer, and by `""` otherwise.
///
/// ```rust
/// use formcast::{error_map, FieldPath, Issue, Issues};
/// use stillwater::prelude::*;
///
/// let issues = Issues::single(Issue::new(FieldPath::parse("tags[1]"), "too short"))
///     .combine(Issues::single(Issue::new(FieldPath::parse("tags[1]"), "not unique")));
///
/// assert_eq!(error_map(&issues)["tags[1]"], vec!["too short", "not unique"]);
/// ```
pub fn error_map(issues: &Issues) -> ErrorMap {
    let mut map = ErrorMap::new();
    for issue in issues.iter() {
        let name = if issue.path.is_root() {
            match &issue.input {
                Value::String(text) => text.clone(),
                Value::Number(n) => format_number(*n),
                Value::Bool(b) => b.to_string(),
                Value::BigInt(n) => n.to_string(),
                _ => String::new(),
            }
        } else {
            issue.path.to_string()
        };
        map.entry(name).or_default().push(issue.message.clone());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Issue;
    use crate::path::FieldPath;
    use crate::schema::{Schema, SchemaArena};
    use stillwater::prelude::*;

    #[test]
    fn test_unknown_schema() {
        let arena = SchemaArena::new();
        let mut other = SchemaArena::new();
        let id = other.add(Schema::string());

        let result = parse(&arena, &FormData::new(), &ParseConfig::new(id));
        assert_eq!(result, Err(ParseError::UnknownSchema(id)));
    }

    #[test]
    fn test_async_schema_requires_parse_async() {
        let mut arena = SchemaArena::new();
        let name = arena.add(Schema::string().check_async(|_| Box::pin(async { true }), "taken"));
        let form = arena.add(Schema::object([("name", name)]));

        let result = parse(&arena, &FormData::new(), &ParseConfig::new(form));
        assert_eq!(result, Err(ParseError::AsyncSchema));
    }

    #[test]
    fn test_store_is_not_modified() {
        let mut arena = SchemaArena::new();
        let age = arena.add(Schema::number());
        let form = arena.add(Schema::object([("age", age)]));
        let before = arena.len();

        let data: FormData = [("age", "3")].into_iter().collect();
        parse(&arena, &data, &ParseConfig::new(form)).unwrap();
        assert_eq!(arena.len(), before);
    }

    #[test]
    fn test_root_issues_are_keyed_by_input() {
        let issues = Issues::single(
            Issue::new(FieldPath::root(), "bad").with_input(Value::from("raw")),
        )
        .combine(Issues::single(
            Issue::new(FieldPath::root(), "form").with_input(Value::Undefined),
        ));
        let map = error_map(&issues);

        assert_eq!(map["raw"], vec!["bad"]);
        assert_eq!(map[""], vec!["form"]);
    }

    #[test]
    fn test_submission_accessors() {
        let submission = Submission {
            intent: None,
            payload: Value::Undefined,
            result: SubmissionResult::Success {
                value: Value::from(1),
            },
        };
        assert!(submission.is_success());
        assert_eq!(submission.value(), Some(&Value::from(1)));
        assert!(submission.error().is_none());
        assert_eq!(submission.into_result(), Ok(Value::from(1)));
    }
}
