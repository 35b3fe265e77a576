//! # Formcast
//!
//! Turns HTML form submissions into typed, validated values.
//!
//! ## Overview
//!
//! A submitted form is a flat list of text fields and uploads, while the data
//! an application wants is nested and typed: numbers, booleans, dates, lists
//! of objects. Formcast bridges the two with three pieces:
//!
//! - **Coercion** ([`enable_type_coercion`]) rewrites a schema so that every
//!   field normalizes its raw value first: `""` means absent, `"20"` becomes
//!   `20`, `"on"` becomes `true`, and a field sent zero, one or many times
//!   becomes an array.
//! - **Constraints** ([`get_constraints`]) flatten a schema into per-field
//!   HTML attributes (`required`, `minLength`, `pattern`, ...).
//! - **Parsing** ([`parse`]) coerces the schema, validates the submission
//!   and reduces the issues to a map from field name to messages.
//!
//! Validation accumulates ALL issues through stillwater's `Validation` type,
//! so one submission reports every invalid field.
//!
//! ## Core Types
//!
//! - [`Schema`] / [`SchemaArena`]: build schema trees, including recursive ones
//! - [`Value`]: raw submissions and typed outputs
//! - [`FormData`]: the submitted fields
//! - [`Issue`] / [`Issues`]: validation failures with their [`FieldPath`]
//! - [`Submission`]: the outcome of [`parse`]
//!
//! ## Example
//!
//! ```rust
//! use formcast::{parse, FormData, ParseConfig, Schema, SchemaArena};
//! use serde_json::json;
//!
//! let mut arena = SchemaArena::new();
//! let name = arena.add(Schema::string());
//! let subscribe = arena.add(Schema::boolean());
//! let subscribe = arena.add(Schema::optional_with_default(subscribe, false));
//! let tag = arena.add(Schema::string());
//! let tags = arena.add(Schema::array(tag));
//! let signup = arena.add(Schema::object([
//!     ("name", name),
//!     ("subscribe", subscribe),
//!     ("tags", tags),
//! ]));
//!
//! let form: FormData = [("name", "Ada"), ("subscribe", "on"), ("tags", "rust")]
//!     .into_iter()
//!     .collect();
//! let submission = parse(&arena, &form, &ParseConfig::new(signup)).unwrap();
//!
//! assert_eq!(
//!     submission.value().unwrap().to_json(),
//!     json!({ "name": "Ada", "subscribe": true, "tags": ["rust"] })
//! );
//! ```

pub mod coercion;
pub mod constraint;
pub mod error;
pub mod form;
pub mod parse;
pub mod path;
pub mod schema;
pub mod validate;
pub mod value;

pub use coercion::{enable_type_coercion, Normalizer, TypeCoercion};
pub use constraint::{constraints_to_json, get_constraints, Constraint, ConstraintError};
pub use error::{Issue, Issues};
pub use form::{FormData, FormEntry, INTENT, MAX_INDEX_GAP};
pub use parse::{
    error_map, parse, parse_async, ErrorMap, ParseConfig, ParseError, SchemaSource, Submission,
    SubmissionResult,
};
pub use path::{FieldPath, PathSegment};
pub use schema::{
    Action, DefaultValue, Literal, Schema, SchemaArena, SchemaId, SchemaKind, SchemaNode,
    SchemaOverlay, SchemaStore, SchemaStoreMut, Wrapper,
};
pub use validate::{ValidationConfig, Validator};
pub use value::{FileBlob, Value};

/// Type alias for validation results using Issues
pub type ValidationResult<T> = stillwater::Validation<T, Issues>;
