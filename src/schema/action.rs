//! Pipeline actions attached to schema nodes.
//!
//! A node's pipeline runs after its base type check succeeded, in insertion
//! order. Validation actions (`MinLength`, `Check`, ...) report issues;
//! `Transform` rewrites the value for the actions and parents that follow.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use regex::Regex;

use crate::value::Value;

/// A boxed, sendable future, as returned by asynchronous checks.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Predicate used by [`Action::Check`].
pub type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Predicate used by [`Action::CheckAsync`].
pub type AsyncCheckFn = Arc<dyn Fn(Value) -> BoxFuture<bool> + Send + Sync>;

/// Value rewrite used by [`Action::Transform`].
pub type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// A single pipeline step.
#[derive(Clone)]
pub enum Action {
    /// String or array length must be at least `requirement`.
    MinLength {
        requirement: usize,
        message: Option<String>,
    },
    /// String or array length must be at most `requirement`.
    MaxLength {
        requirement: usize,
        message: Option<String>,
    },
    /// Number, bigint or date must be `>=` the requirement.
    MinValue {
        requirement: Value,
        message: Option<String>,
    },
    /// Number, bigint or date must be `<=` the requirement.
    MaxValue {
        requirement: Value,
        message: Option<String>,
    },
    /// Number must be a multiple of `requirement`.
    MultipleOf {
        requirement: f64,
        message: Option<String>,
    },
    /// String must match the expression.
    Regex {
        regex: Regex,
        message: Option<String>,
    },
    /// File or blob must have one of the listed MIME types.
    MimeType {
        requirement: Vec<String>,
        message: Option<String>,
    },
    /// Arbitrary synchronous predicate.
    Check {
        check: CheckFn,
        message: Option<String>,
    },
    /// Arbitrary asynchronous predicate. Makes the owning schema asynchronous.
    CheckAsync {
        check: AsyncCheckFn,
        message: Option<String>,
    },
    /// Rewrites the value.
    Transform { transform: TransformFn },
}

impl Action {
    /// The action's type name, which is also the code of the issues it reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::MinLength { .. } => "min_length",
            Action::MaxLength { .. } => "max_length",
            Action::MinValue { .. } => "min_value",
            Action::MaxValue { .. } => "max_value",
            Action::MultipleOf { .. } => "multiple_of",
            Action::Regex { .. } => "regex",
            Action::MimeType { .. } => "mime_type",
            Action::Check { .. } => "check",
            Action::CheckAsync { .. } => "check",
            Action::Transform { .. } => "transform",
        }
    }

    /// Returns true for actions that must be awaited.
    pub fn is_async(&self) -> bool {
        matches!(self, Action::CheckAsync { .. })
    }

    pub(crate) fn set_message(&mut self, text: String) -> bool {
        match self {
            Action::MinLength { message, .. }
            | Action::MaxLength { message, .. }
            | Action::MinValue { message, .. }
            | Action::MaxValue { message, .. }
            | Action::MultipleOf { message, .. }
            | Action::Regex { message, .. }
            | Action::MimeType { message, .. }
            | Action::Check { message, .. }
            | Action::CheckAsync { message, .. } => {
                *message = Some(text);
                true
            }
            Action::Transform { .. } => false,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::MinLength { requirement, .. } | Action::MaxLength { requirement, .. } => {
                write!(f, "{}({})", self.type_name(), requirement)
            }
            Action::MinValue { requirement, .. } | Action::MaxValue { requirement, .. } => {
                write!(f, "{}({})", self.type_name(), requirement.received())
            }
            Action::MultipleOf { requirement, .. } => {
                write!(f, "{}({})", self.type_name(), requirement)
            }
            Action::Regex { regex, .. } => write!(f, "regex(/{}/)", regex.as_str()),
            Action::MimeType { requirement, .. } => write!(f, "mime_type({:?})", requirement),
            Action::Check { .. } => write!(f, "check"),
            Action::CheckAsync { .. } => write!(f, "check_async"),
            Action::Transform { .. } => write!(f, "transform"),
        }
    }
}
