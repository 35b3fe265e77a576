//! Validation issue types.
//!
//! This module provides [`Issue`] for a single validation failure and
//! [`Issues`] for accumulating multiple failures.

use std::fmt::{self, Display};

use stillwater::prelude::*;

use crate::path::FieldPath;
use crate::value::Value;

/// A single validation issue with full context.
///
/// `Issue` captures all relevant information about a validation failure:
/// - **path**: Where in the payload the failure occurred
/// - **message**: Human-readable description of the failure
/// - **code**: Machine-readable code naming the failed check (`type`, `min_length`, ...)
/// - **expected**: What was expected instead (optional)
/// - **received**: How the offending value is cited in messages
/// - **input**: The offending value itself
///
/// # Example
///
/// ```rust
/// use formcast::{FieldPath, Issue, Value};
///
/// let issue = Issue::new(FieldPath::from_field("age"), "Invalid type: Expected number but received NaN")
///     .with_code("type")
///     .with_expected("number")
///     .with_input(Value::Number(f64::NAN));
///
/// assert_eq!(issue.code, "type");
/// assert_eq!(issue.received, "NaN");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    /// The path to the value that failed validation.
    pub path: FieldPath,
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable issue code (e.g., `min_length`).
    pub code: String,
    /// Description of what was expected.
    pub expected: Option<String>,
    /// The offending value as cited in messages.
    pub received: String,
    /// The offending value.
    pub input: Value,
}

impl Issue {
    /// Creates a new issue with the given path and message.
    ///
    /// The code defaults to "validation_error" and the input to `Undefined`.
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            code: "validation_error".to_string(),
            expected: None,
            received: Value::Undefined.received(),
            input: Value::Undefined,
        }
    }

    /// Sets the issue code and returns self for chaining.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the "expected" field and returns self for chaining.
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Overrides how the offending value is cited and returns self for chaining.
    pub fn with_received(mut self, received: impl Into<String>) -> Self {
        self.received = received.into();
        self
    }

    /// Sets the offending value (and its citation) and returns self for chaining.
    pub fn with_input(mut self, input: Value) -> Self {
        self.received = input.received();
        self.input = input;
        self
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path_str = if self.path.is_root() {
            "(root)".to_string()
        } else {
            self.path.to_string()
        };

        write!(f, "{}: {}", path_str, self.message)
    }
}

impl std::error::Error for Issue {}

/// A non-empty collection of validation issues.
///
/// `Issues` wraps a `NonEmptyVec<Issue>` to guarantee that at least one issue
/// is present, which is what a `Validation::Failure` must carry.
///
/// # Combining Issues
///
/// `Issues` implements `Semigroup`, allowing the failures of several
/// validations to be combined while preserving their order:
///
/// ```rust
/// use formcast::{FieldPath, Issue, Issues};
/// use stillwater::prelude::*;
///
/// let first = Issues::single(Issue::new(FieldPath::from_field("name"), "required"));
/// let second = Issues::single(Issue::new(FieldPath::from_field("email"), "invalid format"));
///
/// let combined = first.combine(second);
/// assert_eq!(combined.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Issues(NonEmptyVec<Issue>);

impl Issues {
    /// Creates an `Issues` containing a single issue.
    pub fn single(issue: Issue) -> Self {
        Self(NonEmptyVec::singleton(issue))
    }

    /// Creates an `Issues` from a `Vec`, or `None` if the vec is empty.
    pub fn from_vec(issues: Vec<Issue>) -> Option<Self> {
        NonEmptyVec::from_vec(issues).map(Self)
    }

    /// Returns the number of issues in this collection.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the collection is guaranteed non-empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the contained issues, in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.0.iter()
    }

    /// Returns all issues at the specified path.
    pub fn at_path(&self, path: &FieldPath) -> Vec<&Issue> {
        self.0.iter().filter(|e| &e.path == path).collect()
    }

    /// Returns all issues with the specified code.
    pub fn with_code(&self, code: &str) -> Vec<&Issue> {
        self.0.iter().filter(|e| e.code == code).collect()
    }

    /// Returns the first issue in the collection.
    pub fn first(&self) -> &Issue {
        self.0.head()
    }

    /// Converts this collection into a `Vec<Issue>`.
    pub fn into_vec(self) -> Vec<Issue> {
        self.0.into_vec()
    }
}

impl Semigroup for Issues {
    fn combine(self, other: Self) -> Self {
        Issues(self.0.combine(other.0))
    }
}

impl Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed with {} issue(s):", self.len())?;
        for (i, issue) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for Issues {}

impl IntoIterator for Issues {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}

// Issues cross thread boundaries inside async validation futures
const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Issues>();
    assert_sync::<Issues>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_creation() {
        let issue = Issue::new(FieldPath::from_field("name"), "field is required");

        assert_eq!(issue.path, FieldPath::from_field("name"));
        assert_eq!(issue.message, "field is required");
        assert_eq!(issue.code, "validation_error");
        assert_eq!(issue.received, "undefined");
        assert!(issue.expected.is_none());
    }

    #[test]
    fn test_issue_builder() {
        let issue = Issue::new(FieldPath::from_field("age"), "too small")
            .with_code("min_value")
            .with_input(Value::Number(-5.0))
            .with_expected(">=0");

        assert_eq!(issue.code, "min_value");
        assert_eq!(issue.received, "-5");
        assert_eq!(issue.expected, Some(">=0".to_string()));
    }

    #[test]
    fn test_issue_display_root() {
        let issue = Issue::new(FieldPath::root(), "value is null");
        assert_eq!(issue.to_string(), "(root): value is null");
    }

    #[test]
    fn test_from_empty_vec() {
        assert!(Issues::from_vec(Vec::new()).is_none());
    }

    #[test]
    fn test_issues_at_path_and_code() {
        let path_a = FieldPath::from_field("a");
        let path_b = FieldPath::from_field("b");

        let issues = Issues::single(Issue::new(path_a.clone(), "1").with_code("type"))
            .combine(Issues::single(Issue::new(path_a.clone(), "2").with_code("check")))
            .combine(Issues::single(Issue::new(path_b.clone(), "3").with_code("type")));

        assert_eq!(issues.at_path(&path_a).len(), 2);
        assert_eq!(issues.at_path(&path_b).len(), 1);
        assert_eq!(issues.with_code("type").len(), 2);
        assert_eq!(issues.first().message, "1");
    }

    #[test]
    fn test_combine_preserves_order() {
        let e1 = Issues::single(Issue::new(FieldPath::root(), "1"));
        let e2 = Issues::single(Issue::new(FieldPath::root(), "2"));
        let e3 = Issues::single(Issue::new(FieldPath::root(), "3"));

        let left = e1.clone().combine(e2.clone()).combine(e3.clone());
        let right = e1.combine(e2.combine(e3));

        let left_msgs: Vec<_> = left.iter().map(|e| e.message.clone()).collect();
        let right_msgs: Vec<_> = right.iter().map(|e| e.message.clone()).collect();
        assert_eq!(left_msgs, vec!["1", "2", "3"]);
        assert_eq!(left_msgs, right_msgs);
    }

    #[test]
    fn test_issues_display() {
        let issues = Issues::single(Issue::new(FieldPath::from_field("name"), "required"))
            .combine(Issues::single(Issue::new(FieldPath::from_field("email"), "invalid")));
        let display = issues.to_string();

        assert!(display.contains("2 issue(s)"));
        assert!(display.contains("name: required"));
        assert!(display.contains("email: invalid"));
    }
}
