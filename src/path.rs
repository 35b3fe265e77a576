//! Field path representation for form fields and validation issues.
//!
//! This module provides [`FieldPath`] and [`PathSegment`] types for building,
//! parsing and rendering the dotted/bracketed names used by HTML form fields
//! (`user.email`, `tags[0]`, `items[].name`).

use std::fmt::{self, Display};

/// A segment of a field path.
///
/// Paths are built from segments that represent field access, array indexing,
/// or the "any index" placeholder used by form names and constraint records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A field/property access (e.g., `user`, `email`)
    Field(String),
    /// An array index access (e.g., `[0]`, `[42]`)
    Index(usize),
    /// Any index of an array, rendered as `[]`.
    ///
    /// In a form field name this appends a new item; in a constraint record
    /// it stands for every item of the list.
    Template,
}

impl PathSegment {
    /// Creates a new field segment.
    pub fn field(name: impl Into<String>) -> Self {
        PathSegment::Field(name.into())
    }

    /// Creates a new index segment.
    pub fn index(idx: usize) -> Self {
        PathSegment::Index(idx)
    }
}

/// A path to a field in a nested form payload.
///
/// `FieldPath` represents locations like `users[0].email` and provides
/// methods for building paths incrementally or parsing them from a form
/// field name.
///
/// # Example
///
/// ```rust
/// use formcast::FieldPath;
///
/// let path = FieldPath::root()
///     .push_field("users")
///     .push_index(0)
///     .push_field("email");
///
/// assert_eq!(path.to_string(), "users[0].email");
/// assert_eq!(FieldPath::parse("users[0].email"), path);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Creates an empty path representing the root value.
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from a single field segment.
    pub fn from_field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Parses a form field name such as `items[].tags[2].label`.
    ///
    /// Bracket contents that are digits become [`PathSegment::Index`], empty
    /// brackets become [`PathSegment::Template`], anything else is treated as
    /// a field name. Empty names between dots are skipped.
    pub fn parse(name: &str) -> Self {
        let mut segments = Vec::new();
        let mut buffer = String::new();
        let mut chars = name.chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => flush_field(&mut buffer, &mut segments),
                '[' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        // Unterminated bracket: keep the text as part of a name
                        buffer.push('[');
                        buffer.push_str(&inner);
                        continue;
                    }
                    flush_field(&mut buffer, &mut segments);
                    segments.push(bracket_segment(inner));
                }
                _ => buffer.push(c),
            }
        }
        flush_field(&mut buffer, &mut segments);

        Self { segments }
    }

    /// Returns a new path with a field segment appended.
    ///
    /// This method does not modify the original path; it returns a new one.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        self.push(PathSegment::Field(name.into()))
    }

    /// Returns a new path with an index segment appended.
    ///
    /// This method does not modify the original path; it returns a new one.
    pub fn push_index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    /// Returns a new path with a `[]` segment appended.
    pub fn push_template(&self) -> Self {
        self.push(PathSegment::Template)
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Returns true if this is the root path (no segments).
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in this path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns an iterator over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// Returns the segments as a slice.
    pub fn as_slice(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the parent path (all segments except the last), or None if this is root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Returns the last segment, or None if this is root.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }
}

fn flush_field(buffer: &mut String, segments: &mut Vec<PathSegment>) {
    if !buffer.is_empty() {
        segments.push(PathSegment::Field(std::mem::take(buffer)));
    }
}

fn bracket_segment(inner: String) -> PathSegment {
    if inner.is_empty() {
        return PathSegment::Template;
    }
    if inner.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = inner.parse() {
            return PathSegment::Index(index);
        }
    }
    PathSegment::Field(inner)
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
                PathSegment::Template => write!(f, "[]")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for FieldPath {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path_is_empty() {
        let path = FieldPath::root();
        assert!(path.is_root());
        assert!(path.is_empty());
        assert_eq!(path.len(), 0);
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn test_field_with_index() {
        let path = FieldPath::root().push_field("users").push_index(0);
        assert_eq!(path.to_string(), "users[0]");
    }

    #[test]
    fn test_template_segment() {
        let path = FieldPath::root()
            .push_field("list")
            .push_template()
            .push_field("key");
        assert_eq!(path.to_string(), "list[].key");
    }

    #[test]
    fn test_leading_index() {
        let path = FieldPath::root().push_index(3).push_field("name");
        assert_eq!(path.to_string(), "[3].name");
    }

    #[test]
    fn test_parse_nested_name() {
        let path = FieldPath::parse("body.data[42].items[].name");
        let segments: Vec<_> = path.segments().cloned().collect();
        assert_eq!(
            segments,
            vec![
                PathSegment::field("body"),
                PathSegment::field("data"),
                PathSegment::index(42),
                PathSegment::field("items"),
                PathSegment::Template,
                PathSegment::field("name"),
            ]
        );
        assert_eq!(path.to_string(), "body.data[42].items[].name");
    }

    #[test]
    fn test_parse_non_numeric_bracket_is_field() {
        let path = FieldPath::parse("meta[lang]");
        assert_eq!(
            path.as_slice(),
            &[PathSegment::field("meta"), PathSegment::field("lang")]
        );
    }

    #[test]
    fn test_parse_unterminated_bracket() {
        let path = FieldPath::parse("weird[name");
        assert_eq!(path.as_slice(), &[PathSegment::field("weird[name")]);

        let nested = FieldPath::parse("user.tag[x");
        assert_eq!(
            nested.as_slice(),
            &[PathSegment::field("user"), PathSegment::field("tag[x")]
        );
    }

    #[test]
    fn test_parse_skips_empty_dots() {
        let path = FieldPath::parse("a..b");
        assert_eq!(path.to_string(), "a.b");
        assert!(FieldPath::parse("").is_root());
    }

    #[test]
    fn test_path_immutability() {
        let base = FieldPath::root().push_field("users");
        let path_a = base.push_index(0);
        let path_b = base.push_index(1);

        assert_eq!(base.to_string(), "users");
        assert_eq!(path_a.to_string(), "users[0]");
        assert_eq!(path_b.to_string(), "users[1]");
    }

    #[test]
    fn test_parent_path() {
        let path = FieldPath::parse("users[0].email");

        let parent = path.parent().unwrap();
        assert_eq!(parent.to_string(), "users[0]");

        let root = parent.parent().unwrap().parent().unwrap();
        assert!(root.is_root());
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_last_segment() {
        let path = FieldPath::root().push_field("users").push_index(0);
        assert_eq!(path.last(), Some(&PathSegment::Index(0)));
        assert_eq!(FieldPath::root().last(), None);
    }
}
