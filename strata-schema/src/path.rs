//! Dotted paths that address columns in a (possibly nested) schema.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

/// A path from the schema root to a column, one name per nesting level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnPath(Vec<String>);

impl ColumnPath {
    /// The empty path, addressing the schema root.
    pub fn root() -> Self {
        Self(vec![])
    }

    /// The names that make up this path.
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Whether this path addresses the root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a name to the end of this path.
    pub fn push<S: Into<String>>(&mut self, name: S) {
        self.0.push(name.into());
    }

    /// A new path one level below this one.
    pub fn child<S: Into<String>>(&self, name: S) -> Self {
        let mut path = self.clone();
        path.push(name);
        path
    }

    /// Whether `prefix` addresses this column or one of its ancestors.
    pub fn starts_with(&self, prefix: &ColumnPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<&str> for ColumnPath {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            return Self::root();
        }
        Self(value.split('.').map(String::from).collect())
    }
}

impl From<String> for ColumnPath {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&ColumnPath> for ColumnPath {
    fn from(value: &ColumnPath) -> Self {
        value.clone()
    }
}

impl From<Vec<String>> for ColumnPath {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl<S: Into<String>> FromIterator<S> for ColumnPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Display for ColumnPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0.iter().format("."), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_path() {
        let mut path = ColumnPath::from("a");
        path.push("b");
        let path = path.child("c");
        assert_eq!(path.to_string(), "a.b.c");
        assert_eq!(path, ColumnPath::from("a.b.c"));
        assert_eq!(path.parts(), &["a", "b", "c"]);

        assert!(path.starts_with(&ColumnPath::from("a.b")));
        assert!(path.starts_with(&ColumnPath::root()));
        assert!(!path.starts_with(&ColumnPath::from("a.c")));
        assert!(ColumnPath::from("").is_root());
    }
}
