use std::collections::HashSet;

use strata_error::{StrataResult, strata_bail};

use crate::{Column, ColumnKind, ColumnPath, LeafDescriptor, Levels};

/// The root of a schema tree: an ordered list of top-level columns.
///
/// A schema is immutable once built, and every leaf path in it is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    leaves: Vec<LeafDescriptor>,
}

impl Schema {
    /// Build a schema, checking the structure of every column and rejecting duplicate names and
    /// leaf paths.
    pub fn try_new<I: IntoIterator<Item = Column>>(columns: I) -> StrataResult<Self> {
        let columns: Vec<Column> = columns.into_iter().collect();
        if columns.is_empty() {
            strata_bail!("Schema must have at least one column");
        }
        let mut names = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !names.insert(column.name()) {
                strata_bail!("Duplicate column path \"{}\"", column.name());
            }
            column.validate()?;
        }

        let mut leaves = Vec::new();
        for column in &columns {
            collect_leaves(column, ColumnPath::root(), Levels::ROOT, &mut leaves);
        }

        let mut seen = HashSet::with_capacity(leaves.len());
        for leaf in &leaves {
            if !seen.insert(leaf.path()) {
                strata_bail!("Duplicate column path \"{}\"", leaf.path());
            }
        }

        Ok(Self { columns, leaves })
    }

    /// Top-level columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// A top-level column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Every leaf, depth-first, with its maximum levels.
    pub fn leaves(&self) -> &[LeafDescriptor] {
        &self.leaves
    }

    /// A leaf by its full path.
    pub fn leaf<P: Into<ColumnPath>>(&self, path: P) -> Option<&LeafDescriptor> {
        let path = path.into();
        self.leaves.iter().find(|leaf| leaf.path() == &path)
    }

    /// Leaves whose paths start with `prefix`.
    pub fn leaves_under<'a>(
        &'a self,
        prefix: &'a ColumnPath,
    ) -> impl Iterator<Item = &'a LeafDescriptor> + 'a {
        self.leaves
            .iter()
            .filter(move |leaf| leaf.path().starts_with(prefix))
    }

    /// Any column, leaf or group, by dotted path.
    pub fn get<P: Into<ColumnPath>>(&self, path: P) -> Option<&Column> {
        let path = path.into();
        let (first, rest) = path.parts().split_first()?;
        let mut column = self.column(first)?;
        for name in rest {
            column = column.child(name)?;
        }
        Some(column)
    }

    /// Whether a column exists at the given dotted path.
    pub fn has<P: Into<ColumnPath>>(&self, path: P) -> bool {
        self.get(path).is_some()
    }

    /// Maximum definition and repetition levels of the column at `path`.
    pub fn levels<P: Into<ColumnPath>>(&self, path: P) -> Option<Levels> {
        let path = path.into();
        let (first, rest) = path.parts().split_first()?;
        let mut column = self.column(first)?;
        let mut levels = Levels::ROOT.child(column.repetition());
        for name in rest {
            column = column.child(name)?;
            levels = levels.child(column.repetition());
        }
        Some(levels)
    }

    /// Canonical textual rendering, equal for structurally equal schemas.
    pub fn ddl(&self) -> String {
        self.to_string()
    }
}

fn collect_leaves(
    column: &Column,
    parent_path: ColumnPath,
    parent_levels: Levels,
    leaves: &mut Vec<LeafDescriptor>,
) {
    let path = parent_path.child(column.name());
    let levels = parent_levels.child(column.repetition());
    match column.kind() {
        ColumnKind::Leaf(leaf_type) => {
            leaves.push(LeafDescriptor::new(
                leaves.len(),
                path,
                *leaf_type,
                column.repetition(),
                levels,
            ));
        }
        ColumnKind::Group { children, .. } => {
            for child in children {
                collect_leaves(child, path.clone(), levels, leaves);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn nested() -> Schema {
        Schema::try_new([
            Column::int32("id").required(),
            Column::string("name"),
            Column::list("tags", Column::string("element")),
            Column::map(
                "attrs",
                Column::string("key"),
                Column::struct_("value", [Column::int64("a"), Column::list("b", Column::int32("e"))]),
            ),
        ])
        .unwrap()
    }

    #[rstest]
    #[case("id", 0, 0)]
    #[case("name", 1, 0)]
    #[case("tags.list.element", 3, 1)]
    #[case("attrs.key_value.key", 2, 1)]
    #[case("attrs.key_value.value.a", 4, 1)]
    #[case("attrs.key_value.value.b.list.element", 6, 2)]
    fn leaf_levels(#[case] path: &str, #[case] max_def: u16, #[case] max_rep: u16) {
        let schema = nested();
        let leaf = schema.leaf(path).unwrap();
        assert_eq!(leaf.max_def(), max_def, "max def of {path}");
        assert_eq!(leaf.max_rep(), max_rep, "max rep of {path}");
    }

    #[test]
    fn leaves_are_depth_first() {
        let schema = nested();
        let paths: Vec<String> = schema.leaves().iter().map(|l| l.path().to_string()).collect();
        assert_eq!(
            paths,
            [
                "id",
                "name",
                "tags.list.element",
                "attrs.key_value.key",
                "attrs.key_value.value.a",
                "attrs.key_value.value.b.list.element",
            ]
        );
        for (idx, leaf) in schema.leaves().iter().enumerate() {
            assert_eq!(leaf.index(), idx);
        }
    }

    #[test]
    fn lookup_by_path() {
        let schema = nested();
        assert!(schema.has("attrs.key_value.value"));
        assert!(!schema.has("attrs.value"));
        assert_eq!(schema.get("tags.list").unwrap().name(), "list");
        assert_eq!(
            schema.levels("attrs.key_value"),
            Some(Levels { def: 2, rep: 1 })
        );
        let prefix = ColumnPath::from("attrs");
        assert_eq!(schema.leaves_under(&prefix).count(), 3);
    }

    #[test]
    fn rejects_duplicate_paths() {
        let err = Schema::try_new([Column::int32("a"), Column::string("a")]).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate column path \"a\"");
    }

    #[test]
    fn rejects_duplicate_groups() {
        let err = Schema::try_new([
            Column::struct_("s", [Column::int32("a")]),
            Column::struct_("s", [Column::int32("b")]),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate column path \"s\"");

        let err = Schema::try_new([Column::struct_(
            "outer",
            [
                Column::struct_("inner", [Column::int32("a")]),
                Column::struct_("inner", [Column::int64("b")]),
            ],
        )])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate child \"inner\""), "{err}");
    }

    #[test]
    fn rejects_empty_and_dotted() {
        assert!(Schema::try_new([]).is_err());
        assert!(Schema::try_new([Column::int32("a.b")]).is_err());
        assert!(Schema::try_new([Column::struct_("s", [])]).is_err());
    }

    #[test]
    fn structural_equality() {
        assert_eq!(nested(), nested());
        let other = Schema::try_new([Column::int32("id")]).unwrap();
        assert_ne!(nested(), other);
    }
}
