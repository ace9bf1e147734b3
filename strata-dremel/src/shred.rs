use itertools::Itertools;
use log::warn;
use strata_error::{StrataError, StrataResult, strata_bail, strata_err};
use strata_scalar::{Row, Value};
use strata_schema::{
    Column, ColumnKind, GroupShape, LeafDescriptor, LeafType, Levels, Repetition, Schema,
};

use crate::ShreddedColumn;

/// Shred one row into per-leaf triples, appending to `columns` (one per schema leaf).
///
/// Missing top-level fields are treated as null and fields the schema does not know are ignored.
/// If the row cannot be shredded, every column is restored to its previous length.
pub fn shred_row(schema: &Schema, row: &Row, columns: &mut [ShreddedColumn]) -> StrataResult<()> {
    if columns.len() != schema.leaves().len() {
        strata_bail!(
            "Expected {} shredded columns, got {}",
            schema.leaves().len(),
            columns.len()
        );
    }
    for name in row.names() {
        if schema.column(name).is_none() {
            warn!("Ignoring field \"{name}\" which is not in the schema");
        }
    }

    let marks = columns
        .iter()
        .map(|c| (c.len(), c.values().len()))
        .collect::<Vec<_>>();
    let mut shredder = Shredder {
        leaves: schema.leaves(),
        columns,
    };
    let mut first_leaf = 0;
    for column in schema.columns() {
        let value = row.get(column.name());
        if let Err(err) = shredder.shred(column, value, Levels::ROOT, 0, 0, first_leaf) {
            for (column, (len, num_values)) in shredder.columns.iter_mut().zip(marks) {
                column.truncate(len, num_values);
            }
            return Err(err);
        }
        first_leaf += column.num_leaves();
    }
    Ok(())
}

/// Shred a batch of rows into fresh columns.
pub fn shred_rows<'a, I: IntoIterator<Item = &'a Row>>(
    schema: &Schema,
    rows: I,
) -> StrataResult<Vec<ShreddedColumn>> {
    let mut columns = vec![ShreddedColumn::new(); schema.leaves().len()];
    for row in rows {
        shred_row(schema, row, &mut columns)?;
    }
    Ok(columns)
}

struct Shredder<'a> {
    leaves: &'a [LeafDescriptor],
    columns: &'a mut [ShreddedColumn],
}

impl Shredder<'_> {
    /// Shred `value` for `column`, whose parent is defined at `parent` levels.
    ///
    /// `rep` is the repetition level of the first triple, `depth` the column's nesting depth and
    /// `first_leaf` the index of its first leaf.
    fn shred(
        &mut self,
        column: &Column,
        value: Option<&Value>,
        parent: Levels,
        rep: u16,
        depth: usize,
        first_leaf: usize,
    ) -> StrataResult<()> {
        let levels = parent.child(column.repetition());
        let value = value.filter(|v| !v.is_null());
        match (column.repetition(), value) {
            (Repetition::Required, None) => strata_bail!(
                SchemaViolation: "Column \"{}\" is required",
                self.path(first_leaf, depth)
            ),
            (Repetition::Optional, None) => {
                self.placeholder(column, first_leaf, parent.def, rep);
                Ok(())
            }
            (Repetition::Required | Repetition::Optional, Some(value)) => {
                self.shred_present(column, value, levels, rep, depth, first_leaf)
            }
            (Repetition::Repeated, value) => {
                let items = match value {
                    None => &[][..],
                    Some(Value::List(items)) => items.as_slice(),
                    Some(other) => return Err(self.mismatch(first_leaf, depth, "list", other)),
                };
                if items.is_empty() {
                    self.placeholder(column, first_leaf, parent.def, rep);
                }
                for (idx, item) in items.iter().enumerate() {
                    if item.is_null() {
                        strata_bail!(
                            SchemaViolation: "Column \"{}\" cannot contain null elements",
                            self.path(first_leaf, depth)
                        );
                    }
                    let rep = if idx == 0 { rep } else { levels.rep };
                    self.shred_present(column, item, levels, rep, depth, first_leaf)?;
                }
                Ok(())
            }
        }
    }

    /// Shred a non-null value of `column`, which is defined at `levels`.
    fn shred_present(
        &mut self,
        column: &Column,
        value: &Value,
        levels: Levels,
        rep: u16,
        depth: usize,
        first_leaf: usize,
    ) -> StrataResult<()> {
        let (shape, children) = match column.kind() {
            ColumnKind::Leaf(leaf) => {
                self.check_leaf(leaf, value, depth, first_leaf)?;
                self.columns[first_leaf].push_value(levels.def, rep, value.clone());
                return Ok(());
            }
            ColumnKind::Group { shape, children } => (shape, children),
        };
        match shape {
            GroupShape::Struct => {
                if !matches!(value, Value::Struct(_)) {
                    return Err(self.mismatch(first_leaf, depth, "struct", value));
                }
                let mut leaf = first_leaf;
                for child in children {
                    self.shred(child, value.field(child.name()), levels, rep, depth + 1, leaf)?;
                    leaf += child.num_leaves();
                }
                Ok(())
            }
            GroupShape::List => {
                let Value::List(items) = value else {
                    return Err(self.mismatch(first_leaf, depth, "list", value));
                };
                let element = column
                    .list_element()
                    .ok_or_else(|| strata_err!("List \"{}\" has no element", column.name()))?;
                let entry_levels = levels.child(Repetition::Repeated);
                if items.is_empty() {
                    self.placeholder(column, first_leaf, levels.def, rep);
                }
                for (idx, item) in items.iter().enumerate() {
                    let rep = if idx == 0 { rep } else { entry_levels.rep };
                    self.shred(element, Some(item), entry_levels, rep, depth + 2, first_leaf)?;
                }
                Ok(())
            }
            GroupShape::Map => {
                let Value::Map(entries) = value else {
                    return Err(self.mismatch(first_leaf, depth, "map", value));
                };
                let (key, map_value) = column
                    .map_entry()
                    .ok_or_else(|| strata_err!("Map \"{}\" has no key and value", column.name()))?;
                let entry_levels = levels.child(Repetition::Repeated);
                let value_leaf = first_leaf + key.num_leaves();
                if entries.is_empty() {
                    self.placeholder(column, first_leaf, levels.def, rep);
                }
                for (idx, (k, v)) in entries.iter().enumerate() {
                    let rep = if idx == 0 { rep } else { entry_levels.rep };
                    self.shred(key, Some(k), entry_levels, rep, depth + 2, first_leaf)?;
                    self.shred(map_value, Some(v), entry_levels, rep, depth + 2, value_leaf)?;
                }
                Ok(())
            }
        }
    }

    /// Check that `value` is the scalar kind `leaf` stores, with the declared width for
    /// fixed-length bytes.
    fn check_leaf(
        &self,
        leaf: &LeafType,
        value: &Value,
        depth: usize,
        first_leaf: usize,
    ) -> StrataResult<()> {
        let expected = leaf.value_type_name();
        if value.type_name() != expected {
            return Err(self.mismatch(first_leaf, depth, expected, value));
        }
        if let (Some(width), Value::Bytes(bytes)) = (leaf.type_length(), value) {
            if bytes.len() != width as usize {
                strata_bail!(
                    MismatchedTypes: "Column \"{}\" holds {} bytes per value, got {}",
                    self.path(first_leaf, depth),
                    width,
                    bytes.len()
                );
            }
        }
        Ok(())
    }

    /// One entry per leaf under `column`, marking it missing at definition level `def`.
    fn placeholder(&mut self, column: &Column, first_leaf: usize, def: u16, rep: u16) {
        for leaf in &mut self.columns[first_leaf..first_leaf + column.num_leaves()] {
            leaf.push_placeholder(def, rep);
        }
    }

    /// The dotted path of the column at `depth` whose first leaf is `first_leaf`.
    fn path(&self, first_leaf: usize, depth: usize) -> String {
        let parts = self.leaves[first_leaf].path().parts();
        parts[..(depth + 1).min(parts.len())].iter().join(".")
    }

    fn mismatch(
        &self,
        first_leaf: usize,
        depth: usize,
        expected: &str,
        actual: &Value,
    ) -> StrataError {
        strata_err!(
            MismatchedTypes: "Column \"{}\" is not {}, got \"{}\" instead",
            self.path(first_leaf, depth),
            expected,
            actual.type_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use strata_scalar::struct_value;

    use super::*;

    fn levels_of(column: &ShreddedColumn) -> Vec<(u16, u16)> {
        column
            .def_levels()
            .iter()
            .copied()
            .zip(column.rep_levels().iter().copied())
            .collect()
    }

    #[test]
    fn null_and_empty_lists_differ() {
        let schema = Schema::try_new([Column::list("tags", Column::int32("element"))]).unwrap();
        let rows = [
            Row::new().with("tags", Value::Null),
            Row::new().with("tags", Value::List(vec![])),
            Row::new().with("tags", vec![Value::Int32(1), Value::Null, Value::Int32(3)]),
        ];
        let columns = shred_rows(&schema, &rows).unwrap();
        assert_eq!(
            levels_of(&columns[0]),
            [(0, 0), (1, 0), (3, 0), (2, 1), (3, 1)]
        );
        assert_eq!(columns[0].values(), [Value::Int32(1), Value::Int32(3)]);
    }

    #[test]
    fn nested_lists_use_the_deepest_repetition_level() {
        let schema = Schema::try_new([Column::list(
            "m",
            Column::list("element", Column::int32("element").required()),
        )])
        .unwrap();
        let row = Row::new().with(
            "m",
            Value::List(vec![
                Value::List(vec![Value::Int32(1), Value::Int32(2)]),
                Value::List(vec![]),
                Value::List(vec![Value::Int32(3)]),
            ]),
        );
        let columns = shred_rows(&schema, [&row]).unwrap();
        assert_eq!(levels_of(&columns[0]), [(4, 0), (4, 2), (3, 1), (4, 1)]);
    }

    #[test]
    fn struct_fields_follow_schema_order() {
        let schema = Schema::try_new([Column::struct_(
            "s",
            [Column::int32("a").required(), Column::string("b")],
        )])
        .unwrap();
        let row = Row::new().with("s", struct_value([("b", Value::from("x")), ("a", Value::Int32(4))]));
        let columns = shred_rows(&schema, [&row]).unwrap();
        assert_eq!(levels_of(&columns[0]), [(1, 0)]);
        assert_eq!(columns[0].values(), [Value::Int32(4)]);
        assert_eq!(levels_of(&columns[1]), [(2, 0)]);

        let missing = Row::new().with("s", struct_value([("a", Value::Int32(5))]));
        let columns = shred_rows(&schema, [&missing]).unwrap();
        assert_eq!(levels_of(&columns[1]), [(1, 0)]);
    }

    #[test]
    fn maps_shred_keys_and_values_together() {
        let schema = Schema::try_new([Column::map(
            "attrs",
            Column::string("key"),
            Column::int64("value"),
        )])
        .unwrap();
        let row = Row::new().with(
            "attrs",
            Value::Map(vec![
                (Value::from("a"), Value::Int64(1)),
                (Value::from("b"), Value::Null),
            ]),
        );
        let columns = shred_rows(&schema, [&row]).unwrap();
        assert_eq!(levels_of(&columns[0]), [(2, 0), (2, 1)]);
        assert_eq!(levels_of(&columns[1]), [(3, 0), (2, 1)]);
    }

    #[test]
    fn required_violation_names_the_path() {
        let schema = Schema::try_new([Column::struct_(
            "s",
            [Column::struct_("inner", [Column::int32("id").required()]).required()],
        )])
        .unwrap();
        let row = Row::new().with("s", struct_value([("inner", struct_value([("id", Value::Null)]))]));
        let mut columns = vec![ShreddedColumn::new(); 1];
        let err = shred_row(&schema, &row, &mut columns).unwrap_err();
        assert!(matches!(err, StrataError::SchemaViolation(..)));
        assert_eq!(err.to_string(), "Column \"s.inner.id\" is required");
        assert!(columns[0].is_empty());
    }

    #[test]
    fn failed_row_leaves_columns_untouched() {
        let schema = Schema::try_new([Column::int32("a"), Column::list("b", Column::int32("element"))])
            .unwrap();
        let mut columns = vec![ShreddedColumn::new(); 2];
        shred_row(&schema, &Row::new().with("a", 1i32), &mut columns).unwrap();
        let err = shred_row(
            &schema,
            &Row::new().with("a", 2i32).with("b", Value::Int32(3)),
            &mut columns,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Column \"b\" is not list, got \"integer\" instead");
        assert_eq!(columns[0].len(), 1);
        assert_eq!(columns[1].len(), 1);
    }

    #[test]
    fn leaf_values_must_match_the_column_type() {
        let schema = Schema::try_new([Column::int32("a"), Column::fixed_len_bytes("hash", 32)])
            .unwrap();
        let mut columns = vec![ShreddedColumn::new(); 2];
        shred_row(&schema, &Row::new().with("a", 1i32), &mut columns).unwrap();

        let err = shred_row(
            &schema,
            &Row::new().with("a", 2i32).with("hash", Value::Decimal(1)),
            &mut columns,
        )
        .unwrap_err();
        assert!(matches!(err, StrataError::MismatchedTypes(..)));
        assert_eq!(err.to_string(), "Column \"hash\" is not bytes, got \"decimal\" instead");

        let err = shred_row(
            &schema,
            &Row::new().with("hash", Value::Bytes(vec![0; 3].into())),
            &mut columns,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Column \"hash\" holds 32 bytes per value, got 3");
        assert_eq!(columns[0].len(), 1);
        assert_eq!(columns[1].len(), 1);
    }
}
