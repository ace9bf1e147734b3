use std::ops::Range;

use strata_error::{StrataResult, strata_bail, strata_err};
use strata_scalar::{Row, Value};
use strata_schema::{Column, ColumnKind, GroupShape, Levels, Repetition, Schema};

use crate::{ColumnCursor, Projection, ShreddedColumn, TripleSource};

/// Rebuilds rows from per-leaf triple streams.
///
/// The assembler walks a plan of the projected part of the schema. Each node peeks at the
/// first projected leaf beneath it to decide whether it is present, how many entries a repeated
/// node has and where the row ends. Leaves that are not projected have no source at all.
pub struct Assembler<S> {
    plan: Vec<(String, Node)>,
    sources: Vec<S>,
    failed: bool,
}

#[derive(Debug)]
struct Node {
    repetition: Repetition,
    levels: Levels,
    /// Source slots of the projected leaves below this node.
    slots: Range<usize>,
    kind: NodeKind,
}

#[derive(Debug)]
enum NodeKind {
    Leaf,
    Struct(Vec<(String, Node)>),
    List {
        entry: Levels,
        element: Box<Node>,
    },
    Map {
        entry: Levels,
        key: Box<Node>,
        value: Box<Node>,
    },
}

impl<S: TripleSource> Assembler<S> {
    /// Create an assembler reading `sources`, one per projected leaf in schema order.
    pub fn try_new(schema: &Schema, projection: &Projection, sources: Vec<S>) -> StrataResult<Self> {
        if sources.len() != projection.leaves().len() {
            strata_bail!(
                "Projection selects {} leaves but {} sources were given",
                projection.leaves().len(),
                sources.len()
            );
        }
        let mut plan = Vec::new();
        let mut first_leaf = 0;
        let mut next_slot = 0;
        for column in schema.columns() {
            if let Some(node) = plan_node(column, Levels::ROOT, first_leaf, projection, &mut next_slot)? {
                plan.push((column.name().to_string(), node));
            }
            first_leaf += column.num_leaves();
        }
        Ok(Self {
            plan,
            sources,
            failed: false,
        })
    }

    /// Assemble the next row, or `None` once the sources are exhausted.
    pub fn next_row(&mut self) -> StrataResult<Option<Row>> {
        let Some((_, first)) = self.plan.first() else {
            return Ok(None);
        };
        match self.sources[first.slots.start].peek()? {
            None => return Ok(None),
            Some((_, 0)) => {}
            Some((_, rep)) => strata_bail!(
                Corrupted: "Row starts at repetition level {} instead of 0",
                rep
            ),
        }
        let mut row = Row::with_capacity(self.plan.len());
        for (name, node) in &self.plan {
            row.push(name.as_str(), read_node(node, &mut self.sources)?);
        }
        Ok(Some(row))
    }

    /// Give back the sources, e.g. to check that they are exhausted.
    pub fn into_sources(self) -> Vec<S> {
        self.sources
    }
}

impl Assembler<ColumnCursor> {
    /// Assemble rows from in-memory shredded columns, one per schema leaf.
    pub fn from_columns(
        schema: &Schema,
        projection: &Projection,
        mut columns: Vec<ShreddedColumn>,
    ) -> StrataResult<Self> {
        if columns.len() != schema.leaves().len() {
            strata_bail!(
                "Expected {} shredded columns, got {}",
                schema.leaves().len(),
                columns.len()
            );
        }
        let sources = projection
            .leaves()
            .iter()
            .map(|&leaf| ColumnCursor::new(columns[leaf].take(), schema.leaves()[leaf].max_def()))
            .collect();
        Self::try_new(schema, projection, sources)
    }
}

impl<S: TripleSource> Iterator for Assembler<S> {
    type Item = StrataResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_row().transpose();
        self.failed = matches!(next, Some(Err(_)));
        next
    }
}

/// Assemble every row of in-memory shredded columns.
pub fn assemble_rows(
    schema: &Schema,
    projection: &Projection,
    columns: Vec<ShreddedColumn>,
) -> StrataResult<Vec<Row>> {
    Assembler::from_columns(schema, projection, columns)?.collect()
}

fn plan_node(
    column: &Column,
    parent: Levels,
    first_leaf: usize,
    projection: &Projection,
    next_slot: &mut usize,
) -> StrataResult<Option<Node>> {
    if !projection.contains_any(first_leaf, column.num_leaves()) {
        return Ok(None);
    }
    let levels = parent.child(column.repetition());
    let start = *next_slot;
    let kind = match column.kind() {
        ColumnKind::Leaf(_) => {
            *next_slot += 1;
            NodeKind::Leaf
        }
        ColumnKind::Group {
            shape: GroupShape::Struct,
            children,
        } => {
            let mut fields = Vec::new();
            let mut leaf = first_leaf;
            for child in children {
                if let Some(node) = plan_node(child, levels, leaf, projection, next_slot)? {
                    fields.push((child.name().to_string(), node));
                }
                leaf += child.num_leaves();
            }
            NodeKind::Struct(fields)
        }
        ColumnKind::Group {
            shape: GroupShape::List,
            ..
        } => {
            let entry = levels.child(Repetition::Repeated);
            let element = column
                .list_element()
                .ok_or_else(|| strata_err!("List \"{}\" has no element", column.name()))?;
            let element = plan_node(element, entry, first_leaf, projection, next_slot)?
                .ok_or_else(|| strata_err!("List \"{}\" has no projected element", column.name()))?;
            NodeKind::List {
                entry,
                element: Box::new(element),
            }
        }
        ColumnKind::Group {
            shape: GroupShape::Map,
            ..
        } => {
            let entry = levels.child(Repetition::Repeated);
            let (key, value) = column
                .map_entry()
                .ok_or_else(|| strata_err!("Map \"{}\" has no key and value", column.name()))?;
            let value_leaf = first_leaf + key.num_leaves();
            let (Some(key), Some(value)) = (
                plan_node(key, entry, first_leaf, projection, next_slot)?,
                plan_node(value, entry, value_leaf, projection, next_slot)?,
            ) else {
                strata_bail!(
                    "Map \"{}\" must be projected with both its keys and values",
                    column.name()
                );
            };
            NodeKind::Map {
                entry,
                key: Box::new(key),
                value: Box::new(value),
            }
        }
    };
    Ok(Some(Node {
        repetition: column.repetition(),
        levels,
        slots: start..*next_slot,
        kind,
    }))
}

fn read_node<S: TripleSource>(node: &Node, sources: &mut [S]) -> StrataResult<Value> {
    match node.repetition {
        Repetition::Required => read_present(node, sources),
        Repetition::Optional => {
            if peek_def(node, sources)? < node.levels.def {
                skip(node, sources)?;
                return Ok(Value::Null);
            }
            read_present(node, sources)
        }
        Repetition::Repeated => {
            if peek_def(node, sources)? < node.levels.def {
                skip(node, sources)?;
                return Ok(Value::List(Vec::new()));
            }
            let mut items = vec![read_present(node, sources)?];
            while peek_rep(node, sources)? == Some(node.levels.rep) {
                items.push(read_present(node, sources)?);
            }
            Ok(Value::List(items))
        }
    }
}

/// Read a node known to be defined.
fn read_present<S: TripleSource>(node: &Node, sources: &mut [S]) -> StrataResult<Value> {
    match &node.kind {
        NodeKind::Leaf => sources[node.slots.start]
            .consume()?
            .ok_or_else(|| strata_err!(Corrupted: "Required value is missing")),
        NodeKind::Struct(fields) => fields
            .iter()
            .map(|(name, child)| Ok((name.clone(), read_node(child, sources)?)))
            .collect::<StrataResult<Vec<_>>>()
            .map(Value::Struct),
        NodeKind::List { entry, element } => {
            let mut items = Vec::new();
            if peek_def(node, sources)? < entry.def {
                skip(node, sources)?;
                return Ok(Value::List(items));
            }
            loop {
                items.push(read_node(element, sources)?);
                if peek_rep(node, sources)? != Some(entry.rep) {
                    return Ok(Value::List(items));
                }
            }
        }
        NodeKind::Map { entry, key, value } => {
            let mut entries = Vec::new();
            if peek_def(node, sources)? < entry.def {
                skip(node, sources)?;
                return Ok(Value::Map(entries));
            }
            loop {
                let k = read_node(key, sources)?;
                let v = read_node(value, sources)?;
                entries.push((k, v));
                if peek_rep(node, sources)? != Some(entry.rep) {
                    return Ok(Value::Map(entries));
                }
            }
        }
    }
}

fn peek_def<S: TripleSource>(node: &Node, sources: &mut [S]) -> StrataResult<u16> {
    sources[node.slots.start]
        .peek()?
        .map(|(def, _)| def)
        .ok_or_else(|| strata_err!(Corrupted: "Column ended before the row was complete"))
}

fn peek_rep<S: TripleSource>(node: &Node, sources: &mut [S]) -> StrataResult<Option<u16>> {
    Ok(sources[node.slots.start].peek()?.map(|(_, rep)| rep))
}

/// Consume the single placeholder every leaf below an undefined node carries.
fn skip<S: TripleSource>(node: &Node, sources: &mut [S]) -> StrataResult<()> {
    for source in &mut sources[node.slots.clone()] {
        source.consume()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;
    use strata_scalar::struct_value;

    use super::*;
    use crate::shred_rows;

    fn round_trip(schema: &Schema, rows: &[Row]) -> Vec<Row> {
        let columns = shred_rows(schema, rows).unwrap();
        assemble_rows(schema, &Projection::all(schema), columns).unwrap()
    }

    fn list(items: Vec<Value>) -> Value {
        Value::List(items)
    }

    #[test]
    fn flat_columns() {
        let schema = Schema::try_new([Column::int32("id").required(), Column::string("name")]).unwrap();
        let rows = (0..10i32)
            .map(|i| {
                Row::new()
                    .with("id", i)
                    .with("name", (i % 3 != 0).then(|| format!("n{i}")))
            })
            .collect::<Vec<_>>();
        assert_eq!(round_trip(&schema, &rows), rows);
    }

    #[test]
    fn null_empty_and_null_element_lists() {
        let schema = Schema::try_new([Column::list("tags", Column::string("element"))]).unwrap();
        let rows = vec![
            Row::new().with("tags", Value::Null),
            Row::new().with("tags", list(vec![])),
            Row::new().with("tags", list(vec![Value::from("a"), Value::Null, Value::from("c")])),
            Row::new().with("tags", list(vec![Value::Null])),
        ];
        assert_eq!(round_trip(&schema, &rows), rows);
    }

    #[test]
    fn lists_of_lists() {
        let schema = Schema::try_new([Column::list(
            "m",
            Column::list("element", Column::int32("element")),
        )])
        .unwrap();
        let rows = vec![
            Row::new().with(
                "m",
                list(vec![
                    list(vec![Value::Int32(1), Value::Int32(2)]),
                    list(vec![]),
                    Value::Null,
                    list(vec![Value::Int32(3)]),
                ]),
            ),
            Row::new().with("m", list(vec![])),
            Row::new().with("m", list(vec![list(vec![Value::Null])])),
        ];
        assert_eq!(round_trip(&schema, &rows), rows);
    }

    #[test]
    fn map_of_struct_of_struct() {
        let schema = Schema::try_new([
            Column::int32("id").required(),
            Column::map(
                "m",
                Column::string("key"),
                Column::struct_(
                    "value",
                    [
                        Column::int64("count"),
                        Column::struct_(
                            "inner",
                            [Column::string("label"), Column::list("xs", Column::double("element"))],
                        ),
                    ],
                ),
            ),
        ])
        .unwrap();
        let entry = |count: Option<i64>, label: Option<&str>, xs: Value| {
            struct_value([
                ("count", Value::from(count)),
                (
                    "inner",
                    struct_value([("label", Value::from(label)), ("xs", xs)]),
                ),
            ])
        };
        let rows = vec![
            Row::new().with("id", 1i32).with(
                "m",
                Value::Map(vec![
                    (
                        Value::from("a"),
                        entry(Some(1), Some("x"), list(vec![Value::Double(0.5)])),
                    ),
                    (Value::from("b"), Value::Null),
                    (Value::from("c"), entry(None, None, Value::Null)),
                ]),
            ),
            Row::new().with("id", 2i32).with("m", Value::Map(vec![])),
            Row::new().with("id", 3i32).with("m", Value::Null),
            Row::new().with("id", 4i32).with(
                "m",
                Value::Map(vec![(Value::from("z"), entry(Some(9), Some("q"), list(vec![])))]),
            ),
        ];
        assert_eq!(round_trip(&schema, &rows), rows);
    }

    #[test]
    fn repeated_fields_without_list_wrapper() {
        let schema = Schema::try_new([
            Column::int32("xs").repeated(),
            Column::struct_("s", [Column::string("name").required()]).repeated(),
        ])
        .unwrap();
        let rows = vec![
            Row::new()
                .with("xs", vec![1i32, 2, 3])
                .with("s", list(vec![struct_value([("name", "a")])])),
            Row::new().with("xs", list(vec![])).with("s", list(vec![])),
        ];
        assert_eq!(round_trip(&schema, &rows), rows);
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    #[case(42)]
    fn random_nullable_lists(#[case] seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let schema = Schema::try_new([Column::list("values", Column::int32("element"))]).unwrap();
        let rows = (0..200)
            .map(|_| {
                let value = if rng.random_bool(0.5) {
                    Value::Null
                } else {
                    let len = rng.random_range(2..=10);
                    list((0..len).map(|_| Value::Int32(rng.random())).collect())
                };
                Row::new().with("values", value)
            })
            .collect::<Vec<_>>();
        assert_eq!(round_trip(&schema, &rows), rows);
    }

    #[test]
    fn projection_keeps_only_selected_parts() {
        let schema = Schema::try_new([
            Column::int32("id").required(),
            Column::struct_("s", [Column::int32("a"), Column::string("b")]),
            Column::list(
                "items",
                Column::struct_("element", [Column::int32("x"), Column::int32("y")]),
            ),
        ])
        .unwrap();
        let rows = vec![
            Row::new()
                .with("id", 1i32)
                .with("s", struct_value([("a", Value::Int32(1)), ("b", Value::from("b"))]))
                .with(
                    "items",
                    list(vec![
                        struct_value([("x", Value::Int32(1)), ("y", Value::Int32(2))]),
                        struct_value([("x", Value::Null), ("y", Value::Int32(4))]),
                    ]),
                ),
            Row::new().with("id", 2i32),
        ];
        let columns = shred_rows(&schema, &rows).unwrap();
        let projection = Projection::try_new(&schema, &["s.b", "items.list.element.y"]).unwrap();
        let projected = assemble_rows(&schema, &projection, columns).unwrap();
        assert_eq!(
            projected,
            [
                Row::new()
                    .with("s", struct_value([("b", "b")]))
                    .with(
                        "items",
                        list(vec![
                            struct_value([("y", Value::Int32(2))]),
                            struct_value([("y", Value::Int32(4))]),
                        ]),
                    ),
                Row::new().with("s", Value::Null).with("items", Value::Null),
            ]
        );
    }

    #[test]
    fn truncated_column_is_corrupt() {
        let schema = Schema::try_new([Column::int32("a").required(), Column::int32("b").required()])
            .unwrap();
        let rows = vec![Row::new().with("a", 1i32).with("b", 2i32); 2];
        let mut columns = shred_rows(&schema, &rows).unwrap();
        columns[1].truncate(1, 1);
        let mut assembler =
            Assembler::from_columns(&schema, &Projection::all(&schema), columns).unwrap();
        assert!(assembler.next().unwrap().is_ok());
        assert!(assembler.next().unwrap().is_err());
        assert!(assembler.next().is_none());
    }
}
