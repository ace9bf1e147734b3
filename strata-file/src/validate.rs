use strata_error::{StrataError, StrataResult, strata_bail, strata_err};
use strata_scalar::{Row, Value};
use strata_schema::{
    Column, ColumnKind, GroupShape, LeafType, LogicalType, PhysicalType, Repetition, Schema,
};

/// Check a row against the schema before it is shredded.
///
/// Fails on the first required column that is missing or null (`SchemaViolation`) and on the
/// first value whose type does not match its column (`MismatchedTypes`). Both errors name the
/// full dotted path of the offending column. Fields the schema does not declare are ignored.
pub fn validate_row(schema: &Schema, row: &Row) -> StrataResult<()> {
    let mut validator = Validator { path: Vec::new() };
    for column in schema.columns() {
        validator.column(column, row.get(column.name()))?;
    }
    Ok(())
}

struct Validator<'a> {
    path: Vec<&'a str>,
}

impl<'a> Validator<'a> {
    fn column(&mut self, column: &'a Column, value: Option<&Value>) -> StrataResult<()> {
        self.path.push(column.name());
        let result = self.check(column, value);
        self.path.pop();
        result
    }

    fn check(&mut self, column: &'a Column, value: Option<&Value>) -> StrataResult<()> {
        match (column.repetition(), value.filter(|v| !v.is_null())) {
            (Repetition::Required, None) => {
                strata_bail!(SchemaViolation: "Column \"{}\" is required", self.path())
            }
            (Repetition::Optional | Repetition::Repeated, None) => Ok(()),
            (Repetition::Repeated, Some(Value::List(items))) => {
                for item in items {
                    if item.is_null() {
                        strata_bail!(
                            SchemaViolation: "Column \"{}\" cannot contain null elements",
                            self.path()
                        );
                    }
                    self.present(column, item)?;
                }
                Ok(())
            }
            (Repetition::Repeated, Some(other)) => Err(self.mismatch("list", other)),
            (Repetition::Required | Repetition::Optional, Some(value)) => {
                self.present(column, value)
            }
        }
    }

    fn present(&mut self, column: &'a Column, value: &Value) -> StrataResult<()> {
        let shape = match column.kind() {
            ColumnKind::Leaf(leaf) => return self.leaf(leaf, value),
            ColumnKind::Group { shape, .. } => *shape,
        };
        match (shape, value) {
            (GroupShape::Struct, Value::Struct(_)) => {
                for child in column.children() {
                    self.column(child, value.field(child.name()))?;
                }
                Ok(())
            }
            (GroupShape::List, Value::List(items)) => {
                let (Some(group), Some(element)) = (column.repeated_group(), column.list_element())
                else {
                    strata_bail!("List \"{}\" has no element", self.path());
                };
                self.path.push(group.name());
                let result = items
                    .iter()
                    .try_for_each(|item| self.column(element, Some(item)));
                self.path.pop();
                result
            }
            (GroupShape::Map, Value::Map(entries)) => {
                let (Some(group), Some((key, map_value))) =
                    (column.repeated_group(), column.map_entry())
                else {
                    strata_bail!("Map \"{}\" has no key and value", self.path());
                };
                self.path.push(group.name());
                let result = entries.iter().try_for_each(|(k, v)| {
                    self.column(key, Some(k))?;
                    self.column(map_value, Some(v))
                });
                self.path.pop();
                result
            }
            (GroupShape::Struct, other) => Err(self.mismatch("struct", other)),
            (GroupShape::List, other) => Err(self.mismatch("list", other)),
            (GroupShape::Map, other) => Err(self.mismatch("map", other)),
        }
    }

    fn leaf(&self, leaf: &LeafType, value: &Value) -> StrataResult<()> {
        let matches = match (leaf.physical(), value) {
            (PhysicalType::Boolean, Value::Boolean(_))
            | (PhysicalType::Int32, Value::Int32(_))
            | (PhysicalType::Int64, Value::Int64(_))
            | (PhysicalType::Float, Value::Float(_))
            | (PhysicalType::Double, Value::Double(_)) => true,
            (PhysicalType::ByteArray, Value::String(_)) => leaf.is_utf8(),
            (PhysicalType::ByteArray, Value::Bytes(_)) => !leaf.is_utf8(),
            (PhysicalType::FixedLenByteArray, Value::Decimal(unscaled)) => {
                let Some(LogicalType::Decimal(decimal)) = leaf.logical() else {
                    return Err(self.mismatch(leaf.value_type_name(), value));
                };
                if unscaled.unsigned_abs() >= 10u128.pow(u32::from(decimal.precision())) {
                    strata_bail!(
                        MismatchedTypes: "Column \"{}\" cannot hold {} digits of precision, got {}",
                        self.path(),
                        decimal.precision(),
                        unscaled
                    );
                }
                true
            }
            (PhysicalType::FixedLenByteArray, Value::Bytes(bytes)) => {
                if leaf.is_decimal() {
                    return Err(self.mismatch(leaf.value_type_name(), value));
                }
                let width = leaf.type_length().unwrap_or_default() as usize;
                if bytes.len() != width {
                    strata_bail!(
                        MismatchedTypes: "Column \"{}\" holds {} bytes per value, got {}",
                        self.path(),
                        width,
                        bytes.len()
                    );
                }
                true
            }
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(self.mismatch(leaf.value_type_name(), value))
        }
    }

    fn mismatch(&self, expected: &str, actual: &Value) -> StrataError {
        strata_err!(
            MismatchedTypes: "Column \"{}\" is not {}, got \"{}\" instead",
            self.path(),
            expected,
            actual.type_name()
        )
    }

    fn path(&self) -> String {
        self.path.join(".")
    }
}
