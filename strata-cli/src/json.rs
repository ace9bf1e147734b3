use serde_json::{Map, Value as Json};
use strata::scalar::{Row, Value};
use strata::schema::{Column, LogicalType, Repetition, Schema};

/// Render a row as a JSON object, using the schema to scale decimals.
pub fn row_to_json(schema: &Schema, row: &Row) -> Json {
    Json::Object(
        row.fields()
            .iter()
            .map(|(name, value)| (name.clone(), to_json(value, schema.column(name))))
            .collect(),
    )
}

fn to_json(value: &Value, column: Option<&Column>) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) => Json::from(*v),
        Value::Float(v) => Json::from(*v),
        Value::Double(v) => Json::from(*v),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(_) => Json::String(value.to_string()),
        Value::Decimal(unscaled) => Json::String(decimal_string(*unscaled, scale(column))),
        Value::List(items) => {
            let element = column.and_then(element);
            Json::Array(items.iter().map(|item| to_json(item, element)).collect())
        }
        Value::Map(entries) => {
            let value_column = column.and_then(Column::map_entry).map(|(_, value)| value);
            Json::Object(
                entries
                    .iter()
                    .map(|(key, value)| {
                        let key = key.as_str().map_or_else(|| key.to_string(), str::to_string);
                        (key, to_json(value, value_column))
                    })
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Struct(fields) => Json::Object(
            fields
                .iter()
                .map(|(name, value)| {
                    (name.clone(), to_json(value, column.and_then(|c| c.child(name))))
                })
                .collect(),
        ),
    }
}

/// The column describing the items of a list value: the element of a list group, or the column
/// itself when it is a bare repeated field.
fn element(column: &Column) -> Option<&Column> {
    match column.list_element() {
        Some(element) => Some(element),
        None => (column.repetition() == Repetition::Repeated).then_some(column),
    }
}

fn scale(column: Option<&Column>) -> u8 {
    match column.and_then(Column::leaf_type).and_then(|leaf| leaf.logical()) {
        Some(LogicalType::Decimal(decimal)) => decimal.scale(),
        _ => 0,
    }
}

fn decimal_string(unscaled: i128, scale: u8) -> String {
    let scale = usize::from(scale);
    if scale == 0 {
        return unscaled.to_string();
    }
    let digits = format!("{:0>width$}", unscaled.unsigned_abs(), width = scale + 1);
    let (int, frac) = digits.split_at(digits.len() - scale);
    let sign = if unscaled < 0 { "-" } else { "" };
    format!("{sign}{int}.{frac}")
}
