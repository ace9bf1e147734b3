use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::{Row, Value};

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "0x{}", b.iter().map(|b| format!("{b:02x}")).join("")),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::List(items) => write!(f, "[{}]", items.iter().format(", ")),
            Value::Map(entries) => write!(
                f,
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .format(", ")
            ),
            Value::Struct(fields) => write!(
                f,
                "{{{}}}",
                fields
                    .iter()
                    .map(|(n, v)| format!("{n}: {v}"))
                    .format(", ")
            ),
        }
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.fields()
                .iter()
                .map(|(n, v)| format!("{n}: {v}"))
                .format(", ")
        )
    }
}
