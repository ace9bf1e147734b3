//! Canonical text rendering of schemas.
//!
//! ```text
//! message schema {
//!   required int32 id;
//!   optional binary name (STRING);
//!   optional group tags (LIST) {
//!     repeated group list {
//!       optional int32 element;
//!     }
//!   }
//! }
//! ```

use std::fmt::{Display, Formatter, Result, Write};

use crate::{Column, ColumnKind, GroupShape, PhysicalType, Schema};

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "message schema {{")?;
        for column in self.columns() {
            write_column(f, column, 1)?;
        }
        write!(f, "}}")
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_column(f, self, 0)
    }
}

fn write_column<W: Write>(w: &mut W, column: &Column, depth: usize) -> Result {
    let indent = "  ".repeat(depth);
    match column.kind() {
        ColumnKind::Leaf(leaf) => {
            write!(w, "{indent}{} {}", column.repetition(), leaf.physical())?;
            if leaf.physical() == PhysicalType::FixedLenByteArray {
                write!(w, "({})", leaf.type_length().unwrap_or_default())?;
            }
            write!(w, " {}", column.name())?;
            if let Some(logical) = leaf.logical() {
                write!(w, " ({logical})")?;
            }
            writeln!(w, ";")
        }
        ColumnKind::Group { shape, children } => {
            write!(w, "{indent}{} group {}", column.repetition(), column.name())?;
            match shape {
                GroupShape::Struct => {}
                GroupShape::List => write!(w, " (LIST)")?,
                GroupShape::Map => write!(w, " (MAP)")?,
            }
            writeln!(w, " {{")?;
            for child in children {
                write_column(w, child, depth + 1)?;
            }
            writeln!(w, "{indent}}}")
        }
    }
}
