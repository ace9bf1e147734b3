use std::mem;

use strata_error::{StrataResult, strata_bail};
use strata_scalar::Value;

/// The triples of one leaf column.
///
/// Levels are stored per entry; values only for entries defined at the leaf, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShreddedColumn {
    def_levels: Vec<u16>,
    rep_levels: Vec<u16>,
    values: Vec<Value>,
}

impl ShreddedColumn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a defined value.
    pub fn push_value(&mut self, def: u16, rep: u16, value: Value) {
        self.def_levels.push(def);
        self.rep_levels.push(rep);
        self.values.push(value);
    }

    /// Append an entry for a missing or empty ancestor.
    pub fn push_placeholder(&mut self, def: u16, rep: u16) {
        self.def_levels.push(def);
        self.rep_levels.push(rep);
    }

    /// Number of level entries.
    pub fn len(&self) -> usize {
        self.def_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.def_levels.is_empty()
    }

    pub fn def_levels(&self) -> &[u16] {
        &self.def_levels
    }

    pub fn rep_levels(&self) -> &[u16] {
        &self.rep_levels
    }

    /// The defined values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of entries that start a new row.
    pub fn num_rows(&self) -> usize {
        self.rep_levels.iter().filter(|&&rep| rep == 0).count()
    }

    /// Drop entries past `len` and values past `num_values`.
    pub fn truncate(&mut self, len: usize, num_values: usize) {
        self.def_levels.truncate(len);
        self.rep_levels.truncate(len);
        self.values.truncate(num_values);
    }

    /// Move the contents out, leaving an empty column behind.
    pub fn take(&mut self) -> ShreddedColumn {
        mem::take(self)
    }

    pub fn into_parts(self) -> (Vec<u16>, Vec<u16>, Vec<Value>) {
        (self.def_levels, self.rep_levels, self.values)
    }

    /// Rebuild a column from decoded parts. `values` must hold one value per entry whose
    /// definition level equals `max_def`.
    pub fn try_from_parts(
        def_levels: Vec<u16>,
        rep_levels: Vec<u16>,
        values: Vec<Value>,
        max_def: u16,
    ) -> StrataResult<Self> {
        if def_levels.len() != rep_levels.len() {
            strata_bail!(
                Corrupted: "Column has {} definition levels but {} repetition levels",
                def_levels.len(),
                rep_levels.len()
            );
        }
        let defined = def_levels.iter().filter(|&&def| def == max_def).count();
        if defined != values.len() {
            strata_bail!(
                Corrupted: "Column has {} defined entries but {} values",
                defined,
                values.len()
            );
        }
        Ok(Self {
            def_levels,
            rep_levels,
            values,
        })
    }
}

/// A stream of triples for one leaf column, consumed by the [`Assembler`](crate::Assembler).
pub trait TripleSource {
    /// Definition and repetition levels of the next triple, or `None` once exhausted.
    fn peek(&mut self) -> StrataResult<Option<(u16, u16)>>;

    /// Consume the next triple, returning its value when it is defined at the leaf.
    fn consume(&mut self) -> StrataResult<Option<Value>>;
}

impl<S: TripleSource + ?Sized> TripleSource for Box<S> {
    fn peek(&mut self) -> StrataResult<Option<(u16, u16)>> {
        (**self).peek()
    }

    fn consume(&mut self) -> StrataResult<Option<Value>> {
        (**self).consume()
    }
}

/// Reads the triples of an in-memory [`ShreddedColumn`].
#[derive(Debug)]
pub struct ColumnCursor {
    def_levels: std::vec::IntoIter<u16>,
    rep_levels: std::vec::IntoIter<u16>,
    values: std::vec::IntoIter<Value>,
    max_def: u16,
}

impl ColumnCursor {
    pub fn new(column: ShreddedColumn, max_def: u16) -> Self {
        let (def_levels, rep_levels, values) = column.into_parts();
        Self {
            def_levels: def_levels.into_iter(),
            rep_levels: rep_levels.into_iter(),
            values: values.into_iter(),
            max_def,
        }
    }

    /// Number of triples left.
    pub fn remaining(&self) -> usize {
        self.def_levels.len()
    }
}

impl TripleSource for ColumnCursor {
    fn peek(&mut self) -> StrataResult<Option<(u16, u16)>> {
        Ok(self
            .def_levels
            .as_slice()
            .first()
            .copied()
            .zip(self.rep_levels.as_slice().first().copied()))
    }

    fn consume(&mut self) -> StrataResult<Option<Value>> {
        let (Some(def), Some(_)) = (self.def_levels.next(), self.rep_levels.next()) else {
            strata_bail!(Corrupted: "Column ended before the row was complete");
        };
        if def < self.max_def {
            return Ok(None);
        }
        match self.values.next() {
            Some(value) => Ok(Some(value)),
            None => strata_bail!(Corrupted: "Column has fewer values than defined entries"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_rows_and_values() {
        let mut column = ShreddedColumn::new();
        column.push_value(2, 0, Value::Int32(1));
        column.push_value(2, 1, Value::Int32(2));
        column.push_placeholder(0, 0);
        column.push_placeholder(1, 0);
        assert_eq!(column.len(), 4);
        assert_eq!(column.num_rows(), 3);
        assert_eq!(column.values(), [Value::Int32(1), Value::Int32(2)]);

        column.truncate(1, 1);
        assert_eq!(column.def_levels(), [2]);
        assert_eq!(column.take().len(), 1);
        assert!(column.is_empty());
    }

    #[test]
    fn cursor_yields_values_only_at_max_def() {
        let mut column = ShreddedColumn::new();
        column.push_placeholder(1, 0);
        column.push_value(2, 0, Value::from("a"));
        let mut cursor = ColumnCursor::new(column, 2);
        assert_eq!(cursor.peek().unwrap(), Some((1, 0)));
        assert_eq!(cursor.consume().unwrap(), None);
        assert_eq!(cursor.consume().unwrap(), Some(Value::from("a")));
        assert_eq!(cursor.peek().unwrap(), None);
        assert!(cursor.consume().is_err());
    }

    #[test]
    fn parts_must_agree() {
        assert!(ShreddedColumn::try_from_parts(vec![1, 0], vec![0, 0], vec![Value::Int32(1)], 1).is_ok());
        assert!(ShreddedColumn::try_from_parts(vec![1, 1], vec![0, 0], vec![Value::Int32(1)], 1).is_err());
        assert!(ShreddedColumn::try_from_parts(vec![1], vec![0, 0], vec![Value::Int32(1)], 1).is_err());
    }
}
