use std::cmp::Ordering;

use bytes::Bytes;
use strata_encoding::plain::{plain_decode, plain_encode_value};
use strata_error::{StrataResult, strata_err};
use strata_proto::footer as pb;
use strata_scalar::Value;
use strata_schema::LeafType;

/// Statistics of one column chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    null_count: u64,
    distinct_count: Option<u64>,
    min: Option<Value>,
    max: Option<Value>,
}

impl Statistics {
    /// Compute statistics over the present `values` of a chunk holding `num_entries` level
    /// entries.
    pub fn compute(values: &[Value], num_entries: usize, distinct_count: Option<usize>) -> Self {
        let mut min: Option<&Value> = None;
        let mut max: Option<&Value> = None;
        for value in values {
            if min.is_none_or(|m| compare(value, m) == Some(Ordering::Less)) && comparable(value) {
                min = Some(value);
            }
            if max.is_none_or(|m| compare(value, m) == Some(Ordering::Greater)) && comparable(value)
            {
                max = Some(value);
            }
        }
        Self {
            null_count: num_entries.saturating_sub(values.len()) as u64,
            distinct_count: distinct_count.map(|c| c as u64),
            min: min.cloned(),
            max: max.cloned(),
        }
    }

    /// Level entries without a value: nulls, and empty or missing ancestors.
    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    /// Number of distinct values, known when the chunk is dictionary encoded.
    pub fn distinct_count(&self) -> Option<u64> {
        self.distinct_count
    }

    pub fn min(&self) -> Option<&Value> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Value> {
        self.max.as_ref()
    }

    pub(crate) fn to_proto(&self, leaf: &LeafType) -> StrataResult<pb::Statistics> {
        let encode = |value: &Value| -> StrataResult<Vec<u8>> {
            let mut out = Vec::new();
            plain_encode_value(leaf, value, &mut out)?;
            Ok(out)
        };
        Ok(pb::Statistics {
            null_count: self.null_count,
            distinct_count: self.distinct_count,
            min: self.min.as_ref().map(encode).transpose()?,
            max: self.max.as_ref().map(encode).transpose()?,
        })
    }

    pub(crate) fn from_proto(proto: &pb::Statistics, leaf: &LeafType) -> StrataResult<Self> {
        let decode = |bytes: &Vec<u8>| -> StrataResult<Value> {
            plain_decode(leaf, &Bytes::copy_from_slice(bytes), 1)?
                .pop()
                .ok_or_else(|| strata_err!(Corrupted: "Statistics value is empty"))
        };
        Ok(Self {
            null_count: proto.null_count,
            distinct_count: proto.distinct_count,
            min: proto.min.as_ref().map(decode).transpose()?,
            max: proto.max.as_ref().map(decode).transpose()?,
        })
    }
}

fn comparable(value: &Value) -> bool {
    compare(value, value) == Some(Ordering::Equal)
}

/// Order two values of the same kind. Values of different kinds, and NaNs, are unordered.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
        (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use strata_schema::Column;

    use super::*;

    #[test]
    fn min_max_and_nulls() {
        let values = [Value::Int32(5), Value::Int32(-3), Value::Int32(9), Value::Int32(0)];
        let stats = Statistics::compute(&values, 6, None);
        assert_eq!(stats.null_count(), 2);
        assert_eq!(stats.min(), Some(&Value::Int32(-3)));
        assert_eq!(stats.max(), Some(&Value::Int32(9)));
        assert_eq!(stats.distinct_count(), None);
    }

    #[test]
    fn nan_is_ignored() {
        let values = [Value::Double(f64::NAN), Value::Double(1.5), Value::Double(-2.0)];
        let stats = Statistics::compute(&values, 3, None);
        assert_eq!(stats.min(), Some(&Value::Double(-2.0)));
        assert_eq!(stats.max(), Some(&Value::Double(1.5)));
    }

    #[test]
    fn no_values_no_bounds() {
        let stats = Statistics::compute(&[], 4, None);
        assert_eq!(stats.null_count(), 4);
        assert!(stats.min().is_none());
        let leaf = *Column::int64("a").leaf_type().unwrap();
        let proto = stats.to_proto(&leaf).unwrap();
        assert_eq!(proto.min, None);
    }

    #[test]
    fn proto_round_trip() {
        let leaf = *Column::string("s").leaf_type().unwrap();
        let values = [Value::from("pear"), Value::from("apple"), Value::from("zoo")];
        let stats = Statistics::compute(&values, 3, Some(3));
        let proto = stats.to_proto(&leaf).unwrap();
        assert_eq!(proto.min.as_deref(), Some(b"\x05\0\0\0apple".as_slice()));
        assert_eq!(Statistics::from_proto(&proto, &leaf).unwrap(), stats);
    }
}
