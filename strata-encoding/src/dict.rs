//! Per column chunk dictionaries.
//!
//! The dictionary page holds the PLAIN encoding of the distinct values in first-seen order.
//! Data pages reference it with `[bit width: u8][hybrid encoded indices]`.

use rustc_hash::FxHashMap;
use strata_error::{StrataResult, strata_bail, strata_err};
use strata_scalar::Value;
use strata_schema::LeafType;

use crate::bitpack::bit_width;
use crate::plain::{plain_encode, plain_encode_value};
use crate::rle::{hybrid_decode, hybrid_encode};

/// Dictionary encode the values of one leaf column.
pub struct DictEncoder {
    leaf: LeafType,
    lookup: FxHashMap<Vec<u8>, u32>,
    values: Vec<Value>,
    plain_size: usize,
}

impl DictEncoder {
    pub fn new(leaf: LeafType) -> Self {
        Self {
            leaf,
            lookup: FxHashMap::default(),
            values: Vec::new(),
            plain_size: 0,
        }
    }

    /// Return the index of `value`, adding it to the dictionary if it has not been seen.
    pub fn encode(&mut self, value: &Value) -> StrataResult<u32> {
        let mut key = Vec::new();
        plain_encode_value(&self.leaf, value, &mut key)?;
        if let Some(&code) = self.lookup.get(&key) {
            return Ok(code);
        }
        let code = u32::try_from(self.values.len())
            .map_err(|_| strata_err!("Dictionary holds more than {} values", u32::MAX))?;
        self.plain_size += key.len();
        self.lookup.insert(key, code);
        self.values.push(value.clone());
        Ok(code)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Size in bytes of the dictionary page body.
    pub fn plain_size(&self) -> usize {
        self.plain_size
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The PLAIN encoded dictionary page body.
    pub fn dictionary_page(&self) -> StrataResult<Vec<u8>> {
        plain_encode(&self.leaf, &self.values)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Encode dictionary indices for a data page.
pub fn dict_encode_indices(indices: &[u32], dict_len: usize) -> Vec<u8> {
    #[allow(clippy::cast_possible_truncation)]
    let width = bit_width(dict_len.saturating_sub(1) as u32);
    let mut out = vec![width];
    out.extend(hybrid_encode(indices, width));
    out
}

/// Decode `count` dictionary indices written by [`dict_encode_indices`].
pub fn dict_decode_indices(data: &[u8], count: usize) -> StrataResult<Vec<u32>> {
    let Some((&width, rest)) = data.split_first() else {
        if count == 0 {
            return Ok(Vec::new());
        }
        strata_bail!(Corrupted: "Dictionary indices are missing their bit width");
    };
    hybrid_decode(rest, width, count)
}

/// Resolve decoded indices against the dictionary values.
pub fn dict_lookup(dictionary: &[Value], indices: &[u32]) -> StrataResult<Vec<Value>> {
    indices
        .iter()
        .map(|&idx| {
            dictionary.get(idx as usize).cloned().ok_or_else(|| {
                strata_err!(
                    Corrupted: "Dictionary index {} is out of range for {} values",
                    idx,
                    dictionary.len()
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use strata_schema::Column;

    use super::*;
    use crate::plain::plain_decode;

    fn string_leaf() -> LeafType {
        *Column::string("s").leaf_type().unwrap()
    }

    #[test]
    fn assigns_codes_in_first_seen_order() {
        let mut encoder = DictEncoder::new(string_leaf());
        let codes = ["b", "a", "b", "c", "a"]
            .into_iter()
            .map(|s| encoder.encode(&Value::from(s)).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(codes, [0, 1, 0, 2, 1]);
        assert_eq!(encoder.len(), 3);
        assert_eq!(encoder.plain_size(), 3 * 5);

        let page = encoder.dictionary_page().unwrap();
        let decoded = plain_decode(&string_leaf(), &Bytes::from(page), encoder.len()).unwrap();
        assert_eq!(decoded, encoder.values());
    }

    #[test]
    fn indices_round_trip() {
        let indices = [0u32, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 0];
        let encoded = dict_encode_indices(&indices, 3);
        assert_eq!(encoded[0], 2);
        assert_eq!(dict_decode_indices(&encoded, indices.len()).unwrap(), indices);
    }

    #[test]
    fn single_entry_dictionary_uses_zero_width() {
        let encoded = dict_encode_indices(&[0; 10], 1);
        assert_eq!(encoded[0], 0);
        assert_eq!(dict_decode_indices(&encoded, 10).unwrap(), [0; 10]);
    }

    #[test]
    fn out_of_range_index_is_corrupt() {
        let dictionary = [Value::from("x")];
        assert!(dict_lookup(&dictionary, &[0, 1]).is_err());
        assert_eq!(
            dict_lookup(&dictionary, &[0, 0]).unwrap(),
            [Value::from("x"), Value::from("x")]
        );
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let mut encoder = DictEncoder::new(string_leaf());
        assert!(encoder.encode(&Value::Int32(1)).is_err());
        assert!(encoder.is_empty());
    }
}
