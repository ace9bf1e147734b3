//! The PLAIN encoding.
//!
//! | Physical type | Layout |
//! |---|---|
//! | boolean | bit-packed, one bit per value, least-significant bit first |
//! | int32 / int64 / float / double | little-endian, 4 or 8 bytes |
//! | byte array | 4-byte little-endian length followed by the bytes |
//! | fixed-length byte array | the bytes; decimals as big-endian two's complement |

use bytes::Bytes;
use strata_error::{StrataResult, strata_bail, strata_err};
use strata_scalar::Value;
use strata_schema::{LeafType, LogicalType, PhysicalType};

/// Encode non-null values of a leaf column.
pub fn plain_encode(leaf: &LeafType, values: &[Value]) -> StrataResult<Vec<u8>> {
    let mut out = Vec::new();
    if leaf.physical() == PhysicalType::Boolean {
        let mut byte = 0u8;
        for (idx, value) in values.iter().enumerate() {
            if expect_bool(value)? {
                byte |= 1 << (idx % 8);
            }
            if idx % 8 == 7 {
                out.push(byte);
                byte = 0;
            }
        }
        if values.len() % 8 != 0 {
            out.push(byte);
        }
        return Ok(out);
    }
    for value in values {
        plain_encode_value(leaf, value, &mut out)?;
    }
    Ok(out)
}

/// Append the PLAIN bytes of a single value. Booleans take a whole byte.
pub fn plain_encode_value(leaf: &LeafType, value: &Value, out: &mut Vec<u8>) -> StrataResult<()> {
    match (leaf.physical(), value) {
        (PhysicalType::Boolean, Value::Boolean(b)) => out.push(u8::from(*b)),
        (PhysicalType::Int32, Value::Int32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PhysicalType::Int64, Value::Int64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PhysicalType::Float, Value::Float(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PhysicalType::Double, Value::Double(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PhysicalType::ByteArray, Value::String(s)) => write_byte_array(s.as_bytes(), out)?,
        (PhysicalType::ByteArray, Value::Bytes(b)) => write_byte_array(b, out)?,
        (PhysicalType::FixedLenByteArray, Value::Decimal(unscaled)) if leaf.is_decimal() => {
            let width = fixed_width(leaf)?;
            out.extend_from_slice(&decimal_to_bytes(*unscaled, width)?);
        }
        (PhysicalType::FixedLenByteArray, Value::Bytes(b)) if !leaf.is_decimal() => {
            let width = fixed_width(leaf)?;
            if b.len() != width {
                strata_bail!(
                    MismatchedTypes: "Expected {} bytes for fixed_len_byte_array, got {}",
                    width,
                    b.len()
                );
            }
            out.extend_from_slice(b);
        }
        (physical, value) => strata_bail!(
            MismatchedTypes: "Cannot encode {} as {}",
            value.type_name(),
            physical
        ),
    }
    Ok(())
}

/// The number of bytes `value` occupies in a PLAIN page, counting booleans as one byte.
pub fn plain_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Boolean(_) => 1,
        Value::Int32(_) | Value::Float(_) => 4,
        Value::Int64(_) | Value::Double(_) => 8,
        Value::String(s) => 4 + s.len(),
        Value::Bytes(b) => 4 + b.len(),
        Value::Decimal(_) => 16,
        Value::List(items) => items.iter().map(plain_size).sum(),
        Value::Map(entries) => entries
            .iter()
            .map(|(k, v)| plain_size(k) + plain_size(v))
            .sum(),
        Value::Struct(fields) => fields.iter().map(|(_, v)| plain_size(v)).sum(),
    }
}

/// Decode `count` values of a leaf column.
pub fn plain_decode(leaf: &LeafType, data: &Bytes, count: usize) -> StrataResult<Vec<Value>> {
    let mut values = Vec::with_capacity(count);
    match leaf.physical() {
        PhysicalType::Boolean => {
            if data.len() < count.div_ceil(8) {
                strata_bail!(Corrupted: "Boolean page is truncated");
            }
            values.extend((0..count).map(|idx| Value::Boolean(data[idx / 8] & (1 << (idx % 8)) != 0)));
        }
        PhysicalType::Int32 => {
            let chunks = fixed_chunks::<4>(data, count)?;
            values.extend(chunks.map(|b| Value::Int32(i32::from_le_bytes(b))));
        }
        PhysicalType::Int64 => {
            let chunks = fixed_chunks::<8>(data, count)?;
            values.extend(chunks.map(|b| Value::Int64(i64::from_le_bytes(b))));
        }
        PhysicalType::Float => {
            let chunks = fixed_chunks::<4>(data, count)?;
            values.extend(chunks.map(|b| Value::Float(f32::from_le_bytes(b))));
        }
        PhysicalType::Double => {
            let chunks = fixed_chunks::<8>(data, count)?;
            values.extend(chunks.map(|b| Value::Double(f64::from_le_bytes(b))));
        }
        PhysicalType::ByteArray => {
            let mut pos = 0;
            for _ in 0..count {
                let Some(prefix) = data.get(pos..pos + 4) else {
                    strata_bail!(Corrupted: "Byte array length is truncated");
                };
                let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
                pos += 4;
                if pos + len > data.len() {
                    strata_bail!(Corrupted: "Byte array of {} bytes is truncated", len);
                }
                values.push(byte_array_value(leaf, data.slice(pos..pos + len))?);
                pos += len;
            }
        }
        PhysicalType::FixedLenByteArray => {
            let width = fixed_width(leaf)?;
            if data.len() < width * count {
                strata_bail!(Corrupted: "Fixed-length byte array page is truncated");
            }
            for idx in 0..count {
                let bytes = data.slice(idx * width..(idx + 1) * width);
                values.push(match leaf.logical() {
                    Some(LogicalType::Decimal(_)) => Value::Decimal(decimal_from_bytes(&bytes)?),
                    _ => Value::Bytes(bytes),
                });
            }
        }
    }
    Ok(values)
}

fn expect_bool(value: &Value) -> StrataResult<bool> {
    value.as_bool().ok_or_else(|| {
        strata_err!(
            MismatchedTypes: "Cannot encode {} as boolean",
            value.type_name()
        )
    })
}

fn write_byte_array(bytes: &[u8], out: &mut Vec<u8>) -> StrataResult<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| strata_err!("Byte array of {} bytes is too long", bytes.len()))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn byte_array_value(leaf: &LeafType, bytes: Bytes) -> StrataResult<Value> {
    if !leaf.is_utf8() {
        return Ok(Value::Bytes(bytes));
    }
    String::from_utf8(bytes.to_vec())
        .map(Value::String)
        .map_err(|e| strata_err!(Corrupted: "Invalid UTF-8 in text column: {}", e))
}

fn fixed_width(leaf: &LeafType) -> StrataResult<usize> {
    leaf.type_length()
        .map(|len| len as usize)
        .ok_or_else(|| strata_err!("fixed_len_byte_array without a type length"))
}

fn fixed_chunks<const N: usize>(
    data: &Bytes,
    count: usize,
) -> StrataResult<impl Iterator<Item = [u8; N]> + '_> {
    if data.len() < N * count {
        strata_bail!(
            Corrupted: "Page holds {} bytes, expected at least {} for {} values",
            data.len(),
            N * count,
            count
        );
    }
    Ok(data[..N * count].chunks_exact(N).map(|chunk| {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(chunk);
        bytes
    }))
}

/// Big-endian two's complement in `width` bytes.
fn decimal_to_bytes(unscaled: i128, width: usize) -> StrataResult<Vec<u8>> {
    let full = unscaled.to_be_bytes();
    let Some(padding) = full.len().checked_sub(width) else {
        strata_bail!("Decimals cannot be wider than {} bytes, got {}", full.len(), width);
    };
    let (sign, value) = full.split_at(padding);
    let sign_byte = if unscaled < 0 { 0xFF } else { 0x00 };
    let sign_preserved = value.first().is_some_and(|b| (b & 0x80 != 0) == (unscaled < 0));
    if sign.iter().any(|&b| b != sign_byte) || !sign_preserved {
        strata_bail!("Decimal {} does not fit in {} bytes", unscaled, width);
    }
    Ok(value.to_vec())
}

fn decimal_from_bytes(bytes: &[u8]) -> StrataResult<i128> {
    let negative = bytes.first().is_some_and(|b| b & 0x80 != 0);
    let mut full = if negative { [0xFF; 16] } else { [0; 16] };
    let Some(padding) = full.len().checked_sub(bytes.len()) else {
        strata_bail!(Corrupted: "Decimal of {} bytes does not fit in 128 bits", bytes.len());
    };
    full[padding..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(full))
}
