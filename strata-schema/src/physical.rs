use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The storage type of a leaf column.
///
/// Discriminants are the ids written to the footer and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PhysicalType {
    /// Single bit values
    Boolean = 0,
    /// 32-bit signed integers
    Int32 = 1,
    /// 64-bit signed integers
    Int64 = 2,
    /// IEEE 754 single precision
    Float = 4,
    /// IEEE 754 double precision
    Double = 5,
    /// Variable length byte strings
    ByteArray = 6,
    /// Byte strings of a width fixed by the column
    FixedLenByteArray = 7,
}

impl PhysicalType {
    /// Width in bytes of one PLAIN encoded value, if it is fixed by the type alone.
    ///
    /// Booleans are bit-packed and fixed-length byte arrays take their width from the column.
    pub const fn byte_width(&self) -> Option<usize> {
        match self {
            PhysicalType::Int32 | PhysicalType::Float => Some(4),
            PhysicalType::Int64 | PhysicalType::Double => Some(8),
            PhysicalType::Boolean | PhysicalType::ByteArray | PhysicalType::FixedLenByteArray => {
                None
            }
        }
    }
}

impl Display for PhysicalType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Int32 => write!(f, "int32"),
            Self::Int64 => write!(f, "int64"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::ByteArray => write!(f, "binary"),
            Self::FixedLenByteArray => write!(f, "fixed_len_byte_array"),
        }
    }
}
