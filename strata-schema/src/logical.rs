use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strata_error::{StrataResult, strata_bail};

use crate::PhysicalType;

/// Maximum precision of a decimal column.
pub const DECIMAL_MAX_PRECISION: u8 = 38;

/// Resolution of time and timestamp columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TimeUnit {
    /// Milliseconds
    Millis = 0,
    /// Microseconds
    Micros = 1,
    /// Nanoseconds
    Nanos = 2,
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Millis => write!(f, "MILLIS"),
            Self::Micros => write!(f, "MICROS"),
            Self::Nanos => write!(f, "NANOS"),
        }
    }
}

/// Parameters that define the precision and scale of a decimal column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DecimalType {
    precision: u8,
    scale: u8,
}

impl DecimalType {
    /// Checked constructor, precision must be within `1..=38` and scale cannot exceed it.
    pub fn try_new(precision: u8, scale: u8) -> StrataResult<Self> {
        if precision == 0 || precision > DECIMAL_MAX_PRECISION {
            strata_bail!(
                "Decimal precision must be between 1 and {}, got {}",
                DECIMAL_MAX_PRECISION,
                precision
            );
        }
        if scale > precision {
            strata_bail!(
                "Decimal scale {} cannot exceed its precision {}",
                scale,
                precision
            );
        }
        Ok(Self { precision, scale })
    }

    /// The number of significant digits.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// The number of digits after the decimal point.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// The smallest number of bytes whose two's complement range holds every unscaled value of
    /// this precision.
    pub fn byte_width(&self) -> u32 {
        let max_unscaled = 10i128.pow(u32::from(self.precision)) - 1;
        for width in 1..16u32 {
            if max_unscaled < 1i128 << (8 * width - 1) {
                return width;
            }
        }
        16
    }
}

/// The closed set of logical type ids written to the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum LogicalKind {
    /// See [`LogicalType::String`]
    String = 0,
    /// See [`LogicalType::Json`]
    Json = 1,
    /// See [`LogicalType::Uuid`]
    Uuid = 2,
    /// See [`LogicalType::Enum`]
    Enum = 3,
    /// See [`LogicalType::Date`]
    Date = 4,
    /// See [`LogicalType::Time`]
    Time = 5,
    /// See [`LogicalType::Timestamp`]
    Timestamp = 6,
    /// See [`LogicalType::Decimal`]
    Decimal = 7,
}

/// A semantic refinement of a leaf's physical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// UTF-8 text stored as a byte array
    String,
    /// UTF-8 JSON document stored as a byte array
    Json,
    /// Textual UUID stored as a byte array
    Uuid,
    /// Enumeration label stored as a byte array
    Enum,
    /// Days since the unix epoch, stored as int32
    Date,
    /// Time of day; int32 for milliseconds, int64 otherwise
    Time(TimeUnit),
    /// Instant since the unix epoch, stored as int64
    Timestamp {
        /// Resolution of the stored integer
        unit: TimeUnit,
        /// Whether values are normalized to UTC
        adjusted_to_utc: bool,
    },
    /// Fixed point number stored as a big-endian two's complement fixed-length byte array
    Decimal(DecimalType),
}

impl LogicalType {
    /// The id of this type's kind.
    pub fn kind(&self) -> LogicalKind {
        match self {
            LogicalType::String => LogicalKind::String,
            LogicalType::Json => LogicalKind::Json,
            LogicalType::Uuid => LogicalKind::Uuid,
            LogicalType::Enum => LogicalKind::Enum,
            LogicalType::Date => LogicalKind::Date,
            LogicalType::Time(_) => LogicalKind::Time,
            LogicalType::Timestamp { .. } => LogicalKind::Timestamp,
            LogicalType::Decimal(_) => LogicalKind::Decimal,
        }
    }

    /// Whether values of this type are UTF-8 text.
    pub fn is_utf8(&self) -> bool {
        matches!(
            self,
            LogicalType::String | LogicalType::Json | LogicalType::Uuid | LogicalType::Enum
        )
    }

    /// Whether this logical type can annotate the given physical type.
    pub fn annotates(&self, physical: PhysicalType) -> bool {
        match self {
            LogicalType::String | LogicalType::Json | LogicalType::Uuid | LogicalType::Enum => {
                physical == PhysicalType::ByteArray
            }
            LogicalType::Date | LogicalType::Time(TimeUnit::Millis) => {
                physical == PhysicalType::Int32
            }
            LogicalType::Time(_) | LogicalType::Timestamp { .. } => {
                physical == PhysicalType::Int64
            }
            LogicalType::Decimal(_) => physical == PhysicalType::FixedLenByteArray,
        }
    }
}

impl Display for LogicalType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalType::String => write!(f, "STRING"),
            LogicalType::Json => write!(f, "JSON"),
            LogicalType::Uuid => write!(f, "UUID"),
            LogicalType::Enum => write!(f, "ENUM"),
            LogicalType::Date => write!(f, "DATE"),
            LogicalType::Time(unit) => write!(f, "TIME({unit})"),
            LogicalType::Timestamp {
                unit,
                adjusted_to_utc,
            } => write!(f, "TIMESTAMP({unit},{adjusted_to_utc})"),
            LogicalType::Decimal(decimal) => {
                write!(f, "DECIMAL({},{})", decimal.precision, decimal.scale)
            }
        }
    }
}
