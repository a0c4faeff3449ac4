//! Physical type tags for columns and return values.

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::{DataType as ArrowDataType, TimeUnit};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Closed set of physical layouts a column or return value may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhysicalType {
    /// 8-bit signed integer.
    Int8,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit unsigned integer.
    UInt64,
    /// 64-bit floating point.
    Double,
    /// Date as milliseconds since epoch.
    Date64,
    /// Time of day as a 64-bit count.
    Time64,
    /// Timestamp as a 64-bit count since epoch.
    Timestamp,
    /// Opaque byte payload.
    Blob,
    /// UTF-8 string.
    Varchar,
    /// Nested record of child columns.
    Struct,
}

impl PhysicalType {
    /// Every physical type, in declaration order.
    pub const ALL: [PhysicalType; 12] = [
        PhysicalType::Int8,
        PhysicalType::Int16,
        PhysicalType::Int32,
        PhysicalType::Int64,
        PhysicalType::UInt64,
        PhysicalType::Double,
        PhysicalType::Date64,
        PhysicalType::Time64,
        PhysicalType::Timestamp,
        PhysicalType::Blob,
        PhysicalType::Varchar,
        PhysicalType::Struct,
    ];

    /// Returns the tag used by the engine for this type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalType::Int8 => "INT8",
            PhysicalType::Int16 => "INT16",
            PhysicalType::Int32 => "INT32",
            PhysicalType::Int64 => "INT64",
            PhysicalType::UInt64 => "UINT64",
            PhysicalType::Double => "DOUBLE",
            PhysicalType::Date64 => "DATE64",
            PhysicalType::Time64 => "TIME64",
            PhysicalType::Timestamp => "TIMESTAMP",
            PhysicalType::Blob => "BLOB",
            PhysicalType::Varchar => "VARCHAR",
            PhysicalType::Struct => "STRUCT",
        }
    }

    /// Returns whether this type is stored in a fixed-width buffer.
    #[must_use]
    pub fn is_fixed_width(&self) -> bool {
        !matches!(
            self,
            PhysicalType::Blob | PhysicalType::Varchar | PhysicalType::Struct
        )
    }

    /// Returns the element byte size for fixed-width types.
    #[must_use]
    pub fn byte_size(&self) -> Option<usize> {
        match self {
            PhysicalType::Int8 => Some(1),
            PhysicalType::Int16 => Some(2),
            PhysicalType::Int32 => Some(4),
            PhysicalType::Int64
            | PhysicalType::UInt64
            | PhysicalType::Double
            | PhysicalType::Date64
            | PhysicalType::Time64
            | PhysicalType::Timestamp => Some(8),
            PhysicalType::Blob | PhysicalType::Varchar | PhysicalType::Struct => None,
        }
    }

    /// Converts to an Arrow data type.
    ///
    /// Returns None for `Struct`, whose Arrow type depends on its children.
    #[must_use]
    pub fn to_arrow(&self) -> Option<ArrowDataType> {
        match self {
            PhysicalType::Int8 => Some(ArrowDataType::Int8),
            PhysicalType::Int16 => Some(ArrowDataType::Int16),
            PhysicalType::Int32 => Some(ArrowDataType::Int32),
            PhysicalType::Int64 => Some(ArrowDataType::Int64),
            PhysicalType::UInt64 => Some(ArrowDataType::UInt64),
            PhysicalType::Double => Some(ArrowDataType::Float64),
            PhysicalType::Date64 => Some(ArrowDataType::Date64),
            PhysicalType::Time64 => Some(ArrowDataType::Time64(TimeUnit::Microsecond)),
            PhysicalType::Timestamp => Some(ArrowDataType::Timestamp(TimeUnit::Microsecond, None)),
            PhysicalType::Blob => Some(ArrowDataType::Binary),
            PhysicalType::Varchar => Some(ArrowDataType::Utf8),
            PhysicalType::Struct => None,
        }
    }

    /// Converts from an Arrow data type.
    ///
    /// Returns None for unsupported Arrow types.
    #[must_use]
    pub fn from_arrow(arrow_type: &ArrowDataType) -> Option<Self> {
        match arrow_type {
            ArrowDataType::Int8 => Some(PhysicalType::Int8),
            ArrowDataType::Int16 => Some(PhysicalType::Int16),
            ArrowDataType::Int32 => Some(PhysicalType::Int32),
            ArrowDataType::Int64 => Some(PhysicalType::Int64),
            ArrowDataType::UInt64 => Some(PhysicalType::UInt64),
            ArrowDataType::Float64 => Some(PhysicalType::Double),
            ArrowDataType::Date64 => Some(PhysicalType::Date64),
            ArrowDataType::Time64(TimeUnit::Microsecond | TimeUnit::Nanosecond) => {
                Some(PhysicalType::Time64)
            }
            ArrowDataType::Timestamp(_, _) => Some(PhysicalType::Timestamp),
            ArrowDataType::Binary => Some(PhysicalType::Blob),
            ArrowDataType::Utf8 => Some(PhysicalType::Varchar),
            ArrowDataType::Struct(_) => Some(PhysicalType::Struct),
            _ => None,
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PhysicalType {
    type Err = BridgeError;

    /// Parses an engine tag such as `"INT32"`, ignoring ASCII case.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        PhysicalType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(tag.trim()))
            .ok_or_else(|| BridgeError::UnknownPhysicalType(tag.to_string()))
    }
}
