//! Read-only typed columns as presented by the engine.

use arrow::array::{Array, AsArray, BinaryArray, StringArray};
use arrow::buffer::{NullBuffer, ScalarBuffer};
use arrow::datatypes::{
    DataType as ArrowDataType, Date64Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, Time64MicrosecondType, Time64NanosecondType, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt64Type,
};

use crate::error::{BridgeError, Result};
use crate::types::PhysicalType;

/// Dense value buffer backing a non-struct column.
///
/// `DATE64`, `TIME64` and `TIMESTAMP` columns share the `Int64` buffer kind.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Int8(ScalarBuffer<i8>),
    Int16(ScalarBuffer<i16>),
    Int32(ScalarBuffer<i32>),
    Int64(ScalarBuffer<i64>),
    UInt64(ScalarBuffer<u64>),
    Double(ScalarBuffer<f64>),
    Blob(BinaryArray),
    Varchar(StringArray),
}

impl ColumnData {
    /// Returns the number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int8(b) => b.len(),
            ColumnData::Int16(b) => b.len(),
            ColumnData::Int32(b) => b.len(),
            ColumnData::Int64(b) => b.len(),
            ColumnData::UInt64(b) => b.len(),
            ColumnData::Double(b) => b.len(),
            ColumnData::Blob(a) => a.len(),
            ColumnData::Varchar(a) => a.len(),
        }
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether this buffer's element kind matches the physical type.
    #[must_use]
    pub fn fits(&self, physical_type: PhysicalType) -> bool {
        matches!(
            (self, physical_type),
            (ColumnData::Int8(_), PhysicalType::Int8)
                | (ColumnData::Int16(_), PhysicalType::Int16)
                | (ColumnData::Int32(_), PhysicalType::Int32)
                | (
                    ColumnData::Int64(_),
                    PhysicalType::Int64
                        | PhysicalType::Date64
                        | PhysicalType::Time64
                        | PhysicalType::Timestamp
                )
                | (ColumnData::UInt64(_), PhysicalType::UInt64)
                | (ColumnData::Double(_), PhysicalType::Double)
                | (ColumnData::Blob(_), PhysicalType::Blob)
                | (ColumnData::Varchar(_), PhysicalType::Varchar)
        )
    }

    /// Returns the name of the buffer's element kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            ColumnData::Int8(_) => "i8",
            ColumnData::Int16(_) => "i16",
            ColumnData::Int32(_) => "i32",
            ColumnData::Int64(_) => "i64",
            ColumnData::UInt64(_) => "u64",
            ColumnData::Double(_) => "f64",
            ColumnData::Blob(_) => "bytes",
            ColumnData::Varchar(_) => "string",
        }
    }

    /// Builds a string buffer.
    pub fn varchar<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ColumnData::Varchar(StringArray::from_iter_values(values))
    }

    /// Builds a byte buffer.
    pub fn blob<I, B>(values: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        ColumnData::Blob(BinaryArray::from_iter_values(values))
    }
}

macro_rules! impl_from_vec {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$native>> for ColumnData {
                fn from(values: Vec<$native>) -> Self {
                    ColumnData::$variant(ScalarBuffer::from(values))
                }
            }
        )*
    };
}

impl_from_vec! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
}

impl From<Vec<&str>> for ColumnData {
    fn from(values: Vec<&str>) -> Self {
        ColumnData::varchar(values)
    }
}

impl From<Vec<String>> for ColumnData {
    fn from(values: Vec<String>) -> Self {
        ColumnData::varchar(values)
    }
}

impl From<Vec<Vec<u8>>> for ColumnData {
    fn from(values: Vec<Vec<u8>>) -> Self {
        ColumnData::blob(values)
    }
}

/// A typed, nullable, read-only column of one function argument.
///
/// Construction does not validate the layout; a column whose buffers do not
/// match its physical type is rejected when a resolver is built for it.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    physical_type: PhysicalType,
    data: Option<ColumnData>,
    validity: Option<NullBuffer>,
    children: Vec<Column>,
}

impl Column {
    /// Creates a non-struct column with a data buffer and no validity bitmap.
    pub fn new(
        name: impl Into<String>,
        physical_type: PhysicalType,
        data: impl Into<ColumnData>,
    ) -> Self {
        Column {
            name: name.into(),
            physical_type,
            data: Some(data.into()),
            validity: None,
            children: Vec::new(),
        }
    }

    /// Creates a struct column from its children.
    pub fn new_struct(name: impl Into<String>, children: Vec<Column>) -> Self {
        Column {
            name: name.into(),
            physical_type: PhysicalType::Struct,
            data: None,
            validity: None,
            children,
        }
    }

    /// Creates a column from raw parts exactly as an engine hands them over.
    pub fn from_parts(
        name: impl Into<String>,
        physical_type: PhysicalType,
        data: Option<ColumnData>,
        validity: Option<NullBuffer>,
        children: Vec<Column>,
    ) -> Self {
        Column {
            name: name.into(),
            physical_type,
            data,
            validity,
            children,
        }
    }

    /// Attaches a validity bitmap.
    #[must_use]
    pub fn with_validity(mut self, validity: impl Into<NullBuffer>) -> Self {
        self.validity = Some(validity.into());
        self
    }

    /// Builds a column from an Arrow array.
    ///
    /// The Arrow buffers are shared, not copied.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArrowType` if the array (or a nested child) has no
    /// column representation.
    pub fn from_arrow(name: impl Into<String>, array: &dyn Array) -> Result<Self> {
        let name = name.into();
        let validity = array.nulls().cloned();

        let (physical_type, data) = match array.data_type() {
            ArrowDataType::Int8 => (
                PhysicalType::Int8,
                ColumnData::Int8(array.as_primitive::<Int8Type>().values().clone()),
            ),
            ArrowDataType::Int16 => (
                PhysicalType::Int16,
                ColumnData::Int16(array.as_primitive::<Int16Type>().values().clone()),
            ),
            ArrowDataType::Int32 => (
                PhysicalType::Int32,
                ColumnData::Int32(array.as_primitive::<Int32Type>().values().clone()),
            ),
            ArrowDataType::Int64 => (
                PhysicalType::Int64,
                ColumnData::Int64(array.as_primitive::<Int64Type>().values().clone()),
            ),
            ArrowDataType::UInt64 => (
                PhysicalType::UInt64,
                ColumnData::UInt64(array.as_primitive::<UInt64Type>().values().clone()),
            ),
            ArrowDataType::Float64 => (
                PhysicalType::Double,
                ColumnData::Double(array.as_primitive::<Float64Type>().values().clone()),
            ),
            ArrowDataType::Date64 => (
                PhysicalType::Date64,
                ColumnData::Int64(array.as_primitive::<Date64Type>().values().clone()),
            ),
            ArrowDataType::Time64(unit) => {
                let values = match unit {
                    TimeUnit::Nanosecond => {
                        array.as_primitive::<Time64NanosecondType>().values().clone()
                    }
                    TimeUnit::Microsecond => {
                        array.as_primitive::<Time64MicrosecondType>().values().clone()
                    }
                    other => {
                        return Err(BridgeError::UnsupportedArrowType(format!(
                            "Time64({other:?})"
                        )))
                    }
                };
                (PhysicalType::Time64, ColumnData::Int64(values))
            }
            ArrowDataType::Timestamp(unit, _) => {
                let values = match unit {
                    TimeUnit::Second => array.as_primitive::<TimestampSecondType>().values().clone(),
                    TimeUnit::Millisecond => {
                        array.as_primitive::<TimestampMillisecondType>().values().clone()
                    }
                    TimeUnit::Microsecond => {
                        array.as_primitive::<TimestampMicrosecondType>().values().clone()
                    }
                    TimeUnit::Nanosecond => {
                        array.as_primitive::<TimestampNanosecondType>().values().clone()
                    }
                };
                (PhysicalType::Timestamp, ColumnData::Int64(values))
            }
            ArrowDataType::Binary => (
                PhysicalType::Blob,
                ColumnData::Blob(array.as_binary::<i32>().clone()),
            ),
            ArrowDataType::Utf8 => (
                PhysicalType::Varchar,
                ColumnData::Varchar(array.as_string::<i32>().clone()),
            ),
            ArrowDataType::Struct(_) => {
                let array = array.as_struct();
                let children = array
                    .fields()
                    .iter()
                    .zip(array.columns())
                    .map(|(field, child)| Column::from_arrow(field.name().as_str(), child.as_ref()))
                    .collect::<Result<Vec<_>>>()?;
                return Ok(Column {
                    name,
                    physical_type: PhysicalType::Struct,
                    data: None,
                    validity,
                    children,
                });
            }
            other => return Err(BridgeError::UnsupportedArrowType(other.to_string())),
        };

        Ok(Column {
            name,
            physical_type,
            data: Some(data),
            validity,
            children: Vec::new(),
        })
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared physical type.
    #[must_use]
    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// Returns the data buffer, if any.
    #[must_use]
    pub fn data(&self) -> Option<&ColumnData> {
        self.data.as_ref()
    }

    /// Returns the validity bitmap, if any.
    #[must_use]
    pub fn validity(&self) -> Option<&NullBuffer> {
        self.validity.as_ref()
    }

    /// Returns the child columns of a struct column.
    #[must_use]
    pub fn children(&self) -> &[Column] {
        &self.children
    }

    /// Returns the number of rows, taken from the data buffer or first child.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.data {
            Some(data) => data.len(),
            None => self.children.first().map_or(0, Column::len),
        }
    }

    /// Returns true if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether the row holds a value. Rows without a bitmap are valid.
    #[must_use]
    pub fn is_valid(&self, row: usize) -> bool {
        self.validity.as_ref().map_or(true, |v| v.is_valid(row))
    }
}
