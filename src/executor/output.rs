//! Return-column buffers and result assignment.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, BooleanBufferBuilder, Date64Array, Float64Array, Int16Array,
    Int32Array, Int64Array, Int8Array, StringArray, Time64MicrosecondArray,
    Time64NanosecondArray, TimestampMicrosecondArray, TimestampMillisecondArray,
    TimestampNanosecondArray, TimestampSecondArray, UInt64Array,
};
use arrow::buffer::{NullBuffer, ScalarBuffer};
use arrow::datatypes::{DataType as ArrowDataType, TimeUnit};

use crate::error::{BridgeError, Result};
use crate::types::{PhysicalType, Value};

/// Typed data buffer of a return column.
///
/// `DATE64`, `TIME64`, `TIMESTAMP` and `INT64` all use the `Int64` buffer.
/// Unset `Blob` and `Varchar` slots hold an empty byte vector or empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Double(Vec<f64>),
    Blob(Vec<Vec<u8>>),
    Varchar(Vec<String>),
}

impl ReturnData {
    /// Allocates a zeroed buffer of `row_count` elements for the return type.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedReturnType` for types without an allocation rule.
    pub fn allocate(physical_type: PhysicalType, row_count: usize) -> Result<Self> {
        match physical_type {
            PhysicalType::Int8 => Ok(ReturnData::Int8(vec![0; row_count])),
            PhysicalType::Int16 => Ok(ReturnData::Int16(vec![0; row_count])),
            PhysicalType::Int32 => Ok(ReturnData::Int32(vec![0; row_count])),
            PhysicalType::Double => Ok(ReturnData::Double(vec![0.0; row_count])),
            PhysicalType::Date64
            | PhysicalType::Time64
            | PhysicalType::Timestamp
            | PhysicalType::Int64 => Ok(ReturnData::Int64(vec![0; row_count])),
            PhysicalType::UInt64 => Ok(ReturnData::UInt64(vec![0; row_count])),
            PhysicalType::Blob => Ok(ReturnData::Blob(vec![Vec::new(); row_count])),
            PhysicalType::Varchar => Ok(ReturnData::Varchar(vec![String::new(); row_count])),
            PhysicalType::Struct => Err(BridgeError::UnsupportedReturnType(physical_type)),
        }
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ReturnData::Int8(b) => b.len(),
            ReturnData::Int16(b) => b.len(),
            ReturnData::Int32(b) => b.len(),
            ReturnData::Int64(b) => b.len(),
            ReturnData::UInt64(b) => b.len(),
            ReturnData::Double(b) => b.len(),
            ReturnData::Blob(b) => b.len(),
            ReturnData::Varchar(b) => b.len(),
        }
    }

    /// Returns true if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a non-null result into slot `row`.
    ///
    /// Integers convert into any integer or 64-bit temporal buffer when the
    /// value fits; integers and floats both convert into `Double`.
    fn store(&mut self, row: usize, value: Value, expected: PhysicalType) -> Result<()> {
        let mismatch = |value: &Value| BridgeError::ResultTypeMismatch {
            row,
            expected,
            actual: value.kind_name(),
        };

        match self {
            ReturnData::Int8(buf) => buf[row] = integer(&value).ok_or_else(|| mismatch(&value))?,
            ReturnData::Int16(buf) => buf[row] = integer(&value).ok_or_else(|| mismatch(&value))?,
            ReturnData::Int32(buf) => buf[row] = integer(&value).ok_or_else(|| mismatch(&value))?,
            ReturnData::Int64(buf) => buf[row] = integer(&value).ok_or_else(|| mismatch(&value))?,
            ReturnData::UInt64(buf) => {
                buf[row] = integer(&value).ok_or_else(|| mismatch(&value))?;
            }
            ReturnData::Double(buf) => buf[row] = double(&value).ok_or_else(|| mismatch(&value))?,
            ReturnData::Blob(buf) => match value {
                Value::Blob(bytes) => buf[row] = bytes,
                other => return Err(mismatch(&other)),
            },
            ReturnData::Varchar(buf) => match value {
                Value::Varchar(s) => buf[row] = s,
                other => return Err(mismatch(&other)),
            },
        }
        Ok(())
    }
}

/// Converts any integer or 64-bit temporal value into `T`, if in range.
fn integer<T>(value: &Value) -> Option<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    match *value {
        Value::Int8(v) => T::try_from(i64::from(v)).ok(),
        Value::Int16(v) => T::try_from(i64::from(v)).ok(),
        Value::Int32(v) => T::try_from(i64::from(v)).ok(),
        Value::Int64(v) | Value::Date64(v) | Value::Time64(v) | Value::Timestamp(v) => {
            T::try_from(v).ok()
        }
        Value::UInt64(v) => T::try_from(v).ok(),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn double(value: &Value) -> Option<f64> {
    match *value {
        Value::Double(v) => Some(v),
        Value::Int8(v) => Some(f64::from(v)),
        Value::Int16(v) => Some(f64::from(v)),
        Value::Int32(v) => Some(f64::from(v)),
        Value::Int64(v) => Some(v as f64),
        Value::UInt64(v) => Some(v as f64),
        _ => None,
    }
}

/// Return buffer and validity bitmap while a batch is being processed.
pub(crate) struct ReturnBuilder {
    physical_type: PhysicalType,
    data: ReturnData,
    validity: BooleanBufferBuilder,
}

impl ReturnBuilder {
    /// Allocates the data buffer and an all-invalid bitmap.
    pub(crate) fn allocate(physical_type: PhysicalType, row_count: usize) -> Result<Self> {
        let data = ReturnData::allocate(physical_type, row_count)?;
        let mut validity = BooleanBufferBuilder::new(row_count);
        validity.append_n(row_count, false);
        Ok(ReturnBuilder {
            physical_type,
            data,
            validity,
        })
    }

    /// Records the result for `row`. Null leaves the slot at its default.
    pub(crate) fn set(&mut self, row: usize, value: Value) -> Result<()> {
        if value.is_null() {
            self.validity.set_bit(row, false);
            return Ok(());
        }
        self.data.store(row, value, self.physical_type)?;
        self.validity.set_bit(row, true);
        Ok(())
    }

    pub(crate) fn finish(mut self) -> ReturnColumn {
        ReturnColumn {
            physical_type: self.physical_type,
            data: self.data,
            validity: NullBuffer::new(self.validity.finish()),
        }
    }
}

/// A fully populated return column.
#[derive(Debug, Clone)]
pub struct ReturnColumn {
    physical_type: PhysicalType,
    data: ReturnData,
    validity: NullBuffer,
}

impl ReturnColumn {
    /// Returns the declared return type.
    #[must_use]
    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// Returns the data buffer. Slots of invalid rows hold the default value.
    #[must_use]
    pub fn data(&self) -> &ReturnData {
        &self.data
    }

    /// Returns the validity bitmap.
    #[must_use]
    pub fn validity(&self) -> &NullBuffer {
        &self.validity
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns whether row `row` holds a result.
    #[must_use]
    pub fn is_valid(&self, row: usize) -> bool {
        self.validity.is_valid(row)
    }

    /// Returns the number of null rows.
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    /// Returns the value of row `row`, or None if out of bounds.
    #[must_use]
    pub fn value(&self, row: usize) -> Option<Value> {
        if row >= self.len() {
            return None;
        }
        if !self.is_valid(row) {
            return Some(Value::Null);
        }
        let value = match &self.data {
            ReturnData::Int8(b) => Value::Int8(b[row]),
            ReturnData::Int16(b) => Value::Int16(b[row]),
            ReturnData::Int32(b) => Value::Int32(b[row]),
            ReturnData::Int64(b) => match self.physical_type {
                PhysicalType::Date64 => Value::Date64(b[row]),
                PhysicalType::Time64 => Value::Time64(b[row]),
                PhysicalType::Timestamp => Value::Timestamp(b[row]),
                _ => Value::Int64(b[row]),
            },
            ReturnData::UInt64(b) => Value::UInt64(b[row]),
            ReturnData::Double(b) => Value::Double(b[row]),
            ReturnData::Blob(b) => Value::Blob(b[row].clone()),
            ReturnData::Varchar(b) => Value::Varchar(b[row].clone()),
        };
        Some(value)
    }

    /// Returns every row as a value, nulls included.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|row| self.value(row)).collect()
    }

    /// Converts into an Arrow array whose nulls are the validity bitmap.
    ///
    /// `TIME64` and `TIMESTAMP` columns become microsecond arrays; use
    /// [`ReturnColumn::into_arrow_as`] to keep another unit or a timezone.
    ///
    /// # Errors
    ///
    /// Returns an Arrow error if the buffers are rejected.
    pub fn into_arrow(self) -> Result<ArrayRef> {
        let data_type = self
            .physical_type
            .to_arrow()
            .ok_or(BridgeError::UnsupportedReturnType(self.physical_type))?;
        self.into_arrow_as(&data_type)
    }

    /// Converts into an Arrow array of `data_type`.
    ///
    /// Raw 64-bit counts are tagged with the unit and timezone of
    /// `data_type` as they are, without rescaling.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArrowType` if `data_type` does not describe this
    /// column's physical type, or an Arrow error if the buffers are rejected.
    pub fn into_arrow_as(self, data_type: &ArrowDataType) -> Result<ArrayRef> {
        if PhysicalType::from_arrow(data_type) != Some(self.physical_type) {
            return Err(BridgeError::UnsupportedArrowType(format!(
                "{data_type} for {} return column",
                self.physical_type
            )));
        }

        let nulls = Some(self.validity);
        let array: ArrayRef = match self.data {
            ReturnData::Int8(b) => Arc::new(Int8Array::try_new(ScalarBuffer::from(b), nulls)?),
            ReturnData::Int16(b) => Arc::new(Int16Array::try_new(ScalarBuffer::from(b), nulls)?),
            ReturnData::Int32(b) => Arc::new(Int32Array::try_new(ScalarBuffer::from(b), nulls)?),
            ReturnData::Int64(b) => {
                let values = ScalarBuffer::from(b);
                match data_type {
                    ArrowDataType::Date64 => Arc::new(Date64Array::try_new(values, nulls)?),
                    ArrowDataType::Time64(TimeUnit::Nanosecond) => {
                        Arc::new(Time64NanosecondArray::try_new(values, nulls)?)
                    }
                    ArrowDataType::Time64(_) => {
                        Arc::new(Time64MicrosecondArray::try_new(values, nulls)?)
                    }
                    ArrowDataType::Timestamp(unit, tz) => {
                        timestamp_array(*unit, tz.clone(), values, nulls)?
                    }
                    _ => Arc::new(Int64Array::try_new(values, nulls)?),
                }
            }
            ReturnData::UInt64(b) => Arc::new(UInt64Array::try_new(ScalarBuffer::from(b), nulls)?),
            ReturnData::Double(b) => Arc::new(Float64Array::try_new(ScalarBuffer::from(b), nulls)?),
            ReturnData::Blob(b) => {
                let validity = nulls.as_ref();
                Arc::new(
                    b.iter()
                        .enumerate()
                        .map(|(row, bytes)| {
                            validity
                                .map_or(true, |v| v.is_valid(row))
                                .then_some(bytes.as_slice())
                        })
                        .collect::<BinaryArray>(),
                )
            }
            ReturnData::Varchar(b) => {
                let validity = nulls.as_ref();
                Arc::new(
                    b.iter()
                        .enumerate()
                        .map(|(row, s)| {
                            validity
                                .map_or(true, |v| v.is_valid(row))
                                .then_some(s.as_str())
                        })
                        .collect::<StringArray>(),
                )
            }
        };
        Ok(array)
    }
}

fn timestamp_array(
    unit: TimeUnit,
    tz: Option<Arc<str>>,
    values: ScalarBuffer<i64>,
    nulls: Option<NullBuffer>,
) -> Result<ArrayRef> {
    let array: ArrayRef = match unit {
        TimeUnit::Second => {
            Arc::new(TimestampSecondArray::try_new(values, nulls)?.with_timezone_opt(tz))
        }
        TimeUnit::Millisecond => {
            Arc::new(TimestampMillisecondArray::try_new(values, nulls)?.with_timezone_opt(tz))
        }
        TimeUnit::Microsecond => {
            Arc::new(TimestampMicrosecondArray::try_new(values, nulls)?.with_timezone_opt(tz))
        }
        TimeUnit::Nanosecond => {
            Arc::new(TimestampNanosecondArray::try_new(values, nulls)?.with_timezone_opt(tz))
        }
    };
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Int32Type, TimestampMillisecondType};

    #[test]
    fn test_allocate_defaults() {
        assert_eq!(
            ReturnData::allocate(PhysicalType::Int16, 2).unwrap(),
            ReturnData::Int16(vec![0, 0])
        );
        assert_eq!(
            ReturnData::allocate(PhysicalType::Timestamp, 1).unwrap(),
            ReturnData::Int64(vec![0])
        );
        assert_eq!(
            ReturnData::allocate(PhysicalType::Varchar, 2).unwrap(),
            ReturnData::Varchar(vec![String::new(), String::new()])
        );
        assert_eq!(
            ReturnData::allocate(PhysicalType::Blob, 1).unwrap(),
            ReturnData::Blob(vec![Vec::new()])
        );
    }

    #[test]
    fn test_allocate_struct_unsupported() {
        let err = ReturnData::allocate(PhysicalType::Struct, 3).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnsupportedReturnType(PhysicalType::Struct)
        ));
    }

    #[test]
    fn test_builder_null_and_value() {
        let mut builder = ReturnBuilder::allocate(PhysicalType::Int32, 3).unwrap();
        builder.set(0, Value::Int32(5)).unwrap();
        builder.set(1, Value::Null).unwrap();
        builder.set(2, Value::Int8(-1)).unwrap();
        let column = builder.finish();

        assert_eq!(column.data(), &ReturnData::Int32(vec![5, 0, -1]));
        assert!(column.is_valid(0));
        assert!(!column.is_valid(1));
        assert_eq!(column.null_count(), 1);
        assert_eq!(column.value(1), Some(Value::Null));
        assert_eq!(column.value(3), None);
    }

    #[test]
    fn test_integer_out_of_range_is_mismatch() {
        let mut builder = ReturnBuilder::allocate(PhysicalType::Int8, 1).unwrap();
        let err = builder.set(0, Value::Int64(1_000)).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ResultTypeMismatch {
                row: 0,
                expected: PhysicalType::Int8,
                actual: "INT64"
            }
        ));
    }

    #[test]
    fn test_string_into_numeric_is_mismatch() {
        let mut builder = ReturnBuilder::allocate(PhysicalType::Double, 1).unwrap();
        assert!(builder.set(0, Value::Varchar("1.5".into())).is_err());

        let mut builder = ReturnBuilder::allocate(PhysicalType::Varchar, 1).unwrap();
        assert!(builder.set(0, Value::Int32(1)).is_err());
    }

    #[test]
    fn test_double_accepts_integers() {
        let mut builder = ReturnBuilder::allocate(PhysicalType::Double, 2).unwrap();
        builder.set(0, Value::Int32(2)).unwrap();
        builder.set(1, Value::Double(0.5)).unwrap();
        assert_eq!(builder.finish().data(), &ReturnData::Double(vec![2.0, 0.5]));
    }

    #[test]
    fn test_temporal_value_keeps_type() {
        let mut builder = ReturnBuilder::allocate(PhysicalType::Date64, 1).unwrap();
        builder.set(0, Value::Date64(86_400_000)).unwrap();
        assert_eq!(builder.finish().value(0), Some(Value::Date64(86_400_000)));
    }

    #[test]
    fn test_into_arrow_as_keeps_unit_and_timezone() {
        let mut builder = ReturnBuilder::allocate(PhysicalType::Timestamp, 1).unwrap();
        builder.set(0, Value::Timestamp(1_500)).unwrap();
        let data_type = ArrowDataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()));

        let array = builder.finish().into_arrow_as(&data_type).unwrap();

        assert_eq!(array.data_type(), &data_type);
        assert_eq!(array.as_primitive::<TimestampMillisecondType>().value(0), 1_500);
    }

    #[test]
    fn test_into_arrow_as_rejects_other_physical_type() {
        let builder = ReturnBuilder::allocate(PhysicalType::Int64, 1).unwrap();
        let err = builder
            .finish()
            .into_arrow_as(&ArrowDataType::Timestamp(TimeUnit::Second, None))
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedArrowType(_)));
    }

    #[test]
    fn test_into_arrow_primitive() {
        let mut builder = ReturnBuilder::allocate(PhysicalType::Int32, 2).unwrap();
        builder.set(0, Value::Int32(9)).unwrap();
        builder.set(1, Value::Null).unwrap();
        let array = builder.finish().into_arrow().unwrap();

        let array = array.as_primitive::<Int32Type>();
        assert_eq!(array.value(0), 9);
        assert!(array.is_null(1));
    }

    #[test]
    fn test_into_arrow_varchar() {
        let mut builder = ReturnBuilder::allocate(PhysicalType::Varchar, 2).unwrap();
        builder.set(0, Value::Null).unwrap();
        builder.set(1, Value::Varchar("hi".into())).unwrap();
        let array = builder.finish().into_arrow().unwrap();

        let array = array.as_string::<i32>();
        assert!(array.is_null(0));
        assert_eq!(array.value(1), "hi");
    }
}
