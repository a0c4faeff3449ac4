//! Row values passed into and returned from scalar functions.

use super::PhysicalType;

/// Owned value returned by a scalar function.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 8-bit signed integer value.
    Int8(i8),
    /// 16-bit signed integer value.
    Int16(i16),
    /// 32-bit signed integer value.
    Int32(i32),
    /// 64-bit signed integer value.
    Int64(i64),
    /// 64-bit unsigned integer value.
    UInt64(u64),
    /// 64-bit floating point value.
    Double(f64),
    /// Date value (milliseconds since Unix epoch).
    Date64(i64),
    /// Time of day value.
    Time64(i64),
    /// Timestamp value.
    Timestamp(i64),
    /// Byte payload.
    Blob(Vec<u8>),
    /// String value.
    Varchar(String),
    /// Record of named fields, in declared order.
    Struct(Vec<(String, Value)>),
    /// Null value.
    Null,
}

impl Value {
    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the physical type of this value, or None for Null.
    #[must_use]
    pub fn physical_type(&self) -> Option<PhysicalType> {
        match self {
            Value::Int8(_) => Some(PhysicalType::Int8),
            Value::Int16(_) => Some(PhysicalType::Int16),
            Value::Int32(_) => Some(PhysicalType::Int32),
            Value::Int64(_) => Some(PhysicalType::Int64),
            Value::UInt64(_) => Some(PhysicalType::UInt64),
            Value::Double(_) => Some(PhysicalType::Double),
            Value::Date64(_) => Some(PhysicalType::Date64),
            Value::Time64(_) => Some(PhysicalType::Time64),
            Value::Timestamp(_) => Some(PhysicalType::Timestamp),
            Value::Blob(_) => Some(PhysicalType::Blob),
            Value::Varchar(_) => Some(PhysicalType::Varchar),
            Value::Struct(_) => Some(PhysicalType::Struct),
            Value::Null => None,
        }
    }

    /// Returns the tag naming this value's kind, `"NULL"` for Null.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.physical_type().map_or("NULL", |ty| ty.name())
    }

    /// Attempts to extract an i64, widening any signed integer or temporal value.
    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(i64::from(v)),
            Value::Int16(v) => Some(i64::from(v)),
            Value::Int32(v) => Some(i64::from(v)),
            Value::Int64(v) | Value::Date64(v) | Value::Time64(v) | Value::Timestamp(v) => Some(v),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Attempts to extract an f64 value.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to extract a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Looks up a struct field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

macro_rules! impl_from_native {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$native> for Value {
                fn from(v: $native) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_native! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
    String => Varchar,
    Vec<u8> => Blob,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Argument value for one row, borrowed from the batch's column buffers.
///
/// Strings and blobs point straight into the column, so resolving a row does
/// not allocate.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Datum<'a> {
    /// Null value.
    #[default]
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Date64(i64),
    Time64(i64),
    Timestamp(i64),
    Blob(&'a [u8]),
    Varchar(&'a str),
    /// Current row of a struct column. See [`Record`] for retention rules.
    Struct(Record<'a>),
}

impl<'a> Datum<'a> {
    /// Returns true if this datum is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Attempts to extract an i32, widening narrower integers.
    #[must_use]
    pub fn as_int32(&self) -> Option<i32> {
        match *self {
            Datum::Int8(v) => Some(i32::from(v)),
            Datum::Int16(v) => Some(i32::from(v)),
            Datum::Int32(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to extract an i64, widening any signed integer or temporal value.
    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match *self {
            Datum::Int8(v) => Some(i64::from(v)),
            Datum::Int16(v) => Some(i64::from(v)),
            Datum::Int32(v) => Some(i64::from(v)),
            Datum::Int64(v) | Datum::Date64(v) | Datum::Time64(v) | Datum::Timestamp(v) => {
                Some(v)
            }
            _ => None,
        }
    }

    /// Attempts to extract a u64 value.
    #[must_use]
    pub fn as_uint64(&self) -> Option<u64> {
        match self {
            Datum::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract an f64 value.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Datum::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Datum::Varchar(s) => Some(*s),
            _ => None,
        }
    }

    /// Attempts to extract a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Datum::Blob(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to view this datum as a struct record.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record<'a>> {
        match self {
            Datum::Struct(record) => Some(record),
            _ => None,
        }
    }

    /// Copies this datum into an owned [`Value`].
    ///
    /// This is the only way to keep a struct row beyond the current call and
    /// allocates once per call.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Datum::Null => Value::Null,
            Datum::Int8(v) => Value::Int8(*v),
            Datum::Int16(v) => Value::Int16(*v),
            Datum::Int32(v) => Value::Int32(*v),
            Datum::Int64(v) => Value::Int64(*v),
            Datum::UInt64(v) => Value::UInt64(*v),
            Datum::Double(v) => Value::Double(*v),
            Datum::Date64(v) => Value::Date64(*v),
            Datum::Time64(v) => Value::Time64(*v),
            Datum::Timestamp(v) => Value::Timestamp(*v),
            Datum::Blob(b) => Value::Blob(b.to_vec()),
            Datum::Varchar(s) => Value::Varchar((*s).to_string()),
            Datum::Struct(record) => record.to_value(),
        }
    }
}

/// The current row of a struct column.
///
/// A struct column's resolver writes every row into the same record, so the
/// record is only meaningful for the duration of one function call. Arguments
/// are handed to functions as a borrowed slice, which makes holding on to a
/// record past the call a compile error; use [`Record::to_value`] to keep a
/// copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record<'a> {
    fields: Vec<(&'a str, Datum<'a>)>,
}

impl<'a> Record<'a> {
    /// Creates a record with the given field names, all set to null.
    #[must_use]
    pub fn with_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Record {
            fields: names.into_iter().map(|name| (name, Datum::Null)).collect(),
        }
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Gets a field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Datum<'a>> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Gets a field value by position.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Datum<'a>> {
        self.fields.get(index).map(|(_, v)| v)
    }

    /// Returns an iterator over field names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &Datum<'a>)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    /// Mutable access to the field slots, in declared order.
    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Datum<'a>> {
        self.fields.iter_mut().map(|(_, v)| v)
    }

    /// Copies the record into an owned struct [`Value`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Struct(
            self.fields
                .iter()
                .map(|(name, datum)| ((*name).to_string(), datum.to_value()))
                .collect(),
        )
    }
}
