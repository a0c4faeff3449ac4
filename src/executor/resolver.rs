//! Per-argument row resolvers.

use arrow::array::{BinaryArray, StringArray};
use arrow::buffer::NullBuffer;
use tracing::trace;

use crate::column::{Column, ColumnData};
use crate::error::{BridgeError, Result};
use crate::types::{Datum, PhysicalType, Record};

/// Typed view over one column's buffer.
enum Source<'a> {
    Int8(&'a [i8]),
    Int16(&'a [i16]),
    Int32(&'a [i32]),
    /// Shared by `INT64`, `DATE64`, `TIME64` and `TIMESTAMP`; `wrap` picks the variant.
    Int64 {
        values: &'a [i64],
        wrap: fn(i64) -> Datum<'a>,
    },
    UInt64(&'a [u64]),
    Double(&'a [f64]),
    Blob(&'a BinaryArray),
    Varchar(&'a StringArray),
    Struct {
        children: Vec<Resolver<'a>>,
        names: Vec<&'a str>,
        /// Record parked here while the argument slot holds a null row.
        spare: Option<Record<'a>>,
    },
}

/// Maps a row index to one column's value for that row.
///
/// Built once per column and reused for every row of the batch. Values are
/// written into a caller-owned slot so that a struct column keeps reusing a
/// single [`Record`] instead of allocating per row.
pub struct Resolver<'a> {
    validity: Option<&'a NullBuffer>,
    source: Source<'a>,
}

impl<'a> Resolver<'a> {
    /// Builds a resolver for `column`, checking that it can serve `row_count` rows.
    ///
    /// # Errors
    ///
    /// Returns `MalformedColumn` if a non-struct column has no data buffer, a
    /// buffer of the wrong kind, or a buffer or bitmap shorter than
    /// `row_count`; or if a struct column has no children.
    pub fn new(column: &'a Column, row_count: usize) -> Result<Self> {
        let physical_type = column.physical_type();
        let malformed = |reason: String| BridgeError::MalformedColumn {
            physical_type,
            reason,
        };

        let validity = column.validity();
        if let Some(bitmap) = validity {
            if bitmap.len() < row_count {
                return Err(malformed(format!(
                    "validity bitmap of column '{}' has {} entries, expected {row_count}",
                    column.name(),
                    bitmap.len()
                )));
            }
        }

        let source = match physical_type {
            PhysicalType::Struct => {
                if column.children().is_empty() {
                    return Err(malformed(format!(
                        "struct column '{}' has no children",
                        column.name()
                    )));
                }
                let children = column
                    .children()
                    .iter()
                    .map(|child| Resolver::new(child, row_count))
                    .collect::<Result<Vec<_>>>()?;
                let names = column.children().iter().map(Column::name).collect();
                Source::Struct {
                    children,
                    names,
                    spare: None,
                }
            }
            _ => {
                let data = column.data().ok_or_else(|| {
                    malformed(format!(
                        "expected data buffer for argument of type {physical_type}"
                    ))
                })?;
                if !data.fits(physical_type) {
                    return Err(malformed(format!(
                        "column '{}' carries a {} buffer",
                        column.name(),
                        data.kind_name()
                    )));
                }
                if data.len() < row_count {
                    return Err(malformed(format!(
                        "column '{}' has {} values, expected {row_count}",
                        column.name(),
                        data.len()
                    )));
                }
                Self::leaf(physical_type, data)
            }
        };

        trace!(column = column.name(), %physical_type, row_count, "built resolver");
        Ok(Resolver { validity, source })
    }

    fn leaf(physical_type: PhysicalType, data: &'a ColumnData) -> Source<'a> {
        match data {
            ColumnData::Int8(values) => Source::Int8(values),
            ColumnData::Int16(values) => Source::Int16(values),
            ColumnData::Int32(values) => Source::Int32(values),
            ColumnData::Int64(values) => {
                let wrap: fn(i64) -> Datum<'a> = match physical_type {
                    PhysicalType::Date64 => Datum::Date64,
                    PhysicalType::Time64 => Datum::Time64,
                    PhysicalType::Timestamp => Datum::Timestamp,
                    _ => Datum::Int64,
                };
                Source::Int64 { values, wrap }
            }
            ColumnData::UInt64(values) => Source::UInt64(values),
            ColumnData::Double(values) => Source::Double(values),
            ColumnData::Blob(array) => Source::Blob(array),
            ColumnData::Varchar(array) => Source::Varchar(array),
        }
    }

    /// Writes the value of `row` into `slot`.
    ///
    /// For a struct column the slot ends up holding the resolver's single
    /// scratch record, overwritten field by field; children are not visited
    /// for null rows.
    pub fn resolve(&mut self, row: usize, slot: &mut Datum<'a>) {
        if self.validity.is_some_and(|v| v.is_null(row)) {
            self.release(slot);
            return;
        }

        match &mut self.source {
            Source::Int8(values) => *slot = Datum::Int8(values[row]),
            Source::Int16(values) => *slot = Datum::Int16(values[row]),
            Source::Int32(values) => *slot = Datum::Int32(values[row]),
            Source::Int64 { values, wrap } => *slot = (*wrap)(values[row]),
            Source::UInt64(values) => *slot = Datum::UInt64(values[row]),
            Source::Double(values) => *slot = Datum::Double(values[row]),
            Source::Blob(array) => *slot = Datum::Blob((*array).value(row)),
            Source::Varchar(array) => *slot = Datum::Varchar((*array).value(row)),
            Source::Struct {
                children,
                names,
                spare,
            } => {
                if !matches!(slot, Datum::Struct(_)) {
                    let record = spare
                        .take()
                        .unwrap_or_else(|| Record::with_names(names.iter().copied()));
                    *slot = Datum::Struct(record);
                }
                if let Datum::Struct(record) = slot {
                    for (child, field) in children.iter_mut().zip(record.slots_mut()) {
                        child.resolve(row, field);
                    }
                }
            }
        }
    }

    /// Sets `slot` to null, keeping a struct record for reuse.
    fn release(&mut self, slot: &mut Datum<'a>) {
        if let (Datum::Struct(record), Source::Struct { spare, .. }) =
            (std::mem::take(slot), &mut self.source)
        {
            *spare = Some(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_all(column: &Column, rows: usize) -> Vec<Datum<'_>> {
        let mut resolver = Resolver::new(column, rows).unwrap();
        (0..rows)
            .map(|row| {
                let mut slot = Datum::Null;
                resolver.resolve(row, &mut slot);
                slot
            })
            .collect()
    }

    #[test]
    fn test_resolve_without_validity() {
        let col = Column::new("x", PhysicalType::Int32, vec![4, 5, 6]);
        assert_eq!(
            resolve_all(&col, 3),
            vec![Datum::Int32(4), Datum::Int32(5), Datum::Int32(6)]
        );
    }

    #[test]
    fn test_resolve_respects_validity() {
        let col = Column::new("x", PhysicalType::Varchar, vec!["a", "b", "c"])
            .with_validity(vec![true, false, true]);
        assert_eq!(
            resolve_all(&col, 3),
            vec![Datum::Varchar("a"), Datum::Null, Datum::Varchar("c")]
        );
    }

    #[test]
    fn test_resolve_temporal_variants() {
        let col = Column::new("d", PhysicalType::Date64, vec![86_400_000_i64]);
        assert_eq!(resolve_all(&col, 1), vec![Datum::Date64(86_400_000)]);

        let col = Column::new("t", PhysicalType::Timestamp, vec![7_i64]);
        assert_eq!(resolve_all(&col, 1), vec![Datum::Timestamp(7)]);
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let col = Column::from_parts("x", PhysicalType::Double, None, None, Vec::new());
        let err = Resolver::new(&col, 1).err().unwrap();
        match err {
            BridgeError::MalformedColumn { physical_type, .. } => {
                assert_eq!(physical_type, PhysicalType::Double);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_wrong_buffer_kind_is_malformed() {
        let col = Column::new("x", PhysicalType::UInt64, vec![1_i64]);
        assert!(matches!(
            Resolver::new(&col, 1),
            Err(BridgeError::MalformedColumn { .. })
        ));
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        let col = Column::new("x", PhysicalType::Int8, vec![1_i8]);
        assert!(matches!(
            Resolver::new(&col, 2),
            Err(BridgeError::MalformedColumn { .. })
        ));
    }

    #[test]
    fn test_short_validity_is_malformed() {
        let col = Column::new("x", PhysicalType::Int32, vec![1, 2]).with_validity(vec![true]);
        let err = Resolver::new(&col, 2).err().unwrap();
        assert!(matches!(
            err,
            BridgeError::MalformedColumn {
                physical_type: PhysicalType::Int32,
                ..
            }
        ));
        assert!(err.to_string().contains("validity bitmap"));
    }

    #[test]
    fn test_short_struct_validity_is_malformed() {
        let col = Column::new_struct(
            "s",
            vec![Column::new("a", PhysicalType::Int32, vec![1, 2])],
        )
        .with_validity(vec![true]);
        assert!(matches!(
            Resolver::new(&col, 2),
            Err(BridgeError::MalformedColumn {
                physical_type: PhysicalType::Struct,
                ..
            })
        ));
    }

    #[test]
    fn test_struct_without_children_is_malformed() {
        let col = Column::new_struct("s", Vec::new());
        assert!(matches!(
            Resolver::new(&col, 0),
            Err(BridgeError::MalformedColumn { .. })
        ));
    }

    #[test]
    fn test_struct_record_is_reused_across_rows() {
        let col = Column::new_struct(
            "s",
            vec![
                Column::new("a", PhysicalType::Int32, vec![1, 2, 3]),
                Column::new("b", PhysicalType::Varchar, vec!["x", "y", "z"]),
            ],
        )
        .with_validity(vec![true, false, true]);

        let mut resolver = Resolver::new(&col, 3).unwrap();
        let mut slot = Datum::Null;

        resolver.resolve(0, &mut slot);
        let record = slot.as_record().unwrap();
        assert_eq!(record.get("a"), Some(&Datum::Int32(1)));
        assert_eq!(record.get("b"), Some(&Datum::Varchar("x")));

        resolver.resolve(1, &mut slot);
        assert!(slot.is_null());

        resolver.resolve(2, &mut slot);
        let record = slot.as_record().unwrap();
        assert_eq!(record.get("a"), Some(&Datum::Int32(3)));
        assert_eq!(record.get("b"), Some(&Datum::Varchar("z")));
    }

    #[test]
    fn test_nested_struct_child_nulls() {
        let inner = Column::new_struct(
            "inner",
            vec![Column::new("v", PhysicalType::Int64, vec![10_i64, 20])],
        )
        .with_validity(vec![false, true]);
        let col = Column::new_struct("outer", vec![inner]);

        let values = resolve_all(&col, 2);
        let first = values[0].as_record().unwrap();
        assert!(first.get("inner").unwrap().is_null());
        let second = values[1].as_record().unwrap();
        let inner = second.get("inner").unwrap().as_record().unwrap();
        assert_eq!(inner.get("v"), Some(&Datum::Int64(20)));
    }
}
