//! Batch descriptor handed to the invoker.

use arrow::array::ArrayRef;

use crate::column::Column;
use crate::error::Result;
use crate::types::PhysicalType;

/// One columnar unit of work: argument columns, declared return type and row count.
///
/// A batch is moved into [`BatchInvoker::invoke`](super::BatchInvoker::invoke)
/// and consumed there; the populated return column comes back instead.
#[derive(Debug, Clone)]
pub struct Batch {
    args: Vec<Column>,
    return_type: PhysicalType,
    row_count: usize,
}

impl Batch {
    /// Creates a new batch.
    #[must_use]
    pub fn new(args: Vec<Column>, return_type: PhysicalType, row_count: usize) -> Self {
        Batch {
            args,
            return_type,
            row_count,
        }
    }

    /// Creates a batch from Arrow arrays, naming the arguments `arg0`, `arg1`, ...
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArrowType` if any array has no column representation.
    pub fn from_arrow(
        arrays: &[ArrayRef],
        return_type: PhysicalType,
        row_count: usize,
    ) -> Result<Self> {
        let args = arrays
            .iter()
            .enumerate()
            .map(|(i, array)| Column::from_arrow(format!("arg{i}"), array.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Batch::new(args, return_type, row_count))
    }

    /// Returns the argument columns in declared order.
    #[must_use]
    pub fn args(&self) -> &[Column] {
        &self.args
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Returns the declared return type.
    #[must_use]
    pub fn return_type(&self) -> PhysicalType {
        self.return_type
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};

    #[test]
    fn test_batch_from_arrow() {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![1, 2])),
            Arc::new(StringArray::from(vec!["a", "b"])),
        ];
        let batch = Batch::from_arrow(&arrays, PhysicalType::Varchar, 2).unwrap();
        assert_eq!(batch.arity(), 2);
        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.args()[0].name(), "arg0");
        assert_eq!(batch.args()[1].physical_type(), PhysicalType::Varchar);
        assert_eq!(batch.return_type(), PhysicalType::Varchar);
    }
}
