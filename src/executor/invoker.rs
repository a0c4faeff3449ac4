//! Row-by-row invocation of a scalar function over a batch.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::error::{panic_message, BridgeError, Result, UdfException};
use crate::function::ScalarFunction;
use crate::types::{Datum, Value};

use super::batch::Batch;
use super::output::{ReturnBuilder, ReturnColumn};
use super::resolver::Resolver;
use super::BridgeConfig;

/// Runs a scalar function over every row of a batch.
///
/// One invocation is synchronous and owns the batch and its output buffers
/// for its whole duration.
#[derive(Debug, Clone, Default)]
pub struct BatchInvoker {
    config: BridgeConfig,
}

impl BatchInvoker {
    /// Creates an invoker with the given configuration.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        BatchInvoker { config }
    }

    /// Returns the invoker configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Invokes `function` for every row of `batch` and returns the populated
    /// return column.
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole batch and is returned as a
    /// [`UdfException`]; no partial result is returned.
    pub fn invoke<F>(
        &self,
        function: &F,
        batch: Batch,
    ) -> std::result::Result<ReturnColumn, UdfException>
    where
        F: ScalarFunction + ?Sized,
    {
        debug!(
            rows = batch.row_count(),
            arity = batch.arity(),
            return_type = %batch.return_type(),
            "invoking scalar function"
        );
        match self.run(function, &batch) {
            Ok(output) => {
                debug!(nulls = output.null_count(), "scalar function batch finished");
                Ok(output)
            }
            Err(err) => {
                warn!(error = %err, "scalar function batch aborted");
                Err(UdfException::from(err))
            }
        }
    }

    fn run<F>(&self, function: &F, batch: &Batch) -> Result<ReturnColumn>
    where
        F: ScalarFunction + ?Sized,
    {
        let row_count = batch.row_count();

        let mut resolvers = batch
            .args()
            .iter()
            .map(|column| Resolver::new(column, row_count))
            .collect::<Result<Vec<_>>>()?;

        let mut output = ReturnBuilder::allocate(batch.return_type(), row_count)?;

        if let Some(expected) = function.arity() {
            if expected != resolvers.len() {
                return Err(BridgeError::ArityMismatch {
                    expected,
                    actual: resolvers.len(),
                });
            }
        }

        let mut args = vec![Datum::Null; resolvers.len()];
        for row in 0..row_count {
            for (resolver, slot) in resolvers.iter_mut().zip(args.iter_mut()) {
                resolver.resolve(row, slot);
            }
            let result = self.call(function, &args, row)?;
            output.set(row, result)?;
        }

        Ok(output.finish())
    }

    fn call<F>(&self, function: &F, args: &[Datum<'_>], row: usize) -> Result<Value>
    where
        F: ScalarFunction + ?Sized,
    {
        let outcome = if self.config.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| function.call(args))).map_err(|payload| {
                BridgeError::UserFunctionFailure {
                    row,
                    message: panic_message(payload.as_ref()),
                }
            })?
        } else {
            function.call(args)
        };

        outcome.map_err(|err| BridgeError::UserFunctionFailure {
            row,
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::executor::ReturnData;
    use crate::function::from_fn;
    use crate::types::PhysicalType;

    #[test]
    fn test_invoke_identity() {
        let batch = Batch::new(
            vec![Column::new("x", PhysicalType::Int64, vec![1_i64, 2, 3])],
            PhysicalType::Int64,
            3,
        );
        let identity = from_fn(|args| Ok(args[0].to_value()));
        let ret = BatchInvoker::default().invoke(&identity, batch).unwrap();
        assert_eq!(ret.data(), &ReturnData::Int64(vec![1, 2, 3]));
        assert_eq!(ret.null_count(), 0);
    }

    #[test]
    fn test_user_error_aborts_batch() {
        let batch = Batch::new(
            vec![Column::new("x", PhysicalType::Int32, vec![1, 0, 2])],
            PhysicalType::Int32,
            3,
        );
        let divide = from_fn(|args| match args[0].as_int32() {
            Some(0) => Err("division by zero".into()),
            Some(v) => Ok(Value::Int32(10 / v)),
            None => Ok(Value::Null),
        });
        let err = BatchInvoker::default().invoke(&divide, batch).unwrap_err();
        assert_eq!(err.message, "division by zero");
    }

    #[test]
    fn test_panic_is_captured() {
        let batch = Batch::new(
            vec![Column::new("x", PhysicalType::Int32, vec![1])],
            PhysicalType::Int32,
            1,
        );
        let boom = from_fn(|_| panic!("user code panicked"));
        let err = BatchInvoker::default().invoke(&boom, batch).unwrap_err();
        assert_eq!(err.message, "user code panicked");
    }

    #[test]
    fn test_declared_arity_is_checked() {
        let batch = Batch::new(
            vec![Column::new("x", PhysicalType::Int32, vec![1])],
            PhysicalType::Int32,
            1,
        );
        let binary = from_fn(|_| Ok(Value::Null)).with_arity(2);
        let err = BatchInvoker::default().invoke(&binary, batch).unwrap_err();
        assert!(err.message.contains("Arity mismatch"));
    }

    #[test]
    fn test_zero_rows() {
        let batch = Batch::new(
            vec![Column::new("x", PhysicalType::Varchar, Vec::<String>::new())],
            PhysicalType::Varchar,
            0,
        );
        let upper = from_fn(|args| Ok(args[0].as_str().map(str::to_uppercase).into()));
        let ret = BatchInvoker::default().invoke(&upper, batch).unwrap();
        assert!(ret.is_empty());
    }
}
