//! User-supplied scalar functions and their registry.

mod registry;

pub use registry::{FunctionRegistry, RegisteredFunction};

use crate::types::{Datum, Value};

/// Error a user function may return for a row.
pub type FunctionError = Box<dyn std::error::Error + Send + Sync>;

/// Result of calling a user function on one row.
pub type FunctionResult = std::result::Result<Value, FunctionError>;

/// A scalar function callable on one row of positional arguments.
///
/// Arguments borrow from the batch and must not be retained past the call;
/// return `Value::Null` for a null result. Implementations must not block on
/// other invocations: each batch calls the function sequentially on one
/// thread.
pub trait ScalarFunction: Send + Sync {
    /// Computes the result for one row.
    ///
    /// # Errors
    ///
    /// An error aborts the batch being processed.
    fn call(&self, args: &[Datum<'_>]) -> FunctionResult;

    /// Number of arguments the function accepts, if fixed.
    fn arity(&self) -> Option<usize> {
        None
    }
}

/// A [`ScalarFunction`] backed by a closure.
pub struct FnFunction<F> {
    f: F,
    arity: Option<usize>,
}

impl<F> FnFunction<F> {
    /// Declares the number of arguments the closure expects.
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }
}

impl<F> std::fmt::Debug for FnFunction<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFunction")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl<F> ScalarFunction for FnFunction<F>
where
    F: Fn(&[Datum<'_>]) -> FunctionResult + Send + Sync,
{
    fn call(&self, args: &[Datum<'_>]) -> FunctionResult {
        (self.f)(args)
    }

    fn arity(&self) -> Option<usize> {
        self.arity
    }
}

/// Wraps a closure as a [`ScalarFunction`].
///
/// ```
/// use udf_bridge::function::{from_fn, ScalarFunction};
/// use udf_bridge::{Datum, Value};
///
/// let times_ten = from_fn(|args| Ok(args[0].as_int32().map(|x| x * 10).into())).with_arity(1);
/// assert_eq!(times_ten.call(&[Datum::Int32(4)]).unwrap(), Value::Int32(40));
/// ```
pub fn from_fn<F>(f: F) -> FnFunction<F>
where
    F: Fn(&[Datum<'_>]) -> FunctionResult + Send + Sync,
{
    FnFunction { f, arity: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_calls_closure() {
        let add = from_fn(|args| {
            let sum = args.iter().filter_map(Datum::as_int64).sum::<i64>();
            Ok(Value::Int64(sum))
        });
        let result = add.call(&[Datum::Int64(2), Datum::Int32(3)]).unwrap();
        assert_eq!(result, Value::Int64(5));
        assert_eq!(add.arity(), None);
    }

    #[test]
    fn test_with_arity() {
        let f = from_fn(|_| Ok(Value::Null)).with_arity(3);
        assert_eq!(f.arity(), Some(3));
    }

    #[test]
    fn test_error_propagates() {
        let f = from_fn(|_| Err("nope".into()));
        let err = f.call(&[]).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
