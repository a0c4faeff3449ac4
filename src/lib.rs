//! udf-bridge - vectorized scalar function bridge
//!
//! Runs user-supplied, row-oriented scalar functions over columnar batches.
//! Argument columns are resolved row by row into borrowed [`Datum`] values,
//! results are written into a typed [`ReturnColumn`] with a validity bitmap,
//! and every failure reaches the caller as a single [`UdfException`] shape.

pub mod column;
pub mod datafusion;
pub mod error;
pub mod executor;
pub mod function;
pub mod types;

pub use column::{Column, ColumnData};
pub use error::{BridgeError, Result, UdfException, UDF_EXCEPTION_NAME};
pub use executor::{invoke, Batch, BatchInvoker, BridgeConfig, ReturnColumn, ReturnData};
pub use function::{from_fn, FunctionRegistry, ScalarFunction};
pub use types::{Datum, PhysicalType, Record, Value};
