//! `ScalarUDFImpl` adapter that runs a bridged function inside DataFusion.

use std::any::Any;
use std::sync::Arc;

use arrow::datatypes::DataType as ArrowDataType;
use datafusion::error::{DataFusionError, Result as DfResult};
use datafusion::logical_expr::{ColumnarValue, ScalarUDF, ScalarUDFImpl, Signature, Volatility};

use crate::error::{BridgeError, Result};
use crate::executor::{Batch, BatchInvoker, BridgeConfig};
use crate::function::ScalarFunction;
use crate::types::PhysicalType;

/// A bridged scalar function exposed to DataFusion.
pub struct BridgeUdf {
    name: String,
    signature: Signature,
    return_type: PhysicalType,
    arrow_return_type: ArrowDataType,
    function: Arc<dyn ScalarFunction>,
    invoker: BatchInvoker,
}

impl BridgeUdf {
    /// Creates a UDF with an exact signature over `arg_types`.
    ///
    /// A `TIME64` or `TIMESTAMP` return type takes the Arrow type of the first
    /// argument with the same physical type, so its unit and timezone carry
    /// through; without one it defaults to microseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The return type has no Arrow buffer (`STRUCT`)
    /// - An argument type has no column representation
    /// - The function declares an arity different from `arg_types.len()`
    pub fn try_new(
        name: &str,
        arg_types: Vec<ArrowDataType>,
        return_type: PhysicalType,
        function: Arc<dyn ScalarFunction>,
        config: BridgeConfig,
    ) -> Result<Self> {
        let inherited = match return_type {
            PhysicalType::Time64 | PhysicalType::Timestamp => arg_types
                .iter()
                .find(|ty| PhysicalType::from_arrow(ty) == Some(return_type))
                .cloned(),
            _ => None,
        };
        let arrow_return_type = inherited
            .or_else(|| return_type.to_arrow())
            .ok_or(BridgeError::UnsupportedReturnType(return_type))?;

        Self::with_arrow_return_type(name, arg_types, arrow_return_type, function, config)
    }

    /// Creates a UDF whose result has exactly `arrow_return_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `arrow_return_type` has no return buffer (`STRUCT` or unsupported)
    /// - An argument type has no column representation
    /// - The function declares an arity different from `arg_types.len()`
    pub fn with_arrow_return_type(
        name: &str,
        arg_types: Vec<ArrowDataType>,
        arrow_return_type: ArrowDataType,
        function: Arc<dyn ScalarFunction>,
        config: BridgeConfig,
    ) -> Result<Self> {
        let return_type = PhysicalType::from_arrow(&arrow_return_type)
            .ok_or_else(|| BridgeError::UnsupportedArrowType(arrow_return_type.to_string()))?;
        if return_type == PhysicalType::Struct {
            return Err(BridgeError::UnsupportedReturnType(return_type));
        }

        if let Some(unsupported) = arg_types
            .iter()
            .find(|ty| PhysicalType::from_arrow(ty).is_none())
        {
            return Err(BridgeError::UnsupportedArrowType(unsupported.to_string()));
        }

        if let Some(expected) = function.arity() {
            if expected != arg_types.len() {
                return Err(BridgeError::ArityMismatch {
                    expected,
                    actual: arg_types.len(),
                });
            }
        }

        Ok(BridgeUdf {
            name: name.to_string(),
            signature: Signature::exact(arg_types, Volatility::Immutable),
            return_type,
            arrow_return_type,
            function,
            invoker: BatchInvoker::new(config),
        })
    }

    /// Returns the declared return type.
    #[must_use]
    pub fn return_physical_type(&self) -> PhysicalType {
        self.return_type
    }

    /// Returns the Arrow type of the result column.
    #[must_use]
    pub fn arrow_return_type(&self) -> &ArrowDataType {
        &self.arrow_return_type
    }

    /// Wraps this adapter into a DataFusion `ScalarUDF`.
    #[must_use]
    pub fn into_scalar_udf(self) -> ScalarUDF {
        ScalarUDF::new_from_impl(self)
    }
}

impl std::fmt::Debug for BridgeUdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeUdf")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

fn external(err: impl std::error::Error + Send + Sync + 'static) -> DataFusionError {
    DataFusionError::External(Box::new(err))
}

impl ScalarUDFImpl for BridgeUdf {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _arg_types: &[ArrowDataType]) -> DfResult<ArrowDataType> {
        Ok(self.arrow_return_type.clone())
    }

    fn invoke_batch(&self, args: &[ColumnarValue], number_rows: usize) -> DfResult<ColumnarValue> {
        let arrays = args
            .iter()
            .map(|arg| arg.clone().into_array(number_rows))
            .collect::<DfResult<Vec<_>>>()?;

        let batch = Batch::from_arrow(&arrays, self.return_type, number_rows).map_err(external)?;
        let output = self
            .invoker
            .invoke(self.function.as_ref(), batch)
            .map_err(external)?;

        let array = output
            .into_arrow_as(&self.arrow_return_type)
            .map_err(external)?;
        Ok(ColumnarValue::Array(array))
    }
}
