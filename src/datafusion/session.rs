//! DataFusion session with bridged scalar functions.

use std::sync::Arc;

use arrow::datatypes::DataType as ArrowDataType;
use arrow::record_batch::RecordBatch;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::SessionConfig;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::executor::BridgeConfig;
use crate::function::{FunctionRegistry, ScalarFunction};
use crate::types::PhysicalType;

use super::udf::BridgeUdf;

/// Binding layer that exposes registered functions to SQL queries.
///
/// Keeps its own [`FunctionRegistry`] in step with the `DataFusion` session,
/// so the same functions can also be called directly on a batch.
pub struct UdfSession {
    /// `DataFusion` session context.
    ctx: SessionContext,
    /// Functions registered through this session.
    registry: FunctionRegistry,
    /// Bridge configuration.
    config: BridgeConfig,
}

impl Default for UdfSession {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl UdfSession {
    /// Creates a session with the configured batch size.
    ///
    /// A batch size of zero is raised to one.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let session_config = SessionConfig::new().with_batch_size(config.batch_size.max(1));
        UdfSession {
            ctx: SessionContext::new_with_config(session_config),
            registry: FunctionRegistry::with_config(config.clone()),
            config,
        }
    }

    /// Returns the underlying session context.
    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Returns the functions registered through this session.
    #[must_use]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Returns the bridge configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Registers `function` under `name` for SQL use.
    ///
    /// # Errors
    ///
    /// Returns an error if the return tag is unknown or unsupported, an
    /// argument type is unsupported, the declared arity disagrees with
    /// `arg_types`, or the name is already registered.
    pub fn register<F>(
        &mut self,
        name: &str,
        arg_types: Vec<ArrowDataType>,
        return_type_tag: &str,
        function: F,
    ) -> Result<()>
    where
        F: ScalarFunction + 'static,
    {
        let return_type = return_type_tag.parse::<PhysicalType>()?;
        let function: Arc<dyn ScalarFunction> = Arc::new(function);
        let udf = BridgeUdf::try_new(
            name,
            arg_types,
            return_type,
            Arc::clone(&function),
            self.config.clone(),
        )?;
        self.expose(name, udf, function)
    }

    /// Registers `function` under `name` with an exact Arrow result type.
    ///
    /// Use this to pick the unit or timezone of a `TIME64` or `TIMESTAMP`
    /// result.
    ///
    /// # Errors
    ///
    /// Returns an error if the return or an argument type is unsupported, the
    /// declared arity disagrees with `arg_types`, or the name is already
    /// registered.
    pub fn register_with_return_type<F>(
        &mut self,
        name: &str,
        arg_types: Vec<ArrowDataType>,
        return_type: ArrowDataType,
        function: F,
    ) -> Result<()>
    where
        F: ScalarFunction + 'static,
    {
        let function: Arc<dyn ScalarFunction> = Arc::new(function);
        let udf = BridgeUdf::with_arrow_return_type(
            name,
            arg_types,
            return_type,
            Arc::clone(&function),
            self.config.clone(),
        )?;
        self.expose(name, udf, function)
    }

    fn expose(
        &mut self,
        name: &str,
        udf: BridgeUdf,
        function: Arc<dyn ScalarFunction>,
    ) -> Result<()> {
        self.registry
            .register_arc(name, udf.return_physical_type(), function)?;
        self.ctx.register_udf(udf.into_scalar_udf());
        debug!(name, "exposed scalar function to session");
        Ok(())
    }

    /// Removes the function registered under `name` from the session.
    ///
    /// # Errors
    ///
    /// Returns `FunctionNotFound` if this session has no such function.
    pub fn unregister(&mut self, name: &str) -> Result<()> {
        self.registry.unregister(name)?;
        self.ctx.deregister_udf(name);
        Ok(())
    }

    /// Registers an in-memory table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be registered.
    pub fn register_batch(&self, table: &str, batch: RecordBatch) -> Result<()> {
        self.ctx
            .register_batch(table, batch)
            .map_err(|e| BridgeError::ExecutionError(e.to_string()))?;
        Ok(())
    }

    /// Runs a SQL query and collects all result batches.
    ///
    /// # Errors
    ///
    /// Returns an error if planning or execution fails, including when a
    /// bridged function aborts its batch.
    pub async fn sql(&self, query: &str) -> Result<Vec<RecordBatch>> {
        let df = self
            .ctx
            .sql(query)
            .await
            .map_err(|e| BridgeError::ExecutionError(e.to_string()))?;
        df.collect()
            .await
            .map_err(|e| BridgeError::ExecutionError(e.to_string()))
    }
}
