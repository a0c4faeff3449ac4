//! Name-to-function registry used by engine bindings.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::column::Column;
use crate::error::{BridgeError, Result, UdfException};
use crate::executor::{Batch, BatchInvoker, BridgeConfig, ReturnColumn, ReturnData};
use crate::types::PhysicalType;

use super::ScalarFunction;

/// A function registered under a name together with its return type.
#[derive(Clone)]
pub struct RegisteredFunction {
    name: String,
    return_type: PhysicalType,
    function: Arc<dyn ScalarFunction>,
}

impl RegisteredFunction {
    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared return type.
    #[must_use]
    pub fn return_type(&self) -> PhysicalType {
        self.return_type
    }

    /// Returns the function.
    #[must_use]
    pub fn function(&self) -> &Arc<dyn ScalarFunction> {
        &self.function
    }
}

impl std::fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("arity", &self.function.arity())
            .finish()
    }
}

/// Central registry of scalar functions by name.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
    invoker: BatchInvoker,
}

impl FunctionRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry whose invocations use `config`.
    #[must_use]
    pub fn with_config(config: BridgeConfig) -> Self {
        FunctionRegistry {
            functions: HashMap::new(),
            invoker: BatchInvoker::new(config),
        }
    }

    /// Registers `function` under `name` with a return type given as an engine tag.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The tag is not a known physical type
    /// - The return type has no buffer allocation rule
    /// - A function with the same name already exists
    pub fn register<F>(&mut self, name: &str, return_type_tag: &str, function: F) -> Result<()>
    where
        F: ScalarFunction + 'static,
    {
        let return_type = return_type_tag.parse::<PhysicalType>()?;
        self.register_arc(name, return_type, Arc::new(function))
    }

    /// Registers an already shared function.
    ///
    /// # Errors
    ///
    /// Returns an error if the return type is unsupported or the name is taken.
    pub fn register_arc(
        &mut self,
        name: &str,
        return_type: PhysicalType,
        function: Arc<dyn ScalarFunction>,
    ) -> Result<()> {
        ReturnData::allocate(return_type, 0)?;
        if self.functions.contains_key(name) {
            return Err(BridgeError::DuplicateFunction(name.to_string()));
        }
        debug!(name, %return_type, arity = ?function.arity(), "registered scalar function");
        self.functions.insert(
            name.to_string(),
            RegisteredFunction {
                name: name.to_string(),
                return_type,
                function,
            },
        );
        Ok(())
    }

    /// Removes the function registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `FunctionNotFound` if nothing is registered under the name.
    pub fn unregister(&mut self, name: &str) -> Result<()> {
        if self.functions.remove(name).is_none() {
            return Err(BridgeError::FunctionNotFound(name.to_string()));
        }
        debug!(name, "unregistered scalar function");
        Ok(())
    }

    /// Retrieves a registered function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(name)
    }

    /// Checks if a function is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns all registered names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Dispatches a batch call for `name` over `args`.
    ///
    /// The batch is built with the registered return type.
    ///
    /// # Errors
    ///
    /// Returns a [`UdfException`] if the function is unknown or the batch aborts.
    pub fn call(
        &self,
        name: &str,
        args: Vec<Column>,
        row_count: usize,
    ) -> std::result::Result<ReturnColumn, UdfException> {
        let registered = self
            .functions
            .get(name)
            .ok_or_else(|| BridgeError::FunctionNotFound(name.to_string()))?;
        let batch = Batch::new(args, registered.return_type, row_count);
        self.invoker.invoke(registered.function.as_ref(), batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::from_fn;
    use crate::types::Value;

    fn negate() -> impl ScalarFunction {
        from_fn(|args| Ok(args[0].as_int64().map(|v| -v).into())).with_arity(1)
    }

    #[test]
    fn test_register_and_call() {
        let mut registry = FunctionRegistry::new();
        registry.register("negate", "INT64", negate()).unwrap();
        assert!(registry.contains("negate"));
        assert_eq!(registry.get("negate").unwrap().return_type(), PhysicalType::Int64);

        let ret = registry
            .call(
                "negate",
                vec![Column::new("x", PhysicalType::Int64, vec![1_i64, -2])],
                2,
            )
            .unwrap();
        assert_eq!(ret.values(), vec![Value::Int64(-1), Value::Int64(2)]);
    }

    #[test]
    fn test_register_unknown_tag() {
        let mut registry = FunctionRegistry::new();
        let err = registry.register("f", "HUGEINT", negate()).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownPhysicalType(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_struct_return_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry.register("f", "STRUCT", negate()).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedReturnType(PhysicalType::Struct)));
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = FunctionRegistry::new();
        registry.register("f", "INT64", negate()).unwrap();
        let err = registry.register("f", "INT64", negate()).unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateFunction(name) if name == "f"));
    }

    #[test]
    fn test_unregister() {
        let mut registry = FunctionRegistry::new();
        registry.register("f", "INT64", negate()).unwrap();
        registry.unregister("f").unwrap();
        assert!(!registry.contains("f"));
        assert!(matches!(
            registry.unregister("f"),
            Err(BridgeError::FunctionNotFound(_))
        ));
    }

    #[test]
    fn test_call_unknown_function() {
        let registry = FunctionRegistry::new();
        let err = registry.call("missing", Vec::new(), 0).unwrap_err();
        assert_eq!(err.message, "Function 'missing' not found");
    }
}
