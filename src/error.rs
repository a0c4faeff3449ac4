//! Error types for the scalar function bridge.

use std::any::Any;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PhysicalType;

/// Result type alias using [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Discriminant carried by every [`UdfException`].
pub const UDF_EXCEPTION_NAME: &str = "UDF-Exception";

/// Error types raised while resolving, invoking or registering a function.
///
/// These never cross the engine boundary directly; they are converted into a
/// [`UdfException`] first.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// An argument column lacks a usable data buffer for its physical type.
    #[error("Malformed column of type {physical_type}: {reason}")]
    MalformedColumn {
        physical_type: PhysicalType,
        reason: String,
    },

    /// The declared return type has no buffer allocation rule.
    #[error("Unsupported return type: {0}")]
    UnsupportedReturnType(PhysicalType),

    /// The user function failed while processing a row.
    #[error("User function failed at row {row}: {message}")]
    UserFunctionFailure { row: usize, message: String },

    /// The user function returned a value that cannot be stored in the return column.
    #[error("Result type mismatch at row {row}: cannot store {actual} value in {expected} column")]
    ResultTypeMismatch {
        row: usize,
        expected: PhysicalType,
        actual: &'static str,
    },

    /// Number of arguments differs from the arity the function declares.
    #[error("Arity mismatch: function expects {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// A physical type tag could not be parsed.
    #[error("Unknown physical type: {0}")]
    UnknownPhysicalType(String),

    /// An Arrow array has no column representation.
    #[error("Unsupported Arrow type: {0}")]
    UnsupportedArrowType(String),

    /// A function with the same name is already registered.
    #[error("Function '{0}' is already registered")]
    DuplicateFunction(String),

    /// No function is registered under the name.
    #[error("Function '{0}' not found")]
    FunctionNotFound(String),

    /// Arrow rejected a buffer while building an output array.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Query execution through the engine binding failed.
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

impl BridgeError {
    /// Returns the human-readable message used for the wire-level exception.
    ///
    /// A user failure contributes its own message verbatim; every other kind
    /// contributes its display text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            BridgeError::UserFunctionFailure { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// The single error shape handed back to the engine.
///
/// Serializes as `{"name": "UDF-Exception", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct UdfException {
    /// Fixed discriminant, always [`UDF_EXCEPTION_NAME`].
    pub name: String,
    /// Message taken from the underlying failure.
    pub message: String,
}

impl UdfException {
    /// Creates an exception with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        UdfException {
            name: UDF_EXCEPTION_NAME.to_string(),
            message: message.into(),
        }
    }

    /// Renders the exception as its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<BridgeError> for UdfException {
    fn from(err: BridgeError) -> Self {
        UdfException::new(err.message())
    }
}

/// Extracts a message from a panic payload.
///
/// `&str` and `String` payloads are used as-is; anything else falls back to
/// its debug representation.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        format!("{payload:?}")
    }
}
