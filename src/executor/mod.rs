//! Vectorized execution of scalar functions.
//!
//! A [`Batch`] of argument columns goes in, one [`Resolver`] per column turns
//! row indices back into values, and the [`BatchInvoker`] writes each row's
//! result into a typed [`ReturnColumn`] with its validity bitmap.

mod batch;
mod invoker;
mod output;
mod resolver;

pub use batch::Batch;
pub use invoker::BatchInvoker;
pub use output::{ReturnColumn, ReturnData};
pub use resolver::Resolver;

use crate::error::UdfException;
use crate::function::ScalarFunction;

/// Default number of rows per batch handed to functions by the engine binding.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Configuration for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Convert a panicking user function into a batch failure (default: true).
    pub catch_panics: bool,
    /// Number of rows per batch in the engine session.
    pub batch_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl BridgeConfig {
    /// Creates a new bridge configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether user panics are captured.
    #[must_use]
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    /// Sets the batch size. Zero is raised to one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Invokes `function` over `batch` with the default configuration.
///
/// # Errors
///
/// Returns a [`UdfException`] if the batch is aborted.
pub fn invoke<F>(function: &F, batch: Batch) -> Result<ReturnColumn, UdfException>
where
    F: ScalarFunction + ?Sized,
{
    BatchInvoker::default().invoke(function, batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::new()
            .with_catch_panics(false)
            .with_batch_size(1024);
        assert!(!config.catch_panics);
        assert_eq!(config.batch_size, 1024);
    }

    #[test]
    fn test_zero_batch_size_is_raised() {
        assert_eq!(BridgeConfig::new().with_batch_size(0).batch_size, 1);
    }

    #[test]
    fn test_config_defaults() {
        let config = BridgeConfig::default();
        assert!(config.catch_panics);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }
}
