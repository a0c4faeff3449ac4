//! DataFusion integration module.
//!
//! This module exposes bridged functions to Apache DataFusion:
//! - `ScalarUDFImpl` adapter converting Arrow arrays to and from batches
//! - A session wrapper handling registration and SQL execution

pub mod session;
pub mod udf;

pub use session::UdfSession;
pub use udf::BridgeUdf;
